//! Membership table mapping active users to their delivery sinks.
//!
//! The registry itself carries no synchronization: it is owned
//! exclusively by the switchboard task, which serializes every
//! mutation and every fan-out snapshot (single-owner discipline). No
//! other component reaches into the map directly.

use std::collections::HashMap;

use tracing::debug;

use crate::error::ChatError;
use crate::message::Username;
use crate::sink::OutboundSink;

#[derive(Debug, Default)]
pub struct Registry {
    users: HashMap<Username, OutboundSink>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user with its delivery sink.
    ///
    /// Fails with [`ChatError::DuplicateUser`] if the identity is
    /// already active and [`ChatError::InvalidArgument`] for an empty
    /// name; a failed call leaves the registry unchanged.
    pub fn register(&mut self, user: Username, sink: OutboundSink) -> Result<(), ChatError> {
        if user.as_str().trim().is_empty() {
            return Err(ChatError::invalid_argument("username must not be empty"));
        }
        if self.users.contains_key(&user) {
            return Err(ChatError::DuplicateUser(user));
        }
        debug!(user = %user, "user registered");
        self.users.insert(user, sink);
        Ok(())
    }

    /// Remove a user and close its sink.
    ///
    /// The close runs exactly once per registration: a second
    /// unregister of the same identity is [`ChatError::UnknownUser`],
    /// not a crash, and leaves the registry unchanged.
    pub fn unregister(&mut self, user: &Username) -> Result<(), ChatError> {
        match self.users.remove(user) {
            Some(sink) => {
                sink.close();
                debug!(user = %user, "user unregistered");
                Ok(())
            }
            None => Err(ChatError::UnknownUser(user.clone())),
        }
    }

    /// A point-in-time, internally consistent view for fan-out. Sink
    /// handles are cheap clones; a recipient removed after the
    /// snapshot was taken shows up as a closed sink during delivery.
    pub fn snapshot(&self) -> Vec<(Username, OutboundSink)> {
        self.users
            .iter()
            .map(|(user, sink)| (user.clone(), sink.clone()))
            .collect()
    }

    /// Number of active registrations.
    pub fn count(&self) -> usize {
        self.users.len()
    }
}
