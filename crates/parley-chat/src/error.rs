//! Typed errors surfaced by the registry, switchboard, and coordinator.
//!
//! None of these are process-fatal: the coordinator decides the
//! connection-level consequence, and the listener keeps accepting new
//! connections regardless of any single connection's failure.

use thiserror::Error;

use crate::message::Username;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Register was called with an identity that is already active.
    /// The failed call leaves the registry unchanged.
    #[error("user '{0}' is already registered")]
    DuplicateUser(Username),

    /// Unregister or lookup was called with an identity not present.
    #[error("user '{0}' is not registered")]
    UnknownUser(Username),

    /// Empty identity or otherwise malformed input; the call is rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The switchboard task has stopped; no further commands can be
    /// processed. Only happens once every handle has been dropped.
    #[error("switchboard is no longer running")]
    SwitchboardClosed,

    /// Read-side transport failure. Terminates that connection's
    /// lifecycle, never the server.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl ChatError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether the handshake should report this failure to the client
    /// before closing (rather than just dropping the connection).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::DuplicateUser(_) | Self::InvalidArgument(_))
    }
}
