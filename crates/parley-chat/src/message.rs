//! Chat values: user identities and messages.

use std::fmt;

use chrono::{DateTime, Utc};

/// A display name chosen at handshake time.
///
/// The username is the registry key: at most one active registration
/// per identity exists at any time. A `Username` carried on a
/// [`Message`] is a value copy of the identity, never a handle into
/// the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Username(String);

impl Username {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Username {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// An immutable chat message: opaque content plus sender identity and
/// the UTC instant it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub content: String,
    pub sender: Username,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message timestamped now.
    pub fn now(sender: Username, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    /// The wire form delivered to recipients: `<sender> > <content>`.
    pub fn render(&self) -> String {
        format!("{} > {}", self.sender, self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_wire_form() {
        let msg = Message::now(Username::from("Alice"), "hi there");
        assert_eq!(msg.render(), "Alice > hi there");
    }

    #[test]
    fn test_sender_is_a_value_copy() {
        let sender = Username::from("Bob");
        let msg = Message::now(sender.clone(), "x");
        drop(sender);
        assert_eq!(msg.sender.as_str(), "Bob");
    }

    #[test]
    fn test_timestamp_is_utc_now() {
        let before = Utc::now();
        let msg = Message::now(Username::from("Cara"), "x");
        let after = Utc::now();
        assert!(msg.timestamp >= before && msg.timestamp <= after);
    }
}
