//! Message contracts for the mediator.
//!
//! Applications model their messages as an enum implementing [`Message`].
//! Each variant carries a [`Class`] (command, query or event) and a copyable
//! `Kind` tag that the mediator uses for exact-type handler registration,
//! so routing never needs runtime reflection.

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};

/// Classification of a message by its role in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// Intent to change state.
    Command,
    /// Read request without intended side effects.
    Query,
    /// Notification of something that already happened.
    Event,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Class::Command => write!(f, "command"),
            Class::Query => write!(f, "query"),
            Class::Event => write!(f, "event"),
        }
    }
}

/// Contract for an application's message type.
///
/// Implemented on the message enum itself. `Kind` is the variant tag used as
/// the registration key; `Feed` is the item type carried by the context's
/// shared feed (use `()` when the application never joins the feed).
pub trait Message: Clone + Send + Sync + fmt::Debug + 'static {
    /// Registration tag. One value per message variant.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    /// Item type carried by the context-scoped shared feed.
    type Feed: Clone + Send + 'static;

    /// The tag of this concrete message.
    fn kind(&self) -> Self::Kind;

    /// Whether this message is a command, query or event.
    fn class(&self) -> Class;
}

/// An immutable message stamped with its creation time.
///
/// Envelopes are created once at submission and cloned for fan-out; equality
/// is by value, including the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<M> {
    created_at: DateTime<Utc>,
    body: M,
}

impl<M: Message> Envelope<M> {
    /// Wrap a message, stamping the current time.
    pub fn new(body: M) -> Self {
        Self {
            created_at: Utc::now(),
            body,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn body(&self) -> &M {
        &self.body
    }

    /// Consume the envelope, returning the message.
    pub fn into_body(self) -> M {
        self.body
    }

    pub fn kind(&self) -> M::Kind {
        self.body.kind()
    }

    pub fn class(&self) -> Class {
        self.body.class()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{TestKind, TestMessage};
    use super::*;

    #[test]
    fn test_envelope_stamps_creation_time() {
        let before = Utc::now();
        let envelope = Envelope::new(TestMessage::Ping { value: 1 });
        let after = Utc::now();

        assert!(envelope.created_at() >= before);
        assert!(envelope.created_at() <= after);
    }

    #[test]
    fn test_envelope_kind_and_class() {
        let command = Envelope::new(TestMessage::Ping { value: 1 });
        assert_eq!(command.kind(), TestKind::Ping);
        assert_eq!(command.class(), Class::Command);

        let query = Envelope::new(TestMessage::Lookup {
            key: "k".to_string(),
        });
        assert_eq!(query.kind(), TestKind::Lookup);
        assert_eq!(query.class(), Class::Query);

        let event = Envelope::new(TestMessage::Pinged { value: 2 });
        assert_eq!(event.kind(), TestKind::Pinged);
        assert_eq!(event.class(), Class::Event);
    }

    #[test]
    fn test_envelope_equality_by_value() {
        let envelope = Envelope::new(TestMessage::Pinged { value: 10 });
        let cloned = envelope.clone();

        assert_eq!(envelope, cloned);
        assert_eq!(envelope.body(), &TestMessage::Pinged { value: 10 });
    }

    #[test]
    fn test_envelope_into_body() {
        let envelope = Envelope::new(TestMessage::Lookup {
            key: "user:1".to_string(),
        });
        assert_eq!(
            envelope.into_body(),
            TestMessage::Lookup {
                key: "user:1".to_string()
            }
        );
    }

    #[test]
    fn test_class_display() {
        assert_eq!(Class::Command.to_string(), "command");
        assert_eq!(Class::Query.to_string(), "query");
        assert_eq!(Class::Event.to_string(), "event");
    }
}
