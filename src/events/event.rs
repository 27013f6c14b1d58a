//! Event types carried by a conversation stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    User,
    Agent,
    Environment,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::User => "user",
            EventSource::Agent => "agent",
            EventSource::Environment => "environment",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A chat message.
    Message { content: String },
    /// A runtime status notice.
    Status { message: String },
}

impl EventKind {
    pub fn message(content: impl Into<String>) -> Self {
        EventKind::Message {
            content: content.into(),
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        EventKind::Status {
            message: message.into(),
        }
    }
}

/// An event after the stream has stamped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Sequential per stream, starting at 0.
    pub id: u64,
    pub source: EventSource,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Message content, if this is a message event.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Message { content } => Some(content),
            EventKind::Status { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flat_with_kind_tag() {
        let event = Event {
            id: 3,
            source: EventSource::Agent,
            timestamp: Utc::now(),
            kind: EventKind::message("Ping"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["source"], "agent");
        assert_eq!(json["kind"], "message");
        assert_eq!(json["content"], "Ping");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn status_has_no_content() {
        let kind = EventKind::status("starting");
        let event = Event {
            id: 0,
            source: EventSource::Environment,
            timestamp: Utc::now(),
            kind,
        };
        assert_eq!(event.content(), None);
    }
}
