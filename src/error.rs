//! Error types surfaced by the event bus.
//!
//! Dispatch itself never fails from the publisher's point of view: handler
//! panics are contained at the dispatch boundary and invalid registrations
//! are ignored. The only user-visible failures come from payload conversion:
//!
//! - [`BusError::Decode`] — [`EventMessage::unmarshal`](crate::EventMessage::unmarshal)
//!   could not re-materialize the payload into the requested shape.
//! - [`BusError::Encode`] — a `publish_json` call could not serialize its payload.
//!
//! Both variants provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

/// # Errors produced by the event bus.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// Payload could not be decoded into the requested type.
    #[error("failed to decode payload of topic {topic:?}: {source}")]
    Decode {
        /// Topic the message was published under.
        topic: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// Payload could not be serialized before publishing.
    #[error("failed to encode payload for topic {topic:?}: {source}")]
    Encode {
        /// Topic the caller tried to publish under.
        topic: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::{EventBus, EventMessage};
    ///
    /// let msg = EventMessage::new("user.create", serde_json::json!("not a number"));
    /// let err = msg.unmarshal::<u64>().unwrap_err();
    /// assert_eq!(err.as_label(), "payload_decode");
    /// # let _ = EventBus::new();
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::Decode { .. } => "payload_decode",
            BusError::Encode { .. } => "payload_encode",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::Decode { topic, source } => format!("decode: topic={topic} err={source}"),
            BusError::Encode { topic, source } => format!("encode: topic={topic} err={source}"),
        }
    }

    /// Returns the topic the failing operation referred to.
    pub fn topic(&self) -> &str {
        match self {
            BusError::Decode { topic, .. } | BusError::Encode { topic, .. } => topic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let source = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let err = BusError::Decode {
            topic: "evt".into(),
            source,
        };
        assert_eq!(err.as_label(), "payload_decode");
        assert_eq!(err.topic(), "evt");
        assert!(err.as_message().starts_with("decode: topic=evt"));
    }

    #[test]
    fn test_display_mentions_topic() {
        let source = serde_json::from_str::<u8>("[]").unwrap_err();
        let err = BusError::Encode {
            topic: "order.created".into(),
            source,
        };
        assert!(err.to_string().contains("\"order.created\""));
        assert_eq!(err.as_label(), "payload_encode");
    }
}
