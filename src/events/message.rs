//! # Event envelope delivered to untyped handlers.
//!
//! An [`EventMessage`] is created **once per publish call** and shared by every
//! matched handler through an `Arc`. The payload is opaque to the bus: it is
//! stored as a [`serde_json::Value`] and can be re-materialized into any
//! deserializable shape with [`EventMessage::unmarshal`].
//!
//! ## Example
//! ```rust
//! use serde::Deserialize;
//! use serde_json::json;
//! use eventvisor::EventMessage;
//!
//! #[derive(Deserialize)]
//! struct UserCreated { id: u64, name: String }
//!
//! let msg = EventMessage::new("user.create", json!({ "id": 7, "name": "ada" }));
//! let user: UserCreated = msg.unmarshal().unwrap();
//!
//! assert_eq!(msg.topic(), "user.create");
//! assert_eq!(user.id, 7);
//! assert_eq!(user.name, "ada");
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::BusError;

/// Message envelope handed to every handler matched by a publish.
///
/// - `id`: random v4 UUID, unique per publish call
/// - `at`: wall-clock time the message was built (not delivery time)
/// - `topic`: the topic it was published under (not the pattern that matched)
/// - `data`: opaque payload
#[derive(Clone, Debug)]
pub struct EventMessage {
    /// Globally unique message id.
    pub id: Uuid,
    /// Wall-clock timestamp of creation.
    pub at: SystemTime,
    /// Published topic.
    pub topic: Arc<str>,
    /// Opaque payload.
    pub data: Value,
}

impl EventMessage {
    /// Creates a new message with a fresh id and the current timestamp.
    pub fn new(topic: impl Into<Arc<str>>, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: SystemTime::now(),
            topic: topic.into(),
            data,
        }
    }

    /// Topic the message was published under.
    #[inline]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Decodes the payload into `T` via a structural (JSON) conversion.
    ///
    /// Returns [`BusError::Decode`] when the payload shape is incompatible with `T`.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        T::deserialize(&self.data).map_err(|source| BusError::Decode {
            topic: self.topic.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        id: u32,
        items: Vec<String>,
    }

    #[test]
    fn test_new_assigns_unique_ids() {
        let a = EventMessage::new("evt", Value::Null);
        let b = EventMessage::new("evt", Value::Null);
        assert_ne!(a.id, b.id);
        assert!(b.at >= a.at);
    }

    #[test]
    fn test_unmarshal_into_struct() {
        let msg = EventMessage::new("order.created", json!({ "id": 3, "items": ["a", "b"] }));
        let order: Order = msg.unmarshal().unwrap();
        assert_eq!(
            order,
            Order {
                id: 3,
                items: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn test_unmarshal_shape_mismatch_is_reported() {
        let msg = EventMessage::new("order.created", json!({ "id": "three" }));
        let err = msg.unmarshal::<Order>().unwrap_err();
        assert!(matches!(err, BusError::Decode { ref topic, .. } if topic == "order.created"));
    }

    #[test]
    fn test_unmarshal_scalar() {
        let msg = EventMessage::new("tick", json!(42));
        assert_eq!(msg.unmarshal::<u64>().unwrap(), 42);
        assert!(msg.unmarshal::<String>().is_err());
    }
}
