//! Normalized events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Event payload: platform-specific fields keyed by name.
pub type Payload = Map<String, Value>;

/// Normalized record of something that happened upstream.
///
/// Fields are private and there are no setters: once built and published an
/// event is never mutated. The bus shares it between handlers behind an
/// `Arc` and handlers only ever see `&Event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    #[serde(rename = "type")]
    event_type: String,
    payload: Payload,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(event_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Create an event from a JSON value; non-object values become an
    /// empty payload.
    pub fn from_json(event_type: impl Into<String>, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        Self::new(event_type, payload)
    }

    /// Unique id, used to correlate log lines and history entries
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Dot-namespaced type, e.g. `approval.instance.updated`
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Raw payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Payload field as a non-blank string, trimmed.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_fields() {
        let event = Event::from_json(
            "approval.instance.updated",
            json!({"instance_code": " I1 ", "node": "", "amount": 10}),
        );

        assert_eq!(event.event_type(), "approval.instance.updated");
        assert_eq!(event.get_str("instance_code"), Some("I1"));
        assert_eq!(event.get_str("node"), None);
        assert_eq!(event.get_str("amount"), None);
        assert_eq!(event.get("amount"), Some(&json!(10)));
    }

    #[test]
    fn test_non_object_payload_is_empty() {
        let event = Event::from_json("x.y", json!([1, 2, 3]));
        assert!(event.payload().is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Event::new("x.y", Payload::new());
        let b = Event::new("x.y", Payload::new());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_serializes_type_field() {
        let event = Event::new("x.y", Payload::new());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "x.y");
    }
}
