//! Task Events
//!
//! Lifecycle events emitted by workers and tasks.
//! Beyond `type`, `uuid` and `timestamp` the payload is opaque and kept verbatim.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::EventError;

/// Event types that are never persisted.
///
/// Liveness traffic is high-volume and carries nothing worth replaying.
pub const IGNORED_EVENT_TYPES: [&str; 3] = ["worker-offline", "worker-online", "worker-heartbeat"];

/// Check a raw event type against the ignore list
pub fn is_ignored_type(event_type: &str) -> bool {
    IGNORED_EVENT_TYPES.contains(&event_type)
}

/// A single lifecycle event as delivered by the producer.
///
/// Serializes back to the same JSON shape it was read from, so the stored
/// `data` column holds the producer's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Event type, e.g. `task-succeeded`
    #[serde(rename = "type")]
    pub event_type: String,

    /// Logical task this event belongs to
    pub uuid: String,

    /// Seconds since the Unix epoch, kept as the producer sent it
    pub timestamp: Number,

    /// Event-specific fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TaskEvent {
    /// Create an event with no extra fields
    ///
    /// # Errors
    /// - `EventError::InvalidTimestamp` if `timestamp` is NaN or infinite
    pub fn new(
        event_type: impl Into<String>,
        uuid: impl Into<String>,
        timestamp: f64,
    ) -> Result<Self, EventError> {
        let timestamp = Number::from_f64(timestamp)
            .ok_or_else(|| EventError::InvalidTimestamp(timestamp.to_string()))?;

        Ok(Self {
            event_type: event_type.into(),
            uuid: uuid.into(),
            timestamp,
            fields: Map::new(),
        })
    }

    /// Add an event-specific field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Interpret a raw JSON mapping as an event.
    ///
    /// # Errors
    /// - `EventError::NotAnObject` if the payload is not a mapping
    /// - `EventError::MissingField` / `InvalidField` for `type`, `uuid`, `timestamp`
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        let Value::Object(mut fields) = value else {
            return Err(EventError::NotAnObject);
        };

        let event_type = match fields.remove("type") {
            Some(Value::String(s)) => s,
            Some(_) => {
                return Err(EventError::InvalidField { field: "type", expected: "a string" })
            }
            None => return Err(EventError::MissingField("type")),
        };
        let uuid = match fields.remove("uuid") {
            Some(Value::String(s)) => s,
            Some(_) => {
                return Err(EventError::InvalidField { field: "uuid", expected: "a string" })
            }
            None => return Err(EventError::MissingField("uuid")),
        };
        let timestamp = match fields.remove("timestamp") {
            Some(Value::Number(n)) => n,
            Some(_) => {
                return Err(EventError::InvalidField { field: "timestamp", expected: "a number" })
            }
            None => return Err(EventError::MissingField("timestamp")),
        };

        Ok(Self { event_type, uuid, timestamp, fields })
    }

    /// Whether this event is dropped before reaching storage
    pub fn is_ignored(&self) -> bool {
        is_ignored_type(&self.event_type)
    }

    /// Convert the timestamp to a UTC wall-clock datetime.
    ///
    /// Precision is rounded to microseconds, the resolution PostgreSQL stores.
    pub fn time(&self) -> Result<NaiveDateTime, EventError> {
        let invalid = || EventError::InvalidTimestamp(self.timestamp.to_string());

        let micros = if let Some(secs) = self.timestamp.as_i64() {
            secs.checked_mul(1_000_000).ok_or_else(invalid)?
        } else {
            let secs = self.timestamp.as_f64().filter(|s| s.is_finite()).ok_or_else(invalid)?;
            let micros = (secs * 1_000_000.0).round();
            if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
                return Err(invalid());
            }
            micros as i64
        };

        DateTime::from_timestamp_micros(micros)
            .map(|dt| dt.naive_utc())
            .ok_or_else(invalid)
    }

    /// Full payload as stored in the `data` column
    pub fn to_payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_from_value_keeps_extra_fields() {
        let event = TaskEvent::from_value(json!({
            "type": "task-succeeded",
            "uuid": "3f1c0d5e-8f0b-4c53-9d6c-0e3a1f2b4c5d",
            "timestamp": 1700000000.25,
            "hostname": "celery@worker1",
            "runtime": 0.42,
        }))
        .unwrap();

        assert_eq!(event.event_type, "task-succeeded");
        assert_eq!(event.fields.get("hostname"), Some(&json!("celery@worker1")));
        assert_eq!(event.fields.len(), 2);
    }

    #[test]
    fn test_payload_matches_producer_json() {
        let raw = json!({
            "type": "task-started",
            "uuid": "abc",
            "timestamp": 1700000000,
            "pid": 4242,
        });

        let event = TaskEvent::from_value(raw.clone()).unwrap();
        assert_eq!(event.to_payload().unwrap(), raw);
    }

    #[test]
    fn test_from_value_missing_fields() {
        assert_eq!(
            TaskEvent::from_value(json!({"uuid": "a", "timestamp": 1})),
            Err(EventError::MissingField("type"))
        );
        assert_eq!(
            TaskEvent::from_value(json!({"type": "task-sent", "timestamp": 1})),
            Err(EventError::MissingField("uuid"))
        );
        assert_eq!(
            TaskEvent::from_value(json!({"type": "task-sent", "uuid": "a"})),
            Err(EventError::MissingField("timestamp"))
        );
        assert_eq!(TaskEvent::from_value(json!([1, 2])), Err(EventError::NotAnObject));
    }

    #[test]
    fn test_from_value_wrong_types() {
        let err = TaskEvent::from_value(json!({
            "type": "task-sent",
            "uuid": "a",
            "timestamp": "yesterday",
        }))
        .unwrap_err();
        assert_eq!(
            err,
            EventError::InvalidField { field: "timestamp", expected: "a number" }
        );
    }

    #[test]
    fn test_time_conversion() {
        let event = TaskEvent::new("task-sent", "a", 1_700_000_000.5).unwrap();
        let time = event.time().unwrap();

        assert_eq!(time.year(), 2023);
        assert_eq!(time.month(), 11);
        assert_eq!(time.day(), 14);
        assert_eq!(time.hour(), 22);
        assert_eq!(time.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_time_integer_timestamp() {
        let event = TaskEvent::from_value(json!({
            "type": "task-sent",
            "uuid": "a",
            "timestamp": 0,
        }))
        .unwrap();
        assert_eq!(event.time().unwrap(), DateTime::from_timestamp(0, 0).unwrap().naive_utc());
    }

    #[test]
    fn test_time_out_of_range() {
        let event = TaskEvent::new("task-sent", "a", 1e300).unwrap();
        assert!(matches!(event.time(), Err(EventError::InvalidTimestamp(_))));
    }

    #[test]
    fn test_new_rejects_non_finite_timestamp() {
        for ts in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                TaskEvent::new("task-sent", "a", ts),
                Err(EventError::InvalidTimestamp(_))
            ));
        }
    }

    #[test]
    fn test_ignored_types() {
        for ty in IGNORED_EVENT_TYPES {
            assert!(TaskEvent::new(ty, "w", 1.0).unwrap().is_ignored());
        }
        assert!(!TaskEvent::new("task-failed", "t", 1.0).unwrap().is_ignored());
        assert!(!is_ignored_type("worker-offline-soon"));
    }
}
