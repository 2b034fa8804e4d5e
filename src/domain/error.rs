//! Domain Error Types
//!
//! Validation failures for incoming event payloads.

use thiserror::Error;

/// Errors raised while interpreting an event payload.
///
/// These are independent of the database layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EventError {
    /// Payload is not a JSON object
    #[error("Event payload must be a JSON object")]
    NotAnObject,

    /// A required key is absent
    #[error("Event is missing required field '{0}'")]
    MissingField(&'static str),

    /// A required key has the wrong JSON type
    #[error("Event field '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    /// Timestamp cannot be represented as a datetime
    #[error("Event timestamp out of range: {0}")]
    InvalidTimestamp(String),
}
