//! Error handling module
//!
//! Centralized error types for the command-line front ends.

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] crate::event_store::EventStoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AppError {
    /// Whether processing can continue with the next input line
    pub fn is_recoverable(&self) -> bool {
        use crate::event_store::EventStoreError;
        match self {
            AppError::Json(_) | AppError::InvalidArgument(_) => true,
            // A write that failed on a dead connection will fail again
            AppError::Store(e @ EventStoreError::Write(_)) => !e.is_retryable(),
            AppError::Store(e) => matches!(
                e,
                EventStoreError::InvalidEvent(_) | EventStoreError::Serialization(_)
            ),
            AppError::Config(_) | AppError::Io(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventError;
    use crate::event_store::EventStoreError;

    #[test]
    fn test_recoverable_errors() {
        let bad_line = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(AppError::from(bad_line).is_recoverable());

        let invalid = EventStoreError::InvalidEvent(EventError::MissingField("type"));
        assert!(AppError::from(invalid).is_recoverable());

        assert!(!AppError::from(EventStoreError::NotConnected).is_recoverable());

        let constraint = EventStoreError::Write(sqlx::Error::RowNotFound);
        assert!(AppError::from(constraint).is_recoverable());

        assert!(!AppError::Config(crate::config::ConfigError::MissingEnv("EVENTS_DB_USER")).is_recoverable());
    }

    #[test]
    fn test_write_on_dead_connection_is_fatal() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset by peer");
        let err = AppError::from(EventStoreError::Write(sqlx::Error::Io(reset)));
        assert!(!err.is_recoverable());

        let pipe = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        assert!(!AppError::from(EventStoreError::Write(sqlx::Error::Io(pipe))).is_recoverable());
    }
}
