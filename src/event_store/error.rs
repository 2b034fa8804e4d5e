//! Event Store Errors
//!
//! Error types for event store operations.

use crate::domain::EventError;

/// Errors that can occur in the event store
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// Could not open a connection (network, authentication, TLS)
    #[error("Connection failed: {0}")]
    Connectivity(#[source] sqlx::Error),

    /// Schema check or creation failed after connecting
    #[error("Schema bootstrap failed: {0}")]
    Bootstrap(#[source] sqlx::Error),

    /// Insert or commit failed; the transaction was rolled back
    #[error("Write failed: {0}")]
    Write(#[source] sqlx::Error),

    /// Read query failed
    #[error("Query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid event data
    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] EventError),

    /// Invalid fetch limits
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Operation attempted without an open connection
    #[error("Event store is not connected")]
    NotConnected,
}

impl EventStoreError {
    /// Check if this error came from opening the connection
    pub fn is_connectivity(&self) -> bool {
        matches!(self, EventStoreError::Connectivity(_))
    }

    /// Check if this error is retryable
    ///
    /// Only transport-level failures qualify; constraint violations and bad
    /// payloads fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            EventStoreError::Connectivity(e)
            | EventStoreError::Write(e)
            | EventStoreError::Query(e) => is_transport_error(e),
            _ => false,
        }
    }
}

/// Connection-level failure: I/O, protocol desync, or a server-side
/// connection exception (SQLSTATE class 08, 57P01..57P03)
fn is_transport_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| code.starts_with("08") || code.starts_with("57P")),
        _ => false,
    }
}
