//! Event Store module
//!
//! Persistence layer for task lifecycle events.
//! Handles storing and replaying events from PostgreSQL.

mod error;
pub mod query;
mod repository;
pub mod schema;
mod stream;

pub use error::EventStoreError;
pub use query::{FetchQuery, UNLIMITED};
pub use repository::{EventStore, RecordOutcome};
pub use stream::EventStream;
