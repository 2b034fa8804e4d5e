//! task_event_log Library
//!
//! PostgreSQL persistence for task and worker lifecycle events.
//! Re-exports modules for the binaries and integration testing.

pub mod config;
pub mod domain;
pub mod event_store;
mod error;

pub use config::{Config, ConnectionSettings};
pub use domain::{EventError, TaskEvent};
pub use error::{AppError, AppResult};
pub use event_store::{EventStore, EventStoreError, EventStream, FetchQuery, RecordOutcome};
