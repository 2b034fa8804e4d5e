//! Domain module
//!
//! Event payload types shared by the ingestion and query paths.

pub mod error;
pub mod events;

pub use error::EventError;
pub use events::{TaskEvent, IGNORED_EVENT_TYPES};
