//! Forward-only event cursor
//!
//! Wraps the row stream of a read query. Rows are pulled from the server as
//! the caller polls; dropping the cursor releases the query whether or not it
//! was drained.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::Value;

use super::EventStoreError;

/// Lazy sequence of stored event payloads in ascending time order.
///
/// Borrows the store's connection, so no other store call can run until it
/// is dropped.
pub struct EventStream<'c> {
    rows: BoxStream<'c, Result<Value, sqlx::Error>>,
    yielded: u64,
    exhausted: bool,
}

impl<'c> EventStream<'c> {
    pub(crate) fn new(rows: BoxStream<'c, Result<Value, sqlx::Error>>) -> Self {
        Self {
            rows,
            yielded: 0,
            exhausted: false,
        }
    }

    /// Number of payloads handed out so far
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Whether the underlying query has finished
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl Stream for EventStream<'_> {
    type Item = Result<Value, EventStoreError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.exhausted {
            return Poll::Ready(None);
        }

        match this.rows.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(data))) => {
                this.yielded += 1;
                Poll::Ready(Some(Ok(data)))
            }
            Poll::Ready(Some(Err(e))) => {
                // No partial results after a failed row
                this.exhausted = true;
                Poll::Ready(Some(Err(EventStoreError::Query(e))))
            }
            Poll::Ready(None) => {
                this.exhausted = true;
                tracing::debug!(
                    events = this.yielded,
                    "Events loaded from postgresql persistence backend"
                );
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for EventStream<'_> {
    fn drop(&mut self) {
        if !self.exhausted {
            tracing::debug!(
                events = self.yielded,
                "Event stream abandoned before exhaustion"
            );
        }
    }
}

impl std::fmt::Debug for EventStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("yielded", &self.yielded)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
