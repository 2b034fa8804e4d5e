//! Event Store Repository
//!
//! Owns the single database connection and implements ingestion and the two
//! dashboard read paths.

use futures::TryStreamExt;
use serde_json::Value;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

use crate::config::ConnectionSettings;
use crate::domain::events::is_ignored_type;
use crate::domain::TaskEvent;

use super::query::FetchQuery;
use super::schema;
use super::stream::EventStream;
use super::EventStoreError;

const INSERT_EVENT: &str = r#"
INSERT INTO events (time, uuid, data)
VALUES ($1, $2, $3)
ON CONFLICT DO NOTHING
"#;

/// What `record_event` did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new row was written
    Inserted,
    /// Same `(time, data)` already stored; nothing written
    Duplicate,
    /// Liveness event type, dropped
    Ignored,
    /// Ingestion is switched off, dropped
    Suppressed,
}

impl RecordOutcome {
    /// Whether the event ended up in storage (now or earlier)
    pub fn is_stored(&self) -> bool {
        matches!(self, RecordOutcome::Inserted | RecordOutcome::Duplicate)
    }
}

/// Event Store for persisting and replaying task events.
///
/// Starts disconnected. One instance per process, passed to whoever ingests
/// or queries. Every method takes `&mut self`: calls are serialized by the
/// borrow checker and the connection is never shared.
#[derive(Default)]
pub struct EventStore {
    conn: Option<PgConnection>,
    ingestion_suppressed: bool,
}

impl EventStore {
    /// Create a disconnected store
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a connection is currently held
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Turn ingestion off (or back on) without closing the connection
    pub fn set_ingestion_suppressed(&mut self, suppressed: bool) {
        if suppressed != self.ingestion_suppressed {
            tracing::info!(suppressed, "Event ingestion suppression changed");
        }
        self.ingestion_suppressed = suppressed;
    }

    pub fn is_ingestion_suppressed(&self) -> bool {
        self.ingestion_suppressed
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Connect using host, port, credentials and TLS settings
    pub async fn connect(&mut self, settings: &ConnectionSettings) -> Result<(), EventStoreError> {
        tracing::info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            tls = settings.use_tls,
            "Connecting to postgresql persistence backend"
        );
        self.connect_with(&settings.connect_options()).await
    }

    /// Connect and create the events table if it does not exist yet.
    ///
    /// A connection already held is closed first.
    pub async fn connect_with(&mut self, options: &PgConnectOptions) -> Result<(), EventStoreError> {
        self.close().await?;

        let mut conn = PgConnection::connect_with(options)
            .await
            .map_err(EventStoreError::Connectivity)?;

        let created = schema::bootstrap(&mut conn)
            .await
            .map_err(EventStoreError::Bootstrap)?;

        tracing::info!(schema_created = created, "Connected to postgresql persistence backend");

        self.conn = Some(conn);
        Ok(())
    }

    /// Close the connection if one is open. No-op otherwise.
    ///
    /// The handle is cleared even when the close handshake fails.
    pub async fn close(&mut self) -> Result<(), EventStoreError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        conn.close().await.map_err(EventStoreError::Connectivity)?;
        tracing::debug!("Closed postgresql persistence connection");
        Ok(())
    }

    fn connection(&mut self) -> Result<&mut PgConnection, EventStoreError> {
        self.conn.as_mut().ok_or(EventStoreError::NotConnected)
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Persist one event.
    ///
    /// Suppressed or liveness events are dropped without touching the
    /// database. A duplicate `(time, data)` pair is absorbed. Any other
    /// failure rolls the transaction back and is returned as `Write`.
    pub async fn record_event(&mut self, event: &TaskEvent) -> Result<RecordOutcome, EventStoreError> {
        if self.ingestion_suppressed {
            return Ok(RecordOutcome::Suppressed);
        }
        if event.is_ignored() {
            return Ok(RecordOutcome::Ignored);
        }

        let conn = self.connection()?;
        let data = event.to_payload()?;
        let time = event.time()?;

        let mut tx = conn.begin().await.map_err(EventStoreError::Write)?;

        let inserted = sqlx::query(INSERT_EVENT)
            .bind(time)
            .bind(&event.uuid)
            .bind(&data)
            .execute(&mut *tx)
            .await;

        let rows_affected = match inserted {
            Ok(done) => done.rows_affected(),
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback after failed insert also failed");
                }
                return Err(EventStoreError::Write(e));
            }
        };

        tx.commit().await.map_err(EventStoreError::Write)?;

        if rows_affected == 0 {
            tracing::trace!(uuid = %event.uuid, event_type = %event.event_type, "Duplicate event absorbed");
            Ok(RecordOutcome::Duplicate)
        } else {
            Ok(RecordOutcome::Inserted)
        }
    }

    /// Persist a raw JSON mapping from the producer.
    ///
    /// Ignored event types are dropped before the payload is validated, so
    /// worker events without a task `uuid` never fail.
    pub async fn record_value(&mut self, value: Value) -> Result<RecordOutcome, EventStoreError> {
        if self.ingestion_suppressed {
            return Ok(RecordOutcome::Suppressed);
        }
        if value
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(is_ignored_type)
        {
            return Ok(RecordOutcome::Ignored);
        }

        let event = TaskEvent::from_value(value)?;
        self.record_event(&event).await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Stream stored payloads in ascending time order.
    ///
    /// With a non-zero `max_events` the most recently inserted events are
    /// returned (`-1` for all); with `max_events == 0` every event of the
    /// `max_tasks` most recently active tasks is returned.
    pub fn fetch_events(
        &mut self,
        max_events: i64,
        max_tasks: i64,
    ) -> Result<EventStream<'_>, EventStoreError> {
        let query = FetchQuery::new(max_events, max_tasks)?;
        self.fetch(query)
    }

    /// Stream stored payloads for an already selected read path
    pub fn fetch(&mut self, query: FetchQuery) -> Result<EventStream<'_>, EventStoreError> {
        let conn = self.connection()?;
        tracing::debug!(?query, "Events loading from postgresql persistence backend");

        let rows = sqlx::query_scalar::<_, Value>(query.sql())
            .bind(query.limit())
            .fetch(conn);

        Ok(EventStream::new(rows))
    }

    /// Drain `fetch_events` into memory
    pub async fn collect_events(
        &mut self,
        max_events: i64,
        max_tasks: i64,
    ) -> Result<Vec<Value>, EventStoreError> {
        self.fetch_events(max_events, max_tasks)?.try_collect().await
    }
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("connected", &self.is_connected())
            .field("ingestion_suppressed", &self.ingestion_suppressed)
            .finish()
    }
}
