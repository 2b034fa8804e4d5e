//! Common test utilities

use serde_json::Value;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use task_event_log::{EventStore, TaskEvent};

/// Base timestamp for generated events (2023-11-14T22:13:20Z)
pub const BASE_TIMESTAMP: f64 = 1_700_000_000.0;

/// Store connected to the per-test database, schema bootstrapped
pub async fn connected_store(connect_opts: &PgConnectOptions) -> EventStore {
    let mut store = EventStore::new();
    store
        .connect_with(connect_opts)
        .await
        .expect("Failed to connect event store");
    store
}

/// Event `offset` seconds after the base timestamp, tagged with `seq`
pub fn task_event(event_type: &str, uuid: &str, offset: f64, seq: i64) -> TaskEvent {
    TaskEvent::new(event_type, uuid, BASE_TIMESTAMP + offset)
        .expect("finite timestamp")
        .with_field("hostname", "celery@test")
        .with_field("seq", seq)
}

/// `seq` markers of fetched payloads, in returned order
pub fn seqs(events: &[Value]) -> Vec<i64> {
    events
        .iter()
        .map(|e| e["seq"].as_i64().expect("payload without seq"))
        .collect()
}

/// Count rows with an independent connection
pub async fn row_count(connect_opts: &PgConnectOptions) -> i64 {
    let mut conn = PgConnection::connect_with(connect_opts)
        .await
        .expect("Failed to open side connection");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
        .fetch_one(&mut conn)
        .await
        .expect("Failed to count events");
    conn.close().await.ok();
    count
}
