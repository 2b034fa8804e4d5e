//! Event store database schema.
//!
//! The `events` table is created on first connect when it is missing.

use sqlx::{Connection, PgConnection};

/// SQL to create the events table.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE events (
    id   SERIAL PRIMARY KEY,
    time TIMESTAMP NOT NULL,
    uuid VARCHAR(36) NOT NULL,
    data JSONB NOT NULL,
    UNIQUE (time, data)
)
";

pub const CREATE_TIME_INDEX: &str = "CREATE INDEX event_time_index ON events (time ASC)";

pub const CREATE_UUID_INDEX: &str = "CREATE INDEX event_uuid_index ON events (uuid ASC)";

/// Named existence check for `public.events`.
pub const EVENTS_TABLE_EXISTS: &str = r"
SELECT EXISTS (
    SELECT 1 FROM information_schema.tables
    WHERE table_schema = 'public' AND table_name = 'events'
)
";

/// Check whether the events table is present
pub async fn events_table_exists(conn: &mut PgConnection) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(EVENTS_TABLE_EXISTS).fetch_one(conn).await
}

/// Create the events table and its indexes if the table is missing.
///
/// Returns `true` when the DDL ran. Table and indexes are created in one
/// transaction. Two processes bootstrapping at the same moment can race;
/// only a single writer is expected.
pub async fn bootstrap(conn: &mut PgConnection) -> Result<bool, sqlx::Error> {
    if events_table_exists(conn).await? {
        tracing::debug!("Table events present, skipping schema definition");
        return Ok(false);
    }

    tracing::debug!("Table events missing, executing schema definition");

    let mut tx = conn.begin().await?;
    for statement in [CREATE_EVENTS_TABLE, CREATE_TIME_INDEX, CREATE_UUID_INDEX] {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!("Created events table with time and uuid indexes");
    Ok(true)
}
