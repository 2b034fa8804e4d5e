//! task_event_log - Task Event Persistence
//!
//! Ingests newline-delimited JSON events from stdin into PostgreSQL,
//! or replays stored events to stdout for a dashboard.
//!
//! Usage:
//!   task_event_log [ingest]
//!   task_event_log replay [--max-events N] [--max-tasks N]

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use task_event_log::{AppError, AppResult, Config, EventStore, RecordOutcome};

/// Initialize tracing/logging
///
/// Logs go to stderr so replay output on stdout stays clean.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_event_log=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Ingest,
    Replay {
        max_events: Option<i64>,
        max_tasks: Option<i64>,
    },
}

fn parse_args(args: &[String]) -> AppResult<Command> {
    let mut iter = args.iter();
    let command = match iter.next().map(String::as_str) {
        None | Some("ingest") => return Ok(Command::Ingest),
        Some("replay") => "replay",
        Some(other) => {
            return Err(AppError::InvalidArgument(format!("unknown command '{other}'")))
        }
    };

    let mut max_events = None;
    let mut max_tasks = None;
    while let Some(flag) = iter.next() {
        let slot = match flag.as_str() {
            "--max-events" => &mut max_events,
            "--max-tasks" => &mut max_tasks,
            _ => {
                return Err(AppError::InvalidArgument(format!(
                    "unknown option '{flag}' for {command}"
                )))
            }
        };
        let value = iter
            .next()
            .ok_or_else(|| AppError::InvalidArgument(format!("{flag} needs a value")))?;
        let parsed = value
            .parse()
            .map_err(|_| AppError::InvalidArgument(format!("{flag}: '{value}' is not a number")))?;
        *slot = Some(parsed);
    }

    Ok(Command::Replay { max_events, max_tasks })
}

/// Per-outcome counters for an ingestion run
#[derive(Debug, Default)]
struct IngestStats {
    inserted: u64,
    duplicate: u64,
    ignored: u64,
    suppressed: u64,
    failed: u64,
}

impl IngestStats {
    fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Inserted => self.inserted += 1,
            RecordOutcome::Duplicate => self.duplicate += 1,
            RecordOutcome::Ignored => self.ignored += 1,
            RecordOutcome::Suppressed => self.suppressed += 1,
        }
    }
}

async fn ingest_line(store: &mut EventStore, line: &str) -> AppResult<RecordOutcome> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    Ok(store.record_value(value).await?)
}

/// Read events from stdin until EOF or a shutdown signal
async fn ingest(store: &mut EventStore) -> AppResult<IngestStats> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut stats = IngestStats::default();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => break,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match ingest_line(store, &line).await {
            Ok(outcome) => stats.record(outcome),
            Err(e) if e.is_recoverable() => {
                stats.failed += 1;
                tracing::warn!(error = %e, "Skipping event");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        inserted = stats.inserted,
        duplicate = stats.duplicate,
        ignored = stats.ignored,
        suppressed = stats.suppressed,
        failed = stats.failed,
        "Ingestion finished"
    );
    Ok(stats)
}

/// Write stored events to stdout, one JSON document per line
async fn replay(store: &mut EventStore, max_events: i64, max_tasks: i64) -> AppResult<u64> {
    let mut stdout = tokio::io::stdout();
    let mut events = store.fetch_events(max_events, max_tasks)?;

    let mut written = 0u64;
    while let Some(event) = events.next().await {
        let mut line = serde_json::to_vec(&event?)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        written += 1;
    }
    stdout.flush().await?;

    tracing::info!(events = written, "Replay finished");
    Ok(written)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;
    let config = Config::from_env()?;

    let mut store = EventStore::new();
    store.set_ingestion_suppressed(config.ingestion_suppressed);
    store.connect(&config.connection).await?;

    let result = match command {
        Command::Ingest => ingest(&mut store).await.map(|_| ()),
        Command::Replay { max_events, max_tasks } => replay(
            &mut store,
            max_events.unwrap_or(config.max_events),
            max_tasks.unwrap_or(config.max_tasks),
        )
        .await
        .map(|_| ()),
    };

    // Close even when the command failed
    store.close().await?;
    tracing::info!("Database connection closed. Goodbye!");

    Ok(result?)
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, stopping ingestion...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, stopping ingestion...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_command_is_ingest() {
        assert_eq!(parse_args(&[]).unwrap(), Command::Ingest);
        assert_eq!(parse_args(&args(&["ingest"])).unwrap(), Command::Ingest);
    }

    #[test]
    fn test_replay_options() {
        let command = parse_args(&args(&["replay", "--max-events", "-1", "--max-tasks", "50"])).unwrap();
        assert_eq!(
            command,
            Command::Replay { max_events: Some(-1), max_tasks: Some(50) }
        );

        let command = parse_args(&args(&["replay"])).unwrap();
        assert_eq!(command, Command::Replay { max_events: None, max_tasks: None });
    }

    #[test]
    fn test_bad_arguments() {
        assert!(parse_args(&args(&["purge"])).is_err());
        assert!(parse_args(&args(&["replay", "--max-events"])).is_err());
        assert!(parse_args(&args(&["replay", "--max-events", "lots"])).is_err());
        assert!(parse_args(&args(&["replay", "--verbose"])).is_err());
    }

    #[test]
    fn test_ingest_stats() {
        let mut stats = IngestStats::default();
        stats.record(RecordOutcome::Inserted);
        stats.record(RecordOutcome::Inserted);
        stats.record(RecordOutcome::Duplicate);
        stats.record(RecordOutcome::Ignored);
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.duplicate, 1);
        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.suppressed, 0);
    }
}
