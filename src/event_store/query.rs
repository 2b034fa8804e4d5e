//! Read query shapes
//!
//! Two access patterns: the most recent N events overall, or every event of
//! the N most recently active tasks. Limits are always bound, never formatted
//! into the SQL text.

use super::EventStoreError;

/// Most recent rows by insertion order, re-sorted by time.
/// A `NULL` limit returns every row.
pub const RECENT_EVENTS: &str = r#"
SELECT data FROM (
    SELECT *
    FROM events
    ORDER BY id DESC
    LIMIT $1
) subevents
ORDER BY time ASC
"#;

/// All events of the N tasks with the latest activity.
pub const RECENT_TASK_EVENTS: &str = r#"
SELECT data
FROM events
WHERE uuid IN (
    SELECT uuid FROM (
        SELECT DISTINCT ON (uuid) uuid, time
        FROM events
        ORDER BY uuid, time DESC
    ) uuid_list
    ORDER BY time DESC
    LIMIT $1
)
ORDER BY time ASC
"#;

/// `max_events` value meaning "no limit"
pub const UNLIMITED: i64 = -1;

/// Which read path a fetch takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchQuery {
    /// Most recent events overall; `None` means all of them
    RecentEvents { limit: Option<i64> },

    /// Every event belonging to the most recently active tasks
    RecentTasks { limit: i64 },
}

impl FetchQuery {
    /// Select the read path from dashboard limits.
    ///
    /// A non-zero `max_events` wins and `max_tasks` is ignored; `-1` lifts the
    /// limit. With `max_events == 0` the task grouping path is used.
    pub fn new(max_events: i64, max_tasks: i64) -> Result<Self, EventStoreError> {
        match max_events {
            0 if max_tasks < 0 => Err(EventStoreError::InvalidQuery(format!(
                "max_tasks must not be negative (got {max_tasks})"
            ))),
            0 => Ok(FetchQuery::RecentTasks { limit: max_tasks }),
            UNLIMITED => Ok(FetchQuery::RecentEvents { limit: None }),
            n if n < 0 => Err(EventStoreError::InvalidQuery(format!(
                "max_events must be positive or {UNLIMITED} (got {n})"
            ))),
            n => Ok(FetchQuery::RecentEvents { limit: Some(n) }),
        }
    }

    pub(crate) fn sql(&self) -> &'static str {
        match self {
            FetchQuery::RecentEvents { .. } => RECENT_EVENTS,
            FetchQuery::RecentTasks { .. } => RECENT_TASK_EVENTS,
        }
    }

    pub(crate) fn limit(&self) -> Option<i64> {
        match *self {
            FetchQuery::RecentEvents { limit } => limit,
            FetchQuery::RecentTasks { limit } => Some(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_events_mode() {
        let query = FetchQuery::new(25, 10).unwrap();
        assert_eq!(query, FetchQuery::RecentEvents { limit: Some(25) });
        assert_eq!(query.sql(), RECENT_EVENTS);
        assert_eq!(query.limit(), Some(25));
    }

    #[test]
    fn test_unlimited_binds_null() {
        let query = FetchQuery::new(UNLIMITED, 10).unwrap();
        assert_eq!(query, FetchQuery::RecentEvents { limit: None });
        assert_eq!(query.limit(), None);
    }

    #[test]
    fn test_zero_events_selects_task_mode() {
        let query = FetchQuery::new(0, 2).unwrap();
        assert_eq!(query, FetchQuery::RecentTasks { limit: 2 });
        assert_eq!(query.sql(), RECENT_TASK_EVENTS);
        assert_eq!(query.limit(), Some(2));
    }

    #[test]
    fn test_negative_limits_rejected() {
        assert!(matches!(
            FetchQuery::new(-5, 10),
            Err(EventStoreError::InvalidQuery(_))
        ));
        assert!(matches!(
            FetchQuery::new(0, -1),
            Err(EventStoreError::InvalidQuery(_))
        ));
        // max_tasks is irrelevant in event mode
        assert!(FetchQuery::new(3, -1).is_ok());
    }

    #[test]
    fn test_queries_are_parameterized() {
        assert!(RECENT_EVENTS.contains("LIMIT $1"));
        assert!(RECENT_TASK_EVENTS.contains("LIMIT $1"));
    }
}
