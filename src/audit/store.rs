//! SQLite-backed audit log.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tokio::sync::broadcast;

use crate::audit::entry::{LogEntry, LogQuery, LogRow};
use crate::audit::level::LogLevel;
use crate::config::schema::keys::CURRENT_LOG_LEVEL as CURRENT_LOG_LEVEL_KEY;
use crate::observability::metrics;
use crate::storage::Storage;

/// Capacity of the live update channel. Slow listeners skip entries beyond this.
const LIVE_CHANNEL_CAPACITY: usize = 256;

/// Filtering configuration for the audit writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoggerConfig {
    /// Entries ranked below this level are dropped before storage.
    pub min_level: LogLevel,
}

/// Append-only audit log with a dynamic severity filter and a live feed.
///
/// Cloning is cheap; all clones share the pool, the filter and the feed.
#[derive(Clone)]
pub struct AuditLog {
    pool: SqlitePool,
    logger: Arc<ArcSwap<LoggerConfig>>,
    live: broadcast::Sender<LogEntry>,
}

impl AuditLog {
    /// Create an audit log over the shared storage handle, filtering at `INFO`.
    pub fn new(storage: &Storage) -> Self {
        let (live, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
        Self {
            pool: storage.pool().clone(),
            logger: Arc::new(ArcSwap::from_pointee(LoggerConfig::default())),
            live,
        }
    }

    /// Current minimum level.
    pub fn min_level(&self) -> LogLevel {
        self.logger.load().min_level
    }

    /// Replace the logger configuration's minimum level.
    pub fn set_min_level(&self, level: LogLevel) {
        let previous = self.logger.swap(Arc::new(LoggerConfig { min_level: level }));
        if previous.min_level != level {
            tracing::info!(from = %previous.min_level, to = %level, "Audit log level changed");
        }
    }

    /// Reload the minimum level from the `currentLogLevel` config row.
    ///
    /// A missing row, an unknown name or a storage error all resolve to `INFO`.
    pub async fn refresh_min_level(&self) -> LogLevel {
        let stored: Result<Option<(Option<String>,)>, sqlx::Error> =
            sqlx::query_as("SELECT value FROM config WHERE key = ?")
                .bind(CURRENT_LOG_LEVEL_KEY)
                .fetch_optional(&self.pool)
                .await;

        let level = match stored {
            Ok(row) => row
                .and_then(|(value,)| value)
                .map(|name| LogLevel::parse_or_info(&name))
                .unwrap_or_default(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read log level, using INFO");
                LogLevel::default()
            }
        };
        self.set_min_level(level);
        level
    }

    /// Append an entry.
    ///
    /// Returns the new row id, or `None` when the entry was filtered out or
    /// could not be stored. Never fails.
    pub async fn add_log_entry(&self, level: LogLevel, event: &str, data: Option<Value>) -> Option<i64> {
        if !level.passes(self.min_level()) {
            metrics::record_audit_dropped();
            return None;
        }

        let payload = data.map(|value| value.to_string());

        let result = sqlx::query_as::<_, LogRow>(
            r#"
            INSERT INTO logs (level, event, data)
            VALUES (?, ?, ?)
            RETURNING id, level, event, data, timestamp
            "#,
        )
        .bind(level.as_str())
        .bind(event)
        .bind(payload)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => {
                let entry = LogEntry::from(row);
                let id = entry.id;
                metrics::record_audit_entry(level);
                // No listeners is not an error.
                let _ = self.live.send(entry);
                Some(id)
            }
            Err(e) => {
                tracing::error!(event = %event, level = %level, error = %e, "Failed to add log entry");
                None
            }
        }
    }

    /// Filtered, paginated retrieval, newest first.
    ///
    /// Storage failures are logged and yield an empty list.
    pub async fn get_logs(&self, query: &LogQuery) -> Vec<LogEntry> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, level, event, data, timestamp FROM logs");
        let mut separator = " WHERE ";

        if let Some(level) = query.level {
            builder.push(separator).push("level = ").push_bind(level.as_str());
            separator = " AND ";
        }
        if let Some(event) = &query.event {
            builder.push(separator).push("event = ").push_bind(event.clone());
            separator = " AND ";
        }
        if let Some(term) = &query.search_term {
            builder
                .push(separator)
                .push("data LIKE ")
                .push_bind(format!("%{}%", escape_like(term)))
                .push(" ESCAPE '\\'");
        }

        builder
            .push(" ORDER BY timestamp DESC, id DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        match builder.build_query_as::<LogRow>().fetch_all(&self.pool).await {
            Ok(rows) => rows.into_iter().map(LogEntry::from).collect(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to get logs");
                Vec::new()
            }
        }
    }

    /// The `limit` most recent entries.
    pub async fn get_recent_logs(&self, limit: u32) -> Vec<LogEntry> {
        self.get_logs(&LogQuery::new().limit(limit)).await
    }

    /// Receive every entry written from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.live.subscribe()
    }

    /// Maintenance delete of entries whose event matches a SQL `LIKE` pattern.
    ///
    /// Returns the number of removed rows; storage failures count as zero.
    pub async fn purge_events(&self, pattern: &str) -> u64 {
        match sqlx::query("DELETE FROM logs WHERE event LIKE ?")
            .bind(pattern)
            .execute(&self.pool)
            .await
        {
            Ok(result) => {
                tracing::info!(pattern = %pattern, removed = result.rows_affected(), "Purged audit entries");
                result.rows_affected()
            }
            Err(e) => {
                tracing::error!(pattern = %pattern, error = %e, "Failed to purge audit entries");
                0
            }
        }
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("min_level", &self.min_level())
            .field("listeners", &self.live.receiver_count())
            .finish()
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
