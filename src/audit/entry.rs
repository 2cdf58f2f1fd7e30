//! Audit entry and query types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audit::level::LogLevel;

/// One immutable row of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub level: LogLevel,
    pub event: String,
    /// Structured payload. Rows whose stored text is not JSON come back as a JSON string.
    pub data: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Raw row as stored in SQLite.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LogRow {
    pub id: i64,
    pub level: Option<String>,
    pub event: Option<String>,
    pub data: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<LogRow> for LogEntry {
    fn from(row: LogRow) -> Self {
        let data = row.data.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(Value::String(raw))
        });

        Self {
            id: row.id,
            level: row
                .level
                .as_deref()
                .map(LogLevel::parse_or_info)
                .unwrap_or_default(),
            event: row.event.unwrap_or_default(),
            data,
            timestamp: row.timestamp,
        }
    }
}

/// Filters for [`AuditLog::get_logs`](crate::audit::AuditLog::get_logs).
///
/// All filters are optional and combined with AND.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogQuery {
    /// Exact level match.
    pub level: Option<LogLevel>,
    /// Exact event tag match.
    pub event: Option<String>,
    /// Substring match within the stored data payload.
    #[serde(alias = "search")]
    pub search_term: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            level: None,
            event: None,
            search_term: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(data: Option<&str>, level: Option<&str>) -> LogRow {
        LogRow {
            id: 7,
            level: level.map(str::to_string),
            event: Some("ApiClientRetry".into()),
            data: data.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_row_decodes_json_payload() {
        let entry = LogEntry::from(row(Some(r#"{"attempt":2}"#), Some("WARNING")));
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.data, Some(json!({"attempt": 2})));
    }

    #[test]
    fn test_row_falls_back_to_raw_text() {
        let entry = LogEntry::from(row(Some("not json {"), None));
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.data, Some(Value::String("not json {".into())));
    }

    #[test]
    fn test_query_defaults() {
        let query = LogQuery::new();
        assert_eq!(query.limit, 50);
        assert_eq!(query.offset, 0);
        assert!(query.level.is_none());

        let query = LogQuery::new().event("heartbeat").limit(5);
        assert_eq!(query.event.as_deref(), Some("heartbeat"));
        assert_eq!(query.limit, 5);
    }

    #[test]
    fn test_query_accepts_short_search_name() {
        let query: LogQuery =
            serde_json::from_value(json!({"search": "timeout", "level": "ERROR", "limit": 5})).unwrap();
        assert_eq!(query.search_term.as_deref(), Some("timeout"));
        assert_eq!(query.level, Some(LogLevel::Error));
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn test_query_rejects_negative_paging() {
        assert!(serde_json::from_value::<LogQuery>(json!({"limit": -1})).is_err());
        assert!(serde_json::from_value::<LogQuery>(json!({"offset": -5})).is_err());
    }
}
