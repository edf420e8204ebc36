use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Where a log entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    /// Captured from a console method by the interceptor.
    Console,
    /// Explicit call on the logger API.
    Api,
    /// Uncaught error (panic) reported by the interceptor.
    UncaughtError,
    /// Unhandled async failure reported by the interceptor.
    UnhandledRejection,
    /// Request/response line written by the HTTP-call logger.
    Http,
}

/// A single log event as it travels through the transport.
///
/// Entries are immutable once created; only their membership in the
/// transport buffer changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    id: String,
    timestamp: i64,
    level: LogLevel,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<Map<String, Value>>,
    source: LogSource,
}

impl LogEntry {
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        context: Option<Map<String, Value>>,
        source: LogSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            level,
            message: message.into(),
            context: context.filter(|ctx| !ctx.is_empty()),
            source,
        }
    }

    /// Rebuilds an entry with a known id and timestamp (e.g. read back from
    /// the local store).
    pub fn with_id(
        id: String,
        timestamp: i64,
        level: LogLevel,
        message: String,
        context: Option<Map<String, Value>>,
        source: LogSource,
    ) -> Self {
        Self {
            id,
            timestamp,
            level,
            message,
            context,
            source,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.context.as_ref()
    }

    pub fn source(&self) -> LogSource {
        self.source
    }

    /// Rough serialized size in bytes, used for drop reporting.
    pub fn estimated_size(&self) -> usize {
        let context_size = self
            .context
            .as_ref()
            .map_or(0, |ctx| Value::Object(ctx.clone()).to_string().len());
        self.id.len() + self.message.len() + context_size + 48
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_entry_has_unique_id_and_timestamp() {
        let a = LogEntry::new(LogLevel::Info, "a", None, LogSource::Api);
        let b = LogEntry::new(LogLevel::Info, "b", None, LogSource::Api);
        assert_ne!(a.id(), b.id());
        assert!(a.timestamp() > 0);
    }

    #[test]
    fn test_empty_context_is_dropped() {
        let entry = LogEntry::new(LogLevel::Warn, "m", Some(Map::new()), LogSource::Console);
        assert!(entry.context().is_none());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let mut ctx = Map::new();
        ctx.insert("user".to_string(), json!("alice"));
        let entry = LogEntry::with_id(
            "id-1".to_string(),
            1_700_000_000_000,
            LogLevel::Error,
            "boom".to_string(),
            Some(ctx),
            LogSource::UncaughtError,
        );

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "id-1",
                "timestamp": 1_700_000_000_000_i64,
                "level": "error",
                "message": "boom",
                "context": {"user": "alice"},
                "source": "uncaught_error"
            })
        );
    }
}
