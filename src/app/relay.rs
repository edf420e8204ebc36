use crate::domain::LogLevel;
use serde::Deserialize;
use serde_json::{Map, Value};

/// One line of relay input, ready to be logged.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayLine {
    pub level: LogLevel,
    pub message: String,
    pub context: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct JsonLine {
    #[serde(default)]
    level: Option<String>,
    message: String,
    #[serde(default)]
    context: Option<Map<String, Value>>,
}

/// Parses `{"level":..,"message":..,"context":{..}}` or falls back to the
/// raw text at info level. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<RelayLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with('{')
        && let Ok(parsed) = serde_json::from_str::<JsonLine>(trimmed)
    {
        let level = parsed
            .level
            .and_then(|level| level.parse().ok())
            .unwrap_or(LogLevel::Info);
        return Some(RelayLine {
            level,
            message: parsed.message,
            context: parsed.context,
        });
    }

    Some(RelayLine {
        level: LogLevel::Info,
        message: trimmed.to_string(),
        context: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_line() {
        let line = parse_line(r#"{"level":"warn","message":"disk low","context":{"free":3}}"#).unwrap();
        assert_eq!(line.level, LogLevel::Warn);
        assert_eq!(line.message, "disk low");
        assert_eq!(line.context, json!({"free": 3}).as_object().cloned());
    }

    #[test]
    fn test_unknown_level_defaults_to_info() {
        let line = parse_line(r#"{"level":"loud","message":"x"}"#).unwrap();
        assert_eq!(line.level, LogLevel::Info);
    }

    #[test]
    fn test_plain_text_and_blank() {
        let line = parse_line("  server started  ").unwrap();
        assert_eq!(line.level, LogLevel::Info);
        assert_eq!(line.message, "server started");
        assert!(line.context.is_none());

        assert!(parse_line("   ").is_none());
    }

    #[test]
    fn test_json_without_message_is_plain_text() {
        let line = parse_line(r#"{"level":"error"}"#).unwrap();
        assert_eq!(line.message, r#"{"level":"error"}"#);
    }
}
