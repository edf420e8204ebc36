use crate::domain::{LogLevel, LogSource};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Anything that accepts finished log events.
pub trait LogSink: Send + Sync {
    fn emit(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<Map<String, Value>>,
        source: LogSource,
    );
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn emit(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<Map<String, Value>>,
        source: LogSource,
    ) {
        (**self).emit(level, message, context, source);
    }
}

/// The logging contract exposed to application code.
///
/// Implementations never panic and never surface errors to the caller.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: Option<Map<String, Value>>);

    /// Returns a logger that merges `context` into every call.
    fn child(&self, context: Map<String, Value>) -> ChildLogger;

    fn debug(&self, message: &str, context: Option<Map<String, Value>>) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: Option<Map<String, Value>>) {
        self.log(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: Option<Map<String, Value>>) {
        self.log(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: Option<Map<String, Value>>) {
        self.log(LogLevel::Error, message, context);
    }

    fn fatal(&self, message: &str, context: Option<Map<String, Value>>) {
        self.log(LogLevel::Fatal, message, context);
    }
}

/// A logger bound to extra context; call-site context wins on key clashes.
#[derive(Clone)]
pub struct ChildLogger {
    parent: Arc<dyn LogSink>,
    context: Map<String, Value>,
}

impl ChildLogger {
    pub fn new(parent: Arc<dyn LogSink>, context: Map<String, Value>) -> Self {
        Self { parent, context }
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }
}

impl Logger for ChildLogger {
    fn log(&self, level: LogLevel, message: &str, context: Option<Map<String, Value>>) {
        let merged = merge_context(&self.context, context);
        self.parent
            .emit(level, message, Some(merged), LogSource::Api);
    }

    fn child(&self, context: Map<String, Value>) -> ChildLogger {
        ChildLogger {
            parent: self.parent.clone(),
            context: merge_context(&self.context, Some(context)),
        }
    }
}

/// Overlays `overrides` on top of `base`.
pub fn merge_context(
    base: &Map<String, Value>,
    overrides: Option<Map<String, Value>>,
) -> Map<String, Value> {
    let mut merged = base.clone();
    if let Some(overrides) = overrides {
        merged.extend(overrides);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(LogLevel, String, Option<Map<String, Value>>)>>);

    impl LogSink for Recorder {
        fn emit(
            &self,
            level: LogLevel,
            message: &str,
            context: Option<Map<String, Value>>,
            _source: LogSource,
        ) {
            self.0.lock().push((level, message.to_string(), context));
        }
    }

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_child_merges_context_with_call_site_precedence() {
        let recorder = Arc::new(Recorder::default());
        let child = ChildLogger::new(recorder.clone(), map(json!({"svc": "web", "a": 1})));
        let grandchild = child.child(map(json!({"req": "r1"})));

        grandchild.warn("slow", Some(map(json!({"a": 2}))));

        let events = recorder.0.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, LogLevel::Warn);
        assert_eq!(
            events[0].2,
            Some(map(json!({"svc": "web", "a": 2, "req": "r1"})))
        );
    }
}
