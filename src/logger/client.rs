use super::sink::{ChildLogger, LogSink, Logger, merge_context};
use super::store::LocalLogStore;
use crate::domain::{LogEntry, LogLevel, LogSource};
use crate::redaction::{RedactionPolicy, redact_map};
use crate::transport::{HttpDelivery, LogDelivery, Transport, TransportStats};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub min_level: LogLevel,
    pub console: bool,
    pub default_context: Map<String, Value>,
    pub redaction: Option<Arc<RedactionPolicy>>,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            console: true,
            default_context: Map::new(),
            redaction: None,
        }
    }
}

struct LoggerInner<D: LogDelivery> {
    options: LoggerOptions,
    transport: Option<Arc<Transport<D>>>,
    store: Option<Arc<dyn LocalLogStore>>,
}

impl<D: LogDelivery> LogSink for LoggerInner<D> {
    fn emit(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<Map<String, Value>>,
        source: LogSource,
    ) {
        if level < self.options.min_level {
            return;
        }

        let mut context = merge_context(&self.options.default_context, context);
        if let Some(policy) = &self.options.redaction {
            context = redact_map(&context, policy);
        }
        let entry = LogEntry::new(level, message, Some(context), source);

        if self.options.console {
            write_console(&entry);
        }
        if let Some(store) = &self.store {
            store.append(&entry);
        }
        if let Some(transport) = &self.transport {
            transport.enqueue(entry);
        }
    }
}

/// Application-facing logger: filters by level, merges default context,
/// redacts, then fans out to console output, the local store and the
/// transport.
pub struct ClientLogger<D: LogDelivery = HttpDelivery> {
    inner: Arc<LoggerInner<D>>,
}

impl<D: LogDelivery> Clone for ClientLogger<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: LogDelivery> fmt::Debug for ClientLogger<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientLogger")
            .field("options", &self.inner.options)
            .field("transport", &self.inner.transport.is_some())
            .field("store", &self.inner.store.is_some())
            .finish()
    }
}

impl<D: LogDelivery> ClientLogger<D> {
    pub fn new(
        options: LoggerOptions,
        transport: Option<Arc<Transport<D>>>,
        store: Option<Arc<dyn LocalLogStore>>,
    ) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                options,
                transport,
                store,
            }),
        }
    }

    pub fn options(&self) -> &LoggerOptions {
        &self.inner.options
    }

    pub fn transport(&self) -> Option<&Arc<Transport<D>>> {
        self.inner.transport.as_ref()
    }

    pub fn store(&self) -> Option<&Arc<dyn LocalLogStore>> {
        self.inner.store.as_ref()
    }

    /// This logger as a shareable sink, e.g. for the console interceptor.
    pub fn sink(&self) -> Arc<dyn LogSink> {
        self.inner.clone()
    }

    pub fn stats(&self) -> Option<TransportStats> {
        self.inner.transport.as_ref().map(|t| t.stats())
    }

    pub async fn flush(&self) {
        if let Some(transport) = &self.inner.transport {
            transport.flush().await;
        }
    }

    pub async fn destroy(&self) {
        if let Some(transport) = &self.inner.transport {
            transport.destroy().await;
        }
    }
}

impl<D: LogDelivery> LogSink for ClientLogger<D> {
    fn emit(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<Map<String, Value>>,
        source: LogSource,
    ) {
        self.inner.emit(level, message, context, source);
    }
}

impl<D: LogDelivery> Logger for ClientLogger<D> {
    fn log(&self, level: LogLevel, message: &str, context: Option<Map<String, Value>>) {
        self.inner.emit(level, message, context, LogSource::Api);
    }

    fn child(&self, context: Map<String, Value>) -> ChildLogger {
        ChildLogger::new(self.sink(), context)
    }
}

fn write_console(entry: &LogEntry) {
    let context = entry
        .context()
        .map(|ctx| Value::Object(ctx.clone()).to_string())
        .unwrap_or_default();
    let source = entry.source();
    let message = entry.message();

    match entry.level() {
        LogLevel::Debug => {
            tracing::debug!(target: "client_log", ?source, context = %context, "{}", message);
        }
        LogLevel::Info => {
            tracing::info!(target: "client_log", ?source, context = %context, "{}", message);
        }
        LogLevel::Warn => {
            tracing::warn!(target: "client_log", ?source, context = %context, "{}", message);
        }
        LogLevel::Error | LogLevel::Fatal => {
            tracing::error!(
                target: "client_log",
                ?source,
                fatal = entry.level() == LogLevel::Fatal,
                context = %context,
                "{}",
                message
            );
        }
    }
}
