use super::config::{LogFormat, LogLevel};
use super::initialization::InitializationError;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Per-target filter overrides layered over a default level.
pub struct LoggingSystem {
    directives: Arc<RwLock<Vec<(String, LogLevel)>>>,
    fallback_level: LogLevel,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: Arc::new(RwLock::new(Vec::new())),
            fallback_level: LogLevel::Info,
        }
    }

    /// Adds a `target=level` directive. Malformed directives are skipped;
    /// an unknown level falls back to `info`.
    pub fn add_directive(&self, directive: &str) {
        let Some((target, level)) = directive.split_once('=') else {
            eprintln!("Warning: invalid directive '{directive}', skipping");
            return;
        };
        let target = target.trim();
        if target.is_empty() {
            eprintln!("Warning: empty target in directive '{directive}', skipping");
            return;
        }

        let level = <LogLevel as clap::ValueEnum>::from_str(level.trim(), true).unwrap_or_else(|_| {
            eprintln!("Warning: invalid level in '{directive}', using default level");
            self.fallback_level
        });
        self.directives.write().push((target.to_string(), level));
    }

    /// Quiets the HTTP stack, which is chatty at debug.
    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        for target in ["hyper", "hyper_util", "reqwest", "h2", "rustls"] {
            directives.push((target.to_string(), LogLevel::Warn));
        }
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();
        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        for (target, level) in directives.iter() {
            filter_parts.push(format!("{target}={}", level.as_str()));
        }
        filter_parts.join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }

    /// Installs the global subscriber. `RUST_LOG` wins over the built
    /// filter when set.
    pub fn initialize_tracing(
        &self,
        default_level: LogLevel,
        format: LogFormat,
    ) -> Result<(), InitializationError> {
        let filter_string = self.build_filter_string(default_level);
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&filter_string).map_err(|e| {
                InitializationError::LoggingInitFailed {
                    details: format!("Failed to create EnvFilter with '{filter_string}'"),
                    source: Box::new(e),
                }
            })?,
        };

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = match format {
            LogFormat::Text => registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr)
                        .compact(),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };

        result.map_err(|e| InitializationError::LoggingInitFailed {
            details: "Failed to set global tracing subscriber".to_string(),
            source: Box::new(e),
        })
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes tracing once per process; later calls report whether the
/// first one succeeded.
pub fn setup_logging_safe(level: LogLevel, format: LogFormat) -> Result<(), InitializationError> {
    use std::sync::Once;
    use std::sync::atomic::{AtomicBool, Ordering};

    static INIT: Once = Once::new();
    static INIT_SUCCESS: AtomicBool = AtomicBool::new(false);

    INIT.call_once(|| {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives();
        if logging_system.initialize_tracing(level, format).is_ok() {
            INIT_SUCCESS.store(true, Ordering::Release);
        }
    });

    if INIT_SUCCESS.load(Ordering::Acquire) {
        Ok(())
    } else {
        Err(InitializationError::LoggingInitFailed {
            details: "Logging system initialization failed".to_string(),
            source: Box::new(std::io::Error::other("Logging initialization error")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_valid_directive() {
        let logging_system = LoggingSystem::new();
        logging_system.add_directive("hyper=warn");
        logging_system.add_directive("reqwest=error");
        assert_eq!(logging_system.directive_count(), 2);
    }

    #[test]
    fn test_invalid_directives_fall_back_or_skip() {
        let logging_system = LoggingSystem::new();

        logging_system.add_directive("invalid");
        logging_system.add_directive("=warn");
        assert_eq!(logging_system.directive_count(), 0);

        logging_system.add_directive("target=loud");
        assert_eq!(logging_system.build_filter_string(LogLevel::Debug), "debug,target=info");
    }

    #[test]
    fn test_default_directives_quiet_http_stack() {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives();

        let filter = logging_system.build_filter_string(LogLevel::Debug);
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("reqwest=warn"));
        assert!(filter.contains("h2=warn"));
    }

    #[test]
    fn test_setup_logging_safe_is_idempotent() {
        let first = setup_logging_safe(LogLevel::Info, LogFormat::Text).is_ok();
        let second = setup_logging_safe(LogLevel::Debug, LogFormat::Json).is_ok();
        assert_eq!(first, second);
    }
}
