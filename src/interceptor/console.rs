use super::format::{ConsoleArg, render_args};
use crate::domain::LogLevel;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

pub type ConsoleFn = Arc<dyn Fn(&[ConsoleArg]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleMethod {
    Log,
    Debug,
    Info,
    Warn,
    Error,
}

impl ConsoleMethod {
    pub const ALL: [ConsoleMethod; 5] = [
        ConsoleMethod::Log,
        ConsoleMethod::Debug,
        ConsoleMethod::Info,
        ConsoleMethod::Warn,
        ConsoleMethod::Error,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// `log` is treated as debug output.
    pub fn level(self) -> LogLevel {
        match self {
            Self::Log | Self::Debug => LogLevel::Debug,
            Self::Info => LogLevel::Info,
            Self::Warn => LogLevel::Warn,
            Self::Error => LogLevel::Error,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A console: one replaceable binding per method.
pub struct Console {
    bindings: RwLock<[ConsoleFn; 5]>,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    /// Bindings write to `tracing` with target `console`.
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(ConsoleMethod::ALL.map(tracing_binding)),
        }
    }

    pub fn binding(&self, method: ConsoleMethod) -> ConsoleFn {
        Arc::clone(&self.bindings.read()[method.index()])
    }

    /// Replaces a binding and returns the previous one.
    pub fn set_binding(&self, method: ConsoleMethod, binding: ConsoleFn) -> ConsoleFn {
        std::mem::replace(&mut self.bindings.write()[method.index()], binding)
    }

    pub fn call(&self, method: ConsoleMethod, args: &[ConsoleArg]) {
        // Bindings may touch the console again, so call unlocked.
        let binding = self.binding(method);
        binding(args);
    }

    pub fn log(&self, args: &[ConsoleArg]) {
        self.call(ConsoleMethod::Log, args);
    }

    pub fn debug(&self, args: &[ConsoleArg]) {
        self.call(ConsoleMethod::Debug, args);
    }

    pub fn info(&self, args: &[ConsoleArg]) {
        self.call(ConsoleMethod::Info, args);
    }

    pub fn warn(&self, args: &[ConsoleArg]) {
        self.call(ConsoleMethod::Warn, args);
    }

    pub fn error(&self, args: &[ConsoleArg]) {
        self.call(ConsoleMethod::Error, args);
    }
}

fn tracing_binding(method: ConsoleMethod) -> ConsoleFn {
    Arc::new(move |args: &[ConsoleArg]| {
        let line = render_args(args);
        match method {
            ConsoleMethod::Log | ConsoleMethod::Debug => tracing::debug!(target: "console", "{}", line),
            ConsoleMethod::Info => tracing::info!(target: "console", "{}", line),
            ConsoleMethod::Warn => tracing::warn!(target: "console", "{}", line),
            ConsoleMethod::Error => tracing::error!(target: "console", "{}", line),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_set_binding_returns_previous() {
        let console = Console::new();
        let original = console.binding(ConsoleMethod::Warn);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let previous = console.set_binding(
            ConsoleMethod::Warn,
            Arc::new(move |args: &[ConsoleArg]| sink.lock().push(render_args(args))),
        );
        assert!(Arc::ptr_eq(&previous, &original));

        console.warn(&["careful".into()]);
        console.info(&["not captured".into()]);
        assert_eq!(*seen.lock(), vec!["careful".to_string()]);
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(ConsoleMethod::Log.level(), LogLevel::Debug);
        assert_eq!(ConsoleMethod::Debug.level(), LogLevel::Debug);
        assert_eq!(ConsoleMethod::Info.level(), LogLevel::Info);
        assert_eq!(ConsoleMethod::Warn.level(), LogLevel::Warn);
        assert_eq!(ConsoleMethod::Error.level(), LogLevel::Error);
    }
}
