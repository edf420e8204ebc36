use super::console::{Console, ConsoleFn, ConsoleMethod};
use super::format::{ConsoleArg, format_console_args};
use crate::domain::{LogLevel, LogSource};
use crate::logger::LogSink;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value, json};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

static NEXT_INTERCEPTOR_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Interceptors currently forwarding on this thread.
    static DISPATCHING: RefCell<HashSet<u64>> = RefCell::new(HashSet::new());
}

/// Marks an interceptor as forwarding on the current thread until dropped.
struct DispatchGuard(u64);

impl DispatchGuard {
    fn enter(id: u64) -> Option<Self> {
        DISPATCHING
            .try_with(|active| active.borrow_mut().insert(id))
            .unwrap_or(false)
            .then_some(Self(id))
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        // The thread-local is already gone during thread teardown.
        let _ = DISPATCHING.try_with(|active| active.borrow_mut().remove(&self.0));
    }
}

struct ForwardState {
    id: u64,
    sink: RwLock<Option<Arc<dyn LogSink>>>,
}

impl ForwardState {
    fn new() -> Self {
        Self {
            id: NEXT_INTERCEPTOR_ID.fetch_add(1, Ordering::Relaxed),
            sink: RwLock::new(None),
        }
    }

    /// Forwards unless this interceptor is already forwarding further up the
    /// current thread's stack; a sink that logs to the console must not loop
    /// back into itself. Other threads forward independently.
    fn forward(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<Map<String, Value>>,
        source: LogSource,
    ) {
        let Some(_reset) = DispatchGuard::enter(self.id) else {
            return;
        };

        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink.emit(level, message, context, source);
        }
    }
}

struct Installed {
    originals: [ConsoleFn; 5],
    previous_panic_hook: Option<Arc<PanicHook>>,
}

/// Routes console calls and panics into a [`LogSink`] while active.
///
/// Re-entrancy is tracked per instance and per thread: a console call made
/// from inside the sink is not forwarded again, while concurrent calls from
/// other threads are.
pub struct ConsoleInterceptor {
    console: Arc<Console>,
    state: Arc<ForwardState>,
    installed: Mutex<Option<Installed>>,
    capture_panics: bool,
}

impl fmt::Debug for ConsoleInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleInterceptor")
            .field("active", &self.is_active())
            .field("capture_panics", &self.capture_panics)
            .finish()
    }
}

impl ConsoleInterceptor {
    pub fn new(console: Arc<Console>) -> Self {
        Self {
            console,
            state: Arc::new(ForwardState::new()),
            installed: Mutex::new(None),
            capture_panics: true,
        }
    }

    /// Whether `install` also takes over the process panic hook.
    pub fn capture_panics(mut self, enabled: bool) -> Self {
        self.capture_panics = enabled;
        self
    }

    pub fn console(&self) -> &Arc<Console> {
        &self.console
    }

    pub fn is_active(&self) -> bool {
        self.installed.lock().is_some()
    }

    /// Starts forwarding to `sink`. Installing again while active only
    /// swaps the sink.
    pub fn install(&self, sink: Arc<dyn LogSink>) {
        *self.state.sink.write() = Some(sink);

        let mut installed = self.installed.lock();
        if installed.is_some() {
            return;
        }

        let originals = ConsoleMethod::ALL.map(|method| self.console.binding(method));
        for method in ConsoleMethod::ALL {
            let original = Arc::clone(&originals[method as usize]);
            self.console
                .set_binding(method, self.wrap(method, original));
        }

        let previous_panic_hook = self.capture_panics.then(|| self.install_panic_hook());

        *installed = Some(Installed {
            originals,
            previous_panic_hook,
        });
        tracing::debug!("Console interceptor installed");
    }

    /// Restores the saved console bindings and panic hook and drops the
    /// sink. No-op when inactive.
    pub fn uninstall(&self) {
        let Some(installed) = self.installed.lock().take() else {
            return;
        };

        for (method, original) in ConsoleMethod::ALL.into_iter().zip(installed.originals) {
            self.console.set_binding(method, original);
        }

        if let Some(previous) = installed.previous_panic_hook {
            panic::set_hook(Box::new(move |info| previous(info)));
        }

        *self.state.sink.write() = None;
        tracing::debug!("Console interceptor uninstalled");
    }

    /// Reports a failure from a detached task nobody awaited.
    pub fn report_unhandled_rejection<E: fmt::Display + ?Sized>(&self, reason: &E) {
        if !self.is_active() {
            return;
        }
        let reason = reason.to_string();
        let mut context = Map::new();
        context.insert("reason".into(), json!(reason));
        self.state.forward(
            LogLevel::Error,
            &format!("Unhandled rejection: {reason}"),
            Some(context),
            LogSource::UnhandledRejection,
        );
    }

    fn wrap(&self, method: ConsoleMethod, original: ConsoleFn) -> ConsoleFn {
        let state = Arc::clone(&self.state);
        Arc::new(move |args: &[ConsoleArg]| {
            original(args);
            let (message, context) = format_console_args(args);
            state.forward(method.level(), &message, context, LogSource::Console);
        })
    }

    fn install_panic_hook(&self) -> Arc<PanicHook> {
        let previous: Arc<PanicHook> = Arc::new(panic::take_hook());
        let chained = Arc::clone(&previous);
        let state = Arc::clone(&self.state);

        panic::set_hook(Box::new(move |info| {
            let (message, context) = describe_panic(info);
            state.forward(LogLevel::Error, &message, Some(context), LogSource::UncaughtError);
            chained(info);
        }));
        previous
    }
}

impl Drop for ConsoleInterceptor {
    fn drop(&mut self) {
        self.uninstall();
    }
}

fn describe_panic(info: &PanicHookInfo<'_>) -> (String, Map<String, Value>) {
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Box<dyn Any>".to_string());

    let mut context = Map::new();
    if let Some(location) = info.location() {
        context.insert("location".into(), json!(location.to_string()));
    }
    if let Some(thread) = std::thread::current().name() {
        context.insert("thread".into(), json!(thread));
    }
    (format!("Uncaught panic: {payload}"), context)
}
