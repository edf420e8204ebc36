use parking_lot::Mutex;
use rask_client_telemetry::interceptor::{Console, ConsoleArg, ConsoleInterceptor, ConsoleMethod};
use rask_client_telemetry::logger::LogSink;
use rask_client_telemetry::{LogLevel, LogSource};
use serde_json::{Map, Value, json};
use serial_test::serial;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    level: LogLevel,
    message: String,
    context: Option<Map<String, Value>>,
    source: LogSource,
}

#[derive(Default)]
struct RecorderSink {
    events: Mutex<Vec<Recorded>>,
    // Logs back into this console on every event when set.
    echo: Option<Arc<Console>>,
    panic_once: AtomicBool,
    // Sleeps inside `emit` for this message.
    stall_on: Option<(&'static str, Duration)>,
    stalled: AtomicBool,
}

impl RecorderSink {
    fn echoing(console: Arc<Console>) -> Self {
        Self {
            echo: Some(console),
            ..Self::default()
        }
    }

    fn panicking_once() -> Self {
        Self {
            panic_once: AtomicBool::new(true),
            ..Self::default()
        }
    }

    fn stalling(message: &'static str, pause: Duration) -> Self {
        Self {
            stall_on: Some((message, pause)),
            ..Self::default()
        }
    }

    fn events(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }
}

impl LogSink for RecorderSink {
    fn emit(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<Map<String, Value>>,
        source: LogSource,
    ) {
        if self.panic_once.swap(false, Ordering::SeqCst) {
            panic!("sink failure");
        }
        if let Some((stall_message, pause)) = self.stall_on
            && stall_message == message
        {
            self.stalled.store(true, Ordering::SeqCst);
            thread::sleep(pause);
        }
        self.events.lock().push(Recorded {
            level,
            message: message.to_string(),
            context,
            source,
        });
        if let Some(console) = &self.echo {
            console.error(&["echo from sink".into()]);
        }
    }
}

fn boom(message: &'static str) {
    panic!("{message}");
}

fn setup() -> (Arc<Console>, ConsoleInterceptor, Arc<RecorderSink>) {
    let console = Arc::new(Console::new());
    let interceptor = ConsoleInterceptor::new(Arc::clone(&console)).capture_panics(false);
    (console, interceptor, Arc::new(RecorderSink::default()))
}

#[test]
#[serial]
fn test_console_log_forwards_one_debug_entry() {
    let (console, interceptor, sink) = setup();
    interceptor.install(sink.clone());

    console.log(&["hello".into(), json!(42).into()]);

    assert_eq!(
        sink.events(),
        vec![Recorded {
            level: LogLevel::Debug,
            message: "hello 42".to_string(),
            context: None,
            source: LogSource::Console,
        }]
    );
}

#[test]
#[serial]
fn test_method_levels() {
    let (console, interceptor, sink) = setup();
    interceptor.install(sink.clone());

    for method in ConsoleMethod::ALL {
        console.call(method, &[method.name().into()]);
    }

    let levels: Vec<LogLevel> = sink.events().iter().map(|e| e.level).collect();
    assert_eq!(
        levels,
        vec![
            LogLevel::Debug,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error
        ]
    );
}

#[test]
#[serial]
fn test_trailing_object_becomes_context() {
    let (console, interceptor, sink) = setup();
    interceptor.install(sink.clone());

    console.info(&["user signed in".into(), json!({"userId": 7}).into()]);

    let event = &sink.events()[0];
    assert_eq!(event.message, "user signed in");
    assert_eq!(event.context, json!({"userId": 7}).as_object().cloned());
}

#[test]
#[serial]
fn test_double_install_does_not_double_forward() {
    let (console, interceptor, first) = setup();
    let second = Arc::new(RecorderSink::default());
    let original = console.binding(ConsoleMethod::Warn);

    interceptor.install(first.clone());
    interceptor.install(second.clone());
    console.warn(&["once".into()]);

    assert!(first.events().is_empty());
    assert_eq!(second.events().len(), 1);

    interceptor.uninstall();
    assert!(Arc::ptr_eq(&console.binding(ConsoleMethod::Warn), &original));
}

#[test]
#[serial]
fn test_uninstall_restores_original_bindings() {
    let (console, interceptor, sink) = setup();
    let originals = ConsoleMethod::ALL.map(|method| console.binding(method));

    interceptor.install(sink.clone());
    assert!(interceptor.is_active());
    assert!(!Arc::ptr_eq(&console.binding(ConsoleMethod::Log), &originals[0]));

    interceptor.uninstall();
    assert!(!interceptor.is_active());
    for (method, original) in ConsoleMethod::ALL.into_iter().zip(&originals) {
        assert!(Arc::ptr_eq(&console.binding(method), original), "{}", method.name());
    }

    console.log(&["after".into()]);
    assert!(sink.events().is_empty());
}

#[test]
#[serial]
fn test_originals_still_receive_calls() {
    let console = Arc::new(Console::new());
    let seen = Arc::new(Mutex::new(Vec::<Vec<ConsoleArg>>::new()));
    let recorder = Arc::clone(&seen);
    console.set_binding(
        ConsoleMethod::Log,
        Arc::new(move |args: &[ConsoleArg]| recorder.lock().push(args.to_vec())),
    );

    let interceptor = ConsoleInterceptor::new(Arc::clone(&console)).capture_panics(false);
    interceptor.install(Arc::new(RecorderSink::default()));
    console.log(&["visible".into(), ConsoleArg::Undefined]);

    assert_eq!(*seen.lock(), vec![vec!["visible".into(), ConsoleArg::Undefined]]);
}

#[test]
#[serial]
fn test_sink_logging_to_console_does_not_recurse() {
    let console = Arc::new(Console::new());
    let interceptor = ConsoleInterceptor::new(Arc::clone(&console)).capture_panics(false);
    let sink = Arc::new(RecorderSink::echoing(Arc::clone(&console)));
    interceptor.install(sink.clone());

    console.error(&["outer".into()]);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, "outer");
}

#[test]
#[serial]
fn test_dispatch_flag_resets_after_sink_panic() {
    let console = Arc::new(Console::new());
    let interceptor = ConsoleInterceptor::new(Arc::clone(&console)).capture_panics(false);
    let sink = Arc::new(RecorderSink::panicking_once());
    interceptor.install(sink.clone());

    let result = panic::catch_unwind(AssertUnwindSafe(|| console.log(&["first".into()])));
    assert!(result.is_err());

    console.log(&["second".into()]);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, "second");
}

#[test]
#[serial]
fn test_panics_are_reported_as_uncaught_errors() {
    let console = Arc::new(Console::new());
    let interceptor = ConsoleInterceptor::new(Arc::clone(&console));
    let sink = Arc::new(RecorderSink::default());
    interceptor.install(sink.clone());

    let result = panic::catch_unwind(|| boom("kaboom"));
    assert!(result.is_err());
    interceptor.uninstall();

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level, LogLevel::Error);
    assert_eq!(events[0].source, LogSource::UncaughtError);
    assert_eq!(events[0].message, "Uncaught panic: kaboom");
    let context = events[0].context.as_ref().unwrap();
    assert!(context["location"].as_str().unwrap().contains("interceptor_test.rs"));

    // Hook restored: later panics are no longer forwarded.
    let _ = panic::catch_unwind(|| boom("after uninstall"));
    assert_eq!(sink.events().len(), 1);
}

#[test]
#[serial]
fn test_unhandled_rejection_only_while_active() {
    let (_console, interceptor, sink) = setup();

    interceptor.report_unhandled_rejection("ignored");
    assert!(sink.events().is_empty());

    interceptor.install(sink.clone());
    interceptor.report_unhandled_rejection("db connection lost");

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, "Unhandled rejection: db connection lost");
    assert_eq!(events[0].source, LogSource::UnhandledRejection);
    assert_eq!(
        events[0].context,
        json!({"reason": "db connection lost"}).as_object().cloned()
    );
}

#[test]
#[serial]
fn test_drop_uninstalls() {
    let console = Arc::new(Console::new());
    let original = console.binding(ConsoleMethod::Info);
    {
        let interceptor = ConsoleInterceptor::new(Arc::clone(&console)).capture_panics(false);
        interceptor.install(Arc::new(RecorderSink::default()));
    }
    assert!(Arc::ptr_eq(&console.binding(ConsoleMethod::Info), &original));
}

#[test]
#[serial]
fn test_concurrent_threads_are_forwarded_independently() {
    let console = Arc::new(Console::new());
    let interceptor = ConsoleInterceptor::new(Arc::clone(&console)).capture_panics(false);
    let sink = Arc::new(RecorderSink::stalling("slow", Duration::from_millis(300)));
    interceptor.install(sink.clone());

    thread::scope(|scope| {
        let slow_console = Arc::clone(&console);
        let slow = scope.spawn(move || slow_console.log(&["slow".into()]));

        while !sink.stalled.load(Ordering::SeqCst) {
            thread::yield_now();
        }
        // The other thread is still inside the sink.
        console.warn(&["fast".into()]);

        slow.join().unwrap();
    });

    let mut messages: Vec<String> = sink.events().into_iter().map(|e| e.message).collect();
    messages.sort();
    assert_eq!(messages, vec!["fast".to_string(), "slow".to_string()]);
}
