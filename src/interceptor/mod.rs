//! Console and panic capture.
//!
//! A [`Console`] holds one replaceable binding per method. While a
//! [`ConsoleInterceptor`] is active, every call still reaches the original
//! binding and is additionally forwarded to a log sink.

pub mod console;
pub mod format;
pub mod interceptor;

pub use console::{Console, ConsoleFn, ConsoleMethod};
pub use format::{ConsoleArg, format_console_args, render_args};
pub use interceptor::ConsoleInterceptor;
