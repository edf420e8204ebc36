//! Domain layer for rask-client-telemetry.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEntry`: the unit flowing through the transport
//! - `LogLevel`: ordered severity (Debug < Info < Warn < Error < Fatal)
//! - `LogSource`: where an entry originated
//! - `TelemetryError`: top-level error type

pub mod error;
pub mod log_entry;
pub mod log_level;

pub use error::TelemetryError;
pub use log_entry::{LogEntry, LogSource};
pub use log_level::LogLevel;
