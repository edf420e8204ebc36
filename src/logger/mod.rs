//! Logger facade and its collaborators.

pub mod client;
pub mod sink;
pub mod store;

pub use client::{ClientLogger, LoggerOptions};
pub use sink::{ChildLogger, LogSink, Logger, merge_context};
pub use store::{
    DEFAULT_STORE_CAPACITY, DEFAULT_STORE_KEY, FileLogStore, LocalLogStore, MemoryLogStore,
};
