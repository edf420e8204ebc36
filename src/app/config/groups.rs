use crate::domain::LogLevel as EntryLevel;
use crate::redaction::Preset;
use crate::transport::TransportProfile;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchingModeName {
    Immediate,
    Count,
    Time,
}

impl FromStr for BatchingModeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "count" => Ok(Self::Count),
            "time" => Ok(Self::Time),
            other => Err(format!(
                "unknown batching mode '{other}' (expected immediate, count or time)"
            )),
        }
    }
}

impl fmt::Display for BatchingModeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Immediate => "immediate",
            Self::Count => "count",
            Self::Time => "time",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    pub endpoint: String,
    pub profile: TransportProfile,
    /// Falls back to the profile's mode when unset.
    pub mode: Option<BatchingModeName>,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub compression: bool,
    pub compression_threshold: usize,
    pub timeout_ms: u64,

    #[serde(skip)]
    pub flush_interval: Duration,
    #[serde(skip)]
    pub timeout: Duration,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/logs".to_string(),
            profile: TransportProfile::Browser,
            mode: None,
            batch_size: 10,
            flush_interval_ms: 5000,
            compression: false,
            compression_threshold: 100,
            timeout_ms: 10_000,
            flush_interval: Duration::from_millis(5000),
            timeout: Duration::from_millis(10_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub enabled: bool,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    pub jitter: bool,

    #[serde(skip)]
    pub initial_delay: Duration,
    #[serde(skip)]
    pub max_delay: Duration,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: false,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub pattern: String,
    pub replacement: String,
    /// Restricts the rule to values under these keys.
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Overrides applied on top of `preset`. Unset values keep the preset's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionSection {
    pub preset: Preset,
    pub sensitive_fields: Vec<String>,
    pub sensitive_headers: Vec<String>,
    pub patterns: Vec<PatternEntry>,
    pub max_depth: Option<usize>,
    pub sampling_rate: Option<f64>,
    pub sampling_urls: Vec<String>,
    pub max_body_size: Option<i64>,
    pub read_timeout_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSection {
    pub min_level: EntryLevel,
    pub console: bool,
    pub local_store_path: Option<PathBuf>,
    pub local_store_capacity: usize,
    /// Merged under every entry's own context.
    pub context: Map<String, Value>,
}

impl Default for LoggerSection {
    fn default() -> Self {
        Self {
            min_level: EntryLevel::Info,
            console: true,
            local_store_path: None,
            local_store_capacity: crate::logger::DEFAULT_STORE_CAPACITY,
            context: Map::new(),
        }
    }
}
