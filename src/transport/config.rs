use super::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SERVER_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BATCH_THRESHOLD: usize = 10;
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Which host the transport runs in. Decides the default batching mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProfile {
    #[default]
    Browser,
    Server,
}

impl FromStr for TransportProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "server" => Ok(Self::Server),
            other => Err(format!("unknown transport profile: {other}")),
        }
    }
}

impl fmt::Display for TransportProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Browser => f.write_str("browser"),
            Self::Server => f.write_str("server"),
        }
    }
}

/// When buffered entries are flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchingMode {
    /// Flush after every enqueue.
    Immediate,
    /// Flush once the buffer holds `threshold` entries.
    Count { threshold: usize },
    /// Flush on a recurring timer.
    Time { interval: Duration },
}

impl BatchingMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Count { .. } => "count",
            Self::Time { .. } => "time",
        }
    }

    /// Whether a buffer of `len` entries should be flushed right away.
    pub fn is_triggered(&self, len: usize) -> bool {
        match self {
            Self::Immediate => len > 0,
            Self::Count { threshold } => len >= *threshold,
            Self::Time { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    pub endpoint: String,
    pub profile: TransportProfile,
    pub batching: BatchingMode,
    pub retry: RetryPolicy,
    pub compression: bool,
    /// Batches with more entries than this are gzip-compressed.
    pub compression_threshold: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl TransportConfig {
    /// Delivers every entry as soon as it is logged.
    pub fn browser(endpoint: impl Into<String>) -> Self {
        Self::with_profile(endpoint, TransportProfile::Browser)
    }

    /// Batches on a 5 second timer.
    pub fn server(endpoint: impl Into<String>) -> Self {
        Self::with_profile(endpoint, TransportProfile::Server)
    }

    pub fn with_profile(endpoint: impl Into<String>, profile: TransportProfile) -> Self {
        let batching = match profile {
            TransportProfile::Browser => BatchingMode::Immediate,
            TransportProfile::Server => BatchingMode::Time {
                interval: DEFAULT_SERVER_FLUSH_INTERVAL,
            },
        };

        Self {
            endpoint: endpoint.into(),
            profile,
            batching,
            retry: RetryPolicy::default(),
            compression: false,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: format!("rask-client-telemetry/{}", crate::VERSION),
        }
    }

    pub fn batching(mut self, batching: BatchingMode) -> Self {
        self.batching = batching;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
