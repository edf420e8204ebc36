use super::{Config, ConfigError, LogFormat, LogLevel};
use super::groups::{BatchingModeName, TransportSection};
use crate::redaction::Preset;
use crate::transport::TransportProfile;
use clap::Parser;
use std::path::PathBuf;

/// Relays log lines from stdin to a telemetry collector.
///
/// Settings are layered: server-profile defaults (or `--config` TOML),
/// then `TELEMETRY_*` variables, then flags given here.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (optional)
    #[arg(long, env = "TELEMETRY_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Collector endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Transport profile (browser or server)
    #[arg(long)]
    pub profile: Option<TransportProfile>,

    /// Batching mode
    #[arg(long, value_enum)]
    pub mode: Option<BatchingModeName>,

    /// Entries per batch in count mode
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Flush interval in milliseconds in time mode
    #[arg(long)]
    pub flush_interval_ms: Option<u64>,

    /// Gzip large batches
    #[arg(long)]
    pub compression: bool,

    /// Disable delivery retries
    #[arg(long)]
    pub no_retry: bool,

    /// Redaction preset
    #[arg(long)]
    pub preset: Option<Preset>,

    /// Level of the relay's own diagnostics
    #[arg(long, env = "LOG_LEVEL", value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Format of the relay's own diagnostics
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Resolves the final configuration for this invocation.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            None => Config {
                transport: TransportSection {
                    profile: TransportProfile::Server,
                    ..TransportSection::default()
                },
                ..Config::default()
            },
        };
        config.apply_env()?;
        self.apply_overrides(&mut config);
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.transport.endpoint = endpoint.clone();
        }
        if let Some(profile) = self.profile {
            config.transport.profile = profile;
        }
        if let Some(mode) = self.mode {
            config.transport.mode = Some(mode);
        }
        if let Some(batch_size) = self.batch_size {
            config.transport.batch_size = batch_size;
        }
        if let Some(interval) = self.flush_interval_ms {
            config.transport.flush_interval_ms = interval;
        }
        if self.compression {
            config.transport.compression = true;
        }
        if self.no_retry {
            config.retry.enabled = false;
        }
        if let Some(preset) = self.preset {
            config.redaction.preset = preset;
        }
    }
}
