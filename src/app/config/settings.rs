use super::ConfigError;
use super::groups::{
    BatchingModeName, LoggerSection, RedactionSection, RetrySection, TransportSection,
};
use super::serde_helpers::{
    load_env_list, load_env_opt, load_env_path_opt, load_env_string, load_env_var,
};
use crate::logger::LoggerOptions;
use crate::redaction::{PatternRule, RedactionPolicy, RedactionPolicyBuilder};
use crate::transport::{BatchingMode, RetryPolicy, TransportConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Complete telemetry configuration, loadable from TOML or `TELEMETRY_*`
/// environment variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportSection,
    pub retry: RetrySection,
    pub redaction: RedactionSection,
    pub logger: LoggerSection,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    /// Starts from `TELEMETRY_CONFIG` (inline TOML) when set, otherwise
    /// from defaults, then applies individual variables on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("TELEMETRY_CONFIG") {
            Ok(inline) => toml::from_str(&inline)?,
            Err(_) => Config::default(),
        };
        config.apply_env()?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays every `TELEMETRY_*` variable that is set.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        let transport = &mut self.transport;
        load_env_string("TELEMETRY_ENDPOINT", &mut transport.endpoint);
        load_env_var("TELEMETRY_PROFILE", &mut transport.profile)?;
        load_env_opt("TELEMETRY_BATCHING_MODE", &mut transport.mode)?;
        load_env_var("TELEMETRY_BATCH_SIZE", &mut transport.batch_size)?;
        load_env_var("TELEMETRY_FLUSH_INTERVAL_MS", &mut transport.flush_interval_ms)?;
        load_env_var("TELEMETRY_COMPRESSION", &mut transport.compression)?;
        load_env_var("TELEMETRY_TIMEOUT_MS", &mut transport.timeout_ms)?;

        let retry = &mut self.retry;
        load_env_var("TELEMETRY_RETRY_ENABLED", &mut retry.enabled)?;
        load_env_var("TELEMETRY_MAX_RETRIES", &mut retry.max_retries)?;
        load_env_var("TELEMETRY_RETRY_INITIAL_DELAY_MS", &mut retry.initial_delay_ms)?;
        load_env_var("TELEMETRY_RETRY_BACKOFF_MULTIPLIER", &mut retry.backoff_multiplier)?;
        load_env_var("TELEMETRY_RETRY_MAX_DELAY_MS", &mut retry.max_delay_ms)?;
        load_env_var("TELEMETRY_RETRY_JITTER", &mut retry.jitter)?;

        let redaction = &mut self.redaction;
        load_env_var("TELEMETRY_REDACTION_PRESET", &mut redaction.preset)?;
        load_env_list("TELEMETRY_SENSITIVE_FIELDS", &mut redaction.sensitive_fields);
        load_env_list("TELEMETRY_SENSITIVE_HEADERS", &mut redaction.sensitive_headers);
        load_env_opt("TELEMETRY_MAX_DEPTH", &mut redaction.max_depth)?;
        load_env_opt("TELEMETRY_SAMPLING_RATE", &mut redaction.sampling_rate)?;
        load_env_list("TELEMETRY_SAMPLING_URLS", &mut redaction.sampling_urls);
        load_env_opt("TELEMETRY_MAX_BODY_SIZE", &mut redaction.max_body_size)?;
        load_env_opt("TELEMETRY_READ_TIMEOUT_MS", &mut redaction.read_timeout_ms)?;

        let logger = &mut self.logger;
        load_env_var("TELEMETRY_MIN_LEVEL", &mut logger.min_level)?;
        load_env_var("TELEMETRY_CONSOLE", &mut logger.console)?;
        load_env_path_opt("TELEMETRY_LOCAL_STORE_PATH", &mut logger.local_store_path);
        load_env_var(
            "TELEMETRY_LOCAL_STORE_CAPACITY",
            &mut logger.local_store_capacity,
        )?;

        Ok(())
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.transport.flush_interval = Duration::from_millis(self.transport.flush_interval_ms);
        self.transport.timeout = Duration::from_millis(self.transport.timeout_ms);

        self.retry.initial_delay = Duration::from_millis(self.retry.initial_delay_ms);
        self.retry.max_delay = Duration::from_millis(self.retry.max_delay_ms);

        Ok(())
    }

    pub fn batching_mode(&self) -> BatchingMode {
        let mode = self.transport.mode.unwrap_or(match self.transport.profile {
            crate::transport::TransportProfile::Browser => BatchingModeName::Immediate,
            crate::transport::TransportProfile::Server => BatchingModeName::Time,
        });

        match mode {
            BatchingModeName::Immediate => BatchingMode::Immediate,
            BatchingModeName::Count => BatchingMode::Count {
                threshold: self.transport.batch_size,
            },
            BatchingModeName::Time => BatchingMode::Time {
                interval: self.transport.flush_interval,
            },
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            enabled: self.retry.enabled,
            max_retries: self.retry.max_retries,
            initial_delay: self.retry.initial_delay,
            backoff_multiplier: self.retry.backoff_multiplier,
            max_delay: self.retry.max_delay,
            jitter: self.retry.jitter,
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        let mut config = TransportConfig::with_profile(&self.transport.endpoint, self.transport.profile)
            .batching(self.batching_mode())
            .retry(self.retry_policy())
            .compression(self.transport.compression)
            .timeout(self.transport.timeout);
        config.compression_threshold = self.transport.compression_threshold;
        config
    }

    pub fn redaction_builder(&self) -> Result<RedactionPolicyBuilder, ConfigError> {
        let section = &self.redaction;
        let mut builder = RedactionPolicyBuilder::preset(section.preset)
            .sensitive_fields(&section.sensitive_fields)
            .sensitive_headers(&section.sensitive_headers);

        for entry in &section.patterns {
            let rule = PatternRule::new(&entry.pattern, entry.replacement.clone())?;
            builder = if entry.fields.is_empty() {
                builder.rule(rule)
            } else {
                builder.rule(rule.for_fields(&entry.fields))
            };
        }
        if let Some(depth) = section.max_depth {
            builder = builder.max_depth(depth);
        }
        if let Some(rate) = section.sampling_rate {
            builder = builder.sampling(rate)?;
        }
        if !section.sampling_urls.is_empty() {
            builder = builder.sampling_urls(&section.sampling_urls);
        }
        if let Some(size) = section.max_body_size {
            builder = builder.max_body_size(size);
        }
        if let Some(timeout) = section.read_timeout_ms {
            builder = builder.read_timeout_ms(timeout);
        }
        Ok(builder)
    }

    pub fn redaction_policy(&self) -> Result<RedactionPolicy, ConfigError> {
        Ok(self.redaction_builder()?.build()?)
    }

    pub fn logger_options(&self, redaction: Option<Arc<RedactionPolicy>>) -> LoggerOptions {
        LoggerOptions {
            min_level: self.logger.min_level,
            console: self.logger.console,
            default_context: self.logger.context.clone(),
            redaction,
        }
    }
}
