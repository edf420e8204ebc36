use super::{Config, ConfigError};
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = Url::parse(&self.transport.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid endpoint URL '{}': {}",
                self.transport.endpoint, e
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "Endpoint must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }

        if self.transport.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.transport.flush_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        if self.transport.timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.retry.enabled {
            if self.retry.initial_delay_ms == 0 {
                return Err(ConfigError::InvalidConfig(
                    "Retry initial delay must be greater than 0".to_string(),
                ));
            }
            if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "Retry backoff multiplier must be at least 1.0, got {}",
                    self.retry.backoff_multiplier
                )));
            }
            if self.retry.max_delay_ms < self.retry.initial_delay_ms {
                return Err(ConfigError::InvalidConfig(format!(
                    "Retry max delay ({}ms) must not be below the initial delay ({}ms)",
                    self.retry.max_delay_ms, self.retry.initial_delay_ms
                )));
            }
        }

        if self.logger.local_store_path.is_some() && self.logger.local_store_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Local store capacity must be greater than 0".to_string(),
            ));
        }

        // Surfaces bad patterns and out-of-range limits before startup.
        self.redaction_policy()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        let mut config = Config::default();
        config.post_process().unwrap();
        config
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let mut config = valid();
        config.transport.endpoint = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        config.transport.endpoint = "ftp://collector/logs".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let mut config = valid();
        config.transport.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inverted_retry_bounds() {
        let mut config = valid();
        config.retry.initial_delay_ms = 5000;
        config.retry.max_delay_ms = 1000;
        assert!(config.validate().is_err());

        // Not checked when retry is off.
        config.retry.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_shrinking_multiplier() {
        let mut config = valid();
        config.retry.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_redaction() {
        let mut config = valid();
        config.redaction.max_depth = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Policy(_))));

        let mut config = valid();
        config.redaction.sampling_rate = Some(1.5);
        assert!(matches!(config.validate(), Err(ConfigError::Policy(_))));

        let mut config = valid();
        config.redaction.max_body_size = Some(-1);
        assert!(matches!(config.validate(), Err(ConfigError::Policy(_))));
    }
}
