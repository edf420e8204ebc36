pub mod config;
pub mod initialization;
pub mod logging_system;
pub mod relay;

pub use config::{Cli, Config, ConfigError, LogFormat, LogLevel};
pub use initialization::InitializationError;
pub use logging_system::{LoggingSystem, setup_logging_safe};
pub use relay::{RelayLine, parse_line};

use crate::domain::TelemetryError;
use crate::logger::{ClientLogger, FileLogStore, LocalLogStore, Logger};
use crate::transport::{HttpDelivery, PageLifecycle, Transport, TransportStats, listen_for_shutdown_signals};
use clap::Parser;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The stdin relay: every input line becomes one log entry delivered
/// through the server-profile transport.
pub struct App {
    config: Config,
    logger: ClientLogger<HttpDelivery>,
    lifecycle: Arc<PageLifecycle>,
    stop: CancellationToken,
}

impl App {
    pub fn from_config(config: Config) -> Result<Self, TelemetryError> {
        let policy = Arc::new(config.redaction_policy()?);
        let delivery = HttpDelivery::new(&config.transport_config())?;
        let transport = Transport::new(config.transport_config(), delivery);

        let store = config.logger.local_store_path.as_ref().map(|path| {
            Arc::new(FileLogStore::new(path, config.logger.local_store_capacity))
                as Arc<dyn LocalLogStore>
        });

        let mut options = config.logger_options(Some(policy));
        if !options.default_context.contains_key("host")
            && let Some(host) = detect_hostname()
        {
            options.default_context.insert("host".into(), Value::String(host));
        }
        let logger = ClientLogger::new(options, Some(transport), store);

        let lifecycle = Arc::new(PageLifecycle::new());
        let stop = CancellationToken::new();
        let token = stop.clone();
        lifecycle.register(Arc::new(move || token.cancel()));

        Ok(Self {
            config,
            logger,
            lifecycle,
            stop,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logger(&self) -> &ClientLogger<HttpDelivery> {
        &self.logger
    }

    /// Stops [`run`](Self::run) as if input had ended.
    pub fn stop(&self) {
        self.lifecycle.dispatch_unload();
    }

    /// Relays lines from `input` until EOF or [`stop`](Self::stop), then
    /// destroys the transport (one final flush) and returns its stats.
    pub async fn run<R>(&self, input: R) -> Result<TransportStats, TelemetryError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut relayed: u64 = 0;

        loop {
            let next = tokio::select! {
                () = self.stop.cancelled() => break,
                next = lines.next_line() => next?,
            };
            let Some(line) = next else {
                break;
            };
            if let Some(parsed) = parse_line(&line) {
                self.logger.log(parsed.level, &parsed.message, parsed.context);
                relayed += 1;
            }
        }

        self.logger.destroy().await;
        let stats = self.logger.stats().unwrap_or_default();
        info!(relayed, ?stats, "Relay finished");
        Ok(stats)
    }

    /// Runs against stdin, stopping on SIGINT/SIGTERM.
    pub async fn run_stdin(&self) -> Result<TransportStats, TelemetryError> {
        let signals = listen_for_shutdown_signals(Arc::clone(&self.lifecycle));
        let result = self.run(BufReader::new(tokio::io::stdin())).await;
        signals.abort();
        result
    }
}

fn detect_hostname() -> Option<String> {
    match hostname::get() {
        Ok(name) => name.into_string().ok(),
        Err(e) => {
            warn!("Failed to detect hostname: {}", e);
            None
        }
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Entry point for the relay binary.
pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = setup_logging_safe(cli.log_level, cli.log_format) {
        eprintln!("Warning: {e}");
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Starting rask-client-telemetry v{} (endpoint={}, profile={})",
        get_version(),
        config.transport.endpoint,
        config.transport.profile
    );

    let app = App::from_config(config)?;
    let stats = app.run_stdin().await?;
    if stats.dropped_entries > 0 {
        error!(dropped = stats.dropped_entries, "Some log entries were not delivered");
    }
    Ok(())
}
