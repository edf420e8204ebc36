use super::config::TransportConfig;
use crate::domain::LogEntry;
use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::header::{
    CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use std::future::Future;
use std::io::Write;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Compression failed: {0}")]
    Compression(#[from] std::io::Error),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Collector rejected batch: HTTP {status}")]
    Rejected { status: u16 },
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(String),
}

/// Sends one batch to the collector. A batch either succeeds or fails as a
/// whole.
pub trait LogDelivery: Send + Sync + 'static {
    fn deliver(
        &self,
        batch: &[LogEntry],
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

#[derive(Serialize)]
struct LogBatchBody<'a> {
    logs: &'a [LogEntry],
}

/// `POST`s batches as `{"logs":[...]}` to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpDelivery {
    client: Client,
    endpoint: Url,
    user_agent: String,
    compression: bool,
    compression_threshold: usize,
}

impl HttpDelivery {
    pub fn new(config: &TransportConfig) -> Result<Self, DeliveryError> {
        let endpoint: Url = config
            .endpoint
            .parse()
            .map_err(|e| DeliveryError::InvalidEndpoint(format!("{}: {e}", config.endpoint)))?;

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| DeliveryError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            user_agent: config.user_agent.clone(),
            compression: config.compression,
            compression_threshold: config.compression_threshold,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn should_compress(&self, batch: &[LogEntry]) -> bool {
        self.compression && batch.len() > self.compression_threshold
    }

    pub fn encode(&self, batch: &[LogEntry]) -> Result<(Vec<u8>, bool), DeliveryError> {
        let json = serde_json::to_vec(&LogBatchBody { logs: batch })?;
        if !self.should_compress(batch) {
            return Ok((json, false));
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok((encoder.finish()?, true))
    }

    fn build_headers(
        &self,
        batch_id: &str,
        batch_size: usize,
        compressed: bool,
    ) -> Result<HeaderMap, DeliveryError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if compressed {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }

        let user_agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| DeliveryError::InvalidHeaderValue(format!("user-agent: {e}")))?;
        headers.insert(USER_AGENT, user_agent);

        let batch_id = HeaderValue::from_str(batch_id)
            .map_err(|e| DeliveryError::InvalidHeaderValue(format!("x-batch-id: {e}")))?;
        headers.insert(HeaderName::from_static("x-batch-id"), batch_id);
        headers.insert(
            HeaderName::from_static("x-batch-size"),
            HeaderValue::from(batch_size),
        );

        Ok(headers)
    }
}

impl LogDelivery for HttpDelivery {
    async fn deliver(&self, batch: &[LogEntry]) -> Result<(), DeliveryError> {
        let start = Instant::now();
        let batch_id = uuid::Uuid::new_v4().to_string();
        let (payload, compressed) = self.encode(batch)?;
        let bytes_sent = payload.len();
        let headers = self.build_headers(&batch_id, batch.len(), compressed)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!(
            batch_id = %batch_id,
            entries = batch.len(),
            bytes = bytes_sent,
            compressed,
            latency_ms = start.elapsed().as_millis() as u64,
            "Delivered batch"
        );
        Ok(())
    }
}
