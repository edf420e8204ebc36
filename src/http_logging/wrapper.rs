use super::body::{
    BodyKind, classify_body, is_body_loggable, render_body, should_capture_body,
    should_capture_by_length,
};
use crate::domain::{LogLevel, LogSource};
use crate::logger::LogSink;
use crate::redaction::{RedactionPolicy, redact_headers};
use bytes::{Bytes, BytesMut};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Request, Response, StatusCode};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const BODY_READ_TIMED_OUT: &str = "[body read timed out]";

#[derive(Error, Debug)]
pub enum HttpLogError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Response body as handed back to the caller.
#[derive(Debug)]
pub enum ResponseBody {
    /// The body was read for logging; these are all of its bytes.
    Buffered(Bytes),
    /// Capture was skipped; the body is still unread.
    Unread(Response),
    /// The read for logging ran past the read timeout. `prefix` holds what
    /// arrived in time; the rest is still on `rest`.
    Partial { prefix: Bytes, rest: Response },
}

/// Outcome of reading a body for logging.
enum BoundedRead {
    Complete(Bytes),
    TimedOut(Bytes),
}

#[derive(Debug)]
pub struct LoggedResponse {
    status: StatusCode,
    headers: HeaderMap,
    duration: Duration,
    body: ResponseBody,
}

impl LoggedResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Time until the response headers arrived.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.body, ResponseBody::Buffered(_))
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    pub async fn bytes(self) -> Result<Bytes, HttpLogError> {
        match self.body {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Unread(response) => Ok(response.bytes().await?),
            ResponseBody::Partial { prefix, rest } => {
                let mut buffer = BytesMut::from(prefix.as_ref());
                buffer.extend_from_slice(&rest.bytes().await?);
                Ok(buffer.freeze())
            }
        }
    }

    pub async fn text(self) -> Result<String, HttpLogError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Logs outgoing calls made through a `reqwest::Client`.
pub struct HttpCallLogger<S: LogSink> {
    sink: S,
    policy: Arc<RedactionPolicy>,
}

impl<S: LogSink> HttpCallLogger<S> {
    pub fn new(sink: S, policy: Arc<RedactionPolicy>) -> Self {
        Self { sink, policy }
    }

    pub fn policy(&self) -> &RedactionPolicy {
        &self.policy
    }

    /// Executes `request`, logging one line before and one after the call.
    pub async fn execute(
        &self,
        client: &Client,
        request: Request,
    ) -> Result<LoggedResponse, HttpLogError> {
        let method = request.method().to_string();
        let url = request.url().to_string();

        self.log_request(&request, &method, &url);

        let started = Instant::now();
        let mut response = match client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let mut context = Map::new();
                context.insert("method".into(), json!(method));
                context.insert("url".into(), json!(url));
                context.insert("durationMs".into(), json!(started.elapsed().as_millis() as u64));
                context.insert("error".into(), json!(e.to_string()));
                self.sink.emit(
                    LogLevel::Error,
                    &format!("HTTP request failed: {method} {url}"),
                    Some(context),
                    LogSource::Http,
                );
                return Err(e.into());
            }
        };
        let duration = started.elapsed();

        let status = response.status();
        let headers = response.headers().clone();
        let content_type = header_str(&headers, CONTENT_TYPE.as_str());

        let mut context = Map::new();
        context.insert("method".into(), json!(method));
        context.insert("url".into(), json!(url));
        context.insert("status".into(), json!(status.as_u16()));
        context.insert("durationMs".into(), json!(duration.as_millis() as u64));
        context.insert(
            "headers".into(),
            Value::Object(redact_headers(&headers, &self.policy)),
        );

        let body = if self.should_capture_response(&url, &content_type, response.content_length()) {
            let read = match self.read_bounded(&mut response).await {
                Ok(read) => read,
                Err(e) => {
                    context.insert("error".into(), json!(e.to_string()));
                    self.sink.emit(
                        LogLevel::Error,
                        &format!("HTTP response body read failed: {method} {url}"),
                        Some(context),
                        LogSource::Http,
                    );
                    return Err(e.into());
                }
            };
            match read {
                BoundedRead::Complete(bytes) => {
                    if let Some(logged) = render_body(&bytes, &content_type, &self.policy) {
                        context.insert("body".into(), logged);
                    }
                    ResponseBody::Buffered(bytes)
                }
                BoundedRead::TimedOut(prefix) => {
                    context.insert("body".into(), json!(BODY_READ_TIMED_OUT));
                    ResponseBody::Partial {
                        prefix,
                        rest: response,
                    }
                }
            }
        } else {
            ResponseBody::Unread(response)
        };

        self.sink.emit(
            level_for_status(status),
            &format!("HTTP {} {method} {url}", status.as_u16()),
            Some(context),
            LogSource::Http,
        );

        Ok(LoggedResponse {
            status,
            headers,
            duration,
            body,
        })
    }

    fn log_request(&self, request: &Request, method: &str, url: &str) {
        let mut context = Map::new();
        context.insert("method".into(), json!(method));
        context.insert("url".into(), json!(url));
        context.insert(
            "headers".into(),
            Value::Object(redact_headers(request.headers(), &self.policy)),
        );

        let content_type = header_str(request.headers(), CONTENT_TYPE.as_str());
        let bytes = request.body().and_then(|body| body.as_bytes());
        if let Some(bytes) = bytes.filter(|bytes| !bytes.is_empty())
            && is_body_loggable(&content_type, &self.policy)
            && let Some(body) = render_body(bytes, &content_type, &self.policy)
        {
            context.insert("body".into(), body);
        }

        self.sink.emit(
            LogLevel::Debug,
            &format!("HTTP request {method} {url}"),
            Some(context),
            LogSource::Http,
        );
    }

    fn should_capture_response(
        &self,
        url: &str,
        content_type: &str,
        content_length: Option<u64>,
    ) -> bool {
        should_capture_body(url, self.policy.sampling(), &mut rand::rng())
            && is_body_loggable(content_type, &self.policy)
            && classify_body(content_type) != BodyKind::Binary
            && should_capture_by_length(content_length, &self.policy)
    }

    /// Reads the body until it ends or the policy's read timeout expires.
    /// On expiry the chunks read so far are returned and the remainder is
    /// left on `response`.
    async fn read_bounded(&self, response: &mut Response) -> Result<BoundedRead, reqwest::Error> {
        let deadline = tokio::time::Instant::now() + self.policy.read_timeout();
        let mut buffer = BytesMut::new();

        loop {
            match tokio::time::timeout_at(deadline, response.chunk()).await {
                Ok(Ok(Some(chunk))) => buffer.extend_from_slice(&chunk),
                Ok(Ok(None)) => return Ok(BoundedRead::Complete(buffer.freeze())),
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(BoundedRead::TimedOut(buffer.freeze())),
            }
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn level_for_status(status: StatusCode) -> LogLevel {
    if status.is_server_error() {
        LogLevel::Error
    } else if status.is_client_error() {
        LogLevel::Warn
    } else {
        LogLevel::Info
    }
}
