use crate::redaction::{RedactionPolicy, SamplingConfig, redact_json};
use rand::Rng;
use serde_json::Value;

pub const TRUNCATED_MARKER: &str = "... [truncated]";

/// How a body should be treated for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Text,
    /// Not logged.
    Binary,
}

const BINARY_FAMILIES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "font/",
    "application/pdf",
    "application/zip",
    "application/x-zip",
    "application/gzip",
    "application/octet-stream",
    "application/font",
    "application/x-font",
];

/// Lowercases and strips parameters (`; charset=...`).
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Whether the policy's content-type filter lets a body of this type be
/// logged. Excludes win over includes; a non-empty include list is an
/// allow-list.
pub fn is_body_loggable(content_type: &str, policy: &RedactionPolicy) -> bool {
    let normalized = normalize_content_type(content_type);
    policy
        .content_types()
        .is_none_or(|filter| filter.allows(&normalized))
}

/// Unknown types are treated as text rather than silently dropped.
pub fn classify_body(content_type: &str) -> BodyKind {
    let normalized = normalize_content_type(content_type);

    if normalized.contains("json") {
        return BodyKind::Json;
    }
    if BINARY_FAMILIES
        .iter()
        .any(|family| normalized.starts_with(family))
    {
        return BodyKind::Binary;
    }
    BodyKind::Text
}

/// False when the declared length is more than twice the body limit, so the
/// body is not read only to be truncated. Unknown lengths are read.
pub fn should_capture_by_length(content_length: Option<u64>, policy: &RedactionPolicy) -> bool {
    let limit = (policy.max_body_size() as u64).saturating_mul(2);
    content_length.is_none_or(|length| length <= limit)
}

/// Cuts `text` to `max_chars` characters and appends the truncation marker.
pub fn truncate_body(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATED_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Decides whether the body of a call to `url` is captured.
///
/// Sampling never suppresses the request/response line itself, only the
/// body. With URL patterns configured, URLs outside them are always
/// captured.
pub fn should_capture_body<R: Rng + ?Sized>(
    url: &str,
    sampling: Option<&SamplingConfig>,
    rng: &mut R,
) -> bool {
    let Some(sampling) = sampling else {
        return true;
    };
    if !sampling.url_patterns().is_empty() && !sampling.matches_url(url) {
        return true;
    }
    rng.random_bool(sampling.rate())
}

/// Produces the loggable form of a body, or `None` for binary content.
pub fn render_body(bytes: &[u8], content_type: &str, policy: &RedactionPolicy) -> Option<Value> {
    let kind = classify_body(content_type);
    if kind == BodyKind::Binary {
        return None;
    }

    let text = String::from_utf8_lossy(bytes);
    let max = policy.max_body_size();

    // JSON is redacted before any truncation so a cut can never expose a
    // value under a sensitive key.
    if kind == BodyKind::Json
        && let Ok(parsed) = serde_json::from_str::<Value>(&text)
    {
        let redacted = redact_json(&parsed, policy);
        let serialized = redacted.to_string();
        if serialized.chars().count() <= max {
            return Some(redacted);
        }
        return Some(Value::String(truncate_body(&serialized, max)));
    }

    let truncated = truncate_body(&text, max);
    Some(Value::String(policy.scrub_text(&truncated, None)))
}
