use super::engine::REDACTED;
use super::policy::RedactionPolicy;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

/// Converts headers to a loggable map, masking sensitive header values.
///
/// Repeated headers are joined with `", "`. Pattern rules scoped by field name
/// are matched against the header name.
pub fn redact_headers(headers: &HeaderMap, policy: &RedactionPolicy) -> Map<String, Value> {
    let mut redacted = Map::new();

    for name in headers.keys() {
        let key = name.as_str();
        let value = if policy.is_sensitive_header(key) {
            REDACTED.to_string()
        } else {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|value| value.to_str().unwrap_or("[non-utf8 header]"))
                .collect::<Vec<_>>()
                .join(", ");
            policy.scrub_text(&joined, Some(key))
        };
        redacted.insert(key.to_string(), Value::String(value));
    }

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redaction::RedactionPolicyBuilder;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue, SET_COOKIE};
    use serde_json::json;

    #[test]
    fn test_sensitive_headers_masked() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));

        let redacted = redact_headers(&headers, &RedactionPolicy::default());
        assert_eq!(redacted.get("authorization"), Some(&json!("[REDACTED]")));
        assert_eq!(redacted.get("set-cookie"), Some(&json!("[REDACTED]")));
        assert_eq!(redacted.get("content-type"), Some(&json!("application/json")));
    }

    #[test]
    fn test_custom_header_and_scoped_pattern() {
        let policy = RedactionPolicyBuilder::new()
            .sensitive_header("X-Tenant-Secret")
            .scoped_pattern(r"\d+\.\d+\.\d+\.\d+", "[IP]", ["x-forwarded-for"])
            .build()
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-secret", HeaderValue::from_static("s3"));
        headers.append("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));
        headers.append("x-forwarded-for", HeaderValue::from_static("10.0.0.2"));
        headers.insert("x-request-id", HeaderValue::from_static("10.0.0.3"));

        let redacted = redact_headers(&headers, &policy);
        assert_eq!(redacted.get("x-tenant-secret"), Some(&json!("[REDACTED]")));
        assert_eq!(redacted.get("x-forwarded-for"), Some(&json!("[IP], [IP]")));
        assert_eq!(redacted.get("x-request-id"), Some(&json!("10.0.0.3")));
    }
}
