//! Redaction engine.
//!
//! Sanitizes arbitrary, possibly cyclic, JSON-like payloads before they are
//! logged or transmitted. The engine is purely functional per call: it takes
//! read locks on the input graph and returns a fresh `serde_json::Value`.

pub mod builder;
pub mod engine;
pub mod headers;
pub mod payload;
pub mod policy;
pub mod presets;

pub use builder::RedactionPolicyBuilder;
pub use engine::{
    MAX_DEPTH_EXCEEDED, REDACTED, REDACTED_CIRCULAR, redact, redact_json, redact_map, render,
};
pub use headers::redact_headers;
pub use payload::{ArrayNode, ObjectNode, Payload};
pub use policy::{
    ContentTypeFilter, MAX_BODY_SIZE_LIMIT, MAX_DEPTH_LIMIT, MIN_DEPTH_LIMIT, PatternRule,
    PolicyError, RedactionPolicy, SamplingConfig,
};
pub use presets::Preset;

/// Matches `text` against a pattern where `*` matches any run of characters.
pub(crate) fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];

    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }

    rest.len() >= last.len() && rest.ends_with(last)
}
