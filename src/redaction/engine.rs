use super::payload::Payload;
use super::policy::RedactionPolicy;
use chrono::SecondsFormat;
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const REDACTED: &str = "[REDACTED]";
pub const REDACTED_CIRCULAR: &str = "[REDACTED-CIRCULAR]";
pub const MAX_DEPTH_EXCEEDED: &str = "[MAX_DEPTH_EXCEEDED]";

/// Returns a sanitized copy of `value` according to `policy`.
///
/// Never mutates the input. Pathological shapes (cycles, excessive nesting)
/// come back as sentinel strings instead of errors.
pub fn redact(value: &Payload, policy: &RedactionPolicy) -> Value {
    Walker::new(Some(policy), Some(policy.max_depth())).visit(value, None, 0)
}

/// Redacts a plain JSON value.
pub fn redact_json(value: &Value, policy: &RedactionPolicy) -> Value {
    redact(&Payload::from(value), policy)
}

/// Redacts a structured log context.
pub fn redact_map(map: &Map<String, Value>, policy: &RedactionPolicy) -> Map<String, Value> {
    match redact(&Payload::object(map.clone()), policy) {
        Value::Object(redacted) => redacted,
        _ => Map::new(),
    }
}

/// Renders a payload as JSON without applying any policy. Cycles still
/// render as `"[REDACTED-CIRCULAR]"`.
pub fn render(value: &Payload) -> Value {
    Walker::new(None, None).visit(value, None, 0)
}

struct Walker<'a> {
    policy: Option<&'a RedactionPolicy>,
    max_depth: Option<usize>,
    // Identities of the containers on the current traversal path.
    visiting: HashSet<usize>,
}

impl<'a> Walker<'a> {
    fn new(policy: Option<&'a RedactionPolicy>, max_depth: Option<usize>) -> Self {
        Self {
            policy,
            max_depth,
            visiting: HashSet::new(),
        }
    }

    fn visit(&mut self, value: &Payload, key: Option<&str>, depth: usize) -> Value {
        match value {
            Payload::Undefined | Payload::Null => Value::Null,
            Payload::Bool(b) => Value::Bool(*b),
            Payload::Number(n) => Value::Number(n.clone()),
            Payload::String(s) => match self.policy {
                Some(policy) => Value::String(policy.scrub_text(s, key)),
                None => Value::String(s.clone()),
            },
            Payload::Date(date) => {
                Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Payload::Pattern(pattern) => Value::String(pattern.as_str().to_string()),
            Payload::Array(node) => {
                if self.exceeds_depth(depth) {
                    return Value::String(MAX_DEPTH_EXCEEDED.to_string());
                }
                let id = node.id();
                if !self.visiting.insert(id) {
                    return Value::String(REDACTED_CIRCULAR.to_string());
                }

                // Array descent does not consume a depth level; elements
                // keep the key of the array's containing slot.
                let items = node.read();
                let redacted = items
                    .iter()
                    .map(|item| self.visit(item, key, depth))
                    .collect();
                drop(items);

                self.visiting.remove(&id);
                Value::Array(redacted)
            }
            Payload::Object(node) => {
                if self.exceeds_depth(depth) {
                    return Value::String(MAX_DEPTH_EXCEEDED.to_string());
                }
                let id = node.id();
                if !self.visiting.insert(id) {
                    return Value::String(REDACTED_CIRCULAR.to_string());
                }

                let entries = node.read();
                let mut redacted = Map::with_capacity(entries.len());
                for (field, child) in entries.iter() {
                    let sanitized = if self.is_sensitive(field) {
                        Value::String(REDACTED.to_string())
                    } else {
                        self.visit(child, Some(field.as_str()), depth + 1)
                    };
                    redacted.insert(field.clone(), sanitized);
                }
                drop(entries);

                self.visiting.remove(&id);
                Value::Object(redacted)
            }
        }
    }

    fn exceeds_depth(&self, depth: usize) -> bool {
        self.max_depth.is_some_and(|max| depth > max)
    }

    fn is_sensitive(&self, field: &str) -> bool {
        self.policy
            .is_some_and(|policy| policy.is_sensitive_field(field))
    }
}
