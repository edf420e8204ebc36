use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard};
use regex::Regex;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;

/// A JSON-like value whose containers are shared, identity-bearing nodes.
///
/// Containers are reference counted so the same node can appear in several
/// places, including inside itself. Cloning a `Payload` clones the handle,
/// not the contents.
#[derive(Clone)]
pub enum Payload {
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Date(DateTime<Utc>),
    Pattern(Regex),
    Array(ArrayNode),
    Object(ObjectNode),
}

/// Shared handle to an array container.
#[derive(Clone, Default)]
pub struct ArrayNode(Arc<RwLock<Vec<Payload>>>);

/// Shared handle to a string-keyed map container. Keys keep their
/// insertion order.
#[derive(Clone, Default)]
pub struct ObjectNode(Arc<RwLock<Vec<(String, Payload)>>>);

impl ArrayNode {
    pub fn new(items: Vec<Payload>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    pub fn push(&self, item: impl Into<Payload>) {
        self.0.write().push(item.into());
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<Payload>> {
        self.0.read()
    }

    /// Identity of the underlying container.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl ObjectNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the value in place when `key` is already present.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Payload>) -> Option<Payload> {
        let key = key.into();
        let value = value.into();
        let mut entries = self.0.write();
        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Payload> {
        self.0
            .read()
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.clone())
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<(String, Payload)>> {
        self.0.read()
    }

    /// Identity of the underlying container.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl Payload {
    /// Builds an object payload from key/value pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Payload>,
        I: IntoIterator<Item = (K, V)>,
    {
        let node = ObjectNode::new();
        for (key, value) in entries {
            node.insert(key, value);
        }
        Payload::Object(node)
    }

    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Payload>,
        I: IntoIterator<Item = V>,
    {
        Payload::Array(ArrayNode::new(items.into_iter().map(Into::into).collect()))
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Payload::Object(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayNode> {
        match self {
            Payload::Array(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Payload::Array(_) | Payload::Object(_))
    }
}

impl fmt::Debug for Payload {
    // Containers print their identity only; a derived impl would recurse
    // forever on cyclic graphs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Undefined => f.write_str("Undefined"),
            Payload::Null => f.write_str("Null"),
            Payload::Bool(b) => write!(f, "Bool({b})"),
            Payload::Number(n) => write!(f, "Number({n})"),
            Payload::String(s) => write!(f, "String({s:?})"),
            Payload::Date(d) => write!(f, "Date({})", d.to_rfc3339()),
            Payload::Pattern(re) => write!(f, "Pattern(/{}/)", re.as_str()),
            Payload::Array(node) => write!(f, "Array(#{:x})", node.id()),
            Payload::Object(node) => write!(f, "Object(#{:x})", node.id()),
        }
    }
}

impl fmt::Debug for ArrayNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayNode(#{:x})", self.id())
    }
}

impl fmt::Debug for ObjectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectNode(#{:x})", self.id())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => Payload::Number(n),
            Value::String(s) => Payload::String(s),
            Value::Array(items) => {
                Payload::Array(ArrayNode::new(items.into_iter().map(Payload::from).collect()))
            }
            // Keys of a JSON map are already unique.
            Value::Object(map) => Payload::Object(ObjectNode(Arc::new(RwLock::new(
                map.into_iter().map(|(key, value)| (key, Payload::from(value))).collect(),
            )))),
        }
    }
}

impl From<&Value> for Payload {
    fn from(value: &Value) -> Self {
        Payload::from(value.clone())
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::String(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::String(value)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Bool(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Number(value.into())
    }
}

impl From<u64> for Payload {
    fn from(value: u64) -> Self {
        Payload::Number(value.into())
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Payload::Number(value.into())
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Payload::Null, Payload::Number)
    }
}

impl From<DateTime<Utc>> for Payload {
    fn from(value: DateTime<Utc>) -> Self {
        Payload::Date(value)
    }
}

impl From<Regex> for Payload {
    fn from(value: Regex) -> Self {
        Payload::Pattern(value)
    }
}

impl From<ObjectNode> for Payload {
    fn from(value: ObjectNode) -> Self {
        Payload::Object(value)
    }
}

impl From<ArrayNode> for Payload {
    fn from(value: ArrayNode) -> Self {
        Payload::Array(value)
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map_or(Payload::Undefined, Into::into)
    }
}
