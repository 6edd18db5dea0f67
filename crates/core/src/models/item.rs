use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Identity of an item within its collection.
///
/// Servers send keys as numbers or strings; both are kept in textual form so
/// they can be compared and placed in URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap an already textual identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Interpret a JSON value as an identifier.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(Self(text.trim().to_string())),
            Value::Number(num) => Some(Self(num.to_string())),
            _ => None,
        }
    }

    /// Textual form of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ItemId::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier {value}")))
    }
}

/// A single record of any resource type: field name to scalar value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    /// Empty item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a JSON value into an item; only objects qualify.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Set or replace a field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Raw value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// All fields with their values.
    pub(crate) fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Display text of a field; missing fields render as an empty string.
    pub fn text(&self, field: &str) -> String {
        self.0.get(field).map(value_to_string).unwrap_or_default()
    }

    /// Identity of this item under the given key field.
    pub fn id(&self, key: &str) -> Option<ItemId> {
        self.0.get(key).and_then(ItemId::from_value)
    }

    /// Case-insensitive substring match of `needle` against any of `fields`.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, fields: &[&str], needle: &str) -> bool {
        needle.is_empty()
            || fields
                .iter()
                .any(|field| self.text(field).to_lowercase().contains(needle))
    }

    /// Consume the item into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Item {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Render a JSON value the way list and detail views show it.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Number(num) => num.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => "{…}".to_string(),
    }
}
