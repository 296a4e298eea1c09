//! Values exchanged with the engine.
//!
//! Outbound payloads are assembled with [`ListBuilder`]; engine responses come
//! back as [`Value`] and are only inspected for the few shapes the event
//! bridge understands (booleans and objects with boolean flags).

use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Number, Value as JsonValue};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Buffer(Vec<u8>),
}

impl Value {
    pub fn buffer(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Buffer(bytes.into())
    }

    /// JavaScript truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(value) => *value,
            Value::I64(value) => *value != 0,
            Value::U64(value) => *value != 0,
            Value::F64(value) => *value != 0.0 && !value.is_nan(),
            Value::String(value) => !value.is_empty(),
            Value::List(_) | Value::Object(_) | Value::Buffer(_) => true,
        }
    }

    /// Strict `=== true`.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Reads `field` of an object value; `true` only when the field is the boolean `true`.
    pub fn get_bool(&self, field: &str) -> bool {
        self.as_object()
            .and_then(|map| map.get(field))
            .map(Value::is_true)
            .unwrap_or(false)
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Undefined | Value::Null => JsonValue::Null,
            Value::Bool(value) => JsonValue::Bool(*value),
            Value::I64(value) => JsonValue::Number((*value).into()),
            Value::U64(value) => JsonValue::Number((*value).into()),
            Value::F64(value) => Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(value) => JsonValue::String(value.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => {
                let mut out = JsonMap::new();
                for (key, value) in map {
                    out.insert(key.clone(), value.to_json());
                }
                JsonValue::Object(out)
            }
            Value::Buffer(bytes) => {
                JsonValue::Array(bytes.iter().map(|byte| JsonValue::from(*byte)).collect())
            }
        }
    }

    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(value) => Value::Bool(*value),
            JsonValue::Number(number) => {
                if let Some(value) = number.as_u64() {
                    Value::U64(value)
                } else if let Some(value) = number.as_i64() {
                    Value::I64(value)
                } else {
                    Value::F64(number.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(value) => Value::String(value.clone()),
            JsonValue::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Value::from_json(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::U64(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Ordered builder for outbound list payloads.
#[derive(Debug, Default)]
pub struct ListBuilder {
    items: Vec<Value>,
}

impl ListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, value: impl Into<Value>) -> Self {
        self.items.push(value.into());
        self
    }

    pub fn push_str(self, value: &str) -> Self {
        self.push(value)
    }

    pub fn push_bool(self, value: bool) -> Self {
        self.push(value)
    }

    pub fn push_u64(self, value: u64) -> Self {
        self.push(value)
    }

    pub fn push_buffer(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.items.push(Value::buffer(bytes));
        self
    }

    pub fn push_list(mut self, build: impl FnOnce(ListBuilder) -> ListBuilder) -> Self {
        self.items.push(build(ListBuilder::new()).build());
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn build(self) -> Value {
        Value::List(self.items)
    }
}
