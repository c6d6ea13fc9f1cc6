//! JSON adapter for [`Value`].
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use thiserror::Error;

use crate::value::{Array, Container, Primitive, Value};

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Invalid JSON: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize value: {0}")]
    Serialize(serde_json::Error),
}

pub fn parse(bytes: &[u8]) -> Result<Value, JsonError> {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(from_json)
        .map_err(JsonError::Parse)
}

pub fn serialize(value: &Value) -> Result<Vec<u8>, JsonError> {
    serde_json::to_vec(value).map_err(JsonError::Serialize)
}

pub fn serialize_pretty(value: &Value) -> Result<Vec<u8>, JsonError> {
    serde_json::to_vec_pretty(value).map_err(JsonError::Serialize)
}

pub fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => b.into(),
        serde_json::Value::Number(n) => n.as_f64().map(Value::from).unwrap_or_default(),
        serde_json::Value::String(s) => s.into(),
        serde_json::Value::Array(values) => {
            Value::Array(values.into_iter().map(from_json).collect::<Array>())
        }
        serde_json::Value::Object(map) => Value::Container(
            map.into_iter()
                .map(|(key, value)| (key, from_json(value)))
                .collect::<Container>(),
        ),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Primitive(Primitive::Bool(b)) => serializer.serialize_bool(*b),
            Value::Primitive(Primitive::Str(s)) => serializer.serialize_str(s),
            Value::Primitive(Primitive::Num(n)) if n.is_int() && n.value().abs() < i64::MAX as f64 => {
                serializer.serialize_i64(n.to_int())
            }
            Value::Primitive(Primitive::Num(n)) => serializer.serialize_f64(n.value()),
            Value::Array(array) => {
                let mut seq = serializer.serialize_seq(Some(array.len()))?;
                array.iter().try_for_each(|v| seq.serialize_element(v))?;
                seq.end()
            }
            Value::Container(container) => {
                let mut map = serializer.serialize_map(Some(container.len()))?;
                container
                    .iter()
                    .try_for_each(|(key, value)| map.serialize_entry(key.as_str(), value))?;
                map.end()
            }
            Value::Stream(stream) => {
                let values = stream.to_vec();
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                values.iter().try_for_each(|v| seq.serialize_element(v))?;
                seq.end()
            }
        }
    }
}
