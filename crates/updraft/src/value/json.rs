//! Conversions between [`Value`] and `serde_json::Value`.
//!
//! Ingestion goes through `serde_json::Value`; `Value` itself only
//! implements `Serialize`. JSON numbers map to `Int` when they fit `i64`
//! and to `Float` otherwise. Non-finite floats have no JSON encoding and
//! serialize as null, mirroring `serde_json`.

use super::Value;
use serde::ser::{Serialize, Serializer};
use serde_json::Value as Json;
use std::sync::Arc;

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    n.as_f64().map_or(Self::Null, Self::Float)
                }
            }
            Json::String(s) => Self::Text(s),
            Json::Array(items) => {
                Self::Seq(Arc::new(items.into_iter().map(Into::into).collect()))
            }
            Json::Object(entries) => Self::Map(Arc::new(
                entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
            )),
        }
    }
}

impl From<Value> for Json {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Int(i) => Self::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f).map_or(Self::Null, Self::Number),
            Value::Text(s) => Self::String(s),
            Value::Seq(items) => Self::Array(items.iter().cloned().map(Self::from).collect()),
            Value::Map(entries) => Self::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from(v.clone())))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Seq(items) => serializer.collect_seq(items.iter()),
            Self::Map(entries) => serializer.collect_map(entries.iter()),
        }
    }
}
