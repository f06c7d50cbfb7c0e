//! Core record types for extracted metrics
//!
//! A [`Record`] is the unit handed to the metric sink: a measurement name, a tag
//! set, a typed field set and an optional timestamp. Tags and fields are kept in
//! ordered maps so that parsing the same text twice yields identical output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Tag set of a record (string to string, unique keys)
pub type Tags = BTreeMap<String, String>;

/// Field set of a record (string to typed value, unique keys)
pub type Fields = BTreeMap<String, Value>;

/// Typed field value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Name of the value kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// One emitted, tagged and typed field set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Measurement name, e.g. `megacli_raid`
    pub measurement: String,
    pub tags: Tags,
    pub fields: Fields,
    /// Capture time, stamped by the collection façade rather than the parser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl Record {
    pub fn new(measurement: impl Into<String>, tags: Tags, fields: Fields) -> Self {
        Self {
            measurement: measurement.into(),
            tags,
            fields,
            timestamp: None,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Open record being filled between boundary events
///
/// Later writes to the same key overwrite earlier ones.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    tags: Tags,
    fields: Fields,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a set of base tags (e.g. the target's server/port tags)
    pub fn with_tags(tags: &Tags) -> Self {
        Self {
            tags: tags.clone(),
            fields: Fields::new(),
        }
    }

    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn finish(self, measurement: &str) -> Record {
        Record::new(measurement, self.tags, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serialization() {
        let mut builder = RecordBuilder::new();
        builder.tag("adapter", "0");
        builder.field("state", 1i64);
        builder.field("size_gb", 894.252);
        builder.field("pika_version", "3.4.0");
        let record = builder.finish("megacli_disk");

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"measurement":"megacli_disk","tags":{"adapter":"0"},"fields":{"pika_version":"3.4.0","size_gb":894.252,"state":1}}"#
        );
        let deserialized: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(record, deserialized);
    }

    #[test]
    fn test_builder_last_write_wins() {
        let mut builder = RecordBuilder::new();
        builder.tag("virtual_drive", "0");
        builder.tag("virtual_drive", "1");
        builder.field("hotspares_num", 0i64);
        builder.field("hotspares_num", 2i64);
        let record = builder.finish("megacli_raid");

        assert_eq!(record.tag("virtual_drive"), Some("1"));
        assert_eq!(record.field("hotspares_num"), Some(&Value::Int(2)));
        assert_eq!(record.tags.len(), 1);
        assert_eq!(record.fields.len(), 1);
    }

    #[test]
    fn test_value_kind_and_display() {
        assert_eq!(Value::Bool(true).kind(), "boolean");
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::from("snappy"), Value::Str("snappy".to_string()));
    }
}
