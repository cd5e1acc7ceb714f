//! Domain events and their wire encoding.
//!
//! An event is an ordered JSON object. Field order follows the order the
//! fields were inserted (or declared, for events built from a record), so
//! the encoded body matches the domain's schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field stamped onto every event before it is published.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// ISO-8601 UTC, second precision, `Z` suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Event must encode to a JSON object, got {0}")]
    NotAMapping(&'static str),
}

/// Render `at` in the event timestamp format.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// A domain event: an ordered mapping of field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    fields: Map<String, Value>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an event from any record that serializes to a JSON object.
    pub fn from_record<T: Serialize>(record: &T) -> Result<Self, EventError> {
        match serde_json::to_value(record)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(EventError::NotAMapping(value_kind(&other))),
        }
    }

    /// Append (or replace) a field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.get_str(TIMESTAMP_FIELD)
    }

    /// Set the timestamp to `at` unless one is already present.
    ///
    /// A `null` timestamp counts as missing and is filled in place.
    /// Returns `true` when the event was stamped.
    pub fn stamp(&mut self, at: DateTime<Utc>) -> bool {
        if !matches!(self.fields.get(TIMESTAMP_FIELD), None | Some(Value::Null)) {
            return false;
        }
        self.fields
            .insert(TIMESTAMP_FIELD.to_string(), Value::String(format_timestamp(at)));
        true
    }

    /// Encode as a UTF-8 JSON object.
    pub fn encode(&self) -> Result<Vec<u8>, EventError> {
        Ok(serde_json::to_vec(&self.fields)?)
    }

    pub fn decode(body: &[u8]) -> Result<Self, EventError> {
        Ok(serde_json::from_slice(body)?)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
