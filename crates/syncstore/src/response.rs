//! The opaque sync response document.

use crate::error::{Result, StoreError};
use crate::merge::shallow_merge;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An accumulated sync response: an arbitrary JSON object.
///
/// The store never interprets its contents beyond the top-level keys it
/// merges on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncResponse(Map<String, Value>);

impl SyncResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON string. Anything other than an object is rejected.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::try_from(value)
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let s = if pretty {
            serde_json::to_string_pretty(&self.0)?
        } else {
            serde_json::to_string(&self.0)?
        };
        Ok(s)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// The resume token of the last sync, if the response carries one.
    pub fn next_batch(&self) -> Option<&str> {
        self.0.get("next_batch").and_then(Value::as_str)
    }

    /// Shallow-merge `partial` over this response; `partial` wins on shared keys.
    pub fn merged_with(self, partial: SyncResponse) -> SyncResponse {
        SyncResponse(shallow_merge(self.0, partial.0))
    }
}

impl From<Map<String, Value>> for SyncResponse {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for SyncResponse {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(StoreError::NotAnObject),
        }
    }
}

impl From<SyncResponse> for Value {
    fn from(response: SyncResponse) -> Self {
        Value::Object(response.0)
    }
}
