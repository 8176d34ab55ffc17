use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Partial representation of an entity's new data. Always a JSON object so that
/// successive intents can be merged key by key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationPayload(Map<String, Value>);

impl OperationPayload {
    pub fn new(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err("Operation payload cannot be null".to_string()),
            _ => Err("Operation payload must be a JSON object".to_string()),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn empty() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge; keys from `newer` overwrite existing keys.
    pub fn merge(&mut self, newer: OperationPayload) {
        for (key, value) in newer.0 {
            self.0.insert(key, value);
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    pub fn as_json(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_inner(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<OperationPayload> for Value {
    fn from(payload: OperationPayload) -> Self {
        payload.into_inner()
    }
}
