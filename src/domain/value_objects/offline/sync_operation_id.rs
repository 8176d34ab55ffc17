use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 同期キュー上の操作を一意に識別する ID。採番後に再利用されることはない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncOperationId(String);

impl SyncOperationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        Self::validate(value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Sync operation id cannot be empty".to_string());
        }
        if value.len() > 128 {
            return Err("Sync operation id is too long".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for SyncOperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SyncOperationId> for String {
    fn from(value: SyncOperationId) -> Self {
        value.0
    }
}
