use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SyncOperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperationStatus::Pending => "pending",
            SyncOperationStatus::Processing => "processing",
            SyncOperationStatus::Completed => "completed",
            SyncOperationStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "pending" => Ok(SyncOperationStatus::Pending),
            "processing" => Ok(SyncOperationStatus::Processing),
            "completed" => Ok(SyncOperationStatus::Completed),
            "failed" => Ok(SyncOperationStatus::Failed),
            other => Err(format!("Unknown sync operation status: {other}")),
        }
    }

    /// pending / processing はエンティティごとに1件まで
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            SyncOperationStatus::Pending | SyncOperationStatus::Processing
        )
    }
}

impl fmt::Display for SyncOperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
