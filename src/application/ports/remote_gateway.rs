use crate::domain::entities::offline::SyncOperation;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    Normal,
    /// Re-apply after a conflict was resolved in favour of the local write.
    ForceLocal,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteApplyError {
    #[error("Remote conflict")]
    Conflict(Value),

    #[error("Transient remote failure: {0}")]
    Transient(String),

    #[error("Remote rejected operation: {0}")]
    Permanent(String),
}

/// Applies one queued operation to the remote system. Implementations own the
/// transport and its per-call timeout.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn apply(
        &self,
        operation: &SyncOperation,
        mode: ApplyMode,
    ) -> Result<(), RemoteApplyError>;
}
