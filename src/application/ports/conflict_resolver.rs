use crate::domain::entities::offline::SyncOperation;
use crate::domain::value_objects::OperationPayload;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ConflictResolution {
    /// Local write wins; the operation is re-applied with `ApplyMode::ForceLocal`.
    Local,
    /// Remote value is accepted; the operation completes without re-applying.
    Server,
    /// The merged payload is queued as a new update operation.
    Merge(OperationPayload),
}

pub trait ConflictResolver: Send + Sync {
    fn resolve(&self, operation: &SyncOperation, remote: &Value) -> ConflictResolution;
}
