use crate::domain::entities::offline::SyncOperation;
use crate::domain::value_objects::SyncOperationId;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable, insertion-ordered record of sync operations.
///
/// Every call is atomic on its own: a failed write leaves the previous state intact.
/// Callers serialize structural mutations (see `OperationLog`).
#[async_trait]
pub trait OperationLogStore: Send + Sync {
    /// Full snapshot, insertion order preserved.
    async fn load(&self) -> Result<Vec<SyncOperation>, AppError>;
    async fn get(&self, id: &SyncOperationId) -> Result<Option<SyncOperation>, AppError>;
    /// Replaces the whole log with `operations`, keeping their order.
    async fn save(&self, operations: &[SyncOperation]) -> Result<(), AppError>;
    async fn append(&self, operation: &SyncOperation) -> Result<(), AppError>;
    /// Overwrites the mutable fields of the record with the same id.
    async fn replace(&self, operation: &SyncOperation) -> Result<(), AppError>;
    async fn remove(&self, id: &SyncOperationId) -> Result<(), AppError>;
}
