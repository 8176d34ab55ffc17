pub mod offline;

pub use offline::{
    EntityId, EntityType, OperationPayload, OperationType, RetryPolicy, SyncOperationId,
    SyncOperationStatus,
};
