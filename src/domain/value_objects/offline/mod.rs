pub mod entity_id;
pub mod entity_type;
pub mod operation_type;
pub mod payload;
pub mod retry_policy;
pub mod sync_operation_id;
pub mod sync_operation_status;

pub use entity_id::EntityId;
pub use entity_type::EntityType;
pub use operation_type::OperationType;
pub use payload::OperationPayload;
pub use retry_policy::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAYS_MS, RetryPolicy};
pub use sync_operation_id::SyncOperationId;
pub use sync_operation_status::SyncOperationStatus;
