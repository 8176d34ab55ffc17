use super::SyncPassReport;
use crate::domain::value_objects::{EntityId, EntityType, SyncOperationId};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    PassStarted,
    PassCompleted {
        report: SyncPassReport,
    },
    OperationCompleted {
        operation_id: SyncOperationId,
    },
    OperationFailed {
        operation_id: SyncOperationId,
        error: String,
        retry_count: u32,
        permanent: bool,
    },
    /// The remote copy was kept; local changes for the entity were dropped.
    ConflictServerWins {
        operation_id: SyncOperationId,
        entity_type: EntityType,
        entity_id: EntityId,
        remote: Value,
    },
    ConnectivityChanged {
        online: bool,
    },
}
