use super::rows::SyncOperationRow;
use crate::domain::entities::offline::SyncOperation;
use crate::domain::value_objects::{
    EntityId, EntityType, OperationPayload, OperationType, SyncOperationId, SyncOperationStatus,
};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};

pub(crate) fn sync_operation_from_row(row: SyncOperationRow) -> Result<SyncOperation, AppError> {
    let payload = row
        .payload
        .as_deref()
        .map(OperationPayload::from_json_str)
        .transpose()
        .map_err(AppError::DeserializationError)?;

    Ok(SyncOperation {
        id: SyncOperationId::new(row.id).map_err(AppError::DeserializationError)?,
        operation_type: OperationType::parse(&row.operation_type)
            .map_err(AppError::DeserializationError)?,
        entity_type: EntityType::new(row.entity_type).map_err(AppError::DeserializationError)?,
        entity_id: EntityId::new(row.entity_id).map_err(AppError::DeserializationError)?,
        payload,
        timestamp: millis_to_datetime(row.timestamp)?,
        retry_count: u32::try_from(row.retry_count.max(0)).unwrap_or(u32::MAX),
        status: SyncOperationStatus::parse(&row.status).map_err(AppError::DeserializationError)?,
        error: row.error,
        updated_at: millis_to_datetime(row.updated_at)?,
        completed_at: row.completed_at.map(millis_to_datetime).transpose()?,
    })
}

pub(crate) fn payload_to_column(operation: &SyncOperation) -> Result<Option<String>, AppError> {
    operation
        .payload
        .as_ref()
        .map(OperationPayload::to_json_string)
        .transpose()
        .map_err(|err| AppError::SerializationError(err.to_string()))
}

fn millis_to_datetime(value: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(value)
        .ok_or_else(|| AppError::DeserializationError(format!("Invalid timestamp: {value}")))
}
