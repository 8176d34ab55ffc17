use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncOperationRow {
    pub seq: i64,
    pub id: String,
    pub operation_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub payload: Option<String>,
    pub timestamp: i64,
    pub retry_count: i64,
    pub status: String,
    pub error: Option<String>,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
}
