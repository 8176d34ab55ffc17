use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived view of the queue; never stored on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusSnapshot {
    pub is_online: bool,
    pub pending_count: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub is_syncing: bool,
    pub last_error: Option<String>,
}
