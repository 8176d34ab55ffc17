pub mod sync_event;
pub mod sync_operation;
pub mod sync_report;
pub mod sync_stats;
pub mod sync_status;

pub use sync_event::SyncEvent;
pub use sync_operation::{CoalesceOutcome, SyncOperation, SyncOperationDraft};
pub use sync_report::SyncPassReport;
pub use sync_stats::SyncStats;
pub use sync_status::SyncStatusSnapshot;
