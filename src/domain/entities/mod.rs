pub mod offline;

pub use offline::{
    CoalesceOutcome, SyncEvent, SyncOperation, SyncOperationDraft, SyncPassReport, SyncStats,
    SyncStatusSnapshot,
};
