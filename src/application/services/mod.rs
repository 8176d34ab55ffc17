pub mod conflict_resolution;
pub mod connectivity_monitor;
pub mod offline_sync_service;
pub mod operation_log;
pub mod periodic_sync;
pub mod queue_service;
pub mod sync_engine;

pub use conflict_resolution::{ConflictResolverSlot, LocalWinsResolver};
pub use connectivity_monitor::ConnectivityMonitor;
pub use offline_sync_service::OfflineSyncService;
pub use operation_log::{EnqueueOutcome, OperationLog};
pub use periodic_sync::{PeriodicSyncDriver, DEFAULT_SYNC_INTERVAL};
pub use queue_service::{EnqueueParams, QueueService};
pub use sync_engine::SyncEngine;
