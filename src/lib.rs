//! Offline-first operation queue: local mutations are recorded durably, coalesced per
//! entity and replayed against a remote store once connectivity allows.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{
    ApplyMode, ConflictResolution, ConflictResolver, ConnectivitySignal, OperationLogStore,
    RemoteApplyError, RemoteGateway, SyncTrigger,
};
pub use application::services::{LocalWinsResolver, OfflineSyncService};
pub use domain::entities::{
    SyncEvent, SyncOperation, SyncPassReport, SyncStats, SyncStatusSnapshot,
};
pub use domain::value_objects::{OperationType, SyncOperationId, SyncOperationStatus};
pub use infrastructure::connectivity::WatchConnectivity;
pub use infrastructure::offline::SqliteOperationLogStore;
pub use shared::{AppConfig, AppError, Result};

/// ログ設定の初期化。二重に呼ばれても失敗しない。
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kukuri_sync_queue=debug,sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
