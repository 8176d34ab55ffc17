use super::conflict_resolution::ConflictResolverSlot;
use super::connectivity_monitor::ConnectivityMonitor;
use super::operation_log::OperationLog;
use super::periodic_sync::PeriodicSyncDriver;
use super::queue_service::{EnqueueParams, QueueService};
use super::sync_engine::SyncEngine;
use crate::application::ports::conflict_resolver::ConflictResolver;
use crate::application::ports::connectivity::ConnectivitySignal;
use crate::application::ports::operation_log_store::OperationLogStore;
use crate::application::ports::remote_gateway::RemoteGateway;
use crate::application::ports::sync_trigger::SyncTrigger;
use crate::domain::entities::offline::{
    SyncEvent, SyncOperation, SyncPassReport, SyncStats, SyncStatusSnapshot,
};
use crate::domain::value_objects::{OperationType, SyncOperationId, SyncOperationStatus};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::SqliteOperationLogStore;
use crate::shared::config::{AppConfig, SyncConfig};
use crate::shared::error::AppError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Entry point for host code: owns one queue, one engine and their trigger sources.
pub struct OfflineSyncService {
    config: SyncConfig,
    log: Arc<OperationLog>,
    engine: Arc<SyncEngine>,
    queue: QueueService,
    resolver: Arc<ConflictResolverSlot>,
    monitor: ConnectivityMonitor,
    periodic: PeriodicSyncDriver,
    events: broadcast::Sender<SyncEvent>,
}

impl OfflineSyncService {
    /// Wires the service over `store` and re-opens operations a previous process left
    /// mid-apply. Nothing is spawned until [`start`](Self::start) or one of the
    /// individual trigger setups is called.
    pub async fn new(
        config: SyncConfig,
        store: Arc<dyn OperationLogStore>,
        remote: Arc<dyn RemoteGateway>,
        connectivity: Arc<dyn ConnectivitySignal>,
    ) -> Result<Self, AppError> {
        let log = Arc::new(OperationLog::new(store));
        log.recover_interrupted().await?;

        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let resolver = Arc::new(ConflictResolverSlot::new());
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&log),
            remote,
            Arc::clone(&connectivity),
            Arc::clone(&resolver),
            config.retry_policy(),
            config.completed_retention,
            events.clone(),
        ));
        let trigger: Arc<dyn SyncTrigger> = engine.clone();
        let queue = QueueService::new(
            Arc::clone(&log),
            Arc::clone(&connectivity),
            Some(Arc::clone(&trigger)),
        );
        let monitor = ConnectivityMonitor::new(connectivity, trigger, events.clone());
        let periodic = PeriodicSyncDriver::new(Arc::clone(&engine));

        Ok(Self {
            config,
            log,
            engine,
            queue,
            resolver,
            monitor,
            periodic,
            events,
        })
    }

    /// Opens (or creates) the SQLite log named by `config` and builds the service on it.
    pub async fn open(
        config: &AppConfig,
        remote: Arc<dyn RemoteGateway>,
        connectivity: Arc<dyn ConnectivitySignal>,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;

        let pool = ConnectionPool::from_config(&config.database).await?;
        pool.migrate().await?;
        tracing::info!(target: "sync::store", url = %config.database.url, "operation log opened");

        let store = Arc::new(SqliteOperationLogStore::new(pool.get_pool().clone()));
        Self::new(config.sync.clone(), store, remote, connectivity).await
    }

    /// Installs the connectivity listener and, with `auto_sync`, the periodic timer.
    pub fn start(&self) {
        self.setup_connectivity_monitor();
        if self.config.auto_sync {
            self.start_periodic_sync(None);
        }
    }

    pub fn stop(&self) {
        self.monitor.teardown();
        self.periodic.stop();
    }

    pub fn setup_connectivity_monitor(&self) -> bool {
        self.monitor.setup()
    }

    /// `None` uses the configured interval.
    pub fn start_periodic_sync(&self, interval: Option<Duration>) -> bool {
        self.periodic
            .start(interval.unwrap_or_else(|| self.config.sync_interval()))
    }

    pub fn stop_periodic_sync(&self) -> bool {
        self.periodic.stop()
    }

    pub fn is_periodic_sync_running(&self) -> bool {
        self.periodic.is_running()
    }

    pub async fn enqueue(
        &self,
        operation_type: OperationType,
        entity_type: &str,
        entity_id: &str,
        payload: Option<Value>,
    ) -> Result<SyncOperation, AppError> {
        let params = EnqueueParams::parse(operation_type, entity_type, entity_id, payload)?;
        self.queue.enqueue(params).await
    }

    pub async fn process_sync_queue(&self) -> SyncPassReport {
        self.engine.process_sync_queue().await
    }

    pub async fn sync_status(&self) -> Result<SyncStatusSnapshot, AppError> {
        self.engine.sync_status().await
    }

    pub async fn sync_stats(&self) -> Result<SyncStats, AppError> {
        let operations = self.log.snapshot().await?;
        Ok(SyncStats::from_operations(&operations))
    }

    /// Replaces the conflict handler; only the latest registration is consulted.
    pub fn register_conflict_handler(&self, handler: Arc<dyn ConflictResolver>) {
        self.resolver.register(handler);
    }

    pub fn reset_conflict_handler(&self) {
        self.resolver.reset();
    }

    /// Gives every failed operation a fresh attempt budget and requests a pass.
    pub async fn retry_failed(&self) -> Result<usize, AppError> {
        let reset = self.log.reset_failed(None).await?;
        tracing::info!(target: "sync::queue", reset, "failed operations re-queued");
        if reset > 0 {
            Arc::clone(&self.engine).request_sync();
        }
        Ok(reset)
    }

    pub async fn retry_operation(&self, id: &str) -> Result<(), AppError> {
        let id = SyncOperationId::parse(id).map_err(AppError::ValidationError)?;
        self.log.reset_failed(Some(&id)).await?;
        tracing::info!(target: "sync::queue", operation_id = %id, "failed operation re-queued");
        Arc::clone(&self.engine).request_sync();
        Ok(())
    }

    pub async fn clear_failed(&self) -> Result<usize, AppError> {
        let removed = self.log.clear_failed().await?;
        if removed > 0 {
            tracing::info!(target: "sync::queue", removed, "failed operations cleared");
        }
        Ok(removed)
    }

    /// Operations not yet completed, in the order a pass would apply them.
    pub async fn pending_operations(&self) -> Result<Vec<SyncOperation>, AppError> {
        let mut operations: Vec<SyncOperation> = self
            .log
            .snapshot()
            .await?
            .into_iter()
            .filter(|op| op.status != SyncOperationStatus::Completed)
            .collect();
        operations.sort_by_key(|op| op.timestamp);
        Ok(operations)
    }

    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        self.engine.policy().delay_for(retry_count)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }
}

impl Drop for OfflineSyncService {
    fn drop(&mut self) {
        self.stop();
    }
}
