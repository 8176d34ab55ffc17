use super::conflict_resolution::ConflictResolverSlot;
use super::operation_log::{now, OperationLog};
use crate::application::ports::conflict_resolver::ConflictResolution;
use crate::application::ports::connectivity::ConnectivitySignal;
use crate::application::ports::remote_gateway::{ApplyMode, RemoteApplyError, RemoteGateway};
use crate::application::ports::sync_trigger::SyncTrigger;
use crate::domain::entities::offline::{
    SyncEvent, SyncOperation, SyncPassReport, SyncStatusSnapshot,
};
use crate::domain::value_objects::{RetryPolicy, SyncOperationId, SyncOperationStatus};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

#[derive(Debug, Default, Clone)]
struct PassHistory {
    last_sync_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Clears the syncing flag however the pass ends.
struct SyncingFlag<'a>(&'a AtomicBool);

impl<'a> SyncingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SyncingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SyncEngine {
    log: Arc<OperationLog>,
    remote: Arc<dyn RemoteGateway>,
    connectivity: Arc<dyn ConnectivitySignal>,
    resolver: Arc<ConflictResolverSlot>,
    policy: RetryPolicy,
    completed_retention: usize,
    gate: Mutex<()>,
    is_syncing: AtomicBool,
    history: RwLock<PassHistory>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    pub fn new(
        log: Arc<OperationLog>,
        remote: Arc<dyn RemoteGateway>,
        connectivity: Arc<dyn ConnectivitySignal>,
        resolver: Arc<ConflictResolverSlot>,
        policy: RetryPolicy,
        completed_retention: usize,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        Self {
            log,
            remote,
            connectivity,
            resolver,
            policy,
            completed_retention,
            gate: Mutex::new(()),
            is_syncing: AtomicBool::new(false),
            history: RwLock::new(PassHistory::default()),
            events,
        }
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::SeqCst)
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs one pass unless offline or another pass holds the gate; such triggers are
    /// dropped, not queued. Always returns a report, whatever failed inside the pass.
    pub async fn process_sync_queue(&self) -> SyncPassReport {
        if !self.is_online() {
            tracing::debug!(target: "sync::engine", "offline; sync trigger dropped");
            return SyncPassReport::skipped();
        }
        let Ok(_gate) = self.gate.try_lock() else {
            tracing::debug!(target: "sync::engine", "pass already running; sync trigger dropped");
            return SyncPassReport::skipped();
        };
        let _flag = SyncingFlag::raise(&self.is_syncing);

        self.emit(SyncEvent::PassStarted);
        let report = self.run_pass().await;

        {
            let mut history = self.history.write().await;
            history.last_sync_at = Some(now());
            history.last_error = report.first_error().map(str::to_string);
        }

        tracing::info!(
            target: "sync::engine",
            success = report.success,
            processed = report.processed,
            failed = report.failed,
            "sync pass finished"
        );
        self.emit(SyncEvent::PassCompleted {
            report: report.clone(),
        });
        report
    }

    pub async fn sync_status(&self) -> Result<SyncStatusSnapshot, AppError> {
        let pending_count = self
            .log
            .snapshot()
            .await?
            .iter()
            .filter(|op| op.status == SyncOperationStatus::Pending)
            .count();
        let history = self.history.read().await.clone();

        Ok(SyncStatusSnapshot {
            is_online: self.is_online(),
            pending_count,
            last_sync_at: history.last_sync_at,
            is_syncing: self.is_syncing(),
            last_error: history.last_error,
        })
    }

    async fn run_pass(&self) -> SyncPassReport {
        let mut report = SyncPassReport::default();

        let candidates = match self.select_candidates().await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::error!(target: "sync::engine", error = %err, "failed to read operation log");
                report.record_abort(err.to_string());
                return report.finish();
            }
        };

        for id in candidates {
            if let Err(err) = self.process_operation(&id, &mut report).await {
                // ストレージ障害はパスを中断する（確定済みの状態は巻き戻さない）
                tracing::error!(
                    target: "sync::engine",
                    operation_id = %id,
                    error = %err,
                    "storage failure; aborting sync pass"
                );
                report.record_abort(err.to_string());
                return report.finish();
            }
        }

        if let Err(err) = self.log.prune_completed(self.completed_retention).await {
            tracing::warn!(target: "sync::engine", error = %err, "failed to prune completed operations");
            report.record_abort(err.to_string());
        }

        report.finish()
    }

    /// Pending, plus failed with attempts left, in ascending `timestamp` order.
    async fn select_candidates(&self) -> Result<Vec<SyncOperationId>, AppError> {
        let mut candidates: Vec<SyncOperation> = self
            .log
            .snapshot()
            .await?
            .into_iter()
            .filter(|op| match op.status {
                SyncOperationStatus::Pending => true,
                SyncOperationStatus::Failed => !self.policy.is_exhausted(op.retry_count),
                _ => false,
            })
            .collect();

        // 安定ソートなので同時刻は挿入順のまま
        candidates.sort_by_key(|op| op.timestamp);
        Ok(candidates.into_iter().map(|op| op.id).collect())
    }

    async fn process_operation(
        &self,
        id: &SyncOperationId,
        report: &mut SyncPassReport,
    ) -> Result<(), AppError> {
        let Some(operation) = self.log.claim(id, &self.policy).await? else {
            return Ok(());
        };

        tracing::debug!(
            target: "sync::engine",
            operation_id = %operation.id,
            operation_type = %operation.operation_type,
            entity_type = %operation.entity_type,
            entity_id = %operation.entity_id,
            retry_count = operation.retry_count,
            "applying operation"
        );

        match self.remote.apply(&operation, ApplyMode::Normal).await {
            Ok(()) => self.complete(operation, report).await,
            Err(RemoteApplyError::Conflict(remote)) => {
                self.resolve_conflict(operation, remote, report).await
            }
            Err(RemoteApplyError::Transient(message)) => {
                self.fail(operation, message, false, report).await
            }
            Err(RemoteApplyError::Permanent(message)) => {
                self.fail(operation, message, true, report).await
            }
        }
    }

    async fn resolve_conflict(
        &self,
        operation: SyncOperation,
        remote: serde_json::Value,
        report: &mut SyncPassReport,
    ) -> Result<(), AppError> {
        let resolution = self.resolver.resolve(&operation, &remote);
        tracing::info!(
            target: "sync::engine",
            operation_id = %operation.id,
            resolution = ?resolution,
            "remote conflict"
        );

        match resolution {
            ConflictResolution::Local => {
                match self.remote.apply(&operation, ApplyMode::ForceLocal).await {
                    Ok(()) => self.complete(operation, report).await,
                    Err(RemoteApplyError::Conflict(_)) => {
                        let message = "Conflict persisted after forcing local write".to_string();
                        self.fail(operation, message, true, report).await
                    }
                    Err(RemoteApplyError::Transient(message)) => {
                        self.fail(operation, message, false, report).await
                    }
                    Err(RemoteApplyError::Permanent(message)) => {
                        self.fail(operation, message, true, report).await
                    }
                }
            }
            ConflictResolution::Server => {
                let operation_id = operation.id.clone();
                let entity_type = operation.entity_type.clone();
                let entity_id = operation.entity_id.clone();
                self.complete(operation, report).await?;
                self.emit(SyncEvent::ConflictServerWins {
                    operation_id,
                    entity_type,
                    entity_id,
                    remote,
                });
                Ok(())
            }
            ConflictResolution::Merge(payload) => {
                let entity_type = operation.entity_type.clone();
                let entity_id = operation.entity_id.clone();
                self.complete(operation, report).await?;
                let queued = self
                    .log
                    .enqueue_resolved(entity_type, entity_id, payload)
                    .await?;
                tracing::debug!(
                    target: "sync::engine",
                    operation_id = %queued.operation().id,
                    "merged payload queued for the next pass"
                );
                Ok(())
            }
        }
    }

    async fn complete(
        &self,
        mut operation: SyncOperation,
        report: &mut SyncPassReport,
    ) -> Result<(), AppError> {
        operation.mark_completed(now());
        self.log.update(&operation).await?;
        report.record_success();
        self.emit(SyncEvent::OperationCompleted {
            operation_id: operation.id,
        });
        Ok(())
    }

    async fn fail(
        &self,
        mut operation: SyncOperation,
        message: String,
        permanent: bool,
        report: &mut SyncPassReport,
    ) -> Result<(), AppError> {
        if permanent {
            operation.mark_permanently_failed(message.clone(), self.policy.max_attempts(), now());
        } else {
            operation.mark_failed(message.clone(), now());
        }
        self.log.update(&operation).await?;

        let exhausted = self.policy.is_exhausted(operation.retry_count);
        if exhausted {
            tracing::warn!(
                target: "sync::engine",
                operation_id = %operation.id,
                retry_count = operation.retry_count,
                error = %message,
                "operation failed permanently; manual retry required"
            );
        } else {
            tracing::warn!(
                target: "sync::engine",
                operation_id = %operation.id,
                retry_count = operation.retry_count,
                next_delay_ms = self.policy.delay_for(operation.retry_count).as_millis() as u64,
                error = %message,
                "operation failed; will retry"
            );
        }

        report.record_failure(format!("{}: {}", operation.id, message));
        self.emit(SyncEvent::OperationFailed {
            operation_id: operation.id,
            error: message,
            retry_count: operation.retry_count,
            permanent: exhausted,
        });
        Ok(())
    }

    fn emit(&self, event: SyncEvent) {
        // 購読者がいなくてもエラーにしない
        let _ = self.events.send(event);
    }
}

impl SyncTrigger for SyncEngine {
    fn request_sync(self: Arc<Self>) {
        tokio::spawn(async move {
            self.process_sync_queue().await;
        });
    }
}
