use crate::application::ports::operation_log_store::OperationLogStore;
use crate::domain::entities::offline::{CoalesceOutcome, SyncOperation, SyncOperationDraft};
use crate::domain::value_objects::{
    EntityId, EntityType, OperationPayload, OperationType, RetryPolicy, SyncOperationId,
    SyncOperationStatus,
};
use crate::shared::error::AppError;
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store resolution is milliseconds; keep in-memory copies comparable with reloaded ones.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    Created(SyncOperation),
    Coalesced(SyncOperation),
    /// A delete was already pending for the entity; the queue is unchanged.
    Ignored(SyncOperation),
}

impl EnqueueOutcome {
    pub fn operation(&self) -> &SyncOperation {
        match self {
            EnqueueOutcome::Created(op)
            | EnqueueOutcome::Coalesced(op)
            | EnqueueOutcome::Ignored(op) => op,
        }
    }

    pub fn into_operation(self) -> SyncOperation {
        match self {
            EnqueueOutcome::Created(op)
            | EnqueueOutcome::Coalesced(op)
            | EnqueueOutcome::Ignored(op) => op,
        }
    }

    pub fn changed_queue(&self) -> bool {
        !matches!(self, EnqueueOutcome::Ignored(_))
    }
}

/// Single logical writer over an [`OperationLogStore`].
///
/// Queue and engine both mutate through here; every read-modify-write runs under
/// `writer`, so a coalescing merge can never interleave with a status transition.
pub struct OperationLog {
    store: Arc<dyn OperationLogStore>,
    writer: Mutex<()>,
}

impl OperationLog {
    pub fn new(store: Arc<dyn OperationLogStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> Result<Vec<SyncOperation>, AppError> {
        self.store.load().await
    }

    pub async fn enqueue(&self, draft: SyncOperationDraft) -> Result<EnqueueOutcome, AppError> {
        let _guard = self.writer.lock().await;
        let now = now();

        let existing = self
            .store
            .load()
            .await?
            .into_iter()
            .find(|op| op.is_pending() && op.targets(&draft.entity_type, &draft.entity_id));

        let Some(existing) = existing else {
            let operation = SyncOperation::from_draft(draft, now);
            self.store.append(&operation).await?;
            return Ok(EnqueueOutcome::Created(operation));
        };

        match existing.coalesce(draft, now) {
            CoalesceOutcome::Merged(merged) => {
                self.store.replace(&merged).await?;
                Ok(EnqueueOutcome::Coalesced(merged))
            }
            CoalesceOutcome::Ignored => Ok(EnqueueOutcome::Ignored(existing)),
        }
    }

    /// Queues the payload chosen by a conflict merge. A pending operation for the entity
    /// was enqueued after the conflicting apply started, so its keys win over the merge.
    pub async fn enqueue_resolved(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
        payload: OperationPayload,
    ) -> Result<EnqueueOutcome, AppError> {
        let _guard = self.writer.lock().await;
        let now = now();

        let existing = self
            .store
            .load()
            .await?
            .into_iter()
            .find(|op| op.is_pending() && op.targets(&entity_type, &entity_id));

        let Some(existing) = existing else {
            let draft = SyncOperationDraft::new(
                OperationType::Update,
                entity_type,
                entity_id,
                Some(payload),
            );
            let operation = SyncOperation::from_draft(draft, now);
            self.store.append(&operation).await?;
            return Ok(EnqueueOutcome::Created(operation));
        };

        match existing.absorb_resolved(payload, now) {
            CoalesceOutcome::Merged(merged) => {
                self.store.replace(&merged).await?;
                Ok(EnqueueOutcome::Coalesced(merged))
            }
            CoalesceOutcome::Ignored => Ok(EnqueueOutcome::Ignored(existing)),
        }
    }

    /// Moves a candidate to `processing` if it is still eligible, using the stored copy
    /// so merges made since candidate selection are not lost.
    pub async fn claim(
        &self,
        id: &SyncOperationId,
        policy: &RetryPolicy,
    ) -> Result<Option<SyncOperation>, AppError> {
        let _guard = self.writer.lock().await;

        let Some(mut operation) = self.store.get(id).await? else {
            return Ok(None);
        };

        let eligible = match operation.status {
            SyncOperationStatus::Pending => true,
            SyncOperationStatus::Failed => !policy.is_exhausted(operation.retry_count),
            SyncOperationStatus::Processing | SyncOperationStatus::Completed => false,
        };
        if !eligible {
            return Ok(None);
        }

        operation.mark_processing(now());
        self.store.replace(&operation).await?;
        Ok(Some(operation))
    }

    pub async fn update(&self, operation: &SyncOperation) -> Result<(), AppError> {
        let _guard = self.writer.lock().await;
        self.store.replace(operation).await
    }

    /// Drops the oldest completed operations beyond `retain`. Pending and failed
    /// operations are never touched.
    pub async fn prune_completed(&self, retain: usize) -> Result<usize, AppError> {
        let _guard = self.writer.lock().await;

        let mut completed: Vec<SyncOperation> = self
            .store
            .load()
            .await?
            .into_iter()
            .filter(|op| op.status == SyncOperationStatus::Completed)
            .collect();
        if completed.len() <= retain {
            return Ok(0);
        }

        // 完了時刻の古い順（同時刻は挿入順）
        completed.sort_by_key(|op| op.completed_at.unwrap_or(op.updated_at));
        let excess = completed.len() - retain;
        for op in completed.iter().take(excess) {
            self.store.remove(&op.id).await?;
        }

        tracing::debug!(
            target: "sync::store",
            removed = excess,
            retained = retain,
            "pruned completed operations"
        );
        Ok(excess)
    }

    /// Re-opens operations left in `processing` by a process that died mid-apply.
    pub async fn recover_interrupted(&self) -> Result<usize, AppError> {
        let _guard = self.writer.lock().await;
        let now = now();

        let mut recovered = 0usize;
        for mut op in self.store.load().await? {
            if op.status == SyncOperationStatus::Processing {
                op.reopen_interrupted(now);
                self.store.replace(&op).await?;
                recovered += 1;
            }
        }

        if recovered > 0 {
            tracing::info!(
                target: "sync::store",
                recovered,
                "re-opened operations interrupted mid-sync"
            );
            self.fold_pending_duplicates(now).await?;
        }
        Ok(recovered)
    }

    /// Resets failed operations (all, or just `only`) to pending with a fresh attempt budget.
    pub async fn reset_failed(&self, only: Option<&SyncOperationId>) -> Result<usize, AppError> {
        let _guard = self.writer.lock().await;
        let now = now();

        let mut reset = 0usize;
        for mut op in self.store.load().await? {
            if op.status != SyncOperationStatus::Failed {
                continue;
            }
            if only.is_some_and(|id| id != &op.id) {
                continue;
            }
            op.reset_for_retry(now);
            self.store.replace(&op).await?;
            reset += 1;
        }

        if let Some(id) = only {
            if reset == 0 {
                return Err(AppError::NotFound(format!(
                    "Failed sync operation not found: {id}"
                )));
            }
        }
        if reset > 0 {
            self.fold_pending_duplicates(now).await?;
        }
        Ok(reset)
    }

    /// Re-opened operations can share an entity with a pending operation enqueued
    /// meanwhile. Folds each such group into its oldest member with the enqueue rules,
    /// so the entity keeps one pending slot, its original position, and the newest values.
    /// Caller holds `writer`.
    async fn fold_pending_duplicates(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut groups: BTreeMap<(EntityType, EntityId), Vec<SyncOperation>> = BTreeMap::new();
        for op in self.store.load().await? {
            if op.is_pending() {
                groups
                    .entry((op.entity_type.clone(), op.entity_id.clone()))
                    .or_default()
                    .push(op);
            }
        }

        let mut folded = 0usize;
        for (_, mut ops) in groups {
            if ops.len() < 2 {
                continue;
            }
            // 同時刻は挿入順のまま
            ops.sort_by_key(|op| op.timestamp);
            let mut ops = ops.into_iter();
            let Some(mut slot) = ops.next() else {
                continue;
            };
            let newer: Vec<SyncOperation> = ops.collect();
            for op in &newer {
                if let CoalesceOutcome::Merged(merged) = slot.coalesce(op.to_draft(), now) {
                    slot = merged;
                }
            }

            // 残す側を先に書く（途中で落ちても次の回復で畳み直せる）
            self.store.replace(&slot).await?;
            for op in &newer {
                self.store.remove(&op.id).await?;
            }
            folded += newer.len();

            tracing::debug!(
                target: "sync::store",
                operation_id = %slot.id,
                entity_type = %slot.entity_type,
                entity_id = %slot.entity_id,
                folded = newer.len(),
                "folded duplicate pending operations"
            );
        }
        Ok(folded)
    }

    pub async fn clear_failed(&self) -> Result<usize, AppError> {
        let _guard = self.writer.lock().await;

        let failed: Vec<SyncOperation> = self
            .store
            .load()
            .await?
            .into_iter()
            .filter(|op| op.status == SyncOperationStatus::Failed)
            .collect();
        for op in &failed {
            self.store.remove(&op.id).await?;
        }
        Ok(failed.len())
    }
}
