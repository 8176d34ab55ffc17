use crate::domain::value_objects::{
    EntityId, EntityType, OperationPayload, OperationType, SyncOperationId, SyncOperationStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mutation intent as handed to the queue, before it has an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOperationDraft {
    pub operation_type: OperationType,
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub payload: Option<OperationPayload>,
}

impl SyncOperationDraft {
    pub fn new(
        operation_type: OperationType,
        entity_type: EntityType,
        entity_id: EntityId,
        payload: Option<OperationPayload>,
    ) -> Self {
        // delete はペイロードを持たない / create・update は空オブジェクトで補う
        let payload = if operation_type.carries_payload() {
            Some(payload.unwrap_or_else(OperationPayload::empty))
        } else {
            None
        };
        Self {
            operation_type,
            entity_type,
            entity_id,
            payload,
        }
    }

    pub fn targets(&self, entity_type: &EntityType, entity_id: &EntityId) -> bool {
        &self.entity_type == entity_type && &self.entity_id == entity_id
    }
}

/// Result of folding a new intent into the pending operation for the same entity.
#[derive(Debug, Clone, PartialEq)]
pub enum CoalesceOutcome {
    /// The pending operation was rewritten in place (same id, same timestamp).
    Merged(SyncOperation),
    /// A delete is already pending; the intent is dropped and the queue is unchanged.
    Ignored,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncOperation {
    pub id: SyncOperationId,
    pub operation_type: OperationType,
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub payload: Option<OperationPayload>,
    /// Original enqueue time of the coalesced chain; the only execution ordering key.
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
    pub status: SyncOperationStatus,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncOperation {
    pub fn from_draft(draft: SyncOperationDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: SyncOperationId::generate(),
            operation_type: draft.operation_type,
            entity_type: draft.entity_type,
            entity_id: draft.entity_id,
            payload: draft.payload,
            timestamp: now,
            retry_count: 0,
            status: SyncOperationStatus::Pending,
            error: None,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn targets(&self, entity_type: &EntityType, entity_id: &EntityId) -> bool {
        &self.entity_type == entity_type && &self.entity_id == entity_id
    }

    pub fn is_pending(&self) -> bool {
        self.status == SyncOperationStatus::Pending
    }

    /// Folds `incoming` into this pending operation.
    ///
    /// | existing | incoming | result |
    /// |---|---|---|
    /// | create | update / create | create, payload merged (incoming wins) |
    /// | update | update / create | update, payload merged (incoming wins) |
    /// | create / update | delete | delete, payload discarded |
    /// | delete | any | ignored |
    pub fn coalesce(&self, incoming: SyncOperationDraft, now: DateTime<Utc>) -> CoalesceOutcome {
        let mut merged = self.clone();
        merged.updated_at = now;

        match (self.operation_type, incoming.operation_type) {
            (OperationType::Delete, _) => return CoalesceOutcome::Ignored,
            (_, OperationType::Delete) => {
                merged.operation_type = OperationType::Delete;
                merged.payload = None;
            }
            (_, OperationType::Create | OperationType::Update) => {
                let mut payload = merged.payload.take().unwrap_or_else(OperationPayload::empty);
                if let Some(newer) = incoming.payload {
                    payload.merge(newer);
                }
                merged.payload = Some(payload);
            }
        }

        CoalesceOutcome::Merged(merged)
    }

    /// Lays a conflict-merge payload underneath this pending operation. Keys this operation
    /// already carries were written later than the conflicting apply, so they win.
    pub fn absorb_resolved(&self, resolved: OperationPayload, now: DateTime<Utc>) -> CoalesceOutcome {
        if self.operation_type == OperationType::Delete {
            return CoalesceOutcome::Ignored;
        }

        let mut merged = self.clone();
        let mut payload = resolved;
        if let Some(newer) = merged.payload.take() {
            payload.merge(newer);
        }
        merged.payload = Some(payload);
        merged.updated_at = now;
        CoalesceOutcome::Merged(merged)
    }

    /// The intent this operation carries, for folding into another pending operation.
    pub fn to_draft(&self) -> SyncOperationDraft {
        SyncOperationDraft::new(
            self.operation_type,
            self.entity_type.clone(),
            self.entity_id.clone(),
            self.payload.clone(),
        )
    }

    pub fn mark_processing(&mut self, now: DateTime<Utc>) {
        self.status = SyncOperationStatus::Processing;
        self.updated_at = now;
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = SyncOperationStatus::Completed;
        self.error = None;
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    /// Transient failure: one more attempt consumed.
    pub fn mark_failed(&mut self, error: String, now: DateTime<Utc>) {
        self.status = SyncOperationStatus::Failed;
        self.retry_count = self.retry_count.saturating_add(1);
        self.error = Some(error);
        self.updated_at = now;
    }

    /// Permanent failure: the attempt budget is spent in one go.
    pub fn mark_permanently_failed(&mut self, error: String, max_attempts: u32, now: DateTime<Utc>) {
        self.status = SyncOperationStatus::Failed;
        self.retry_count = self.retry_count.max(max_attempts);
        self.error = Some(error);
        self.updated_at = now;
    }

    /// Manual retry after external remediation.
    pub fn reset_for_retry(&mut self, now: DateTime<Utc>) {
        self.status = SyncOperationStatus::Pending;
        self.retry_count = 0;
        self.error = None;
        self.updated_at = now;
    }

    /// Put back an operation interrupted mid-apply (process died while `processing`).
    pub fn reopen_interrupted(&mut self, now: DateTime<Utc>) {
        self.status = SyncOperationStatus::Pending;
        self.updated_at = now;
    }
}
