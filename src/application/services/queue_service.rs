use super::operation_log::{EnqueueOutcome, OperationLog};
use crate::application::ports::connectivity::ConnectivitySignal;
use crate::application::ports::sync_trigger::SyncTrigger;
use crate::domain::entities::offline::{SyncOperation, SyncOperationDraft};
use crate::domain::value_objects::{EntityId, EntityType, OperationPayload, OperationType};
use crate::shared::error::AppError;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EnqueueParams {
    pub operation_type: OperationType,
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub payload: Option<Value>,
}

impl EnqueueParams {
    pub fn parse(
        operation_type: OperationType,
        entity_type: &str,
        entity_id: &str,
        payload: Option<Value>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            operation_type,
            entity_type: EntityType::new(entity_type.to_string())
                .map_err(AppError::ValidationError)?,
            entity_id: EntityId::new(entity_id.to_string()).map_err(AppError::ValidationError)?,
            payload,
        })
    }
}

/// Turns mutation intents into coalesced, persisted operations.
pub struct QueueService {
    log: Arc<OperationLog>,
    connectivity: Arc<dyn ConnectivitySignal>,
    trigger: Option<Arc<dyn SyncTrigger>>,
}

impl QueueService {
    pub fn new(
        log: Arc<OperationLog>,
        connectivity: Arc<dyn ConnectivitySignal>,
        trigger: Option<Arc<dyn SyncTrigger>>,
    ) -> Self {
        Self {
            log,
            connectivity,
            trigger,
        }
    }

    fn build_draft(params: EnqueueParams) -> Result<SyncOperationDraft, AppError> {
        let payload = match (params.operation_type, params.payload) {
            (OperationType::Delete, _) | (_, None) => None,
            (_, Some(value)) => {
                Some(OperationPayload::new(value).map_err(AppError::ValidationError)?)
            }
        };

        Ok(SyncOperationDraft::new(
            params.operation_type,
            params.entity_type,
            params.entity_id,
            payload,
        ))
    }

    /// Persists the intent, then requests a pass if online. The request is
    /// fire-and-forget; a storage failure surfaces here and leaves the log unchanged.
    pub async fn enqueue(&self, params: EnqueueParams) -> Result<SyncOperation, AppError> {
        let draft = Self::build_draft(params)?;
        let outcome = self.log.enqueue(draft).await?;

        match &outcome {
            EnqueueOutcome::Created(op) => tracing::debug!(
                target: "sync::queue",
                operation_id = %op.id,
                operation_type = %op.operation_type,
                entity_type = %op.entity_type,
                entity_id = %op.entity_id,
                "operation queued"
            ),
            EnqueueOutcome::Coalesced(op) => tracing::debug!(
                target: "sync::queue",
                operation_id = %op.id,
                operation_type = %op.operation_type,
                entity_type = %op.entity_type,
                entity_id = %op.entity_id,
                "operation coalesced into pending slot"
            ),
            EnqueueOutcome::Ignored(op) => tracing::info!(
                target: "sync::queue",
                operation_id = %op.id,
                entity_type = %op.entity_type,
                entity_id = %op.entity_id,
                "delete already pending; intent ignored"
            ),
        }

        if outcome.changed_queue() && self.connectivity.is_online() {
            if let Some(trigger) = &self.trigger {
                Arc::clone(trigger).request_sync();
            }
        }

        Ok(outcome.into_operation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::operation_log_store::OperationLogStore;
    use crate::domain::value_objects::{SyncOperationId, SyncOperationStatus};
    use crate::infrastructure::connectivity::WatchConnectivity;
    use crate::infrastructure::database::ConnectionPool;
    use crate::infrastructure::offline::SqliteOperationLogStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTrigger {
        requests: AtomicUsize,
    }

    impl SyncTrigger for CountingTrigger {
        fn request_sync(self: Arc<Self>) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    #[async_trait]
    impl OperationLogStore for BrokenStore {
        async fn load(&self) -> Result<Vec<SyncOperation>, AppError> {
            Ok(vec![])
        }
        async fn get(&self, _id: &SyncOperationId) -> Result<Option<SyncOperation>, AppError> {
            Ok(None)
        }
        async fn save(&self, _operations: &[SyncOperation]) -> Result<(), AppError> {
            Err(AppError::Storage("disk full".into()))
        }
        async fn append(&self, _operation: &SyncOperation) -> Result<(), AppError> {
            Err(AppError::Storage("disk full".into()))
        }
        async fn replace(&self, _operation: &SyncOperation) -> Result<(), AppError> {
            Err(AppError::Storage("disk full".into()))
        }
        async fn remove(&self, _id: &SyncOperationId) -> Result<(), AppError> {
            Err(AppError::Storage("disk full".into()))
        }
    }

    async fn setup_service(
        online: bool,
    ) -> (QueueService, Arc<OperationLog>, Arc<CountingTrigger>) {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        let log = Arc::new(OperationLog::new(Arc::new(SqliteOperationLogStore::new(
            pool.get_pool().clone(),
        ))));
        let trigger = Arc::new(CountingTrigger::default());
        let service = QueueService::new(
            log.clone(),
            Arc::new(WatchConnectivity::new(online)),
            Some(trigger.clone()),
        );
        (service, log, trigger)
    }

    fn params(kind: OperationType, entity_id: &str, payload: Option<Value>) -> EnqueueParams {
        EnqueueParams::parse(kind, "contact", entity_id, payload).unwrap()
    }

    #[tokio::test]
    async fn test_updates_coalesce_into_single_operation() {
        let (service, log, _) = setup_service(false).await;

        service
            .enqueue(params(OperationType::Update, "c1", Some(json!({"x": 1}))))
            .await
            .unwrap();
        let op = service
            .enqueue(params(OperationType::Update, "c1", Some(json!({"y": 2}))))
            .await
            .unwrap();

        assert_eq!(op.payload.unwrap().into_inner(), json!({"x": 1, "y": 2}));
        let ops = log.snapshot().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].status, SyncOperationStatus::Pending);
    }

    #[tokio::test]
    async fn test_delete_supersedes_pending_create() {
        let (service, log, _) = setup_service(false).await;

        service
            .enqueue(params(
                OperationType::Create,
                "c1",
                Some(json!({"name": "A"})),
            ))
            .await
            .unwrap();
        service
            .enqueue(params(OperationType::Delete, "c1", None))
            .await
            .unwrap();

        let ops = log.snapshot().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operation_type, OperationType::Delete);
        assert!(ops[0].payload.is_none());
    }

    #[tokio::test]
    async fn test_trigger_only_when_online() {
        let (offline, _, offline_trigger) = setup_service(false).await;
        offline
            .enqueue(params(OperationType::Create, "c1", None))
            .await
            .unwrap();
        assert_eq!(offline_trigger.requests.load(Ordering::SeqCst), 0);

        let (online, _, online_trigger) = setup_service(true).await;
        online
            .enqueue(params(OperationType::Create, "c1", None))
            .await
            .unwrap();
        assert_eq!(online_trigger.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejects_invalid_input() {
        assert!(matches!(
            EnqueueParams::parse(OperationType::Create, "", "c1", None),
            Err(AppError::ValidationError(_))
        ));

        let (service, _, _) = setup_service(false).await;
        let err = service
            .enqueue(params(OperationType::Update, "c1", Some(json!([1, 2]))))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let log = Arc::new(OperationLog::new(Arc::new(BrokenStore)));
        let trigger = Arc::new(CountingTrigger::default());
        let service = QueueService::new(
            log,
            Arc::new(WatchConnectivity::new(true)),
            Some(trigger.clone()),
        );

        let err = service
            .enqueue(params(OperationType::Create, "c1", None))
            .await
            .unwrap_err();

        assert!(err.is_storage());
        assert_eq!(trigger.requests.load(Ordering::SeqCst), 0);
    }
}
