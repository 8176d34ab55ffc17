use super::mappers::{payload_to_column, sync_operation_from_row};
use super::rows::SyncOperationRow;
use crate::application::ports::operation_log_store::OperationLogStore;
use crate::domain::entities::offline::SyncOperation;
use crate::domain::value_objects::SyncOperationId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::{Executor, Pool, Sqlite};

const INSERT_OPERATION: &str = r#"
    INSERT INTO sync_operations (
        id, operation_type, entity_type, entity_id, payload,
        timestamp, retry_count, status, error, updated_at, completed_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;

pub struct SqliteOperationLogStore {
    pool: Pool<Sqlite>,
}

impl SqliteOperationLogStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn insert<'e, E>(executor: E, operation: &SyncOperation) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let payload = payload_to_column(operation)?;
        sqlx::query(INSERT_OPERATION)
            .bind(operation.id.as_str())
            .bind(operation.operation_type.as_str())
            .bind(operation.entity_type.as_str())
            .bind(operation.entity_id.as_str())
            .bind(payload)
            .bind(operation.timestamp.timestamp_millis())
            .bind(i64::from(operation.retry_count))
            .bind(operation.status.as_str())
            .bind(operation.error.as_deref())
            .bind(operation.updated_at.timestamp_millis())
            .bind(operation.completed_at.map(|at| at.timestamp_millis()))
            .execute(executor)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OperationLogStore for SqliteOperationLogStore {
    async fn load(&self) -> Result<Vec<SyncOperation>, AppError> {
        let rows = sqlx::query_as::<_, SyncOperationRow>(
            r#"
            SELECT seq, id, operation_type, entity_type, entity_id, payload,
                   timestamp, retry_count, status, error, updated_at, completed_at
            FROM sync_operations
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(sync_operation_from_row).collect()
    }

    async fn get(&self, id: &SyncOperationId) -> Result<Option<SyncOperation>, AppError> {
        let row = sqlx::query_as::<_, SyncOperationRow>(
            r#"
            SELECT seq, id, operation_type, entity_type, entity_id, payload,
                   timestamp, retry_count, status, error, updated_at, completed_at
            FROM sync_operations
            WHERE id = ?1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(sync_operation_from_row).transpose()
    }

    async fn save(&self, operations: &[SyncOperation]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM sync_operations")
            .execute(&mut *tx)
            .await?;
        for operation in operations {
            Self::insert(&mut *tx, operation).await?;
        }
        tx.commit().await?;

        tracing::debug!(
            target: "sync::store",
            count = operations.len(),
            "operation log rewritten"
        );
        Ok(())
    }

    async fn append(&self, operation: &SyncOperation) -> Result<(), AppError> {
        Self::insert(&self.pool, operation).await
    }

    async fn replace(&self, operation: &SyncOperation) -> Result<(), AppError> {
        let payload = payload_to_column(operation)?;
        let result = sqlx::query(
            r#"
            UPDATE sync_operations
            SET operation_type = ?1,
                payload = ?2,
                retry_count = ?3,
                status = ?4,
                error = ?5,
                updated_at = ?6,
                completed_at = ?7
            WHERE id = ?8
            "#,
        )
        .bind(operation.operation_type.as_str())
        .bind(payload)
        .bind(i64::from(operation.retry_count))
        .bind(operation.status.as_str())
        .bind(operation.error.as_deref())
        .bind(operation.updated_at.timestamp_millis())
        .bind(operation.completed_at.map(|at| at.timestamp_millis()))
        .bind(operation.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Sync operation not found: {}",
                operation.id
            )));
        }
        Ok(())
    }

    async fn remove(&self, id: &SyncOperationId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM sync_operations WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Sync operation not found: {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::offline::SyncOperationDraft;
    use crate::domain::value_objects::{
        EntityId, EntityType, OperationPayload, OperationType, SyncOperationStatus,
    };
    use crate::infrastructure::database::ConnectionPool;
    use chrono::{SubsecRound, Utc};

    async fn setup_store() -> SqliteOperationLogStore {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        SqliteOperationLogStore::new(pool.get_pool().clone())
    }

    fn sample_operation(entity_id: &str) -> SyncOperation {
        SyncOperation::from_draft(
            SyncOperationDraft::new(
                OperationType::Create,
                EntityType::new("contact".into()).unwrap(),
                EntityId::new(entity_id.into()).unwrap(),
                Some(OperationPayload::from_json_str(r#"{"name":"A"}"#).unwrap()),
            ),
            Utc::now().trunc_subsecs(3),
        )
    }

    #[tokio::test]
    async fn test_append_and_load_preserve_insertion_order() {
        let store = setup_store().await;
        let first = sample_operation("c2");
        let second = sample_operation("c1");

        store.append(&first).await.unwrap();
        store.append(&second).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, vec![first, second]);
    }

    #[tokio::test]
    async fn test_replace_updates_mutable_fields() {
        let store = setup_store().await;
        let mut op = sample_operation("c1");
        store.append(&op).await.unwrap();

        op.mark_failed("timeout".into(), Utc::now().trunc_subsecs(3));
        store.replace(&op).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, SyncOperationStatus::Failed);
        assert_eq!(loaded[0].retry_count, 1);
        assert_eq!(loaded[0].error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_get_fetches_single_record() {
        let store = setup_store().await;
        let op = sample_operation("c1");
        store.append(&sample_operation("c0")).await.unwrap();
        store.append(&op).await.unwrap();

        assert_eq!(store.get(&op.id).await.unwrap(), Some(op));
        assert_eq!(
            store.get(&SyncOperationId::generate()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_replace_and_remove_missing_record() {
        let store = setup_store().await;
        let op = sample_operation("c1");

        assert!(matches!(
            store.replace(&op).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(store.remove(&op.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_append_leaves_state_untouched() {
        let store = setup_store().await;
        let op = sample_operation("c1");
        store.append(&op).await.unwrap();

        let err = store.append(&op).await.unwrap_err();
        assert!(err.is_storage());
        assert_eq!(store.load().await.unwrap(), vec![op]);
    }

    #[tokio::test]
    async fn test_save_rewrites_log_in_order() {
        let store = setup_store().await;
        let a = sample_operation("a");
        let b = sample_operation("b");
        let c = sample_operation("c");
        store.append(&a).await.unwrap();

        store.save(&[c.clone(), b.clone()]).await.unwrap();

        assert_eq!(store.load().await.unwrap(), vec![c, b]);
    }
}
