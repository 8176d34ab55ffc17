use super::SyncOperation;
use crate::domain::value_objects::{OperationType, SyncOperationStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub total_operations: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub by_type: BTreeMap<OperationType, usize>,
    pub average_retries: f64,
}

impl SyncStats {
    pub fn from_operations(operations: &[SyncOperation]) -> Self {
        let mut stats = SyncStats {
            total_operations: operations.len(),
            ..Default::default()
        };
        let mut total_retries: u64 = 0;

        for op in operations {
            match op.status {
                SyncOperationStatus::Pending => stats.pending += 1,
                SyncOperationStatus::Processing => stats.processing += 1,
                SyncOperationStatus::Completed => stats.completed += 1,
                SyncOperationStatus::Failed => stats.failed += 1,
            }
            *stats.by_type.entry(op.operation_type).or_default() += 1;
            total_retries += u64::from(op.retry_count);
        }

        if !operations.is_empty() {
            stats.average_retries = total_retries as f64 / operations.len() as f64;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::offline::SyncOperationDraft;
    use crate::domain::value_objects::{EntityId, EntityType};
    use chrono::Utc;

    fn op(kind: OperationType, id: &str) -> SyncOperation {
        SyncOperation::from_draft(
            SyncOperationDraft::new(
                kind,
                EntityType::new("contact".into()).unwrap(),
                EntityId::new(id.into()).unwrap(),
                None,
            ),
            Utc::now(),
        )
    }

    #[test]
    fn counts_statuses_types_and_retries() {
        let mut failed = op(OperationType::Update, "c2");
        failed.mark_failed("timeout".into(), Utc::now());
        failed.mark_failed("timeout".into(), Utc::now());
        let mut done = op(OperationType::Create, "c3");
        done.mark_completed(Utc::now());

        let stats = SyncStats::from_operations(&[op(OperationType::Create, "c1"), failed, done]);

        assert_eq!(stats.total_operations, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.by_type.get(&OperationType::Create), Some(&2));
        assert_eq!(stats.by_type.get(&OperationType::Update), Some(&1));
        assert!((stats.average_retries - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_queue_has_zero_average() {
        let stats = SyncStats::from_operations(&[]);
        assert_eq!(stats.total_operations, 0);
        assert_eq!(stats.average_retries, 0.0);
    }
}
