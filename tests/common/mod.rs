#![allow(dead_code)]

use async_trait::async_trait;
use kukuri_sync_queue::application::ports::{ApplyMode, RemoteApplyError, RemoteGateway};
use kukuri_sync_queue::infrastructure::database::ConnectionPool;
use kukuri_sync_queue::{
    OfflineSyncService, SqliteOperationLogStore, SyncEvent, SyncOperation, SyncPassReport,
    WatchConnectivity,
};
use kukuri_sync_queue::shared::config::{AppConfig, SyncConfig};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

/// リモート側のスタブ。エンティティ ID ごとに失敗を仕込める。
#[derive(Default)]
pub struct StubRemote {
    applied: Mutex<Vec<(String, ApplyMode, Option<Value>)>>,
    failures: Mutex<HashMap<String, RemoteApplyError>>,
    hold: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl StubRemote {
    pub fn fail_entity(&self, entity_id: &str, error: RemoteApplyError) {
        self.failures
            .lock()
            .unwrap()
            .insert(entity_id.to_string(), error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// The next apply call parks until `release` is notified.
    pub fn hold_next(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn applied(&self) -> Vec<String> {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .map(|(entity_id, _, _)| entity_id.clone())
            .collect()
    }

    pub fn applied_payloads(&self) -> Vec<Option<Value>> {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, payload)| payload.clone())
            .collect()
    }

    pub fn applied_modes(&self) -> Vec<ApplyMode> {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .map(|(_, mode, _)| *mode)
            .collect()
    }
}

#[async_trait]
impl RemoteGateway for StubRemote {
    async fn apply(
        &self,
        operation: &SyncOperation,
        mode: ApplyMode,
    ) -> Result<(), RemoteApplyError> {
        let entity_id = operation.entity_id.as_str().to_string();
        let payload = operation.payload.as_ref().map(|payload| payload.as_json());
        self.applied
            .lock()
            .unwrap()
            .push((entity_id.clone(), mode, payload));

        if self.hold.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let failure = self.failures.lock().unwrap().get(&entity_id).cloned();
        match (failure, mode) {
            // 強制書き込みは競合を上書きできる
            (Some(RemoteApplyError::Conflict(_)), ApplyMode::ForceLocal) => Ok(()),
            (Some(error), _) => Err(error),
            (None, _) => Ok(()),
        }
    }
}

pub struct SyncTestContext {
    pub service: Arc<OfflineSyncService>,
    pub connectivity: Arc<WatchConnectivity>,
    pub remote: Arc<StubRemote>,
}

pub async fn setup_in_memory(online: bool) -> SyncTestContext {
    setup_in_memory_with(online, SyncConfig::default()).await
}

pub async fn setup_in_memory_with(online: bool, config: SyncConfig) -> SyncTestContext {
    let pool = ConnectionPool::from_memory().await.expect("in-memory sqlite");
    pool.migrate().await.expect("migrations");

    let connectivity = Arc::new(WatchConnectivity::new(online));
    let remote = Arc::new(StubRemote::default());
    let service = OfflineSyncService::new(
        config,
        Arc::new(SqliteOperationLogStore::new(pool.get_pool().clone())),
        remote.clone(),
        connectivity.clone(),
    )
    .await
    .expect("service");

    SyncTestContext {
        service: Arc::new(service),
        connectivity,
        remote,
    }
}

pub fn file_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite:{}?mode=rwc", dir.join("sync_queue.db").display());
    config.sync.auto_sync = false;
    config
}

pub async fn open_file_backed(
    config: &AppConfig,
    online: bool,
) -> (OfflineSyncService, Arc<WatchConnectivity>, Arc<StubRemote>) {
    let connectivity = Arc::new(WatchConnectivity::new(online));
    let remote = Arc::new(StubRemote::default());
    let service = OfflineSyncService::open(config, remote.clone(), connectivity.clone())
        .await
        .expect("open service");
    (service, connectivity, remote)
}

/// Waits for the next completed pass on `events`.
pub async fn next_pass(events: &mut broadcast::Receiver<SyncEvent>) -> SyncPassReport {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::PassCompleted { report }) => return report,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("sync pass did not complete in time")
}
