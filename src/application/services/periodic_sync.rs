use super::sync_engine::SyncEngine;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(30_000);

/// Recurring trigger, independent of connectivity transitions and enqueue events.
pub struct PeriodicSyncDriver {
    engine: Arc<SyncEngine>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicSyncDriver {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            timer: Mutex::new(None),
        }
    }

    /// Starts the timer. A second call while running is a no-op and returns `false`.
    pub fn start(&self, interval: Duration) -> bool {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }

        let engine = Arc::clone(&self.engine);
        let period = interval.max(Duration::from_millis(1));
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // 初回 tick は即時に完了するので読み捨てる
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if engine.is_online() && !engine.is_syncing() {
                    engine.process_sync_queue().await;
                }
            }
        }));

        tracing::info!(
            target: "sync::periodic",
            interval_ms = period.as_millis() as u64,
            "periodic sync started"
        );
        true
    }

    /// Cancels the timer. Returns `false` when it was not running.
    pub fn stop(&self) -> bool {
        let task = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match task {
            Some(task) => {
                task.abort();
                tracing::info!(target: "sync::periodic", "periodic sync stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for PeriodicSyncDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
