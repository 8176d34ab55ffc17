use crate::application::ports::connectivity::ConnectivitySignal;
use crate::application::ports::sync_trigger::SyncTrigger;
use crate::domain::entities::offline::SyncEvent;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Bridges connectivity transitions into sync triggers. Going online requests one
/// pass; going offline never aborts a running pass.
pub struct ConnectivityMonitor {
    connectivity: Arc<dyn ConnectivitySignal>,
    trigger: Arc<dyn SyncTrigger>,
    events: broadcast::Sender<SyncEvent>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    pub fn new(
        connectivity: Arc<dyn ConnectivitySignal>,
        trigger: Arc<dyn SyncTrigger>,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        Self {
            connectivity,
            trigger,
            events,
            listener: Mutex::new(None),
        }
    }

    /// Installs the listener. Idempotent: returns `false` if one is already running.
    pub fn setup(&self) -> bool {
        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if listener.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }

        let mut rx = self.connectivity.subscribe();
        let trigger = Arc::clone(&self.trigger);
        let events = self.events.clone();
        let mut last = *rx.borrow_and_update();

        *listener = Some(tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online == last {
                    continue;
                }
                last = online;

                tracing::info!(target: "sync::connectivity", online, "connectivity transition");
                let _ = events.send(SyncEvent::ConnectivityChanged { online });
                if online {
                    Arc::clone(&trigger).request_sync();
                }
            }
            tracing::debug!(target: "sync::connectivity", "connectivity signal closed");
        }));
        true
    }

    pub fn is_active(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn teardown(&self) {
        if let Some(task) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::connectivity::WatchConnectivity;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration};

    #[derive(Default)]
    struct CountingTrigger {
        requests: AtomicUsize,
    }

    impl SyncTrigger for CountingTrigger {
        fn request_sync(self: Arc<Self>) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn settle() {
        sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_online_transition_triggers_once_even_after_double_setup() {
        let signal = Arc::new(WatchConnectivity::new(false));
        let trigger = Arc::new(CountingTrigger::default());
        let (events, mut rx) = broadcast::channel(16);
        let monitor = ConnectivityMonitor::new(signal.clone(), trigger.clone(), events);

        assert!(monitor.setup());
        assert!(!monitor.setup());
        assert!(monitor.is_active());

        signal.set_online(true);
        settle().await;
        assert_eq!(trigger.requests.load(Ordering::SeqCst), 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            SyncEvent::ConnectivityChanged { online: true }
        );

        signal.set_online(false);
        settle().await;
        assert_eq!(trigger.requests.load(Ordering::SeqCst), 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            SyncEvent::ConnectivityChanged { online: false }
        );
    }

    #[tokio::test]
    async fn test_teardown_stops_listening() {
        let signal = Arc::new(WatchConnectivity::new(false));
        let trigger = Arc::new(CountingTrigger::default());
        let (events, _rx) = broadcast::channel(16);
        let monitor = ConnectivityMonitor::new(signal.clone(), trigger.clone(), events);

        monitor.setup();
        monitor.teardown();
        settle().await;
        assert!(!monitor.is_active());

        signal.set_online(true);
        settle().await;
        assert_eq!(trigger.requests.load(Ordering::SeqCst), 0);
    }
}
