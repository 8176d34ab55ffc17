use crate::application::ports::connectivity::ConnectivitySignal;
use tokio::sync::watch;

/// Connectivity signal driven by the host (OS network callbacks, a heartbeat, tests).
pub struct WatchConnectivity {
    sender: watch::Sender<bool>,
}

impl WatchConnectivity {
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        Self { sender }
    }

    /// Publishes a new state. Repeating the current state is not a transition.
    pub fn set_online(&self, online: bool) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(target: "sync::connectivity", online, "connectivity changed");
        }
    }
}

impl ConnectivitySignal for WatchConnectivity {
    fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_repeated_state_is_not_a_transition() {
        let signal = WatchConnectivity::new(false);
        let mut rx = signal.subscribe();

        signal.set_online(false);
        assert!(!rx.has_changed().unwrap());

        signal.set_online(true);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        assert!(signal.is_online());
    }
}
