use tokio::sync::watch;

/// External online/offline signal.
pub trait ConnectivitySignal: Send + Sync {
    fn is_online(&self) -> bool;
    /// Receiver that observes every transition.
    fn subscribe(&self) -> watch::Receiver<bool>;
}
