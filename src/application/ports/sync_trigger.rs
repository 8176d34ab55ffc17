use std::sync::Arc;

/// Fire-and-forget request for a sync pass. Must not block the caller.
pub trait SyncTrigger: Send + Sync {
    fn request_sync(self: Arc<Self>);
}
