use crate::application::ports::conflict_resolver::{ConflictResolution, ConflictResolver};
use crate::domain::entities::offline::SyncOperation;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};

/// Default policy: the local write wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalWinsResolver;

impl ConflictResolver for LocalWinsResolver {
    fn resolve(&self, _operation: &SyncOperation, _remote: &Value) -> ConflictResolution {
        ConflictResolution::Local
    }
}

/// Holds exactly one resolver. Registering replaces the previous one; there is no chaining.
pub struct ConflictResolverSlot {
    handler: RwLock<Arc<dyn ConflictResolver>>,
}

impl ConflictResolverSlot {
    pub fn new() -> Self {
        Self::with_handler(Arc::new(LocalWinsResolver))
    }

    pub fn with_handler(handler: Arc<dyn ConflictResolver>) -> Self {
        Self {
            handler: RwLock::new(handler),
        }
    }

    pub fn register(&self, handler: Arc<dyn ConflictResolver>) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = handler;
    }

    pub fn reset(&self) {
        self.register(Arc::new(LocalWinsResolver));
    }

    pub fn resolve(&self, operation: &SyncOperation, remote: &Value) -> ConflictResolution {
        let handler = {
            let guard = self.handler.read().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(&*guard)
        };
        handler.resolve(operation, remote)
    }
}

impl Default for ConflictResolverSlot {
    fn default() -> Self {
        Self::new()
    }
}
