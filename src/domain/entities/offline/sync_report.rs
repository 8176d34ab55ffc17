use serde::{Deserialize, Serialize};

/// Outcome of one sync pass. `processed` counts operations that reached `completed`,
/// `failed` those that ended the pass in `failed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncPassReport {
    pub success: bool,
    pub processed: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

impl SyncPassReport {
    /// Returned when the trigger is dropped (offline or a pass already running).
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
    }

    pub fn record_failure(&mut self, error: String) {
        self.failed += 1;
        self.errors.push(error);
    }

    pub fn record_abort(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    pub fn finish(mut self) -> Self {
        self.success = self.failed == 0 && self.errors.is_empty();
        self
    }
}
