use std::time::Duration;

pub const DEFAULT_RETRY_DELAYS_MS: [u64; 5] = [1_000, 5_000, 15_000, 60_000, 300_000];
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// 固定テーブルによるバックオフ。指数バックオフではない。
///
/// The delay is advisory: the engine never sleeps on it, it only stops selecting
/// operations whose `retry_count` has reached `max_attempts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>, max_attempts: u32) -> Self {
        let delays = if delays.is_empty() {
            DEFAULT_RETRY_DELAYS_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect()
        } else {
            delays
        };
        Self {
            delays,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Index is clamped to the last table entry.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let index = (retry_count as usize).min(self.delays.len() - 1);
        self.delays[index]
    }

    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_table_is_clamped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(15));
        assert_eq!(policy.delay_for(3), Duration::from_secs(60));
        assert_eq!(policy.delay_for(4), Duration::from_secs(300));
        assert_eq!(policy.delay_for(42), Duration::from_secs(300));
    }

    #[test]
    fn exhaustion_matches_attempt_cap() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }
}
