use super::BackoffPolicy;
use std::time::Duration;

/// 固定延迟退避策略
#[derive(Debug, Clone)]
pub struct FixedBackoffPolicy {
    delay: Duration,
}

impl FixedBackoffPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffPolicy for FixedBackoffPolicy {
    fn backoff_duration(&self, _attempt: usize) -> Duration {
        self.delay
    }
}
