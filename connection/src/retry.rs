use std::time::Duration;

/// Delay schedule between retries of a transient failure.
///
/// Without an initial delay, retries are immediate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    initial_delay: Option<Duration>,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: None,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(initial_delay: Option<Duration>) -> Self {
        Self {
            initial_delay,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        let initial = self.initial_delay?;
        let delay = 1u32
            .checked_shl(attempt)
            .and_then(|factor| initial.checked_mul(factor))
            .unwrap_or(self.max_delay);
        Some(std::cmp::min(self.max_delay, delay))
    }

    pub async fn wait(&self, attempt: u32) {
        if let Some(delay) = self.delay_for(attempt) {
            tokio::time::sleep(delay).await;
        }
    }
}
