//! Readiness polling for tracking backends started alongside the daemon.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Exponential-backoff poll with an overall deadline.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    /// Delay before the second check. Default: 250ms.
    pub initial_delay: Duration,
    /// Cap on the delay between checks. Default: 5s.
    pub max_delay: Duration,
    /// Give up after this long. Default: 30s.
    pub deadline: Duration,
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            deadline: Duration::from_secs(30),
        }
    }
}

impl ReadinessProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Run `check` until it returns true or the deadline passes.
    ///
    /// Returns whether the backend became ready.
    pub async fn wait<F, Fut>(&self, mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let give_up = Instant::now() + self.deadline;
        let mut attempt = 0;
        loop {
            if check().await {
                return true;
            }
            let delay = self.delay_for_attempt(attempt);
            if Instant::now() + delay > give_up {
                return false;
            }
            debug!(attempt, delay_ms = delay.as_millis() as u64, "backend not ready, waiting");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
