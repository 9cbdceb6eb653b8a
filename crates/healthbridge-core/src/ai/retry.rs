//! Timeout + exponential backoff around AI calls.

use crate::config::HealthBridgeConfig;
use crate::error::{AiError, AiResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Delay before the second try; doubles after each further failure.
    pub base_delay: Duration,
    /// Upper bound on each individual try.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &HealthBridgeConfig) -> Self {
        Self {
            attempts: cfg.retry_attempts,
            base_delay: cfg.retry_base_delay(),
            timeout: cfg.request_timeout(),
        }
    }

    /// Single try, bounded by `timeout`.
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            attempts: 1,
            base_delay: Duration::ZERO,
            timeout,
        }
    }

    /// Backoff before try number `attempt` (1-based; the first try never waits).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `call` until it succeeds, fails with a non-transient error, or tries run out.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> AiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AiResult<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(r) => r,
                Err(_) => Err(AiError::Timeout),
            };
            match result {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(operation, attempt, attempts, error = %e, "AI call failed; retrying");
                    attempt += 1;
                }
                Err(e) => {
                    warn!(operation, attempt, error = %e, "AI call failed");
                    return Err(e);
                }
            }
        }
    }
}
