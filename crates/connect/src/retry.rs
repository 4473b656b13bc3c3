//! Generic exponential-backoff wrapper used around every external call.
//!
//! Faults are split into retryable (network errors, 5xx, 429) and
//! non-retryable (other 4xx); non-retryable faults abort immediately
//! without consuming retry budget.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use slotly_core::errors::ExternalServiceError;

pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ExternalServiceError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl BackoffPolicy {
    /// Exponential delay capped at `max_delay_ms`, with up to 25% jitter
    /// shaved off so synchronized callers spread out.
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let capped = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        let jitter = rand::thread_rng().gen_range(0..=capped / 4);
        Duration::from_millis(capped - jitter)
    }
}

pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &BackoffPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt + 1 < policy.max_attempts.max(1) => {
                let delay = policy.delay(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "transient fault, backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use slotly_core::errors::{ExternalServiceError, ExternalSystem};

    use super::{retry_with_backoff, BackoffPolicy};

    fn transient() -> ExternalServiceError {
        ExternalServiceError::retryable(ExternalSystem::Calendar, "busy_intervals", "503".into())
    }

    fn permanent() -> ExternalServiceError {
        ExternalServiceError::permanent(ExternalSystem::Calendar, "busy_intervals", "400".into())
    }

    fn fast_policy() -> BackoffPolicy {
        BackoffPolicy { max_attempts: 3, base_delay_ms: 1, max_delay_ms: 2 }
    }

    #[tokio::test]
    async fn succeeds_after_transient_faults() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast_policy(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(transient()) } else { Ok(n) } }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_budget_on_persistent_transient_fault() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&fast_policy(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_fault_aborts_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&fast_policy(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(permanent()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
