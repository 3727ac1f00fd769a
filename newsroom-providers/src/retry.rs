//! Bounded retry with jittered exponential back-off
//!
//! Only transient failures are retried. Credential errors and upstream rate
//! limits end the attempt loop immediately so the cache layer can decide
//! what to serve.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use newsroom_core::{ErrorKind, ProviderError, ProviderId};

/// Retry settings for one adapter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts for `Unavailable` failures (including the first)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Attempts allowed for a given failure kind
    pub fn attempts_for(&self, kind: ErrorKind) -> u32 {
        match kind {
            ErrorKind::Unavailable => self.max_attempts.max(1),
            ErrorKind::Unauthorized | ErrorKind::RateLimited | ErrorKind::MalformedResponse => 1,
        }
    }

    /// Back-off before retry number `attempt` (1-based)
    ///
    /// Exponential in `attempt`, capped at `max_delay`, with equal jitter:
    /// the result lies in `[d/2, d]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let ceiling = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);

        let ceiling_ms = ceiling.as_millis() as u64;
        if ceiling_ms == 0 {
            return Duration::ZERO;
        }
        let floor_ms = ceiling_ms / 2;
        Duration::from_millis(rand::rng().random_range(floor_ms..=ceiling_ms))
    }

    /// Run `op` until it succeeds or its failure kind runs out of attempts
    pub async fn run<T, F, Fut>(&self, provider: &ProviderId, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(%provider, attempt, "Provider request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    if attempt >= self.attempts_for(e.kind()) {
                        return Err(e);
                    }
                    let delay = self.backoff(attempt);
                    warn!(
                        %provider,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Provider request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn provider() -> ProviderId {
        ProviderId::new("test")
    }

    #[test]
    fn test_backoff_bounds() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };
        for _ in 0..50 {
            let first = policy.backoff(1);
            assert!(first >= Duration::from_millis(50) && first <= Duration::from_millis(100));
            let capped = policy.backoff(10);
            assert!(capped >= Duration::from_millis(150) && capped <= Duration::from_millis(300));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_is_retried_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result = policy
            .run(&provider(), || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(ProviderError::unavailable("503"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default().with_max_attempts(2);

        let result: Result<(), _> = policy
            .run(&provider(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::unavailable("down"))
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_kinds_not_retried() {
        for error in [
            ProviderError::unauthorized("bad key"),
            ProviderError::RateLimited,
            ProviderError::malformed("not json"),
        ] {
            let calls = AtomicU32::new(0);
            let result: Result<(), _> = RetryPolicy::default()
                .run(&provider(), || {
                    let error = error.clone();
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Err(error) }
                })
                .await;

            assert_eq!(result, Err(error));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }
}
