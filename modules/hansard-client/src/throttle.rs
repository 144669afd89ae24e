// Politeness and retry for the upstream archive.
//
// One request in flight at a time: the crawler owns a single RateLimiter and
// every outbound fetch (and every cache hit) waits on it first.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::warn;

use crate::error::HansardError;

/// Enforces a minimum spacing between fetches plus random jitter.
pub struct RateLimiter {
    min_spacing: Duration,
    max_jitter: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_spacing: Duration, max_jitter: Duration) -> Self {
        Self {
            min_spacing,
            max_jitter,
            last: None,
        }
    }

    /// No spacing at all. Used in tests.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Sleep until the next request slot opens, then claim it.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let target = last + self.min_spacing + jitter(self.max_jitter);
            tokio::time::sleep_until(target).await;
        }
        self.last = Some(Instant::now());
    }
}

/// Bounded exponential backoff: `base * 2^attempt + jitter`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_jitter,
        }
    }

    /// Retries without sleeping. Used in tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO, Duration::ZERO)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor) + jitter(self.max_jitter)
    }
}

/// Result of a fetch after the retry policy has run its course.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Fetched(T),
    /// The resource does not exist. Not retried.
    Absent,
    /// Retry budget exhausted, or a non-retryable error.
    Failed { attempts: u32, error: HansardError },
}

impl<T> FetchOutcome<T> {
    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched(_))
    }
}

/// Run `op` under the rate limiter, retrying transient failures per `policy`.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    limiter: &mut RateLimiter,
    what: &str,
    mut op: F,
) -> FetchOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HansardError>>,
{
    let mut attempt: u32 = 0;
    loop {
        limiter.wait().await;
        match op().await {
            Ok(value) => return FetchOutcome::Fetched(value),
            Err(HansardError::NotFound(_)) => return FetchOutcome::Absent,
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let backoff = policy.backoff(attempt);
                attempt += 1;
                warn!(
                    what,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient fetch failure, retrying after backoff"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(error) => {
                return FetchOutcome::Failed {
                    attempts: attempt + 1,
                    error,
                }
            }
        }
    }
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let mut limiter = RateLimiter::disabled();
        let outcome = with_retry(&RetryPolicy::immediate(3), &mut limiter, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(HansardError::transient("u", "503"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert!(matches!(outcome, FetchOutcome::Fetched(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_found_is_never_retried() {
        let calls = AtomicU32::new(0);
        let mut limiter = RateLimiter::disabled();
        let outcome: FetchOutcome<()> =
            with_retry(&RetryPolicy::immediate(5), &mut limiter, "test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(HansardError::NotFound("u".into())) }
            })
            .await;

        assert!(matches!(outcome, FetchOutcome::Absent));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let mut limiter = RateLimiter::disabled();
        let outcome: FetchOutcome<()> =
            with_retry(&RetryPolicy::immediate(2), &mut limiter, "test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(HansardError::transient("u", "timeout")) }
            })
            .await;

        match outcome {
            FetchOutcome::Failed { attempts, error } => {
                assert_eq!(attempts, 3);
                assert!(error.is_retryable());
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn api_errors_fail_fast() {
        let mut limiter = RateLimiter::disabled();
        let outcome: FetchOutcome<()> =
            with_retry(&RetryPolicy::immediate(5), &mut limiter, "test", || async {
                Err(HansardError::Api {
                    status: 403,
                    url: "u".into(),
                })
            })
            .await;
        assert!(matches!(outcome, FetchOutcome::Failed { attempts: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn limiter_spaces_requests() {
        let mut limiter = RateLimiter::new(Duration::from_secs(1), Duration::ZERO);
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100), Duration::ZERO);
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
    }
}
