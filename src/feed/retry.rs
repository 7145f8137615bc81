use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::feed::fetcher::FetchError;

/// HTTP statuses worth retrying: request timeout, rate limiting, and the
/// transient server-side failures.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);
const DEFAULT_JITTER: Duration = Duration::from_millis(250);

/// Retry/backoff policy shared by the feed fetcher and every API adapter.
///
/// A failed attempt is retried when [`RetryPolicy::should_retry`] accepts
/// the error and fewer than `max_retries` retries have run. The wait before
/// retry `n` (0-based) is `base_delay * 2^n`, capped at `max_delay`, plus a
/// uniformly random jitter in `[0, jitter]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Whether a failed attempt should be tried again.
    ///
    /// Network failures and short reads are transient; HTTP statuses are
    /// retried only when listed in [`RETRYABLE_STATUSES`]. Oversized bodies
    /// would fail the same way again.
    pub fn should_retry(&self, err: &FetchError) -> bool {
        match err {
            FetchError::Timeout(_)
            | FetchError::Network(_)
            | FetchError::IncompleteResponse { .. } => true,
            FetchError::HttpStatus(status) => Self::is_retryable_status(*status),
            FetchError::ResponseTooLarge => false,
        }
    }

    /// Delay before retry number `attempt` (0-based), jitter excluded.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let base = self.backoff(attempt);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut retry_count = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if retry_count < self.max_retries && self.should_retry(&e) => {
                    let delay = self.jittered(retry_count);
                    tracing::warn!(
                        url = %url,
                        error = %e,
                        retry = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Transient request failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
