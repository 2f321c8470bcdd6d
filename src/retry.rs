use std::future::Future;
use std::time::Duration;

use rand::Rng as _;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

/// Retry policy: an optional cap on retries plus exponential backoff with
/// jitter. `max_retries: None` retries for as long as the classifier says so.
///
/// With `base_delay_secs == 0` every retry fires immediately, which can spin
/// tightly against a remote that keeps failing.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: Option<u32>,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            base_delay_secs: 0,
            max_delay_secs: 60,
        }
    }
}

impl RetryConfig {
    /// Compute the delay for a given retry attempt (0-indexed).
    ///
    /// Formula: `min(base_delay * 2^retry, max_delay) + random_jitter(0..base_delay)`
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exp_delay = self
            .base_delay_secs
            .saturating_mul(1u64.checked_shl(retry).unwrap_or(u64::MAX));
        let capped = exp_delay.min(self.max_delay_secs);
        let jitter = if self.base_delay_secs > 0 {
            rand::thread_rng().gen_range(0..self.base_delay_secs)
        } else {
            0
        };
        Duration::from_secs(capped + jitter)
    }

    fn exhausted(&self, retries_done: u32) -> bool {
        self.max_retries.is_some_and(|max| retries_done >= max)
    }
}

/// Retry an async operation with exponential backoff and jitter.
///
/// - `config`: retry configuration
/// - `classifier`: inspects an error and returns `Retry` or `Abort`
/// - `operation`: the async closure to retry
///
/// Returns the first `Ok` result, or the last error if retries are exhausted
/// or the classifier returns `Abort`.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    config: &RetryConfig,
    classifier: C,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let mut retries: u32 = 0;

    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if classifier(&e) == RetryAction::Abort || config.exhausted(retries) {
                    return Err(e);
                }
                let delay = config.delay_for_retry(retries);
                retries = retries.saturating_add(1);
                match config.max_retries {
                    Some(max) => tracing::warn!(
                        "Retryable error (retry {}/{}), retrying in {}s: {}",
                        retries,
                        max,
                        delay.as_secs(),
                        e
                    ),
                    None => tracing::warn!(
                        "Retryable error (retry {}), retrying in {}s: {}",
                        retries,
                        delay.as_secs(),
                        e
                    ),
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
