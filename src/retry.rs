//! Rate-limit retry policy.
//!
//! On `TooManyRequests` the same fetch is re-issued after a fixed delay.
//! There is no backoff. The attempt cap is optional; `None` means retry for
//! as long as the upstream keeps answering 429, or until the run is
//! cancelled during one of the waits.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::FetchError;

// ---

pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    // ---
    pub delay: Duration,
    /// Maximum number of retries after the first attempt.
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RATE_LIMIT_DELAY,
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    // ---
    pub fn new(delay: Duration, max_retries: Option<u32>) -> Self {
        Self { delay, max_retries }
    }

    /// Run `op` until it returns something other than `TooManyRequests`,
    /// or the retry cap is exhausted. Other errors pass through untouched.
    ///
    /// Returns `Ok(None)` when `cancel` fires while waiting to retry.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<Option<T>, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        // ---
        let mut retries: u32 = 0;
        loop {
            match op().await {
                Err(e) if e.is_rate_limited() => {
                    if self.max_retries.is_some_and(|max| retries >= max) {
                        warn!("{}: still rate limited after {} retries, giving up", label, retries);
                        return Err(e);
                    }
                    retries += 1;
                    warn!(
                        "{}: rate limited, retry #{} in {:?}",
                        label, retries, self.delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("{}: cancelled while waiting to retry", label);
                            return Ok(None);
                        }
                        _ = tokio::time::sleep(self.delay) => {}
                    }
                }
                other => return other.map(Some),
            }
        }
    }
}
