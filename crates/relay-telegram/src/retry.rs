//! Fixed-backoff retry for transport calls.
//!
//! Rate limits and flaky connectivity are routine for a long-lived bot, so
//! outbound calls get a generous retry budget with a fixed sleep between
//! attempts. Only transient errors are retried; the last attempt's failure
//! propagates to the caller.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Sleep between attempts.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(10),
        }
    }
}

pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..policy.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() => {
                log::warn!(
                    "transport call failed ({error}), attempt {attempt}/{}, retrying in {:?}",
                    policy.max_attempts,
                    policy.interval
                );
                tokio::time::sleep(policy.interval).await;
            }
            Err(error) => return Err(error),
        }
    }
    op().await
}
