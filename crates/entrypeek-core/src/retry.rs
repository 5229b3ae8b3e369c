//! Bounded immediate retry for async operations.

use std::future::Future;
use tracing::debug;

/// Run `operation`, re-invoking it on failure up to `max_retries` more times.
///
/// There is no backoff: a failed attempt is retried immediately. With
/// `max_retries == 0` the first failure is returned as is. The error of the
/// last attempt is propagated unchanged.
///
/// # Errors
/// Returns the last attempt's error once every attempt has failed.
pub async fn retry<T, E, F, Fut>(mut operation: F, max_retries: u32) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut remaining = max_retries;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if remaining > 0 => {
                debug!(error = %e, remaining, "Attempt failed, retrying");
                remaining -= 1;
            }
            Err(e) => return Err(e),
        }
    }
}
