//! First-success race over concurrent operations.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

/// Poll every operation concurrently and return the first `Ok`.
///
/// Operations still pending when a winner appears are dropped, which cancels
/// them. If every operation fails, all errors are returned in completion
/// order. An empty input fails with an empty list.
///
/// # Errors
/// Returns every operation's error when none succeeded.
pub async fn race_first_ok<T, E, I, Fut>(operations: I) -> Result<T, Vec<E>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>>,
{
    let mut pending: FuturesUnordered<Fut> = operations.into_iter().collect();
    let mut failures = Vec::with_capacity(pending.len());

    while let Some(outcome) = pending.next().await {
        match outcome {
            Ok(value) => return Ok(value),
            Err(e) => failures.push(e),
        }
    }

    Err(failures)
}
