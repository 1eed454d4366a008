use futures::future::{try_join_all, BoxFuture};

use crate::firestore::error::FirestoreResult;

/// A deferred unit of work: nothing runs until the executor invokes it.
pub type PendingOp<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, FirestoreResult<T>> + Send + 'a>;

/// Wraps an async closure into a [`PendingOp`].
pub fn pending<'a, T, F, Fut>(op: F) -> PendingOp<'a, T>
where
    F: FnOnce() -> Fut + Send + 'a,
    Fut: std::future::Future<Output = FirestoreResult<T>> + Send + 'a,
{
    Box::new(move || Box::pin(op()))
}

/// Runs `ops` in consecutive chunks of at most `concurrency_limit`.
///
/// Operations within a chunk are polled concurrently; a chunk only starts once
/// the previous one has fully resolved. Results come back in input order. The
/// first failure aborts the whole batch and discards its chunk's results.
pub async fn run_batched<'a, T>(
    ops: Vec<PendingOp<'a, T>>,
    concurrency_limit: usize,
) -> FirestoreResult<Vec<T>>
where
    T: Send + 'a,
{
    let limit = concurrency_limit.max(1);
    let mut results = Vec::with_capacity(ops.len());
    let mut remaining = ops.into_iter().peekable();

    while remaining.peek().is_some() {
        let chunk: Vec<_> = remaining.by_ref().take(limit).map(|op| op()).collect();
        results.extend(try_join_all(chunk).await?);
    }

    Ok(results)
}
