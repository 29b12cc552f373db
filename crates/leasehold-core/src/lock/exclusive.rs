//! Run work on at most one node at a time

use std::future::Future;

use leasehold_common::LockError;

use super::service::Lock;

/// Run `work` only if `lock` can be acquired
///
/// Returns `Ok(None)` without running `work` when the lock is held
/// elsewhere. Once acquired the lock is released after `work` completes,
/// whatever `work` returned. A panic inside `work` leaves the lock to
/// expire with its lease.
pub async fn run_exclusive<F, Fut, T>(lock: &Lock, work: F) -> Result<Option<T>, LockError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    if !lock.acquire().await? {
        tracing::debug!(lock = %lock.handle(), "Skipping exclusive work, lock is held elsewhere");
        return Ok(None);
    }

    let output = work().await;
    lock.release().await?;
    Ok(Some(output))
}
