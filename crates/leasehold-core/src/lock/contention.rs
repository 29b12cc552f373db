//! Contention harness
//!
//! Races many contenders against one lock name with genuinely parallel
//! tasks. Each contender is its own tokio task, and all of them are held at
//! a barrier so their calls hit the ledger together.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Barrier;

use leasehold_common::LockError;

use super::service::Lock;

/// Tally of one race
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RaceOutcome {
    /// Calls that took (acquire) or gave back (release) the lock
    pub successes: usize,
    /// Acquires refused by a running lease, releases refused as ownership
    /// violations
    pub contended: usize,
    /// Storage failures and panicked tasks
    pub failures: usize,
}

impl RaceOutcome {
    pub fn total(&self) -> usize {
        self.successes + self.contended + self.failures
    }
}

/// Every contender calls `acquire` at once
pub async fn race_acquire(locks: &[Lock]) -> RaceOutcome {
    let results = race(locks, |lock| async move { lock.acquire().await }).await;

    let mut outcome = RaceOutcome::default();
    for result in results {
        match result {
            Some(Ok(true)) => outcome.successes += 1,
            Some(Ok(false)) => outcome.contended += 1,
            Some(Err(_)) | None => outcome.failures += 1,
        }
    }
    outcome
}

/// Every contender calls `release` at once
pub async fn race_release(locks: &[Lock]) -> RaceOutcome {
    let results = race(locks, |lock| async move { lock.release().await }).await;

    let mut outcome = RaceOutcome::default();
    for result in results {
        match result {
            Some(Ok(())) => outcome.successes += 1,
            Some(Err(err)) if err.is_ownership_violation() => outcome.contended += 1,
            Some(Err(_)) | None => outcome.failures += 1,
        }
    }
    outcome
}

async fn race<T, F, Fut>(locks: &[Lock], call: F) -> Vec<Option<Result<T, LockError>>>
where
    T: Send + 'static,
    F: Fn(Lock) -> Fut,
    Fut: std::future::Future<Output = Result<T, LockError>> + Send + 'static,
{
    let barrier = Arc::new(Barrier::new(locks.len()));

    let tasks = locks.iter().cloned().map(|lock| {
        let barrier = barrier.clone();
        let handle = lock.handle().clone();
        let call = call(lock);
        tokio::spawn(async move {
            barrier.wait().await;
            let result = call.await;
            if let Err(err) = &result {
                tracing::debug!(lock = %handle, error = %err, "Contender call failed");
            }
            result
        })
    });

    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| match joined {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(error = %err, "Contender task panicked");
                None
            }
        })
        .collect()
}
