//! Leasehold Core - lease-based mutual exclusion over a shared ledger
//!
//! This crate provides:
//! - The lock coordinator (acquire/release against the ledger table)
//! - The transaction executor seam and its SeaORM implementation
//! - `LockService` with transactional and in-memory implementations
//! - Lock event sinks (tracing, metrics)
//! - The contention harness used to verify at-most-one-winner semantics

pub mod lock;

// Re-export lock types
pub use lock::{
    FanoutEventSink, LedgerEntry, Lock, LockCoordinator, LockEvent, LockEventSink, LockHandle,
    LockService, LockState, MemoryLockService, MetricsEventSink, NoopEventSink, RaceOutcome,
    SeaOrmTransactionExecutor, TracingEventSink, TransactionExecutor, TransactionalLockService,
    UnitOfWork, race_acquire, race_release, run_exclusive,
};

pub use leasehold_common::{LockError, LockErrorKind};
