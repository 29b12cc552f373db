//! Lock services
//!
//! `LockService` is what a host programs against. Two implementations ship:
//! - [`TransactionalLockService`]: the coordinator driven through a
//!   [`TransactionExecutor`], one transaction per call
//! - [`MemoryLockService`](super::MemoryLockService): a single-process
//!   ledger with the same semantics

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use leasehold_common::{Isolation, LockError};

use super::coordinator::LockCoordinator;
use super::event::LockEventSink;
use super::executor::{SeaOrmTransactionExecutor, TransactionExecutor};
use super::model::{LedgerEntry, LockHandle};

#[async_trait]
pub trait LockService: Send + Sync {
    /// Take the lock; `Ok(false)` when a lease is still running
    async fn acquire(&self, handle: &LockHandle) -> Result<bool, LockError>;

    /// Give the lock back; ownership violation unless the caller holds it
    async fn release(&self, handle: &LockHandle) -> Result<(), LockError>;

    /// Recorded owner, if any
    async fn owner(&self, name: &str) -> Result<Option<String>, LockError>;

    /// Full ledger entry, if any
    async fn entry(&self, name: &str) -> Result<Option<LedgerEntry>, LockError>;
}

/// Coordinator plus executor: every operation is one unit of work
pub struct TransactionalLockService<E> {
    coordinator: Arc<LockCoordinator>,
    executor: E,
}

impl<E: TransactionExecutor> TransactionalLockService<E> {
    pub fn new(executor: E, events: Arc<dyn LockEventSink>) -> Self {
        Self {
            coordinator: Arc::new(LockCoordinator::new(events)),
            executor,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl TransactionalLockService<SeaOrmTransactionExecutor> {
    /// Service over a SeaORM pool with an optional isolation level
    pub fn from_connection(
        db: DatabaseConnection,
        isolation: Option<Isolation>,
        events: Arc<dyn LockEventSink>,
    ) -> Self {
        let executor = SeaOrmTransactionExecutor::new(db).with_isolation(isolation.map(Into::into));
        Self::new(executor, events)
    }
}

#[async_trait]
impl<E: TransactionExecutor> LockService for TransactionalLockService<E> {
    async fn acquire(&self, handle: &LockHandle) -> Result<bool, LockError> {
        let coordinator = self.coordinator.clone();
        let handle = handle.clone();
        self.executor
            .execute(move |txn| Box::pin(async move { coordinator.acquire(txn, &handle).await }))
            .await
    }

    async fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        let coordinator = self.coordinator.clone();
        let handle = handle.clone();
        self.executor
            .execute(move |txn| Box::pin(async move { coordinator.release(txn, &handle).await }))
            .await
    }

    async fn owner(&self, name: &str) -> Result<Option<String>, LockError> {
        let coordinator = self.coordinator.clone();
        let name = name.to_string();
        self.executor
            .execute(move |txn| Box::pin(async move { coordinator.owner(txn, &name).await }))
            .await
    }

    async fn entry(&self, name: &str) -> Result<Option<LedgerEntry>, LockError> {
        let coordinator = self.coordinator.clone();
        let name = name.to_string();
        self.executor
            .execute(move |txn| Box::pin(async move { coordinator.entry(txn, &name).await }))
            .await
    }
}

/// One contender: a service paired with the handle it acquires with
#[derive(Clone)]
pub struct Lock {
    service: Arc<dyn LockService>,
    handle: LockHandle,
}

impl Lock {
    pub fn new(service: Arc<dyn LockService>, handle: LockHandle) -> Self {
        Self { service, handle }
    }

    pub fn handle(&self) -> &LockHandle {
        &self.handle
    }

    pub async fn acquire(&self) -> Result<bool, LockError> {
        self.service.acquire(&self.handle).await
    }

    pub async fn release(&self) -> Result<(), LockError> {
        self.service.release(&self.handle).await
    }

    pub async fn owner(&self) -> Result<Option<String>, LockError> {
        self.service.owner(self.handle.name()).await
    }
}

impl std::fmt::Debug for Lock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock").field("handle", &self.handle).finish()
    }
}
