//! Transaction executor seam
//!
//! A unit of work is the ledger reads/writes of one acquire or one release.
//! The executor runs it with all-or-nothing visibility and commits before
//! returning; a unit that fails is rolled back and its error returned as is.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sea_orm::{
    DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionError, TransactionTrait,
};

use leasehold_common::LockError;

/// Future returned by a unit of work, borrowing the open transaction
pub type UnitOfWork<'c, T> = Pin<Box<dyn Future<Output = Result<T, LockError>> + Send + 'c>>;

/// Runs units of work atomically
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    async fn execute<T, F>(&self, work: F) -> Result<T, LockError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> UnitOfWork<'c, T> + Send;
}

/// Executor over a SeaORM connection pool
#[derive(Clone, Debug)]
pub struct SeaOrmTransactionExecutor {
    db: DatabaseConnection,
    isolation: Option<IsolationLevel>,
}

impl SeaOrmTransactionExecutor {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            isolation: None,
        }
    }

    pub fn with_isolation(mut self, isolation: Option<IsolationLevel>) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl TransactionExecutor for SeaOrmTransactionExecutor {
    async fn execute<T, F>(&self, work: F) -> Result<T, LockError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> UnitOfWork<'c, T> + Send,
    {
        self.db
            .transaction_with_config(work, self.isolation, None)
            .await
            .map_err(|err| match err {
                TransactionError::Connection(db_err) => LockError::Storage(db_err),
                TransactionError::Transaction(lock_err) => lock_err,
            })
    }
}
