//! Lock coordinator
//!
//! Issues the ledger reads and writes for one acquire or release. Every call
//! is expected to run inside a single transaction supplied by a
//! [`TransactionExecutor`](super::TransactionExecutor); the coordinator
//! never begins, commits, or retries anything itself.
//!
//! Both write paths are conditional, so at most one concurrent caller can
//! win a lock whatever isolation level the store runs at:
//! - a missing row is created with `INSERT ... ON CONFLICT DO NOTHING`
//!   (`INSERT IGNORE` on MySQL)
//! - an existing row is claimed with an `UPDATE` that only matches while the
//!   row is unowned or its lease has elapsed

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbBackend, EntityName, EntityTrait, IdenStatic,
    QueryFilter, QuerySelect, QueryTrait, Set, Statement, Value,
};

use leasehold_common::LockError;
use leasehold_persistence::{lock_ledger, store_now};

use super::event::{LockEvent, LockEventSink};
use super::model::{LedgerEntry, LockHandle};

pub struct LockCoordinator {
    events: Arc<dyn LockEventSink>,
}

impl LockCoordinator {
    pub fn new(events: Arc<dyn LockEventSink>) -> Self {
        Self { events }
    }

    /// Try to take the lock for `handle.identity()`
    ///
    /// Returns `Ok(false)` while another lease (including the caller's own)
    /// is still running. An elapsed lease is taken over by whoever asks.
    pub async fn acquire<C: ConnectionTrait>(
        &self,
        conn: &C,
        handle: &LockHandle,
    ) -> Result<bool, LockError> {
        let now = store_now(conn).await?;
        let expires_at = handle.expiry_from(now)?;

        // Writing first makes SQLite take its write lock before any read, so
        // contenders queue behind each other instead of failing on upgrade.
        if Self::insert_if_absent(conn, handle, expires_at).await? {
            self.events.record(&LockEvent::Acquired {
                name: handle.name().to_string(),
                identity: handle.identity().to_string(),
                stolen_from: None,
            });
            return Ok(true);
        }

        let current = Self::find_for_update(conn, handle.name())
            .await?
            .unwrap_or_else(|| LedgerEntry::unlocked(handle.name()));

        if !current.is_claimable_at(now) {
            self.record_contended(handle, current.owner);
            return Ok(false);
        }

        if !Self::claim_if_free(conn, handle, now, expires_at).await? {
            // Claimed by a concurrent caller between our read and write
            let owner = Self::find(conn, handle.name()).await?.and_then(|e| e.owner);
            self.record_contended(handle, owner);
            return Ok(false);
        }

        self.events.record(&LockEvent::Acquired {
            name: handle.name().to_string(),
            identity: handle.identity().to_string(),
            stolen_from: current.owner,
        });
        Ok(true)
    }

    /// Release the lock held by `handle.identity()`
    ///
    /// Fails with [`LockError::OwnershipViolation`] when the ledger does not
    /// name the caller as owner, including when the lock is already free.
    pub async fn release<C: ConnectionTrait>(
        &self,
        conn: &C,
        handle: &LockHandle,
    ) -> Result<(), LockError> {
        // Clear before reading, same as acquire: a SQLite transaction that
        // read first cannot wait out another writer when it upgrades.
        let result = lock_ledger::Entity::update_many()
            .col_expr(lock_ledger::Column::Owner, Expr::value(Option::<String>::None))
            .col_expr(
                lock_ledger::Column::ExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .filter(lock_ledger::Column::Name.eq(handle.name()))
            .filter(lock_ledger::Column::Owner.eq(handle.identity()))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            let owner = Self::find(conn, handle.name()).await?.and_then(|e| e.owner);
            return Err(self.reject_release(handle, owner));
        }

        self.events.record(&LockEvent::Released {
            name: handle.name().to_string(),
            identity: handle.identity().to_string(),
        });
        Ok(())
    }

    /// Recorded owner of `name`, stale owners of expired leases included
    pub async fn owner<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
    ) -> Result<Option<String>, LockError> {
        Ok(Self::find(conn, name).await?.and_then(|entry| entry.owner))
    }

    pub async fn entry<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
    ) -> Result<Option<LedgerEntry>, LockError> {
        Self::find(conn, name).await
    }

    async fn find<C: ConnectionTrait>(
        conn: &C,
        name: &str,
    ) -> Result<Option<LedgerEntry>, LockError> {
        let model = lock_ledger::Entity::find_by_id(name.to_string())
            .one(conn)
            .await?;
        Ok(model.map(LedgerEntry::from))
    }

    async fn find_for_update<C: ConnectionTrait>(
        conn: &C,
        name: &str,
    ) -> Result<Option<LedgerEntry>, LockError> {
        let select = lock_ledger::Entity::find_by_id(name.to_string());
        // SQLite has no row locks; its single writer already serializes us
        let select = match conn.get_database_backend() {
            DbBackend::Sqlite => select,
            DbBackend::Postgres | DbBackend::MySql => select.lock_exclusive(),
        };
        Ok(select.one(conn).await?.map(LedgerEntry::from))
    }

    async fn insert_if_absent<C: ConnectionTrait>(
        conn: &C,
        handle: &LockHandle,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, LockError> {
        let statement = insert_statement(conn.get_database_backend(), handle, expires_at);
        let inserted = conn.execute(statement).await?.rows_affected();
        Ok(inserted == 1)
    }

    async fn claim_if_free<C: ConnectionTrait>(
        conn: &C,
        handle: &LockHandle,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, LockError> {
        let result = lock_ledger::Entity::update_many()
            .col_expr(
                lock_ledger::Column::Owner,
                Expr::value(handle.identity().to_string()),
            )
            .col_expr(lock_ledger::Column::ExpiresAt, Expr::value(expires_at))
            .filter(lock_ledger::Column::Name.eq(handle.name()))
            .filter(
                Condition::any()
                    .add(lock_ledger::Column::Owner.is_null())
                    .add(lock_ledger::Column::ExpiresAt.is_null())
                    .add(lock_ledger::Column::ExpiresAt.lte(now)),
            )
            .exec(conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    fn record_contended(&self, handle: &LockHandle, owner: Option<String>) {
        self.events.record(&LockEvent::Contended {
            name: handle.name().to_string(),
            identity: handle.identity().to_string(),
            owner,
        });
    }

    fn reject_release(&self, handle: &LockHandle, owner: Option<String>) -> LockError {
        self.events.record(&LockEvent::ReleaseRejected {
            name: handle.name().to_string(),
            identity: handle.identity().to_string(),
            owner: owner.clone(),
        });
        LockError::ownership_violation(handle.name(), handle.identity(), owner)
    }
}

/// Insert of a fresh ledger row that does nothing when the name exists
///
/// MySQL gets `INSERT IGNORE`: its `ON DUPLICATE KEY UPDATE` form reports a
/// matched row as affected under `CLIENT_FOUND_ROWS`, which would read as
/// a successful insert.
fn insert_statement(
    backend: DbBackend,
    handle: &LockHandle,
    expires_at: DateTime<Utc>,
) -> Statement {
    match backend {
        DbBackend::MySql => Statement::from_sql_and_values(
            backend,
            format!(
                "INSERT IGNORE INTO `{}` (`{}`, `{}`, `{}`) VALUES (?, ?, ?)",
                lock_ledger::Entity.table_name(),
                lock_ledger::Column::Name.as_str(),
                lock_ledger::Column::Owner.as_str(),
                lock_ledger::Column::ExpiresAt.as_str(),
            ),
            [
                Value::from(handle.name().to_string()),
                Value::from(handle.identity().to_string()),
                Value::from(expires_at),
            ],
        ),
        DbBackend::Postgres | DbBackend::Sqlite => {
            let row = lock_ledger::ActiveModel {
                name: Set(handle.name().to_string()),
                owner: Set(Some(handle.identity().to_string())),
                expires_at: Set(Some(expires_at)),
            };
            lock_ledger::Entity::insert(row)
                .on_conflict(
                    OnConflict::column(lock_ledger::Column::Name)
                        .do_nothing()
                        .to_owned(),
                )
                .build(backend)
        }
    }
}
