//! Store clock
//!
//! Expiry instants are computed and compared against the ledger store's own
//! clock so that hosts with skewed local clocks agree on when a lease ends.

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbBackend, Statement};

use leasehold_common::LockError;

const NOW_COLUMN: &str = "now_ms";

// Postgres uses clock_timestamp() rather than now(): now() is frozen at
// transaction start, which is stale after waiting on a row lock.
const POSTGRES_NOW: &str =
    "SELECT CAST(FLOOR(EXTRACT(EPOCH FROM clock_timestamp()) * 1000) AS BIGINT) AS now_ms";
const MYSQL_NOW: &str = "SELECT CAST(UNIX_TIMESTAMP(NOW(3)) * 1000 AS SIGNED) AS now_ms";
const SQLITE_NOW: &str =
    "SELECT CAST((julianday('now') - 2440587.5) * 86400000.0 AS INTEGER) AS now_ms";

fn now_query(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => POSTGRES_NOW,
        DbBackend::MySql => MYSQL_NOW,
        DbBackend::Sqlite => SQLITE_NOW,
    }
}

/// Current instant according to the store, millisecond precision
pub async fn store_now<C: ConnectionTrait>(conn: &C) -> Result<DateTime<Utc>, LockError> {
    let backend = conn.get_database_backend();
    let row = conn
        .query_one(Statement::from_string(backend, now_query(backend)))
        .await?
        .ok_or_else(|| LockError::Clock("clock query returned no row".to_string()))?;

    let millis: i64 = row.try_get("", NOW_COLUMN)?;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| LockError::Clock(format!("store returned out-of-range instant {}", millis)))
}
