//! Connection setup

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};

use leasehold_common::DbSettings;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a pooled connection to the ledger store
pub async fn connect(settings: &DbSettings) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .connect_timeout(CONNECT_TIMEOUT)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    tracing::info!(
        backend = ?db.get_database_backend(),
        max_connections = settings.max_connections,
        "Connected to lock ledger store"
    );
    Ok(db)
}
