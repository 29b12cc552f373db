//! Ledger table bootstrap
//!
//! Creates the `locks` table from the entity definition. Hosts with their
//! own migration tooling do not need this.

use sea_orm::{ConnectionTrait, DbErr, Schema};

use crate::entity::lock_ledger;

/// Create the ledger table if it does not exist yet
pub async fn create_ledger_table<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(lock_ledger::Entity);
    statement.if_not_exists();

    conn.execute(backend.build(&statement)).await?;
    tracing::debug!(table = "locks", "Ledger table ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ActiveModelTrait, Database, EntityTrait, Set};

    #[tokio::test]
    async fn test_create_is_idempotent_and_usable() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        create_ledger_table(&db).await.unwrap();
        create_ledger_table(&db).await.unwrap();

        lock_ledger::ActiveModel {
            name: Set("cleaner".to_string()),
            owner: Set(Some("node-1".to_string())),
            expires_at: Set(None),
        }
        .insert(&db)
        .await
        .unwrap();

        let row = lock_ledger::Entity::find_by_id("cleaner".to_string())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.owner.as_deref(), Some("node-1"));
        assert_eq!(row.expires_at, None);
    }
}
