//! Leasehold Persistence - the lock ledger table and its store helpers
//!
//! This crate provides:
//! - SeaORM entity for the `locks` ledger table
//! - Table bootstrap for tests and diagnostics
//! - The store clock used for every expiry comparison
//! - Connection setup from `DbSettings`

pub mod clock;
pub mod connection;
pub mod entity;
pub mod schema;

// Re-export sea-orm for convenience
pub use sea_orm;

pub use clock::store_now;
pub use connection::connect;
pub use entity::lock_ledger;
pub use schema::create_ledger_table;
