pub use super::lock_ledger::Entity as LockLedger;
