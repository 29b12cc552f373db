pub mod prelude;

pub mod lock_ledger;
