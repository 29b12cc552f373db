//! Leasehold Common - shared types for the lock ledger crates
//!
//! This crate provides:
//! - `LockError`: the error taxonomy of lock operations
//! - `LockSettings`: layered configuration (defaults, file, environment)
//! - Lease duration parsing

pub mod error;
pub mod lease;
pub mod settings;

pub use error::{LockError, LockErrorKind};
pub use lease::{DEFAULT_LEASE, parse_lease};
pub use settings::{DbSettings, Isolation, LeaseSettings, LockSettings, LogSettings};
