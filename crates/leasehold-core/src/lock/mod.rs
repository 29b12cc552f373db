//! Lease-based lock ledger
//!
//! This module provides:
//! - Lock handle and ledger entry model
//! - The coordinator issuing ledger reads/writes inside a transaction
//! - The transaction executor seam
//! - Transactional and in-memory lock services
//! - Event sinks, the exclusive-task helper, and the contention harness

mod contention;
mod coordinator;
mod event;
mod exclusive;
mod executor;
mod memory;
mod model;
mod service;

pub use contention::*;
pub use coordinator::*;
pub use event::*;
pub use exclusive::*;
pub use executor::*;
pub use memory::*;
pub use model::*;
pub use service::*;
