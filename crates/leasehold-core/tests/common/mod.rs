//! Common test utilities for lock ledger integration tests
//!
//! This module provides:
//! - SQLite-backed transactional services on a throwaway database file
//! - In-memory services
//! - A sink that records lock events for assertions
//! - Contender construction for race tests

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tempfile::TempDir;

use leasehold_core::{
    Lock, LockEvent, LockEventSink, LockHandle, LockService, MemoryLockService,
    SeaOrmTransactionExecutor, TransactionalLockService,
};
use leasehold_persistence::create_ledger_table;

/// Number of clients contending for a lock in concurrent tests
pub const CONCURRENT_SIZE: usize = 13;

/// Lease long enough never to expire during a test
pub const DEFAULT_LEASE: Duration = Duration::from_secs(3600);

/// Records every event it sees
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<LockEvent>>,
}

impl RecordingEventSink {
    pub fn events(&self) -> Vec<LockEvent> {
        self.events.lock().clone()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(LockEvent::label).collect()
    }
}

impl LockEventSink for RecordingEventSink {
    fn record(&self, event: &LockEvent) {
        self.events.lock().push(event.clone());
    }
}

/// A transactional service over a SQLite file, kept alive with its directory
pub struct SqliteLedger {
    pub service: Arc<TransactionalLockService<SeaOrmTransactionExecutor>>,
    pub events: Arc<RecordingEventSink>,
    pub db: DatabaseConnection,
    _dir: TempDir,
}

impl SqliteLedger {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("ledger.db").display());

        let mut options = ConnectOptions::new(url);
        options.max_connections(CONCURRENT_SIZE as u32 + 3).sqlx_logging(false);
        let db = Database::connect(options).await.expect("open sqlite ledger");
        create_ledger_table(&db).await.expect("create ledger table");

        let events = Arc::new(RecordingEventSink::default());
        let service = Arc::new(TransactionalLockService::new(
            SeaOrmTransactionExecutor::new(db.clone()),
            events.clone(),
        ));

        Self {
            service,
            events,
            db,
            _dir: dir,
        }
    }

    pub fn as_service(&self) -> Arc<dyn LockService> {
        self.service.clone()
    }
}

pub fn memory_service() -> (Arc<dyn LockService>, Arc<RecordingEventSink>) {
    let events = Arc::new(RecordingEventSink::default());
    let service: Arc<dyn LockService> = Arc::new(MemoryLockService::new(events.clone()));
    (service, events)
}

pub fn new_lock(service: &Arc<dyn LockService>, name: &str, identity: &str, lease: Duration) -> Lock {
    let handle = LockHandle::new(name, identity, lease).expect("valid handle");
    Lock::new(service.clone(), handle)
}

/// `CONCURRENT_SIZE` contenders named `<name>-1` .. `<name>-13`
pub fn concurrent_locks(service: &Arc<dyn LockService>, name: &str) -> Vec<Lock> {
    (1..=CONCURRENT_SIZE)
        .map(|i| new_lock(service, name, &format!("{}-{}", name, i), DEFAULT_LEASE))
        .collect()
}
