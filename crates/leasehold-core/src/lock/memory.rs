//! In-memory lock ledger
//!
//! Single-process stand-in for the ledger table. The `DashMap` entry guard
//! serializes callers on the same name the way a row lock does, and the
//! process clock is the one clock every caller shares.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use leasehold_common::LockError;

use super::event::{LockEvent, LockEventSink};
use super::model::{LedgerEntry, LockHandle};
use super::service::LockService;

pub struct MemoryLockService {
    entries: DashMap<String, LedgerEntry>,
    events: Arc<dyn LockEventSink>,
}

impl MemoryLockService {
    pub fn new(events: Arc<dyn LockEventSink>) -> Self {
        Self {
            entries: DashMap::new(),
            events,
        }
    }

    /// Number of ledger rows, released ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LockService for MemoryLockService {
    async fn acquire(&self, handle: &LockHandle) -> Result<bool, LockError> {
        let now = Utc::now();
        let expires_at = handle.expiry_from(now)?;

        let event = {
            let mut entry = self
                .entries
                .entry(handle.name().to_string())
                .or_insert_with(|| LedgerEntry::unlocked(handle.name()));

            if entry.is_claimable_at(now) {
                let previous = entry.owner.take();
                entry.claim(handle.identity(), expires_at);
                LockEvent::Acquired {
                    name: handle.name().to_string(),
                    identity: handle.identity().to_string(),
                    stolen_from: previous,
                }
            } else {
                LockEvent::Contended {
                    name: handle.name().to_string(),
                    identity: handle.identity().to_string(),
                    owner: entry.owner.clone(),
                }
            }
        };

        let acquired = matches!(event, LockEvent::Acquired { .. });
        self.events.record(&event);
        Ok(acquired)
    }

    async fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        let rejected_owner = match self.entries.get_mut(handle.name()) {
            Some(mut entry) if entry.is_owned_by(handle.identity()) => {
                entry.clear();
                None
            }
            Some(entry) => Some(entry.owner.clone()),
            None => Some(None),
        };

        if let Some(owner) = rejected_owner {
            self.events.record(&LockEvent::ReleaseRejected {
                name: handle.name().to_string(),
                identity: handle.identity().to_string(),
                owner: owner.clone(),
            });
            return Err(LockError::ownership_violation(
                handle.name(),
                handle.identity(),
                owner,
            ));
        }

        self.events.record(&LockEvent::Released {
            name: handle.name().to_string(),
            identity: handle.identity().to_string(),
        });
        Ok(())
    }

    async fn owner(&self, name: &str) -> Result<Option<String>, LockError> {
        Ok(self.entries.get(name).and_then(|entry| entry.owner.clone()))
    }

    async fn entry(&self, name: &str) -> Result<Option<LedgerEntry>, LockError> {
        Ok(self.entries.get(name).map(|entry| entry.clone()))
    }
}

impl Default for MemoryLockService {
    fn default() -> Self {
        Self::new(Arc::new(super::event::TracingEventSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LockState;
    use std::time::Duration;

    fn handle(name: &str, identity: &str, lease: Duration) -> LockHandle {
        LockHandle::new(name, identity, lease).unwrap()
    }

    #[tokio::test]
    async fn test_basic_lock_acquire_release() {
        let service = MemoryLockService::default();
        let first = handle("my-lock", "client-1", Duration::from_secs(30));
        let second = handle("my-lock", "client-2", Duration::from_secs(30));

        assert!(service.acquire(&first).await.unwrap());
        assert!(!service.acquire(&second).await.unwrap());
        assert_eq!(
            service.owner("my-lock").await.unwrap(),
            Some("client-1".to_string())
        );

        let err = service.release(&second).await.unwrap_err();
        assert!(err.is_ownership_violation());

        service.release(&first).await.unwrap();
        assert_eq!(service.owner("my-lock").await.unwrap(), None);

        // Now client-2 can acquire
        assert!(service.acquire(&second).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lease_is_stolen() {
        let service = MemoryLockService::default();
        let first = handle("steal-lock", "client-1", Duration::from_millis(20));
        let second = handle("steal-lock", "client-2", Duration::from_secs(30));

        assert!(service.acquire(&first).await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;

        let entry = service.entry("steal-lock").await.unwrap().unwrap();
        assert_eq!(entry.state_at(Utc::now()), LockState::Expired);
        assert_eq!(entry.owner.as_deref(), Some("client-1"));

        assert!(service.acquire(&second).await.unwrap());
        assert_eq!(
            service.owner("steal-lock").await.unwrap(),
            Some("client-2".to_string())
        );

        // The previous owner can no longer release
        assert!(service.release(&first).await.is_err());
    }

    #[tokio::test]
    async fn test_release_keeps_row() {
        let service = MemoryLockService::default();
        let h = handle("kept", "client-1", Duration::from_secs(30));

        assert!(service.is_empty());
        service.acquire(&h).await.unwrap();
        service.release(&h).await.unwrap();

        assert_eq!(service.len(), 1);
        let entry = service.entry("kept").await.unwrap().unwrap();
        assert_eq!(entry, LedgerEntry::unlocked("kept"));
    }
}
