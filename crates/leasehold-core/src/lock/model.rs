//! Lock ledger data model

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use leasehold_common::LockError;
use leasehold_persistence::lock_ledger;

/// Lock state as observed at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    /// No row, or a row without an owner
    Unlocked,
    /// Owner recorded and lease still running
    Held,
    /// Owner recorded but lease elapsed; stealable by anyone
    Expired,
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockState::Unlocked => "unlocked",
            LockState::Held => "held",
            LockState::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Caller-side lock handle
///
/// Created once per contender and reused across acquire/release cycles. It
/// does not track whether it currently holds the lock; ownership is always
/// read back from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    name: String,
    identity: String,
    lease: Duration,
}

impl LockHandle {
    pub fn new(
        name: impl Into<String>,
        identity: impl Into<String>,
        lease: Duration,
    ) -> Result<Self, LockError> {
        let name = name.into();
        let identity = identity.into();

        if name.trim().is_empty() {
            return Err(LockError::InvalidHandle("lock name is empty".to_string()));
        }
        if identity.trim().is_empty() {
            return Err(LockError::InvalidHandle(format!(
                "identity for lock '{}' is empty",
                name
            )));
        }
        if lease.is_zero() {
            return Err(LockError::InvalidHandle(format!(
                "lease for lock '{}' is zero",
                name
            )));
        }
        if TimeDelta::from_std(lease).is_err() {
            return Err(LockError::InvalidHandle(format!(
                "lease for lock '{}' is out of range",
                name
            )));
        }

        Ok(Self {
            name,
            identity,
            lease,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Expiry instant of a lease starting at `now`
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, LockError> {
        TimeDelta::from_std(self.lease)
            .ok()
            .and_then(|lease| now.checked_add_signed(lease))
            .ok_or_else(|| {
                LockError::InvalidHandle(format!(
                    "lease for lock '{}' overflows the expiry instant",
                    self.name
                ))
            })
    }
}

impl fmt::Display for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identity, self.name)
    }
}

/// One ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    pub fn unlocked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            expires_at: None,
        }
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> LockState {
        match (&self.owner, self.expires_at) {
            (None, _) => LockState::Unlocked,
            (Some(_), Some(expires_at)) if expires_at > now => LockState::Held,
            // An owner without an expiry counts as expired
            (Some(_), _) => LockState::Expired,
        }
    }

    /// Whether an acquire at `now` may take this entry
    pub fn is_claimable_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) != LockState::Held
    }

    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner.as_deref() == Some(identity)
    }

    /// Time left on the lease, if held
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.state_at(now) != LockState::Held {
            return None;
        }
        self.expires_at
            .and_then(|expires_at| (expires_at - now).to_std().ok())
    }

    pub(crate) fn claim(&mut self, identity: &str, expires_at: DateTime<Utc>) {
        self.owner = Some(identity.to_string());
        self.expires_at = Some(expires_at);
    }

    pub(crate) fn clear(&mut self) {
        self.owner = None;
        self.expires_at = None;
    }
}

impl From<lock_ledger::Model> for LedgerEntry {
    fn from(model: lock_ledger::Model) -> Self {
        Self {
            name: model.name,
            owner: model.owner,
            expires_at: model.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_handle_validation() {
        assert!(LockHandle::new("cleaner", "node-1", Duration::from_secs(1)).is_ok());

        let err = LockHandle::new("", "node-1", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LockError::InvalidHandle(_)));

        let err = LockHandle::new("cleaner", " ", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LockError::InvalidHandle(_)));

        let err = LockHandle::new("cleaner", "node-1", Duration::ZERO).unwrap_err();
        assert!(matches!(err, LockError::InvalidHandle(_)));

        let err = LockHandle::new("cleaner", "node-1", Duration::MAX).unwrap_err();
        assert!(matches!(err, LockError::InvalidHandle(_)));
    }

    #[test]
    fn test_expiry_from_applies_full_lease() {
        let handle = LockHandle::new("cleaner", "node-1", Duration::from_secs(30)).unwrap();
        assert_eq!(handle.expiry_from(at(0)).unwrap(), at(30));
        assert_eq!(handle.to_string(), "node-1@cleaner");
    }

    #[test]
    fn test_state_transitions() {
        let mut entry = LedgerEntry::unlocked("cleaner");
        assert_eq!(entry.state_at(at(0)), LockState::Unlocked);
        assert!(entry.is_claimable_at(at(0)));

        entry.claim("node-1", at(10));
        assert_eq!(entry.state_at(at(0)), LockState::Held);
        assert!(!entry.is_claimable_at(at(9)));
        assert!(entry.is_owned_by("node-1"));
        assert!(!entry.is_owned_by("node-2"));

        // Expiry instant itself is no longer in the future
        assert_eq!(entry.state_at(at(10)), LockState::Expired);
        assert!(entry.is_claimable_at(at(10)));
        assert!(entry.is_owned_by("node-1"));

        entry.clear();
        assert_eq!(entry.state_at(at(0)), LockState::Unlocked);
        assert_eq!(entry.owner, None);
    }

    #[test]
    fn test_owner_without_expiry_is_expired() {
        let entry = LedgerEntry {
            name: "cleaner".to_string(),
            owner: Some("node-1".to_string()),
            expires_at: None,
        };
        assert_eq!(entry.state_at(at(0)), LockState::Expired);
        assert_eq!(entry.remaining_at(at(0)), None);
    }

    #[test]
    fn test_remaining_at() {
        let mut entry = LedgerEntry::unlocked("cleaner");
        assert_eq!(entry.remaining_at(at(0)), None);

        entry.claim("node-1", at(10));
        assert_eq!(entry.remaining_at(at(4)), Some(Duration::from_secs(6)));
        assert_eq!(entry.remaining_at(at(11)), None);
    }
}
