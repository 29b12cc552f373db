//! Error types for lock operations
//!
//! This module defines:
//! - `LockError`: errors surfaced by acquire/release/read calls
//! - `LockErrorKind`: coarse classification for callers that branch on it
//!
//! Contention is not an error: a busy lock is reported as `Ok(false)` by
//! acquire.

use sea_orm::DbErr;

/// Errors raised by the lock ledger
#[derive(thiserror::Error, Debug)]
pub enum LockError {
    /// Release attempted by an identity that is not the recorded owner
    #[error(
        "lock '{name}' is not held by '{identity}' (recorded owner: {})",
        describe_owner(.owner)
    )]
    OwnershipViolation {
        name: String,
        identity: String,
        owner: Option<String>,
    },

    #[error("invalid lock handle: {0}")]
    InvalidHandle(String),

    #[error("database error: {0}")]
    Storage(#[from] DbErr),

    #[error("store clock error: {0}")]
    Clock(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Classification of a [`LockError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockErrorKind {
    OwnershipViolation,
    InvalidHandle,
    Storage,
    Config,
}

impl LockError {
    pub fn kind(&self) -> LockErrorKind {
        match self {
            LockError::OwnershipViolation { .. } => LockErrorKind::OwnershipViolation,
            LockError::InvalidHandle(_) => LockErrorKind::InvalidHandle,
            LockError::Storage(_) | LockError::Clock(_) => LockErrorKind::Storage,
            LockError::Config(_) => LockErrorKind::Config,
        }
    }

    pub fn is_ownership_violation(&self) -> bool {
        self.kind() == LockErrorKind::OwnershipViolation
    }

    pub fn ownership_violation(
        name: impl Into<String>,
        identity: impl Into<String>,
        owner: Option<String>,
    ) -> Self {
        LockError::OwnershipViolation {
            name: name.into(),
            identity: identity.into(),
            owner,
        }
    }
}

impl From<config::ConfigError> for LockError {
    fn from(value: config::ConfigError) -> Self {
        LockError::Config(value.to_string())
    }
}

fn describe_owner(owner: &Option<String>) -> &str {
    owner.as_deref().unwrap_or("none")
}
