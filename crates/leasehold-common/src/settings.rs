//! Layered configuration for lock ledger hosts
//!
//! Sources are applied in order, later ones winning:
//! 1. built-in defaults
//! 2. `conf/leasehold.toml` (optional) or an explicit file
//! 3. environment variables prefixed with `LEASEHOLD`, `__` separating
//!    sections (e.g. `LEASEHOLD_DB__URL`)
//! 4. caller overrides (command line flags)

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::LockError;
use crate::lease::deserialize_lease;

pub const ENV_PREFIX: &str = "LEASEHOLD";
pub const DEFAULT_CONFIG_FILE: &str = "conf/leasehold";
pub const DEFAULT_DB_URL: &str = "sqlite://leasehold.db?mode=rwc";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Top-level settings
#[derive(Clone, Debug, Deserialize)]
pub struct LockSettings {
    pub db: DbSettings,
    pub lock: LeaseSettings,
    pub log: LogSettings,
}

/// Ledger store connection settings
#[derive(Clone, Debug, Deserialize)]
pub struct DbSettings {
    pub url: String,
    pub max_connections: u32,
    /// Isolation level requested for lock transactions; unset keeps the
    /// store's default
    #[serde(default)]
    pub isolation: Option<Isolation>,
}

/// Defaults for lock handles created by the host
#[derive(Clone, Debug, Deserialize)]
pub struct LeaseSettings {
    #[serde(deserialize_with = "deserialize_lease")]
    pub lease: Duration,
    #[serde(default)]
    pub identity: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LogSettings {
    pub level: String,
}

/// Transaction isolation levels a host may request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl From<Isolation> for sea_orm::IsolationLevel {
    fn from(value: Isolation) -> Self {
        match value {
            Isolation::ReadCommitted => sea_orm::IsolationLevel::ReadCommitted,
            Isolation::RepeatableRead => sea_orm::IsolationLevel::RepeatableRead,
            Isolation::Serializable => sea_orm::IsolationLevel::Serializable,
        }
    }
}

impl LockSettings {
    /// Load settings from defaults, the config file, and the environment
    pub fn load(file: Option<&Path>) -> Result<Self, LockError> {
        Self::load_with_overrides(file, &[])
    }

    /// Load settings, then apply `(key, value)` overrides such as
    /// `("db.url", "postgres://...")`
    pub fn load_with_overrides(
        file: Option<&Path>,
        overrides: &[(&str, String)],
    ) -> Result<Self, LockError> {
        let mut builder = Config::builder()
            .set_default("db.url", DEFAULT_DB_URL)?
            .set_default("db.max_connections", i64::from(DEFAULT_MAX_CONNECTIONS))?
            .set_default("lock.lease", "3600")?
            .set_default("log.level", DEFAULT_LOG_LEVEL)?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for (key, value) in overrides {
            builder = builder.set_override(*key, value.as_str())?;
        }

        let settings: LockSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), LockError> {
        if self.db.url.trim().is_empty() {
            return Err(LockError::Config("db.url must not be empty".to_string()));
        }
        if self.db.max_connections == 0 {
            return Err(LockError::Config(
                "db.max_connections must be at least 1".to_string(),
            ));
        }
        if matches!(self.lock.identity.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(LockError::Config(
                "lock.identity must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Identity written as lock owner by this process
    ///
    /// Falls back to `<hostname>:<pid>` so co-located processes never share
    /// an identity.
    pub fn identity(&self) -> String {
        match &self.lock.identity {
            Some(identity) => identity.clone(),
            None => default_identity(),
        }
    }
}

/// `<hostname>:<pid>` for the current process
pub fn default_identity() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}:{}", host, std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn test_file_values_override_defaults() {
        let file = write_config(
            r#"
[db]
url = "postgres://lock:lock@db/locks"
max_connections = 4
isolation = "serializable"

[lock]
lease = "90s"
identity = "node-a"
"#,
        );

        let settings = LockSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.db.url, "postgres://lock:lock@db/locks");
        assert_eq!(settings.db.max_connections, 4);
        assert_eq!(settings.db.isolation, Some(Isolation::Serializable));
        assert_eq!(settings.lock.lease, Duration::from_secs(90));
        assert_eq!(settings.identity(), "node-a");
        assert_eq!(settings.log.level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_defaults_when_file_is_sparse() {
        let file = write_config("[log]\nlevel = \"debug\"\n");

        let settings = LockSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.db.url, DEFAULT_DB_URL);
        assert_eq!(settings.db.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(settings.db.isolation, None);
        assert_eq!(settings.lock.lease, Duration::from_secs(3600));
        assert_eq!(settings.log.level, "debug");
        assert!(settings.identity().contains(':'));
    }

    #[test]
    fn test_overrides_win() {
        let file = write_config("[lock]\nlease = \"10s\"\n");

        let settings = LockSettings::load_with_overrides(
            Some(file.path()),
            &[
                ("lock.lease", "1".to_string()),
                ("db.url", "sqlite::memory:".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(settings.lock.lease, Duration::from_secs(1));
        assert_eq!(settings.db.url, "sqlite::memory:");
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let file = write_config("[lock]\nlease = \"0\"\n");
        let err = LockSettings::load(Some(file.path())).unwrap_err();
        assert_eq!(err.kind(), crate::LockErrorKind::Config);

        let file = write_config("[db]\nmax_connections = 0\n");
        let err = LockSettings::load(Some(file.path())).unwrap_err();
        assert_eq!(err.kind(), crate::LockErrorKind::Config);

        let file = write_config("[lock]\nidentity = \"  \"\n");
        assert!(LockSettings::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_default_identity_is_host_and_pid() {
        let identity = default_identity();
        let (host, pid) = identity.rsplit_once(':').unwrap();

        assert!(!host.is_empty());
        assert_eq!(pid, std::process::id().to_string());
    }
}
