//! Storage configuration resolved from the runtime environment.
//!
//! # Responsibility
//! - Map the `APP_ENV` value to a storage location.
//! - Carry connection tuning knobs into [`crate::db::initialize`].
//!
//! # Invariants
//! - Unknown or missing `APP_ENV` values resolve to the production path.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable selecting the runtime environment.
pub const APP_ENV_VAR: &str = "APP_ENV";
/// Database file used in `development`.
pub const DEV_DB_PATH: &str = "data/cats_dev.db";
/// Database file used in `production` and by default.
pub const PROD_DB_PATH: &str = "data/cats.db";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime environment the process was started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Test,
    Development,
    Production,
    /// `APP_ENV` missing or not one of the known values.
    Unset,
}

impl AppEnv {
    /// Reads `APP_ENV` from the process environment.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(APP_ENV_VAR).ok().as_deref())
    }

    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("test") => Self::Test,
            Some("development") => Self::Development,
            Some("production") => Self::Production,
            _ => Self::Unset,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Development => "development",
            Self::Production => "production",
            Self::Unset => "unset",
        }
    }

    pub fn storage_location(self) -> StorageLocation {
        match self {
            Self::Test => StorageLocation::Memory,
            Self::Development => StorageLocation::File(PathBuf::from(DEV_DB_PATH)),
            Self::Production | Self::Unset => StorageLocation::File(PathBuf::from(PROD_DB_PATH)),
        }
    }
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Memory,
    File(PathBuf),
}

impl StorageLocation {
    /// Log-friendly mode label (`memory` or `file`).
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Memory => None,
            Self::File(path) => Some(path.as_path()),
        }
    }
}

impl Display for StorageLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str(":memory:"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Connection settings for [`crate::db::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    location: StorageLocation,
    busy_timeout: Duration,
}

impl DbConfig {
    /// Builds the config for the environment named by `APP_ENV`.
    pub fn from_env() -> Self {
        Self::for_env(AppEnv::from_env())
    }

    pub fn for_env(env: AppEnv) -> Self {
        Self::with_location(env.storage_location())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_location(StorageLocation::File(path.into()))
    }

    pub fn in_memory() -> Self {
        Self::with_location(StorageLocation::Memory)
    }

    pub fn with_location(location: StorageLocation) -> Self {
        Self {
            location,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::{AppEnv, DbConfig, StorageLocation, DEV_DB_PATH, PROD_DB_PATH};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn app_env_maps_known_values_to_locations() {
        assert_eq!(
            AppEnv::parse(Some("test")).storage_location(),
            StorageLocation::Memory
        );
        assert_eq!(
            AppEnv::parse(Some("development")).storage_location(),
            StorageLocation::File(PathBuf::from(DEV_DB_PATH))
        );
        assert_eq!(
            AppEnv::parse(Some("production")).storage_location(),
            StorageLocation::File(PathBuf::from(PROD_DB_PATH))
        );
    }

    #[test]
    fn missing_or_unknown_env_falls_back_to_production_path() {
        assert_eq!(AppEnv::parse(None), AppEnv::Unset);
        assert_eq!(AppEnv::parse(Some("staging")), AppEnv::Unset);
        assert_eq!(
            DbConfig::for_env(AppEnv::Unset).location(),
            &StorageLocation::File(PathBuf::from(PROD_DB_PATH))
        );
    }

    #[test]
    fn config_builders_set_location_and_timeout() {
        let config = DbConfig::file("/tmp/cats.db").with_busy_timeout(Duration::from_millis(250));
        assert_eq!(config.location().mode(), "file");
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(DbConfig::in_memory().location().to_string(), ":memory:");
        assert!(DbConfig::in_memory().location().path().is_none());
    }
}
