//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure the single SQLite connection used by the core.
//! - Apply bundled schema migrations in deterministic order.
//!
//! # Invariants
//! - Applied migrations are tracked in the `migrations` ledger table.
//! - Callers never see a handle whose migrations have not fully run.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{initialize, initialize_with, open_db, open_db_in_memory, Database};

use migrations::MigrationError;

pub type DbResult<T> = Result<T, StorageError>;

/// Failure of a ledger or query operation against the storage engine.
#[derive(Debug)]
pub struct StorageError {
    operation: &'static str,
    source: rusqlite::Error,
}

impl StorageError {
    pub fn new(operation: &'static str, source: rusqlite::Error) -> Self {
        Self { operation, source }
    }

    /// Short name of the operation that failed, e.g. `record_migration`.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Returns whether the engine rejected the write on a constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self.source.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        )
    }

    /// Returns whether the write collided with a `UNIQUE` index.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            &self.source,
            rusqlite::Error::SqliteFailure(err, _)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "storage operation `{}` failed: {}", self.operation, self.source)
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Failure while bringing up the storage handle.
#[derive(Debug)]
pub enum ConnectionError {
    CreateDir { path: PathBuf, source: io::Error },
    Open(rusqlite::Error),
    Configure(rusqlite::Error),
    Ping(rusqlite::Error),
    Migration(MigrationError),
    Close(rusqlite::Error),
}

impl Display for ConnectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateDir { path, source } => write!(
                f,
                "failed to create database directory `{}`: {source}",
                path.display()
            ),
            Self::Open(err) => write!(f, "failed to open database: {err}"),
            Self::Configure(err) => write!(f, "failed to configure database: {err}"),
            Self::Ping(err) => write!(f, "database ping failed: {err}"),
            Self::Migration(err) => write!(f, "startup migrations failed: {err}"),
            Self::Close(err) => write!(f, "failed to close database: {err}"),
        }
    }
}

impl Error for ConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Open(err) | Self::Configure(err) | Self::Ping(err) | Self::Close(err) => {
                Some(err)
            }
            Self::Migration(err) => Some(err),
        }
    }
}

impl From<MigrationError> for ConnectionError {
    fn from(value: MigrationError) -> Self {
        Self::Migration(value)
    }
}
