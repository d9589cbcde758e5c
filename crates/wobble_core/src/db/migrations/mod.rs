//! Versioned SQL migrations: loading, ledger and execution.
//!
//! # Responsibility
//! - Bundle the schema migrations shipped with this binary.
//! - Apply pending migrations transactionally and in ascending ID order.
//!
//! # Invariants
//! - Migration IDs are unique across bundled files.
//! - A migration is in the ledger iff all of its statements committed.

use crate::db::StorageError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub mod ledger;
pub mod loader;
pub mod runner;

pub use ledger::{LedgerEntry, MigrationLedger, LEDGER_TABLE};
pub use loader::{
    load_migrations, parse_migration_id, DirMigrations, EmbeddedMigrations, LoadedMigrations,
    MigrationFile, MigrationSource, SkipReason, SkippedMigration,
};
pub use runner::{split_statements, AppliedMigration, MigrationReport, MigrationRunner};

const BUNDLED_MIGRATIONS: &[(&str, &str)] = &[
    ("001_create_cats.sql", include_str!("001_create_cats.sql")),
    (
        "002_add_cat_indexes.sql",
        include_str!("002_add_cat_indexes.sql"),
    ),
];

/// One versioned schema change. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    id: u32,
    filename: String,
    sql: String,
}

impl Migration {
    pub(crate) fn new(id: u32, filename: String, sql: String) -> Self {
        Self { id, filename, sql }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Migrations compiled into this binary.
pub fn bundled() -> EmbeddedMigrations {
    EmbeddedMigrations::new(BUNDLED_MIGRATIONS)
}

/// Failure to enumerate migration resources.
#[derive(Debug)]
pub enum LoadError {
    Enumerate { location: PathBuf, source: io::Error },
    Read { filename: String, source: io::Error },
    DuplicateId { id: u32, first: String, second: String },
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enumerate { location, source } => write!(
                f,
                "failed to enumerate migrations in `{}`: {source}",
                location.display()
            ),
            Self::Read { filename, source } => {
                write!(f, "failed to read migration file {filename}: {source}")
            }
            Self::DuplicateId { id, first, second } => write!(
                f,
                "migration id {id} is used by both {first} and {second}"
            ),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Enumerate { source, .. } | Self::Read { source, .. } => Some(source),
            Self::DuplicateId { .. } => None,
        }
    }
}

/// Failure of a migration run.
#[derive(Debug)]
pub enum MigrationError {
    Load(LoadError),
    Ledger(StorageError),
    Transaction {
        id: u32,
        filename: String,
        source: rusqlite::Error,
    },
    Statement {
        id: u32,
        filename: String,
        /// Zero-based position of the statement within the file.
        index: usize,
        statement: String,
        source: rusqlite::Error,
    },
    Record {
        id: u32,
        filename: String,
        source: StorageError,
    },
}

impl MigrationError {
    /// ID of the migration that failed, when the failure is migration-specific.
    pub fn migration_id(&self) -> Option<u32> {
        match self {
            Self::Transaction { id, .. } | Self::Statement { id, .. } | Self::Record { id, .. } => {
                Some(*id)
            }
            Self::Load(_) | Self::Ledger(_) => None,
        }
    }
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "failed to load migrations: {err}"),
            Self::Ledger(err) => write!(f, "migration ledger unavailable: {err}"),
            Self::Transaction {
                filename, source, ..
            } => write!(f, "transaction for migration {filename} failed: {source}"),
            Self::Statement {
                filename,
                index,
                statement,
                source,
                ..
            } => write!(
                f,
                "migration {filename} failed at statement #{}: {statement}: {source}",
                index + 1
            ),
            Self::Record {
                filename, source, ..
            } => write!(f, "failed to record migration {filename}: {source}"),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::Ledger(err) => Some(err),
            Self::Transaction { source, .. } | Self::Statement { source, .. } => Some(source),
            Self::Record { source, .. } => Some(source),
        }
    }
}

impl From<LoadError> for MigrationError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}
