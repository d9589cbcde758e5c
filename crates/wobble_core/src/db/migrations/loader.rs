//! Migration discovery and filename parsing.
//!
//! # Responsibility
//! - Enumerate `*.sql` migration resources from a [`MigrationSource`].
//! - Parse the numeric migration ID from each filename.
//! - Return loaded migrations sorted ascending by ID.
//!
//! # Invariants
//! - A single malformed filename never aborts the whole load; it is reported
//!   as a [`SkippedMigration`] instead.
//! - Two files resolving to the same ID are rejected with
//!   [`LoadError::DuplicateId`].

use super::{LoadError, Migration};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;

/// File extension recognized as a migration resource.
pub const MIGRATION_EXTENSION: &str = ".sql";

const ID_SEPARATOR: char = '_';

static MIGRATION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid migration id regex"));

/// Raw migration resource before ID parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub filename: String,
    pub sql: String,
}

/// Anything that can enumerate migration resources.
pub trait MigrationSource {
    fn files(&self) -> Result<Vec<MigrationFile>, LoadError>;
}

impl<S: MigrationSource + ?Sized> MigrationSource for &S {
    fn files(&self) -> Result<Vec<MigrationFile>, LoadError> {
        (**self).files()
    }
}

/// Migration resources compiled into the binary as `(filename, sql)` pairs.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedMigrations {
    files: &'static [(&'static str, &'static str)],
}

impl EmbeddedMigrations {
    pub const fn new(files: &'static [(&'static str, &'static str)]) -> Self {
        Self { files }
    }
}

impl MigrationSource for EmbeddedMigrations {
    fn files(&self) -> Result<Vec<MigrationFile>, LoadError> {
        Ok(self
            .files
            .iter()
            .map(|(filename, sql)| MigrationFile {
                filename: (*filename).to_string(),
                sql: (*sql).to_string(),
            })
            .collect())
    }
}

/// Migration resources read from a directory at runtime.
#[derive(Debug, Clone)]
pub struct DirMigrations {
    dir: PathBuf,
}

impl DirMigrations {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MigrationSource for DirMigrations {
    fn files(&self) -> Result<Vec<MigrationFile>, LoadError> {
        let enumerate_err = |source| LoadError::Enumerate {
            location: self.dir.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(enumerate_err)? {
            let entry = entry.map_err(enumerate_err)?;
            if !entry.file_type().map_err(enumerate_err)?.is_file() {
                continue;
            }

            let filename = entry.file_name().to_string_lossy().into_owned();
            if !filename.ends_with(MIGRATION_EXTENSION) {
                continue;
            }

            let sql = fs::read_to_string(entry.path()).map_err(|source| LoadError::Read {
                filename: filename.clone(),
                source,
            })?;
            files.push(MigrationFile { filename, sql });
        }

        Ok(files)
    }
}

/// Why a migration file was left out of a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The leading filename segment is not a plain non-negative integer.
    InvalidId { segment: String },
    /// The leading segment is numeric but does not fit a migration ID.
    IdOutOfRange { segment: String },
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId { segment } => write!(f, "invalid migration id `{segment}`"),
            Self::IdOutOfRange { segment } => {
                write!(f, "migration id `{segment}` is out of range")
            }
        }
    }
}

/// A migration file that was not loaded, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMigration {
    pub filename: String,
    pub reason: SkipReason,
}

/// Result of a load: ordered migrations plus per-file skip outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedMigrations {
    pub migrations: Vec<Migration>,
    pub skipped: Vec<SkippedMigration>,
}

/// Loads every migration exposed by `source`, sorted ascending by ID.
///
/// # Errors
/// - Propagates source enumeration/read failures.
/// - Returns [`LoadError::DuplicateId`] when two files share an ID.
pub fn load_migrations<S: MigrationSource + ?Sized>(
    source: &S,
) -> Result<LoadedMigrations, LoadError> {
    let mut loaded = LoadedMigrations::default();

    for file in source.files()? {
        if !file.filename.ends_with(MIGRATION_EXTENSION) {
            debug!(
                "event=migration_load module=db status=ignored file={}",
                file.filename
            );
            continue;
        }

        match parse_migration_id(&file.filename) {
            Ok(id) => loaded
                .migrations
                .push(Migration::new(id, file.filename, file.sql)),
            Err(reason) => {
                warn!(
                    "event=migration_load module=db status=skipped file={} reason={}",
                    file.filename, reason
                );
                loaded.skipped.push(SkippedMigration {
                    filename: file.filename,
                    reason,
                });
            }
        }
    }

    loaded.migrations.sort_by(|left, right| {
        left.id()
            .cmp(&right.id())
            .then_with(|| left.filename().cmp(right.filename()))
    });

    if let Some(pair) = loaded
        .migrations
        .windows(2)
        .find(|pair| pair[0].id() == pair[1].id())
    {
        return Err(LoadError::DuplicateId {
            id: pair[0].id(),
            first: pair[0].filename().to_string(),
            second: pair[1].filename().to_string(),
        });
    }

    Ok(loaded)
}

/// Parses the migration ID from a filename such as `001_create_cats.sql`.
///
/// The ID is the segment before the first `_` (or the whole stem when the
/// name has no separator).
pub fn parse_migration_id(filename: &str) -> Result<u32, SkipReason> {
    let stem = filename
        .strip_suffix(MIGRATION_EXTENSION)
        .unwrap_or(filename);
    let segment = stem.split(ID_SEPARATOR).next().unwrap_or(stem);

    if !MIGRATION_ID_RE.is_match(segment) {
        return Err(SkipReason::InvalidId {
            segment: segment.to_string(),
        });
    }

    segment
        .parse::<u32>()
        .map_err(|_| SkipReason::IdOutOfRange {
            segment: segment.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::{load_migrations, parse_migration_id, EmbeddedMigrations, SkipReason};
    use crate::db::migrations::LoadError;

    #[test]
    fn parse_migration_id_accepts_padded_and_plain_prefixes() {
        assert_eq!(parse_migration_id("001_create_cats.sql"), Ok(1));
        assert_eq!(parse_migration_id("42_add_index.sql"), Ok(42));
        assert_eq!(parse_migration_id("7.sql"), Ok(7));
    }

    #[test]
    fn parse_migration_id_rejects_non_numeric_prefixes() {
        assert_eq!(
            parse_migration_id("abc_init.sql"),
            Err(SkipReason::InvalidId {
                segment: "abc".to_string()
            })
        );
        assert!(parse_migration_id("-1_negative.sql").is_err());
        assert!(parse_migration_id("_leading.sql").is_err());
        assert_eq!(
            parse_migration_id("99999999999_huge.sql"),
            Err(SkipReason::IdOutOfRange {
                segment: "99999999999".to_string()
            })
        );
    }

    #[test]
    fn load_sorts_by_id_regardless_of_source_order() {
        let source = EmbeddedMigrations::new(&[
            ("010_ten.sql", "SELECT 10;"),
            ("002_two.sql", "SELECT 2;"),
            ("001_one.sql", "SELECT 1;"),
        ]);

        let loaded = load_migrations(&source).unwrap();
        let ids: Vec<u32> = loaded.migrations.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec![1, 2, 10]);
        assert!(loaded.skipped.is_empty());
    }

    #[test]
    fn load_skips_bad_names_and_ignores_other_extensions() {
        let source = EmbeddedMigrations::new(&[
            ("abc_init.sql", "SELECT 0;"),
            ("README.md", "docs"),
            ("001_one.sql", "SELECT 1;"),
        ]);

        let loaded = load_migrations(&source).unwrap();
        assert_eq!(loaded.migrations.len(), 1);
        assert_eq!(loaded.migrations[0].filename(), "001_one.sql");
        assert_eq!(loaded.skipped.len(), 1);
        assert_eq!(loaded.skipped[0].filename, "abc_init.sql");
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let source = EmbeddedMigrations::new(&[
            ("002_b.sql", "SELECT 2;"),
            ("02_a.sql", "SELECT 2;"),
        ]);

        match load_migrations(&source).unwrap_err() {
            LoadError::DuplicateId { id, first, second } => {
                assert_eq!(id, 2);
                assert_eq!(first, "002_b.sql");
                assert_eq!(second, "02_a.sql");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
