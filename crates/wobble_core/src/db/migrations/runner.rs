//! Pending-migration executor.
//!
//! # Responsibility
//! - Diff loaded migrations against the ledger.
//! - Apply each pending migration in its own transaction, in ID order.
//!
//! # Invariants
//! - Migration N is never applied before migration N-1 succeeded.
//! - A failing statement rolls back its whole migration and stops the run.
//! - The ledger row is written after commit. A crash between the two leaves
//!   the migration applied but unrecorded, and the next run retries it.

use super::ledger::MigrationLedger;
use super::loader::{load_migrations, MigrationSource, SkippedMigration};
use super::{Migration, MigrationError};
use log::info;
use rusqlite::Connection;
use std::time::Instant;

const STATEMENT_DELIMITER: char = ';';
const LINE_COMMENT_PREFIX: &str = "--";

/// Migration applied during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub id: u32,
    pub filename: String,
    /// Number of statements executed.
    pub statements: usize,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<AppliedMigration>,
    pub skipped: Vec<SkippedMigration>,
    /// Loaded migrations that the ledger already listed.
    pub already_applied: usize,
}

impl MigrationReport {
    pub fn applied_ids(&self) -> Vec<u32> {
        self.applied.iter().map(|migration| migration.id).collect()
    }
}

/// Applies migrations from a source against a connection.
pub struct MigrationRunner<S> {
    source: S,
}

impl<S: MigrationSource> MigrationRunner<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Runs every pending migration.
    ///
    /// # Errors
    /// - [`MigrationError::Ledger`] when the ledger cannot be created or read.
    /// - [`MigrationError::Load`] when the source cannot be enumerated.
    /// - [`MigrationError::Statement`] naming the first failing statement.
    pub fn run(&self, conn: &mut Connection) -> Result<MigrationReport, MigrationError> {
        MigrationLedger::new(conn)
            .ensure_table()
            .map_err(MigrationError::Ledger)?;
        let loaded = load_migrations(&self.source)?;
        let applied = MigrationLedger::new(conn)
            .applied_ids()
            .map_err(MigrationError::Ledger)?;

        let mut report = MigrationReport {
            skipped: loaded.skipped,
            ..MigrationReport::default()
        };

        for migration in &loaded.migrations {
            if applied.contains(&migration.id()) {
                report.already_applied += 1;
                continue;
            }

            let started_at = Instant::now();
            info!(
                "event=migration_apply module=db status=start id={} file={}",
                migration.id(),
                migration.filename()
            );

            let statements = apply_migration(conn, migration)?;
            MigrationLedger::new(conn)
                .record(migration.id(), migration.filename())
                .map_err(|source| MigrationError::Record {
                    id: migration.id(),
                    filename: migration.filename().to_string(),
                    source,
                })?;

            info!(
                "event=migration_apply module=db status=ok id={} file={} statements={} duration_ms={}",
                migration.id(),
                migration.filename(),
                statements,
                started_at.elapsed().as_millis()
            );
            report.applied.push(AppliedMigration {
                id: migration.id(),
                filename: migration.filename().to_string(),
                statements,
            });
        }

        Ok(report)
    }
}

/// Executes one migration inside a transaction and returns the statement count.
fn apply_migration(
    conn: &mut Connection,
    migration: &Migration,
) -> Result<usize, MigrationError> {
    let transaction_err = |source| MigrationError::Transaction {
        id: migration.id(),
        filename: migration.filename().to_string(),
        source,
    };

    let statements = split_statements(migration.sql());
    let tx = conn.transaction().map_err(transaction_err)?;

    for (index, statement) in statements.iter().enumerate() {
        // Dropping `tx` on the error path rolls back earlier statements.
        tx.execute_batch(statement)
            .map_err(|source| MigrationError::Statement {
                id: migration.id(),
                filename: migration.filename().to_string(),
                index,
                statement: statement.clone(),
                source,
            })?;
    }

    tx.commit().map_err(transaction_err)?;
    Ok(statements.len())
}

/// Splits migration SQL into executable statements.
///
/// Comment-only lines are dropped before splitting, so a `;` inside a `--`
/// comment never ends a statement. Blank statements are skipped. The split is
/// otherwise purely textual, so a `;` inside a string literal still splits.
pub fn split_statements(sql: &str) -> Vec<String> {
    let without_comments = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with(LINE_COMMENT_PREFIX))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(STATEMENT_DELIMITER)
        .map(|statement| statement.trim().to_string())
        .filter(|statement| !statement.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::split_statements;

    #[test]
    fn split_statements_drops_blanks_and_comment_lines() {
        let sql = "-- header comment\nCREATE TABLE a (id INTEGER);\n\n;\n  -- only a comment;\nINSERT INTO a VALUES (1);";

        let statements = split_statements(sql);
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE a (id INTEGER)".to_string(),
                "INSERT INTO a VALUES (1)".to_string(),
            ]
        );
    }

    #[test]
    fn split_statements_keeps_statement_after_leading_comment() {
        let statements = split_statements("-- add column\nALTER TABLE a ADD COLUMN b TEXT;");
        assert_eq!(statements, vec!["ALTER TABLE a ADD COLUMN b TEXT".to_string()]);
    }

    #[test]
    fn split_statements_ignores_delimiter_inside_comment_line() {
        let sql = "-- step 1; create the table\nCREATE TABLE a (id INTEGER);\n  -- step 2; seed it\nINSERT INTO a VALUES (1);";

        let statements = split_statements(sql);
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE a (id INTEGER)".to_string(),
                "INSERT INTO a VALUES (1)".to_string(),
            ]
        );
    }

    #[test]
    fn split_statements_of_empty_input_is_empty() {
        assert!(split_statements("").is_empty());
        assert!(split_statements(" \n-- nothing here\n").is_empty());
    }
}
