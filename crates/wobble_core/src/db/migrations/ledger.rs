//! Persisted record of applied migrations.
//!
//! # Invariants
//! - One row per successfully applied migration, never updated or deleted.
//! - Recording an ID twice fails on the primary key instead of being ignored.

use crate::db::{DbResult, StorageError};
use rusqlite::{params, Connection};
use std::collections::HashSet;

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "migrations";

/// One applied migration as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: u32,
    pub filename: String,
    /// SQLite `CURRENT_TIMESTAMP` text (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub applied_at: String,
}

/// Ledger accessor bound to one connection.
pub struct MigrationLedger<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MigrationLedger<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates the ledger table when absent. Safe on every startup.
    pub fn ensure_table(&self) -> DbResult<()> {
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
                    id INTEGER PRIMARY KEY,
                    filename TEXT NOT NULL UNIQUE,
                    applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
                );"
            ))
            .map_err(|err| StorageError::new("ensure_ledger_table", err))
    }

    /// Returns every recorded migration ID; empty on a fresh ledger.
    pub fn applied_ids(&self) -> DbResult<HashSet<u32>> {
        let read_err = |err| StorageError::new("read_applied_ids", err);

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id FROM {LEDGER_TABLE};"))
            .map_err(read_err)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, u32>(0))
            .map_err(read_err)?
            .collect::<Result<HashSet<_>, _>>()
            .map_err(read_err)?;

        Ok(ids)
    }

    /// Records a successfully applied migration.
    ///
    /// # Errors
    /// - Fails with a constraint violation when `id` or `filename` is already
    ///   recorded; that means a migration would have been applied twice.
    pub fn record(&self, id: u32, filename: &str) -> DbResult<()> {
        self.conn
            .execute(
                &format!("INSERT INTO {LEDGER_TABLE} (id, filename) VALUES (?1, ?2);"),
                params![id, filename],
            )
            .map_err(|err| StorageError::new("record_migration", err))?;
        Ok(())
    }

    /// Lists ledger rows ordered by migration ID.
    pub fn entries(&self) -> DbResult<Vec<LedgerEntry>> {
        let read_err = |err| StorageError::new("read_ledger_entries", err);

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT id, filename, applied_at FROM {LEDGER_TABLE} ORDER BY id ASC;"
            ))
            .map_err(read_err)?;
        let entries = stmt
            .query_map([], |row| {
                Ok(LedgerEntry {
                    id: row.get("id")?,
                    filename: row.get("filename")?,
                    applied_at: row.get("applied_at")?,
                })
            })
            .map_err(read_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::MigrationLedger;
    use rusqlite::Connection;

    #[test]
    fn ensure_table_is_idempotent_and_starts_empty() {
        let conn = Connection::open_in_memory().unwrap();
        let ledger = MigrationLedger::new(&conn);

        ledger.ensure_table().unwrap();
        ledger.ensure_table().unwrap();

        assert!(ledger.applied_ids().unwrap().is_empty());
        assert!(ledger.entries().unwrap().is_empty());
    }

    #[test]
    fn record_twice_fails_with_constraint_violation() {
        let conn = Connection::open_in_memory().unwrap();
        let ledger = MigrationLedger::new(&conn);
        ledger.ensure_table().unwrap();

        ledger.record(5, "x").unwrap();
        let err = ledger.record(5, "x").unwrap_err();

        assert_eq!(err.operation(), "record_migration");
        assert!(err.is_constraint_violation());
        assert_eq!(ledger.applied_ids().unwrap().len(), 1);
    }

    #[test]
    fn entries_are_ordered_and_timestamped() {
        let conn = Connection::open_in_memory().unwrap();
        let ledger = MigrationLedger::new(&conn);
        ledger.ensure_table().unwrap();

        ledger.record(2, "002_b.sql").unwrap();
        ledger.record(1, "001_a.sql").unwrap();

        let entries = ledger.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[1].filename, "002_b.sql");
        assert!(!entries[0].applied_at.is_empty());
        assert!(ledger.applied_ids().unwrap().contains(&2));
    }
}
