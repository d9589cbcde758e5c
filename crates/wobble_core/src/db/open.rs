//! Connection bootstrap for the embedded SQLite store.
//!
//! # Responsibility
//! - Resolve the storage location and create its parent directory.
//! - Open one connection, enable foreign keys and verify liveness.
//! - Run pending migrations before handing the connection out.
//!
//! # Invariants
//! - Returned handles have `foreign_keys=ON` and all migrations applied.
//! - A handle that fails any bootstrap step is closed before returning.

use super::migrations::{bundled, MigrationRunner, MigrationSource};
use super::ConnectionError;
use crate::config::{DbConfig, StorageLocation};
use log::{error, info, warn};
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Owned storage handle.
///
/// Wraps exactly one SQLite connection. `Connection` is not `Sync`, so all
/// access through a handle is serialized; callers that need cross-thread
/// access wrap the whole handle in their own lock.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
    location: StorageLocation,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Closes the underlying connection, reporting any close failure.
    pub fn close(self) -> Result<(), ConnectionError> {
        self.conn
            .close()
            .map_err(|(_, err)| ConnectionError::Close(err))
    }
}

/// Opens storage per `config` and applies all bundled migrations.
///
/// # Side effects
/// - Creates the parent directory of a file-backed location.
/// - Emits `db_open` logging events with duration and status.
pub fn initialize(config: &DbConfig) -> Result<Database, ConnectionError> {
    initialize_with(config, bundled())
}

/// Same as [`initialize`], with migrations taken from `source`.
pub fn initialize_with<S: MigrationSource>(
    config: &DbConfig,
    source: S,
) -> Result<Database, ConnectionError> {
    let started_at = Instant::now();
    let mode = config.location().mode();
    info!("event=db_open module=db status=start mode={mode}");

    match bootstrap(config, source) {
        Ok(db) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(db)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code={} error={}",
                started_at.elapsed().as_millis(),
                error_code(&err),
                err
            );
            Err(err)
        }
    }
}

/// Opens a SQLite database file and applies all pending migrations.
pub fn open_db(path: impl AsRef<Path>) -> Result<Database, ConnectionError> {
    initialize(&DbConfig::file(path.as_ref()))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> Result<Database, ConnectionError> {
    initialize(&DbConfig::in_memory())
}

fn bootstrap<S: MigrationSource>(
    config: &DbConfig,
    source: S,
) -> Result<Database, ConnectionError> {
    let mut conn = match config.location() {
        StorageLocation::Memory => Connection::open_in_memory(),
        StorageLocation::File(path) => {
            ensure_parent_dir(path)?;
            Connection::open(path)
        }
    }
    .map_err(ConnectionError::Open)?;

    if let Err(err) = configure(&conn, config) {
        close_quietly(conn);
        return Err(err);
    }

    if let Err(err) = ping(&conn) {
        close_quietly(conn);
        return Err(err);
    }

    if let Err(err) = MigrationRunner::new(source).run(&mut conn) {
        close_quietly(conn);
        return Err(err.into());
    }

    Ok(Database {
        conn,
        location: config.location().clone(),
    })
}

fn ensure_parent_dir(path: &Path) -> Result<(), ConnectionError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| ConnectionError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn configure(conn: &Connection, config: &DbConfig) -> Result<(), ConnectionError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(ConnectionError::Configure)?;
    conn.busy_timeout(config.busy_timeout())
        .map_err(ConnectionError::Configure)?;
    Ok(())
}

fn ping(conn: &Connection) -> Result<(), ConnectionError> {
    conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))
        .map(|_| ())
        .map_err(ConnectionError::Ping)
}

fn close_quietly(conn: Connection) {
    if let Err((_, err)) = conn.close() {
        warn!("event=db_close module=db status=error error={err}");
    }
}

fn error_code(err: &ConnectionError) -> &'static str {
    match err {
        ConnectionError::CreateDir { .. } => "db_dir_failed",
        ConnectionError::Open(_) => "db_open_failed",
        ConnectionError::Configure(_) => "db_configure_failed",
        ConnectionError::Ping(_) => "db_ping_failed",
        ConnectionError::Migration(_) => "db_migration_failed",
        ConnectionError::Close(_) => "db_close_failed",
    }
}

#[cfg(test)]
mod tests {
    use super::{ensure_parent_dir, open_db_in_memory};

    #[test]
    fn in_memory_handle_enforces_foreign_keys() {
        let db = open_db_in_memory().unwrap();
        let enabled: i64 = db
            .connection()
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
        db.close().unwrap();
    }

    #[test]
    fn ensure_parent_dir_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("cats.db");

        ensure_parent_dir(&path).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn ensure_parent_dir_accepts_bare_file_names() {
        ensure_parent_dir(std::path::Path::new("cats.db")).unwrap();
    }
}
