use rusqlite::Connection;
use std::fs;
use wobble_core::db::migrations::{
    bundled, load_migrations, EmbeddedMigrations, MigrationLedger, LEDGER_TABLE,
};
use wobble_core::db::{initialize_with, open_db, open_db_in_memory};
use wobble_core::{initialize, AppEnv, ConnectionError, DbConfig, StorageLocation};

#[test]
fn test_env_initializes_in_memory_with_all_migrations() {
    let config = DbConfig::for_env(AppEnv::Test);
    assert_eq!(config.location(), &StorageLocation::Memory);

    let db = initialize(&config).unwrap();

    assert_eq!(db.location(), &StorageLocation::Memory);
    assert_table_exists(db.connection(), LEDGER_TABLE);
    assert_table_exists(db.connection(), "cats");
    assert_eq!(applied_ids(db.connection()), bundled_ids());
}

#[test]
fn bundled_schema_has_listing_indexes() {
    let db = open_db_in_memory().unwrap();

    for index in [
        "idx_cats_breed",
        "idx_cats_owner_email",
        "idx_cats_microchip_id",
    ] {
        let exists: i64 = db
            .connection()
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1);",
                [index],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1, "index {index} does not exist");
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cats.db");

    let first = open_db(&path).unwrap();
    let entries_first = MigrationLedger::new(first.connection()).entries().unwrap();
    first.close().unwrap();

    let second = open_db(&path).unwrap();
    let entries_second = MigrationLedger::new(second.connection()).entries().unwrap();

    assert_eq!(entries_first, entries_second);
    assert_eq!(applied_ids(second.connection()), bundled_ids());
}

#[test]
fn file_location_parent_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("nested").join("cats.db");

    let db = initialize(&DbConfig::file(&path)).unwrap();

    assert!(path.exists());
    assert_eq!(db.location().path(), Some(path.as_path()));
}

#[test]
fn unusable_parent_directory_fails_with_create_dir_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "a file, not a directory").unwrap();

    let err = initialize(&DbConfig::file(blocker.join("sub").join("cats.db"))).unwrap_err();

    assert!(matches!(err, ConnectionError::CreateDir { .. }));
}

#[test]
fn failing_startup_migration_surfaces_as_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.db");
    let source = EmbeddedMigrations::new(&[
        ("001_ok.sql", "CREATE TABLE ok (id INTEGER);"),
        ("002_broken.sql", "CREATE TABLE broken (id INTEGER) oops;"),
    ]);

    let err = initialize_with(&DbConfig::file(&path), source).unwrap_err();

    match &err {
        ConnectionError::Migration(inner) => assert_eq!(inner.migration_id(), Some(2)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("002_broken.sql"));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(applied_ids(&conn), vec![1]);
}

fn bundled_ids() -> Vec<u32> {
    load_migrations(&bundled())
        .unwrap()
        .migrations
        .iter()
        .map(|migration| migration.id())
        .collect()
}

fn applied_ids(conn: &Connection) -> Vec<u32> {
    MigrationLedger::new(conn)
        .entries()
        .unwrap()
        .into_iter()
        .map(|entry| entry.id)
        .collect()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
