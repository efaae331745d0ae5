use rusqlite::Connection;
use todo_core::db::migrations::latest_version;
use todo_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "todo_item");
    assert_table_exists(&conn, "sqlite_sequence");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO todo_item (created_at, updated_at, name) VALUES (1, 1, 'kept');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM todo_item;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn untracked_legacy_table_is_adopted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE todo_item (
            id INTEGER PRIMARY KEY NOT NULL,
            created_at NUMERIC NOT NULL,
            updated_at NUMERIC NOT NULL,
            name TEXT NOT NULL
        );
        INSERT INTO todo_item (created_at, updated_at, name) VALUES (1, 1, 'old');",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let name: String = conn
        .query_row("SELECT name FROM todo_item WHERE id = 1;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "old");
}

#[test]
fn failing_migration_step_leaves_database_at_previous_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocked.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE todo_item (
            id INTEGER PRIMARY KEY NOT NULL,
            created_at NUMERIC NOT NULL,
            updated_at NUMERIC NOT NULL,
            name TEXT NOT NULL
        );
        CREATE TABLE todo_item_next (id INTEGER);
        INSERT INTO todo_item (created_at, updated_at, name) VALUES (1, 1, 'old');",
    )
    .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::MigrationFailed { version, name, .. } => {
            assert_eq!(version, 2);
            assert_eq!(name, "autoincrement_ids");
        }
        other => panic!("unexpected error: {other}"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM todo_item;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
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
