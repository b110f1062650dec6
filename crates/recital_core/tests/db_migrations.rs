use recital_core::db::migrations::latest_version;
use recital_core::db::{open_db, open_db_in_memory, DbError};
use recital_core::{RepoError, SqlitePoemRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["poems", "quotes", "notes", "invalid_annotations"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recital.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "poems");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

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
fn repository_rejects_connection_without_schema() {
    let mut conn = Connection::open_in_memory().unwrap();
    match SqlitePoemRepository::try_new(&mut conn) {
        Err(RepoError::MissingRequiredTable(table)) => assert_eq!(table, "poems"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("repository accepted an empty database"),
    }
}

#[test]
fn deleting_a_poem_cascades_to_annotations() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO poems (title, sort_order, converted_poem, word_count, author)
         VALUES ('Echo', 0, '{1}a{1}', 1, 'Anon');
         INSERT INTO quotes (poem_title, position, words) VALUES ('Echo', 0, '[\"{1}a{1}\"]');
         INSERT INTO notes (poem_title, position, label, words) VALUES ('Echo', 0, 'n', '[\"{1}a{1}\"]');
         DELETE FROM poems WHERE title = 'Echo';",
    )
    .unwrap();

    let remaining: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM quotes) + (SELECT COUNT(*) FROM notes);",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(remaining, 0);
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

#[test]
fn open_db_reports_the_unopenable_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("recital.sqlite3");

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::Open { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}
