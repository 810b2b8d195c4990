use purse_core::db::migrations::latest_version;
use purse_core::db::{open_db, open_db_in_memory, DbError, StorageGateway};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let gateway = open_db_in_memory().unwrap();
    let conn = gateway.connection();

    assert_eq!(schema_version(conn), latest_version());
    assert_table_exists(conn, "users");
    assert_table_exists(conn, "wallets");
    assert_table_exists(conn, "user_wallets");
    assert_index_exists(conn, "idx_users_email_active");
    assert_index_exists(conn, "idx_wallets_name_active");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("purse.db");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(first.connection()), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(second.connection()), latest_version());
    assert_table_exists(second.connection(), "user_wallets");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema must be rejected"),
    }
}

#[test]
fn gateway_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    match StorageGateway::from_connection(conn) {
        Err(DbError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection must be rejected"),
    }
}

#[test]
fn gateway_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE users (id TEXT PRIMARY KEY);
         PRAGMA user_version = {};",
        latest_version()
    ))
    .unwrap();

    match StorageGateway::from_connection(conn) {
        Err(DbError::MissingRequiredColumn { table, column }) => {
            assert_eq!(table, "users");
            assert_eq!(column, "first_name");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("incomplete schema must be rejected"),
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let gateway = open_db_in_memory().unwrap();
    let enabled: i64 = gateway
        .connection()
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = gateway
        .connection()
        .execute(
            "INSERT INTO user_wallets (user_id, wallet_id, created_at)
             VALUES ('missing-user', 'missing-wallet', 0);",
            [],
        )
        .unwrap_err();
    assert_eq!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    );
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_schema_object(conn, "table", table_name);
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert_schema_object(conn, "index", index_name);
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
