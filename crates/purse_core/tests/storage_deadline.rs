use purse_core::db::{open_db, open_db_in_memory, DbError};
use purse_core::{
    CreateUserRequest, CredentialHasher, Deadline, ErrorKind, SqliteUserRepository, UserService,
};
use rusqlite::Connection;
use std::time::{Duration, Instant};

const ENDLESS_QUERY: &str = "WITH RECURSIVE counter(x) AS (
    SELECT 1
    UNION ALL
    SELECT x + 1 FROM counter
)
SELECT count(*) FROM counter;";

fn request(email: &str) -> CreateUserRequest {
    CreateUserRequest {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        password: "analytical-engine".to_string(),
    }
}

#[test]
fn expired_deadline_is_rejected_before_storage() {
    let gateway = open_db_in_memory().unwrap();
    let deadline = Deadline::after(Duration::ZERO);
    assert!(matches!(
        gateway.enter(&deadline),
        Err(DbError::DeadlineExceeded)
    ));
}

#[test]
fn long_statement_is_interrupted_at_deadline() {
    let gateway = open_db_in_memory().unwrap();
    let deadline = Deadline::after(Duration::from_millis(50));
    let started_at = Instant::now();

    let scope = gateway.enter(&deadline).unwrap();
    let err = gateway
        .connection()
        .query_row(ENDLESS_QUERY, [], |row| row.get::<_, i64>(0))
        .unwrap_err();

    assert!(scope.is_deadline_failure(&err), "unexpected error: {err}");
    assert!(started_at.elapsed() < Duration::from_secs(5));
}

#[test]
fn deadline_is_disarmed_when_scope_drops() {
    let gateway = open_db_in_memory().unwrap();
    let deadline = Deadline::after(Duration::from_millis(1));
    drop(gateway.enter(&deadline).unwrap());
    std::thread::sleep(Duration::from_millis(5));

    let count: i64 = gateway
        .connection()
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn zero_budget_service_call_times_out_without_writing() {
    let gateway = open_db_in_memory().unwrap();
    let service =
        UserService::with_hasher(SqliteUserRepository::new(&gateway), CredentialHasher::low_cost());

    let err = service
        .create_user(&request("ada@example.com"), Duration::ZERO)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let count: i64 = gateway
        .connection()
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn write_blocked_on_lock_past_budget_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.db");
    let gateway = open_db(&path).unwrap();

    let holder = Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let service =
        UserService::with_hasher(SqliteUserRepository::new(&gateway), CredentialHasher::low_cost());
    let started_at = Instant::now();
    let err = service
        .create_user(&request("blocked@example.com"), Duration::from_millis(200))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout, "unexpected error: {err}");
    assert!(started_at.elapsed() < Duration::from_secs(5));

    holder.execute_batch("ROLLBACK;").unwrap();
    let user = service
        .create_user(&request("blocked@example.com"), Duration::from_secs(5))
        .unwrap();
    assert_eq!(user.email, "blocked@example.com");
}
