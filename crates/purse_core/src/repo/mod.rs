//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for users and wallets.
//! - Isolate SQLite query details from service/business orchestration.
//! - Surface storage-level uniqueness rejections as typed errors.
//!
//! # Invariants
//! - Repositories never check for duplicates themselves; the partial unique
//!   indexes decide and `ConstraintViolation` reports the outcome.
//! - Repositories never inject an "active only" filter into searches.
//! - Every call runs inside the caller's deadline.

pub mod user_repo;
pub mod wallet_repo;

use crate::db::{DbError, StorageGateway};
use crate::deadline::Deadline;
use rusqlite::{ffi, params, Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user/wallet persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A unique index or primary key rejected the write.
    ConstraintViolation {
        table: String,
        columns: Vec<String>,
    },
    NotFound(Uuid),
    InvalidData(String),
    DeadlineExceeded,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ConstraintViolation { table, columns } => write!(
                f,
                "uniqueness constraint violated on {table}({})",
                columns.join(", ")
            ),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::DeadlineExceeded => write!(f, "request deadline exceeded"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::DeadlineExceeded => Self::DeadlineExceeded,
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match unique_violation_target(&value) {
            Some((table, columns)) => Self::ConstraintViolation { table, columns },
            None => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Parses `UNIQUE constraint failed: users.email` style messages.
fn unique_violation_target(err: &rusqlite::Error) -> Option<(String, Vec<String>)> {
    let rusqlite::Error::SqliteFailure(failure, Some(message)) = err else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation
        || !matches!(
            failure.extended_code,
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    {
        return None;
    }

    let targets = message.strip_prefix("UNIQUE constraint failed: ")?;
    let mut table = String::new();
    let mut columns = Vec::new();
    for target in targets.split(',').map(str::trim) {
        let (target_table, column) = target.split_once('.')?;
        table = target_table.to_string();
        columns.push(column.to_string());
    }
    Some((table, columns))
}

/// Runs `op` with `deadline` armed on the gateway.
///
/// Statement failures caused by the deadline come back as
/// `RepoError::DeadlineExceeded`; everything else passes through unchanged.
pub(crate) fn with_deadline<'g, T>(
    gateway: &'g StorageGateway,
    deadline: &Deadline,
    op: impl FnOnce(&'g StorageGateway) -> RepoResult<T>,
) -> RepoResult<T> {
    let scope = gateway.enter(deadline)?;
    match op(gateway) {
        Err(RepoError::Db(DbError::Sqlite(err))) if scope.is_deadline_failure(&err) => {
            Err(RepoError::DeadlineExceeded)
        }
        other => other,
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

/// Links a user and a wallet. Only called from entity create paths.
pub(crate) fn insert_membership(
    conn: &Connection,
    user_id: Uuid,
    wallet_id: Uuid,
    created_at: i64,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO user_wallets (user_id, wallet_id, created_at)
         VALUES (?1, ?2, ?3);",
        params![user_id.to_string(), wallet_id.to_string(), created_at],
    )?;
    Ok(())
}

/// Active wallets linked to `user_id`, ordered by id.
pub(crate) fn load_active_wallet_ids(conn: &Connection, user_id: &str) -> RepoResult<Vec<Uuid>> {
    load_linked_ids(
        conn,
        "SELECT uw.wallet_id
         FROM user_wallets uw
         INNER JOIN wallets w ON w.id = uw.wallet_id
         WHERE uw.user_id = ?1
           AND w.deleted_at IS NULL
         ORDER BY uw.wallet_id ASC;",
        user_id,
        "user_wallets.wallet_id",
    )
}

/// Active users linked to `wallet_id`, ordered by id.
pub(crate) fn load_active_owner_ids(conn: &Connection, wallet_id: &str) -> RepoResult<Vec<Uuid>> {
    load_linked_ids(
        conn,
        "SELECT uw.user_id
         FROM user_wallets uw
         INNER JOIN users u ON u.id = uw.user_id
         WHERE uw.wallet_id = ?1
           AND u.deleted_at IS NULL
         ORDER BY uw.user_id ASC;",
        wallet_id,
        "user_wallets.user_id",
    )
}

fn load_linked_ids(
    conn: &Connection,
    sql: &str,
    key: &str,
    column: &str,
) -> RepoResult<Vec<Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, column)?);
    }
    Ok(ids)
}
