//! Storage gateway wrapping one migrated SQLite connection.
//!
//! # Responsibility
//! - Own the connection handed to repositories (no process-global handle).
//! - Verify that a connection is migrated before any query runs on it.
//! - Bound every request by its deadline: interrupt long statements and cap
//!   lock waits at the remaining budget.
//!
//! # Invariants
//! - At most one `DeadlineScope` is alive per gateway at a time; scopes are
//!   not nested.
//! - Outside a scope the connection runs without a progress handler and with
//!   the default busy timeout.

use super::migrations::{current_user_version, latest_version};
use super::{DbError, DbResult};
use crate::deadline::Deadline;
use log::warn;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use std::time::{Duration, Instant};

pub(crate) const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of VM instructions between deadline checks.
const PROGRESS_CHECK_INTERVAL_OPS: i32 = 1_000;

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "users",
        &[
            "id",
            "first_name",
            "last_name",
            "email",
            "password_hash",
            "deleted_at",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "wallets",
        &[
            "id",
            "name",
            "balance",
            "deleted_at",
            "created_at",
            "updated_at",
        ],
    ),
    ("user_wallets", &["user_id", "wallet_id", "created_at"]),
];

/// The only component that talks to SQLite.
pub struct StorageGateway {
    conn: Connection,
}

impl StorageGateway {
    /// Wraps a connection after checking it carries the current schema.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `user_version` differs from the
    ///   latest migration.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema was
    ///   tampered with.
    pub fn from_connection(conn: Connection) -> DbResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Borrow of the raw connection, for repositories and diagnostics.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Arms `deadline` on the connection until the returned scope drops.
    ///
    /// Fails with `DeadlineExceeded` without touching storage when the
    /// deadline has already passed.
    pub fn enter(&self, deadline: &Deadline) -> DbResult<DeadlineScope<'_>> {
        let remaining = deadline.remaining().ok_or(DbError::DeadlineExceeded)?;
        let lock_wait = remaining.min(DEFAULT_BUSY_TIMEOUT);
        self.conn.busy_timeout(lock_wait)?;

        let expires_at = deadline.expires_at();
        self.conn.progress_handler(
            PROGRESS_CHECK_INTERVAL_OPS,
            Some(move || Instant::now() >= expires_at),
        );

        Ok(DeadlineScope {
            conn: &self.conn,
            lock_wait_clamped: lock_wait < DEFAULT_BUSY_TIMEOUT,
        })
    }

    /// Starts a write transaction that takes the database write lock up
    /// front, so concurrent writers queue on the busy timeout instead of
    /// failing on lock upgrade.
    pub(crate) fn begin_write(&self) -> DbResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

/// Guard returned by [`StorageGateway::enter`].
pub struct DeadlineScope<'g> {
    conn: &'g Connection,
    lock_wait_clamped: bool,
}

impl DeadlineScope<'_> {
    /// Whether `err` was caused by the deadline rather than by the query.
    ///
    /// Interrupted statements always are; lock timeouts only when the wait
    /// was shortened to fit the remaining budget.
    pub fn is_deadline_failure(&self, err: &rusqlite::Error) -> bool {
        match err.sqlite_error_code() {
            Some(ErrorCode::OperationInterrupted) => true,
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => self.lock_wait_clamped,
            _ => false,
        }
    }
}

impl Drop for DeadlineScope<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
        if let Err(err) = self.conn.busy_timeout(DEFAULT_BUSY_TIMEOUT) {
            warn!("event=deadline_disarm module=db status=error error={err}");
        }
    }
}

fn ensure_connection_ready(conn: &Connection) -> DbResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(DbError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            return Err(DbError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(DbError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
