//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide find/search/create/update/soft-delete over `users`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `create_user` relies on `idx_users_email_active` for email uniqueness.
//! - `soft_delete_user` only sets `deleted_at` when it is still unset.
//! - Read paths reject invalid persisted state instead of masking it.

use super::{
    insert_membership, load_active_wallet_ids, parse_uuid, with_deadline, RepoError, RepoResult,
};
use crate::db::StorageGateway;
use crate::deadline::Deadline;
use crate::model::credential::PasswordHash;
use crate::model::deletion::Deletion;
use crate::model::user::{User, UserId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    first_name,
    last_name,
    email,
    password_hash,
    deleted_at,
    created_at,
    updated_at
FROM users";

/// One ANDed search condition over `users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCondition {
    Id(UserId),
    FirstName(String),
    LastName(String),
    /// Case-insensitive exact match.
    Email(String),
    /// `false` keeps active rows, `true` keeps soft-deleted rows.
    Deleted(bool),
}

/// Repository interface for user persistence.
pub trait UserRepository {
    /// Inserts a new user row (and any wallet links it carries).
    fn create_user(&self, deadline: &Deadline, user: &User) -> RepoResult<UserId>;
    /// Persists names, email, credential and `updated_at` of an active user.
    fn update_user(&self, deadline: &Deadline, user: &User) -> RepoResult<()>;
    /// Loads one user, optionally including soft-deleted rows.
    fn find_user(
        &self,
        deadline: &Deadline,
        id: UserId,
        include_deleted: bool,
    ) -> RepoResult<Option<User>>;
    /// Returns every user matching all conditions, ordered by id.
    fn search_users(&self, deadline: &Deadline, conditions: &[UserCondition])
        -> RepoResult<Vec<User>>;
    /// Sets the deletion timestamp if unset; `NotFound` if the row is absent.
    fn soft_delete_user(&self, deadline: &Deadline, id: UserId, deleted_at: i64) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'g> {
    gateway: &'g StorageGateway,
}

impl<'g> SqliteUserRepository<'g> {
    pub fn new(gateway: &'g StorageGateway) -> Self {
        Self { gateway }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, deadline: &Deadline, user: &User) -> RepoResult<UserId> {
        with_deadline(self.gateway, deadline, |gateway| {
            let tx = gateway.begin_write()?;
            tx.execute(
                "INSERT INTO users (
                    id,
                    first_name,
                    last_name,
                    email,
                    password_hash,
                    deleted_at,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    user.id.to_string(),
                    user.first_name.as_str(),
                    user.last_name.as_str(),
                    user.email.as_str(),
                    user.password_hash.as_str(),
                    user.deletion.to_column(),
                    user.created_at,
                    user.updated_at,
                ],
            )?;
            for wallet_id in &user.wallet_ids {
                insert_membership(&tx, user.id, *wallet_id, user.created_at)?;
            }
            tx.commit()?;
            Ok(user.id)
        })
    }

    fn update_user(&self, deadline: &Deadline, user: &User) -> RepoResult<()> {
        with_deadline(self.gateway, deadline, |gateway| {
            let tx = gateway.begin_write()?;
            let changed = tx.execute(
                "UPDATE users
                 SET
                    first_name = ?1,
                    last_name = ?2,
                    email = ?3,
                    password_hash = ?4,
                    updated_at = ?5
                 WHERE id = ?6
                   AND deleted_at IS NULL;",
                params![
                    user.first_name.as_str(),
                    user.last_name.as_str(),
                    user.email.as_str(),
                    user.password_hash.as_str(),
                    user.updated_at,
                    user.id.to_string(),
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(user.id));
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn find_user(
        &self,
        deadline: &Deadline,
        id: UserId,
        include_deleted: bool,
    ) -> RepoResult<Option<User>> {
        with_deadline(self.gateway, deadline, |gateway| {
            let conn = gateway.connection();
            let mut stmt = conn.prepare(&format!(
                "{USER_SELECT_SQL}
                 WHERE id = ?1
                   AND (?2 = 1 OR deleted_at IS NULL);"
            ))?;
            let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(parse_user_row(conn, row)?));
            }

            Ok(None)
        })
    }

    fn search_users(
        &self,
        deadline: &Deadline,
        conditions: &[UserCondition],
    ) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        for condition in conditions {
            match condition {
                UserCondition::Id(id) => {
                    sql.push_str(" AND id = ?");
                    bind_values.push(Value::Text(id.to_string()));
                }
                UserCondition::FirstName(value) => {
                    sql.push_str(" AND first_name = ?");
                    bind_values.push(Value::Text(value.clone()));
                }
                UserCondition::LastName(value) => {
                    sql.push_str(" AND last_name = ?");
                    bind_values.push(Value::Text(value.clone()));
                }
                UserCondition::Email(value) => {
                    sql.push_str(" AND email = ?");
                    bind_values.push(Value::Text(value.clone()));
                }
                UserCondition::Deleted(false) => sql.push_str(" AND deleted_at IS NULL"),
                UserCondition::Deleted(true) => sql.push_str(" AND deleted_at IS NOT NULL"),
            }
        }
        sql.push_str(" ORDER BY id ASC;");

        with_deadline(self.gateway, deadline, |gateway| {
            let conn = gateway.connection();
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut users = Vec::new();
            while let Some(row) = rows.next()? {
                users.push(parse_user_row(conn, row)?);
            }
            Ok(users)
        })
    }

    fn soft_delete_user(&self, deadline: &Deadline, id: UserId, deleted_at: i64) -> RepoResult<()> {
        with_deadline(self.gateway, deadline, |gateway| {
            let tx = gateway.begin_write()?;
            let changed = tx.execute(
                "UPDATE users
                 SET
                    deleted_at = COALESCE(deleted_at, ?1),
                    updated_at = CASE
                        WHEN deleted_at IS NULL THEN MAX(updated_at, ?1)
                        ELSE updated_at
                    END
                 WHERE id = ?2;",
                params![deleted_at, id.to_string()],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            tx.commit()?;
            Ok(())
        })
    }
}

fn parse_user_row(conn: &Connection, row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "users.id")?;
    let wallet_ids = load_active_wallet_ids(conn, &id_text)?;

    Ok(User {
        id,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        password_hash: PasswordHash::from_phc(row.get::<_, String>("password_hash")?),
        deletion: Deletion::from_column(row.get("deleted_at")?),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        wallet_ids,
    })
}
