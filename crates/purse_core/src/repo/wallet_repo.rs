//! Wallet repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide find/search/create/update/soft-delete over `wallets`.
//! - Write owner links together with the wallet row in one transaction.
//!
//! # Invariants
//! - `create_wallet` relies on `idx_wallets_name_active` for name uniqueness.
//! - Balances round-trip through canonical decimal text, never floats.
//! - Soft delete leaves `user_wallets` rows in place.

use super::{
    insert_membership, load_active_owner_ids, parse_uuid, with_deadline, RepoError, RepoResult,
};
use crate::db::StorageGateway;
use crate::deadline::Deadline;
use crate::model::balance::Balance;
use crate::model::deletion::Deletion;
use crate::model::user::UserId;
use crate::model::wallet::{Wallet, WalletId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const WALLET_SELECT_SQL: &str = "SELECT
    id,
    name,
    balance,
    deleted_at,
    created_at,
    updated_at
FROM wallets";

/// One ANDed search condition over `wallets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletCondition {
    Id(WalletId),
    Name(String),
    /// Wallet is linked to this user (regardless of the user's state).
    OwnerId(UserId),
    Deleted(bool),
}

/// Repository interface for wallet persistence.
pub trait WalletRepository {
    /// Inserts the wallet row and one `user_wallets` row per owner.
    fn create_wallet(&self, deadline: &Deadline, wallet: &Wallet) -> RepoResult<WalletId>;
    /// Persists name, balance and `updated_at` of an active wallet.
    fn update_wallet(&self, deadline: &Deadline, wallet: &Wallet) -> RepoResult<()>;
    fn find_wallet(
        &self,
        deadline: &Deadline,
        id: WalletId,
        include_deleted: bool,
    ) -> RepoResult<Option<Wallet>>;
    fn search_wallets(
        &self,
        deadline: &Deadline,
        conditions: &[WalletCondition],
    ) -> RepoResult<Vec<Wallet>>;
    fn soft_delete_wallet(
        &self,
        deadline: &Deadline,
        id: WalletId,
        deleted_at: i64,
    ) -> RepoResult<()>;
}

/// SQLite-backed wallet repository.
pub struct SqliteWalletRepository<'g> {
    gateway: &'g StorageGateway,
}

impl<'g> SqliteWalletRepository<'g> {
    pub fn new(gateway: &'g StorageGateway) -> Self {
        Self { gateway }
    }
}

impl WalletRepository for SqliteWalletRepository<'_> {
    fn create_wallet(&self, deadline: &Deadline, wallet: &Wallet) -> RepoResult<WalletId> {
        with_deadline(self.gateway, deadline, |gateway| {
            let tx = gateway.begin_write()?;
            tx.execute(
                "INSERT INTO wallets (
                    id,
                    name,
                    balance,
                    deleted_at,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    wallet.id.to_string(),
                    wallet.name.as_str(),
                    wallet.balance.to_string(),
                    wallet.deletion.to_column(),
                    wallet.created_at,
                    wallet.updated_at,
                ],
            )?;
            for owner_id in &wallet.owner_ids {
                insert_membership(&tx, *owner_id, wallet.id, wallet.created_at)?;
            }
            tx.commit()?;
            Ok(wallet.id)
        })
    }

    fn update_wallet(&self, deadline: &Deadline, wallet: &Wallet) -> RepoResult<()> {
        with_deadline(self.gateway, deadline, |gateway| {
            let tx = gateway.begin_write()?;
            let changed = tx.execute(
                "UPDATE wallets
                 SET
                    name = ?1,
                    balance = ?2,
                    updated_at = ?3
                 WHERE id = ?4
                   AND deleted_at IS NULL;",
                params![
                    wallet.name.as_str(),
                    wallet.balance.to_string(),
                    wallet.updated_at,
                    wallet.id.to_string(),
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(wallet.id));
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn find_wallet(
        &self,
        deadline: &Deadline,
        id: WalletId,
        include_deleted: bool,
    ) -> RepoResult<Option<Wallet>> {
        with_deadline(self.gateway, deadline, |gateway| {
            let conn = gateway.connection();
            let mut stmt = conn.prepare(&format!(
                "{WALLET_SELECT_SQL}
                 WHERE id = ?1
                   AND (?2 = 1 OR deleted_at IS NULL);"
            ))?;
            let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(parse_wallet_row(conn, row)?));
            }

            Ok(None)
        })
    }

    fn search_wallets(
        &self,
        deadline: &Deadline,
        conditions: &[WalletCondition],
    ) -> RepoResult<Vec<Wallet>> {
        let mut sql = format!("{WALLET_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        for condition in conditions {
            match condition {
                WalletCondition::Id(id) => {
                    sql.push_str(" AND id = ?");
                    bind_values.push(Value::Text(id.to_string()));
                }
                WalletCondition::Name(value) => {
                    sql.push_str(" AND name = ?");
                    bind_values.push(Value::Text(value.clone()));
                }
                WalletCondition::OwnerId(owner_id) => {
                    sql.push_str(
                        " AND EXISTS (
                            SELECT 1
                            FROM user_wallets uw
                            WHERE uw.wallet_id = wallets.id
                              AND uw.user_id = ?
                        )",
                    );
                    bind_values.push(Value::Text(owner_id.to_string()));
                }
                WalletCondition::Deleted(false) => sql.push_str(" AND deleted_at IS NULL"),
                WalletCondition::Deleted(true) => sql.push_str(" AND deleted_at IS NOT NULL"),
            }
        }
        sql.push_str(" ORDER BY id ASC;");

        with_deadline(self.gateway, deadline, |gateway| {
            let conn = gateway.connection();
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut wallets = Vec::new();
            while let Some(row) = rows.next()? {
                wallets.push(parse_wallet_row(conn, row)?);
            }
            Ok(wallets)
        })
    }

    fn soft_delete_wallet(
        &self,
        deadline: &Deadline,
        id: WalletId,
        deleted_at: i64,
    ) -> RepoResult<()> {
        with_deadline(self.gateway, deadline, |gateway| {
            let tx = gateway.begin_write()?;
            let changed = tx.execute(
                "UPDATE wallets
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

fn parse_wallet_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Wallet> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "wallets.id")?;

    let balance_text: String = row.get("balance")?;
    let balance = Balance::parse(&balance_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid balance `{balance_text}` in wallets.balance: {err}"
        ))
    })?;

    let owner_ids = load_active_owner_ids(conn, &id_text)?;

    Ok(Wallet {
        id,
        name: row.get("name")?,
        balance,
        deletion: Deletion::from_column(row.get("deleted_at")?),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        owner_ids,
    })
}
