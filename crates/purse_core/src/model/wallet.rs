//! Wallet domain model.
//!
//! # Invariants
//! - `name` is stored trimmed.
//! - `balance` is exact fixed-point.
//! - `owner_ids` lists active users only and is sorted for stable output.

use super::balance::Balance;
use super::deletion::Deletion;
use super::now_epoch_ms;
use super::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time-ordered (UUID v7) wallet identifier.
pub type WalletId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub id: WalletId,
    pub name: String,
    pub balance: Balance,
    pub deletion: Deletion,
    pub created_at: i64,
    pub updated_at: i64,
    pub owner_ids: Vec<UserId>,
}

impl Wallet {
    pub fn new(name: impl Into<String>, balance: Balance, owner_ids: Vec<UserId>) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            balance,
            deletion: Deletion::Active,
            created_at: now,
            updated_at: now,
            owner_ids,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deletion.is_active()
    }

    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(now_epoch_ms());
    }
}

/// Outward-facing wallet projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletView {
    pub id: WalletId,
    pub name: String,
    pub balance: Balance,
    pub owner_ids: Vec<UserId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&Wallet> for WalletView {
    fn from(wallet: &Wallet) -> Self {
        Self {
            id: wallet.id,
            name: wallet.name.clone(),
            balance: wallet.balance,
            owner_ids: wallet.owner_ids.clone(),
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}
