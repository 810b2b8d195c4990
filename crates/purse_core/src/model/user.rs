//! User domain model.
//!
//! # Invariants
//! - `id` is stable and never reused for another user.
//! - `email` is stored trimmed and lowercase.
//! - `password_hash` never leaves the core: `UserView` has no such field.

use super::credential::PasswordHash;
use super::deletion::Deletion;
use super::now_epoch_ms;
use super::wallet::WalletId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time-ordered (UUID v7) user identifier.
pub type UserId = Uuid;

/// Canonical stored user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub deletion: Deletion,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
    /// Active wallets linked through `user_wallets`; order is irrelevant.
    pub wallet_ids: Vec<WalletId>,
}

impl User {
    /// Creates an active user with a fresh ID and both timestamps set to now.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: PasswordHash,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::now_v7(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            password_hash,
            deletion: Deletion::Active,
            created_at: now,
            updated_at: now,
            wallet_ids: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.deletion.is_active()
    }

    /// Bumps `updated_at` without letting it go backwards.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(now_epoch_ms());
    }
}

/// Outward-facing user projection. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
