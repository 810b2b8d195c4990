//! Wallet use-case service.
//!
//! # Responsibility
//! - Validate wallet names, balances and owner references.
//! - Resolve owners through the user repository before linking.
//!
//! # Invariants
//! - Owners are fixed at creation; updates touch name and balance only.
//! - Balances are never negative.

use super::conditions::{wallet_conditions, SearchConditions};
use super::error::{EntityKind, ServiceError, ServiceResult};
use super::observed;
use super::validation::{parse_balance, parse_lookup_id, required_text};
use crate::deadline::Deadline;
use crate::model::balance::Balance;
use crate::model::now_epoch_ms;
use crate::model::user::UserId;
use crate::model::wallet::{Wallet, WalletView};
use crate::repo::user_repo::UserRepository;
use crate::repo::wallet_repo::WalletRepository;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateWalletRequest {
    pub name: String,
    /// Decimal text; zero when absent.
    #[serde(default)]
    pub balance: Option<String>,
    #[serde(default)]
    pub owner_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateWalletRequest {
    pub name: Option<String>,
    pub balance: Option<String>,
}

/// Use-case service for wallets and their owner links.
pub struct WalletService<W: WalletRepository, U: UserRepository> {
    wallets: W,
    users: U,
}

impl<W: WalletRepository, U: UserRepository> WalletService<W, U> {
    pub fn new(wallets: W, users: U) -> Self {
        Self { wallets, users }
    }

    /// Creates an active wallet linked to every listed owner.
    ///
    /// # Errors
    /// - `NotFound` when an owner ID does not name an active user.
    /// - `AlreadyExists { field: "name" }` when an active wallet holds the name.
    pub fn create_wallet(
        &self,
        request: &CreateWalletRequest,
        budget: Duration,
    ) -> ServiceResult<WalletView> {
        observed("wallet_create", || {
            let deadline = Deadline::after(budget);
            let name = required_text("name", &request.name)?;
            let balance = match request.balance.as_deref() {
                Some(value) => parse_balance(value)?,
                None => Balance::ZERO,
            };
            let owner_ids = self.resolve_owners(&deadline, &request.owner_ids)?;

            let wallet = Wallet::new(name, balance, owner_ids);
            self.wallets
                .create_wallet(&deadline, &wallet)
                .map_err(|err| ServiceError::from_repo(err, EntityKind::Wallet, &deadline))?;
            Ok(WalletView::from(&wallet))
        })
    }

    /// Returns wallets matching every condition, active ones by default.
    pub fn search_wallets(
        &self,
        conditions: &SearchConditions,
        budget: Duration,
    ) -> ServiceResult<Vec<WalletView>> {
        observed("wallet_search", || {
            let deadline = Deadline::after(budget);
            let conditions = wallet_conditions(conditions)?;
            let wallets = self
                .wallets
                .search_wallets(&deadline, &conditions)
                .map_err(|err| ServiceError::from_repo(err, EntityKind::Wallet, &deadline))?;
            Ok(wallets.iter().map(WalletView::from).collect())
        })
    }

    pub fn get_wallet_by_id(&self, id: &str, budget: Duration) -> ServiceResult<WalletView> {
        observed("wallet_get", || {
            let deadline = Deadline::after(budget);
            let wallet = self.load_wallet(&deadline, id, false)?;
            Ok(WalletView::from(&wallet))
        })
    }

    /// Renames and/or rebalances an active wallet.
    pub fn update_wallet(
        &self,
        id: &str,
        request: &UpdateWalletRequest,
        budget: Duration,
    ) -> ServiceResult<WalletView> {
        observed("wallet_update", || {
            let deadline = Deadline::after(budget);
            if request.name.is_none() && request.balance.is_none() {
                return Err(ServiceError::invalid("request", "no fields to update"));
            }
            let name = request
                .name
                .as_deref()
                .map(|value| required_text("name", value))
                .transpose()?;
            let balance = request.balance.as_deref().map(parse_balance).transpose()?;

            let mut wallet = self.load_wallet(&deadline, id, false)?;
            if let Some(name) = name {
                wallet.name = name;
            }
            if let Some(balance) = balance {
                wallet.balance = balance;
            }
            wallet.touch();

            self.wallets
                .update_wallet(&deadline, &wallet)
                .map_err(|err| ServiceError::from_repo(err, EntityKind::Wallet, &deadline))?;
            Ok(WalletView::from(&wallet))
        })
    }

    /// Soft-deletes a wallet. Owner links stay in place.
    pub fn delete_wallet(&self, id: &str, budget: Duration) -> ServiceResult<()> {
        observed("wallet_delete", || {
            let deadline = Deadline::after(budget);
            let wallet = self.load_wallet(&deadline, id, true)?;
            if !wallet.is_active() {
                return Ok(());
            }
            self.wallets
                .soft_delete_wallet(&deadline, wallet.id, now_epoch_ms())
                .map_err(|err| ServiceError::from_repo(err, EntityKind::Wallet, &deadline))
        })
    }

    fn load_wallet(
        &self,
        deadline: &Deadline,
        id: &str,
        include_deleted: bool,
    ) -> ServiceResult<Wallet> {
        let Some(wallet_id) = parse_lookup_id("id", id)? else {
            return Err(ServiceError::not_found(EntityKind::Wallet, id.trim()));
        };
        self.wallets
            .find_wallet(deadline, wallet_id, include_deleted)
            .map_err(|err| ServiceError::from_repo(err, EntityKind::Wallet, deadline))?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Wallet, wallet_id.to_string()))
    }

    /// Deduplicates owner IDs and checks each names an active user.
    fn resolve_owners(&self, deadline: &Deadline, raw_ids: &[String]) -> ServiceResult<Vec<UserId>> {
        let mut owner_ids = BTreeSet::new();
        for raw in raw_ids {
            let Some(owner_id) = parse_lookup_id("owner_ids", raw)? else {
                return Err(ServiceError::not_found(EntityKind::User, raw.trim()));
            };
            owner_ids.insert(owner_id);
        }

        for owner_id in &owner_ids {
            let owner = self
                .users
                .find_user(deadline, *owner_id, false)
                .map_err(|err| ServiceError::from_repo(err, EntityKind::User, deadline))?;
            if owner.is_none() {
                return Err(ServiceError::not_found(EntityKind::User, owner_id.to_string()));
            }
        }
        Ok(owner_ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{CreateWalletRequest, UpdateWalletRequest};

    #[test]
    fn create_request_defaults_balance_and_owners() {
        let request: CreateWalletRequest = serde_json::from_str(r#"{"name":"Savings"}"#).unwrap();
        assert_eq!(request.balance, None);
        assert!(request.owner_ids.is_empty());
    }

    #[test]
    fn update_request_defaults_to_no_changes() {
        let request: UpdateWalletRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, UpdateWalletRequest::default());
    }
}
