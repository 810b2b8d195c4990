//! Core persistence and domain logic for Purse users and wallets.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod deadline;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{bootstrap, BootstrapError, ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, StorageGateway};
pub use deadline::Deadline;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::balance::Balance;
pub use model::credential::CredentialHasher;
pub use model::user::{User, UserId, UserView};
pub use model::wallet::{Wallet, WalletId, WalletView};
pub use repo::user_repo::{SqliteUserRepository, UserCondition, UserRepository};
pub use repo::wallet_repo::{SqliteWalletRepository, WalletCondition, WalletRepository};
pub use repo::{RepoError, RepoResult};
pub use service::conditions::SearchConditions;
pub use service::error::{EntityKind, ErrorKind, ServiceError, ServiceResult};
pub use service::user_service::{CreateUserRequest, UpdateUserRequest, UserService};
pub use service::wallet_service::{CreateWalletRequest, UpdateWalletRequest, WalletService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
