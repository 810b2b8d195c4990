//! CLI smoke entry point.
//!
//! # Responsibility
//! - Bootstrap `purse_core` from `PURSE_*` environment settings.
//! - Run one create/lookup round trip and print stable `key=value` lines.
//!
//! Exits non-zero when bootstrap or the round trip fails.

use log::error;
use purse_core::{
    bootstrap, core_version, CoreConfig, CreateUserRequest, CreateWalletRequest, ServiceError,
    SqliteUserRepository, SqliteWalletRepository, UserService, WalletService,
};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() -> ExitCode {
    println!("purse_core version={}", core_version());

    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("purse: {err}");
            return ExitCode::from(2);
        }
    };
    let gateway = match bootstrap(&config) {
        Ok(gateway) => gateway,
        Err(err) => {
            eprintln!("purse: {err}");
            return ExitCode::from(2);
        }
    };

    let users = UserService::new(SqliteUserRepository::new(&gateway));
    let wallets = WalletService::new(
        SqliteWalletRepository::new(&gateway),
        SqliteUserRepository::new(&gateway),
    );
    match smoke(&users, &wallets, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_smoke module=cli status=error error_code={}", err.kind());
            eprintln!("purse: {err}");
            ExitCode::FAILURE
        }
    }
}

fn smoke(
    users: &UserService<SqliteUserRepository<'_>>,
    wallets: &WalletService<SqliteWalletRepository<'_>, SqliteUserRepository<'_>>,
    config: &CoreConfig,
) -> Result<(), ServiceError> {
    let budget = config.request_budget();
    // Distinct per run so a file-backed database accepts repeated runs.
    let run_id = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());

    let user = users.create_user(
        &CreateUserRequest {
            first_name: "Smoke".to_string(),
            last_name: "Check".to_string(),
            email: format!("smoke-{run_id}@purse.local"),
            password: "smoke-check-password".to_string(),
        },
        budget,
    )?;
    let loaded = users.get_user_by_id(&user.id.to_string(), budget)?;
    println!("user_id={} roundtrip={}", loaded.id, loaded == user);

    let wallet = wallets.create_wallet(
        &CreateWalletRequest {
            name: format!("smoke-{run_id}"),
            balance: Some("0".to_string()),
            owner_ids: vec![user.id.to_string()],
        },
        budget,
    )?;
    println!("wallet_id={} balance={}", wallet.id, wallet.balance);
    Ok(())
}
