//! Domain model for users, wallets and their association.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep storage-independent value types (balance, credential, deletion).
//!
//! # Invariants
//! - Every entity is identified by a stable, time-ordered UUID.
//! - Deletion is represented by a soft-delete marker, not hard delete.
//! - Balances are fixed-point; no floating point anywhere.

pub mod balance;
pub mod credential;
pub mod deletion;
pub mod user;
pub mod wallet;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
