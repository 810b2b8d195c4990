//! Core use-case services.
//!
//! # Responsibility
//! - Validate caller input and orchestrate repository calls.
//! - Translate storage outcomes into the domain error taxonomy.
//! - Keep boundary adapters decoupled from storage details.
//!
//! # Invariants
//! - Every operation takes a time budget and fails with `Timeout` once it
//!   is spent.
//! - Log events carry identifiers and outcomes only, never user content.

pub mod conditions;
pub mod error;
pub mod user_service;
pub mod validation;
pub mod wallet_service;

use error::{ErrorKind, ServiceResult};
use log::{error, info, warn};
use std::time::Instant;

/// Runs one service operation and logs its outcome.
pub(crate) fn observed<T>(
    event: &'static str,
    op: impl FnOnce() -> ServiceResult<T>,
) -> ServiceResult<T> {
    let started_at = Instant::now();
    let result = op();
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event={event} module=service status=ok duration_ms={duration_ms}"),
        Err(err) => match err.kind() {
            ErrorKind::StorageFailure | ErrorKind::Timeout => error!(
                "event={event} module=service status=error error_code={} duration_ms={duration_ms}",
                err.kind()
            ),
            kind => warn!(
                "event={event} module=service status=rejected error_code={kind} duration_ms={duration_ms}"
            ),
        },
    }
    result
}
