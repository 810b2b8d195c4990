//! Parsing of caller-supplied search conditions.
//!
//! Callers pass a field-name to value map. A `None` value is only
//! meaningful for `deleted`, where it means "not deleted".
//!
//! # Invariants
//! - Unknown field names are rejected, never ignored.
//! - Unless the caller names `deleted`, searches keep active rows only.

use super::error::{ServiceError, ServiceResult};
use super::validation::{normalize_email, required_text};
use crate::repo::user_repo::UserCondition;
use crate::repo::wallet_repo::WalletCondition;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Field name to value map; entries are ANDed.
pub type SearchConditions = BTreeMap<String, Option<String>>;

const DELETED_FIELD: &str = "deleted";

/// Builds repository conditions for a user search.
///
/// An `email` entry is mandatory.
pub(crate) fn user_conditions(raw: &SearchConditions) -> ServiceResult<Vec<UserCondition>> {
    if !raw.contains_key("email") {
        return Err(ServiceError::invalid("email", "email condition is required"));
    }

    let mut conditions = Vec::with_capacity(raw.len() + 1);
    for (field, value) in raw {
        let condition = match field.as_str() {
            "id" => UserCondition::Id(search_id(field, value)?),
            "first_name" => UserCondition::FirstName(required_text(field, present(field, value)?)?),
            "last_name" => UserCondition::LastName(required_text(field, present(field, value)?)?),
            "email" => UserCondition::Email(normalize_email(present(field, value)?)?),
            DELETED_FIELD => UserCondition::Deleted(deleted_flag(value)?),
            _ => return Err(unsupported(field)),
        };
        conditions.push(condition);
    }
    if !raw.contains_key(DELETED_FIELD) {
        conditions.push(UserCondition::Deleted(false));
    }
    Ok(conditions)
}

/// Builds repository conditions for a wallet search.
pub(crate) fn wallet_conditions(raw: &SearchConditions) -> ServiceResult<Vec<WalletCondition>> {
    let mut conditions = Vec::with_capacity(raw.len() + 1);
    for (field, value) in raw {
        let condition = match field.as_str() {
            "id" => WalletCondition::Id(search_id(field, value)?),
            "name" => WalletCondition::Name(required_text(field, present(field, value)?)?),
            "owner_id" => WalletCondition::OwnerId(search_id(field, value)?),
            DELETED_FIELD => WalletCondition::Deleted(deleted_flag(value)?),
            _ => return Err(unsupported(field)),
        };
        conditions.push(condition);
    }
    if !raw.contains_key(DELETED_FIELD) {
        conditions.push(WalletCondition::Deleted(false));
    }
    Ok(conditions)
}

fn present<'a>(field: &str, value: &'a Option<String>) -> ServiceResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| ServiceError::invalid(field, "null is only accepted for `deleted`"))
}

fn search_id(field: &str, value: &Option<String>) -> ServiceResult<Uuid> {
    let raw = present(field, value)?.trim();
    Uuid::parse_str(raw).map_err(|_| ServiceError::invalid(field, format!("`{raw}` is not a valid id")))
}

fn deleted_flag(value: &Option<String>) -> ServiceResult<bool> {
    match value.as_deref().map(str::trim) {
        None | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(other) => Err(ServiceError::invalid(
            DELETED_FIELD,
            format!("expected `true`, `false` or null, got `{other}`"),
        )),
    }
}

fn unsupported(field: &str) -> ServiceError {
    ServiceError::invalid(field, "unsupported search field")
}
