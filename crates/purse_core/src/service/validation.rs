//! Input validation shared by user and wallet services.
//!
//! All checks here run before any storage access.

use super::error::{ServiceError, ServiceResult};
use crate::model::balance::Balance;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_TEXT_CHARS: usize = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("valid email regex")
});

/// Trimmed, non-blank text of at most 255 characters.
pub(crate) fn required_text(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid(field, "value is required"));
    }
    if trimmed.chars().count() > MAX_TEXT_CHARS {
        return Err(ServiceError::invalid(
            field,
            format!("value exceeds {MAX_TEXT_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Lowercased email after format check.
pub(crate) fn normalize_email(value: &str) -> ServiceResult<String> {
    let email = required_text("email", value)?.to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(ServiceError::invalid("email", "value is not a valid email address"));
    }
    Ok(email)
}

pub(crate) fn check_password(value: &str) -> ServiceResult<()> {
    if value.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ServiceError::invalid(
            "password",
            format!("must be at least {MIN_PASSWORD_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Non-negative decimal balance.
pub(crate) fn parse_balance(value: &str) -> ServiceResult<Balance> {
    let balance =
        Balance::parse(value).map_err(|err| ServiceError::invalid("balance", err.to_string()))?;
    if balance.is_negative() {
        return Err(ServiceError::invalid("balance", "must not be negative"));
    }
    Ok(balance)
}

/// Resolves an opaque lookup ID.
///
/// Blank input is an invalid argument. Anything else that cannot name a
/// stored row (unparseable text, the nil UUID, the legacy `0` sentinel)
/// yields `None`, which callers report as not found.
pub(crate) fn parse_lookup_id(field: &str, raw: &str) -> ServiceResult<Option<Uuid>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid(field, "id is required"));
    }
    Ok(Uuid::parse_str(trimmed).ok().filter(|id| !id.is_nil()))
}

#[cfg(test)]
mod tests {
    use super::{check_password, normalize_email, parse_balance, parse_lookup_id, required_text};
    use crate::service::error::ErrorKind;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for value in ["", "ada", "ada@", "@x.com", "ada@x", "a da@x.com", "ada@x..com"] {
            let err = normalize_email(value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "accepted `{value}`");
        }
    }

    #[test]
    fn password_length_counts_characters() {
        assert!(check_password("1234567").is_err());
        assert!(check_password("12345678").is_ok());
        assert!(check_password("пароль12").is_ok());
    }

    #[test]
    fn required_text_rejects_blank_and_overlong() {
        assert!(required_text("first_name", "   ").is_err());
        assert!(required_text("first_name", &"x".repeat(256)).is_err());
        assert_eq!(required_text("first_name", " Ada ").unwrap(), "Ada");
    }

    #[test]
    fn negative_balance_is_rejected() {
        assert!(parse_balance("-0.01").is_err());
        assert_eq!(parse_balance("0.01").unwrap().units(), 1_000_000);
    }

    #[test]
    fn sentinel_and_garbage_ids_resolve_to_none() {
        assert_eq!(parse_lookup_id("id", "0").unwrap(), None);
        assert_eq!(
            parse_lookup_id("id", "00000000-0000-0000-0000-000000000000").unwrap(),
            None
        );
        assert_eq!(parse_lookup_id("id", "not-an-id").unwrap(), None);
        assert!(parse_lookup_id("id", " ").is_err());
    }
}
