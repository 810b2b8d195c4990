//! User use-case service.
//!
//! # Responsibility
//! - Validate and normalize user input before it reaches storage.
//! - Hash credentials; only `UserView` projections leave this module.
//!
//! # Invariants
//! - Email uniqueness among active users is decided by storage, so two
//!   concurrent creates with the same email yield one success and one
//!   `AlreadyExists`.
//! - Deleting an already soft-deleted user succeeds and keeps the first
//!   deletion timestamp.

use super::conditions::{user_conditions, SearchConditions};
use super::error::{EntityKind, ServiceError, ServiceResult};
use super::observed;
use super::validation::{check_password, normalize_email, parse_lookup_id, required_text};
use crate::deadline::Deadline;
use crate::model::credential::{CredentialHasher, PasswordHash};
use crate::model::now_epoch_ms;
use crate::model::user::{User, UserView};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

/// Input for `UserService::create_user`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl Debug for CreateUserRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Partial update; `None` fields keep their stored value.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateUserRequest {
    fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.password.is_none()
    }
}

impl Debug for UpdateUserRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateUserRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Use-case service for user accounts.
pub struct UserService<R: UserRepository> {
    repo: R,
    hasher: CredentialHasher,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service with production hashing cost.
    pub fn new(repo: R) -> Self {
        Self::with_hasher(repo, CredentialHasher::default())
    }

    pub fn with_hasher(repo: R, hasher: CredentialHasher) -> Self {
        Self { repo, hasher }
    }

    /// Validates, hashes and stores a new active user.
    ///
    /// # Errors
    /// - `InvalidArgument` for blank names, malformed email or short password.
    /// - `AlreadyExists { field: "email" }` when an active user holds the email.
    pub fn create_user(
        &self,
        request: &CreateUserRequest,
        budget: Duration,
    ) -> ServiceResult<UserView> {
        observed("user_create", || {
            let deadline = Deadline::after(budget);
            let first_name = required_text("first_name", &request.first_name)?;
            let last_name = required_text("last_name", &request.last_name)?;
            let email = normalize_email(&request.email)?;
            check_password(&request.password)?;

            let password_hash = self.hash_password(&request.password)?;
            let user = User::new(first_name, last_name, email, password_hash);
            self.repo
                .create_user(&deadline, &user)
                .map_err(|err| ServiceError::from_repo(err, EntityKind::User, &deadline))?;
            Ok(UserView::from(&user))
        })
    }

    /// Returns users matching every condition; `email` is mandatory.
    pub fn search_users(
        &self,
        conditions: &SearchConditions,
        budget: Duration,
    ) -> ServiceResult<Vec<UserView>> {
        observed("user_search", || {
            let deadline = Deadline::after(budget);
            let conditions = user_conditions(conditions)?;
            let users = self
                .repo
                .search_users(&deadline, &conditions)
                .map_err(|err| ServiceError::from_repo(err, EntityKind::User, &deadline))?;
            Ok(users.iter().map(UserView::from).collect())
        })
    }

    /// Loads one active user.
    ///
    /// IDs that cannot name a stored user report `NotFound`, same as a
    /// missing or soft-deleted one.
    pub fn get_user_by_id(&self, id: &str, budget: Duration) -> ServiceResult<UserView> {
        observed("user_get", || {
            let deadline = Deadline::after(budget);
            let user = self.load_user(&deadline, id, false)?;
            Ok(UserView::from(&user))
        })
    }

    /// Applies a partial update to an active user.
    pub fn update_user(
        &self,
        id: &str,
        request: &UpdateUserRequest,
        budget: Duration,
    ) -> ServiceResult<UserView> {
        observed("user_update", || {
            let deadline = Deadline::after(budget);
            if request.is_empty() {
                return Err(ServiceError::invalid("request", "no fields to update"));
            }
            let first_name = request
                .first_name
                .as_deref()
                .map(|value| required_text("first_name", value))
                .transpose()?;
            let last_name = request
                .last_name
                .as_deref()
                .map(|value| required_text("last_name", value))
                .transpose()?;
            let email = request.email.as_deref().map(normalize_email).transpose()?;
            if let Some(password) = request.password.as_deref() {
                check_password(password)?;
            }

            let mut user = self.load_user(&deadline, id, false)?;
            if let Some(first_name) = first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = last_name {
                user.last_name = last_name;
            }
            if let Some(email) = email {
                user.email = email;
            }
            if let Some(password) = request.password.as_deref() {
                user.password_hash = self.hash_password(password)?;
            }
            user.touch();

            self.repo
                .update_user(&deadline, &user)
                .map_err(|err| ServiceError::from_repo(err, EntityKind::User, &deadline))?;
            Ok(UserView::from(&user))
        })
    }

    /// Soft-deletes a user. Repeating the call is a successful no-op.
    pub fn delete_user(&self, id: &str, budget: Duration) -> ServiceResult<()> {
        observed("user_delete", || {
            let deadline = Deadline::after(budget);
            let user = self.load_user(&deadline, id, true)?;
            if !user.is_active() {
                return Ok(());
            }
            self.repo
                .soft_delete_user(&deadline, user.id, now_epoch_ms())
                .map_err(|err| ServiceError::from_repo(err, EntityKind::User, &deadline))
        })
    }

    /// Checks a password against the stored credential of an active user.
    pub fn verify_password(&self, id: &str, password: &str, budget: Duration) -> ServiceResult<bool> {
        observed("user_verify_password", || {
            let deadline = Deadline::after(budget);
            let user = self.load_user(&deadline, id, false)?;
            self.hasher
                .verify(password, &user.password_hash)
                .map_err(|err| ServiceError::StorageFailure(RepoError::InvalidData(err.to_string())))
        })
    }

    fn load_user(&self, deadline: &Deadline, id: &str, include_deleted: bool) -> ServiceResult<User> {
        let Some(user_id) = parse_lookup_id("id", id)? else {
            return Err(ServiceError::not_found(EntityKind::User, id.trim()));
        };
        self.repo
            .find_user(deadline, user_id, include_deleted)
            .map_err(|err| ServiceError::from_repo(err, EntityKind::User, deadline))?
            .ok_or_else(|| ServiceError::not_found(EntityKind::User, user_id.to_string()))
    }

    fn hash_password(&self, password: &str) -> ServiceResult<PasswordHash> {
        self.hasher
            .hash(password)
            .map_err(|err| ServiceError::invalid("password", err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{CreateUserRequest, UpdateUserRequest};

    #[test]
    fn request_debug_output_hides_password() {
        let request = CreateUserRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
        };
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("correct horse"));
        assert!(rendered.contains("<redacted>"));

        let update = UpdateUserRequest {
            password: Some("battery staple".to_string()),
            ..UpdateUserRequest::default()
        };
        assert!(!format!("{update:?}").contains("battery staple"));
    }

    #[test]
    fn update_request_deserializes_with_missing_fields() {
        let update: UpdateUserRequest =
            serde_json::from_str(r#"{"last_name":"Byron"}"#).unwrap();
        assert_eq!(update.last_name.as_deref(), Some("Byron"));
        assert!(update.first_name.is_none());
    }
}
