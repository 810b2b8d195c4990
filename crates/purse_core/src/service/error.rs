//! Domain error taxonomy returned by every service operation.
//!
//! # Invariants
//! - Each error has a stable machine-readable `ErrorKind` and a
//!   human-readable `Display` message.
//! - Repository errors are classified here and nowhere else.

use crate::deadline::Deadline;
use crate::repo::RepoError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Stable error code for boundary adapters to map onto transport statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    StorageFailure,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::StorageFailure => "storage_failure",
            Self::Timeout => "timeout",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Wallet,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Wallet => f.write_str("wallet"),
        }
    }
}

#[derive(Debug)]
pub enum ServiceError {
    /// Malformed or missing input, detected before touching storage.
    InvalidArgument { field: String, message: String },
    /// Entity absent, soft-deleted, or addressed by an ID that cannot exist.
    NotFound { entity: EntityKind, id: String },
    /// A uniqueness rule rejected the write; `field` names the column.
    AlreadyExists { entity: EntityKind, field: String },
    StorageFailure(RepoError),
    Timeout { budget: Duration },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::StorageFailure(_) => ErrorKind::StorageFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Classifies a repository failure for an operation on `entity`.
    pub(crate) fn from_repo(err: RepoError, entity: EntityKind, deadline: &Deadline) -> Self {
        match err {
            RepoError::ConstraintViolation { columns, .. } => Self::AlreadyExists {
                entity,
                field: columns.join(","),
            },
            RepoError::NotFound(id) => Self::not_found(entity, id.to_string()),
            RepoError::DeadlineExceeded => Self::Timeout {
                budget: deadline.budget(),
            },
            other => Self::StorageFailure(other),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument { field, message } => {
                write!(f, "invalid argument `{field}`: {message}")
            }
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::AlreadyExists { entity, field } => {
                write!(f, "an active {entity} with this {field} already exists")
            }
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
            Self::Timeout { budget } => {
                write!(f, "operation exceeded its {} ms budget", budget.as_millis())
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure(err) => Some(err),
            _ => None,
        }
    }
}
