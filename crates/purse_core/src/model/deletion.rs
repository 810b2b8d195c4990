//! Soft-delete marker shared by users and wallets.

use serde::{Deserialize, Serialize};

/// Lifecycle marker: `Active` until soft-deleted, then `Deleted` forever.
///
/// Stored as a nullable `deleted_at` column; the enum keeps "never deleted"
/// and "deleted at epoch zero" apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Deletion {
    #[default]
    Active,
    Deleted {
        /// Unix epoch milliseconds of the first soft delete.
        at_ms: i64,
    },
}

impl Deletion {
    pub fn from_column(deleted_at: Option<i64>) -> Self {
        match deleted_at {
            Some(at_ms) => Self::Deleted { at_ms },
            None => Self::Active,
        }
    }

    pub fn to_column(self) -> Option<i64> {
        self.deleted_at()
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn deleted_at(self) -> Option<i64> {
        match self {
            Self::Active => None,
            Self::Deleted { at_ms } => Some(at_ms),
        }
    }

    /// Marks as deleted at `at_ms` unless already deleted.
    ///
    /// The first deletion timestamp is kept so it never regresses.
    pub fn mark_deleted(&mut self, at_ms: i64) {
        if self.is_active() {
            *self = Self::Deleted { at_ms };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Deletion;

    #[test]
    fn deleted_at_zero_is_not_active() {
        let marker = Deletion::from_column(Some(0));
        assert!(!marker.is_active());
        assert_eq!(marker.deleted_at(), Some(0));
        assert_eq!(Deletion::from_column(None), Deletion::Active);
    }

    #[test]
    fn mark_deleted_keeps_first_timestamp() {
        let mut marker = Deletion::Active;
        marker.mark_deleted(100);
        marker.mark_deleted(50);
        marker.mark_deleted(200);
        assert_eq!(marker, Deletion::Deleted { at_ms: 100 });
    }
}
