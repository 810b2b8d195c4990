//! Per-request time budgets.
//!
//! # Responsibility
//! - Turn a caller-supplied budget into an absolute expiry instant.
//! - Answer "how much time is left" for storage calls.
//!
//! # Invariants
//! - A deadline never moves once created.
//! - A zero budget is already expired.

use std::time::{Duration, Instant};

/// Absolute expiry for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    budget: Duration,
    expires_at: Instant,
}

impl Deadline {
    /// Starts the clock for `budget` from now.
    pub fn after(budget: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now.checked_add(budget).unwrap_or(now + Duration::from_secs(86_400));
        Self { budget, expires_at }
    }

    /// The budget this deadline was created with.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Time left before expiry, or `None` once expired.
    pub fn remaining(&self) -> Option<Duration> {
        let left = self.expires_at.saturating_duration_since(Instant::now());
        if left.is_zero() {
            None
        } else {
            Some(left)
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_none()
    }
}
