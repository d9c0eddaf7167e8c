use std::time::{Duration, Instant};

/// Point in time by which an adapter call must complete.
///
/// Adapters check it before doing work and bound their own I/O timeouts by
/// [`Deadline::remaining`]. An unbounded deadline never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { at: None }
    }

    /// A deadline `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
        }
    }

    /// A deadline at a fixed instant.
    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    /// Time left, `None` when unbounded. Saturates at zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Returns `true` once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// The smaller of the remaining time and `cap`.
    #[must_use]
    pub fn bounded_by(&self, cap: Duration) -> Duration {
        self.remaining().map_or(cap, |left| left.min(cap))
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}
