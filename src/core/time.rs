//! Monotonic time points.
//!
//! The engine never reads a clock itself. Every entry point receives `now`
//! from the host as milliseconds on a monotonic timeline, which keeps every
//! cooldown and budget comparison deterministic.

use serde::{Deserialize, Serialize};

/// A point on the host's monotonic millisecond timeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimePoint(pub u64);

impl TimePoint {
    /// The zero point. Also used as "never" for next-allowed stamps.
    pub const ZERO: TimePoint = TimePoint(0);

    /// Create a time point from milliseconds.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Raw milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// `self + ms`, saturating.
    #[must_use]
    pub const fn after(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Milliseconds elapsed since `earlier`, or `None` if `earlier` is in the future.
    #[must_use]
    pub const fn since(self, earlier: TimePoint) -> Option<u64> {
        if self.0 >= earlier.0 {
            Some(self.0 - earlier.0)
        } else {
            None
        }
    }

    /// True if `earlier` happened no more than `window_ms` ago (and not in the future).
    #[must_use]
    pub const fn within(self, earlier: TimePoint, window_ms: u64) -> bool {
        match self.since(earlier) {
            Some(elapsed) => elapsed <= window_ms,
            None => false,
        }
    }
}

impl std::fmt::Display for TimePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
