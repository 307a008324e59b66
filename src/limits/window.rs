//! Fixed-window budgets.

use crate::core::TimePoint;

/// Consume one unit from a fixed-window budget.
///
/// A zero window or zero maximum means "unlimited". The window restarts at
/// `now` when it has expired or was never started.
pub fn try_consume_fixed_window_budget(
    now: TimePoint,
    window_ms: u64,
    max_per_window: u32,
    window_start: &mut Option<TimePoint>,
    consumed: &mut u32,
) -> bool {
    if window_ms == 0 || max_per_window == 0 {
        return true;
    }

    let expired = match *window_start {
        None => true,
        Some(start) => now.since(start).map_or(true, |elapsed| elapsed >= window_ms),
    };
    if expired {
        *window_start = Some(now);
        *consumed = 0;
    }

    if *consumed >= max_per_window {
        return false;
    }
    *consumed += 1;
    true
}

/// Owned fixed-window budget state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixedWindowBudget {
    window_start: Option<TimePoint>,
    consumed: u32,
}

impl FixedWindowBudget {
    /// Fresh budget.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one unit. See [`try_consume_fixed_window_budget`].
    pub fn try_consume(&mut self, now: TimePoint, window_ms: u64, max_per_window: u32) -> bool {
        try_consume_fixed_window_budget(
            now,
            window_ms,
            max_per_window,
            &mut self.window_start,
            &mut self.consumed,
        )
    }

    /// Units consumed in the current window.
    #[must_use]
    pub fn consumed(&self) -> u32 {
        self.consumed
    }

    /// Forget the current window.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
