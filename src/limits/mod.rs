//! Rate-limiter primitives.
//!
//! Pure data structures mapping a key to a next-allowed time, plus the small
//! guard functions the trigger engine composes:
//!
//! - [`PerTargetCooldownStore`]: `(token, target)` cooldowns
//! - [`NonHostileFirstHitGate`]: one-shot allowance for non-hostile targets
//! - [`FixedWindowBudget`]: N events per time window
//! - [`resolve_trigger_proc_cooldown_ms`], [`should_suppress_duplicate_hit_window`]
//!
//! None of these ever block; every check is a comparison against a stored
//! timestamp.

pub mod per_target;
pub mod first_hit;
pub mod window;
pub mod guards;

pub use per_target::PerTargetCooldownStore;
pub use first_hit::NonHostileFirstHitGate;
pub use window::{try_consume_fixed_window_budget, FixedWindowBudget};
pub use guards::{
    resolve_trigger_proc_cooldown_ms, should_suppress_duplicate_hit_window,
    DuplicateHitFilter, DuplicateHitKey, LogThrottle, ResyncScheduler,
};
