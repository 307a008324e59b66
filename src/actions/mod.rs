//! Action executors.
//!
//! Executors turn a proc into side effects on the host. They run after every
//! gate has passed, so they never roll chances or touch cooldowns; they only
//! validate the data they need and report what happened.
//!
//! ## Key Features
//!
//! - **Casts**: plain, adaptive-element, evolution-scaled, mode-cycled
//! - **Corpse explosions**: shared budget with chain falloff and closest-N targeting
//! - **Traps**: spawn qualification and placement (the poll loop lives in [`crate::traps`])
//!
//! Missing data (no spell, no target, zero damage) is a silent skip logged
//! at debug level.

pub mod magnitude;
pub mod cast;
pub mod corpse;
pub mod trap;

#[cfg(test)]
pub(crate) mod test_host;

pub use magnitude::{scaled_magnitude, select_adaptive_element};
pub use cast::{execute_adaptive_element, execute_cast_spell};
pub use corpse::{
    chained_damage, explosion_targets, CorpseDenial, CorpseExplosionBudget, CORPSE_DEDUPE_TTL_MS,
    CORPSE_EXPLOSION_HARD_CAP,
};
pub use trap::execute_spawn_trap;

use crate::core::{ActorId, TimePoint};
use crate::host::{HitData, Host};

/// Everything an executor may read or affect.
pub struct ActionContext<'a> {
    pub host: &'a mut dyn Host,
    /// Affix owner (always the player side).
    pub owner: ActorId,
    /// Trigger target, `ActorId::NONE` if the trigger had none.
    pub target: ActorId,
    pub hit: Option<&'a HitData>,
    pub now: TimePoint,
}

impl<'a> ActionContext<'a> {
    /// Create a context.
    pub fn new(
        host: &'a mut dyn Host,
        owner: ActorId,
        target: ActorId,
        hit: Option<&'a HitData>,
        now: TimePoint,
    ) -> Self {
        Self {
            host,
            owner,
            target,
            hit,
            now,
        }
    }
}

/// Result of running an executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Side effects were produced.
    Executed,
    /// Nothing happened, with a short reason.
    Skipped(&'static str),
}

impl ExecOutcome {
    /// True if the executor produced side effects.
    #[must_use]
    pub fn executed(self) -> bool {
        self == ExecOutcome::Executed
    }
}
