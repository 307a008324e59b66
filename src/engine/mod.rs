//! The affix engine.
//!
//! [`Engine`] owns every piece of mutable state: the loaded affix table,
//! cooldowns, per-target and global limiters, equipment-derived counts,
//! per-instance progression, runeword progress and live traps. The host
//! feeds it game events and it answers with casts, damage adjustments and
//! passive-spell changes through the [`Host`](crate::host::Host) trait.
//!
//! ## Key Features
//!
//! - **Event entry points**: damage-apply, hit fallback, death, equip,
//!   DoT apply, container change and a periodic tick
//! - **Proc pipeline**: active check, cooldowns, recently gates, lucky hit,
//!   chance roll, trigger budget, commit, execute
//! - **Special paths**: damage conversion, mind over matter, archmage,
//!   cast-on-crit rotation, corpse explosions
//! - **Re-entrancy**: actions run under a [`ProcDepth`] guard so proc spells
//!   never trigger further procs
//! - **Lifecycle**: config load, runtime registration, resync, save/load,
//!   revert, shutdown
//!
//! All timing comes from the `now` argument; the engine never reads a
//! clock. All randomness comes from one seeded [`ProcRng`].
//!
//! ## Example
//!
//! ```
//! use affix_engine::affixes::{ActionSpec, AffixDefinition, Trigger};
//! use affix_engine::core::{EngineSettings, TimePoint};
//! use affix_engine::engine::Engine;
//!
//! let mut engine = Engine::new(EngineSettings::default(), 7);
//! let report = engine.load_config(
//!     vec![AffixDefinition::new("hello")
//!         .on(Trigger::Hit)
//!         .with_action(ActionSpec::DebugNotify { message: "hello".into() })],
//!     vec![],
//! );
//! assert!(report.is_clean());
//! assert!(engine.is_config_loaded());
//! assert_eq!(engine.trap_count(), 0);
//! # let _ = TimePoint::ZERO;
//! ```

pub mod depth;
pub mod router;
pub mod poll;
mod lifecycle;
mod trigger;
mod special;
mod corpse;
mod events;
mod crafting;

pub use depth::{ProcDepth, ProcDepthGuard};
pub use router::{hit_signature, HealthDamageRouter, RouteRejection};
pub use poll::{PollScheduler, PollTask};
pub use lifecycle::ActiveAffixSummary;

use std::sync::Arc;

use im::HashMap as ImHashMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::actions::CorpseExplosionBudget;
use crate::affixes::{AffixTable, AffixVec, InstanceAffixSlots};
use crate::core::{ActorId, AffixToken, EngineSettings, FormId, InstanceKey, ProcRng, TimePoint};
use crate::limits::{
    DuplicateHitFilter, FixedWindowBudget, LogThrottle, NonHostileFirstHitGate, PerTargetCooldownStore,
    ResyncScheduler,
};
use crate::runeword::{RunewordCatalog, RunewordProgress};
use crate::state::{ActiveState, RuntimeStates};
use crate::traps::TrapSystem;

/// Timestamps feeding the "recently" gates of one actor.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RecentActivity {
    pub(crate) last_hit: Option<TimePoint>,
    pub(crate) last_kill: Option<TimePoint>,
    pub(crate) last_hit_taken: Option<TimePoint>,
}

/// Affix trigger engine.
///
/// One engine serves one player. It is not `Send`: the host drives it from
/// its game thread and may run background polling through a
/// [`PollScheduler`].
#[derive(Debug)]
pub struct Engine {
    settings: EngineSettings,

    // Config
    table: Arc<AffixTable>,
    config_loaded: bool,
    runewords: RunewordCatalog,

    // Per-affix arrays, index-aligned with `table`
    next_allowed: AffixVec<TimePoint>,
    low_health_armed: AffixVec<bool>,

    // Equipment and persisted state
    active: ActiveState,
    equipped: Vec<(InstanceKey, SmallVec<[AffixToken; 4]>)>,
    runtime: RuntimeStates,
    instance_slots: ImHashMap<InstanceKey, InstanceAffixSlots>,
    runeword_progress: ImHashMap<InstanceKey, RunewordProgress>,
    selected_runeword_base: Option<InstanceKey>,

    // Limiters and caches
    per_target: PerTargetCooldownStore,
    first_hit: NonHostileFirstHitGate,
    trigger_budget: FixedWindowBudget,
    outgoing_hits: DuplicateHitFilter,
    incoming_hits: DuplicateHitFilter,
    router: HealthDamageRouter,
    dot_refresh: FxHashMap<(ActorId, FormId), TimePoint>,
    recent: FxHashMap<ActorId, RecentActivity>,
    crit_cursor: usize,
    corpse_budget: CorpseExplosionBudget,
    resync: ResyncScheduler,
    log_throttle: LogThrottle,

    traps: TrapSystem,
    rng: ProcRng,
    proc_depth: ProcDepth,
}
