//! # affix-engine
//!
//! A runtime affix/proc engine for combat-event pipelines.
//!
//! Items carry up to four affixes. Each affix listens for a combat trigger
//! (a hit landed, a hit taken, a kill, a damage-over-time application, a
//! health threshold) and, when its gates pass, runs an action: cast a
//! spell, pick the element the target resists least, explode a corpse,
//! place a trap. The host game feeds events in and receives casts, damage
//! adjustments and passive-spell changes back through the [`Host`] trait.
//!
//! ## Design Principles
//!
//! 1. **Host-Driven Time**: Every entry point takes a `now` argument. The
//!    engine never reads a clock, so tests replay exact timelines.
//!
//! 2. **Bounded Everything**: Cooldown stores, duplicate filters, refresh
//!    maps and trap lists are all capped or pruned. A long session cannot
//!    grow memory without bound.
//!
//! 3. **One Writer**: All mutable state lives in [`Engine`]. Hosts serialize
//!    calls into it from their simulation thread.
//!
//! ## Architecture
//!
//! - **Index-Addressed Table**: Definitions are registered once into an
//!   [`AffixTable`]; per-affix state is kept in parallel arrays indexed by
//!   [`AffixIndex`](crate::affixes::AffixIndex).
//!
//! - **Persistent Maps**: Instance slots and runeword progress use `im-rs`
//!   so save snapshots are O(1) clones.
//!
//! - **Deterministic RNG**: One seeded ChaCha stream drives every roll.
//!
//! ## Modules
//!
//! - `core`: IDs, time, RNG, settings, errors
//! - `limits`: cooldown stores, budgets, duplicate filters, log throttle
//! - `affixes`: definitions, triggers, actions, the table and item slots
//! - `state`: equipment-derived counts, per-instance runtime, save data
//! - `host`: the game-facing trait and hit snapshots
//! - `actions`: action executors
//! - `traps`: live trap bookkeeping
//! - `runeword`: rune recipes and insertion progress
//! - `loot`: loot-time affix rolling
//! - `engine`: the event pipeline tying everything together

pub mod core;
pub mod limits;
pub mod affixes;
pub mod state;
pub mod host;
pub mod actions;
pub mod traps;
pub mod runeword;
pub mod loot;
pub mod engine;

// Re-export commonly used types
pub use crate::core::{
    ActorId, AffixToken, FormId, InstanceKey, SpellId,
    TimePoint, ProcRng,
    DebugVerbosity, EngineSettings, LootSettings,
    ConfigError, CraftError, PersistError, SlotError,
};

pub use crate::affixes::{
    ActionSpec, AffixDefinition, AffixSlot, AffixTable, InstanceAffixSlots,
    LoadReport, LootType, Trigger,
};

pub use crate::host::{ActorVitals, CastRequest, EquippedInstance, HitData, Host, Position, Resistances};

pub use crate::runeword::{RuneInsert, RunewordRecipe};

pub use crate::state::SaveData;

pub use crate::engine::{ActiveAffixSummary, Engine, PollScheduler, PollTask};
