//! Runtime state owned by the engine.
//!
//! - [`ActiveState`]: equipment-derived counts, slot penalties and passives
//! - [`RuntimeStates`]: per-instance evolution XP and mode cycle
//! - [`SaveData`]: the persisted subset

pub mod active;
pub mod runtime;
pub mod persistence;

pub use active::{slot_penalty_for, ActiveState, PassiveReconcile, SLOT_PENALTY};
pub use runtime::{InstanceRuntimeState, RuntimeKey, RuntimeStates};
pub use persistence::{SaveData, SAVE_VERSION};
