//! Core engine types: identifiers, time, RNG, settings, errors.
//!
//! These are the leaf building blocks shared by every other module.

pub mod ids;
pub mod time;
pub mod rng;
pub mod config;
pub mod error;

pub use ids::{stable_hash, ActorId, AffixToken, Fnv1a, FormId, InstanceKey, SpellId};
pub use time::TimePoint;
pub use rng::ProcRng;
pub use config::{DebugVerbosity, EngineSettings, LootSettings};
pub use error::{ConfigError, CraftError, PersistError, SlotError};
