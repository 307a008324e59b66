//! Affix definitions, actions, the indexed affix table, and per-instance
//! affix slots.

pub mod action;
pub mod definition;
pub mod table;
pub mod slots;

pub use action::{
    ActionKind, ActionSpec, AdaptiveElementSpec, AdaptiveMode, ArchmageSpec, CastSpellSpec,
    CastTarget, ConvertDamageSpec, CorpseExplosionSpec, Element, ElementSpells, EvolutionSpec,
    EvolutionStage, MagnitudeScaling, MagnitudeSource, MindOverMatterSpec, ModeCycleSpec,
    SpawnTrapSpec, TrapAnchor,
};
pub use definition::{AffixDefinition, AffixSlot, LootMeta, LootType, LowHealthSpec, PassiveSpec, Trigger};
pub use table::{AffixIndex, AffixTable, AffixVec, LoadReport};
pub use slots::{InstanceAffixSlots, AFFIX_SLOT_CAPACITY};
