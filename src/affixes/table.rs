//! The affix table.
//!
//! The table stores validated definitions in registration order and keeps
//! one index list per dispatch path, so an event only visits the affixes
//! that can react to it. Indices are derived data: a reload builds a fresh
//! table and the engine swaps it in whole.
//!
//! ```
//! use affix_engine::affixes::{AffixDefinition, AffixTable, ActionSpec, CastSpellSpec, Trigger};
//! use affix_engine::core::SpellId;
//!
//! let mut table = AffixTable::new();
//! let idx = table
//!     .register(
//!         AffixDefinition::new("spark_on_hit")
//!             .on(Trigger::Hit)
//!             .with_action(ActionSpec::CastSpell(CastSpellSpec {
//!                 spell: SpellId::new(0x800),
//!                 ..Default::default()
//!             })),
//!     )
//!     .unwrap();
//!
//! assert_eq!(table.trigger_indices(Trigger::Hit), &[idx]);
//! assert_eq!(table.by_id("spark_on_hit"), Some(idx));
//! ```

use std::ops::{Index, IndexMut};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::core::{AffixToken, ConfigError, SpellId};

use super::action::ActionKind;
use super::definition::{AffixDefinition, Trigger};

/// Position of an affix in its table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AffixIndex(u32);

impl AffixIndex {
    /// Raw position.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    fn from_usize(i: usize) -> Self {
        Self(i as u32)
    }
}

/// A value per affix, index-aligned with an [`AffixTable`].
///
/// Only [`AffixIndex`] can index it, which keeps raw integers from other
/// tables out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AffixVec<T> {
    data: Vec<T>,
}

impl<T: Clone> AffixVec<T> {
    /// `len` copies of `value`.
    #[must_use]
    pub fn filled(len: usize, value: T) -> Self {
        Self {
            data: vec![value; len],
        }
    }

    /// Reset every slot to `value` and resize to `len`.
    pub fn reset(&mut self, len: usize, value: T) {
        self.data.clear();
        self.data.resize(len, value);
    }

    /// Grow to `len`, filling new slots with `value`.
    pub fn grow_to(&mut self, len: usize, value: T) {
        if self.data.len() < len {
            self.data.resize(len, value);
        }
    }
}

impl<T> AffixVec<T> {
    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if there are no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Slot for `idx`, if in range.
    #[must_use]
    pub fn get(&self, idx: AffixIndex) -> Option<&T> {
        self.data.get(idx.get())
    }

    /// Iterate `(index, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (AffixIndex, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (AffixIndex::from_usize(i), v))
    }
}

impl<T> Index<AffixIndex> for AffixVec<T> {
    type Output = T;

    fn index(&self, idx: AffixIndex) -> &T {
        &self.data[idx.get()]
    }
}

impl<T> IndexMut<AffixIndex> for AffixVec<T> {
    fn index_mut(&mut self, idx: AffixIndex) -> &mut T {
        &mut self.data[idx.get()]
    }
}

/// Outcome of building a table from a definition list.
#[derive(Clone, Debug, Default)]
pub struct LoadReport {
    /// Number of definitions registered.
    pub loaded: usize,
    /// Number of runeword recipes compiled.
    pub runewords: usize,
    /// Definitions and recipes that were skipped.
    pub errors: Vec<ConfigError>,
}

impl LoadReport {
    /// True if every definition loaded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validated affix definitions plus dispatch indices.
#[derive(Clone, Debug, Default)]
pub struct AffixTable {
    affixes: Vec<AffixDefinition>,

    by_id: FxHashMap<String, AffixIndex>,
    by_token: FxHashMap<AffixToken, AffixIndex>,

    hit: Vec<AffixIndex>,
    incoming_hit: Vec<AffixIndex>,
    dot_apply: Vec<AffixIndex>,
    kill: Vec<AffixIndex>,
    low_health: Vec<AffixIndex>,

    cast_on_crit: Vec<AffixIndex>,
    convert: Vec<AffixIndex>,
    mind_over_matter: Vec<AffixIndex>,
    archmage: Vec<AffixIndex>,
    corpse_explosion: Vec<AffixIndex>,
    summon_corpse_explosion: Vec<AffixIndex>,

    /// Every spell some action may cast.
    proc_spells: FxHashSet<SpellId>,
}

impl AffixTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, skipping (and logging) every invalid definition.
    pub fn from_definitions(definitions: impl IntoIterator<Item = AffixDefinition>) -> (Self, LoadReport) {
        let mut table = Self::new();
        let mut report = LoadReport::default();

        for def in definitions {
            match table.register(def) {
                Ok(_) => report.loaded += 1,
                Err(err) => {
                    warn!(error = %err, "skipping affix definition");
                    report.errors.push(err);
                }
            }
        }

        (table, report)
    }

    /// Validate and append a definition.
    ///
    /// The token is always re-derived from the id.
    pub fn register(&mut self, mut def: AffixDefinition) -> Result<AffixIndex, ConfigError> {
        def.validate()?;
        def.token = AffixToken::from_id(&def.id);

        if self.by_id.contains_key(&def.id) {
            return Err(ConfigError::DuplicateId(def.id));
        }
        if let Some(&existing) = self.by_token.get(&def.token) {
            return Err(ConfigError::TokenCollision {
                id: def.id,
                existing: self.affixes[existing.get()].id.clone(),
                token: def.token,
            });
        }

        let idx = AffixIndex::from_usize(self.affixes.len());
        self.by_id.insert(def.id.clone(), idx);
        self.by_token.insert(def.token, idx);

        if let Some(action) = &def.action {
            self.proc_spells.extend(action.spells());

            match action.kind() {
                ActionKind::CastOnCrit => self.cast_on_crit.push(idx),
                ActionKind::ConvertDamage => self.convert.push(idx),
                ActionKind::MindOverMatter => self.mind_over_matter.push(idx),
                ActionKind::Archmage => self.archmage.push(idx),
                ActionKind::CorpseExplosion => self.corpse_explosion.push(idx),
                ActionKind::SummonCorpseExplosion => self.summon_corpse_explosion.push(idx),
                ActionKind::DebugNotify
                | ActionKind::CastSpell
                | ActionKind::CastSpellAdaptiveElement
                | ActionKind::SpawnTrap => {
                    if let Some(trigger) = def.trigger {
                        self.trigger_list_mut(trigger).push(idx);
                    }
                }
            }
        }

        self.affixes.push(def);
        Ok(idx)
    }

    fn trigger_list_mut(&mut self, trigger: Trigger) -> &mut Vec<AffixIndex> {
        match trigger {
            Trigger::Hit => &mut self.hit,
            Trigger::IncomingHit => &mut self.incoming_hit,
            Trigger::DotApply => &mut self.dot_apply,
            Trigger::Kill => &mut self.kill,
            Trigger::LowHealth => &mut self.low_health,
        }
    }

    /// Candidates for a trigger kind, in registration order.
    #[must_use]
    pub fn trigger_indices(&self, trigger: Trigger) -> &[AffixIndex] {
        match trigger {
            Trigger::Hit => &self.hit,
            Trigger::IncomingHit => &self.incoming_hit,
            Trigger::DotApply => &self.dot_apply,
            Trigger::Kill => &self.kill,
            Trigger::LowHealth => &self.low_health,
        }
    }

    /// Candidates for a special action kind, in registration order.
    ///
    /// Triggered action kinds return an empty slice.
    #[must_use]
    pub fn special_indices(&self, kind: ActionKind) -> &[AffixIndex] {
        match kind {
            ActionKind::CastOnCrit => &self.cast_on_crit,
            ActionKind::ConvertDamage => &self.convert,
            ActionKind::MindOverMatter => &self.mind_over_matter,
            ActionKind::Archmage => &self.archmage,
            ActionKind::CorpseExplosion => &self.corpse_explosion,
            ActionKind::SummonCorpseExplosion => &self.summon_corpse_explosion,
            ActionKind::DebugNotify
            | ActionKind::CastSpell
            | ActionKind::CastSpellAdaptiveElement
            | ActionKind::SpawnTrap => &[],
        }
    }

    /// Definition at `idx`.
    #[must_use]
    pub fn get(&self, idx: AffixIndex) -> Option<&AffixDefinition> {
        self.affixes.get(idx.get())
    }

    /// Look up by string id.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<AffixIndex> {
        self.by_id.get(id).copied()
    }

    /// Look up by token.
    #[must_use]
    pub fn by_token(&self, token: AffixToken) -> Option<AffixIndex> {
        self.by_token.get(&token).copied()
    }

    /// True if `spell` is cast by some affix action.
    #[must_use]
    pub fn is_proc_spell(&self, spell: SpellId) -> bool {
        self.proc_spells.contains(&spell)
    }

    /// Number of registered affixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.affixes.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.affixes.is_empty()
    }

    /// Iterate `(index, definition)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (AffixIndex, &AffixDefinition)> {
        self.affixes
            .iter()
            .enumerate()
            .map(|(i, def)| (AffixIndex::from_usize(i), def))
    }
}

impl Index<AffixIndex> for AffixTable {
    type Output = AffixDefinition;

    fn index(&self, idx: AffixIndex) -> &AffixDefinition {
        &self.affixes[idx.get()]
    }
}
