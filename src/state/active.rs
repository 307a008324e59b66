//! Active affix state.
//!
//! [`ActiveState`] answers "which affixes can proc right now" in O(1) per
//! affix. It is rebuilt wholesale from an equipment snapshot, never patched
//! incrementally, so it can be stale between rebuilds but never
//! inconsistent.
//!
//! ## Key Features
//!
//! - **Active counts**: equipped instances carrying each affix
//! - **Slot penalty**: best per-affix proc-chance multiplier from prefix stacking
//! - **Suffix payloads**: crit-damage bonus sum and desired passive spells
//! - **Passive reconcile**: set difference against the applied passives
//!
//! ```
//! use affix_engine::affixes::{AffixDefinition, AffixSlot, AffixTable, ActionSpec};
//! use affix_engine::core::{FormId, InstanceKey};
//! use affix_engine::state::{ActiveState, RuntimeStates};
//!
//! let mut table = AffixTable::new();
//! let def = AffixDefinition::new("noisy")
//!     .with_slot(AffixSlot::Prefix)
//!     .with_action(ActionSpec::DebugNotify { message: "hi".into() })
//!     .on(affix_engine::affixes::Trigger::Hit);
//! let idx = table.register(def).unwrap();
//! let token = table[idx].token;
//!
//! let key = InstanceKey::new(FormId::new(0x10), 1);
//! let mut active = ActiveState::new();
//! let mut runtime = RuntimeStates::new();
//! active.rebuild(&table, [(key, &[token][..])], &mut runtime);
//!
//! assert_eq!(active.count(idx), 1);
//! assert_eq!(active.slot_penalty(idx), 1.0);
//! ```

use std::collections::BTreeSet;

use smallvec::SmallVec;

use crate::affixes::{AffixIndex, AffixSlot, AffixTable, AffixVec};
use crate::core::{AffixToken, InstanceKey, SpellId};

use super::runtime::RuntimeStates;

/// Proc-chance multiplier by number of prefixes on one item (1, 2, 3+).
pub const SLOT_PENALTY: [f32; 3] = [1.0, 0.8, 0.65];

/// Penalty for an item carrying `prefix_count` prefixes.
#[must_use]
pub fn slot_penalty_for(prefix_count: usize) -> f32 {
    match prefix_count {
        0 => 1.0,
        n => SLOT_PENALTY[n.min(SLOT_PENALTY.len()) - 1],
    }
}

/// Passive spell changes produced by a rebuild.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassiveReconcile {
    pub add: Vec<SpellId>,
    pub remove: Vec<SpellId>,
}

impl PassiveReconcile {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Equipment-derived state, index-aligned with an [`AffixTable`].
#[derive(Clone, Debug, Default)]
pub struct ActiveState {
    counts: AffixVec<u32>,
    slot_penalty: AffixVec<f32>,
    instances_by_affix: AffixVec<SmallVec<[InstanceKey; 2]>>,
    crit_damage_bonus_pct: f32,
    desired_passives: BTreeSet<SpellId>,
    applied_passives: BTreeSet<SpellId>,
}

impl ActiveState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute everything from the equipped instances and reconcile
    /// passives.
    ///
    /// Each item is `(instance, tokens)`. Unknown tokens are ignored.
    /// Runtime state is registered for every `(instance, token)` seen.
    pub fn rebuild<'a>(
        &mut self,
        table: &AffixTable,
        equipped: impl IntoIterator<Item = (InstanceKey, &'a [AffixToken])>,
        runtime: &mut RuntimeStates,
    ) -> PassiveReconcile {
        self.recount(table, equipped, runtime);
        self.reconcile_passives()
    }

    /// Recompute counts, penalties and desired passives without touching the
    /// applied passive set.
    pub fn recount<'a>(
        &mut self,
        table: &AffixTable,
        equipped: impl IntoIterator<Item = (InstanceKey, &'a [AffixToken])>,
        runtime: &mut RuntimeStates,
    ) {
        let len = table.len();
        self.counts.reset(len, 0);
        self.slot_penalty.reset(len, 1.0);
        self.instances_by_affix.reset(len, SmallVec::new());
        self.crit_damage_bonus_pct = 0.0;
        self.desired_passives.clear();

        let mut best_penalty: AffixVec<Option<f32>> = AffixVec::filled(len, None);

        for (instance, tokens) in equipped {
            let resolved: SmallVec<[AffixIndex; 4]> =
                tokens.iter().filter_map(|&t| table.by_token(t)).collect();
            let prefixes = resolved
                .iter()
                .filter(|&&idx| table[idx].slot == AffixSlot::Prefix)
                .count();
            let prefix_penalty = slot_penalty_for(prefixes);

            for &idx in &resolved {
                let def = &table[idx];
                self.counts[idx] += 1;
                if !self.instances_by_affix[idx].contains(&instance) {
                    self.instances_by_affix[idx].push(instance);
                }
                runtime.ensure(instance, def.token);

                let penalty = if def.slot == AffixSlot::Prefix {
                    prefix_penalty
                } else {
                    1.0
                };
                let best = &mut best_penalty[idx];
                *best = Some(best.map_or(penalty, |b: f32| b.max(penalty)));

                if let Some(passive) = &def.passive {
                    self.crit_damage_bonus_pct += passive.crit_damage_bonus_pct;
                    if let Some(spell) = passive.spell.filter(|s| s.is_valid()) {
                        self.desired_passives.insert(spell);
                    }
                }
            }
        }

        for (idx, best) in best_penalty.iter() {
            if let Some(penalty) = best {
                self.slot_penalty[idx] = *penalty;
            }
        }
    }

    /// Diff the desired passives against the applied set and mark them
    /// applied. The caller applies the returned changes on the host.
    pub fn reconcile_passives(&mut self) -> PassiveReconcile {
        let reconcile = PassiveReconcile {
            add: self.desired_passives.difference(&self.applied_passives).copied().collect(),
            remove: self.applied_passives.difference(&self.desired_passives).copied().collect(),
        };
        self.applied_passives = self.desired_passives.clone();
        reconcile
    }

    /// Resize for a new table and drop every count.
    ///
    /// Applied passives are kept so the next rebuild can remove them.
    pub fn reset_for_table(&mut self, len: usize) {
        self.counts.reset(len, 0);
        self.slot_penalty.reset(len, 1.0);
        self.instances_by_affix.reset(len, SmallVec::new());
        self.crit_damage_bonus_pct = 0.0;
        self.desired_passives.clear();
    }

    /// Make room for affixes registered after the last rebuild.
    pub fn grow_to(&mut self, len: usize) {
        self.counts.grow_to(len, 0);
        self.slot_penalty.grow_to(len, 1.0);
        self.instances_by_affix.grow_to(len, SmallVec::new());
    }

    /// Forget everything. Returns the passives that were applied.
    pub fn clear(&mut self) -> Vec<SpellId> {
        self.reset_for_table(0);
        std::mem::take(&mut self.applied_passives).into_iter().collect()
    }

    /// Equipped instances carrying affix `idx`.
    #[must_use]
    pub fn count(&self, idx: AffixIndex) -> u32 {
        self.counts.get(idx).copied().unwrap_or(0)
    }

    /// True if affix `idx` can proc.
    #[must_use]
    pub fn is_active(&self, idx: AffixIndex) -> bool {
        self.count(idx) > 0
    }

    /// Best slot penalty for affix `idx` (1.0 when not equipped).
    #[must_use]
    pub fn slot_penalty(&self, idx: AffixIndex) -> f32 {
        self.slot_penalty.get(idx).copied().unwrap_or(1.0)
    }

    /// Instances carrying affix `idx`, in equipment order.
    #[must_use]
    pub fn instances_for(&self, idx: AffixIndex) -> &[InstanceKey] {
        self.instances_by_affix.get(idx).map_or(&[][..], |v| v.as_slice())
    }

    /// Sum of equipped crit-damage bonuses.
    #[must_use]
    pub fn crit_damage_bonus_pct(&self) -> f32 {
        self.crit_damage_bonus_pct
    }

    /// Passive spells currently applied.
    pub fn applied_passives(&self) -> impl Iterator<Item = SpellId> + '_ {
        self.applied_passives.iter().copied()
    }

    /// Iterate `(index, count)` for every equipped affix.
    pub fn active(&self) -> impl Iterator<Item = (AffixIndex, u32)> + '_ {
        self.counts.iter().filter(|(_, c)| **c > 0).map(|(i, c)| (i, *c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affixes::{ActionSpec, AffixDefinition, PassiveSpec, Trigger};
    use crate::core::FormId;

    fn prefix(id: &str) -> AffixDefinition {
        AffixDefinition::new(id)
            .on(Trigger::Hit)
            .with_slot(AffixSlot::Prefix)
            .with_action(ActionSpec::DebugNotify { message: id.into() })
    }

    fn suffix(id: &str, spell: u32, crit: f32) -> AffixDefinition {
        AffixDefinition::new(id).with_slot(AffixSlot::Suffix).with_passive(PassiveSpec {
            spell: Some(SpellId::new(spell)),
            crit_damage_bonus_pct: crit,
        })
    }

    fn key(n: u16) -> InstanceKey {
        InstanceKey::new(FormId::new(0x200), n)
    }

    #[test]
    fn test_penalty_table() {
        assert_eq!(slot_penalty_for(1), 1.0);
        assert_eq!(slot_penalty_for(2), 0.8);
        assert_eq!(slot_penalty_for(3), 0.65);
        assert_eq!(slot_penalty_for(4), 0.65);
    }

    #[test]
    fn test_best_penalty_across_instances() {
        let (table, _) = AffixTable::from_definitions([prefix("a"), prefix("b"), prefix("c")]);
        let t = |id: &str| AffixToken::from_id(id);
        let crowded = [t("a"), t("b"), t("c")];
        let single = [t("a")];

        let mut active = ActiveState::new();
        let mut runtime = RuntimeStates::new();
        active.rebuild(&table, [(key(1), &crowded[..]), (key(2), &single[..])], &mut runtime);

        let a = table.by_id("a").unwrap();
        let b = table.by_id("b").unwrap();
        assert_eq!(active.count(a), 2);
        assert_eq!(active.slot_penalty(a), 1.0);
        assert_eq!(active.slot_penalty(b), 0.65);
        assert_eq!(active.instances_for(a), &[key(1), key(2)]);
        assert_eq!(runtime.len(), 4);
    }

    #[test]
    fn test_passive_reconcile_is_set_difference() {
        let (table, _) = AffixTable::from_definitions([suffix("s1", 10, 5.0), suffix("s2", 20, 7.5)]);
        let s1 = [AffixToken::from_id("s1")];
        let both = [AffixToken::from_id("s1"), AffixToken::from_id("s2")];
        let mut active = ActiveState::new();
        let mut runtime = RuntimeStates::new();

        let first = active.rebuild(&table, [(key(1), &s1[..])], &mut runtime);
        assert_eq!(first.add, vec![SpellId::new(10)]);
        assert!(first.remove.is_empty());
        assert_eq!(active.crit_damage_bonus_pct(), 5.0);

        let second = active.rebuild(&table, [(key(1), &both[..])], &mut runtime);
        assert_eq!(second.add, vec![SpellId::new(20)]);
        assert!(second.remove.is_empty());
        assert_eq!(active.crit_damage_bonus_pct(), 12.5);

        let third = active.rebuild(&table, std::iter::empty(), &mut runtime);
        assert!(third.add.is_empty());
        assert_eq!(third.remove, vec![SpellId::new(10), SpellId::new(20)]);

        assert!(active.rebuild(&table, std::iter::empty(), &mut runtime).is_empty());
    }

    #[test]
    fn test_recount_defers_passive_changes() {
        let (table, _) = AffixTable::from_definitions([suffix("s1", 10, 5.0)]);
        let s1 = [AffixToken::from_id("s1")];
        let mut active = ActiveState::new();
        let mut runtime = RuntimeStates::new();

        active.recount(&table, [(key(1), &s1[..])], &mut runtime);
        assert_eq!(active.count(table.by_id("s1").unwrap()), 1);
        assert_eq!(active.applied_passives().count(), 0);

        let reconcile = active.reconcile_passives();
        assert_eq!(reconcile.add, vec![SpellId::new(10)]);
        assert!(active.reconcile_passives().is_empty());
    }

    #[test]
    fn test_unknown_tokens_ignored() {
        let (table, _) = AffixTable::from_definitions([prefix("a")]);
        let tokens = [AffixToken::from_id("unknown")];
        let mut active = ActiveState::new();
        active.rebuild(&table, [(key(1), &tokens[..])], &mut RuntimeStates::new());
        assert_eq!(active.active().count(), 0);
    }
}
