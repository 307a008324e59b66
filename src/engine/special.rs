//! Special action paths.
//!
//! These affixes do not listen on a trigger list. The damage and hit
//! handlers invoke them directly at the right point of the pipeline, and
//! the best candidate wins: highest conversion share, highest redirect
//! share, highest archmage damage. Cast-on-crit rotates through its
//! eligible candidates instead.
//!
//! Special paths skip the trigger budget but share cooldowns, the chance
//! roll and the depth guard with triggered affixes.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use crate::actions::{execute_cast_spell, ActionContext};
use crate::affixes::{ActionKind, ActionSpec, AffixDefinition, AffixIndex, AffixTable};
use crate::core::{ActorId, TimePoint};
use crate::host::{CastRequest, HitData, Host};

use super::Engine;

impl Engine {
    /// Ready candidate of `kind` with the highest score. Ties go to the
    /// earliest registered.
    pub(super) fn best_ready<F>(
        &self,
        table: &AffixTable,
        kind: ActionKind,
        target: ActorId,
        now: TimePoint,
        score: F,
    ) -> Option<AffixIndex>
    where
        F: Fn(&AffixDefinition) -> Option<f32>,
    {
        let mut best: Option<(AffixIndex, f32)> = None;
        for &idx in table.special_indices(kind) {
            let def = &table[idx];
            if !self.is_ready(def, idx, target, now) {
                continue;
            }
            let Some(value) = score(def) else {
                continue;
            };
            if best.map_or(true, |(_, b)| value > b) {
                best = Some((idx, value));
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Move part of a physical hit into an elemental spell.
    ///
    /// Runs after the hit has been routed. Reduces `damage` by the converted
    /// amount and casts the element spell with that magnitude.
    pub(super) fn apply_convert_damage(
        &mut self,
        host: &mut dyn Host,
        owner: ActorId,
        target: ActorId,
        hit: &HitData,
        damage: &mut f32,
        now: TimePoint,
    ) -> bool {
        if !self.can_process(owner) || !(*damage > 0.0) {
            return false;
        }
        if hit.spell.is_valid() && self.table.is_proc_spell(hit.spell) {
            return false;
        }

        let table = Arc::clone(&self.table);
        let Some(idx) = self.best_ready(&table, ActionKind::ConvertDamage, target, now, |def| match &def.action {
            Some(ActionSpec::ConvertDamage(spec)) => Some(spec.convert_pct),
            _ => None,
        }) else {
            return false;
        };
        let def = &table[idx];
        let Some(ActionSpec::ConvertDamage(spec)) = &def.action else {
            return false;
        };

        let chance = self.effective_chance(def, idx);
        if !self.rng.roll_percent(chance) {
            return false;
        }
        let converted = (hit.physical_dealt * spec.convert_pct / 100.0).min(*damage);
        if !(converted > 0.0) {
            debug!(affix = %def.id, "conversion skipped: no physical damage");
            return false;
        }

        self.commit_proc(def, idx, target, chance, now);
        *damage -= converted;
        let _guard = self.proc_depth.enter();
        host.cast_spell(&CastRequest {
            spell: spec.spell,
            caster: owner,
            target,
            magnitude: Some(converted),
        });
        debug!(affix = %def.id, element = ?spec.element, converted, "damage converted");
        true
    }

    /// Redirect part of incoming damage to the player's magicka.
    pub(super) fn apply_mind_over_matter(
        &mut self,
        host: &mut dyn Host,
        player: ActorId,
        damage: &mut f32,
        now: TimePoint,
    ) -> bool {
        if !self.can_process(player) || !(*damage > 0.0) {
            return false;
        }

        let table = Arc::clone(&self.table);
        let Some(idx) =
            self.best_ready(&table, ActionKind::MindOverMatter, ActorId::NONE, now, |def| match &def.action {
                Some(ActionSpec::MindOverMatter(spec)) => Some(spec.damage_to_magicka_pct),
                _ => None,
            })
        else {
            return false;
        };
        let def = &table[idx];
        let Some(ActionSpec::MindOverMatter(spec)) = &def.action else {
            return false;
        };

        let chance = self.effective_chance(def, idx);
        if !self.rng.roll_percent(chance) {
            return false;
        }
        let Some(vitals) = host.vitals(player) else {
            return false;
        };

        let mut redirect = (*damage * spec.damage_to_magicka_pct / 100.0).min(vitals.magicka.max(0.0));
        if let Some(cap) = spec.max_redirect_per_hit {
            redirect = redirect.min(cap.max(0.0));
        }
        if !(redirect > 0.0) {
            debug!(affix = %def.id, "redirect skipped: no magicka");
            return false;
        }

        self.commit_proc(def, idx, ActorId::NONE, chance, now);
        *damage -= redirect;
        host.damage_magicka(player, redirect);
        debug!(affix = %def.id, redirect, "damage redirected to magicka");
        true
    }

    /// Extra spell damage scaled from maximum magicka, paid for with a
    /// share of it. Only the player's own spell hits qualify.
    pub(super) fn apply_archmage(
        &mut self,
        host: &mut dyn Host,
        player: ActorId,
        target: ActorId,
        hit: &HitData,
        now: TimePoint,
    ) -> bool {
        if !self.can_process(player) || player != host.player() {
            return false;
        }
        if !hit.spell.is_valid() || self.table.is_proc_spell(hit.spell) {
            return false;
        }

        let table = Arc::clone(&self.table);
        let Some(idx) = self.best_ready(&table, ActionKind::Archmage, target, now, |def| match &def.action {
            Some(ActionSpec::Archmage(spec)) => Some(spec.damage_pct_of_max_magicka),
            _ => None,
        }) else {
            return false;
        };
        let def = &table[idx];
        let Some(ActionSpec::Archmage(spec)) = &def.action else {
            return false;
        };

        let chance = self.effective_chance(def, idx);
        if !self.rng.roll_percent(chance) {
            return false;
        }
        let Some(vitals) = host.vitals(player) else {
            return false;
        };
        let cost = vitals.max_magicka * spec.cost_pct_of_max_magicka / 100.0;
        if vitals.magicka < cost {
            debug!(affix = %def.id, cost, magicka = vitals.magicka, "archmage skipped: not enough magicka");
            return false;
        }
        let bonus = vitals.max_magicka * spec.damage_pct_of_max_magicka / 100.0;
        if !(bonus > 0.0) {
            return false;
        }

        self.commit_proc(def, idx, target, chance, now);
        let _guard = self.proc_depth.enter();
        if cost > 0.0 {
            host.damage_magicka(player, cost);
        }
        host.cast_spell(&CastRequest {
            spell: spec.spell,
            caster: player,
            target,
            magnitude: Some(bonus),
        });
        debug!(affix = %def.id, bonus, cost, "archmage");
        true
    }

    /// Cast the next eligible cast-on-crit affix in rotation.
    ///
    /// The cursor advances over candidates that are equipped and off
    /// cooldown, so one affix on cooldown never stalls the others.
    pub(super) fn apply_cast_on_crit(
        &mut self,
        host: &mut dyn Host,
        owner: ActorId,
        target: ActorId,
        hit: &HitData,
        now: TimePoint,
    ) -> bool {
        if !self.can_process(owner) {
            return false;
        }

        let table = Arc::clone(&self.table);
        let eligible: SmallVec<[AffixIndex; 8]> = table
            .special_indices(ActionKind::CastOnCrit)
            .iter()
            .copied()
            .filter(|&idx| self.is_ready(&table[idx], idx, target, now))
            .collect();
        if eligible.is_empty() {
            return false;
        }
        let idx = eligible[self.crit_cursor % eligible.len()];
        self.crit_cursor = self.crit_cursor.wrapping_add(1);

        let def = &table[idx];
        let Some(ActionSpec::CastOnCrit(spec)) = &def.action else {
            return false;
        };
        let chance = self.effective_chance(def, idx);
        if !self.rng.roll_percent(chance) {
            return false;
        }

        self.commit_proc(def, idx, target, chance, now);
        let (spell, multiplier) = self.cast_payload(idx, def.token, spec);
        let _guard = self.proc_depth.enter();
        let mut ctx = ActionContext::new(host, owner, target, Some(hit), now);
        let outcome = execute_cast_spell(&mut ctx, spec, spell, multiplier);
        debug!(affix = %def.id, ?outcome, "cast on crit");
        outcome.executed()
    }
}
