//! Corpse explosions.
//!
//! Both the death handler and the lethal-damage check in the damage
//! handler call [`Engine::try_corpse_explosion`]; the shared budget makes
//! sure a corpse reported by both only explodes once.

use std::sync::Arc;

use tracing::{debug, info};

use crate::actions::{chained_damage, explosion_targets};
use crate::affixes::{ActionKind, ActionSpec, CorpseExplosionSpec};
use crate::core::{ActorId, TimePoint};
use crate::host::{CastRequest, Host};

use super::Engine;

fn corpse_spec(action: Option<&ActionSpec>) -> Option<&CorpseExplosionSpec> {
    match action? {
        ActionSpec::CorpseExplosion(spec) | ActionSpec::SummonCorpseExplosion(spec) => Some(spec),
        _ => None,
    }
}

impl Engine {
    /// Explode `corpse` for `owner` if an equipped affix allows it.
    ///
    /// `by_summon` selects the summon variant. Returns the damage dealt to
    /// each target.
    pub fn try_corpse_explosion(
        &mut self,
        host: &mut dyn Host,
        owner: ActorId,
        by_summon: bool,
        corpse: ActorId,
        now: TimePoint,
    ) -> Option<f32> {
        if !self.can_process(owner) || !corpse.is_valid() {
            return None;
        }
        if self.corpse_budget.already_exploded(corpse, now) {
            return None;
        }

        let kind = if by_summon {
            ActionKind::SummonCorpseExplosion
        } else {
            ActionKind::CorpseExplosion
        };
        let corpse_max_health = host.vitals(corpse).map_or(0.0, |v| v.max_health);

        let table = Arc::clone(&self.table);
        let idx = self.best_ready(&table, kind, corpse, now, |def| {
            corpse_spec(def.action.as_ref()).map(|spec| spec.base_damage(corpse_max_health))
        })?;
        let def = &table[idx];
        let spec = corpse_spec(def.action.as_ref())?;

        let base = spec.base_damage(corpse_max_health);
        if !(base > 0.0) {
            debug!(affix = %def.id, "corpse explosion skipped: no damage");
            return None;
        }
        let chance = self.effective_chance(def, idx);
        if !self.rng.roll_percent(chance) {
            return None;
        }
        let Some(center) = host.position(corpse) else {
            debug!(affix = %def.id, %corpse, "corpse explosion skipped: no position");
            return None;
        };

        let depth = match self.corpse_budget.try_consume(owner, corpse, spec, now) {
            Ok(depth) => depth,
            Err(denial) => {
                if self.log_throttle.allow(denial.reason(), now, self.settings.log_throttle_ms) {
                    info!(affix = %def.id, reason = denial.reason(), "corpse explosion denied");
                }
                return None;
            }
        };
        let damage = chained_damage(base, spec.chain_falloff, depth);
        self.commit_proc(def, idx, corpse, chance, now);

        let _guard = self.proc_depth.enter();
        let targets = explosion_targets(&*host, owner, corpse, center, spec.radius, spec.max_targets);
        for &target in &targets {
            host.cast_spell(&CastRequest {
                spell: spec.spell,
                caster: owner,
                target,
                magnitude: Some(damage),
            });
        }
        debug!(affix = %def.id, %corpse, depth, damage, targets = targets.len(), "corpse exploded");
        Some(damage)
    }
}
