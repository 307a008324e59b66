//! Trigger evaluation.
//!
//! Every triggered affix goes through the same pipeline, in this order:
//!
//! 1. equipped (active count > 0)
//! 2. global ICD and per-target ICD
//! 3. recently-hit / recently-killed / not-hit-recently gates
//! 4. lucky-hit pre-roll (hit triggers only)
//! 5. chance roll: `base * global multiplier * slot penalty`
//! 6. trigger budget
//! 7. commit cooldowns and progression, then execute under the depth guard
//!
//! Nothing is committed before step 7, so a failed roll or an exhausted
//! budget leaves the affix ready for the next event.

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::actions::{
    execute_adaptive_element, execute_cast_spell, execute_spawn_trap, ActionContext, ExecOutcome,
};
use crate::affixes::{ActionSpec, AffixDefinition, AffixIndex, AffixTable, CastSpellSpec, Trigger};
use crate::core::{ActorId, AffixToken, DebugVerbosity, InstanceKey, SpellId, TimePoint};
use crate::host::{HitData, Host};
use crate::limits::resolve_trigger_proc_cooldown_ms;

use super::{Engine, RecentActivity};

/// One trigger event as seen by the proc pipeline.
#[derive(Clone, Copy, Debug)]
pub(super) struct TriggerEvent<'h> {
    pub(super) trigger: Trigger,
    pub(super) owner: ActorId,
    pub(super) target: ActorId,
    pub(super) hit: Option<&'h HitData>,
    pub(super) now: TimePoint,
}

impl Engine {
    /// Evaluate every affix listening for `trigger`. Returns the number of
    /// procs.
    ///
    /// `LowHealth` goes through the threshold and arming checks, with
    /// `target` as the attacker.
    pub fn process_trigger(
        &mut self,
        host: &mut dyn Host,
        trigger: Trigger,
        owner: ActorId,
        target: ActorId,
        hit: Option<&HitData>,
        now: TimePoint,
    ) -> usize {
        if trigger == Trigger::LowHealth {
            return self.evaluate_low_health(host, owner, target, now);
        }
        if !self.can_process(owner) {
            return 0;
        }
        let event = TriggerEvent {
            trigger,
            owner,
            target,
            hit,
            now,
        };

        let table = Arc::clone(&self.table);
        let mut procs = 0;
        for &idx in table.trigger_indices(trigger) {
            if self.try_proc(host, &table, idx, event) {
                procs += 1;
            }
        }
        procs
    }

    /// Advance the manual mode cycle of `token` on one item instance.
    /// Returns the new mode index.
    pub fn cycle_mode_manual(&mut self, instance: InstanceKey, token: AffixToken) -> Option<u32> {
        let idx = self.table.by_token(token)?;
        let modes = self.table[idx]
            .action
            .as_ref()
            .and_then(ActionSpec::cast_spec)
            .and_then(|spec| spec.mode_cycle.as_ref())
            .map_or(0, |cycle| cycle.spells.len());
        let mode = self.runtime.cycle_manual(instance, token, modes)?;
        debug!(%token, %instance, mode, "mode cycled");
        Some(mode)
    }

    /// Config loaded, engine enabled, a real owner, and not already inside
    /// a proc.
    pub(super) fn can_process(&self, owner: ActorId) -> bool {
        self.config_loaded && self.settings.enabled && owner.is_valid() && !self.proc_depth.is_active()
    }

    /// Equipped and off both cooldowns.
    pub(super) fn is_ready(&self, def: &AffixDefinition, idx: AffixIndex, target: ActorId, now: TimePoint) -> bool {
        if !self.active.is_active(idx) {
            return false;
        }
        if self.next_allowed.get(idx).is_some_and(|&next| now < next) {
            return false;
        }
        !(def.per_target_icd_ms > 0 && self.per_target.is_blocked(def.token, target, now))
    }

    pub(super) fn effective_chance(&self, def: &AffixDefinition, idx: AffixIndex) -> f32 {
        let chance =
            def.proc_chance_pct * self.settings.effective_proc_chance_mult() * self.active.slot_penalty(idx);
        if chance.is_finite() {
            chance.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Start cooldowns and advance per-instance progression after a proc.
    pub(super) fn commit_proc(
        &mut self,
        def: &AffixDefinition,
        idx: AffixIndex,
        target: ActorId,
        chance: f32,
        now: TimePoint,
    ) {
        let has_per_target = def.per_target_icd_ms > 0;
        let icd = resolve_trigger_proc_cooldown_ms(
            def.icd_ms,
            has_per_target,
            chance,
            self.settings.zero_icd_safety_guard_ms,
        );
        if icd > 0 {
            if let Some(next) = self.next_allowed.get(idx).copied() {
                self.next_allowed[idx] = next.max(now.after(icd));
            }
        }
        if has_per_target {
            self.per_target.commit(def.token, target, def.per_target_icd_ms, now);
        }
        self.runtime
            .advance_for_proc(self.active.instances_for(idx), def.token, def.action.as_ref());
    }

    /// Spell and evolution multiplier for a cast action, from the progression
    /// of the instances carrying the affix.
    pub(super) fn cast_payload(&self, idx: AffixIndex, token: AffixToken, spec: &CastSpellSpec) -> (SpellId, f32) {
        let instances = self.active.instances_for(idx);
        let spell = match &spec.mode_cycle {
            Some(cycle) if !cycle.spells.is_empty() => {
                let mode = self.runtime.mode_index(instances, token) as usize % cycle.spells.len();
                cycle.spells[mode]
            }
            _ => spec.spell,
        };
        let multiplier = spec
            .evolution
            .as_ref()
            .map_or(1.0, |evo| evo.multiplier_for(self.runtime.best_evolution_xp(instances, token)));
        (spell, multiplier)
    }

    fn recent_gates_pass(&self, def: &AffixDefinition, owner: ActorId, now: TimePoint) -> bool {
        let recent = self.recent.get(&owner).copied().unwrap_or_default();
        let within = |at: Option<TimePoint>, window: u64| at.is_some_and(|t| now.within(t, window));

        if def.require_recently_hit_ms > 0 && !within(recent.last_hit, def.require_recently_hit_ms) {
            return false;
        }
        if def.require_recently_kill_ms > 0 && !within(recent.last_kill, def.require_recently_kill_ms) {
            return false;
        }
        !(def.require_not_hit_recently_ms > 0 && within(recent.last_hit_taken, def.require_not_hit_recently_ms))
    }

    pub(super) fn recent_mut(&mut self, actor: ActorId) -> &mut RecentActivity {
        self.recent.entry(actor).or_default()
    }

    /// Run the full pipeline for one candidate. True if it procced.
    pub(super) fn try_proc(
        &mut self,
        host: &mut dyn Host,
        table: &AffixTable,
        idx: AffixIndex,
        event: TriggerEvent<'_>,
    ) -> bool {
        let def = &table[idx];
        if !self.is_ready(def, idx, event.target, event.now) {
            return false;
        }
        if !self.recent_gates_pass(def, event.owner, event.now) {
            trace!(affix = %def.id, "recently gate closed");
            return false;
        }

        if event.trigger == Trigger::Hit && def.lucky_hit_chance_pct > 0.0 {
            let lucky = def.lucky_hit_chance_pct * def.lucky_hit_proc_coefficient;
            if !self.rng.roll_percent(lucky) {
                return false;
            }
        }

        let chance = self.effective_chance(def, idx);
        if !self.rng.roll_percent(chance) {
            return false;
        }

        if !self.trigger_budget.try_consume(
            event.now,
            self.settings.trigger_budget_window_ms,
            self.settings.trigger_budget_max_per_window,
        ) {
            if self
                .log_throttle
                .allow("trigger budget", event.now, self.settings.log_throttle_ms)
            {
                info!(affix = %def.id, "trigger budget exhausted");
                if self.is_verbose(DebugVerbosity::Verbose) {
                    host.notify("Affix trigger budget exhausted");
                }
            }
            return false;
        }

        self.commit_proc(def, idx, event.target, chance, event.now);

        let outcome = {
            let _guard = self.proc_depth.enter();
            self.execute_triggered(host, def, idx, event)
        };
        match outcome {
            ExecOutcome::Executed => {
                debug!(affix = %def.id, trigger = ?event.trigger, target = %event.target, "proc");
                if self.is_verbose(DebugVerbosity::Procs) {
                    host.notify(&format!("Affix proc: {}", def.id));
                }
            }
            ExecOutcome::Skipped(reason) => {
                debug!(affix = %def.id, reason, "proc skipped at execution");
            }
        }
        true
    }

    fn execute_triggered(
        &mut self,
        host: &mut dyn Host,
        def: &AffixDefinition,
        idx: AffixIndex,
        event: TriggerEvent<'_>,
    ) -> ExecOutcome {
        let mut ctx = ActionContext::new(host, event.owner, event.target, event.hit, event.now);
        match &def.action {
            Some(ActionSpec::DebugNotify { message }) => {
                ctx.host.notify(message);
                ExecOutcome::Executed
            }
            Some(ActionSpec::CastSpell(spec)) => {
                let (spell, multiplier) = self.cast_payload(idx, def.token, spec);
                execute_cast_spell(&mut ctx, spec, spell, multiplier)
            }
            Some(ActionSpec::CastSpellAdaptiveElement(spec)) => execute_adaptive_element(&mut ctx, spec),
            Some(ActionSpec::SpawnTrap(spec)) => {
                execute_spawn_trap(&mut ctx, def.token, spec, &mut self.traps, self.settings.trap_global_cap)
            }
            Some(_) => ExecOutcome::Skipped("special action"),
            None => ExecOutcome::Skipped("no action"),
        }
    }

    // === Low health ===

    /// Evaluate low-health affixes for the player after taking damage.
    ///
    /// An armed affix fires once health drops to its threshold and disarms.
    /// A disarmed affix re-arms once health climbs back to its rearm level.
    pub(super) fn evaluate_low_health(
        &mut self,
        host: &mut dyn Host,
        owner: ActorId,
        attacker: ActorId,
        now: TimePoint,
    ) -> usize {
        if !self.can_process(owner) {
            return 0;
        }
        let Some(health_pct) = host.vitals(owner).and_then(|v| v.health_pct()) else {
            return 0;
        };

        let table = Arc::clone(&self.table);
        let event = TriggerEvent {
            trigger: Trigger::LowHealth,
            owner,
            target: attacker,
            hit: None,
            now,
        };
        let mut procs = 0;
        for &idx in table.trigger_indices(Trigger::LowHealth) {
            let spec = table[idx].low_health.unwrap_or_default();
            let Some(&armed) = self.low_health_armed.get(idx) else {
                continue;
            };
            if !armed {
                if health_pct >= spec.rearm_pct {
                    self.low_health_armed[idx] = true;
                }
                continue;
            }
            if health_pct > spec.threshold_pct {
                continue;
            }
            if self.try_proc(host, &table, idx, event) {
                self.low_health_armed[idx] = false;
                procs += 1;
            }
        }
        procs
    }

    /// Re-arm low-health affixes whose owner has healed.
    pub(super) fn rearm_low_health(&mut self, host: &dyn Host) {
        let table = Arc::clone(&self.table);
        let candidates = table.trigger_indices(Trigger::LowHealth);
        if candidates.is_empty() {
            return;
        }
        let Some(health_pct) = host.vitals(host.player()).and_then(|v| v.health_pct()) else {
            return;
        };
        for &idx in candidates {
            let rearm = table[idx].low_health.unwrap_or_default().rearm_pct;
            if self.low_health_armed.get(idx) == Some(&false) && health_pct >= rearm {
                self.low_health_armed[idx] = true;
                trace!(affix = %table[idx].id, "low health re-armed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_host::RecordingHost;
    use crate::affixes::{AffixSlot, EvolutionSpec, EvolutionStage, ModeCycleSpec};
    use crate::core::{EngineSettings, FormId};
    use crate::host::{ActorVitals, EquippedInstance};
    use smallvec::smallvec;

    const PLAYER: ActorId = ActorId(0x14);
    const ENEMY: ActorId = ActorId(0x900);

    fn at(ms: u64) -> TimePoint {
        TimePoint::from_millis(ms)
    }

    fn engine_with(defs: Vec<AffixDefinition>, host: &mut RecordingHost) -> Engine {
        let mut engine = Engine::new(EngineSettings::default(), 42);
        let tokens: Vec<AffixToken> = defs.iter().map(|d| AffixToken::from_id(&d.id)).collect();
        engine.load_config(defs, vec![]);
        host.equipped
            .push(EquippedInstance::new(InstanceKey::new(FormId::new(1), 1)).with_tokens(tokens));
        engine.resync(host, TimePoint::ZERO);
        engine
    }

    fn notify(id: &str, trigger: Trigger) -> AffixDefinition {
        AffixDefinition::new(id)
            .on(trigger)
            .with_action(ActionSpec::DebugNotify { message: id.into() })
    }

    #[test]
    fn test_inactive_affix_never_procs() {
        let mut host = RecordingHost::with_player(PLAYER);
        let mut engine = Engine::new(EngineSettings::default(), 1);
        engine.load_config(vec![notify("idle", Trigger::Hit)], vec![]);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(0)), 0);
    }

    #[test]
    fn test_icd_blocks_until_elapsed() {
        let mut host = RecordingHost::with_player(PLAYER);
        let mut engine = engine_with(vec![notify("ping", Trigger::Hit).with_icd_ms(500)], &mut host);

        let mut fire = |ms| engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(ms));
        assert_eq!(fire(1_000), 1);
        assert_eq!(fire(1_499), 0);
        assert_eq!(fire(1_500), 1);
        assert_eq!(host.notes, vec!["ping", "ping"]);
    }

    #[test]
    fn test_zero_icd_guard_applies_to_guaranteed_procs() {
        let mut host = RecordingHost::with_player(PLAYER);
        let mut engine = engine_with(vec![notify("storm", Trigger::Hit)], &mut host);

        let procs: usize = (0..10)
            .map(|i| engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(1_000 + i * 10)))
            .sum();
        assert_eq!(procs, 1);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(1_120)), 1);
    }

    #[test]
    fn test_per_target_icd_is_independent_per_target() {
        let mut host = RecordingHost::with_player(PLAYER);
        let mut engine = engine_with(vec![notify("mark", Trigger::Hit).with_per_target_icd_ms(1_000)], &mut host);
        let other = ActorId::new(0x901);

        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(0)), 1);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(10)), 0);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, other, None, at(20)), 1);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(1_000)), 1);
    }

    #[test]
    fn test_disabled_or_zero_multiplier_blocks_procs() {
        let mut host = RecordingHost::with_player(PLAYER);
        let mut engine = engine_with(vec![notify("ping", Trigger::Hit)], &mut host);

        engine.set_proc_chance_multiplier(0.0);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(0)), 0);
        engine.set_proc_chance_multiplier(1.0);
        engine.set_enabled(false);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(0)), 0);
        engine.set_enabled(true);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(0)), 1);
    }

    #[test]
    fn test_trigger_budget_caps_procs() {
        let mut host = RecordingHost::with_player(PLAYER);
        let defs: Vec<AffixDefinition> = (0..5)
            .map(|i| notify(&format!("n{i}"), Trigger::Hit).with_icd_ms(1))
            .collect();
        let mut engine = engine_with(defs, &mut host);
        engine.settings.trigger_budget_max_per_window = 3;

        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(0)), 3);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(500)), 0);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(1_000)), 3);
    }

    #[test]
    fn test_recently_gates() {
        let mut host = RecordingHost::with_player(PLAYER);
        let mut def = notify("after_kill", Trigger::Hit);
        def.require_recently_kill_ms = 2_000;
        let mut engine = engine_with(vec![def], &mut host);

        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(0)), 0);
        engine.recent_mut(PLAYER).last_kill = Some(at(100));
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(2_100)), 1);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(2_500)), 0);
    }

    #[test]
    fn test_not_hit_recently_gate() {
        let mut host = RecordingHost::with_player(PLAYER);
        let mut def = notify("calm", Trigger::Hit);
        def.require_not_hit_recently_ms = 1_000;
        let mut engine = engine_with(vec![def], &mut host);

        engine.recent_mut(PLAYER).last_hit_taken = Some(at(0));
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(500)), 0);
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(1_001)), 1);
    }

    #[test]
    fn test_reentrant_trigger_is_ignored() {
        let mut host = RecordingHost::with_player(PLAYER);
        let mut engine = engine_with(vec![notify("ping", Trigger::Hit)], &mut host);
        let depth = engine.proc_depth();
        let _guard = depth.enter();
        assert_eq!(engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(0)), 0);
    }

    #[test]
    fn test_low_health_fires_once_until_rearmed() {
        let mut host = RecordingHost::with_player(PLAYER);
        let def = notify("last_stand", Trigger::LowHealth).with_low_health(30.0, 60.0);
        let mut engine = engine_with(vec![def], &mut host);

        fn set_health(host: &mut RecordingHost, health: f32) {
            host.vitals.insert(
                PLAYER,
                ActorVitals {
                    health,
                    max_health: 100.0,
                    ..Default::default()
                },
            );
        }

        set_health(&mut host, 50.0);
        assert_eq!(engine.evaluate_low_health(&mut host, PLAYER, ENEMY, at(0)), 0);
        set_health(&mut host, 25.0);
        assert_eq!(engine.evaluate_low_health(&mut host, PLAYER, ENEMY, at(1_000)), 1);
        set_health(&mut host, 10.0);
        assert_eq!(engine.evaluate_low_health(&mut host, PLAYER, ENEMY, at(2_000)), 0);

        set_health(&mut host, 70.0);
        engine.rearm_low_health(&host);
        set_health(&mut host, 20.0);
        assert_eq!(engine.evaluate_low_health(&mut host, PLAYER, ENEMY, at(3_000)), 1);
    }

    #[test]
    fn test_low_health_entry_point_keeps_arming() {
        let mut host = RecordingHost::with_player(PLAYER);
        let def = notify("last_stand", Trigger::LowHealth).with_low_health(30.0, 60.0);
        let mut engine = engine_with(vec![def], &mut host);
        host.vitals.insert(
            PLAYER,
            ActorVitals {
                health: 90.0,
                max_health: 100.0,
                ..Default::default()
            },
        );
        assert_eq!(engine.process_trigger(&mut host, Trigger::LowHealth, PLAYER, ENEMY, None, at(0)), 0);

        host.vitals.get_mut(&PLAYER).unwrap().health = 20.0;
        assert_eq!(engine.process_trigger(&mut host, Trigger::LowHealth, PLAYER, ENEMY, None, at(1_000)), 1);
        assert_eq!(engine.process_trigger(&mut host, Trigger::LowHealth, PLAYER, ENEMY, None, at(2_000)), 0);
    }

    #[test]
    fn test_evolution_multiplies_magnitude() {
        let mut host = RecordingHost::with_player(PLAYER);
        let spell = SpellId::new(0x500);
        host.spell_bases.insert(spell, 10.0);
        let def = AffixDefinition::new("growing")
            .on(Trigger::Hit)
            .with_icd_ms(1)
            .with_action(ActionSpec::CastSpell(CastSpellSpec {
                spell,
                evolution: Some(EvolutionSpec {
                    xp_per_proc: 1,
                    stages: vec![
                        EvolutionStage {
                            xp_required: 0,
                            magnitude_mult: 1.0,
                        },
                        EvolutionStage {
                            xp_required: 2,
                            magnitude_mult: 2.0,
                        },
                    ],
                }),
                ..Default::default()
            }));
        let mut engine = engine_with(vec![def], &mut host);

        for i in 0..4 {
            engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(i * 10));
        }
        let magnitudes: Vec<Option<f32>> = host.casts.iter().map(|c| c.magnitude).collect();
        // xp is committed before execution: 1, 2, 3, 4
        assert_eq!(magnitudes, vec![None, Some(20.0), Some(20.0), Some(20.0)]);
        let state = engine.runtime_state(InstanceKey::new(FormId::new(1), 1), AffixToken::from_id("growing")).unwrap();
        assert_eq!(state.evolution_xp, 4);
    }

    #[test]
    fn test_manual_mode_cycle_selects_spell() {
        let mut host = RecordingHost::with_player(PLAYER);
        let (fire, frost) = (SpellId::new(0x601), SpellId::new(0x602));
        let def = AffixDefinition::new("attunement")
            .on(Trigger::Hit)
            .with_icd_ms(1)
            .with_action(ActionSpec::CastSpell(CastSpellSpec {
                spell: fire,
                mode_cycle: Some(ModeCycleSpec {
                    spells: smallvec![fire, frost],
                    switch_every: 0,
                    manual_only: true,
                }),
                ..Default::default()
            }));
        let mut engine = engine_with(vec![def], &mut host);
        let token = AffixToken::from_id("attunement");

        engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(0));
        assert_eq!(engine.cycle_mode_manual(InstanceKey::new(FormId::new(1), 1), token), Some(1));
        engine.process_trigger(&mut host, Trigger::Hit, PLAYER, ENEMY, None, at(10));

        let spells: Vec<SpellId> = host.casts.iter().map(|c| c.spell).collect();
        assert_eq!(spells, vec![fire, frost]);
        assert_eq!(engine.cycle_mode_manual(InstanceKey::new(FormId::new(1), 1), AffixToken::from_id("missing")), None);
    }

    #[test]
    fn test_slot_penalty_scales_chance() {
        let mut host = RecordingHost::with_player(PLAYER);
        let defs: Vec<AffixDefinition> = ["p1", "p2", "p3"]
            .iter()
            .map(|id| notify(id, Trigger::Hit).with_slot(AffixSlot::Prefix))
            .collect();
        let engine = engine_with(defs, &mut host);
        let idx = engine.table().by_id("p3").unwrap();
        let def = &engine.table()[idx];
        assert!((engine.effective_chance(def, idx) - 65.0).abs() < 1e-3);
    }
}
