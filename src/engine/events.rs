//! Host event entry points.
//!
//! The damage-apply callback is the primary hit path. Its order is:
//!
//! 1. route: attribution, hit-like source, stale magnitude, signature dedupe
//! 2. damage modifiers on the accepted hit (conversion, mind over matter)
//! 3. hit dispatch (outgoing and incoming triggers, specials)
//! 4. lethal check for corpse explosions
//!
//! [`Engine::on_hit`] only covers actors the damage hook does not see.

use tracing::{debug, trace};

use crate::affixes::Trigger;
use crate::core::{ActorId, FormId, TimePoint};
use crate::host::{HitData, Host};
use crate::limits::DuplicateHitKey;

use super::Engine;

/// DoT refresh map size that triggers a sweep.
const DOT_REFRESH_PRUNE_THRESHOLD: usize = 1_024;

impl Engine {
    /// Health-damage callback. May reduce `damage` in place.
    ///
    /// Returns true if the event was accepted as a genuine hit.
    #[allow(clippy::too_many_arguments)]
    pub fn on_health_damage(
        &mut self,
        host: &mut dyn Host,
        target: ActorId,
        attacker: ActorId,
        hit: Option<&HitData>,
        source: FormId,
        damage: &mut f32,
        now: TimePoint,
    ) -> bool {
        if !self.config_loaded || !self.settings.enabled || self.proc_depth.is_active() {
            return false;
        }
        if !self.route_health_damage_as_hit(target, attacker, hit, source, *damage, now) {
            return false;
        }
        let Some(hit) = hit else {
            return false;
        };

        let player = host.player();
        let attacker_owner = host.player_owner(attacker);
        if let Some(owner) = attacker_owner {
            if target != owner && host.is_hostile_either(attacker, target) {
                self.apply_convert_damage(host, owner, target, hit, damage, now);
            }
        }
        if target == player && attacker != player {
            self.apply_mind_over_matter(host, player, damage, now);
        }

        self.dispatch_hit(host, target, attacker, hit, source, now);

        if let Some(owner) = attacker_owner {
            let lethal = host
                .vitals(target)
                .is_some_and(|v| v.health > 0.0 && *damage >= v.health);
            if target != owner && lethal {
                self.try_corpse_explosion(host, owner, attacker != owner, target, now);
            }
        }
        true
    }

    /// Run one damage event through the router with the configured
    /// signature window.
    pub fn route_health_damage_as_hit(
        &mut self,
        target: ActorId,
        attacker: ActorId,
        hit: Option<&HitData>,
        source: FormId,
        damage: f32,
        now: TimePoint,
    ) -> bool {
        let window_ms = self.settings.hit_signature_window_ms;
        match self.router.route(target, attacker, hit, source, damage, now, window_ms) {
            Ok(()) => true,
            Err(reason) => {
                trace!(%target, %attacker, ?reason, "damage not routed as a hit");
                false
            }
        }
    }

    /// Raw hit event. Only dispatched for targets the damage hook does not
    /// cover; everything else arrives through [`Engine::on_health_damage`].
    pub fn on_hit(&mut self, host: &mut dyn Host, target: ActorId, attacker: ActorId, hit: &HitData, now: TimePoint) {
        if !self.config_loaded || !self.settings.enabled {
            return;
        }
        if host.is_damage_hook_routed(target) {
            return;
        }
        self.dispatch_hit(host, target, attacker, hit, hit.source(), now);
    }

    /// Death event.
    pub fn on_death(&mut self, host: &mut dyn Host, dying: ActorId, killer: ActorId, now: TimePoint) {
        let Some(owner) = host.player_owner(killer) else {
            return;
        };
        if dying == owner || !self.can_process(owner) {
            return;
        }
        self.process_trigger(host, Trigger::Kill, owner, dying, None, now);
        self.recent_mut(owner).last_kill = Some(now);
        self.try_corpse_explosion(host, owner, killer != owner, dying, now);
    }

    /// Equipment change. Rebuilds active counts when it concerns the player.
    pub fn on_equip_changed(&mut self, host: &mut dyn Host, actor: ActorId, now: TimePoint) {
        if self.config_loaded && actor == host.player() {
            self.resync(host, now);
        }
    }

    /// Magic effect applied. Damage-over-time effects from the player side
    /// fire `DotApply` triggers, at most once per refresh cooldown for each
    /// (target, effect) pair.
    pub fn on_magic_effect_apply(
        &mut self,
        host: &mut dyn Host,
        caster: ActorId,
        target: ActorId,
        effect: FormId,
        now: TimePoint,
    ) -> usize {
        let Some(owner) = host.player_owner(caster) else {
            return 0;
        };
        if !self.can_process(owner) || !target.is_valid() || target == owner {
            return 0;
        }
        if !host.is_damage_over_time(effect) || !host.is_hostile_either(caster, target) {
            return 0;
        }

        let cooldown = self.settings.dot_refresh_cooldown_ms;
        let key = (target, effect);
        let refreshing = self
            .dot_refresh
            .get(&key)
            .is_some_and(|&at| now.since(at).is_some_and(|elapsed| elapsed < cooldown));
        if refreshing {
            trace!(%target, %effect, "dot refresh ignored");
            return 0;
        }
        if self.dot_refresh.len() >= DOT_REFRESH_PRUNE_THRESHOLD {
            self.dot_refresh
                .retain(|_, at| now.since(*at).is_some_and(|elapsed| elapsed < cooldown));
        }
        self.dot_refresh.insert(key, now);

        self.process_trigger(host, Trigger::DotApply, owner, target, None, now)
    }

    /// Periodic work: scheduled resync, trap polling and low-health re-arm.
    pub fn tick(&mut self, host: &mut dyn Host, now: TimePoint) {
        if !self.config_loaded {
            return;
        }
        if self.resync.poll(now, self.settings.resync_interval_ms) {
            self.resync(host, now);
        }
        self.tick_traps(host, now);
        self.rearm_low_health(host);
    }

    /// Advance traps only.
    pub fn tick_traps(&mut self, host: &mut dyn Host, now: TimePoint) {
        if self.traps.is_empty() {
            return;
        }
        let _guard = self.proc_depth.enter();
        let summary = self.traps.tick(host, now, self.settings.trap_global_cap);
        if summary.triggered > 0 || summary.removed > 0 {
            debug!(triggered = summary.triggered, removed = summary.removed, live = self.traps.len(), "traps ticked");
        }
    }

    fn dispatch_hit(
        &mut self,
        host: &mut dyn Host,
        target: ActorId,
        attacker: ActorId,
        hit: &HitData,
        source: FormId,
        now: TimePoint,
    ) {
        if !target.is_valid() || !attacker.is_valid() || target == attacker {
            return;
        }
        let player = host.player();
        if let Some(owner) = host.player_owner(attacker) {
            if target != owner {
                self.dispatch_outgoing(host, owner, attacker, target, hit, source, now);
            }
        }
        // Runs regardless of the outgoing path
        if target == player {
            self.dispatch_incoming(host, player, attacker, hit, source, now);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_outgoing(
        &mut self,
        host: &mut dyn Host,
        owner: ActorId,
        attacker: ActorId,
        target: ActorId,
        hit: &HitData,
        source: FormId,
        now: TimePoint,
    ) {
        if hit.spell.is_valid() && self.table.is_proc_spell(hit.spell) {
            return;
        }
        let hostile = host.is_hostile_either(attacker, target);
        let granted = self.first_hit.resolve(
            owner,
            target,
            self.settings.allow_non_hostile_first_hit,
            hostile,
            target == host.player(),
            now,
        );
        if !hostile && !granted {
            trace!(%target, "outgoing hit on non-hostile target ignored");
            return;
        }
        let key = DuplicateHitKey {
            outgoing: true,
            aggressor: attacker,
            target,
            source,
        };
        if self
            .outgoing_hits
            .check_and_record(key, now, self.settings.duplicate_hit_window_ms)
        {
            trace!(%target, "duplicate outgoing hit suppressed");
            return;
        }

        self.process_trigger(host, Trigger::Hit, owner, target, Some(hit), now);
        if hostile && hit.is_crit_or_power_attack() {
            self.apply_cast_on_crit(host, owner, target, hit, now);
        }
        if attacker == owner {
            self.apply_archmage(host, owner, target, hit, now);
        }
        self.recent_mut(owner).last_hit = Some(now);
    }

    fn dispatch_incoming(
        &mut self,
        host: &mut dyn Host,
        player: ActorId,
        attacker: ActorId,
        hit: &HitData,
        source: FormId,
        now: TimePoint,
    ) {
        let key = DuplicateHitKey {
            outgoing: false,
            aggressor: attacker,
            target: player,
            source,
        };
        if self
            .incoming_hits
            .check_and_record(key, now, self.settings.duplicate_hit_window_ms)
        {
            trace!(%attacker, "duplicate incoming hit suppressed");
            return;
        }

        self.process_trigger(host, Trigger::IncomingHit, player, attacker, Some(hit), now);
        self.evaluate_low_health(host, player, attacker, now);
        self.recent_mut(player).last_hit_taken = Some(now);
    }
}
