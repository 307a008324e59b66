//! Trap spawn executor.

use tracing::debug;

use crate::affixes::{SpawnTrapSpec, TrapAnchor};
use crate::core::AffixToken;
use crate::traps::{TrapInstance, TrapSystem};

use super::magnitude::scaled_magnitude;
use super::{ActionContext, ExecOutcome};

/// Validate the triggering hit, place the trap and hand it to `traps`.
pub fn execute_spawn_trap(
    ctx: &mut ActionContext<'_>,
    token: AffixToken,
    spec: &SpawnTrapSpec,
    traps: &mut TrapSystem,
    global_cap: usize,
) -> ExecOutcome {
    if spec.require_weapon_hit && !ctx.hit.is_some_and(|h| h.is_weapon_hit()) {
        return ExecOutcome::Skipped("not a weapon hit");
    }
    if spec.require_crit_or_power_attack && !ctx.hit.is_some_and(|h| h.is_crit_or_power_attack()) {
        return ExecOutcome::Skipped("not a crit or power attack");
    }
    if ctx.target.is_valid() && !ctx.host.is_hostile_either(ctx.owner, ctx.target) {
        return ExecOutcome::Skipped("target not hostile");
    }

    let anchor = match spec.anchor {
        TrapAnchor::OwnerFeet => ctx.owner,
        TrapAnchor::TargetFeet => ctx.target,
    };
    let Some(position) = ctx.host.position(anchor) else {
        debug!(actor = %anchor, "trap skipped: no position");
        return ExecOutcome::Skipped("no position");
    };

    let magnitude = spec.scaling.as_ref().map(|scaling| {
        let base = spec.spells.first().and_then(|&s| ctx.host.spell_base_magnitude(s));
        scaled_magnitude(scaling, ctx.hit, base)
    });

    let trap = TrapInstance {
        id: 0,
        source_token: token,
        owner: ctx.owner,
        position,
        radius: spec.radius,
        spells: spec.spells.clone(),
        magnitude,
        created_at: ctx.now,
        armed_at: ctx.now.after(spec.arm_delay_ms),
        expires_at: ctx.now.after(spec.ttl_ms),
        rearm_delay_ms: spec.rearm_delay_ms,
        max_triggers: spec.max_triggers,
        triggered_count: 0,
    };
    let id = traps.spawn(trap, spec.max_active, global_cap);
    debug!(trap = id, %token, "trap spawned");
    ExecOutcome::Executed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_host::RecordingHost;
    use crate::core::{ActorId, FormId, SpellId, TimePoint};
    use crate::host::HitData;
    use smallvec::smallvec;

    const OWNER: ActorId = ActorId(0x14);
    const ENEMY: ActorId = ActorId(0x800);

    fn spec() -> SpawnTrapSpec {
        SpawnTrapSpec {
            spells: smallvec![SpellId::new(0x31)],
            radius: 3.0,
            anchor: TrapAnchor::TargetFeet,
            arm_delay_ms: 250,
            require_crit_or_power_attack: true,
            ..Default::default()
        }
    }

    fn host() -> RecordingHost {
        let mut host = RecordingHost::with_player(OWNER);
        host.place(OWNER, 0.0);
        host.place(ENEMY, 8.0);
        host.hostile.insert(ENEMY);
        host
    }

    #[test]
    fn test_spawns_at_target_feet() {
        let mut host = host();
        let mut traps = TrapSystem::new();
        let hit = HitData::weapon(OWNER, ENEMY, FormId::new(1), 10.0).with_critical();
        let token = AffixToken::from_id("snare");

        let mut ctx = ActionContext::new(&mut host, OWNER, ENEMY, Some(&hit), TimePoint::from_millis(1_000));
        let outcome = execute_spawn_trap(&mut ctx, token, &spec(), &mut traps, 24);
        assert_eq!(outcome, ExecOutcome::Executed);

        let trap = traps.iter().next().unwrap();
        assert_eq!(trap.position.x, 8.0);
        assert_eq!(trap.armed_at, TimePoint::from_millis(1_250));
        assert_eq!(trap.expires_at, TimePoint::from_millis(11_000));
    }

    #[test]
    fn test_requires_crit() {
        let mut host = host();
        let mut traps = TrapSystem::new();
        let hit = HitData::weapon(OWNER, ENEMY, FormId::new(1), 10.0);
        let mut ctx = ActionContext::new(&mut host, OWNER, ENEMY, Some(&hit), TimePoint::ZERO);
        assert_eq!(
            execute_spawn_trap(&mut ctx, AffixToken::from_id("snare"), &spec(), &mut traps, 24),
            ExecOutcome::Skipped("not a crit or power attack")
        );
        assert!(traps.is_empty());
    }
}
