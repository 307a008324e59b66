//! Spell-cast executors.

use tracing::debug;

use crate::affixes::{AdaptiveElementSpec, CastSpellSpec, CastTarget, MagnitudeScaling};
use crate::core::{ActorId, SpellId};
use crate::host::CastRequest;

use super::magnitude::{scaled_magnitude, select_adaptive_element};
use super::{ActionContext, ExecOutcome};

fn resolve_target(ctx: &ActionContext<'_>, target: CastTarget) -> ActorId {
    match target {
        CastTarget::Target => ctx.target,
        CastTarget::Owner => ctx.owner,
    }
}

/// Magnitude override for `spell`, or `None` to cast at the spell's own value.
fn magnitude_override(
    ctx: &ActionContext<'_>,
    scaling: Option<&MagnitudeScaling>,
    spell: SpellId,
    multiplier: f32,
) -> Option<f32> {
    let has_multiplier = (multiplier - 1.0).abs() > f32::EPSILON;
    match scaling {
        Some(scaling) => {
            let base = ctx.host.spell_base_magnitude(spell);
            Some(scaled_magnitude(scaling, ctx.hit, base) * multiplier)
        }
        None if has_multiplier => ctx.host.spell_base_magnitude(spell).map(|m| m * multiplier),
        None => None,
    }
}

/// Cast `spell` (already picked from the mode cycle) using `spec`'s target
/// and scaling. `multiplier` is the evolution multiplier.
pub fn execute_cast_spell(
    ctx: &mut ActionContext<'_>,
    spec: &CastSpellSpec,
    spell: SpellId,
    multiplier: f32,
) -> ExecOutcome {
    if !spell.is_valid() {
        debug!("cast skipped: no spell");
        return ExecOutcome::Skipped("no spell");
    }
    let target = resolve_target(ctx, spec.target);
    if !target.is_valid() {
        debug!(%spell, "cast skipped: no target");
        return ExecOutcome::Skipped("no target");
    }

    let magnitude = magnitude_override(ctx, spec.scaling.as_ref(), spell, multiplier);
    ctx.host.cast_spell(&CastRequest {
        spell,
        caster: ctx.owner,
        target,
        magnitude,
    });
    ExecOutcome::Executed
}

/// Cast the element spell best matching the target's resistances.
pub fn execute_adaptive_element(ctx: &mut ActionContext<'_>, spec: &AdaptiveElementSpec) -> ExecOutcome {
    let target = resolve_target(ctx, spec.target);
    if !target.is_valid() {
        debug!("adaptive cast skipped: no target");
        return ExecOutcome::Skipped("no target");
    }

    // Resistances are read from the enemy even when the spell lands on the owner
    let probe = if ctx.target.is_valid() { ctx.target } else { target };
    let element = select_adaptive_element(&ctx.host.resistances(probe), spec.mode);
    let spell = spec.spells.get(element);
    if !spell.is_valid() {
        return ExecOutcome::Skipped("no spell");
    }

    let magnitude = magnitude_override(ctx, spec.scaling.as_ref(), spell, 1.0);
    ctx.host.cast_spell(&CastRequest {
        spell,
        caster: ctx.owner,
        target,
        magnitude,
    });
    ExecOutcome::Executed
}
