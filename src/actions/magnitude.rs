//! Magnitude scaling and adaptive element selection.

use crate::affixes::{AdaptiveMode, Element, MagnitudeScaling, MagnitudeSource};
use crate::host::{HitData, Resistances};

/// `clamp(base * mult + add, min, max)`, floored at the spell's own
/// magnitude when `spell_base_as_min` is set.
///
/// Sources that need hit data read zero without it.
#[must_use]
pub fn scaled_magnitude(scaling: &MagnitudeScaling, hit: Option<&HitData>, spell_base: Option<f32>) -> f32 {
    let base = match scaling.source {
        MagnitudeSource::None => 0.0,
        MagnitudeSource::HitPhysicalDealt => hit.map_or(0.0, |h| h.physical_dealt),
        MagnitudeSource::HitTotalDealt => hit.map_or(0.0, |h| h.total_dealt),
    };

    let mut value = (base * scaling.mult + scaling.add).max(scaling.min);
    if let Some(max) = scaling.max {
        value = value.min(max);
    }
    if scaling.spell_base_as_min {
        if let Some(floor) = spell_base {
            value = value.max(floor);
        }
    }
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn resist(res: &Resistances, element: Element) -> f32 {
    match element {
        Element::Fire => res.fire,
        Element::Frost => res.frost,
        Element::Shock => res.shock,
    }
}

/// Element the target resists least (or most), ties broken fire > frost > shock.
#[must_use]
pub fn select_adaptive_element(res: &Resistances, mode: AdaptiveMode) -> Element {
    let mut best = Element::PRIORITY[0];
    for &element in &Element::PRIORITY[1..] {
        let better = match mode {
            AdaptiveMode::WeakestResist => resist(res, element) < resist(res, best),
            AdaptiveMode::StrongestResist => resist(res, element) > resist(res, best),
        };
        if better {
            best = element;
        }
    }
    best
}
