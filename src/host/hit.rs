//! Hit data snapshot.

use crate::core::{ActorId, FormId};

use super::Position;

/// What the host knows about one physical hit.
///
/// The damage-apply callback can hand the engine a stale copy of this (the
/// last real hit's data reused for a damage-over-time tick), so the router
/// validates it before treating a damage event as a hit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HitData {
    /// `ActorId::NONE` when the hit has no aggressor.
    pub aggressor: ActorId,
    pub target: ActorId,
    pub weapon: FormId,
    pub spell: FormId,
    pub critical: bool,
    pub power_attack: bool,
    pub melee: bool,
    pub explosion: bool,
    pub physical_dealt: f32,
    pub total_dealt: f32,
    pub position: Position,
    pub direction: Position,
}

impl HitData {
    /// A melee weapon hit dealing `physical` damage.
    #[must_use]
    pub fn weapon(aggressor: ActorId, target: ActorId, weapon: FormId, physical: f32) -> Self {
        Self {
            aggressor,
            target,
            weapon,
            melee: true,
            physical_dealt: physical,
            total_dealt: physical,
            ..Default::default()
        }
    }

    /// A spell hit dealing `damage`.
    #[must_use]
    pub fn spell(aggressor: ActorId, target: ActorId, spell: FormId, damage: f32) -> Self {
        Self {
            aggressor,
            target,
            spell,
            total_dealt: damage,
            ..Default::default()
        }
    }

    /// Mark as a critical hit (builder pattern).
    #[must_use]
    pub fn with_critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Mark as a power attack (builder pattern).
    #[must_use]
    pub fn with_power_attack(mut self) -> Self {
        self.power_attack = true;
        self
    }

    /// Set the hit position (builder pattern).
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// The spell if any, else the weapon.
    #[must_use]
    pub fn source(&self) -> FormId {
        if self.spell.is_valid() {
            self.spell
        } else {
            self.weapon
        }
    }

    /// True if the data names something that can actually hit.
    #[must_use]
    pub fn is_hit_like(&self) -> bool {
        self.weapon.is_valid() || self.spell.is_valid() || self.melee || self.explosion
    }

    /// True for weapon hits.
    #[must_use]
    pub fn is_weapon_hit(&self) -> bool {
        self.weapon.is_valid() || self.melee
    }

    /// True for crits and power attacks.
    #[must_use]
    pub fn is_crit_or_power_attack(&self) -> bool {
        self.critical || self.power_attack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_prefers_spell() {
        let mut hit = HitData::weapon(ActorId::new(1), ActorId::new(2), FormId::new(10), 12.0);
        assert_eq!(hit.source(), FormId::new(10));
        hit.spell = FormId::new(20);
        assert_eq!(hit.source(), FormId::new(20));
    }

    #[test]
    fn test_hit_like_markers() {
        assert!(!HitData::default().is_hit_like());
        let mut hit = HitData::default();
        hit.explosion = true;
        assert!(hit.is_hit_like());
        assert!(!hit.is_weapon_hit());
    }
}
