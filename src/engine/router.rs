//! Health-damage router.
//!
//! The host's damage-apply callback fires for every source of damage, and
//! often hands over the hit data of the *last real hit* even when the
//! current damage is a DoT tick or scripted. [`HealthDamageRouter::route`]
//! decides whether one damage event is a genuine hit:
//!
//! 1. The hit data must name this target and this attacker.
//! 2. It must carry a hit-like source (weapon, spell, melee, explosion).
//! 3. Damage far below what the hit data promised is a stale snapshot.
//! 4. The same signature seen within the window is a re-delivery.

use rustc_hash::FxHashMap;

use crate::core::{ActorId, Fnv1a, FormId, TimePoint};
use crate::host::HitData;

/// Stale check only applies when the hit promised at least this much.
pub const STALE_MIN_EXPECTED_DAMAGE: f32 = 5.0;

/// Damage below this share of the expected value is stale.
pub const STALE_DAMAGE_RATIO: f32 = 0.25;

/// Signature map size that triggers a sweep.
const SIGNATURE_PRUNE_THRESHOLD: usize = 256;

/// Why a damage event was not routed as a hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteRejection {
    NoHitData,
    AttributionMismatch,
    NotHitLike,
    StaleMagnitude,
    DuplicateSignature,
}

/// Signature of one damage delivery.
#[must_use]
pub fn hit_signature(attacker: ActorId, target: ActorId, source: FormId, damage: f32, hit: &HitData) -> u64 {
    Fnv1a::new()
        .u32(attacker.raw())
        .u32(target.raw())
        .u32(source.raw())
        .f32(damage)
        .f32(hit.position.x)
        .f32(hit.position.y)
        .f32(hit.position.z)
        .f32(hit.direction.x)
        .f32(hit.direction.y)
        .f32(hit.direction.z)
        .finish()
}

/// Filters damage events down to genuine hits.
#[derive(Clone, Debug, Default)]
pub struct HealthDamageRouter {
    signatures: FxHashMap<u64, TimePoint>,
}

impl HealthDamageRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether this damage event is a hit. Accepted signatures are
    /// remembered for `window_ms`.
    #[allow(clippy::too_many_arguments)]
    pub fn route(
        &mut self,
        target: ActorId,
        attacker: ActorId,
        hit: Option<&HitData>,
        source: FormId,
        damage: f32,
        now: TimePoint,
        window_ms: u64,
    ) -> Result<(), RouteRejection> {
        let hit = hit.ok_or(RouteRejection::NoHitData)?;

        if hit.target != target || hit.aggressor != attacker {
            return Err(RouteRejection::AttributionMismatch);
        }
        if !hit.is_hit_like() {
            return Err(RouteRejection::NotHitLike);
        }

        let expected = hit.total_dealt;
        if expected >= STALE_MIN_EXPECTED_DAMAGE && damage < expected * STALE_DAMAGE_RATIO {
            return Err(RouteRejection::StaleMagnitude);
        }

        let signature = hit_signature(attacker, target, source, damage, hit);
        if self
            .signatures
            .get(&signature)
            .is_some_and(|&at| now.since(at).is_some_and(|elapsed| elapsed < window_ms))
        {
            return Err(RouteRejection::DuplicateSignature);
        }

        if self.signatures.len() >= SIGNATURE_PRUNE_THRESHOLD {
            self.signatures
                .retain(|_, at| now.since(*at).is_some_and(|elapsed| elapsed < window_ms));
        }
        self.signatures.insert(signature, now);
        Ok(())
    }

    /// Forget every signature.
    pub fn clear(&mut self) {
        self.signatures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER: ActorId = ActorId(0x14);
    const ENEMY: ActorId = ActorId(0x500);
    const SWORD: FormId = FormId(0x1000);

    fn route(router: &mut HealthDamageRouter, hit: &HitData, damage: f32, at: u64) -> Result<(), RouteRejection> {
        router.route(ENEMY, PLAYER, Some(hit), SWORD, damage, TimePoint::from_millis(at), 300)
    }

    #[test]
    fn test_accepts_fresh_hit() {
        let mut router = HealthDamageRouter::new();
        let hit = HitData::weapon(PLAYER, ENEMY, SWORD, 40.0);
        assert_eq!(route(&mut router, &hit, 40.0, 0), Ok(()));
    }

    #[test]
    fn test_rejects_mismatched_attribution() {
        let mut router = HealthDamageRouter::new();
        let hit = HitData::weapon(PLAYER, ActorId::new(0x501), SWORD, 40.0);
        assert_eq!(route(&mut router, &hit, 40.0, 0), Err(RouteRejection::AttributionMismatch));
        assert_eq!(
            router.route(ENEMY, PLAYER, None, SWORD, 40.0, TimePoint::ZERO, 300),
            Err(RouteRejection::NoHitData)
        );
    }

    #[test]
    fn test_rejects_scripted_damage() {
        let mut router = HealthDamageRouter::new();
        let hit = HitData {
            aggressor: PLAYER,
            target: ENEMY,
            total_dealt: 40.0,
            ..Default::default()
        };
        assert_eq!(route(&mut router, &hit, 40.0, 0), Err(RouteRejection::NotHitLike));
    }

    #[test]
    fn test_stale_magnitude_heuristic() {
        let mut router = HealthDamageRouter::new();
        let hit = HitData::weapon(PLAYER, ENEMY, SWORD, 40.0);
        // A 3-point DoT tick reusing a 40-point hit snapshot
        assert_eq!(route(&mut router, &hit, 3.0, 0), Err(RouteRejection::StaleMagnitude));
        assert_eq!(route(&mut router, &hit, 10.0, 0), Ok(()));

        // Small expected values are never considered stale
        let tiny = HitData::weapon(PLAYER, ENEMY, SWORD, 4.0);
        assert_eq!(route(&mut router, &tiny, 0.5, 1_000), Ok(()));
    }

    #[test]
    fn test_signature_dedupe_window() {
        let mut router = HealthDamageRouter::new();
        let hit = HitData::weapon(PLAYER, ENEMY, SWORD, 40.0);
        assert_eq!(route(&mut router, &hit, 40.0, 1_000), Ok(()));
        assert_eq!(route(&mut router, &hit, 40.0, 1_050), Err(RouteRejection::DuplicateSignature));
        assert_eq!(route(&mut router, &hit, 40.0, 1_300), Ok(()));
        // A different damage value is a different signature
        assert_eq!(route(&mut router, &hit, 39.0, 1_310), Ok(()));
    }
}
