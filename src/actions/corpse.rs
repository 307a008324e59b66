//! Corpse explosion budget and targeting.
//!
//! Every corpse explosion, regardless of which affix produced it, draws
//! from one [`CorpseExplosionBudget`]:
//!
//! 1. A corpse explodes at most once per [`CORPSE_DEDUPE_TTL_MS`], no matter
//!    how many event paths report its death.
//! 2. At most `max_per_window` explosions per `window_ms`, never more than
//!    [`CORPSE_EXPLOSION_HARD_CAP`].
//! 3. An explosion within `chain_window_ms` of the owner's previous one
//!    continues the chain at depth + 1. Depth past `max_chain_depth` is
//!    denied. Damage falls off as `chain_falloff^depth`.

use rustc_hash::FxHashMap;

use crate::affixes::CorpseExplosionSpec;
use crate::core::{ActorId, TimePoint};
use crate::host::{Host, Position};
use crate::limits::FixedWindowBudget;

/// Absolute ceiling on explosions per window.
pub const CORPSE_EXPLOSION_HARD_CAP: u32 = 12;

/// How long a corpse stays "already exploded".
pub const CORPSE_DEDUPE_TTL_MS: u64 = 60_000;

/// Window used when a spec leaves `window_ms` at zero.
const FALLBACK_WINDOW_MS: u64 = 1_000;

/// Dedupe map size that triggers a sweep.
const CORPSE_PRUNE_THRESHOLD: usize = 256;

/// Why an explosion was denied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorpseDenial {
    /// This corpse already exploded.
    AlreadyExploded,
    /// The rate window is exhausted.
    RateLimited,
    /// The chain is already at its maximum depth.
    ChainCapped,
}

impl CorpseDenial {
    /// Short reason for logs.
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            CorpseDenial::AlreadyExploded => "corpse already exploded",
            CorpseDenial::RateLimited => "corpse explosion rate limit",
            CorpseDenial::ChainCapped => "corpse explosion chain depth",
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ChainState {
    last: TimePoint,
    depth: u32,
}

/// Shared budget for every corpse explosion.
#[derive(Clone, Debug, Default)]
pub struct CorpseExplosionBudget {
    exploded: FxHashMap<ActorId, TimePoint>,
    window: FixedWindowBudget,
    chains: FxHashMap<ActorId, ChainState>,
}

impl CorpseExplosionBudget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `corpse` exploded within the dedupe TTL.
    #[must_use]
    pub fn already_exploded(&self, corpse: ActorId, now: TimePoint) -> bool {
        self.exploded
            .get(&corpse)
            .is_some_and(|&at| now.within(at, CORPSE_DEDUPE_TTL_MS))
    }

    /// Consume budget for one explosion. Returns its chain depth.
    ///
    /// Nothing is recorded on denial.
    pub fn try_consume(
        &mut self,
        owner: ActorId,
        corpse: ActorId,
        spec: &CorpseExplosionSpec,
        now: TimePoint,
    ) -> Result<u32, CorpseDenial> {
        if self.exploded.len() > CORPSE_PRUNE_THRESHOLD {
            self.exploded.retain(|_, at| now.within(*at, CORPSE_DEDUPE_TTL_MS));
        }
        if self.already_exploded(corpse, now) {
            return Err(CorpseDenial::AlreadyExploded);
        }

        let depth = match self.chains.get(&owner) {
            Some(chain) if spec.chain_window_ms > 0 && now.within(chain.last, spec.chain_window_ms) => {
                chain.depth + 1
            }
            _ => 0,
        };
        if depth > spec.max_chain_depth {
            return Err(CorpseDenial::ChainCapped);
        }

        let window_ms = if spec.window_ms == 0 {
            FALLBACK_WINDOW_MS
        } else {
            spec.window_ms
        };
        let max = if spec.max_per_window == 0 {
            CORPSE_EXPLOSION_HARD_CAP
        } else {
            spec.max_per_window.min(CORPSE_EXPLOSION_HARD_CAP)
        };
        if !self.window.try_consume(now, window_ms, max) {
            return Err(CorpseDenial::RateLimited);
        }

        self.exploded.insert(corpse, now);
        self.chains.insert(owner, ChainState { last: now, depth });
        Ok(depth)
    }

    /// Forget every corpse, chain and window.
    pub fn clear(&mut self) {
        self.exploded.clear();
        self.chains.clear();
        self.window.reset();
    }
}

/// Damage after chain falloff.
#[must_use]
pub fn chained_damage(base: f32, falloff: f32, depth: u32) -> f32 {
    base * falloff.powi(depth.min(i32::MAX as u32) as i32)
}

/// Hostile, living actors within `radius` of `center`, closest first,
/// capped at `max_targets` (0 means no cap).
#[must_use]
pub fn explosion_targets(
    host: &dyn Host,
    owner: ActorId,
    corpse: ActorId,
    center: Position,
    radius: f32,
    max_targets: usize,
) -> Vec<ActorId> {
    let mut targets: Vec<(ActorId, f32)> = host
        .actors_near(center, radius)
        .into_iter()
        .filter(|&a| a != owner && a != corpse)
        .filter(|&a| host.is_valid(a) && !host.is_dead(a) && host.is_hostile_either(owner, a))
        .filter_map(|a| {
            let dist = host.position(a)?.distance_squared(center);
            (dist <= radius * radius).then_some((a, dist))
        })
        .collect();

    targets.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    if max_targets > 0 {
        targets.truncate(max_targets);
    }
    targets.into_iter().map(|(a, _)| a).collect()
}
