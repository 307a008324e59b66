//! Trap system.
//!
//! Traps are spawned by the `SpawnTrap` action and driven by a low-frequency
//! poll. Each trap moves through:
//!
//! ```text
//! Created --(armed_at)--> Armed --(hostile in radius)--> Triggered
//!                           ^                                |
//!                           +------(rearm delay, budget)-----+--> Removed
//! ```
//!
//! A trap is also removed at `expires_at` or as soon as its owner stops
//! resolving. Caps are enforced oldest-first: per affix on spawn, and
//! globally on spawn and on every tick.

use smallvec::SmallVec;
use tracing::debug;

use crate::core::{ActorId, AffixToken, SpellId, TimePoint};
use crate::host::{CastRequest, Host, Position};

/// Victims hit per trap trigger.
pub const TRAP_MAX_VICTIMS: usize = 8;

/// One live trap.
#[derive(Clone, Debug, PartialEq)]
pub struct TrapInstance {
    pub id: u64,
    pub source_token: AffixToken,
    pub owner: ActorId,
    pub position: Position,
    pub radius: f32,
    pub spells: SmallVec<[SpellId; 2]>,
    pub magnitude: Option<f32>,
    pub created_at: TimePoint,
    pub armed_at: TimePoint,
    pub expires_at: TimePoint,
    pub rearm_delay_ms: u64,
    /// Zero means unlimited.
    pub max_triggers: u32,
    pub triggered_count: u32,
}

impl TrapInstance {
    /// True once `armed_at` has passed.
    #[must_use]
    pub fn is_armed(&self, now: TimePoint) -> bool {
        now >= self.armed_at
    }

    /// True at or after `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: TimePoint) -> bool {
        now >= self.expires_at
    }

    fn can_rearm(&self) -> bool {
        self.rearm_delay_ms > 0 && (self.max_triggers == 0 || self.triggered_count < self.max_triggers)
    }
}

/// Summary of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrapTick {
    pub triggered: usize,
    pub removed: usize,
}

/// All live traps, oldest first.
#[derive(Clone, Debug, Default)]
pub struct TrapSystem {
    traps: Vec<TrapInstance>,
    next_id: u64,
}

impl TrapSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trap, evicting the oldest trap of the same affix past
    /// `max_active` and the oldest trap overall past `global_cap`.
    /// Zero disables either cap. Returns the new trap's id.
    pub fn spawn(&mut self, mut trap: TrapInstance, max_active: usize, global_cap: usize) -> u64 {
        if max_active > 0 {
            while self.count_for(trap.source_token) >= max_active {
                let Some(pos) = self.traps.iter().position(|t| t.source_token == trap.source_token) else {
                    break;
                };
                let evicted = self.traps.remove(pos);
                debug!(trap = evicted.id, "evicted oldest trap for affix");
            }
        }
        if global_cap > 0 {
            while self.traps.len() >= global_cap {
                let evicted = self.traps.remove(0);
                debug!(trap = evicted.id, "evicted oldest trap (global cap)");
            }
        }

        self.next_id += 1;
        trap.id = self.next_id;
        self.traps.push(trap);
        self.next_id
    }

    /// Advance every trap to `now`.
    pub fn tick(&mut self, host: &mut dyn Host, now: TimePoint, global_cap: usize) -> TrapTick {
        let mut summary = TrapTick::default();
        let before = self.traps.len();

        self.traps.retain_mut(|trap| {
            if trap.is_expired(now) || !host.is_valid(trap.owner) {
                return false;
            }
            if !trap.is_armed(now) {
                return true;
            }

            let victims = trap_victims(&*host, trap);
            if victims.is_empty() {
                return true;
            }

            for &victim in &victims {
                for &spell in &trap.spells {
                    host.cast_spell(&CastRequest {
                        spell,
                        caster: trap.owner,
                        target: victim,
                        magnitude: trap.magnitude,
                    });
                }
            }
            trap.triggered_count += 1;
            summary.triggered += 1;

            if trap.can_rearm() {
                trap.armed_at = now.after(trap.rearm_delay_ms);
                true
            } else {
                false
            }
        });

        if global_cap > 0 && self.traps.len() > global_cap {
            let excess = self.traps.len() - global_cap;
            self.traps.drain(..excess);
        }

        summary.removed = before - self.traps.len();
        summary
    }

    /// Remove every trap.
    pub fn clear(&mut self) {
        self.traps.clear();
    }

    /// Number of live traps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.traps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }

    /// Live traps spawned by the affix with `token`.
    #[must_use]
    pub fn count_for(&self, token: AffixToken) -> usize {
        self.traps.iter().filter(|t| t.source_token == token).count()
    }

    /// Live traps, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TrapInstance> {
        self.traps.iter()
    }
}

fn trap_victims(host: &dyn Host, trap: &TrapInstance) -> Vec<ActorId> {
    let r2 = trap.radius * trap.radius;
    let mut victims: Vec<(ActorId, f32)> = host
        .actors_near(trap.position, trap.radius)
        .into_iter()
        .filter(|&a| a != trap.owner && host.is_valid(a) && !host.is_dead(a))
        .filter(|&a| host.is_hostile_either(trap.owner, a))
        .filter_map(|a| {
            let d = host.position(a)?.distance_squared(trap.position);
            (d <= r2).then_some((a, d))
        })
        .collect();
    victims.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    victims.truncate(TRAP_MAX_VICTIMS);
    victims.into_iter().map(|(a, _)| a).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_host::RecordingHost;
    use smallvec::smallvec;

    const OWNER: ActorId = ActorId(0x14);
    const ENEMY: ActorId = ActorId(0x700);

    fn trap(token: &str, created: u64) -> TrapInstance {
        TrapInstance {
            id: 0,
            source_token: AffixToken::from_id(token),
            owner: OWNER,
            position: Position::new(0.0, 0.0, 0.0),
            radius: 5.0,
            spells: smallvec![SpellId::new(0x99)],
            magnitude: Some(20.0),
            created_at: TimePoint::from_millis(created),
            armed_at: TimePoint::from_millis(created + 500),
            expires_at: TimePoint::from_millis(created + 10_000),
            rearm_delay_ms: 0,
            max_triggers: 1,
            triggered_count: 0,
        }
    }

    fn host_with_enemy() -> RecordingHost {
        let mut host = RecordingHost::with_player(OWNER);
        host.place(ENEMY, 2.0);
        host.hostile.insert(ENEMY);
        host
    }

    #[test]
    fn test_per_affix_cap_evicts_oldest() {
        let mut traps = TrapSystem::new();
        let first = traps.spawn(trap("a", 0), 2, 0);
        traps.spawn(trap("a", 1), 2, 0);
        traps.spawn(trap("b", 2), 2, 0);
        traps.spawn(trap("a", 3), 2, 0);

        assert_eq!(traps.count_for(AffixToken::from_id("a")), 2);
        assert_eq!(traps.len(), 3);
        assert!(traps.iter().all(|t| t.id != first));
    }

    #[test]
    fn test_global_cap_evicts_oldest() {
        let mut traps = TrapSystem::new();
        for i in 0..5 {
            traps.spawn(trap(&format!("t{i}"), i), 0, 3);
        }
        assert_eq!(traps.len(), 3);
        let created: Vec<u64> = traps.iter().map(|t| t.created_at.as_millis()).collect();
        assert_eq!(created, vec![2, 3, 4]);
    }

    #[test]
    fn test_unarmed_trap_waits() {
        let mut host = host_with_enemy();
        let mut traps = TrapSystem::new();
        traps.spawn(trap("a", 0), 0, 0);

        let tick = traps.tick(&mut host, TimePoint::from_millis(100), 0);
        assert_eq!(tick, TrapTick::default());
        assert!(host.casts.is_empty());
    }

    #[test]
    fn test_single_use_trap_removed_after_trigger() {
        let mut host = host_with_enemy();
        let mut traps = TrapSystem::new();
        traps.spawn(trap("a", 0), 0, 0);

        let tick = traps.tick(&mut host, TimePoint::from_millis(600), 0);
        assert_eq!(tick, TrapTick { triggered: 1, removed: 1 });
        assert_eq!(host.casts.len(), 1);
        assert_eq!(host.casts[0].target, ENEMY);
        assert_eq!(host.casts[0].magnitude, Some(20.0));
        assert!(traps.is_empty());
    }

    #[test]
    fn test_rearming_trap() {
        let mut host = host_with_enemy();
        let mut traps = TrapSystem::new();
        let mut t = trap("a", 0);
        t.rearm_delay_ms = 1_000;
        t.max_triggers = 2;
        traps.spawn(t, 0, 0);

        assert_eq!(traps.tick(&mut host, TimePoint::from_millis(600), 0).triggered, 1);
        assert_eq!(traps.tick(&mut host, TimePoint::from_millis(1_000), 0).triggered, 0);
        let second = traps.tick(&mut host, TimePoint::from_millis(1_600), 0);
        assert_eq!(second, TrapTick { triggered: 1, removed: 1 });
        assert_eq!(host.casts.len(), 2);
    }

    #[test]
    fn test_expiry_and_invalid_owner() {
        let mut host = RecordingHost::with_player(OWNER);
        let mut traps = TrapSystem::new();
        traps.spawn(trap("a", 0), 0, 0);
        assert_eq!(traps.tick(&mut host, TimePoint::from_millis(10_000), 0).removed, 1);

        traps.spawn(trap("b", 0), 0, 0);
        host.invalid.insert(OWNER);
        assert_eq!(traps.tick(&mut host, TimePoint::from_millis(600), 0).removed, 1);
    }

    #[test]
    fn test_tick_enforces_global_cap() {
        let mut host = RecordingHost::with_player(OWNER);
        let mut traps = TrapSystem::new();
        for i in 0..4 {
            traps.spawn(trap(&format!("t{i}"), i), 0, 0);
        }
        let tick = traps.tick(&mut host, TimePoint::from_millis(10), 2);
        assert_eq!(tick.removed, 2);
        assert_eq!(traps.len(), 2);
    }
}
