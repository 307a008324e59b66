//! Non-hostile first-hit gate.
//!
//! When the host allows it, the first player-owned hit on a non-hostile
//! target may trigger outgoing procs. Later hits on the same target are
//! denied until the entry ages out, except for re-deliveries of the same
//! physical hit within a few milliseconds.

use rustc_hash::FxHashMap;

use crate::core::{ActorId, TimePoint};

/// Entries older than this are dropped.
pub const FIRST_HIT_TTL_MS: u64 = 120_000;

/// Hard cap on tracked pairs.
pub const FIRST_HIT_MAX_ENTRIES: usize = 8192;

/// A repeat within this window counts as the same hit.
pub const FIRST_HIT_REENTRY_WINDOW_MS: u64 = 20;

/// Interval between routine prunes.
pub const FIRST_HIT_PRUNE_INTERVAL_MS: u64 = 10_000;

/// Tracks `(owner, target)` pairs that already received their first-hit grant.
#[derive(Clone, Debug, Default)]
pub struct NonHostileFirstHitGate {
    granted_at: FxHashMap<(ActorId, ActorId), TimePoint>,
    last_prune: Option<TimePoint>,
}

impl NonHostileFirstHitGate {
    /// Create an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether this hit gets the non-hostile first-hit allowance.
    ///
    /// A hostile hit (either direction) clears the pair and is never granted.
    pub fn resolve(
        &mut self,
        owner: ActorId,
        target: ActorId,
        allow_non_hostile_outgoing: bool,
        hostile_either_direction: bool,
        target_is_player: bool,
        now: TimePoint,
    ) -> bool {
        if !owner.is_valid() || !target.is_valid() {
            return false;
        }
        let key = (owner, target);

        if hostile_either_direction {
            self.granted_at.remove(&key);
            return false;
        }
        if !allow_non_hostile_outgoing || target_is_player {
            return false;
        }

        self.maybe_prune(now);

        match self.granted_at.get_mut(&key) {
            None => {
                self.granted_at.insert(key, now);
                true
            }
            Some(stored) => {
                if now < *stored {
                    // Clock went backward; restart the grant
                    *stored = now;
                    return true;
                }
                now.within(*stored, FIRST_HIT_REENTRY_WINDOW_MS)
            }
        }
    }

    fn maybe_prune(&mut self, now: TimePoint) {
        let interval_due = self.last_prune.map_or(true, |last| {
            now.since(last).map_or(true, |e| e >= FIRST_HIT_PRUNE_INTERVAL_MS)
        });
        if !interval_due && self.granted_at.len() <= FIRST_HIT_MAX_ENTRIES {
            return;
        }
        self.last_prune = Some(now);

        self.granted_at
            .retain(|_, at| now.since(*at).map_or(true, |age| age <= FIRST_HIT_TTL_MS));

        while self.granted_at.len() > FIRST_HIT_MAX_ENTRIES {
            let oldest = self
                .granted_at
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(key, _)| *key);
            match oldest {
                Some(key) => {
                    self.granted_at.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.granted_at.clear();
        self.last_prune = None;
    }

    /// Number of tracked pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.granted_at.len()
    }

    /// True if no pairs are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.granted_at.is_empty()
    }
}
