//! Per-target cooldowns.
//!
//! Maps `(affix token, target)` to the earliest time the affix may proc on
//! that target again. Entries are advisory: a missing entry means "not on
//! cooldown", so the store can be pruned or cleared at any time.

use rustc_hash::FxHashMap;

use crate::core::{ActorId, AffixToken, TimePoint};

/// Entry count above which an insert may trigger a sweep.
pub const PER_TARGET_PRUNE_THRESHOLD: usize = 8192;

/// Minimum interval between two sweeps.
pub const PER_TARGET_PRUNE_INTERVAL_MS: u64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PerTargetKey {
    token: AffixToken,
    target: ActorId,
}

impl PerTargetKey {
    fn new(token: AffixToken, target: ActorId) -> Option<Self> {
        (token.is_valid() && target.is_valid()).then_some(Self { token, target })
    }
}

/// Cooldown store keyed by `(token, target)`.
#[derive(Clone, Debug, Default)]
pub struct PerTargetCooldownStore {
    next_allowed: FxHashMap<PerTargetKey, TimePoint>,
    last_prune: Option<TimePoint>,
}

impl PerTargetCooldownStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `token` may not proc on `target` yet.
    ///
    /// Invalid keys (zero token or zero target) never block.
    #[must_use]
    pub fn is_blocked(&self, token: AffixToken, target: ActorId, now: TimePoint) -> bool {
        let Some(key) = PerTargetKey::new(token, target) else {
            return false;
        };
        self.next_allowed
            .get(&key)
            .is_some_and(|&next| next > now)
    }

    /// Start a cooldown of `icd_ms` for `(token, target)`.
    pub fn commit(&mut self, token: AffixToken, target: ActorId, icd_ms: u64, now: TimePoint) {
        if icd_ms == 0 {
            return;
        }
        let Some(key) = PerTargetKey::new(token, target) else {
            return;
        };

        self.next_allowed.insert(key, now.after(icd_ms));

        if self.next_allowed.len() > PER_TARGET_PRUNE_THRESHOLD {
            let due = self
                .last_prune
                .map_or(true, |last| now.since(last).map_or(true, |e| e > PER_TARGET_PRUNE_INTERVAL_MS));
            if due {
                self.next_allowed.retain(|_, next| *next > now);
                self.last_prune = Some(now);
            }
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.next_allowed.clear();
        self.last_prune = None;
    }

    /// Number of stored entries (expired ones included until pruned).
    #[must_use]
    pub fn len(&self) -> usize {
        self.next_allowed.len()
    }

    /// True if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.next_allowed.is_empty()
    }
}
