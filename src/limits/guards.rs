//! Trigger guards: duplicate-hit suppression, cooldown resolution, resync
//! throttling and log throttling.

use rustc_hash::FxHashMap;

use crate::core::{ActorId, FormId, TimePoint};

/// Identity of one physical hit as seen by the dispatch paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DuplicateHitKey {
    /// True for hits dealt by the player side.
    pub outgoing: bool,
    pub aggressor: ActorId,
    pub target: ActorId,
    /// Weapon or spell that produced the hit.
    pub source: FormId,
}

/// True iff `current == last` and `now_ms - last_ms` lies in `[0, window_ms)`.
#[must_use]
pub fn should_suppress_duplicate_hit_window(
    current: &DuplicateHitKey,
    last: &DuplicateHitKey,
    now_ms: u64,
    last_ms: u64,
    window_ms: u64,
) -> bool {
    current == last && now_ms >= last_ms && (now_ms - last_ms) < window_ms
}

/// Remembers the last dispatched hit and suppresses an identical re-delivery.
#[derive(Clone, Debug, Default)]
pub struct DuplicateHitFilter {
    last: Option<(DuplicateHitKey, TimePoint)>,
}

impl DuplicateHitFilter {
    /// Returns `true` if `key` repeats the last hit within `window_ms`.
    /// Otherwise records `key` as the last hit and returns `false`.
    pub fn check_and_record(&mut self, key: DuplicateHitKey, now: TimePoint, window_ms: u64) -> bool {
        if let Some((last, at)) = &self.last {
            if should_suppress_duplicate_hit_window(&key, last, now.as_millis(), at.as_millis(), window_ms) {
                return true;
            }
        }
        self.last = Some((key, now));
        false
    }

    /// Forget the last hit.
    pub fn clear(&mut self) {
        self.last = None;
    }
}

/// Effective global cooldown for a successful proc.
///
/// - A configured ICD is used verbatim.
/// - With only a per-target ICD, the global ICD is zero.
/// - A guaranteed proc (chance >= 100) with no cooldown at all gets
///   `zero_icd_safety_guard_ms`.
#[must_use]
pub fn resolve_trigger_proc_cooldown_ms(
    configured_icd_ms: u64,
    has_per_target_icd: bool,
    effective_chance_pct: f32,
    zero_icd_safety_guard_ms: u64,
) -> u64 {
    if configured_icd_ms > 0 {
        return configured_icd_ms;
    }
    if has_per_target_icd {
        return 0;
    }
    if effective_chance_pct >= 100.0 {
        return zero_icd_safety_guard_ms;
    }
    0
}

/// Next-allowed-tick throttle for periodic work.
#[derive(Clone, Debug, Default)]
pub struct ResyncScheduler {
    next_allowed: Option<TimePoint>,
}

impl ResyncScheduler {
    /// New scheduler; the first poll is always due.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true (and schedules the next run) if work is due at `now`.
    pub fn poll(&mut self, now: TimePoint, interval_ms: u64) -> bool {
        if self.next_allowed.is_some_and(|next| now < next) {
            return false;
        }
        self.next_allowed = Some(now.after(interval_ms));
        true
    }

    /// Push the next run out to `now + interval_ms` (after an out-of-band resync).
    pub fn defer(&mut self, now: TimePoint, interval_ms: u64) {
        self.next_allowed = Some(now.after(interval_ms));
    }

    /// Make the next poll due immediately.
    pub fn reset(&mut self) {
        self.next_allowed = None;
    }
}

/// Rate limits repeated log lines by reason.
#[derive(Clone, Debug, Default)]
pub struct LogThrottle {
    last: FxHashMap<&'static str, TimePoint>,
}

impl LogThrottle {
    /// Create an empty throttle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a line for `reason` may be emitted now.
    pub fn allow(&mut self, reason: &'static str, now: TimePoint, interval_ms: u64) -> bool {
        match self.last.get(reason) {
            Some(&at) if now.since(at).is_some_and(|e| e < interval_ms) => false,
            _ => {
                self.last.insert(reason, now);
                true
            }
        }
    }
}
