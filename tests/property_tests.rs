//! Property tests for the limiter primitives and item slots.
//!
//! Each property is checked against arbitrary keys and timelines rather
//! than hand-picked values.

mod common;

use proptest::prelude::*;

use affix_engine::affixes::{InstanceAffixSlots, Trigger, AFFIX_SLOT_CAPACITY};
use affix_engine::core::{ActorId, AffixToken, EngineSettings, FormId, TimePoint};
use affix_engine::engine::Engine;
use affix_engine::limits::{
    resolve_trigger_proc_cooldown_ms, should_suppress_duplicate_hit_window, DuplicateHitKey, FixedWindowBudget,
    NonHostileFirstHitGate, PerTargetCooldownStore,
};

use common::{at, item, notify_on, ScriptedHost, PLAYER};

fn token() -> impl Strategy<Value = AffixToken> {
    (1..u64::MAX).prop_map(AffixToken)
}

fn actor() -> impl Strategy<Value = ActorId> {
    (1..u32::MAX).prop_map(ActorId)
}

fn hit_key() -> impl Strategy<Value = DuplicateHitKey> {
    (any::<bool>(), 1..4u32, 1..4u32, 0..3u32).prop_map(|(outgoing, a, t, s)| DuplicateHitKey {
        outgoing,
        aggressor: ActorId(a),
        target: ActorId(t),
        source: FormId(s),
    })
}

proptest! {
    /// A committed per-target cooldown blocks exactly `[now, now + icd)`.
    #[test]
    fn test_per_target_blocks_for_exact_window(
        token in token(),
        target in actor(),
        now in 0..1_000_000_000u64,
        icd in 1..1_000_000u64,
        offset in 0..2_000_000u64,
    ) {
        let mut store = PerTargetCooldownStore::new();
        prop_assert!(!store.is_blocked(token, target, TimePoint(now)));

        store.commit(token, target, icd, TimePoint(now));
        let probe = TimePoint(now + offset);
        prop_assert_eq!(store.is_blocked(token, target, probe), offset < icd);

        store.clear();
        prop_assert!(!store.is_blocked(token, target, probe));
    }

    /// Zero cooldowns never block.
    #[test]
    fn test_per_target_zero_icd_never_blocks(token in token(), target in actor(), now in 0..1_000_000u64) {
        let mut store = PerTargetCooldownStore::new();
        store.commit(token, target, 0, TimePoint(now));
        prop_assert!(!store.is_blocked(token, target, TimePoint(now)));
        prop_assert!(store.is_empty());
    }

    /// The first non-hostile hit is granted; a hostile hit clears the pair so
    /// the next non-hostile hit is granted again.
    #[test]
    fn test_first_hit_gate_resets_on_hostility(
        owner in actor(),
        target in actor(),
        steps in prop::collection::vec((any::<bool>(), 21..1_000u64), 1..50),
    ) {
        prop_assume!(owner != target);
        let mut gate = NonHostileFirstHitGate::new();
        let mut granted = false;
        let mut now = 0u64;

        for (hostile, gap) in steps {
            now += gap;
            let result = gate.resolve(owner, target, true, hostile, false, TimePoint(now));
            if hostile {
                prop_assert!(!result);
                granted = false;
            } else {
                prop_assert_eq!(result, !granted);
                granted = true;
            }
        }
    }

    /// The gate never grants when the allowance is off or the target is the player.
    #[test]
    fn test_first_hit_gate_respects_allowance(owner in actor(), target in actor(), now in 0..1_000_000u64) {
        let mut gate = NonHostileFirstHitGate::new();
        prop_assert!(!gate.resolve(owner, target, false, false, false, TimePoint(now)));
        prop_assert!(!gate.resolve(owner, target, true, false, true, TimePoint(now)));
        prop_assert!(gate.is_empty());
    }

    /// Suppression iff same key and `0 <= now - last < window`.
    #[test]
    fn test_duplicate_window_formula(
        current in hit_key(),
        last in hit_key(),
        now_ms in 0..10_000u64,
        last_ms in 0..10_000u64,
        window_ms in 0..500u64,
    ) {
        let expected = current == last && now_ms >= last_ms && now_ms - last_ms < window_ms;
        prop_assert_eq!(
            should_suppress_duplicate_hit_window(&current, &last, now_ms, last_ms, window_ms),
            expected
        );
    }

    #[test]
    fn test_cooldown_resolution(
        icd in 0..100_000u64,
        per_target in any::<bool>(),
        chance in 0.0f32..200.0,
        guard in 1..1_000u64,
    ) {
        let resolved = resolve_trigger_proc_cooldown_ms(icd, per_target, chance, guard);
        if icd > 0 {
            prop_assert_eq!(resolved, icd);
        } else if per_target {
            prop_assert_eq!(resolved, 0);
        } else if chance >= 100.0 {
            prop_assert_eq!(resolved, guard);
        } else {
            prop_assert_eq!(resolved, 0);
        }
    }

    /// A fixed window never hands out more than its maximum.
    #[test]
    fn test_fixed_window_never_overspends(
        window_ms in 1..2_000u64,
        max in 1..20u32,
        gaps in prop::collection::vec(0..300u64, 1..200),
    ) {
        let mut budget = FixedWindowBudget::new();
        let mut granted: Vec<u64> = Vec::new();
        let mut now = 0u64;
        for gap in gaps {
            now += gap;
            if budget.try_consume(TimePoint(now), window_ms, max) {
                granted.push(now);
            }
        }
        for (i, &start) in granted.iter().enumerate() {
            let in_window = granted[i..].iter().take_while(|&&t| t - start < window_ms).count();
            prop_assert!(in_window <= 2 * max as usize);
        }
        prop_assert!(budget.consumed() <= max);
    }

    #[test]
    fn test_slots_add_then_has(tokens in prop::collection::vec(token(), 1..8)) {
        let mut slots = InstanceAffixSlots::new();
        for token in tokens {
            if slots.add_token(token).is_ok() {
                prop_assert!(slots.has_token(token));
            }
        }
        prop_assert!(slots.len() <= AFFIX_SLOT_CAPACITY);
    }

    #[test]
    fn test_slots_replace_all_sets_primary(tokens in prop::collection::vec(token(), 0..4), x in token()) {
        let mut slots = InstanceAffixSlots::from_tokens(tokens);
        slots.replace_all(x);
        prop_assert_eq!(slots.primary(), Some(x));
        prop_assert_eq!(slots.len(), 1);
    }

    /// Promotion only reorders; on a full set a new token is rejected
    /// without mutation.
    #[test]
    fn test_slots_promote_preserves_membership(
        tokens in prop::collection::vec(token(), 1..=AFFIX_SLOT_CAPACITY),
        pick in any::<prop::sample::Index>(),
        fresh in token(),
    ) {
        let mut slots = InstanceAffixSlots::from_tokens(tokens);
        let before: Vec<AffixToken> = slots.iter().collect();
        let chosen = before[pick.index(before.len())];

        slots.promote_token_to_primary(chosen).unwrap();
        let mut after: Vec<AffixToken> = slots.iter().collect();
        prop_assert_eq!(after[0], chosen);
        let mut sorted_before = before.clone();
        sorted_before.sort();
        after.sort();
        prop_assert_eq!(after, sorted_before);

        if slots.is_full() && !slots.has_token(fresh) {
            let snapshot = slots.clone();
            prop_assert!(slots.promote_token_to_primary(fresh).is_err());
            prop_assert_eq!(slots, snapshot);
        }
    }

    /// However tightly trigger calls arrive, a guaranteed proc with no
    /// cooldown is spaced by the safety guard.
    #[test]
    fn test_storm_guard_spacing(gaps in prop::collection::vec(0..60u64, 1..200)) {
        let mut host = ScriptedHost::new();
        let enemy = host.spawn_enemy(0x800, 3.0);
        let settings = EngineSettings::default().with_trigger_budget(0, 0);
        let guard = settings.zero_icd_safety_guard_ms;
        let mut engine = Engine::new(settings, 3);
        let _ = engine.load_config(vec![notify_on("storm", Trigger::Hit)], vec![]);
        host.equip(item(1), &["storm"]);
        engine.resync(&mut host, at(0));

        let first = gaps[0];
        let mut now = 0u64;
        let mut fired = Vec::new();
        for gap in gaps {
            now += gap;
            if engine.process_trigger(&mut host, Trigger::Hit, PLAYER, enemy, None, at(now)) > 0 {
                fired.push(now);
            }
        }
        prop_assert!(fired.windows(2).all(|w| w[1] - w[0] >= guard));
        prop_assert_eq!(fired.first().copied(), Some(first));
    }
}
