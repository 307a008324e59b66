//! Engine settings.
//!
//! Hosts configure the engine at startup with [`EngineSettings`] and may
//! flip individual values at runtime through the engine's toggle methods.
//! Every field has a default, so a partially specified settings document
//! deserializes cleanly.

use serde::{Deserialize, Serialize};

/// How chatty the engine is toward the host's notification channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DebugVerbosity {
    /// No on-screen notifications (log lines only).
    #[default]
    Off,
    /// Notify on every successful proc.
    Procs,
    /// Also notify on budget denials and skipped executions.
    Verbose,
}

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Master switch. A disabled engine ignores every event.
    pub enabled: bool,

    /// Global multiplier applied to every affix proc chance.
    pub proc_chance_mult: f32,

    /// On-screen notification level.
    pub debug_verbosity: DebugVerbosity,

    /// Interval between periodic active-count rebuilds.
    pub resync_interval_ms: u64,

    /// Let the first hit on a non-hostile target trigger outgoing procs.
    pub allow_non_hostile_first_hit: bool,

    /// Minimum ICD applied to always-proc affixes with no configured cooldown.
    pub zero_icd_safety_guard_ms: u64,

    /// Global trigger budget window (0 disables the budget).
    pub trigger_budget_window_ms: u64,

    /// Procs allowed per budget window (0 disables the budget).
    pub trigger_budget_max_per_window: u32,

    /// Suppression window for the same hit arriving through two callbacks.
    pub duplicate_hit_window_ms: u64,

    /// Window in which an identical damage signature is treated as a re-delivery.
    pub hit_signature_window_ms: u64,

    /// Refresh cooldown per (target, effect) for damage-over-time applications.
    pub dot_refresh_cooldown_ms: u64,

    /// Maximum number of live traps across all affixes.
    pub trap_global_cap: usize,

    /// Minimum interval between identical budget-denial log lines.
    pub log_throttle_ms: u64,

    /// Loot-time affix rolling.
    pub loot: LootSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            proc_chance_mult: 1.0,
            debug_verbosity: DebugVerbosity::Off,
            resync_interval_ms: 5_000,
            allow_non_hostile_first_hit: false,
            zero_icd_safety_guard_ms: 120,
            trigger_budget_window_ms: 1_000,
            trigger_budget_max_per_window: 40,
            duplicate_hit_window_ms: 100,
            hit_signature_window_ms: 300,
            dot_refresh_cooldown_ms: 1_500,
            trap_global_cap: 24,
            log_throttle_ms: 2_000,
            loot: LootSettings::default(),
        }
    }
}

/// How many affixes a freshly looted item receives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootSettings {
    /// Chance that an eligible item gets any affix at all.
    pub affix_chance_pct: f32,
    /// Chance for each affix after the first.
    pub extra_affix_chance_pct: f32,
    /// Upper bound on rolled affixes (never above the slot capacity).
    pub max_affixes: usize,
    /// Upper bound on rolled suffixes.
    pub max_suffixes: usize,
}

impl Default for LootSettings {
    fn default() -> Self {
        Self {
            affix_chance_pct: 35.0,
            extra_affix_chance_pct: 25.0,
            max_affixes: 3,
            max_suffixes: 1,
        }
    }
}

impl EngineSettings {
    /// Default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global proc chance multiplier.
    #[must_use]
    pub fn with_proc_chance_mult(mut self, mult: f32) -> Self {
        self.proc_chance_mult = mult;
        self
    }

    /// Set the notification level.
    #[must_use]
    pub fn with_debug_verbosity(mut self, verbosity: DebugVerbosity) -> Self {
        self.debug_verbosity = verbosity;
        self
    }

    /// Set the periodic resync interval.
    #[must_use]
    pub fn with_resync_interval_ms(mut self, ms: u64) -> Self {
        self.resync_interval_ms = ms;
        self
    }

    /// Allow the first non-hostile outgoing hit to proc.
    #[must_use]
    pub fn with_non_hostile_first_hit(mut self, allow: bool) -> Self {
        self.allow_non_hostile_first_hit = allow;
        self
    }

    /// Configure the global trigger budget. Zero for either value disables it.
    #[must_use]
    pub fn with_trigger_budget(mut self, window_ms: u64, max_per_window: u32) -> Self {
        self.trigger_budget_window_ms = window_ms;
        self.trigger_budget_max_per_window = max_per_window;
        self
    }

    /// Set the global trap cap.
    #[must_use]
    pub fn with_trap_global_cap(mut self, cap: usize) -> Self {
        self.trap_global_cap = cap;
        self
    }

    /// Set the loot rolling rules.
    #[must_use]
    pub fn with_loot(mut self, loot: LootSettings) -> Self {
        self.loot = loot;
        self
    }

    /// Proc chance multiplier with non-finite or negative values treated as zero.
    #[must_use]
    pub fn effective_proc_chance_mult(&self) -> f32 {
        if self.proc_chance_mult.is_finite() {
            self.proc_chance_mult.max(0.0)
        } else {
            0.0
        }
    }
}
