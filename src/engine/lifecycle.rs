//! Construction, config loading, resync, persistence and runtime toggles.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, info};

use crate::affixes::{
    AffixDefinition, AffixIndex, AffixTable, AffixVec, InstanceAffixSlots, LoadReport, Trigger,
};
use crate::core::{
    AffixToken, ConfigError, DebugVerbosity, EngineSettings, InstanceKey, PersistError, ProcRng, TimePoint,
};
use crate::host::Host;
use crate::runeword::{RunewordCatalog, RunewordProgress, RunewordRecipe};
use crate::state::{ActiveState, InstanceRuntimeState, RuntimeStates, SaveData, SAVE_VERSION};

use super::{Engine, ProcDepth};

/// One active affix as reported to the host UI.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveAffixSummary {
    pub id: String,
    pub token: AffixToken,
    pub trigger: Option<Trigger>,
    /// Equipped instances carrying the affix.
    pub count: u32,
    pub slot_penalty: f32,
}

impl Engine {
    /// Create an engine with no config loaded.
    #[must_use]
    pub fn new(settings: EngineSettings, seed: u64) -> Self {
        Self {
            settings,
            table: Arc::new(AffixTable::new()),
            config_loaded: false,
            runewords: RunewordCatalog::new(),
            next_allowed: AffixVec::default(),
            low_health_armed: AffixVec::default(),
            active: ActiveState::new(),
            equipped: Vec::new(),
            runtime: RuntimeStates::new(),
            instance_slots: Default::default(),
            runeword_progress: Default::default(),
            selected_runeword_base: None,
            per_target: Default::default(),
            first_hit: Default::default(),
            trigger_budget: Default::default(),
            outgoing_hits: Default::default(),
            incoming_hits: Default::default(),
            router: Default::default(),
            dot_refresh: Default::default(),
            recent: Default::default(),
            crit_cursor: 0,
            corpse_budget: Default::default(),
            resync: Default::default(),
            log_throttle: Default::default(),
            traps: Default::default(),
            rng: ProcRng::new(seed),
            proc_depth: ProcDepth::new(),
        }
    }

    /// Replace the affix table and runeword catalog.
    ///
    /// Invalid entries are skipped and reported. Per-affix cooldowns and every
    /// short-lived cache are reset; persisted state (slots, progression,
    /// runeword progress) is kept.
    ///
    /// Active counts are recomputed against the new table from the last
    /// equipment snapshot, so equipped affixes keep working. Passive spells
    /// are reconciled on the next resync; use [`Engine::reload_config`] to
    /// resync immediately.
    pub fn load_config(
        &mut self,
        definitions: impl IntoIterator<Item = AffixDefinition>,
        recipes: impl IntoIterator<Item = RunewordRecipe>,
    ) -> LoadReport {
        let (table, mut report) = AffixTable::from_definitions(definitions);
        let (catalog, recipe_errors) = RunewordCatalog::from_recipes(recipes);
        report.runewords = catalog.len();
        report.errors.extend(recipe_errors);

        let len = table.len();
        self.table = Arc::new(table);
        self.runewords = catalog;
        self.next_allowed.reset(len, TimePoint::ZERO);
        self.low_health_armed.reset(len, true);
        self.active.recount(
            &self.table,
            self.equipped.iter().map(|(key, tokens)| (*key, tokens.as_slice())),
            &mut self.runtime,
        );
        self.clear_caches();
        self.resync.reset();
        self.config_loaded = true;

        info!(
            affixes = report.loaded,
            runewords = report.runewords,
            skipped = report.errors.len(),
            "affix config loaded"
        );
        report
    }

    /// Load a config and resync against the host's current equipment.
    pub fn reload_config(
        &mut self,
        host: &mut dyn Host,
        definitions: impl IntoIterator<Item = AffixDefinition>,
        recipes: impl IntoIterator<Item = RunewordRecipe>,
        now: TimePoint,
    ) -> LoadReport {
        let report = self.load_config(definitions, recipes);
        self.resync(host, now);
        report
    }

    /// Register one more affix at runtime.
    ///
    /// Existing cooldowns are kept; the new affix starts ready.
    pub fn register_affix(&mut self, definition: AffixDefinition) -> Result<AffixIndex, ConfigError> {
        let idx = Arc::make_mut(&mut self.table).register(definition)?;
        let len = self.table.len();
        self.next_allowed.grow_to(len, TimePoint::ZERO);
        self.low_health_armed.grow_to(len, true);
        self.active.grow_to(len);
        self.config_loaded = true;
        self.resync.reset();
        debug!(affix = %self.table[idx].id, "affix registered");
        Ok(idx)
    }

    /// Rebuild active counts from the player's equipment and reconcile
    /// passive spells.
    ///
    /// Slot data held by the engine takes precedence over tokens reported by
    /// the host for the same instance.
    pub fn resync(&mut self, host: &mut dyn Host, now: TimePoint) {
        let player = host.player();
        let equipped: Vec<(InstanceKey, SmallVec<[AffixToken; 4]>)> = host
            .equipped_instances(player)
            .into_iter()
            .map(|instance| {
                let tokens = match self.instance_slots.get(&instance.key) {
                    Some(slots) => SmallVec::from_slice(slots.as_slice()),
                    None => instance.tokens,
                };
                (instance.key, tokens)
            })
            .collect();

        let reconcile = self.active.rebuild(
            &self.table,
            equipped.iter().map(|(key, tokens)| (*key, tokens.as_slice())),
            &mut self.runtime,
        );
        let instances = equipped.len();
        self.equipped = equipped;
        for spell in &reconcile.remove {
            host.remove_passive_spell(player, *spell);
        }
        for spell in &reconcile.add {
            host.add_passive_spell(player, *spell);
        }

        self.resync.defer(now, self.settings.resync_interval_ms);
        debug!(
            instances,
            active = self.active.active().count(),
            passives_added = reconcile.add.len(),
            passives_removed = reconcile.remove.len(),
            "active affixes rebuilt"
        );
    }

    /// Remove applied passives, drop traps and caches, and stop reacting to
    /// events until the next config load.
    pub fn shutdown(&mut self, host: &mut dyn Host) {
        let player = host.player();
        for spell in self.active.clear() {
            host.remove_passive_spell(player, spell);
        }
        self.equipped.clear();
        self.traps.clear();
        self.clear_caches();
        self.config_loaded = false;
        info!("affix engine shut down");
    }

    pub(super) fn clear_caches(&mut self) {
        self.per_target.clear();
        self.first_hit.clear();
        self.trigger_budget.reset();
        self.outgoing_hits.clear();
        self.incoming_hits.clear();
        self.router.clear();
        self.dot_refresh.clear();
        self.recent.clear();
        self.corpse_budget.clear();
        self.log_throttle = Default::default();
        self.crit_cursor = 0;
    }

    // === Persistence ===

    /// Serialize slots, progression and runeword progress.
    pub fn save(&self) -> Result<Vec<u8>, PersistError> {
        SaveData {
            version: SAVE_VERSION,
            instance_slots: self.instance_slots.clone(),
            runtime_states: self.runtime.clone(),
            runeword_progress: self.runeword_progress.clone(),
        }
        .encode()
    }

    /// Replace persisted state from a save blob.
    ///
    /// On error nothing changes. On success caches and traps are dropped and
    /// the next tick resyncs.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), PersistError> {
        let data = SaveData::decode(bytes)?;
        self.instance_slots = data.instance_slots;
        self.runtime = data.runtime_states;
        self.runeword_progress = data.runeword_progress;
        self.selected_runeword_base = None;
        self.traps.clear();
        self.clear_caches();
        self.resync.reset();
        info!(
            instances = self.instance_slots.len(),
            runtime_states = self.runtime.len(),
            "affix state loaded"
        );
        Ok(())
    }

    /// Forget all persisted state, as when a new game starts.
    pub fn revert(&mut self) {
        self.instance_slots.clear();
        self.runtime.clear();
        self.runeword_progress.clear();
        self.selected_runeword_base = None;
        self.traps.clear();
        self.clear_caches();
        self.resync.reset();
        debug!("affix state reverted");
    }

    // === Toggles ===

    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
    }

    pub fn set_proc_chance_multiplier(&mut self, mult: f32) {
        self.settings.proc_chance_mult = mult;
    }

    pub fn set_debug_verbosity(&mut self, verbosity: DebugVerbosity) {
        self.settings.debug_verbosity = verbosity;
    }

    pub fn set_resync_interval_ms(&mut self, interval_ms: u64) {
        self.settings.resync_interval_ms = interval_ms;
    }

    /// Turning the allowance off also drops every outstanding grant.
    pub fn set_allow_non_hostile_first_hit(&mut self, allow: bool) {
        self.settings.allow_non_hostile_first_hit = allow;
        if !allow {
            self.first_hit.clear();
        }
    }

    // === Queries ===

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn table(&self) -> &AffixTable {
        &self.table
    }

    #[must_use]
    pub fn is_config_loaded(&self) -> bool {
        self.config_loaded
    }

    #[must_use]
    pub fn allow_non_hostile_first_hit(&self) -> bool {
        self.settings.allow_non_hostile_first_hit
    }

    /// Every affix with at least one equipped instance.
    #[must_use]
    pub fn active_affix_summary(&self) -> Vec<ActiveAffixSummary> {
        self.active
            .active()
            .filter_map(|(idx, count)| {
                let def = self.table.get(idx)?;
                Some(ActiveAffixSummary {
                    id: def.id.clone(),
                    token: def.token,
                    trigger: def.trigger,
                    count,
                    slot_penalty: self.active.slot_penalty(idx),
                })
            })
            .collect()
    }

    /// Summed critical-damage bonus from active passives.
    #[must_use]
    pub fn crit_damage_bonus_pct(&self) -> f32 {
        self.active.crit_damage_bonus_pct()
    }

    /// Live trap count.
    #[must_use]
    pub fn trap_count(&self) -> usize {
        self.traps.len()
    }

    #[must_use]
    pub fn instance_slots(&self, instance: InstanceKey) -> Option<&InstanceAffixSlots> {
        self.instance_slots.get(&instance)
    }

    #[must_use]
    pub fn runtime_state(&self, instance: InstanceKey, token: AffixToken) -> Option<&InstanceRuntimeState> {
        self.runtime.get(instance, token)
    }

    #[must_use]
    pub fn runeword_progress(&self, instance: InstanceKey) -> Option<&RunewordProgress> {
        self.runeword_progress.get(&instance)
    }

    /// Shared handle on the proc depth, for host bridges that need to drop
    /// events raised while a proc executes.
    #[must_use]
    pub fn proc_depth(&self) -> ProcDepth {
        self.proc_depth.clone()
    }

    /// Equipped instances for the affix `token`.
    #[must_use]
    pub fn active_count(&self, token: AffixToken) -> u32 {
        self.table.by_token(token).map_or(0, |idx| self.active.count(idx))
    }

    pub(super) fn is_verbose(&self, level: DebugVerbosity) -> bool {
        self.settings.debug_verbosity >= level
    }
}
