//! Per-instance progression state.
//!
//! Evolution XP and mode-cycle position live per `(instance, token)` pair so
//! that two copies of the same affix on different items progress
//! independently. Entries are created lazily and only removed on a full
//! reset.

use im::HashMap as ImHashMap;
use serde::{Deserialize, Serialize};

use crate::affixes::ActionSpec;
use crate::core::{AffixToken, InstanceKey};

/// Progression of one affix on one item instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceRuntimeState {
    pub evolution_xp: u32,
    pub mode_cycle_counter: u32,
    pub mode_index: u32,
}

/// Key of a runtime state entry.
pub type RuntimeKey = (InstanceKey, AffixToken);

/// All runtime states, cheap to snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeStates {
    states: ImHashMap<RuntimeKey, InstanceRuntimeState>,
}

impl RuntimeStates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `(instance, token)`, created on first use.
    pub fn ensure(&mut self, instance: InstanceKey, token: AffixToken) -> &mut InstanceRuntimeState {
        self.states.entry((instance, token)).or_insert_with(InstanceRuntimeState::default)
    }

    #[must_use]
    pub fn get(&self, instance: InstanceKey, token: AffixToken) -> Option<&InstanceRuntimeState> {
        self.states.get(&(instance, token))
    }

    /// Advance progression after a proc on every instance carrying `token`.
    ///
    /// Evolution gains `xp_per_proc` on each instance. Automatic mode cycles
    /// advance their counter and switch mode every `switch_every` procs.
    pub fn advance_for_proc(&mut self, instances: &[InstanceKey], token: AffixToken, action: Option<&ActionSpec>) {
        let Some(spec) = action.and_then(ActionSpec::cast_spec) else {
            return;
        };
        let xp = spec.evolution.as_ref().map_or(0, |evo| evo.xp_per_proc);
        let cycle = spec
            .mode_cycle
            .as_ref()
            .filter(|c| !c.manual_only && c.switch_every > 0 && !c.spells.is_empty());

        for &instance in instances {
            let state = self.ensure(instance, token);
            state.evolution_xp = state.evolution_xp.saturating_add(xp);

            if let Some(cycle) = cycle {
                state.mode_cycle_counter += 1;
                if state.mode_cycle_counter >= cycle.switch_every {
                    state.mode_cycle_counter = 0;
                    state.mode_index = (state.mode_index + 1) % cycle.spells.len() as u32;
                }
            }
        }
    }

    /// Step the mode of one instance by hand. Returns the new mode index.
    pub fn cycle_manual(&mut self, instance: InstanceKey, token: AffixToken, mode_count: usize) -> Option<u32> {
        if mode_count == 0 {
            return None;
        }
        let state = self.ensure(instance, token);
        state.mode_cycle_counter = 0;
        state.mode_index = (state.mode_index + 1) % mode_count as u32;
        Some(state.mode_index)
    }

    /// Highest evolution XP among `instances`.
    #[must_use]
    pub fn best_evolution_xp(&self, instances: &[InstanceKey], token: AffixToken) -> u32 {
        instances
            .iter()
            .filter_map(|&i| self.get(i, token))
            .map(|s| s.evolution_xp)
            .max()
            .unwrap_or(0)
    }

    /// Mode index of the first instance carrying `token`.
    #[must_use]
    pub fn mode_index(&self, instances: &[InstanceKey], token: AffixToken) -> u32 {
        instances
            .first()
            .and_then(|&i| self.get(i, token))
            .map_or(0, |s| s.mode_index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
