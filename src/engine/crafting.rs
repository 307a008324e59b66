//! Slot writes: direct slot edits, loot rolls and runeword crafting.
//!
//! These are the only paths that change [`InstanceAffixSlots`]. Each one
//! leaves active counts alone; equipped changes are picked up by the next
//! resync.

use tracing::{debug, info};

use crate::affixes::{InstanceAffixSlots, LootType};
use crate::core::{AffixToken, CraftError, InstanceKey, SlotError, TimePoint};
use crate::host::Host;
use crate::loot::roll_affixes;
use crate::runeword::{self, RuneInsert, RunewordProgress};

use super::Engine;

impl Engine {
    /// Replace the slot set of `instance`.
    pub fn set_instance_slots(&mut self, instance: InstanceKey, slots: InstanceAffixSlots) {
        self.instance_slots.insert(instance, slots);
        self.resync.reset();
    }

    /// Bind one more affix to `instance`.
    pub fn add_instance_affix(&mut self, instance: InstanceKey, token: AffixToken) -> Result<(), SlotError> {
        self.instance_slots
            .entry(instance)
            .or_insert_with(InstanceAffixSlots::new)
            .add_token(token)?;
        self.resync.reset();
        Ok(())
    }

    /// Remove an affix from `instance`. Returns whether it was bound.
    pub fn remove_instance_affix(&mut self, instance: InstanceKey, token: AffixToken) -> bool {
        let removed = self
            .instance_slots
            .get_mut(&instance)
            .is_some_and(|slots| slots.remove_token(token));
        if removed {
            self.resync.reset();
        }
        removed
    }

    // === Loot ===

    /// Roll affixes for a newly acquired instance.
    ///
    /// Every instance rolls from its own stream, so a second attempt cannot
    /// produce a different result. An empty roll records nothing.
    pub fn roll_loot_affixes(
        &mut self,
        instance: InstanceKey,
        item_type: LootType,
    ) -> Result<Option<&InstanceAffixSlots>, CraftError> {
        if self.instance_slots.get(&instance).is_some_and(|s| !s.is_empty()) {
            return Err(CraftError::AlreadyRolled(instance));
        }
        let mut rng = self.rng.for_context(&format!("loot:{}", instance.0));
        let slots = roll_affixes(&self.table, item_type, &self.settings.loot, &mut rng);
        if slots.is_empty() {
            return Ok(None);
        }
        debug!(%instance, affixes = slots.len(), "loot affixes rolled");
        self.instance_slots.insert(instance, slots);
        Ok(self.instance_slots.get(&instance))
    }

    /// Container change. Rolls loot for an instance moving into the
    /// player's inventory and resyncs if it is already equipped.
    pub fn on_container_changed(
        &mut self,
        host: &mut dyn Host,
        instance: InstanceKey,
        item_type: LootType,
        to_player: bool,
        now: TimePoint,
    ) -> bool {
        if !self.config_loaded || !self.settings.enabled || !to_player {
            return false;
        }
        let rolled = matches!(self.roll_loot_affixes(instance, item_type), Ok(Some(_)));
        if rolled {
            let player = host.player();
            let equipped = host.equipped_instances(player).iter().any(|e| e.key == instance);
            if equipped {
                self.resync(host, now);
            }
        }
        rolled
    }

    // === Runewords ===

    /// Pick the instance runes will be inserted into, starting progress
    /// toward `recipe_id` (or resuming it).
    pub fn select_runeword_base(&mut self, instance: InstanceKey, recipe_id: &str) -> Result<(), CraftError> {
        let recipe = self.runewords.by_id(recipe_id).ok_or(CraftError::UnknownRecipe)?;
        let progress = match self.runeword_progress.get(&instance) {
            Some(p) if p.recipe == recipe.token && p.completed => return Err(CraftError::AlreadyComplete),
            Some(p) if p.recipe == recipe.token => *p,
            _ => RunewordProgress::start(recipe.token),
        };
        self.runeword_progress.insert(instance, progress);
        self.selected_runeword_base = Some(instance);
        debug!(%instance, recipe = recipe_id, inserted = progress.inserted, "runeword base selected");
        Ok(())
    }

    /// The instance selected by [`Engine::select_runeword_base`].
    #[must_use]
    pub fn selected_runeword_base(&self) -> Option<InstanceKey> {
        self.selected_runeword_base
    }

    /// Insert the next rune into the selected base.
    ///
    /// Completion binds the recipe's result affix: promoted to the primary
    /// slot, or replacing every slot for `replace_existing` recipes. If the
    /// result cannot be bound the progress stays one rune short.
    pub fn insert_rune(&mut self, rune_id: &str) -> Result<RuneInsert, CraftError> {
        let instance = self.selected_runeword_base.ok_or(CraftError::NoBaseSelected)?;
        let mut progress = self
            .runeword_progress
            .get(&instance)
            .copied()
            .ok_or(CraftError::NoBaseSelected)?;
        let recipe = self.runewords.get(progress.recipe).ok_or(CraftError::UnknownRecipe)?;

        let outcome = runeword::advance(&mut progress, recipe, AffixToken::from_id(rune_id))?;
        if let RuneInsert::Completed { affix } = outcome {
            if self.table.by_token(affix).is_none() {
                return Err(CraftError::ResultNotLoaded);
            }
            let mut slots = self.instance_slots.get(&instance).cloned().unwrap_or_default();
            if recipe.replace_existing {
                slots.replace_all(affix);
            } else {
                slots.promote_token_to_primary(affix)?;
            }
            runeword::complete(&mut progress, recipe);
            info!(%instance, recipe = %recipe.id, "runeword completed");
            self.instance_slots.insert(instance, slots);
            self.resync.reset();
        }
        self.runeword_progress.insert(instance, progress);
        Ok(outcome)
    }
}
