//! Minimal in-memory host for unit tests.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{ActorId, FormId, SpellId};
use crate::host::{ActorVitals, CastRequest, EquippedInstance, Host, Position, Resistances};

#[derive(Default)]
pub(crate) struct RecordingHost {
    pub player: ActorId,
    pub invalid: FxHashSet<ActorId>,
    pub summons: FxHashMap<ActorId, ActorId>,
    pub hostile: FxHashSet<ActorId>,
    pub dead: FxHashSet<ActorId>,
    pub positions: FxHashMap<ActorId, Position>,
    pub vitals: FxHashMap<ActorId, ActorVitals>,
    pub resistances: Resistances,
    pub spell_bases: FxHashMap<SpellId, f32>,
    pub equipped: Vec<EquippedInstance>,
    pub casts: Vec<CastRequest>,
    pub magicka_drained: Vec<(ActorId, f32)>,
    pub notes: Vec<String>,
    pub passive_spells: FxHashMap<ActorId, BTreeSet<SpellId>>,
    pub unrouted: FxHashSet<ActorId>,
}

impl RecordingHost {
    pub fn with_player(player: ActorId) -> Self {
        Self {
            player,
            ..Default::default()
        }
    }

    pub fn place(&mut self, actor: ActorId, x: f32) {
        self.positions.insert(actor, Position::new(x, 0.0, 0.0));
    }

    pub fn passives(&self, actor: ActorId) -> Vec<SpellId> {
        self.passive_spells
            .get(&actor)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Host for RecordingHost {
    fn player(&self) -> ActorId {
        self.player
    }

    fn is_valid(&self, actor: ActorId) -> bool {
        actor.is_valid() && !self.invalid.contains(&actor)
    }

    fn summoner_of(&self, actor: ActorId) -> Option<ActorId> {
        self.summons.get(&actor).copied()
    }

    fn is_hostile(&self, a: ActorId, b: ActorId) -> bool {
        // Enemies are hostile toward the player side and vice versa
        let player_side = |x: ActorId| x == self.player || self.summons.contains_key(&x);
        (self.hostile.contains(&a) && player_side(b)) || (player_side(a) && self.hostile.contains(&b))
    }

    fn is_dead(&self, actor: ActorId) -> bool {
        self.dead.contains(&actor)
    }

    fn position(&self, actor: ActorId) -> Option<Position> {
        self.positions.get(&actor).copied()
    }

    fn actors_near(&self, center: Position, radius: f32) -> Vec<ActorId> {
        let mut near: Vec<ActorId> = self
            .positions
            .iter()
            .filter(|(_, p)| p.distance(center) <= radius)
            .map(|(&a, _)| a)
            .collect();
        near.sort();
        near
    }

    fn vitals(&self, actor: ActorId) -> Option<ActorVitals> {
        self.vitals.get(&actor).copied()
    }

    fn resistances(&self, _actor: ActorId) -> Resistances {
        self.resistances
    }

    fn spell_base_magnitude(&self, spell: SpellId) -> Option<f32> {
        self.spell_bases.get(&spell).copied()
    }

    fn is_damage_over_time(&self, _effect: FormId) -> bool {
        true
    }

    fn equipped_instances(&self, owner: ActorId) -> Vec<EquippedInstance> {
        if owner == self.player {
            self.equipped.clone()
        } else {
            Vec::new()
        }
    }

    fn cast_spell(&mut self, request: &CastRequest) {
        self.casts.push(*request);
    }

    fn damage_magicka(&mut self, actor: ActorId, amount: f32) {
        self.magicka_drained.push((actor, amount));
        if let Some(v) = self.vitals.get_mut(&actor) {
            v.magicka -= amount;
        }
    }

    fn add_passive_spell(&mut self, actor: ActorId, spell: SpellId) {
        self.passive_spells.entry(actor).or_default().insert(spell);
    }

    fn remove_passive_spell(&mut self, actor: ActorId, spell: SpellId) {
        if let Some(spells) = self.passive_spells.get_mut(&actor) {
            spells.remove(&spell);
        }
    }

    fn notify(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }

    fn is_damage_hook_routed(&self, actor: ActorId) -> bool {
        !self.unrouted.contains(&actor)
    }
}
