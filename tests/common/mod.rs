//! Scripted host shared by the integration tests.
//!
//! The world is one-dimensional: every actor sits at `(x, 0, 0)`. Enemies
//! are hostile toward the player and the player's summons, and nothing
//! else is hostile.

#![allow(dead_code)]

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use affix_engine::affixes::{ActionSpec, AffixDefinition, Trigger};
use affix_engine::core::{ActorId, AffixToken, FormId, InstanceKey, SpellId, TimePoint};
use affix_engine::host::{ActorVitals, CastRequest, EquippedInstance, HitData, Host, Position, Resistances};

pub const PLAYER: ActorId = ActorId(0x14);
pub const SWORD: FormId = FormId(0x0001_2EB7);

#[derive(Default)]
pub struct ScriptedHost {
    pub player: ActorId,
    pub enemies: FxHashSet<ActorId>,
    pub summons: FxHashMap<ActorId, ActorId>,
    pub dead: FxHashSet<ActorId>,
    pub despawned: FxHashSet<ActorId>,
    pub positions: FxHashMap<ActorId, Position>,
    pub vitals: FxHashMap<ActorId, ActorVitals>,
    pub resistances: FxHashMap<ActorId, Resistances>,
    pub spell_bases: FxHashMap<SpellId, f32>,
    pub dot_effects: FxHashSet<FormId>,
    pub unrouted: FxHashSet<ActorId>,
    pub equipped: Vec<EquippedInstance>,

    pub casts: Vec<CastRequest>,
    pub notes: Vec<String>,
    pub magicka_drained: Vec<(ActorId, f32)>,
    pub passives: BTreeSet<SpellId>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        let mut host = Self {
            player: PLAYER,
            ..Default::default()
        };
        host.place(PLAYER, 0.0);
        host
    }

    pub fn place(&mut self, actor: ActorId, x: f32) {
        self.positions.insert(actor, Position::new(x, 0.0, 0.0));
    }

    /// Add a hostile actor at `x`.
    pub fn spawn_enemy(&mut self, id: u32, x: f32) -> ActorId {
        let actor = ActorId::new(id);
        self.enemies.insert(actor);
        self.place(actor, x);
        actor
    }

    /// Add a non-hostile bystander at `x`.
    pub fn spawn_neutral(&mut self, id: u32, x: f32) -> ActorId {
        let actor = ActorId::new(id);
        self.place(actor, x);
        actor
    }

    pub fn spawn_summon(&mut self, id: u32, x: f32) -> ActorId {
        let actor = ActorId::new(id);
        self.summons.insert(actor, self.player);
        self.place(actor, x);
        actor
    }

    pub fn set_vitals(&mut self, actor: ActorId, health: f32, max_health: f32) {
        let entry = self.vitals.entry(actor).or_default();
        entry.health = health;
        entry.max_health = max_health;
    }

    pub fn set_magicka(&mut self, actor: ActorId, magicka: f32, max_magicka: f32) {
        let entry = self.vitals.entry(actor).or_default();
        entry.magicka = magicka;
        entry.max_magicka = max_magicka;
    }

    pub fn equip(&mut self, key: InstanceKey, ids: &[&str]) {
        self.equipped
            .push(EquippedInstance::new(key).with_tokens(ids.iter().map(|id| AffixToken::from_id(id))));
    }

    pub fn unequip_all(&mut self) {
        self.equipped.clear();
    }

    pub fn casts_of(&self, spell: SpellId) -> Vec<&CastRequest> {
        self.casts.iter().filter(|c| c.spell == spell).collect()
    }

    pub fn take_casts(&mut self) -> Vec<CastRequest> {
        std::mem::take(&mut self.casts)
    }

    fn player_side(&self, actor: ActorId) -> bool {
        actor == self.player || self.summons.contains_key(&actor)
    }
}

impl Host for ScriptedHost {
    fn player(&self) -> ActorId {
        self.player
    }

    fn is_valid(&self, actor: ActorId) -> bool {
        actor.is_valid() && !self.despawned.contains(&actor)
    }

    fn summoner_of(&self, actor: ActorId) -> Option<ActorId> {
        self.summons.get(&actor).copied()
    }

    fn is_hostile(&self, a: ActorId, b: ActorId) -> bool {
        (self.enemies.contains(&a) && self.player_side(b)) || (self.player_side(a) && self.enemies.contains(&b))
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

    fn resistances(&self, actor: ActorId) -> Resistances {
        self.resistances.get(&actor).copied().unwrap_or_default()
    }

    fn spell_base_magnitude(&self, spell: SpellId) -> Option<f32> {
        self.spell_bases.get(&spell).copied()
    }

    fn is_damage_over_time(&self, effect: FormId) -> bool {
        self.dot_effects.contains(&effect)
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

    fn add_passive_spell(&mut self, _actor: ActorId, spell: SpellId) {
        self.passives.insert(spell);
    }

    fn remove_passive_spell(&mut self, _actor: ActorId, spell: SpellId) {
        self.passives.remove(&spell);
    }

    fn notify(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }

    fn is_damage_hook_routed(&self, actor: ActorId) -> bool {
        !self.unrouted.contains(&actor)
    }
}

/// Instance key for the `n`th test item.
pub fn item(n: u16) -> InstanceKey {
    InstanceKey::new(SWORD, n)
}

pub fn at(ms: u64) -> TimePoint {
    TimePoint::from_millis(ms)
}

/// An affix that notifies `id` on `trigger`.
pub fn notify_on(id: &str, trigger: Trigger) -> AffixDefinition {
    AffixDefinition::new(id)
        .on(trigger)
        .with_action(ActionSpec::DebugNotify { message: id.into() })
}

/// A sword hit by `attacker` on `target` for `damage`.
pub fn sword_hit(attacker: ActorId, target: ActorId, damage: f32) -> HitData {
    HitData::weapon(attacker, target, SWORD, damage)
}
