//! Host collaborator interface.
//!
//! The engine never talks to a game directly. Everything it needs to know
//! about actors, spells and equipment, and every side effect it produces,
//! goes through the [`Host`] trait. Hosts implement it over whatever
//! binding layer they have; tests implement it over plain maps.
//!
//! ## Key Features
//!
//! - **Queries**: actor validity, ownership, hostility, vitals, positions
//! - **Inventory**: the owner's equipped item instances and their tokens
//! - **Effects**: spell casts, magicka drain, passive abilities, notifications
//!
//! All queries are answered synchronously on the simulation thread. A host
//! that delivers events back into the engine while a cast is in flight
//! should check [`ProcDepth`](crate::engine::ProcDepth) and defer them.

pub mod hit;

pub use hit::HitData;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{ActorId, AffixToken, FormId, InstanceKey, SpellId};

/// World-space position (or direction).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared euclidean distance.
    #[must_use]
    pub fn distance_squared(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Position) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

/// Current and maximum health/magicka of an actor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActorVitals {
    pub health: f32,
    pub max_health: f32,
    pub magicka: f32,
    pub max_magicka: f32,
}

impl ActorVitals {
    /// Health as a percentage of maximum, or `None` with no maximum.
    #[must_use]
    pub fn health_pct(&self) -> Option<f32> {
        (self.max_health > 0.0).then(|| self.health / self.max_health * 100.0)
    }
}

/// Elemental resistances in percent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Resistances {
    pub fire: f32,
    pub frost: f32,
    pub shock: f32,
}

/// One equipped item instance as reported by the host inventory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EquippedInstance {
    pub key: InstanceKey,
    /// Tokens the host has bound to the item. Ignored when the engine has
    /// its own slot entry for `key`.
    pub tokens: SmallVec<[AffixToken; 4]>,
}

impl EquippedInstance {
    /// Instance with no host-side tokens.
    #[must_use]
    pub fn new(key: InstanceKey) -> Self {
        Self {
            key,
            tokens: SmallVec::new(),
        }
    }

    /// Attach host-side tokens (builder pattern).
    #[must_use]
    pub fn with_tokens(mut self, tokens: impl IntoIterator<Item = AffixToken>) -> Self {
        self.tokens = tokens.into_iter().collect();
        self
    }
}

/// A spell cast requested by an action.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CastRequest {
    pub spell: SpellId,
    pub caster: ActorId,
    pub target: ActorId,
    /// Magnitude override. `None` casts at the spell's own magnitude.
    pub magnitude: Option<f32>,
}

/// Everything the engine needs from the game.
pub trait Host {
    /// The player actor.
    fn player(&self) -> ActorId;

    /// True if `actor` still resolves to a live reference.
    fn is_valid(&self, actor: ActorId) -> bool;

    /// Summoner of `actor`, if it is a summon.
    fn summoner_of(&self, actor: ActorId) -> Option<ActorId>;

    /// True if `a` is hostile toward `b`.
    fn is_hostile(&self, a: ActorId, b: ActorId) -> bool;

    /// True if `actor` is dead.
    fn is_dead(&self, actor: ActorId) -> bool;

    /// World position of `actor`.
    fn position(&self, actor: ActorId) -> Option<Position>;

    /// Actors within `radius` of `center`, in any order.
    fn actors_near(&self, center: Position, radius: f32) -> Vec<ActorId>;

    /// Health and magicka of `actor`.
    fn vitals(&self, actor: ActorId) -> Option<ActorVitals>;

    /// Elemental resistances of `actor`.
    fn resistances(&self, actor: ActorId) -> Resistances;

    /// The spell's own magnitude, if it has one.
    fn spell_base_magnitude(&self, spell: SpellId) -> Option<f32>;

    /// True if the magic effect deals damage over time.
    fn is_damage_over_time(&self, effect: FormId) -> bool;

    /// Item instances `owner` has equipped.
    fn equipped_instances(&self, owner: ActorId) -> Vec<EquippedInstance>;

    /// Cast a spell.
    fn cast_spell(&mut self, request: &CastRequest);

    /// Drain magicka from `actor`.
    fn damage_magicka(&mut self, actor: ActorId, amount: f32);

    /// Apply a passive ability.
    fn add_passive_spell(&mut self, actor: ActorId, spell: SpellId);

    /// Remove a passive ability.
    fn remove_passive_spell(&mut self, actor: ActorId, spell: SpellId);

    /// Show a short message to the player.
    fn notify(&mut self, message: &str);

    /// False if the health-damage hook does not cover `actor`. Hits on such
    /// actors are taken from the raw hit event instead.
    fn is_damage_hook_routed(&self, _actor: ActorId) -> bool {
        true
    }

    /// The player, if `actor` is the player or one of the player's summons.
    fn player_owner(&self, actor: ActorId) -> Option<ActorId> {
        if !actor.is_valid() {
            return None;
        }
        let player = self.player();
        if actor == player || self.summoner_of(actor) == Some(player) {
            Some(player)
        } else {
            None
        }
    }

    /// True if either actor is hostile toward the other.
    fn is_hostile_either(&self, a: ActorId, b: ActorId) -> bool {
        self.is_hostile(a, b) || self.is_hostile(b, a)
    }
}
