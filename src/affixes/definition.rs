//! Affix definitions.
//!
//! An [`AffixDefinition`] is immutable once registered. The only per-affix
//! mutable runtime value (the global next-allowed time) lives in a parallel
//! array owned by the engine.

use serde::{Deserialize, Serialize};

use crate::core::{AffixToken, ConfigError, SpellId};

use super::action::ActionSpec;

/// Event kind an affix listens to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// The owner (or a summon) lands a hit.
    Hit,
    /// The owner is hit.
    IncomingHit,
    /// The owner applies a damage-over-time effect.
    DotApply,
    /// The owner (or a summon) kills an actor.
    Kill,
    /// The owner's health crosses below a threshold.
    LowHealth,
}

/// Affix position on an item. Only prefixes count toward the slot penalty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AffixSlot {
    #[default]
    None,
    Prefix,
    Suffix,
}

/// Loot-time metadata. Independent of proc chance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootMeta {
    /// Relative roll weight. Zero keeps the affix out of loot.
    pub weight: f32,
    /// Item category this affix may roll on.
    pub loot_type: LootType,
}

impl Default for LootMeta {
    fn default() -> Self {
        Self {
            weight: 0.0,
            loot_type: LootType::Any,
        }
    }
}

/// Item category used by loot rolling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LootType {
    #[default]
    Any,
    Weapon,
    Armor,
}

impl LootType {
    /// True if an affix with this loot type may roll on an item of `item`.
    #[must_use]
    pub fn accepts(self, item: LootType) -> bool {
        self == LootType::Any || item == LootType::Any || self == item
    }
}

/// Passive payload of a suffix affix while equipped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassiveSpec {
    /// Ability applied to the owner while equipped.
    pub spell: Option<SpellId>,
    /// Added to the owner's critical damage bonus.
    pub crit_damage_bonus_pct: f32,
}

/// Thresholds of a `LowHealth` trigger.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LowHealthSpec {
    /// Fires when health percent drops to or below this.
    pub threshold_pct: f32,
    /// Re-arms once health percent recovers to or above this.
    pub rearm_pct: f32,
}

impl Default for LowHealthSpec {
    fn default() -> Self {
        Self {
            threshold_pct: 35.0,
            rearm_pct: 50.0,
        }
    }
}

/// One configured affix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffixDefinition {
    pub id: String,
    /// Derived from `id` on registration; never read from config.
    #[serde(skip)]
    pub token: AffixToken,
    pub trigger: Option<Trigger>,
    pub proc_chance_pct: f32,
    pub icd_ms: u64,
    pub per_target_icd_ms: u64,
    pub require_recently_hit_ms: u64,
    pub require_recently_kill_ms: u64,
    pub require_not_hit_recently_ms: u64,
    pub lucky_hit_chance_pct: f32,
    pub lucky_hit_proc_coefficient: f32,
    pub action: Option<ActionSpec>,
    pub passive: Option<PassiveSpec>,
    pub low_health: Option<LowHealthSpec>,
    pub slot: AffixSlot,
    pub loot: LootMeta,
}

impl Default for AffixDefinition {
    fn default() -> Self {
        Self {
            id: String::new(),
            token: AffixToken::default(),
            trigger: None,
            proc_chance_pct: 100.0,
            icd_ms: 0,
            per_target_icd_ms: 0,
            require_recently_hit_ms: 0,
            require_recently_kill_ms: 0,
            require_not_hit_recently_ms: 0,
            lucky_hit_chance_pct: 0.0,
            lucky_hit_proc_coefficient: 1.0,
            action: None,
            passive: None,
            low_health: None,
            slot: AffixSlot::None,
            loot: LootMeta::default(),
        }
    }
}

impl AffixDefinition {
    /// Create a definition with an id; the token is derived immediately.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let token = AffixToken::from_id(&id);
        Self {
            id,
            token,
            ..Default::default()
        }
    }

    /// Set the trigger (builder pattern).
    #[must_use]
    pub fn on(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Set the action (builder pattern).
    #[must_use]
    pub fn with_action(mut self, action: ActionSpec) -> Self {
        self.action = Some(action);
        self
    }

    /// Set the proc chance in percent (builder pattern).
    #[must_use]
    pub fn with_chance(mut self, pct: f32) -> Self {
        self.proc_chance_pct = pct;
        self
    }

    /// Set the global ICD (builder pattern).
    #[must_use]
    pub fn with_icd_ms(mut self, ms: u64) -> Self {
        self.icd_ms = ms;
        self
    }

    /// Set the per-target ICD (builder pattern).
    #[must_use]
    pub fn with_per_target_icd_ms(mut self, ms: u64) -> Self {
        self.per_target_icd_ms = ms;
        self
    }

    /// Set the slot (builder pattern).
    #[must_use]
    pub fn with_slot(mut self, slot: AffixSlot) -> Self {
        self.slot = slot;
        self
    }

    /// Set the passive payload (builder pattern).
    #[must_use]
    pub fn with_passive(mut self, passive: PassiveSpec) -> Self {
        self.passive = Some(passive);
        self
    }

    /// Set low-health thresholds (builder pattern).
    #[must_use]
    pub fn with_low_health(mut self, threshold_pct: f32, rearm_pct: f32) -> Self {
        self.low_health = Some(LowHealthSpec { threshold_pct, rearm_pct });
        self
    }

    /// Set loot metadata (builder pattern).
    #[must_use]
    pub fn with_loot(mut self, weight: f32, loot_type: LootType) -> Self {
        self.loot = LootMeta { weight, loot_type };
        self
    }

    /// True for actions with their own dispatch path.
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.action.as_ref().is_some_and(ActionSpec::is_special)
    }

    /// Validate the definition in isolation (table-level checks happen on registration).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }
        let invalid = |field: &'static str, reason: &str| ConfigError::InvalidField {
            id: self.id.clone(),
            field,
            reason: reason.to_string(),
        };

        if self.action.is_none() && self.passive.is_none() {
            return Err(ConfigError::EmptyAffix(self.id.clone()));
        }
        if let Some(action) = &self.action {
            if !action.is_special() && self.trigger.is_none() {
                return Err(ConfigError::MissingTrigger(self.id.clone()));
            }
            action.validate(&self.id)?;
        }
        if self.passive.is_some() && self.slot == AffixSlot::Prefix {
            return Err(invalid("passive", "prefixes cannot carry a passive"));
        }
        if !self.proc_chance_pct.is_finite() || self.proc_chance_pct < 0.0 {
            return Err(invalid("proc_chance_pct", "must be a non-negative number"));
        }
        if !self.lucky_hit_chance_pct.is_finite() || self.lucky_hit_chance_pct < 0.0 {
            return Err(invalid("lucky_hit_chance_pct", "must be a non-negative number"));
        }
        if self.trigger == Some(Trigger::LowHealth) && !self.is_special() {
            match self.low_health {
                None => return Err(invalid("low_health", "required for LowHealth triggers")),
                Some(spec) if !(spec.threshold_pct > 0.0 && spec.rearm_pct > spec.threshold_pct) => {
                    return Err(invalid("low_health", "rearm_pct must exceed threshold_pct > 0"));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
