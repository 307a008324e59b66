//! Action specifications.
//!
//! [`ActionSpec`] is a sum type: each variant carries only the fields its
//! executor reads. Validation happens once at registration so executors can
//! treat the spec as well-formed.
//!
//! ## Special vs. triggered actions
//!
//! Triggered actions (`DebugNotify`, `CastSpell`, `CastSpellAdaptiveElement`,
//! `SpawnTrap`) fire through the affix's trigger list. Special actions have
//! their own dispatch path and selection rule, so their affix needs no
//! trigger:
//!
//! | Action | Dispatched on | Selection |
//! |---|---|---|
//! | `CastOnCrit` | outgoing crit / power attack | round-robin |
//! | `ConvertDamage` | outgoing damage | highest `convert_pct` |
//! | `MindOverMatter` | incoming damage | highest `damage_to_magicka_pct` |
//! | `Archmage` | outgoing spell hit | highest `damage_pct_of_max_magicka` |
//! | `CorpseExplosion` | player kill | highest computed damage |
//! | `SummonCorpseExplosion` | summon kill | highest computed damage |

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{ConfigError, SpellId};

/// Where a scaled magnitude takes its base value from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagnitudeSource {
    /// Constant: only `add` contributes.
    #[default]
    None,
    /// Physical damage dealt by the triggering hit.
    HitPhysicalDealt,
    /// Total damage dealt by the triggering hit.
    HitTotalDealt,
}

/// `magnitude = clamp(base * mult + add, min, max)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnitudeScaling {
    pub source: MagnitudeSource,
    pub mult: f32,
    pub add: f32,
    pub min: f32,
    pub max: Option<f32>,
    /// Never go below the spell's own base magnitude.
    pub spell_base_as_min: bool,
}

impl Default for MagnitudeScaling {
    fn default() -> Self {
        Self {
            source: MagnitudeSource::None,
            mult: 1.0,
            add: 0.0,
            min: 0.0,
            max: None,
            spell_base_as_min: false,
        }
    }
}

/// Who receives a cast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastTarget {
    /// The trigger's target (the enemy hit, the attacker, the corpse).
    #[default]
    Target,
    /// The affix owner.
    Owner,
}

/// One evolution stage: reaching `xp_required` unlocks `magnitude_mult`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStage {
    pub xp_required: u32,
    pub magnitude_mult: f32,
}

/// XP-driven magnitude growth for an item instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionSpec {
    pub xp_per_proc: u32,
    pub stages: Vec<EvolutionStage>,
}

impl EvolutionSpec {
    /// Index of the highest stage reached, or `None` before the first stage.
    #[must_use]
    pub fn stage_for(&self, xp: u32) -> Option<usize> {
        self.stages
            .iter()
            .enumerate()
            .filter(|(_, stage)| stage.xp_required <= xp)
            .max_by_key(|(_, stage)| stage.xp_required)
            .map(|(i, _)| i)
    }

    /// Magnitude multiplier at `xp`.
    #[must_use]
    pub fn multiplier_for(&self, xp: u32) -> f32 {
        self.stage_for(xp)
            .map_or(1.0, |i| self.stages[i].magnitude_mult)
    }
}

/// Rotating spell payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeCycleSpec {
    pub spells: SmallVec<[SpellId; 4]>,
    /// Procs per mode before switching.
    pub switch_every: u32,
    /// Only cycle through an explicit request.
    pub manual_only: bool,
}

/// Payload for `CastSpell` and `CastOnCrit`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastSpellSpec {
    pub spell: SpellId,
    pub target: CastTarget,
    pub scaling: Option<MagnitudeScaling>,
    pub evolution: Option<EvolutionSpec>,
    pub mode_cycle: Option<ModeCycleSpec>,
}

/// Elemental damage families the adaptive cast chooses between.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    #[default]
    Fire,
    Frost,
    Shock,
}

impl Element {
    /// Tie-break priority order.
    pub const PRIORITY: [Element; 3] = [Element::Fire, Element::Frost, Element::Shock];
}

/// How the adaptive cast ranks resistances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaptiveMode {
    /// Pick the element the target resists least.
    #[default]
    WeakestResist,
    /// Pick the element the target resists most.
    StrongestResist,
}

/// One spell per element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpells {
    pub fire: SpellId,
    pub frost: SpellId,
    pub shock: SpellId,
}

impl ElementSpells {
    /// Spell for `element`.
    #[must_use]
    pub fn get(&self, element: Element) -> SpellId {
        match element {
            Element::Fire => self.fire,
            Element::Frost => self.frost,
            Element::Shock => self.shock,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveElementSpec {
    pub spells: ElementSpells,
    pub mode: AdaptiveMode,
    pub target: CastTarget,
    pub scaling: Option<MagnitudeScaling>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertDamageSpec {
    pub element: Element,
    pub spell: SpellId,
    /// Share of physical damage converted, in percent.
    pub convert_pct: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MindOverMatterSpec {
    /// Share of incoming damage taken from magicka instead of health.
    pub damage_to_magicka_pct: f32,
    pub max_redirect_per_hit: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchmageSpec {
    pub spell: SpellId,
    pub damage_pct_of_max_magicka: f32,
    pub cost_pct_of_max_magicka: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpseExplosionSpec {
    pub spell: SpellId,
    pub flat_damage: f32,
    pub pct_of_corpse_max_health: f32,
    pub radius: f32,
    pub max_targets: usize,
    /// Rate-limit window shared by every corpse explosion.
    pub window_ms: u64,
    pub max_per_window: u32,
    pub chain_window_ms: u64,
    pub chain_falloff: f32,
    pub max_chain_depth: u32,
}

impl Default for CorpseExplosionSpec {
    fn default() -> Self {
        Self {
            spell: SpellId::NONE,
            flat_damage: 0.0,
            pct_of_corpse_max_health: 0.0,
            radius: 0.0,
            max_targets: 8,
            window_ms: 1_000,
            max_per_window: 4,
            chain_window_ms: 0,
            chain_falloff: 1.0,
            max_chain_depth: 0,
        }
    }
}

impl CorpseExplosionSpec {
    /// Base damage before chain falloff.
    #[must_use]
    pub fn base_damage(&self, corpse_max_health: f32) -> f32 {
        self.flat_damage + self.pct_of_corpse_max_health / 100.0 * corpse_max_health.max(0.0)
    }
}

/// Where a spawned trap is placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrapAnchor {
    #[default]
    OwnerFeet,
    TargetFeet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTrapSpec {
    pub spells: SmallVec<[SpellId; 2]>,
    pub radius: f32,
    pub anchor: TrapAnchor,
    pub arm_delay_ms: u64,
    pub ttl_ms: u64,
    /// Zero means the trap is consumed by its first trigger.
    pub rearm_delay_ms: u64,
    /// Zero means unlimited (until expiry).
    pub max_triggers: u32,
    /// Per-affix cap on live traps.
    pub max_active: usize,
    pub require_weapon_hit: bool,
    pub require_crit_or_power_attack: bool,
    pub scaling: Option<MagnitudeScaling>,
}

impl Default for SpawnTrapSpec {
    fn default() -> Self {
        Self {
            spells: SmallVec::new(),
            radius: 0.0,
            anchor: TrapAnchor::OwnerFeet,
            arm_delay_ms: 0,
            ttl_ms: 10_000,
            rearm_delay_ms: 0,
            max_triggers: 1,
            max_active: 3,
            require_weapon_hit: false,
            require_crit_or_power_attack: false,
            scaling: None,
        }
    }
}

/// Discriminant of [`ActionSpec`], used for dispatch bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    DebugNotify,
    CastSpell,
    CastSpellAdaptiveElement,
    CastOnCrit,
    ConvertDamage,
    MindOverMatter,
    Archmage,
    CorpseExplosion,
    SummonCorpseExplosion,
    SpawnTrap,
}

/// What an affix does when it procs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionSpec {
    DebugNotify { message: String },
    CastSpell(CastSpellSpec),
    CastSpellAdaptiveElement(AdaptiveElementSpec),
    CastOnCrit(CastSpellSpec),
    ConvertDamage(ConvertDamageSpec),
    MindOverMatter(MindOverMatterSpec),
    Archmage(ArchmageSpec),
    CorpseExplosion(CorpseExplosionSpec),
    SummonCorpseExplosion(CorpseExplosionSpec),
    SpawnTrap(SpawnTrapSpec),
}

impl ActionSpec {
    /// Variant discriminant.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::DebugNotify { .. } => ActionKind::DebugNotify,
            Self::CastSpell(_) => ActionKind::CastSpell,
            Self::CastSpellAdaptiveElement(_) => ActionKind::CastSpellAdaptiveElement,
            Self::CastOnCrit(_) => ActionKind::CastOnCrit,
            Self::ConvertDamage(_) => ActionKind::ConvertDamage,
            Self::MindOverMatter(_) => ActionKind::MindOverMatter,
            Self::Archmage(_) => ActionKind::Archmage,
            Self::CorpseExplosion(_) => ActionKind::CorpseExplosion,
            Self::SummonCorpseExplosion(_) => ActionKind::SummonCorpseExplosion,
            Self::SpawnTrap(_) => ActionKind::SpawnTrap,
        }
    }

    /// Special actions have their own dispatch path and ignore the trigger.
    #[must_use]
    pub fn is_special(&self) -> bool {
        !matches!(
            self.kind(),
            ActionKind::DebugNotify
                | ActionKind::CastSpell
                | ActionKind::CastSpellAdaptiveElement
                | ActionKind::SpawnTrap
        )
    }

    /// Cast payload of `CastSpell` and `CastOnCrit`.
    #[must_use]
    pub fn cast_spec(&self) -> Option<&CastSpellSpec> {
        match self {
            Self::CastSpell(spec) | Self::CastOnCrit(spec) => Some(spec),
            _ => None,
        }
    }

    /// Every spell this action may cast.
    #[must_use]
    pub fn spells(&self) -> SmallVec<[SpellId; 4]> {
        let mut out: SmallVec<[SpellId; 4]> = SmallVec::new();
        match self {
            Self::DebugNotify { .. } | Self::MindOverMatter(_) => {}
            Self::CastSpell(spec) | Self::CastOnCrit(spec) => {
                out.push(spec.spell);
                if let Some(cycle) = &spec.mode_cycle {
                    out.extend(cycle.spells.iter().copied());
                }
            }
            Self::CastSpellAdaptiveElement(spec) => {
                out.extend(Element::PRIORITY.iter().map(|&e| spec.spells.get(e)));
            }
            Self::ConvertDamage(spec) => out.push(spec.spell),
            Self::Archmage(spec) => out.push(spec.spell),
            Self::CorpseExplosion(spec) | Self::SummonCorpseExplosion(spec) => out.push(spec.spell),
            Self::SpawnTrap(spec) => out.extend(spec.spells.iter().copied()),
        }
        out.retain(|spell| spell.is_valid());
        out
    }

    /// Check required fields. `id` is only used for error messages.
    pub fn validate(&self, id: &str) -> Result<(), ConfigError> {
        let missing = |field: &'static str| ConfigError::MissingSpell {
            id: id.to_string(),
            field,
        };
        let invalid = |field: &'static str, reason: &str| ConfigError::InvalidField {
            id: id.to_string(),
            field,
            reason: reason.to_string(),
        };

        match self {
            Self::DebugNotify { .. } => {}
            Self::CastSpell(spec) | Self::CastOnCrit(spec) => {
                let cycles = spec
                    .mode_cycle
                    .as_ref()
                    .is_some_and(|c| c.spells.iter().any(|s| s.is_valid()));
                if !spec.spell.is_valid() && !cycles {
                    return Err(missing("spell"));
                }
                if let Some(cycle) = &spec.mode_cycle {
                    if cycle.spells.iter().any(|s| !s.is_valid()) {
                        return Err(missing("mode_cycle.spells"));
                    }
                }
            }
            Self::CastSpellAdaptiveElement(spec) => {
                if Element::PRIORITY.iter().any(|&e| !spec.spells.get(e).is_valid()) {
                    return Err(missing("spells"));
                }
            }
            Self::ConvertDamage(spec) => {
                if !spec.spell.is_valid() {
                    return Err(missing("spell"));
                }
                if !(spec.convert_pct > 0.0 && spec.convert_pct <= 100.0) {
                    return Err(invalid("convert_pct", "must be in (0, 100]"));
                }
            }
            Self::MindOverMatter(spec) => {
                if !(spec.damage_to_magicka_pct > 0.0 && spec.damage_to_magicka_pct <= 100.0) {
                    return Err(invalid("damage_to_magicka_pct", "must be in (0, 100]"));
                }
            }
            Self::Archmage(spec) => {
                if !spec.spell.is_valid() {
                    return Err(missing("spell"));
                }
                if !(spec.damage_pct_of_max_magicka > 0.0) {
                    return Err(invalid("damage_pct_of_max_magicka", "must be positive"));
                }
                if spec.cost_pct_of_max_magicka < 0.0 {
                    return Err(invalid("cost_pct_of_max_magicka", "must not be negative"));
                }
            }
            Self::CorpseExplosion(spec) | Self::SummonCorpseExplosion(spec) => {
                if !spec.spell.is_valid() {
                    return Err(missing("spell"));
                }
                if !(spec.radius > 0.0) {
                    return Err(invalid("radius", "must be positive"));
                }
                if !(spec.chain_falloff > 0.0 && spec.chain_falloff <= 1.0) {
                    return Err(invalid("chain_falloff", "must be in (0, 1]"));
                }
            }
            Self::SpawnTrap(spec) => {
                if spec.spells.is_empty() || spec.spells.iter().any(|s| !s.is_valid()) {
                    return Err(missing("spells"));
                }
                if !(spec.radius > 0.0) {
                    return Err(invalid("radius", "must be positive"));
                }
                if spec.ttl_ms == 0 {
                    return Err(invalid("ttl_ms", "must be positive"));
                }
            }
        }
        Ok(())
    }
}
