//! Loot-time affix rolling.
//!
//! When an unrolled item enters the player's inventory the engine may bind
//! a few affixes to it. Loot weight and proc chance are independent: a rare
//! affix can still proc reliably once it drops.
//!
//! ## Key Features
//!
//! - **Eligibility**: only affixes with a positive weight whose loot type
//!   accepts the item
//! - **Weighted draws without replacement**, pool shuffled first
//! - **Caps**: total affixes (never above the slot capacity) and suffixes
//! - **Deterministic**: the caller supplies the stream
//!
//! ```
//! use affix_engine::affixes::{ActionSpec, AffixDefinition, AffixTable, LootType, Trigger};
//! use affix_engine::core::{LootSettings, ProcRng};
//! use affix_engine::loot::roll_affixes;
//!
//! let mut table = AffixTable::new();
//! table
//!     .register(
//!         AffixDefinition::new("spark")
//!             .on(Trigger::Hit)
//!             .with_action(ActionSpec::DebugNotify { message: "spark".into() })
//!             .with_loot(1.0, LootType::Weapon),
//!     )
//!     .unwrap();
//!
//! let settings = LootSettings { affix_chance_pct: 100.0, ..Default::default() };
//! let slots = roll_affixes(&table, LootType::Weapon, &settings, &mut ProcRng::new(1));
//! assert_eq!(slots.len(), 1);
//! let none = roll_affixes(&table, LootType::Armor, &settings, &mut ProcRng::new(1));
//! assert!(none.is_empty());
//! ```

use tracing::trace;

use crate::affixes::{AffixIndex, AffixSlot, AffixTable, InstanceAffixSlots, LootType, AFFIX_SLOT_CAPACITY};
use crate::core::{LootSettings, ProcRng};

/// Roll a fresh slot set for an item of `item_type`. May be empty.
pub fn roll_affixes(
    table: &AffixTable,
    item_type: LootType,
    settings: &LootSettings,
    rng: &mut ProcRng,
) -> InstanceAffixSlots {
    let mut slots = InstanceAffixSlots::new();
    if !rng.roll_percent(settings.affix_chance_pct) {
        return slots;
    }

    let mut pool: Vec<AffixIndex> = table
        .iter()
        .filter(|(_, def)| def.loot.weight > 0.0 && def.loot.loot_type.accepts(item_type))
        .map(|(idx, _)| idx)
        .collect();
    rng.shuffle(&mut pool);

    let max = settings.max_affixes.min(AFFIX_SLOT_CAPACITY);
    let mut suffixes = 0;
    while slots.len() < max && !pool.is_empty() {
        if !slots.is_empty() && !rng.roll_percent(settings.extra_affix_chance_pct) {
            break;
        }
        let weights: Vec<f32> = pool.iter().map(|&idx| table[idx].loot.weight).collect();
        let Some(pick) = rng.choose_weighted(&weights) else {
            break;
        };
        let def = &table[pool.swap_remove(pick)];

        let is_suffix = def.slot == AffixSlot::Suffix;
        if is_suffix && suffixes >= settings.max_suffixes {
            trace!(affix = %def.id, "suffix cap reached");
            continue;
        }
        if slots.add_token(def.token).is_ok() && is_suffix {
            suffixes += 1;
        }
    }
    slots
}
