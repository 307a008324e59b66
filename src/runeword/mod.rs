//! Runeword crafting.
//!
//! A runeword is an ordered list of runes. Once every rune has been
//! inserted into a base item, the recipe's result affix is bound to that
//! item instance, either added as the new primary affix or replacing
//! everything the item had.
//!
//! Crafting only writes [`InstanceAffixSlots`](crate::affixes::InstanceAffixSlots);
//! the trigger engine picks the result up on its next resync.
//!
//! ```
//! use affix_engine::core::AffixToken;
//! use affix_engine::runeword::{advance, RuneInsert, RunewordCatalog, RunewordProgress, RunewordRecipe};
//!
//! let (catalog, _) = RunewordCatalog::from_recipes([
//!     RunewordRecipe::new("lore", &["ort", "sol"], "lore_wisdom"),
//! ]);
//! let recipe = catalog.by_id("lore").unwrap();
//! let mut progress = RunewordProgress::start(recipe.token);
//!
//! let step = advance(&mut progress, recipe, AffixToken::from_id("ort")).unwrap();
//! assert_eq!(step, RuneInsert::Progress { inserted: 1, required: 2 });
//! ```

pub mod recipe;
pub mod progress;

pub use recipe::{CompiledRecipe, RunewordCatalog, RunewordRecipe};
pub use progress::{advance, complete, RuneInsert, RunewordProgress};
