//! Per-instance runeword progress.

use serde::{Deserialize, Serialize};

use crate::core::{AffixToken, CraftError};

use super::recipe::CompiledRecipe;

/// Which recipe an item instance is being crafted into, and how far along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunewordProgress {
    pub recipe: AffixToken,
    pub inserted: u8,
    pub completed: bool,
}

impl RunewordProgress {
    /// Fresh progress toward `recipe`.
    #[must_use]
    pub fn start(recipe: AffixToken) -> Self {
        Self {
            recipe,
            inserted: 0,
            completed: false,
        }
    }

    /// Rune the recipe expects next, if any.
    #[must_use]
    pub fn next_rune(&self, recipe: &CompiledRecipe) -> Option<AffixToken> {
        if self.completed {
            return None;
        }
        recipe.runes.get(usize::from(self.inserted)).copied()
    }
}

/// Result of a successful rune insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuneInsert {
    /// More runes are needed.
    Progress { inserted: usize, required: usize },
    /// The last rune went in; `affix` was bound to the item.
    Completed { affix: AffixToken },
}

/// Advance `progress` by one rune. Completion is reported but not applied.
pub fn advance(
    progress: &mut RunewordProgress,
    recipe: &CompiledRecipe,
    rune: AffixToken,
) -> Result<RuneInsert, CraftError> {
    if progress.completed {
        return Err(CraftError::AlreadyComplete);
    }
    match progress.next_rune(recipe) {
        Some(expected) if expected == rune => {}
        _ => return Err(CraftError::WrongRune),
    }

    let inserted = usize::from(progress.inserted) + 1;
    if inserted >= recipe.required() {
        Ok(RuneInsert::Completed { affix: recipe.result })
    } else {
        progress.inserted = inserted as u8;
        Ok(RuneInsert::Progress {
            inserted,
            required: recipe.required(),
        })
    }
}

/// Mark the final rune as inserted.
pub fn complete(progress: &mut RunewordProgress, recipe: &CompiledRecipe) {
    progress.inserted = recipe.required().min(usize::from(u8::MAX)) as u8;
    progress.completed = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runeword::{RunewordCatalog, RunewordRecipe};

    fn recipe() -> CompiledRecipe {
        let (catalog, _) = RunewordCatalog::from_recipes([RunewordRecipe::new("steel", &["tir", "el"], "steel_edge")]);
        catalog.by_id("steel").unwrap().clone()
    }

    #[test]
    fn test_runes_in_order() {
        let recipe = recipe();
        let mut progress = RunewordProgress::start(recipe.token);

        assert_eq!(
            advance(&mut progress, &recipe, AffixToken::from_id("el")),
            Err(CraftError::WrongRune)
        );
        assert_eq!(
            advance(&mut progress, &recipe, AffixToken::from_id("tir")),
            Ok(RuneInsert::Progress { inserted: 1, required: 2 })
        );
        assert_eq!(
            advance(&mut progress, &recipe, AffixToken::from_id("el")),
            Ok(RuneInsert::Completed { affix: AffixToken::from_id("steel_edge") })
        );
        // Completion is only recorded by the caller
        assert!(!progress.completed);

        complete(&mut progress, &recipe);
        assert_eq!(progress.next_rune(&recipe), None);
        assert_eq!(
            advance(&mut progress, &recipe, AffixToken::from_id("el")),
            Err(CraftError::AlreadyComplete)
        );
    }
}
