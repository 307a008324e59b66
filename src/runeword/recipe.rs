//! Runeword recipes and the recipe catalog.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::warn;

use crate::core::{AffixToken, ConfigError};

/// A recipe as it appears in config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunewordRecipe {
    pub id: String,
    /// Rune ids in insertion order.
    pub runes: Vec<String>,
    /// Affix id bound to the item on completion.
    pub result_affix: String,
    /// Wipe the item's other affixes on completion instead of adding.
    pub replace_existing: bool,
}

impl RunewordRecipe {
    /// Create a recipe.
    pub fn new(id: impl Into<String>, runes: &[&str], result_affix: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            runes: runes.iter().map(|r| (*r).to_string()).collect(),
            result_affix: result_affix.into(),
            replace_existing: false,
        }
    }

    /// Replace existing affixes on completion (builder pattern).
    #[must_use]
    pub fn replacing(mut self) -> Self {
        self.replace_existing = true;
        self
    }
}

/// A validated recipe with ids resolved to tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledRecipe {
    pub id: String,
    pub token: AffixToken,
    pub runes: SmallVec<[AffixToken; 6]>,
    pub result: AffixToken,
    pub replace_existing: bool,
}

impl CompiledRecipe {
    /// Number of runes required.
    #[must_use]
    pub fn required(&self) -> usize {
        self.runes.len()
    }
}

/// All loaded recipes.
#[derive(Clone, Debug, Default)]
pub struct RunewordCatalog {
    recipes: Vec<CompiledRecipe>,
    by_token: FxHashMap<AffixToken, usize>,
}

impl RunewordCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile recipes, skipping (and logging) invalid ones.
    pub fn from_recipes(recipes: impl IntoIterator<Item = RunewordRecipe>) -> (Self, Vec<ConfigError>) {
        let mut catalog = Self::new();
        let mut errors = Vec::new();
        for recipe in recipes {
            if let Err(err) = catalog.add(recipe) {
                warn!(error = %err, "skipping runeword recipe");
                errors.push(err);
            }
        }
        (catalog, errors)
    }

    /// Validate and add one recipe.
    pub fn add(&mut self, recipe: RunewordRecipe) -> Result<(), ConfigError> {
        if recipe.id.trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }
        let invalid = |field: &'static str, reason: &str| ConfigError::InvalidField {
            id: recipe.id.clone(),
            field,
            reason: reason.to_string(),
        };
        if recipe.runes.is_empty() || recipe.runes.iter().any(|r| r.trim().is_empty()) {
            return Err(invalid("runes", "needs at least one non-empty rune id"));
        }
        if recipe.result_affix.trim().is_empty() {
            return Err(invalid("result_affix", "must name an affix"));
        }

        let token = AffixToken::from_id(&recipe.id);
        if self.by_token.contains_key(&token) {
            return Err(ConfigError::DuplicateId(recipe.id));
        }

        let compiled = CompiledRecipe {
            token,
            runes: recipe.runes.iter().map(|r| AffixToken::from_id(r)).collect(),
            result: AffixToken::from_id(&recipe.result_affix),
            replace_existing: recipe.replace_existing,
            id: recipe.id,
        };
        self.by_token.insert(token, self.recipes.len());
        self.recipes.push(compiled);
        Ok(())
    }

    /// Look up by token.
    #[must_use]
    pub fn get(&self, token: AffixToken) -> Option<&CompiledRecipe> {
        self.by_token.get(&token).map(|&i| &self.recipes[i])
    }

    /// Look up by recipe id.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<&CompiledRecipe> {
        self.get(AffixToken::from_id(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRecipe> {
        self.recipes.iter()
    }
}
