//! Error types.
//!
//! Nothing here ever reaches the host as a panic. Config errors skip the
//! offending definition; slot and craft errors reject the single operation.

use thiserror::Error;

use super::ids::{AffixToken, InstanceKey};

/// A rejected affix definition at config load.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Definition has an empty id.
    #[error("affix id is empty")]
    EmptyId,

    /// Another definition already uses this id.
    #[error("duplicate affix id '{0}'")]
    DuplicateId(String),

    /// Two different ids hash to the same token.
    #[error("token collision: '{id}' and '{existing}' both hash to {token}")]
    TokenCollision {
        id: String,
        existing: String,
        token: AffixToken,
    },

    /// A non-special action needs a trigger to be dispatched.
    #[error("affix '{0}' has a triggered action but no trigger")]
    MissingTrigger(String),

    /// Nothing to do: no action and no passive payload.
    #[error("affix '{0}' has neither an action nor a passive")]
    EmptyAffix(String),

    /// A spell reference is zero.
    #[error("affix '{id}' is missing a spell reference for {field}")]
    MissingSpell { id: String, field: &'static str },

    /// A numeric field is out of its allowed range.
    #[error("affix '{id}' has invalid {field}: {reason}")]
    InvalidField {
        id: String,
        field: &'static str,
        reason: String,
    },
}

/// A rejected change to an item instance's affix slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    /// All slots are occupied.
    #[error("affix slots full")]
    Full,

    /// The token is already bound to this instance.
    #[error("affix already present")]
    Duplicate,

    /// Token zero is reserved.
    #[error("invalid affix token")]
    InvalidToken,
}

/// A rejected crafting or loot operation. `Display` is user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CraftError {
    /// No recipe with this id.
    #[error("unknown runeword")]
    UnknownRecipe,

    /// The instance has no runeword base selected.
    #[error("no runeword base selected")]
    NoBaseSelected,

    /// The inserted rune is not the next one the recipe expects.
    #[error("wrong rune for this runeword")]
    WrongRune,

    /// The recipe is already complete on this instance.
    #[error("runeword already complete")]
    AlreadyComplete,

    /// The result token could not be bound.
    #[error("{0}")]
    Slots(#[from] SlotError),

    /// The result affix is not in the loaded table.
    #[error("runeword result affix is not loaded")]
    ResultNotLoaded,

    /// Instance already rolled.
    #[error("{0} already has affixes")]
    AlreadyRolled(InstanceKey),
}

/// Save/load failures.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The save blob failed to encode or decode.
    #[error("save data codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The blob was written by an incompatible version.
    #[error("unsupported save version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}
