//! Per-instance affix slots.
//!
//! Each item instance carries up to [`AFFIX_SLOT_CAPACITY`] affix tokens.
//! Slot 0 is the primary affix (the one named on the item). Tokens are
//! unique within an instance.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{AffixToken, SlotError};

/// Maximum affixes per item instance.
pub const AFFIX_SLOT_CAPACITY: usize = 4;

/// Ordered, duplicate-free token list bound to one item instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceAffixSlots {
    tokens: SmallVec<[AffixToken; AFFIX_SLOT_CAPACITY]>,
}

impl InstanceAffixSlots {
    /// Empty slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots holding a single primary token.
    #[must_use]
    pub fn with_primary(token: AffixToken) -> Self {
        let mut slots = Self::new();
        slots.replace_all(token);
        slots
    }

    /// Build from a token list, skipping invalid and duplicate tokens and
    /// anything past capacity.
    #[must_use]
    pub fn from_tokens(tokens: impl IntoIterator<Item = AffixToken>) -> Self {
        let mut slots = Self::new();
        for token in tokens {
            let _ = slots.add_token(token);
        }
        slots
    }

    /// Append a token.
    pub fn add_token(&mut self, token: AffixToken) -> Result<(), SlotError> {
        if !token.is_valid() {
            return Err(SlotError::InvalidToken);
        }
        if self.has_token(token) {
            return Err(SlotError::Duplicate);
        }
        if self.is_full() {
            return Err(SlotError::Full);
        }
        self.tokens.push(token);
        Ok(())
    }

    /// True if `token` is bound.
    #[must_use]
    pub fn has_token(&self, token: AffixToken) -> bool {
        self.tokens.contains(&token)
    }

    /// Remove a token, keeping the order of the rest. Returns whether it was present.
    pub fn remove_token(&mut self, token: AffixToken) -> bool {
        match self.tokens.iter().position(|&t| t == token) {
            Some(pos) => {
                self.tokens.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Replace every token with a single primary token.
    pub fn replace_all(&mut self, token: AffixToken) {
        self.tokens.clear();
        if token.is_valid() {
            self.tokens.push(token);
        }
    }

    /// The primary (slot 0) token.
    #[must_use]
    pub fn primary(&self) -> Option<AffixToken> {
        self.tokens.first().copied()
    }

    /// Move `token` to slot 0, inserting it if absent.
    ///
    /// Existing tokens keep their relative order. Fails without mutating when
    /// `token` is new and every slot is taken.
    pub fn promote_token_to_primary(&mut self, token: AffixToken) -> Result<(), SlotError> {
        if !token.is_valid() {
            return Err(SlotError::InvalidToken);
        }
        match self.tokens.iter().position(|&t| t == token) {
            Some(0) => Ok(()),
            Some(pos) => {
                self.tokens.remove(pos);
                self.tokens.insert(0, token);
                Ok(())
            }
            None if self.is_full() => Err(SlotError::Full),
            None => {
                self.tokens.insert(0, token);
                Ok(())
            }
        }
    }

    /// Number of bound tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True if no tokens are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True if every slot is taken.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.tokens.len() >= AFFIX_SLOT_CAPACITY
    }

    /// Tokens in slot order.
    pub fn iter(&self) -> impl Iterator<Item = AffixToken> + '_ {
        self.tokens.iter().copied()
    }

    /// Tokens as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[AffixToken] {
        &self.tokens
    }
}
