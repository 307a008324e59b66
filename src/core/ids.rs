//! Identifier types.
//!
//! Every host object the engine talks about is referenced by a compact id:
//!
//! - [`ActorId`]: a live actor (player, summon, enemy). `0` is "no actor".
//! - [`FormId`]: a host record (spell, weapon, magic effect). `0` is "none".
//! - [`AffixToken`]: a stable 64-bit hash of an affix or rune id string.
//! - [`InstanceKey`]: one physical item instance (base form + unique id).
//!
//! ## Stable hashing
//!
//! Tokens must be identical across runs and save files, so they use FNV-1a
//! instead of the randomized std hasher.
//!
//! ```
//! use affix_engine::core::AffixToken;
//!
//! let a = AffixToken::from_id("fire_nova_on_hit");
//! let b = AffixToken::from_id("fire_nova_on_hit");
//! assert_eq!(a, b);
//! assert_ne!(a, AffixToken::from_id("frost_nova_on_hit"));
//! ```

use serde::{Deserialize, Serialize};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Incremental FNV-1a 64-bit hasher.
///
/// Used for affix tokens, instance keys and hit signatures.
#[derive(Clone, Copy, Debug)]
pub struct Fnv1a(u64);

impl Fnv1a {
    /// Start a new hash at the FNV offset basis.
    #[must_use]
    pub const fn new() -> Self {
        Self(FNV_OFFSET_BASIS)
    }

    /// Mix raw bytes.
    #[must_use]
    pub const fn bytes(mut self, bytes: &[u8]) -> Self {
        let mut i = 0;
        while i < bytes.len() {
            self.0 ^= bytes[i] as u64;
            self.0 = self.0.wrapping_mul(FNV_PRIME);
            i += 1;
        }
        self
    }

    /// Mix a `u32` (little endian).
    #[must_use]
    pub const fn u32(self, value: u32) -> Self {
        self.bytes(&value.to_le_bytes())
    }

    /// Mix a `u64` (little endian).
    #[must_use]
    pub const fn u64(self, value: u64) -> Self {
        self.bytes(&value.to_le_bytes())
    }

    /// Mix the bit pattern of an `f32`.
    #[must_use]
    pub fn f32(self, value: f32) -> Self {
        self.u32(value.to_bits())
    }

    /// Finish and return the hash.
    #[must_use]
    pub const fn finish(self) -> u64 {
        self.0
    }
}

impl Default for Fnv1a {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable 64-bit hash of a string id.
#[must_use]
pub const fn stable_hash(id: &str) -> u64 {
    Fnv1a::new().bytes(id.as_bytes()).finish()
}

/// Host actor identifier. `ActorId::NONE` (0) never refers to a live actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl ActorId {
    /// The invalid/absent actor.
    pub const NONE: ActorId = ActorId(0);

    /// Create a new actor ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// True for any non-zero id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Actor({:#010x})", self.0)
    }
}

/// Host record identifier (spells, weapons, magic effects).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormId(pub u32);

impl FormId {
    /// No form.
    pub const NONE: FormId = FormId(0);

    /// Create a new form ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// True for any non-zero id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for FormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Form({:#010x})", self.0)
    }
}

/// Spell records are plain forms.
pub type SpellId = FormId;

/// Stable token identifying an affix (or rune) by its string id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AffixToken(pub u64);

impl AffixToken {
    /// Token for a string id.
    #[must_use]
    pub const fn from_id(id: &str) -> Self {
        Self(stable_hash(id))
    }

    /// Get the raw token value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Zero is reserved as "no token".
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for AffixToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({:#018x})", self.0)
    }
}

/// Identity of one physical item instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey(pub u64);

impl InstanceKey {
    /// Build a key from the item's base form and its per-instance unique id.
    #[must_use]
    pub const fn new(base: FormId, unique_id: u16) -> Self {
        Self(((base.0 as u64) << 16) | unique_id as u64)
    }

    /// Base form of the item.
    #[must_use]
    pub const fn base(self) -> FormId {
        FormId((self.0 >> 16) as u32)
    }

    /// Per-instance unique id.
    #[must_use]
    pub const fn unique_id(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instance({}:{})", self.base(), self.unique_id())
    }
}
