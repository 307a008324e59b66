//! Deterministic random number generation for proc rolls and loot.
//!
//! ## Key Features
//!
//! - **Deterministic**: Same seed produces identical sequence
//! - **Percent rolls**: `roll_percent` short-circuits 0% and 100%
//! - **Context streams**: Independent sequences for loot vs. combat
//!
//! ```
//! use affix_engine::core::ProcRng;
//!
//! let mut rng = ProcRng::new(42);
//! assert!(rng.roll_percent(100.0));
//! assert!(!rng.roll_percent(0.0));
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::ids::stable_hash;

/// Deterministic RNG used for every chance roll in the engine.
///
/// Uses ChaCha8 for speed while keeping a well-distributed stream.
#[derive(Clone, Debug)]
pub struct ProcRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl ProcRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create an independent stream for a specific context.
    ///
    /// Loot rolls use their own stream so that opening a chest never shifts
    /// the combat proc sequence.
    #[must_use]
    pub fn for_context(&self, context: &str) -> Self {
        let context_seed = self.seed ^ stable_hash(context).rotate_left(17);
        Self::new(context_seed)
    }

    /// Roll a percent chance in `[0, 100]`.
    ///
    /// Values `<= 0` never pass and values `>= 100` always pass without
    /// consuming randomness.
    pub fn roll_percent(&mut self, chance_pct: f32) -> bool {
        if !(chance_pct > 0.0) {
            return false;
        }
        if chance_pct >= 100.0 {
            return true;
        }
        self.inner.gen_range(0.0f32..100.0) < chance_pct
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.inner);
    }

    /// Choose a random element with weighted probability.
    ///
    /// Returns the index of the chosen element.
    /// Weights do not need to sum to 1.0. Negative weights count as zero.
    ///
    /// Returns `None` if weights are empty or all zero.
    pub fn choose_weighted(&mut self, weights: &[f32]) -> Option<usize> {
        let total: f32 = weights.iter().map(|w| w.max(0.0)).sum();
        if !(total > 0.0) {
            return None;
        }

        let mut threshold = self.inner.gen::<f32>() * total;
        let mut last_positive = None;

        for (i, &weight) in weights.iter().enumerate() {
            if weight <= 0.0 {
                continue;
            }
            last_positive = Some(i);
            threshold -= weight;
            if threshold <= 0.0 {
                return Some(i);
            }
        }

        // Floating point edge case - return last non-zero weight
        last_positive
    }
}
