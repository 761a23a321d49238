//! Deterministic, key-scoped random draws.
//!
//! Every randomized planet parameter derives its value from
//! `(seed, property key)` through a fixed mixing function, so re-rolling one
//! property never perturbs another and the same seed pair always reproduces
//! the same planet bit for bit. No ambient/global generator state is read or
//! written — each draw constructs its own [`StdRng`] from the derived seed
//! and throws it away.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The `(primary, variation)` seed pair that drives all non-overridden
/// randomization for one planet. Immutable once set except by an explicit
/// re-roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SeedPair {
    /// Drives blueprint selection and all property defaults.
    pub primary: u32,
    /// Reserved lane for per-instance variation draws (ring presence etc.)
    /// that must not shift property defaults.
    pub variation: u32,
}

impl SeedPair {
    pub const fn new(primary: u32, variation: u32) -> Self {
        Self { primary, variation }
    }
}

/// Derive a child seed for one named purpose.
///
/// FNV-1a over the key bytes, folded into the base seed with a 64-bit
/// multiply-xorshift finisher. Fixed for the life of the crate: serialized
/// planets depend on stored values, not on this function, but determinism
/// tests and blueprint-constrained re-rolls do.
#[must_use]
pub fn derive(base: u32, key: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash ^= u64::from(base);
    hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
    hash ^ (hash >> 32)
}

/// A draw in `[0, 1)` for `(seed, key)`. Pure function of its inputs.
#[must_use]
pub fn seeded_float(seed: u32, key: &str) -> f32 {
    StdRng::seed_from_u64(derive(seed, key)).random::<f32>()
}

/// A draw in `[0, n)` for `(seed, key)`.
///
/// # Panics
/// `n == 0` is a caller contract violation and panics by design.
#[must_use]
pub fn seeded_index(seed: u32, key: &str, n: usize) -> usize {
    assert!(n > 0, "seeded_index requires n > 0 (got 0 for key {key:?})");
    StdRng::seed_from_u64(derive(seed, key)).random_range(0..n)
}
