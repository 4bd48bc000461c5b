//! Reseedable identifier generation
//!
//! Exported files cross-reference nodes and mesh containers by GUID, and a
//! re-export of an unchanged assembly must produce byte-identical output.
//! Identifiers therefore come from an explicit generator object that can be
//! reseeded before each run, rather than from ambient randomness.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use uuid::Uuid;

/// Seed used when no explicit seed is given.
///
/// Two fresh generators with the same seed yield the same identifier
/// sequence, which is what makes repeated exports reproducible.
pub const DEFAULT_SEED: u64 = 0x4258_4421_5349_4D21;

/// Deterministic, reseedable GUID source.
///
/// Identifiers are unique within one generator run. The generator is not
/// thread-safe; callers that export concurrently use one generator per
/// export.
#[derive(Debug)]
pub struct GuidGenerator {
    seed: u64,
    rng: StdRng,
}

impl GuidGenerator {
    /// Create a generator with the default seed
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Create a generator with an explicit seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Produce the next identifier in the sequence
    pub fn next_id(&mut self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    /// Rewind the generator to the start of its sequence
    ///
    /// After a reset, `next_id` replays the exact sequence a fresh generator
    /// with the same seed would produce.
    pub fn reset_seed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    /// The seed this generator replays from
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for GuidGenerator {
    fn default() -> Self {
        Self::new()
    }
}
