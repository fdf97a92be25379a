//! Run-wide determinism.
//!
//! One seed drives everything: the backend's parameter initialization,
//! data-loader shuffling, and the augmentation stream. Two runs with
//! the same seed and the same flags produce identical numbers.

use burn::tensor::backend::Backend;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Seeds the backend and returns the RNG used for everything outside
/// the tensor framework.
pub fn seed_everything<B: Backend>(seed: u64) -> ChaCha8Rng {
    B::seed(seed);
    info!(seed, "seeded backend and data pipeline");
    ChaCha8Rng::seed_from_u64(seed)
}
