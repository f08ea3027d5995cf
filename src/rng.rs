//! Seeded random streams for weight initialization and dropout masking.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

pub type NetRng = ChaCha8Rng;

pub const DEFAULT_SEED: u64 = 0x5eed_c0de;

pub fn seeded(seed: u64) -> NetRng {
    NetRng::seed_from_u64(seed)
}

/// Derives an independent stream from `rng`, advancing it by one draw.
pub fn fork<R: Rng + ?Sized>(rng: &mut R) -> NetRng {
    NetRng::seed_from_u64(rng.gen())
}

pub fn randn<R: Rng + ?Sized>(rng: &mut R, mean: f64, std: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + std * z
}
