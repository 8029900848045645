//! Noise source — uniform white noise behind a seedable generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// White noise generator for the noise oscillator.
///
/// Kept behind its own type so a synthesis run can be made fully
/// deterministic by seeding, while normal use draws from entropy.
#[derive(Debug, Clone)]
pub struct Noise {
    rng: StdRng,
}

impl Noise {
    /// Entropy-seeded source; every run sounds different.
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Deterministic source for reproducible renders and tests.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Next uniform sample in [-1, 1).
    pub fn next_bipolar(&mut self) -> f64 {
        self.rng.gen_range(-1.0..1.0)
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new()
    }
}
