//! Inverse-CDF sampling with an owned, seeded RNG.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

/// Result of one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub arm: usize,
    /// Rounding left mass past the end of the vector and the last arm was used.
    pub fell_back: bool,
}

/// Seedable sampler over probability vectors.
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw one index from `p`. `p` must be non-empty.
    pub fn draw(&mut self, p: &[f64]) -> Draw {
        let u: f64 = self.rng.random();
        walk(p, u)
    }
}

/// Walk `p` subtracting entries from `u` until it falls inside one.
pub(crate) fn walk(p: &[f64], mut u: f64) -> Draw {
    for (arm, &pi) in p.iter().enumerate() {
        if u < pi {
            return Draw {
                arm,
                fell_back: false,
            };
        }
        u -= pi;
    }
    Draw {
        arm: p.len().saturating_sub(1),
        fell_back: true,
    }
}
