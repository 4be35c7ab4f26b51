#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Problem generation system producing root estimation challenges.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use root_racer_core::{Problem, ProblemId, ProblemKind, MAX_DIGITS};

/// Probability that a generated problem asks for a square root.
const SQUARE_ROOT_PROBABILITY: f64 = 0.6;

/// Smallest value a problem may ask about.
const MIN_VALUE: u64 = 2;

/// Pure system that draws problems from a seeded random stream.
#[derive(Debug, Clone)]
pub struct ProblemGenerator {
    rng: ChaCha8Rng,
}

impl ProblemGenerator {
    /// Creates a generator whose sequence is fully determined by `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a generator seeded from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Draws a single problem with the provided identifier.
    pub fn generate(&mut self, id: ProblemId) -> Problem {
        let kind = if self.rng.gen_bool(SQUARE_ROOT_PROBABILITY) {
            ProblemKind::SquareRoot
        } else {
            ProblemKind::CubeRoot
        };
        let value = self.rng.gen_range(MIN_VALUE..=max_value());
        Problem::new(id, kind, value)
    }

    /// Draws `count` problems numbered from zero.
    pub fn generate_set(&mut self, count: u32) -> Vec<Problem> {
        (0..count)
            .map(|index| self.generate(ProblemId::new(index)))
            .collect()
    }
}

/// Largest value a problem may ask about: `10^MAX_DIGITS + 1`.
#[must_use]
pub fn max_value() -> u64 {
    10u64.pow(MAX_DIGITS) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_value_spans_configured_digits() {
        assert_eq!(max_value(), 1_000_001);
    }
}
