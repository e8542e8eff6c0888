//! Injectable randomness for initial lead scores.

use std::ops::Range;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Range new lead scores are drawn from.
pub const INITIAL_SCORE_RANGE: Range<u8> = 60..100;

/// Source of uniformly distributed integers.
pub trait RandomSource: Send + Sync {
    /// Draw a value uniformly from `range` (end exclusive, must be non-empty).
    fn next_in(&self, range: Range<u8>) -> u8;
}

/// Randomness from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_in(&self, range: Range<u8>) -> u8 {
        rand::thread_rng().gen_range(range)
    }
}

/// Reproducible randomness from a fixed seed.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_in(&self, range: Range<u8>) -> u8 {
        self.rng.lock().gen_range(range)
    }
}

/// Always answers the same value, clamped into the requested range.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub u8);

impl RandomSource for FixedRandom {
    fn next_in(&self, range: Range<u8>) -> u8 {
        self.0.clamp(range.start, range.end.saturating_sub(1).max(range.start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_range() {
        for _ in 0..1000 {
            assert!(INITIAL_SCORE_RANGE.contains(&ThreadRandom.next_in(INITIAL_SCORE_RANGE)));
        }
    }

    #[test]
    fn seeded_random_is_reproducible() {
        let a = SeededRandom::new(7);
        let b = SeededRandom::new(7);
        let xs: Vec<_> = (0..20).map(|_| a.next_in(INITIAL_SCORE_RANGE)).collect();
        let ys: Vec<_> = (0..20).map(|_| b.next_in(INITIAL_SCORE_RANGE)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| INITIAL_SCORE_RANGE.contains(x)));
    }

    #[test]
    fn fixed_random_clamps() {
        assert_eq!(FixedRandom(75).next_in(INITIAL_SCORE_RANGE), 75);
        assert_eq!(FixedRandom(10).next_in(INITIAL_SCORE_RANGE), 60);
        assert_eq!(FixedRandom(100).next_in(INITIAL_SCORE_RANGE), 99);
    }
}
