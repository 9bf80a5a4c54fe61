//! Backoff growth and jitter sampling for the poll loop.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Next base delay: `min(current * multiplier, max_delay)`.
pub fn next_delay(current: Duration, multiplier: f64, max_delay: Duration) -> Duration {
    let grown = current.as_secs_f64() * multiplier;
    if !grown.is_finite() || grown >= max_delay.as_secs_f64() {
        return max_delay;
    }
    // Negative only if multiplier < 0, which defaulting rules out
    Duration::from_secs_f64(grown.max(0.0))
}

/// Source of the additive random delay slept on top of the base delay.
pub trait Jitter: Send {
    /// A value in `[0, max)`; zero when `max` is zero.
    fn sample(&mut self, max: Duration) -> Duration;
}

/// Uniform jitter from a per-call random generator.
#[derive(Debug, Clone)]
pub struct RandomJitter {
    rng: StdRng,
}

impl RandomJitter {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Jitter for RandomJitter {
    fn sample(&mut self, max: Duration) -> Duration {
        let nanos = max.as_nanos().min(u64::MAX as u128) as u64;
        if nanos == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.rng.gen_range(0..nanos))
    }
}

/// Always zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn sample(&mut self, _max: Duration) -> Duration {
        Duration::ZERO
    }
}
