use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of uniform floats for the walk kernel.
///
/// Every worker owns its own source, so implementations never need to be
/// shareable, only movable between threads.
pub trait UniformSource {
    /// Uniform draw from `[min, max)`. Returns `min` for an empty range.
    fn next_uniform(&mut self, min: f32, max: f32) -> f32;

    /// Called by the scheduler right before the particle at `index` is walked.
    fn begin_particle(&mut self, _index: usize) {}
}

/// Production source: one ChaCha8 stream of a shared process seed
#[derive(Debug, Clone)]
pub struct WalkRng {
    rng: ChaCha8Rng,
}

impl WalkRng {
    pub fn new(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Self { rng }
    }

    /// One independent stream per worker, all derived from `seed`
    pub fn per_worker(seed: u64, workers: usize) -> Vec<Self> {
        (0..workers as u64).map(|w| Self::new(seed, w)).collect()
    }
}

impl UniformSource for WalkRng {
    fn next_uniform(&mut self, min: f32, max: f32) -> f32 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..max)
    }
}

/// Seed taken from the wall clock at nanosecond resolution
pub fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5EED)
}
