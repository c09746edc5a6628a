use crate::particle::Particle;
use crate::rng::UniformSource;
use crate::store::StoreError;
use crate::walk::{self, WalkParams};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Startup failures of the worker pool
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler needs at least one worker")]
    NoWorkers,
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] ThreadPoolBuildError),
}

/// Why a pass produced no replacement. The previous collection stays.
#[derive(Debug, Error, PartialEq)]
pub enum PassError {
    #[error("particle {index} left the plane with a non-finite position")]
    NonFinite { index: usize },
    #[error("worker panicked: {message}")]
    WorkerPanicked { message: String },
    #[error("commit rejected: {0}")]
    Commit(#[from] StoreError),
}

/// Split `len` items into exactly `workers` contiguous ranges.
///
/// Every range holds `len / workers` items except the last, which also takes
/// the remainder. With fewer items than workers the leading ranges are empty.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    if workers == 0 {
        return Vec::new();
    }
    let chunk = len / workers;
    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i == workers - 1 { len } else { start + chunk };
            start..end
        })
        .collect()
}

/// Fixed-size pool that advances a collection one pass at a time.
///
/// Worker `i` always walks chunk `i` with source `i`; a source is never
/// touched by two tasks at once.
pub struct Scheduler<S> {
    pool: ThreadPool,
    sources: Vec<S>,
}

impl<S> Scheduler<S>
where
    S: UniformSource + Send,
{
    /// One worker thread per source
    pub fn new(sources: Vec<S>) -> Result<Self, SchedulerError> {
        if sources.is_empty() {
            return Err(SchedulerError::NoWorkers);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(sources.len())
            .thread_name(|i| format!("walk-worker-{}", i))
            .build()?;
        Ok(Self { pool, sources })
    }

    pub fn worker_count(&self) -> usize {
        self.sources.len()
    }

    #[cfg(test)]
    pub(crate) fn sources_mut(&mut self) -> &mut [S] {
        &mut self.sources
    }

    /// Walk every particle once and return the new collection in input order.
    ///
    /// Blocks until every chunk finished. Any failing chunk fails the whole
    /// pass and nothing partial is returned.
    pub fn run_pass(
        &mut self,
        particles: &[Particle],
        params: &WalkParams,
    ) -> Result<Vec<Particle>, PassError> {
        let started = Instant::now();
        let ranges = partition(particles.len(), self.sources.len());
        let pool = &self.pool;
        let sources = &mut self.sources;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pool.install(|| {
                ranges
                    .into_par_iter()
                    .zip(sources.par_iter_mut())
                    .map(|(range, source)| {
                        walk_chunk(range.start, &particles[range], params, source)
                    })
                    .collect::<Result<Vec<Vec<Particle>>, PassError>>()
            })
        }));

        let chunks = match outcome {
            Ok(result) => result?,
            Err(payload) => {
                return Err(PassError::WorkerPanicked {
                    message: panic_message(payload.as_ref()),
                })
            }
        };

        let mut next = Vec::with_capacity(particles.len());
        for chunk in chunks {
            next.extend(chunk);
        }
        debug_assert_eq!(next.len(), particles.len());

        debug!(
            particles = next.len(),
            workers = self.sources.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "pass complete"
        );
        Ok(next)
    }
}

fn walk_chunk<S>(
    start: usize,
    input: &[Particle],
    params: &WalkParams,
    source: &mut S,
) -> Result<Vec<Particle>, PassError>
where
    S: UniformSource + ?Sized,
{
    let mut out = Vec::with_capacity(input.len());
    for (offset, particle) in input.iter().enumerate() {
        let index = start + offset;
        source.begin_particle(index);
        let moved = walk::advance(*particle, params, &mut *source);
        if !moved.position.is_finite() {
            return Err(PassError::NonFinite { index });
        }
        out.push(moved);
    }
    Ok(out)
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{Bounds, Tint, Vec2};
    use crate::rng::WalkRng;
    use crate::walk::tests::Fixed;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Re-seeds from the particle index so draws depend only on the index
    struct PerIndex {
        rng: ChaCha8Rng,
    }

    impl PerIndex {
        fn new() -> Self {
            Self {
                rng: ChaCha8Rng::seed_from_u64(0),
            }
        }
    }

    impl UniformSource for PerIndex {
        fn next_uniform(&mut self, min: f32, max: f32) -> f32 {
            self.rng.gen_range(min..max)
        }

        fn begin_particle(&mut self, index: usize) {
            self.rng = ChaCha8Rng::seed_from_u64(index as u64 ^ 0xD1A);
        }
    }

    /// Produces NaN once it reaches a given particle
    struct PoisonAt(usize, bool);

    impl UniformSource for PoisonAt {
        fn next_uniform(&mut self, _min: f32, _max: f32) -> f32 {
            if self.1 {
                f32::NAN
            } else {
                0.0
            }
        }

        fn begin_particle(&mut self, index: usize) {
            self.1 = index == self.0;
        }
    }

    struct Panics;

    impl UniformSource for Panics {
        fn next_uniform(&mut self, _min: f32, _max: f32) -> f32 {
            panic!("source exploded")
        }
    }

    fn params() -> WalkParams {
        WalkParams {
            step_size: 3.0,
            steps: 2,
            bounds: Bounds::new(200.0, 100.0),
        }
    }

    fn varied(count: usize) -> Vec<Particle> {
        (0..count)
            .map(|i| Particle::new(Vec2::new((i % 200) as f32, (i % 100) as f32), Tint::RED))
            .collect()
    }

    #[test]
    fn test_partition_remainder_goes_last() {
        assert_eq!(partition(10, 3), vec![0..3, 3..6, 6..10]);
        assert_eq!(partition(9, 3), vec![0..3, 3..6, 6..9]);
        assert_eq!(partition(5, 1), vec![0..5]);
    }

    #[test]
    fn test_partition_fewer_items_than_workers() {
        let ranges = partition(3, 5);
        assert_eq!(ranges.len(), 5);
        assert!(ranges[..4].iter().all(|r| r.is_empty()));
        assert_eq!(ranges[4], 0..3);
        assert_eq!(partition(0, 4).len(), 4);
    }

    #[test]
    fn test_partition_covers_everything_once() {
        for len in [0usize, 1, 7, 20, 101] {
            for workers in [1usize, 2, 3, 20, 64] {
                let ranges = partition(len, workers);
                assert_eq!(ranges.len(), workers);
                let mut next = 0;
                for r in &ranges {
                    assert_eq!(r.start, next);
                    next = r.end;
                }
                assert_eq!(next, len);
            }
        }
    }

    #[test]
    fn test_no_workers_rejected() {
        let result = Scheduler::<WalkRng>::new(Vec::new());
        assert!(matches!(result, Err(SchedulerError::NoWorkers)));
    }

    #[test]
    fn test_length_preserved_for_all_worker_counts() {
        for workers in [1usize, 2, 7, 20, 50] {
            let mut scheduler = Scheduler::new(WalkRng::per_worker(5, workers)).unwrap();
            for len in [0usize, 1, 13, 40] {
                let input = varied(len);
                let output = scheduler.run_pass(&input, &params()).unwrap();
                assert_eq!(output.len(), len, "workers={} len={}", workers, len);
            }
        }
    }

    #[test]
    fn test_result_independent_of_worker_count() {
        let input = varied(333);
        let mut single = Scheduler::new(vec![PerIndex::new()]).unwrap();
        let mut many = Scheduler::new((0..20).map(|_| PerIndex::new()).collect()).unwrap();

        let a = single.run_pass(&input, &params()).unwrap();
        let b = many.run_pass(&input, &params()).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, input);
    }

    #[test]
    fn test_fixed_draws_move_every_particle_in_order() {
        let input: Vec<Particle> = (0..10)
            .map(|i| Particle::new(Vec2::new(i as f32 * 10.0, 50.0), Tint::RED))
            .collect();
        let mut scheduler = Scheduler::new(vec![Fixed(1.0), Fixed(1.0), Fixed(1.0)]).unwrap();

        let output = scheduler.run_pass(&input, &params()).unwrap();

        for (i, p) in output.iter().enumerate() {
            assert_eq!(p.position, Vec2::new(i as f32 * 10.0 + 6.0, 56.0));
        }
    }

    #[test]
    fn test_non_finite_fails_pass() {
        let input = varied(30);
        let sources = (0..4).map(|_| PoisonAt(17, false)).collect();
        let mut scheduler = Scheduler::new(sources).unwrap();

        let err = scheduler.run_pass(&input, &params()).unwrap_err();
        assert_eq!(err, PassError::NonFinite { index: 17 });
    }

    #[test]
    fn test_worker_panic_fails_pass() {
        let input = varied(8);
        let mut scheduler = Scheduler::new(vec![Panics, Panics]).unwrap();

        let err = scheduler.run_pass(&input, &params()).unwrap_err();
        assert!(matches!(err, PassError::WorkerPanicked { ref message } if message.contains("exploded")));
    }

    #[test]
    fn test_random_pass_respects_bounds() {
        let bounds = params().bounds;
        let mut scheduler = Scheduler::new(WalkRng::per_worker(99, 6)).unwrap();
        let mut particles = varied(500);
        for _ in 0..50 {
            particles = scheduler.run_pass(&particles, &params()).unwrap();
        }
        assert!(particles.iter().all(|p| bounds.contains(p.position)));
    }
}
