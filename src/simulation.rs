use crate::particle::{spawn_at, Tint};
use crate::rng::{self, UniformSource, WalkRng};
use crate::scheduler::{PassError, Scheduler, SchedulerError};
use crate::settings::{SettingsError, SimulationSettings};
use crate::store::{ParticleStore, Snapshot};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Random-walk simulation state: the particle store plus the pool that
/// advances it
pub struct Simulation<S = WalkRng> {
    settings: SimulationSettings,
    store: ParticleStore,
    scheduler: Scheduler<S>,
    /// Ticks attempted so far
    pub ticks: u64,
    pub committed_passes: u64,
    pub failed_passes: u64,
}

impl Simulation<WalkRng> {
    /// Validate settings, seed one stream per worker and lay out the
    /// initial populations
    pub fn new(settings: SimulationSettings) -> Result<Self, SimulationError> {
        settings.validate()?;
        let seed = settings.rng_seed.unwrap_or_else(rng::time_seed);
        info!(seed, workers = settings.worker_count, "seeding walk streams");
        let sources = WalkRng::per_worker(seed, settings.worker_count);
        Self::with_sources(settings, sources)
    }
}

impl<S> Simulation<S>
where
    S: UniformSource + Send,
{
    /// Build with caller-provided sources, one per worker
    pub fn with_sources(
        settings: SimulationSettings,
        sources: Vec<S>,
    ) -> Result<Self, SimulationError> {
        settings.validate()?;
        let free = spawn_at(settings.initial_free_count, settings.free_spawn, Tint::RED);
        let cluster = spawn_at(
            settings.initial_cluster_count,
            settings.cluster_spawn_point(),
            Tint::WHITE,
        );

        Ok(Self {
            store: ParticleStore::new(free, cluster),
            scheduler: Scheduler::new(sources)?,
            settings,
            ticks: 0,
            committed_passes: 0,
            failed_passes: 0,
        })
    }

    /// Parameters as validated at construction; fixed for the whole run
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn worker_count(&self) -> usize {
        self.scheduler.worker_count()
    }

    /// Advance one tick.
    ///
    /// On error nothing was committed; the store still holds the previous
    /// collections.
    pub fn tick(&mut self) -> Result<(), PassError> {
        self.ticks += 1;
        match self.advance() {
            Ok(()) => {
                self.committed_passes += 1;
                Ok(())
            }
            Err(err) => {
                self.failed_passes += 1;
                Err(err)
            }
        }
    }

    fn advance(&mut self) -> Result<(), PassError> {
        let free_walk = self.settings.free_walk();
        let free = self.scheduler.run_pass(self.store.free(), &free_walk)?;

        let cluster_walk = self.settings.cluster_walk();
        let cluster = if cluster_walk.steps > 0 {
            Some(self.scheduler.run_pass(self.store.cluster(), &cluster_walk)?)
        } else {
            None
        };

        self.store.commit(free, cluster)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Vec2;
    use crate::walk::tests::Fixed;

    /// Yields NaN while armed
    struct Toggle(bool);

    impl UniformSource for Toggle {
        fn next_uniform(&mut self, _min: f32, _max: f32) -> f32 {
            if self.0 {
                f32::NAN
            } else {
                0.5
            }
        }
    }

    /// NaN on the second pass it sees, fine otherwise
    struct SecondPassFails {
        passes: u32,
    }

    impl UniformSource for SecondPassFails {
        fn next_uniform(&mut self, _min: f32, _max: f32) -> f32 {
            if self.passes == 2 {
                f32::NAN
            } else {
                1.0
            }
        }

        fn begin_particle(&mut self, index: usize) {
            if index == 0 {
                self.passes += 1;
            }
        }
    }

    fn small(workers: usize) -> SimulationSettings {
        SimulationSettings {
            width: 100.0,
            height: 100.0,
            step_size: 10.0,
            free_steps_per_tick: 1,
            initial_free_count: 4,
            initial_cluster_count: 1,
            free_spawn: Vec2::new(50.0, 50.0),
            worker_count: workers,
            rng_seed: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_pass_end_to_end() {
        let mut sim = Simulation::with_sources(small(2), vec![Fixed(1.0), Fixed(1.0)]).unwrap();

        sim.tick().unwrap();

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.free().len(), 4);
        for p in snapshot.free() {
            assert_eq!(p.position, Vec2::new(60.0, 60.0));
        }
        assert_eq!(snapshot.cluster()[0].position, Vec2::new(50.0, 50.0));
    }

    #[test]
    fn test_failed_pass_keeps_snapshot() {
        let mut sim =
            Simulation::with_sources(small(2), vec![Toggle(false), Toggle(false)]).unwrap();
        sim.tick().unwrap();
        let before = sim.snapshot();

        sim.scheduler.sources_mut()[1].0 = true;
        let err = sim.tick().unwrap_err();

        assert!(matches!(err, PassError::NonFinite { .. }));
        assert_eq!(sim.snapshot(), before);
        assert_eq!(sim.ticks, 2);
        assert_eq!(sim.committed_passes, 1);
        assert_eq!(sim.failed_passes, 1);

        sim.scheduler.sources_mut()[1].0 = false;
        sim.tick().unwrap();
        assert_ne!(sim.snapshot(), before);
    }

    #[test]
    fn test_many_ticks_stay_in_bounds() {
        let settings = SimulationSettings {
            initial_free_count: 2_000,
            free_steps_per_tick: 3,
            step_size: 4.0,
            free_spawn: Vec2::new(1.0, 99.0),
            worker_count: 8,
            ..small(8)
        };
        let bounds = settings.bounds();
        let mut sim = Simulation::new(settings).unwrap();

        for _ in 0..200 {
            sim.tick().unwrap();
        }

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.free().len(), 2_000);
        assert!(snapshot.points().all(|(p, _)| bounds.contains(p)));
    }

    #[test]
    fn test_cluster_inert_by_default() {
        let mut sim = Simulation::new(small(3)).unwrap();
        let cluster_before = sim.snapshot().cluster().to_vec();
        for _ in 0..20 {
            sim.tick().unwrap();
        }
        assert_eq!(sim.snapshot().cluster(), cluster_before.as_slice());
    }

    #[test]
    fn test_cluster_walks_when_configured() {
        let settings = SimulationSettings {
            cluster_steps_per_tick: 1,
            ..small(2)
        };
        let mut sim = Simulation::with_sources(settings, vec![Fixed(-1.0), Fixed(-1.0)]).unwrap();

        sim.tick().unwrap();

        assert_eq!(sim.snapshot().cluster()[0].position, Vec2::new(40.0, 40.0));
    }

    #[test]
    fn test_invalid_settings_build_nothing() {
        let settings = SimulationSettings {
            step_size: 0.0,
            ..small(2)
        };
        let result = Simulation::new(settings);
        assert!(matches!(
            result,
            Err(SimulationError::Settings(SettingsError::InvalidStepSize(_)))
        ));
    }

    #[test]
    fn test_failed_cluster_pass_keeps_free_pass() {
        let settings = SimulationSettings {
            cluster_steps_per_tick: 1,
            ..small(1)
        };
        let mut sim =
            Simulation::with_sources(settings, vec![SecondPassFails { passes: 0 }]).unwrap();
        let before = sim.snapshot();

        // free pass succeeds, cluster pass fails: the tick commits nothing
        let err = sim.tick().unwrap_err();

        assert!(matches!(err, PassError::NonFinite { index: 0 }));
        assert_eq!(sim.snapshot(), before);
        assert_eq!(sim.failed_passes, 1);
    }

    #[test]
    fn test_settings_fixed_after_start() {
        let mut sim = Simulation::new(small(2)).unwrap();
        for _ in 0..5 {
            sim.tick().unwrap();
        }
        assert_eq!(sim.settings(), &small(2));
        assert_eq!(sim.settings().free_walk().step_size, 10.0);
    }
}
