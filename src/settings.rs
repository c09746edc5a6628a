use crate::particle::{Bounds, Vec2};
use crate::walk::WalkParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected startup parameters. Always fatal.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("bounds must be positive and finite, got {width} x {height}")]
    InvalidBounds { width: f32, height: f32 },
    #[error("step size must be positive and finite, got {0}")]
    InvalidStepSize(f32),
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("free particles must take at least one step per tick")]
    NoFreeSteps,
    #[error("{which} spawn point ({x}, {y}) lies outside the bounds")]
    SpawnOutOfBounds { which: &'static str, x: f32, y: f32 },
}

/// All simulation parameters, fixed once the run starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    // === Plane ===
    pub width: f32,
    pub height: f32,

    // === Movement Parameters ===
    /// Distance scale of one walk step
    pub step_size: f32,
    /// Walk steps per tick for free particles
    pub free_steps_per_tick: u32,
    /// Walk steps per tick for cluster particles (0 = inert)
    pub cluster_steps_per_tick: u32,

    // === Population ===
    pub initial_free_count: usize,
    pub initial_cluster_count: usize,
    /// Where every free particle starts
    pub free_spawn: Vec2,
    /// Where every cluster particle starts; `None` = centre of the plane
    pub cluster_spawn: Option<Vec2>,

    // === Execution ===
    /// Size of the worker pool, and the number of chunks per pass
    pub worker_count: usize,
    /// Fixed RNG seed; `None` seeds from the clock
    pub rng_seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            width: 2560.0,
            height: 1440.0,

            step_size: 1.0,
            free_steps_per_tick: 2,
            cluster_steps_per_tick: 0,

            initial_free_count: 20_000,
            initial_cluster_count: 1,
            free_spawn: Vec2::new(500.0, 500.0),
            cluster_spawn: None,

            worker_count: 20,
            rng_seed: None,
        }
    }
}

impl SimulationSettings {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }

    pub fn cluster_spawn_point(&self) -> Vec2 {
        self.cluster_spawn.unwrap_or_else(|| self.bounds().center())
    }

    pub fn free_walk(&self) -> WalkParams {
        WalkParams {
            step_size: self.step_size,
            steps: self.free_steps_per_tick,
            bounds: self.bounds(),
        }
    }

    pub fn cluster_walk(&self) -> WalkParams {
        WalkParams {
            steps: self.cluster_steps_per_tick,
            ..self.free_walk()
        }
    }

    /// Check every parameter before any state is built
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;

        if !positive(self.width) || !positive(self.height) {
            return Err(SettingsError::InvalidBounds {
                width: self.width,
                height: self.height,
            });
        }
        if !positive(self.step_size) {
            return Err(SettingsError::InvalidStepSize(self.step_size));
        }
        if self.worker_count == 0 {
            return Err(SettingsError::NoWorkers);
        }
        if self.free_steps_per_tick == 0 {
            return Err(SettingsError::NoFreeSteps);
        }

        let bounds = self.bounds();
        let spawns = [
            ("free", self.free_spawn),
            ("cluster", self.cluster_spawn_point()),
        ];
        for (which, p) in spawns {
            if !bounds.contains(p) {
                return Err(SettingsError::SpawnOutOfBounds { which, x: p.x, y: p.y });
            }
        }
        Ok(())
    }
}
