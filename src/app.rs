use crate::present;
use crate::rng::{UniformSource, WalkRng};
use crate::simulation::Simulation;
use crate::surface::{FrameInfo, Surface, SurfaceError};
use tracing::{info, warn};

/// Totals reported when the frame loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub ticks: u64,
    pub committed_passes: u64,
    pub failed_passes: u64,
}

/// Main application state: the simulation and how it is drawn
pub struct App<S = WalkRng> {
    pub simulation: Simulation<S>,
    pub point_size: f32,
    /// Stop after this many ticks even if the surface stays open
    pub tick_limit: Option<u64>,
}

impl<S> App<S>
where
    S: UniformSource + Send,
{
    pub fn new(simulation: Simulation<S>, point_size: f32) -> Self {
        Self {
            simulation,
            point_size,
            tick_limit: None,
        }
    }

    /// Run one simulation tick. A failed pass is logged and skipped; the
    /// previous collection stays on screen.
    pub fn tick(&mut self) {
        if let Err(err) = self.simulation.tick() {
            warn!(
                tick = self.simulation.ticks,
                failed_passes = self.simulation.failed_passes,
                error = %err,
                "pass abandoned, keeping previous particles"
            );
        }
    }

    pub fn frame_info(&self) -> FrameInfo {
        let snapshot = self.simulation.snapshot();
        FrameInfo {
            tick: self.simulation.ticks,
            free_count: snapshot.free().len(),
            cluster_count: snapshot.cluster().len(),
            workers: self.simulation.worker_count(),
            failed_passes: self.simulation.failed_passes,
        }
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            ticks: self.simulation.ticks,
            committed_passes: self.simulation.committed_passes,
            failed_passes: self.simulation.failed_passes,
        }
    }

    /// Drive ticks until the surface asks to close, then close it
    pub fn run<F>(&mut self, surface: &mut F) -> Result<FrameStats, SurfaceError>
    where
        F: Surface + ?Sized,
    {
        let result = self.run_frames(surface);
        let closed = surface.close();
        result?;
        closed?;

        let stats = self.stats();
        info!(
            ticks = stats.ticks,
            committed = stats.committed_passes,
            failed = stats.failed_passes,
            "frame loop finished"
        );
        Ok(stats)
    }

    fn run_frames<F>(&mut self, surface: &mut F) -> Result<(), SurfaceError>
    where
        F: Surface + ?Sized,
    {
        while !surface.should_close()? {
            if self
                .tick_limit
                .is_some_and(|limit| self.simulation.ticks >= limit)
            {
                break;
            }

            self.tick();

            let snapshot = self.simulation.snapshot();
            present::present(surface, &snapshot, &self.frame_info(), self.point_size)?;
        }
        Ok(())
    }
}
