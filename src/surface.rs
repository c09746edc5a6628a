use crate::particle::{Tint, Vec2};
use std::io;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Status shown alongside a frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInfo {
    pub tick: u64,
    pub free_count: usize,
    pub cluster_count: usize,
    pub workers: usize,
    pub failed_passes: u64,
}

/// Rendering collaborator driven by the frame loop.
///
/// Opening is each implementation's constructor.
pub trait Surface {
    /// Polled once per tick; `true` ends the frame loop
    fn should_close(&mut self) -> Result<bool, SurfaceError>;

    fn begin_frame(&mut self, info: &FrameInfo);

    /// `size` is the edge length of the point in simulation units
    fn draw_point(&mut self, position: Vec2, size: f32, tint: Tint);

    fn end_frame(&mut self) -> Result<(), SurfaceError>;

    fn close(&mut self) -> Result<(), SurfaceError>;
}

/// Draws nothing. Asks to close after `max_frames` frames, if set.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    max_frames: Option<u64>,
    pub frames: u64,
    pub points_in_last_frame: usize,
    points: usize,
    pub last_info: FrameInfo,
    pub closed: bool,
}

impl HeadlessSurface {
    pub fn new(max_frames: Option<u64>) -> Self {
        Self {
            max_frames,
            ..Default::default()
        }
    }
}

impl Surface for HeadlessSurface {
    fn should_close(&mut self) -> Result<bool, SurfaceError> {
        Ok(self.max_frames.is_some_and(|max| self.frames >= max))
    }

    fn begin_frame(&mut self, info: &FrameInfo) {
        self.points = 0;
        self.last_info = *info;
    }

    fn draw_point(&mut self, _position: Vec2, _size: f32, _tint: Tint) {
        self.points += 1;
    }

    fn end_frame(&mut self) -> Result<(), SurfaceError> {
        self.frames += 1;
        self.points_in_last_frame = self.points;
        if self.frames % 100 == 0 {
            info!(
                frame = self.frames,
                tick = self.last_info.tick,
                failed_passes = self.last_info.failed_passes,
                "headless progress"
            );
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SurfaceError> {
        self.closed = true;
        Ok(())
    }
}
