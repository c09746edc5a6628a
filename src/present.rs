use crate::store::Snapshot;
use crate::surface::{FrameInfo, Surface, SurfaceError};

/// Hand one snapshot to the surface as a single batch of points.
/// Cluster particles come last so they draw on top.
pub fn present<F>(
    surface: &mut F,
    snapshot: &Snapshot,
    info: &FrameInfo,
    point_size: f32,
) -> Result<(), SurfaceError>
where
    F: Surface + ?Sized,
{
    surface.begin_frame(info);
    for (position, tint) in snapshot.points() {
        surface.draw_point(position, point_size, tint);
    }
    surface.end_frame()
}
