use crate::particle::{Bounds, Particle, Vec2};
use crate::rng::UniformSource;

/// Per-pass walk parameters shared by every chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkParams {
    /// Distance scale of one step; validated > 0 at startup
    pub step_size: f32,
    /// Steps taken per particle per tick
    pub steps: u32,
    pub bounds: Bounds,
}

/// Bounded random walk of a single particle.
///
/// Each step draws `dx` and `dy` from `[-1, 1)`, moves by `d * step_size`
/// and hard-clamps to the bounds. A particle pinned against an edge stays
/// there for as long as the draws keep pushing outward.
pub fn advance<R>(particle: Particle, params: &WalkParams, rng: &mut R) -> Particle
where
    R: UniformSource + ?Sized,
{
    let mut position = particle.position;
    for _ in 0..params.steps {
        let dx = rng.next_uniform(-1.0, 1.0);
        let dy = rng.next_uniform(-1.0, 1.0);

        position = params.bounds.clamp(Vec2::new(
            position.x + dx * params.step_size,
            position.y + dy * params.step_size,
        ));
    }

    Particle {
        position,
        ..particle
    }
}
