use serde::{Deserialize, Serialize};

/// A point in simulation space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Display colour carried by a particle. Never read by the physics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tint {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Tint {
    pub const RED: Tint = Tint::rgb(230, 41, 55);
    pub const WHITE: Tint = Tint::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// The simulation rectangle `[0, width] x [0, height]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Inclusive on every edge
    pub fn contains(&self, p: Vec2) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }
}

/// One walker. Its identity is its index in the owning collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub tint: Tint,
    /// Reserved for aggregation; nothing sets it yet.
    pub stuck: bool,
}

impl Particle {
    pub fn new(position: Vec2, tint: Tint) -> Self {
        Self {
            position,
            tint,
            stuck: false,
        }
    }
}

/// Build `count` identical particles at `position`
pub fn spawn_at(count: usize, position: Vec2, tint: Tint) -> Vec<Particle> {
    vec![Particle::new(position, tint); count]
}
