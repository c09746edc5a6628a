use crate::particle::{Bounds, Vec2};
use ratatui::style::Color;

/// Braille character rendering for high-resolution terminal graphics.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// A single rendered Braille cell with position and color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub color: Color,
}

/// Dot buffer for one frame. A cell takes the colour of the last dot
/// plotted into it.
#[derive(Debug, Clone)]
pub struct DotCanvas {
    width: u16,
    height: u16,
    patterns: Vec<u8>,
    colors: Vec<Color>,
}

impl DotCanvas {
    pub fn new(width: u16, height: u16) -> Self {
        let cells = width as usize * height as usize;
        Self {
            width,
            height,
            patterns: vec![0; cells],
            colors: vec![Color::Reset; cells],
        }
    }

    /// Clear, reallocating only if the cell grid changed size
    pub fn reset(&mut self, width: u16, height: u16) {
        if width != self.width || height != self.height {
            *self = Self::new(width, height);
        } else {
            self.patterns.fill(0);
        }
    }

    pub fn cell_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Effective resolution in dots
    pub fn dot_size(&self) -> (usize, usize) {
        (self.width as usize * 2, self.height as usize * 4)
    }

    pub fn plot(&mut self, dot_x: usize, dot_y: usize, color: Color) {
        let (dot_w, dot_h) = self.dot_size();
        if dot_x >= dot_w || dot_y >= dot_h {
            return;
        }
        let idx = (dot_y / 4) * self.width as usize + dot_x / 2;
        self.patterns[idx] |= BRAILLE_DOTS[dot_x % 2][dot_y % 4];
        self.colors[idx] = color;
    }

    /// Plot the square `[x, x + size] x [y, y + size]` of world space
    pub fn plot_world(&mut self, world: Bounds, position: Vec2, size: f32, color: Color) {
        let (dot_w, dot_h) = self.dot_size();
        if dot_w == 0 || dot_h == 0 {
            return;
        }
        let scale_x = dot_w as f32 / world.width;
        let scale_y = dot_h as f32 / world.height;
        let to_dot = |v: f32, scale: f32, max: usize| ((v * scale).max(0.0) as usize).min(max - 1);

        let x0 = to_dot(position.x, scale_x, dot_w);
        let y0 = to_dot(position.y, scale_y, dot_h);
        let x1 = to_dot(position.x + size.max(0.0), scale_x, dot_w);
        let y1 = to_dot(position.y + size.max(0.0), scale_y, dot_h);

        for dy in y0..=y1 {
            for dx in x0..=x1 {
                self.plot(dx, dy, color);
            }
        }
    }

    /// Only cells with at least one dot
    pub fn cells(&self) -> impl Iterator<Item = BrailleCell> + '_ {
        let width = self.width.max(1) as usize;
        self.patterns
            .iter()
            .zip(self.colors.iter())
            .enumerate()
            .filter(|(_, (pattern, _))| **pattern != 0)
            .map(move |(idx, (pattern, color))| BrailleCell {
                x: (idx % width) as u16,
                y: (idx / width) as u16,
                char: char::from_u32(BRAILLE_BASE + *pattern as u32).unwrap_or(' '),
                color: *color,
            })
    }
}
