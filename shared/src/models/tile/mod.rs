pub mod tile_generator;

use serde::{Deserialize, Serialize};

use super::resolution::Resolution;

/// A square region of the raster, identified by its top-left corner.
///
/// Tiles on the right and bottom edges may extend past the raster; their
/// pixels are clipped to the [`Resolution`] they are enumerated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl Tile {
    pub fn new(x: u32, y: u32, size: u32) -> Self {
        Self { x, y, size }
    }

    /// Width of the tile once clipped to the raster.
    pub fn width(&self, resolution: Resolution) -> u32 {
        resolution.width.saturating_sub(self.x).min(self.size)
    }

    /// Height of the tile once clipped to the raster.
    pub fn height(&self, resolution: Resolution) -> u32 {
        resolution.height.saturating_sub(self.y).min(self.size)
    }

    pub fn pixel_count(&self, resolution: Resolution) -> usize {
        self.width(resolution) as usize * self.height(resolution) as usize
    }

    pub fn contains(&self, resolution: Resolution, x: u32, y: u32) -> bool {
        x >= self.x
            && y >= self.y
            && x - self.x < self.width(resolution)
            && y - self.y < self.height(resolution)
    }

    /// Coordinates of every pixel of the tile inside the raster, row by row.
    pub fn pixels(&self, resolution: Resolution) -> Vec<(u32, u32)> {
        let (width, height) = (self.width(resolution), self.height(resolution));
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in self.y..self.y + height {
            for x in self.x..self.x + width {
                pixels.push((x, y));
            }
        }
        pixels
    }
}
