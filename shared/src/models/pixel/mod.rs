use serde::{Deserialize, Serialize};

/// Linear RGB color as produced by the renderer, nominally in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgb8(&self) -> [u8; 3] {
        let channel = |c: f64| -> u8 { (c.clamp(0.0, 1.0) * 255.0).round() as u8 };
        [channel(self.r), channel(self.g), channel(self.b)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
    pub color: Color,
}

impl Pixel {
    pub fn new(x: u32, y: u32, color: Color) -> Self {
        Self { x, y, color }
    }
}
