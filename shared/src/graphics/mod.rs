pub mod color;

use std::path::Path;

use image::{ImageResult, Rgb, RgbImage};
use log::{debug, info};

use crate::models::{pixel::Pixel, resolution::Resolution};

/// Rasterizes received pixels. Later pixels overwrite earlier ones at the
/// same position, pixels outside the raster are skipped, and positions
/// nobody rendered stay black.
pub fn rasterize(resolution: Resolution, pixels: &[Pixel]) -> RgbImage {
    let mut image = RgbImage::new(resolution.width, resolution.height);
    let mut skipped = 0usize;
    for pixel in pixels {
        if resolution.contains(pixel.x, pixel.y) {
            image.put_pixel(pixel.x, pixel.y, Rgb(pixel.color.to_rgb8()));
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        debug!(
            "Skipped {} pixels outside the {}x{} raster",
            skipped, resolution.width, resolution.height
        );
    }
    image
}

/// Writes the pixels to `path`; the format follows the file extension.
pub fn save_image(resolution: Resolution, pixels: &[Pixel], path: &Path) -> ImageResult<()> {
    rasterize(resolution, pixels).save(path)?;
    info!("Image written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::models::pixel::Color;

    use super::*;

    #[test]
    fn last_pixel_wins_and_outsiders_are_ignored() {
        let pixels = [
            Pixel::new(0, 0, Color::new(1.0, 0.0, 0.0)),
            Pixel::new(0, 0, Color::new(0.0, 0.0, 1.0)),
            Pixel::new(7, 7, Color::new(1.0, 1.0, 1.0)),
        ];
        let image = rasterize(Resolution::new(2, 1), &pixels);
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }
}
