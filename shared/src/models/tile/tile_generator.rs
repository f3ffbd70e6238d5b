use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::models::resolution::Resolution;

use super::Tile;

/// Partitions a raster into tiles and produces a shuffled work order.
///
/// Render cost is spatially correlated, so handing tiles out in a random
/// order spreads expensive regions over every worker.
#[derive(Debug, Clone, Copy)]
pub struct TileGenerator {
    pub resolution: Resolution,
    pub size: u32,
    pub seed: u64,
}

impl TileGenerator {
    pub fn new(resolution: Resolution, size: u32, seed: u64) -> Self {
        Self {
            resolution,
            size,
            seed,
        }
    }

    pub fn generate(&self) -> Vec<Tile> {
        let mut tiles = generate_tiles(self.resolution, self.size);
        shuffle_tiles(&mut tiles, self.seed);
        tiles
    }
}

/// Row-major cover of the raster. A zero tile size yields no tiles.
pub fn generate_tiles(resolution: Resolution, size: u32) -> Vec<Tile> {
    if size == 0 {
        return Vec::new();
    }

    let columns = resolution.width.div_ceil(size);
    let rows = resolution.height.div_ceil(size);
    let mut tiles = Vec::with_capacity(columns as usize * rows as usize);

    for y in (0..resolution.height).step_by(size as usize) {
        for x in (0..resolution.width).step_by(size as usize) {
            tiles.push(Tile::new(x, y, size));
        }
    }

    tiles
}

pub fn shuffle_tiles(tiles: &mut [Tile], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    tiles.shuffle(&mut rng);
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn assert_exact_cover(resolution: Resolution, tiles: &[Tile]) {
        let mut seen = HashSet::new();
        for tile in tiles {
            for pixel in tile.pixels(resolution) {
                assert!(seen.insert(pixel), "pixel {:?} covered twice", pixel);
            }
        }
        assert_eq!(seen.len() as u64, resolution.pixel_count());
    }

    #[test]
    fn four_by_four_with_size_two() {
        let tiles = generate_tiles(Resolution::new(4, 4), 2);
        assert_eq!(
            tiles,
            vec![
                Tile::new(0, 0, 2),
                Tile::new(2, 0, 2),
                Tile::new(0, 2, 2),
                Tile::new(2, 2, 2),
            ]
        );
    }

    #[test]
    fn covers_rasters_that_do_not_divide_evenly() {
        for (width, height, size) in [(5, 3, 2), (7, 1, 3), (1, 9, 4), (10, 10, 10), (3, 3, 8)] {
            let resolution = Resolution::new(width, height);
            let tiles = generate_tiles(resolution, size);
            let expected = width.div_ceil(size) * height.div_ceil(size);
            assert_eq!(tiles.len(), expected as usize);
            assert_exact_cover(resolution, &tiles);
        }
    }

    #[test]
    fn zero_size_or_empty_raster_yields_nothing() {
        assert!(generate_tiles(Resolution::new(4, 4), 0).is_empty());
        assert!(generate_tiles(Resolution::new(0, 4), 2).is_empty());
    }

    #[test]
    fn steps_stop_at_the_raster_edge_without_overflow() {
        let tiles = generate_tiles(Resolution::new(u32::MAX, 1), 1 << 31);
        assert_eq!(
            tiles,
            vec![Tile::new(0, 0, 1 << 31), Tile::new(1 << 31, 0, 1 << 31)]
        );
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let resolution = Resolution::new(33, 17);
        let ordered = generate_tiles(resolution, 4);
        for seed in [0, 1, 42, u64::MAX] {
            let mut shuffled = ordered.clone();
            shuffle_tiles(&mut shuffled, seed);
            let mut sorted = shuffled.clone();
            sorted.sort_by_key(|tile| (tile.y, tile.x));
            assert_eq!(sorted, ordered);
        }
    }

    #[test]
    fn generator_is_deterministic_per_seed() {
        let generator = TileGenerator::new(Resolution::new(64, 64), 8, 7);
        assert_eq!(generator.generate(), generator.generate());
        assert_exact_cover(generator.resolution, &generator.generate());
    }
}
