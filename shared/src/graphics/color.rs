use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

/// Colour a worker is drawn with in progress views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl DisplayColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

const DEFAULT_COLORS: [DisplayColor; 16] = [
    DisplayColor::new(200, 200, 200),
    DisplayColor::new(130, 130, 130),
    DisplayColor::new(253, 249, 0),
    DisplayColor::new(255, 203, 0),
    DisplayColor::new(255, 161, 0),
    DisplayColor::new(255, 109, 194),
    DisplayColor::new(230, 41, 55),
    DisplayColor::new(0, 228, 48),
    DisplayColor::new(0, 158, 47),
    DisplayColor::new(102, 191, 255),
    DisplayColor::new(0, 121, 241),
    DisplayColor::new(200, 122, 255),
    DisplayColor::new(135, 60, 190),
    DisplayColor::new(211, 176, 131),
    DisplayColor::new(127, 106, 79),
    DisplayColor::new(255, 0, 255),
];

/// The per-run set of worker display colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<DisplayColor>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.to_vec(),
        }
    }
}

impl Palette {
    /// An empty list falls back to the default colours.
    pub fn new(colors: Vec<DisplayColor>) -> Self {
        if colors.is_empty() {
            return Self::default();
        }
        Self { colors }
    }

    pub fn shuffled<R: Rng + ?Sized>(mut self, rng: &mut R) -> Self {
        self.colors.shuffle(rng);
        self
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colours repeat once there are more workers than colours.
    pub fn color_for(&self, index: usize) -> DisplayColor {
        self.colors[index % self.colors.len()]
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn colors_wrap_around() {
        let palette = Palette::new(vec![DisplayColor::new(1, 2, 3), DisplayColor::new(4, 5, 6)]);
        assert_eq!(palette.color_for(2), DisplayColor::new(1, 2, 3));
        assert_eq!(palette.color_for(3), DisplayColor::new(4, 5, 6));
    }

    #[test]
    fn shuffle_keeps_every_color() {
        let mut rng = StdRng::seed_from_u64(9);
        let shuffled = Palette::default().shuffled(&mut rng);
        let mut colors: Vec<_> = (0..shuffled.len()).map(|i| shuffled.color_for(i)).collect();
        let mut defaults = DEFAULT_COLORS.to_vec();
        let key = |c: &DisplayColor| (c.r, c.g, c.b);
        colors.sort_by_key(key);
        defaults.sort_by_key(key);
        assert_eq!(colors, defaults);
    }

    #[test]
    fn empty_palette_uses_defaults() {
        assert_eq!(Palette::new(Vec::new()), Palette::default());
    }
}
