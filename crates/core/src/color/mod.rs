use serde::{Deserialize, Serialize};

use crate::{Result, VideoError};

/// Largest number of entries an indexed palette may hold.
pub const MAX_PALETTE_ENTRIES: usize = 256;

/// Straight (non premultiplied) 8-bit per channel color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Packs as `0xAARRGGBB`.
    pub const fn to_u32(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub const fn from_u32(value: u32) -> Self {
        Self {
            a: (value >> 24) as u8,
            r: (value >> 16) as u8,
            g: (value >> 8) as u8,
            b: value as u8,
        }
    }

    /// Same color with a different alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Squared RGB distance, alpha is ignored.
    fn distance(&self, other: &Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// Indexed color table used by `Indexed8` surfaces.
///
/// The table never grows beyond [`MAX_PALETTE_ENTRIES`]; constructors and
/// deserialization reject larger requests instead of truncating. Serialized
/// as a plain list of colors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Color>", into = "Vec<Color>")]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Palette of `count` black entries.
    pub fn new(count: usize) -> Result<Self> {
        if count > MAX_PALETTE_ENTRIES {
            return Err(VideoError::PaletteSize(count));
        }

        Ok(Self {
            colors: vec![Color::BLACK; count],
        })
    }

    pub fn from_colors(colors: Vec<Color>) -> Result<Self> {
        if colors.len() > MAX_PALETTE_ENTRIES {
            return Err(VideoError::PaletteSize(colors.len()));
        }

        Ok(Self { colors })
    }

    /// 256 entry gray ramp where index `i` maps to `(i, i, i)`.
    pub fn grayscale() -> Self {
        Self {
            colors: (0..=255u8).map(|i| Color::rgb(i, i, i)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    pub fn set(&mut self, index: usize, color: Color) -> Result<()> {
        let slot = self.colors.get_mut(index).ok_or(VideoError::OutOfBounds)?;
        *slot = color;
        Ok(())
    }

    /// Resolves an index, treating entries past the end as black.
    pub fn resolve(&self, index: u8) -> Color {
        self.get(index as usize).unwrap_or(Color::BLACK)
    }

    /// Index of the entry closest to `color` in RGB space. Exact matches win
    /// immediately; ties resolve to the lowest index.
    pub fn find_color(&self, color: Color) -> Option<u8> {
        let mut best: Option<(usize, u32)> = None;

        for (index, entry) in self.colors.iter().enumerate() {
            let distance = entry.distance(&color);
            if distance == 0 {
                return Some(index as u8);
            }
            if best.map(|(_, d)| distance < d).unwrap_or(true) {
                best = Some((index, distance));
            }
        }

        best.map(|(index, _)| index as u8)
    }

    /// Interpolates between two palettes of equal length. `rate` is clamped
    /// to `[0, 1]`, where 0 yields `a` and 1 yields `b`.
    pub fn blend(a: &Palette, b: &Palette, rate: f32) -> Result<Palette> {
        if a.len() != b.len() {
            return Err(VideoError::msg(format!(
                "cannot blend palettes of {} and {} entries",
                a.len(),
                b.len()
            )));
        }

        let rate = rate.clamp(0.0, 1.0);
        let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * rate) as u8;
        let colors = a
            .colors
            .iter()
            .zip(&b.colors)
            .map(|(x, y)| Color::rgba(mix(x.r, y.r), mix(x.g, y.g), mix(x.b, y.b), mix(x.a, y.a)))
            .collect();

        Ok(Palette { colors })
    }
}

impl TryFrom<Vec<Color>> for Palette {
    type Error = VideoError;

    fn try_from(colors: Vec<Color>) -> Result<Self> {
        Self::from_colors(colors)
    }
}

impl From<Palette> for Vec<Color> {
    fn from(palette: Palette) -> Self {
        palette.colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_palettes() {
        assert!(Palette::new(256).is_ok());
        assert!(matches!(Palette::new(257), Err(VideoError::PaletteSize(257))));
        let colors = vec![Color::WHITE; 300];
        assert!(matches!(
            Palette::from_colors(colors),
            Err(VideoError::PaletteSize(300))
        ));
    }

    #[test]
    fn deserialized_palettes_stay_bounded() {
        let entry = r#"{ "r": 1, "g": 2, "b": 3 }"#;
        let list = |count: usize| format!("[{}]", vec![entry; count].join(","));

        let palette: Palette = serde_json::from_str(&list(256)).unwrap();
        assert_eq!(palette.len(), 256);
        assert_eq!(palette.get(255), Some(Color::rgb(1, 2, 3)));

        let err = serde_json::from_str::<Palette>(&list(257)).unwrap_err();
        assert!(err.to_string().contains("257"));
    }

    #[test]
    fn serializes_as_a_color_list() {
        let palette = Palette::from_colors(vec![Color::BLACK, Color::WHITE]).unwrap();
        let json = serde_json::to_string(&palette).unwrap();

        assert!(json.starts_with('['));
        assert_eq!(serde_json::from_str::<Palette>(&json).unwrap(), palette);
    }

    #[test]
    fn finds_nearest_entry() {
        let palette =
            Palette::from_colors(vec![Color::BLACK, Color::rgb(250, 0, 0), Color::WHITE]).unwrap();

        assert_eq!(palette.find_color(Color::rgb(200, 10, 10)), Some(1));
        assert_eq!(palette.find_color(Color::WHITE), Some(2));
        assert_eq!(Palette::default().find_color(Color::WHITE), None);
    }

    #[test]
    fn blends_between_palettes() {
        let dark = Palette::from_colors(vec![Color::BLACK]).unwrap();
        let light = Palette::from_colors(vec![Color::WHITE]).unwrap();

        let mid = Palette::blend(&dark, &light, 0.5).unwrap();
        assert_eq!(mid.get(0), Some(Color::rgb(127, 127, 127)));
        assert!(Palette::blend(&dark, &Palette::grayscale(), 0.5).is_err());
    }

    #[test]
    fn packs_argb() {
        let color = Color::rgba(0x11, 0x22, 0x33, 0x44);
        assert_eq!(color.to_u32(), 0x4411_2233);
        assert_eq!(Color::from_u32(0x4411_2233), color);
    }
}
