//! RGB color handling for text runs, shapes and BOM swatches.
//!
//! PDF color operators deliver gray, RGB or CMYK components in `[0.0, 1.0]`;
//! everything is normalized to 8-bit RGB here so colors can be compared,
//! packed into a `u32` and rendered as `#RRGGBB` hex strings.

use std::fmt;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

fn unit_to_byte(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from unit-range RGB components.
    pub fn from_unit(r: f64, g: f64, b: f64) -> Self {
        Self::new(unit_to_byte(r), unit_to_byte(g), unit_to_byte(b))
    }

    /// Build from a unit-range gray level.
    pub fn from_gray(g: f64) -> Self {
        Self::from_unit(g, g, g)
    }

    /// Naive CMYK to RGB conversion.
    pub fn from_cmyk(c: f64, m: f64, y: f64, k: f64) -> Self {
        Self::from_unit(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )
    }

    /// Build from color components of an unknown color space, guessing the
    /// space from the component count (1 = gray, 3 = RGB, 4 = CMYK).
    pub fn from_components(components: &[f64]) -> Option<Self> {
        match components {
            [g] => Some(Self::from_gray(*g)),
            [r, g, b] => Some(Self::from_unit(*r, *g, *b)),
            [c, m, y, k] => Some(Self::from_cmyk(*c, *m, *y, *k)),
            _ => None,
        }
    }

    /// Packed `0xRRGGBB` value.
    pub fn packed(&self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    pub fn from_packed(v: u32) -> Self {
        Self::new((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    /// Uppercase `#RRGGBB` representation.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parse `#RRGGBB` or `RRGGBB` (case-insensitive).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self::from_packed)
    }

    /// Whether the color is close to white (page background).
    pub fn is_near_white(&self) -> bool {
        self.r >= 245 && self.g >= 245 && self.b >= 245
    }

}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
