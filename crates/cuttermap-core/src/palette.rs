//! BOM row fill colors.
//!
//! Each BOM row is drawn with a colored swatch. The swatches are small
//! filled rectangles; when they cannot be told apart the rows fall back to
//! a fixed palette keyed by index.

use std::collections::HashSet;

use tracing::debug;

use crate::anchor::nearest_within;
use crate::bom::BomRow;
use crate::color::Rgb;
use crate::options::PaletteOptions;
use crate::shapes::Shape;

/// Fallback colors, cycled by BOM index.
pub const DEFAULT_PALETTE: [Rgb; 12] = [
    Rgb::new(0xE5, 0x39, 0x35),
    Rgb::new(0x1E, 0x88, 0xE5),
    Rgb::new(0x43, 0xA0, 0x47),
    Rgb::new(0xFB, 0x8C, 0x00),
    Rgb::new(0x8E, 0x24, 0xAA),
    Rgb::new(0x00, 0xAC, 0xC1),
    Rgb::new(0xFD, 0xD8, 0x35),
    Rgb::new(0x6D, 0x4C, 0x41),
    Rgb::new(0xD8, 0x1B, 0x60),
    Rgb::new(0x54, 0x6E, 0x7A),
    Rgb::new(0x7C, 0xB3, 0x42),
    Rgb::new(0x39, 0x49, 0xAB),
];

/// Where the row colors came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FillSource {
    /// No rows to color.
    #[default]
    Empty,
    Sampled,
    Palette,
    /// Some rows sampled, the rest from the palette.
    Mixed,
}

pub fn palette_color(index: u32) -> Rgb {
    let i = (index.max(1) - 1) as usize % DEFAULT_PALETTE.len();
    DEFAULT_PALETTE[i]
}

/// Set `fill_color` on every row.
///
/// Rows the sampler could not reach still get their palette color.
pub fn assign_fill_colors(
    rows: &mut [BomRow],
    shapes: &[Shape],
    header_y: Option<f64>,
    row_height: Option<f64>,
    options: &PaletteOptions,
) -> FillSource {
    if rows.is_empty() {
        return FillSource::Empty;
    }

    let swatches: Vec<&Shape> = shapes
        .iter()
        .filter(|s| s.is_small_filled_rect(options.swatch_max_side))
        .filter(|s| s.fill.is_some_and(|c| !c.is_near_white()))
        .collect();

    let sampled: Vec<Option<Rgb>> = match (header_y, row_height) {
        (Some(header_y), Some(row_height)) => rows
            .iter()
            .map(|row| {
                let y = header_y + f64::from(row.index) * row_height;
                nearest_within(swatches.iter(), y, options.swatch_y_tolerance, |s| {
                    s.bbox.center_y()
                })
                .and_then(|s| s.fill)
            })
            .collect(),
        _ => vec![None; rows.len()],
    };

    let distinct: HashSet<Rgb> = sampled.iter().flatten().copied().collect();
    let degenerate = distinct.is_empty() || (distinct.len() == 1 && rows.len() > 1);
    debug!(
        swatches = swatches.len(),
        distinct = distinct.len(),
        degenerate,
        "fill color sampling"
    );

    let mut fell_back = false;
    for (row, color) in rows.iter_mut().zip(&sampled) {
        let color = match color {
            Some(c) if !degenerate => *c,
            _ => {
                fell_back = true;
                palette_color(row.index)
            }
        };
        row.fill_color = Some(color.to_hex());
    }
    match (degenerate, fell_back) {
        (true, _) => FillSource::Palette,
        (false, true) => FillSource::Mixed,
        (false, false) => FillSource::Sampled,
    }
}
