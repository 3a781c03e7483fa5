//! Density-driven scale for regenerated documents.
//!
//! The densest blade row decides how large everything is drawn: up to the
//! reference density the map is drawn at full size, beyond it every linear
//! dimension shrinks proportionally, down to a floor.

use crate::blade::Blade;
use crate::options::{ReferenceMetrics, RenderOptions};

/// The scale for a set of blades.
///
/// `1.0` when no row holds more than `reference` cells, otherwise
/// `reference / max`, never below `min_scale`.
pub fn compute_scale(blades: &[Blade], reference: usize, min_scale: f64) -> f64 {
    let densest = blades.iter().map(Blade::max_row_cells).max().unwrap_or(0);
    scale_for_density(densest, reference, min_scale)
}

pub fn scale_for_density(densest: usize, reference: usize, min_scale: f64) -> f64 {
    if densest <= reference || densest == 0 {
        return 1.0;
    }
    (reference as f64 / densest as f64).max(min_scale)
}

/// Reference metrics multiplied by one scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub scale: f64,
    pub cutter_diameter: f64,
    pub pitch: f64,
    pub margin: f64,
    pub font_size: f64,
    pub title_size: f64,
    pub row_label_width: f64,
    pub position_gap: f64,
    pub row_gap: f64,
    pub blade_gap: f64,
    pub bom_row_height: f64,
}

impl Geometry {
    pub fn new(scale: f64, m: &ReferenceMetrics) -> Self {
        Self {
            scale,
            cutter_diameter: m.cutter_diameter * scale,
            pitch: m.pitch * scale,
            margin: m.margin * scale,
            font_size: m.font_size * scale,
            title_size: m.title_size * scale,
            row_label_width: m.row_label_width * scale,
            position_gap: m.position_gap * scale,
            row_gap: m.row_gap * scale,
            blade_gap: m.blade_gap * scale,
            bom_row_height: m.bom_row_height * scale,
        }
    }

    /// Geometry for the given blades under `options`.
    pub fn for_blades(blades: &[Blade], options: &RenderOptions) -> Self {
        let scale = compute_scale(blades, options.reference_density, options.min_scale);
        Self::new(scale, &options.metrics)
    }

    /// Height of one blade row: a cutter plus its position caption.
    pub fn row_height(&self) -> f64 {
        self.cutter_diameter + self.font_size + self.row_gap
    }
}
