//! Tunable tolerances for every extraction stage.
//!
//! All distances are in PDF points, measured in top-left origin page space.
//! Every struct deserializes with `#[serde(default)]`, so a config file only
//! needs the values it changes.

use crate::text::RunOptions;
use crate::words::WordOptions;

/// Options for the whole extraction pipeline.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtractOptions {
    pub decode: DecodeOptions,
    pub header: HeaderOptions,
    pub bom: BomOptions,
    pub blade: BladeOptions,
    pub legend: LegendOptions,
    pub images: ImageMatchOptions,
    pub palette: PaletteOptions,
}

/// Page decoding: glyph grouping and resource limits.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecodeOptions {
    /// Baseline difference that ends a style run.
    pub run_y_tolerance: f64,
    /// Horizontal gap (multiple of font size) that ends a style run.
    pub run_gap_factor: f64,
    /// Vertical gap (multiple of font size) that starts a new block.
    pub block_gap_factor: f64,
    /// Horizontal gap that splits two words.
    pub word_x_tolerance: f64,
    /// Top-edge difference that puts two glyphs on different lines.
    pub word_y_tolerance: f64,
    /// Maximum nesting of form XObjects.
    pub max_form_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            run_y_tolerance: 2.0,
            run_gap_factor: 1.0,
            block_gap_factor: 1.5,
            word_x_tolerance: 3.0,
            word_y_tolerance: 3.0,
            max_form_depth: 8,
        }
    }
}

impl DecodeOptions {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            y_tolerance: self.run_y_tolerance,
            gap_factor: self.run_gap_factor,
            block_gap_factor: self.block_gap_factor,
        }
    }

    pub fn word_options(&self) -> WordOptions {
        WordOptions {
            x_tolerance: self.word_x_tolerance,
            y_tolerance: self.word_y_tolerance,
        }
    }
}

/// Header field search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeaderOptions {
    /// Height of the header band from the top of the page.
    pub header_band: f64,
    /// Vertical distance that still counts as the label's own line.
    pub line_tolerance: f64,
    /// Furthest a value on the next line may sit below its label.
    pub next_line_max: f64,
    /// Furthest a value may sit to the right of its label.
    pub value_max_gap: f64,
    /// Horizontal gap that ends the revision text.
    pub field_gap: f64,
    /// Left-edge tolerance for material number continuation lines.
    pub column_tolerance: f64,
    /// Continuation lines collected for a wrapped material number.
    pub max_material_lines: usize,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            header_band: 60.0,
            line_tolerance: 3.0,
            next_line_max: 14.0,
            value_max_gap: 150.0,
            field_gap: 40.0,
            column_tolerance: 6.0,
            max_material_lines: 3,
        }
    }
}

/// BOM table discovery and field classification.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BomOptions {
    /// Rounding step used to band column labels by y.
    pub band_rounding: f64,
    /// Max distance from a row anchor for a token to join that row.
    pub row_tolerance: f64,
    /// Max distance for a stray count token to attach to a row.
    pub orphan_tolerance: f64,
    /// Max gap between `CT` and its number for them to be re-joined.
    pub join_gap: f64,
    /// Half-width of the window around the COUNT and MAT anchors.
    pub column_window: f64,
    /// Half-width of the window around the TYPE anchor.
    pub type_window: f64,
    /// x tolerance when clustering index column candidates.
    pub index_column_tolerance: f64,
    /// Largest value accepted as a row index.
    pub max_index: u32,
}

impl Default for BomOptions {
    fn default() -> Self {
        Self {
            band_rounding: 3.0,
            row_tolerance: 4.0,
            orphan_tolerance: 9.0,
            join_gap: 6.0,
            column_window: 20.0,
            type_window: 30.0,
            index_column_tolerance: 6.0,
            max_index: 99,
        }
    }
}

/// Blade layout segmentation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BladeOptions {
    /// Space above the first row marker that still belongs to that row.
    pub row_lead: f64,
    /// Height given to the last row below its marker.
    pub last_row_height: f64,
    /// Max distance from the row's dominant y for a group digit.
    pub digit_y_tolerance: f64,
    /// How far below a digit a chamfer override may sit.
    pub chamfer_window: f64,
    /// Horizontal tolerance between a digit and its chamfer override.
    pub chamfer_x_tolerance: f64,
    /// Gap left above the next blade's first row marker.
    pub boundary_margin: f64,
    /// Vertical tolerance for row markers on a blade marker's line.
    pub marker_tolerance: f64,
    /// How far past a position label's left edge a digit may start.
    pub label_slack: f64,
    /// x edges splitting CONE/NOSE/SHOULDER/GAUGE/PAD when no label exists.
    pub bucket_edges: Vec<f64>,
    /// Largest value accepted as a group number.
    pub max_group: u32,
}

impl Default for BladeOptions {
    fn default() -> Self {
        Self {
            row_lead: 10.0,
            last_row_height: 30.0,
            digit_y_tolerance: 4.0,
            chamfer_window: 14.0,
            chamfer_x_tolerance: 8.0,
            boundary_margin: 1.0,
            marker_tolerance: 3.0,
            label_slack: 2.0,
            bucket_edges: vec![150.0, 250.0, 350.0, 450.0],
            max_group: 99,
        }
    }
}

/// Group legend discovery.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LegendOptions {
    /// How far below the `Group` label the legend may extend.
    pub legend_window: f64,
    /// Width of the legend area, starting at the label's left edge.
    pub legend_width: f64,
    /// Slack to the left of the label.
    pub legend_x_margin: f64,
    /// Vertical tolerance for tokens on one legend line.
    pub row_tolerance: f64,
    /// Horizontal tolerance for a vertical column of numbers.
    pub column_tolerance: f64,
    /// Largest group number a legend may list.
    pub max_member: u32,
}

impl Default for LegendOptions {
    fn default() -> Self {
        Self {
            legend_window: 80.0,
            legend_width: 200.0,
            legend_x_margin: 20.0,
            row_tolerance: 3.0,
            column_tolerance: 6.0,
            max_member: 20,
        }
    }
}

/// Image placement classification and matching.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImageMatchOptions {
    /// Max distance from an index token to a cutter icon center.
    pub match_radius: f64,
    /// Max vertical distance from a group icon to its legend row.
    pub legend_icon_tolerance: f64,
    /// Shortest side of a drill-bit face picture.
    pub drill_bit_min_side: f64,
    /// Longest side of a group legend icon.
    pub group_icon_max_side: f64,
    /// Horizontal band, as page-width fractions, a group icon center must
    /// fall in.
    pub group_icon_min_x_ratio: f64,
    pub group_icon_max_x_ratio: f64,
    /// Shortest side of a cutter-layout icon.
    pub cutter_icon_min_side: f64,
    /// Longest side of a cutter-layout icon.
    pub cutter_icon_max_side: f64,
    /// Fraction of the page width a logo must stay left of.
    pub logo_max_x_ratio: f64,
}

impl Default for ImageMatchOptions {
    fn default() -> Self {
        Self {
            match_radius: 30.0,
            legend_icon_tolerance: 10.0,
            drill_bit_min_side: 100.0,
            group_icon_max_side: 24.0,
            group_icon_min_x_ratio: 0.25,
            group_icon_max_x_ratio: 0.75,
            cutter_icon_min_side: 6.0,
            cutter_icon_max_side: 60.0,
            logo_max_x_ratio: 0.33,
        }
    }
}

/// BOM fill color sampling.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PaletteOptions {
    /// Largest side of a color swatch rectangle.
    pub swatch_max_side: f64,
    /// Max distance from the estimated row y to a swatch center.
    pub swatch_y_tolerance: f64,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        Self {
            swatch_max_side: 14.0,
            swatch_y_tolerance: 6.0,
        }
    }
}

/// Reference measurements at scale 1.0, in points.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReferenceMetrics {
    pub cutter_diameter: f64,
    /// Center-to-center distance of neighbouring cutters.
    pub pitch: f64,
    pub margin: f64,
    pub font_size: f64,
    pub title_size: f64,
    /// Width reserved for the `R1`..`R4` row labels.
    pub row_label_width: f64,
    /// Gap between two positions of one row.
    pub position_gap: f64,
    pub row_gap: f64,
    pub blade_gap: f64,
    pub bom_row_height: f64,
}

impl Default for ReferenceMetrics {
    fn default() -> Self {
        Self {
            cutter_diameter: 22.0,
            pitch: 26.0,
            margin: 36.0,
            font_size: 9.0,
            title_size: 14.0,
            row_label_width: 28.0,
            position_gap: 10.0,
            row_gap: 6.0,
            blade_gap: 14.0,
            bom_row_height: 14.0,
        }
    }
}

/// Document regeneration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderOptions {
    /// Row density drawn at scale 1.0.
    pub reference_density: usize,
    /// The scale never drops below this.
    pub min_scale: f64,
    pub metrics: ReferenceMetrics,
    /// Output page size; landscape Letter by default.
    pub page_width: f64,
    pub page_height: f64,
    /// PDF backends to try, in order.
    pub backends: Vec<String>,
    /// Browser executable for the `chromium` backend.
    pub chromium: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            reference_density: 17,
            min_scale: 0.3,
            metrics: ReferenceMetrics::default(),
            page_width: 792.0,
            page_height: 612.0,
            backends: vec!["chromium".to_string(), "native".to_string()],
            chromium: None,
        }
    }
}

/// Slide deck regeneration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SlideOptions {
    /// Slide size in points (16:9 by default).
    pub width: f64,
    pub height: f64,
}

impl Default for SlideOptions {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 540.0,
        }
    }
}
