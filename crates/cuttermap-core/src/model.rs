//! The structured result of one extraction.
//!
//! This is both the extraction output and the regeneration input: an edit
//! step may change `summary` or `blades` and hand the record back to the
//! renderers. Every field has a default so partial records deserialize.

use std::collections::BTreeMap;

use crate::blade::Blade;
use crate::bom::BomRow;
use crate::error::ExtractWarning;
use crate::header::HeaderInfo;
use crate::legend::{GroupFormat, LegendRow};
use crate::page::PageSize;
use crate::palette::FillSource;
use crate::validation::ValidationReport;

/// A decoded image, PNG-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Icon {
    /// Base64 of the PNG bytes.
    pub png_base64: String,
    pub width: u32,
    pub height: u32,
}

/// A group legend row together with the icon drawn beside it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GroupIconMatch {
    pub groups: Vec<u32>,
    pub y: f64,
    pub icon: Icon,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImageSet {
    pub drill_bit: Option<Icon>,
    pub logo: Option<Icon>,
    pub group_icons: Vec<GroupIconMatch>,
}

/// Counters describing what the decoder and the extractors saw.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtractionStats {
    pub runs: usize,
    pub words: usize,
    pub shapes: usize,
    /// Image placements on the page.
    pub images: usize,
    /// Distinct images by content hash.
    pub unique_images: usize,
    /// Images actually decoded into icons.
    pub decoded_icons: usize,
    pub bom_rows: usize,
    pub blades: usize,
    pub cells: usize,
    pub fill_source: FillSource,
    pub warnings: Vec<ExtractWarning>,
}

/// Everything extracted from a cutter map.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtractionResult {
    pub header: HeaderInfo,
    /// BOM rows, ascending by index.
    pub summary: Vec<BomRow>,
    /// Groups listed by the legend.
    pub groups: Vec<u32>,
    pub has_group_legend: bool,
    pub group_format: GroupFormat,
    pub group_rows: Vec<LegendRow>,
    pub blades: Vec<Blade>,
    pub images: ImageSet,
    /// Cutter shape icon per BOM index.
    pub cutter_shapes: BTreeMap<u32, Icon>,
    pub drill_bit_image: Option<Icon>,
    pub validation: ValidationReport,
    pub raw_text: String,
    pub extraction_stats: ExtractionStats,
    pub page: PageSize,
}

impl ExtractionResult {
    /// Total number of cutter cells across every blade.
    pub fn cell_count(&self) -> usize {
        self.blades.iter().map(|b| b.cells().count()).sum()
    }

    /// Look up a BOM row by index.
    pub fn bom_row(&self, index: u32) -> Option<&BomRow> {
        self.summary.iter().find(|r| r.index == index)
    }
}
