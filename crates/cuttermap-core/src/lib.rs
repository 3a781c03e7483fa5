//! cuttermap-core: Backend-independent data types and algorithms.
//!
//! This crate provides the page primitives (TextRun, Word, Shape,
//! RasterImage), the header, BOM, blade layout and legend extractors, image
//! matching, cross-validation and the scale-aware drawing plan used by
//! cuttermap-rs. It knows nothing about PDF syntax; the `cuttermap-parse`
//! crate turns pages into [`PageContent`].

pub mod anchor;
pub mod blade;
pub mod bom;
pub mod classify;
pub mod color;
pub mod error;
pub mod geometry;
pub mod header;
pub mod html;
pub mod images;
pub mod legend;
pub mod matcher;
pub mod model;
pub mod options;
pub mod page;
pub mod palette;
pub mod path;
pub mod scale;
pub mod shapes;
pub mod sheet;
pub mod text;
pub mod validation;
pub mod words;

#[cfg(test)]
mod fixtures;

pub use blade::{Blade, BladeRow, CutterCell, Position, RowId, extract_blades};
pub use bom::{BomRow, BomTable, extract_bom, extract_bom_with_rules};
pub use classify::{ColumnAnchors, Field, Rule, default_rules};
pub use color::Rgb;
pub use error::{CutterMapError, ExtractWarning, ExtractWarningCode};
pub use geometry::{BBox, Ctm, Point};
pub use header::{HeaderInfo, extract_header};
pub use html::HtmlRenderer;
pub use images::{ImageFilter, RasterImage};
pub use legend::{GroupFormat, GroupLegend, LegendRow, extract_legend};
pub use matcher::{IconCache, IconDecoder, ImageMatches, PageRegions, match_images};
pub use model::{ExtractionResult, ExtractionStats, GroupIconMatch, Icon, ImageSet};
pub use options::{
    BladeOptions, BomOptions, DecodeOptions, ExtractOptions, HeaderOptions, ImageMatchOptions,
    LegendOptions, PaletteOptions, ReferenceMetrics, RenderOptions, SlideOptions,
};
pub use page::{PageContent, PageSize};
pub use palette::{FillSource, assign_fill_colors};
pub use path::{Path, PathBuilder, PathSegment};
pub use scale::{Geometry, compute_scale};
pub use shapes::{Shape, ShapeKind};
pub use sheet::{Align, DrawItem, Sheet, compose};
pub use text::{Char, RunOptions, TextRun, build_runs};
pub use validation::{Severity, ValidationIssue, ValidationReport, validate};
pub use words::{Word, WordExtractor, WordOptions, raw_text};
