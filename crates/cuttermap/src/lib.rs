//! cuttermap: Extract structured cutter maps from PDF drawings and
//! regenerate them as PDF or PPTX.
//!
//! This is the public API facade crate for cuttermap-rs. It re-exports types
//! from cuttermap-core and uses cuttermap-parse for PDF reading.
//!
//! # Architecture
//!
//! - **cuttermap-core**: Backend-independent data types, extractors and the drawing plan
//! - **cuttermap-parse**: lopdf backend and content stream interpreter
//! - **cuttermap** (this crate): Page decoding, the extraction pipeline, icon
//!   decoding, PDF and slide regeneration, and the document record
//!
//! ```no_run
//! use cuttermap::{ExtractOptions, RenderOptions};
//!
//! let bytes = std::fs::read("map.pdf")?;
//! let result = cuttermap::extract(&bytes, &ExtractOptions::default())?;
//! println!("{} BOM rows, valid: {}", result.summary.len(), result.validation.is_valid);
//! let file = cuttermap::render_pdf(&result, &RenderOptions::default())?;
//! std::fs::write(format!("map.{}", file.file_type), &file.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod decoder;
pub mod document;
pub mod extract;
pub mod icons;
pub mod json;
pub mod render;
pub mod slides;

pub use cuttermap_core;
pub use cuttermap_parse;

pub use cuttermap_core::{
    Blade, BomRow, CutterMapError, ExtractOptions, ExtractWarning, ExtractionResult, HeaderInfo,
    RenderOptions, SlideOptions, ValidationReport, Word,
};
pub use decoder::{DecodedPage, decode_document, decode_page};
pub use document::{CutterMapDocument, DocumentStatus, GeneratedFile};
pub use extract::{Extractor, extract};
pub use icons::PngIconDecoder;
pub use json::{from_json, to_json};
pub use render::{
    ChromiumRenderer, NativeRenderer, PdfRenderer, RenderJob, RenderOutcome, RenderedFile,
    render_pdf, render_with, renderers_from_options,
};
pub use slides::{render_pptx, write_pptx};
