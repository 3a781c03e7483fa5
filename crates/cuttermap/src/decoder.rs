//! First-page decoding: interpreter callbacks to [`PageContent`].

use std::collections::HashMap;

use cuttermap_core::images::placement_from_ctm;
use cuttermap_core::{
    BBox, Char, CutterMapError, DecodeOptions, ExtractWarning, PageContent, PageSize, RasterImage,
    Shape, WordExtractor, build_runs,
};
use cuttermap_parse::{CharEvent, ContentHandler, ImageEvent, LopdfDocument, PathEvent};
use tracing::{debug, info};

/// A decoded page plus everything that was skipped along the way.
#[derive(Debug, Clone, Default)]
pub struct DecodedPage {
    pub content: PageContent,
    pub warnings: Vec<ExtractWarning>,
    /// Image placements before deduplication.
    pub placements: usize,
}

/// Collects interpreter events for one page.
#[derive(Default)]
struct CollectingHandler {
    chars: Vec<CharEvent>,
    paths: Vec<PathEvent>,
    images: Vec<ImageEvent>,
    warnings: Vec<ExtractWarning>,
}

impl ContentHandler for CollectingHandler {
    fn on_char(&mut self, event: CharEvent) {
        self.chars.push(event);
    }

    fn on_path_painted(&mut self, event: PathEvent) {
        self.paths.push(event);
    }

    fn on_image(&mut self, event: ImageEvent) {
        self.images.push(event);
    }

    fn on_warning(&mut self, warning: ExtractWarning) {
        self.warnings.push(warning);
    }
}

fn char_from_event(event: CharEvent, page_height: f64) -> Char {
    let [x0, y0, x1, y1] = event.bbox;
    Char {
        text: event.text,
        bbox: BBox::new(x0, page_height - y1, x1, page_height - y0),
        fontname: event.font_name,
        size: event.size,
        color: event.color,
    }
}

/// Merge placements of byte-identical images into one entry per hash,
/// keeping first-seen order.
fn dedupe_images(events: Vec<ImageEvent>, page_height: f64) -> Vec<RasterImage> {
    let mut images: Vec<RasterImage> = Vec::new();
    let mut by_hash: HashMap<String, usize> = HashMap::new();
    for event in events {
        let bbox = placement_from_ctm(&event.ctm, page_height);
        let slot = *by_hash.entry(event.image.hash.clone()).or_insert_with(|| {
            let mut image = (*event.image).clone();
            image.placements.clear();
            images.push(image);
            images.len() - 1
        });
        images[slot].placements.push(bbox);
    }
    images
}

/// Decode the first page of an opened document.
///
/// # Errors
///
/// Fails when the page itself cannot be read; per-element failures are
/// returned as warnings.
pub fn decode_document(
    doc: &LopdfDocument,
    options: &DecodeOptions,
) -> Result<DecodedPage, CutterMapError> {
    let mut handler = CollectingHandler::default();
    let size: PageSize = doc.interpret_first_page(&mut handler, options)?;
    let height = size.height;

    let chars: Vec<Char> = handler
        .chars
        .into_iter()
        .map(|e| char_from_event(e, height))
        .collect();
    let runs = build_runs(&chars, &options.run_options());
    let words = WordExtractor::extract(&chars, &options.word_options());
    let shapes: Vec<Shape> = handler
        .paths
        .iter()
        .filter_map(|p| Shape::from_path(&p.path, p.fill, p.stroke, height))
        .collect();
    let placements = handler.images.len();
    let images = dedupe_images(handler.images, height);

    info!(
        chars = chars.len(),
        runs = runs.len(),
        words = words.len(),
        shapes = shapes.len(),
        placements,
        unique_images = images.len(),
        "decoded first page"
    );
    for warning in &handler.warnings {
        debug!(code = warning.code.as_str(), "{}", warning.description);
    }

    Ok(DecodedPage {
        content: PageContent {
            size,
            runs,
            words,
            shapes,
            images,
        },
        warnings: handler.warnings,
        placements,
    })
}

/// Open `bytes` and decode the first page.
///
/// # Errors
///
/// Fails when the document or its first page cannot be read.
pub fn decode_page(bytes: &[u8], options: &DecodeOptions) -> Result<DecodedPage, CutterMapError> {
    let doc = LopdfDocument::open(bytes)?;
    decode_document(&doc, options)
}
