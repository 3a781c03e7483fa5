//! PDF regeneration through an ordered list of renderer strategies.
//!
//! Every strategy receives the same prepared [`RenderJob`] (HTML plus the
//! composed sheets) and either produces a file or asks for the next one.
//! When every strategy passes, the HTML itself is the result.

mod chromium;
mod native;

use cuttermap_core::{
    CutterMapError, ExtractionResult, Geometry, HtmlRenderer, RenderOptions, Sheet, compose,
};
use tracing::{info, warn};

pub use chromium::ChromiumRenderer;
pub use native::NativeRenderer;
pub(crate) use native::text_width;

/// A regenerated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub bytes: Vec<u8>,
    /// Which strategy produced it (`chromium`, `native`, `html`).
    pub backend: String,
    /// File extension: `pdf` or `html`.
    pub file_type: String,
}

impl RenderedFile {
    pub fn is_pdf(&self) -> bool {
        self.file_type == "pdf"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(RenderedFile),
    /// This strategy is unavailable; the reason is logged.
    TryNext(String),
}

/// Everything a strategy may draw from.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub title: String,
    pub html: String,
    pub sheets: Vec<Sheet>,
    pub geometry: Geometry,
}

impl RenderJob {
    pub fn new(result: &ExtractionResult, options: &RenderOptions) -> Self {
        let geometry = Geometry::for_blades(&result.blades, options);
        let sheets = compose(result, &geometry, options.page_width, options.page_height);
        let title = HtmlRenderer::title(result);
        let html = HtmlRenderer::render_sheets(&title, &sheets, &geometry);
        Self {
            title,
            html,
            sheets,
            geometry,
        }
    }
}

/// One way of turning a job into a PDF.
pub trait PdfRenderer {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Unavailability is `Ok(TryNext)`; `Err` is reserved for failures that
    /// should stop the whole render.
    fn render(&self, job: &RenderJob) -> Result<RenderOutcome, CutterMapError>;
}

/// Build the strategies named in `options.backends`, in order.
pub fn renderers_from_options(options: &RenderOptions) -> Vec<Box<dyn PdfRenderer>> {
    options
        .backends
        .iter()
        .filter_map(|name| -> Option<Box<dyn PdfRenderer>> {
            match name.as_str() {
                "chromium" => Some(Box::new(ChromiumRenderer::from_options(options))),
                "native" => Some(Box::new(NativeRenderer)),
                other => {
                    warn!(backend = other, "unknown render backend ignored");
                    None
                }
            }
        })
        .collect()
}

/// Try each renderer in turn; fall back to the HTML.
///
/// # Errors
///
/// Propagates the first renderer error.
pub fn render_with(
    renderers: &[Box<dyn PdfRenderer>],
    job: &RenderJob,
) -> Result<RenderedFile, CutterMapError> {
    for renderer in renderers {
        match renderer.render(job)? {
            RenderOutcome::Rendered(file) => {
                info!(backend = %file.backend, bytes = file.bytes.len(), "rendered PDF");
                return Ok(file);
            }
            RenderOutcome::TryNext(reason) => {
                warn!(backend = renderer.name(), %reason, "renderer unavailable, trying next");
            }
        }
    }
    warn!("no PDF backend succeeded, returning HTML");
    Ok(RenderedFile {
        bytes: job.html.clone().into_bytes(),
        backend: "html".to_string(),
        file_type: "html".to_string(),
    })
}

/// Regenerate `result` as a PDF, or HTML when no backend works.
///
/// # Errors
///
/// Fails only when a renderer fails unexpectedly.
pub fn render_pdf(
    result: &ExtractionResult,
    options: &RenderOptions,
) -> Result<RenderedFile, CutterMapError> {
    let job = RenderJob::new(result, options);
    render_with(&renderers_from_options(options), &job)
}
