//! A dependency-free fallback: writes the composed sheets straight into PDF
//! content streams with lopdf, using the base-14 Helvetica faces.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cuttermap_core::{Align, BBox, CutterMapError, DrawItem, Icon, Rgb, Sheet};
use cuttermap_parse::FontInfo;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::warn;

use super::{PdfRenderer, RenderJob, RenderOutcome, RenderedFile};

/// Bézier control distance for a quarter circle.
const KAPPA: f64 = 0.552_284_75;
/// Glyph box top above the baseline, in em.
const ASCENT: f64 = 0.78;

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRenderer;

fn num(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn color_op(c: Rgb, op: &str) -> String {
    format!(
        "{} {} {} {op}\n",
        num(f64::from(c.r) / 255.0),
        num(f64::from(c.g) / 255.0),
        num(f64::from(c.b) / 255.0)
    )
}

/// WinAnsi bytes for `text`; characters outside Latin-1 become `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Advance of `text` at `size` points, measured on its WinAnsi bytes.
pub(crate) fn text_width(metrics: &FontInfo, text: &str, size: f64) -> f64 {
    encoded_width(metrics, &encode_text(text), size)
}

fn encoded_width(metrics: &FontInfo, bytes: &[u8], size: f64) -> f64 {
    metrics.decode(bytes).iter().map(|g| g.advance).sum::<f64>() / 1000.0 * size
}

fn literal_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(b'(');
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out.push(b')');
    out
}

struct ContentWriter<'a> {
    out: Vec<u8>,
    height: f64,
    metrics: &'a FontInfo,
    /// XObject name per icon payload.
    images: &'a HashMap<String, String>,
}

impl ContentWriter<'_> {
    fn push(&mut self, s: &str) {
        self.out.extend_from_slice(s.as_bytes());
    }

    fn item(&mut self, item: &DrawItem) {
        match item {
            DrawItem::Text {
                x,
                top,
                width,
                size,
                text,
                bold,
                align,
                color,
            } => {
                let bytes = encode_text(text);
                let x = match align {
                    Align::Left => *x,
                    Align::Center => x + (width - encoded_width(self.metrics, &bytes, *size)) / 2.0,
                };
                let baseline = self.height - (top + ASCENT * size);
                self.push("BT\n");
                self.push(&format!("/{} {} Tf\n", if *bold { "F2" } else { "F1" }, num(*size)));
                self.push(&color_op(*color, "rg"));
                self.push(&format!("{} {} Td\n", num(x), num(baseline)));
                self.out.extend(literal_string(&bytes));
                self.push(" Tj\nET\n");
            }
            DrawItem::Circle {
                cx,
                cy,
                r,
                fill,
                stroke,
            } => {
                self.push(&color_op(*fill, "rg"));
                self.push(&color_op(*stroke, "RG"));
                self.circle(*cx, self.height - cy, *r);
                self.push("B\n");
            }
            DrawItem::Rect { bbox, fill, stroke } => {
                let op = match (fill, stroke) {
                    (Some(_), Some(_)) => "B",
                    (Some(_), None) => "f",
                    (None, Some(_)) => "S",
                    (None, None) => return,
                };
                if let Some(c) = fill {
                    self.push(&color_op(*c, "rg"));
                }
                if let Some(c) = stroke {
                    self.push(&color_op(*c, "RG"));
                }
                self.rect(bbox);
                self.push(op);
                self.push("\n");
            }
            DrawItem::Image { bbox, icon } => {
                let images = self.images;
                let Some(name) = images.get(&icon.png_base64) else {
                    return;
                };
                self.push(&format!(
                    "q\n{} 0 0 {} {} {} cm\n/{name} Do\nQ\n",
                    num(bbox.width()),
                    num(bbox.height()),
                    num(bbox.x0),
                    num(self.height - bbox.bottom)
                ));
            }
        }
    }

    fn rect(&mut self, bbox: &BBox) {
        self.push(&format!(
            "{} {} {} {} re\n",
            num(bbox.x0),
            num(self.height - bbox.bottom),
            num(bbox.width()),
            num(bbox.height())
        ));
    }

    fn circle(&mut self, cx: f64, cy: f64, r: f64) {
        let k = KAPPA * r;
        let p = |x: f64, y: f64| format!("{} {}", num(x), num(y));
        self.push(&format!("{} m\n", p(cx + r, cy)));
        self.push(&format!("{} {} {} c\n", p(cx + r, cy + k), p(cx + k, cy + r), p(cx, cy + r)));
        self.push(&format!("{} {} {} c\n", p(cx - k, cy + r), p(cx - r, cy + k), p(cx - r, cy)));
        self.push(&format!("{} {} {} c\n", p(cx - r, cy - k), p(cx - k, cy - r), p(cx, cy - r)));
        self.push(&format!("{} {} {} c\n", p(cx + k, cy - r), p(cx + r, cy - k), p(cx + r, cy)));
    }
}

fn sheet_content(
    sheet: &Sheet,
    line_width: f64,
    metrics: &FontInfo,
    images: &HashMap<String, String>,
) -> Vec<u8> {
    let mut writer = ContentWriter {
        out: Vec::new(),
        height: sheet.height,
        metrics,
        images,
    };
    writer.push(&format!("{} w\n", num(line_width)));
    for item in &sheet.items {
        writer.item(item);
    }
    writer.out
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Decode a base64 PNG into an image XObject, with a soft mask when any
/// pixel is translucent.
fn image_xobject(doc: &mut Document, icon: &Icon) -> Result<ObjectId, CutterMapError> {
    let png = STANDARD
        .decode(icon.png_base64.as_bytes())
        .map_err(|e| CutterMapError::RenderError(format!("bad icon payload: {e}")))?;
    let rgba = image::load_from_memory(&png)
        .map_err(|e| CutterMapError::RenderError(format!("bad icon image: {e}")))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    let mut alpha = Vec::with_capacity(width as usize * height as usize);
    for px in rgba.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if alpha.iter().any(|&a| a < u8::MAX) {
        let mask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        dict.set("SMask", mask_id);
    }
    Ok(doc.add_object(Stream::new(dict, rgb)))
}

/// Add one XObject per distinct icon on the sheets, returning the name each
/// payload is drawn by and the resource dictionary naming them.
fn embed_images(doc: &mut Document, sheets: &[Sheet]) -> (HashMap<String, String>, Dictionary) {
    let mut names = HashMap::new();
    let mut resources = Dictionary::new();
    let mut failed = Vec::new();
    for sheet in sheets {
        for (_, icon) in sheet.images() {
            if names.contains_key(&icon.png_base64) || failed.contains(&&icon.png_base64) {
                continue;
            }
            match image_xobject(doc, icon) {
                Ok(id) => {
                    let name = format!("Im{}", names.len() + 1);
                    resources.set(name.as_bytes(), id);
                    names.insert(icon.png_base64.clone(), name);
                }
                Err(err) => {
                    warn!(%err, "icon left out of the PDF");
                    failed.push(&icon.png_base64);
                }
            }
        }
    }
    (names, resources)
}

/// Build a PDF with one page per sheet.
///
/// # Errors
///
/// Fails only when lopdf cannot serialize the document.
pub fn write_pdf(title: &str, sheets: &[Sheet], line_width: f64) -> Result<Vec<u8>, CutterMapError> {
    let metrics = FontInfo::standard("Helvetica");
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let (images, xobjects) = embed_images(&mut doc, sheets);
    let mut resources = dictionary! {
        "Font" => dictionary! { "F1" => regular_id, "F2" => bold_id },
    };
    if !xobjects.is_empty() {
        resources.set("XObject", xobjects);
    }
    let resources_id = doc.add_object(resources);

    let mut kids = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let content = sheet_content(sheet, line_width, &metrics, &images);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(sheet.width as f32),
                Object::Real(sheet.height as f32),
            ],
        });
        kids.push(Object::from(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Producer" => Object::string_literal("cuttermap-rs"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| CutterMapError::RenderError(format!("failed to write PDF: {e}")))?;
    Ok(buf)
}

impl PdfRenderer for NativeRenderer {
    fn name(&self) -> &str {
        "native"
    }

    fn render(&self, job: &RenderJob) -> Result<RenderOutcome, CutterMapError> {
        if job.sheets.is_empty() {
            return Ok(RenderOutcome::TryNext("nothing to draw".to_string()));
        }
        let bytes = write_pdf(&job.title, &job.sheets, 0.75 * job.geometry.scale)?;
        Ok(RenderOutcome::Rendered(RenderedFile {
            bytes,
            backend: "native".to_string(),
            file_type: "pdf".to_string(),
        }))
    }
}
