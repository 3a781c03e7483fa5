//! lopdf-based PDF backend.
//!
//! Opens a document with [lopdf](https://docs.rs/lopdf), resolves the first
//! page's content and resources, and drives the [`Interpreter`] over it.
//! Fonts and images are read once per object and shared through `Rc` across
//! every form that references them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use cuttermap_core::{
    BBox, Ctm, DecodeOptions, ExtractWarning, ExtractWarningCode, ImageFilter, PageSize,
    RasterImage,
};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::BackendError;
use crate::fonts::FontInfo;
use crate::handler::ContentHandler;
use crate::interpreter::{Interpreter, ResourceProvider, XObject};

static EMPTY_DICT: LazyLock<Dictionary> = LazyLock::new(Dictionary::new);

/// A parsed PDF document.
pub struct LopdfDocument {
    inner: Document,
    page_ids: Vec<ObjectId>,
}

impl std::fmt::Debug for LopdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfDocument")
            .field("page_count", &self.page_ids.len())
            .finish_non_exhaustive()
    }
}

impl LopdfDocument {
    /// Parse a PDF from bytes.
    ///
    /// # Errors
    ///
    /// Fails on unparseable input, encrypted documents and documents
    /// without pages.
    pub fn open(bytes: &[u8]) -> Result<Self, BackendError> {
        let inner = Document::load_mem(bytes)
            .map_err(|e| BackendError::Parse(format!("failed to parse PDF: {e}")))?;
        if inner.is_encrypted() {
            return Err(BackendError::Parse(
                "encrypted documents are not supported".to_string(),
            ));
        }
        // get_pages is keyed by 1-based page number.
        let page_ids: Vec<ObjectId> = inner.get_pages().values().copied().collect();
        if page_ids.is_empty() {
            return Err(BackendError::Parse("document has no pages".to_string()));
        }
        Ok(Self { inner, page_ids })
    }

    pub fn inner(&self) -> &Document {
        &self.inner
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn first_page(&self) -> Result<ObjectId, BackendError> {
        self.page_ids
            .first()
            .copied()
            .ok_or_else(|| BackendError::Parse("document has no pages".to_string()))
    }

    /// Media box of the first page, in PDF coordinates.
    pub fn media_box(&self) -> Result<BBox, BackendError> {
        let page_id = self.first_page()?;
        match resolve_inherited(&self.inner, page_id, b"MediaBox")? {
            Some(obj) => {
                let arr = resolve(&self.inner, obj)
                    .as_array()
                    .map_err(|_| BackendError::Parse("/MediaBox is not an array".to_string()))?;
                extract_bbox_from_array(arr)
            }
            // US Letter, the PDF default.
            None => Ok(BBox::new(0.0, 0.0, 612.0, 792.0)),
        }
    }

    /// Interpret the first page, reporting its contents to `handler`.
    ///
    /// Output is shifted so the media box origin lands at `(0, 0)`.
    ///
    /// # Errors
    ///
    /// Fails when the page dictionary, its content streams or its media box
    /// cannot be read. Per-element problems become warnings.
    pub fn interpret_first_page<H: ContentHandler>(
        &self,
        handler: &mut H,
        options: &DecodeOptions,
    ) -> Result<PageSize, BackendError> {
        let page_id = self.first_page()?;
        let page_dict = self
            .inner
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;
        let content = get_page_content_bytes(&self.inner, page_dict)?;
        let resources = LopdfResources::new(&self.inner, get_page_resources(&self.inner, page_id)?);

        let mb = self.media_box()?;
        let origin = Ctm::new(1.0, 0.0, 0.0, 1.0, -mb.x0, -mb.top);
        debug!(bytes = content.len(), width = mb.width(), height = mb.height(), "interpreting first page");

        Interpreter::new(handler, options).run(&content, &resources, origin)?;
        Ok(PageSize {
            width: mb.width(),
            height: mb.height(),
        })
    }
}

/// Resources of one content stream plus the per-document caches.
#[derive(Clone)]
pub struct LopdfResources<'a> {
    doc: &'a Document,
    dict: &'a Dictionary,
    fonts: Rc<RefCell<HashMap<ObjectId, Rc<FontInfo>>>>,
    images: Rc<RefCell<HashMap<ObjectId, Rc<RasterImage>>>>,
}

impl<'a> LopdfResources<'a> {
    pub fn new(doc: &'a Document, dict: &'a Dictionary) -> Self {
        Self {
            doc,
            dict,
            fonts: Rc::default(),
            images: Rc::default(),
        }
    }

    /// Same caches, different resource dictionary.
    fn nested(&self, dict: &'a Dictionary) -> Self {
        Self {
            dict,
            ..self.clone()
        }
    }

    fn category(&self, key: &[u8]) -> Result<&'a Dictionary, BackendError> {
        let obj = self.dict.get(key).map_err(|_| {
            BackendError::Parse(format!(
                "no /{} dictionary in resources",
                String::from_utf8_lossy(key)
            ))
        })?;
        resolve(self.doc, obj).as_dict().map_err(|_| {
            BackendError::Parse(format!(
                "/{} resource is not a dictionary",
                String::from_utf8_lossy(key)
            ))
        })
    }

    fn read_form(&self, name: &str, stream: &'a Stream) -> XObject<Self> {
        let content = match decode_content_stream(stream) {
            Ok(content) => content,
            Err(err) => {
                return XObject::Skipped(
                    ExtractWarning::with_code(
                        ExtractWarningCode::DrawingSkipped,
                        format!("form /{name}: {err}"),
                    )
                    .for_element(name),
                );
            }
        };
        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| {
                let m: Vec<f64> = arr.iter().filter_map(|o| object_to_f64(o).ok()).collect();
                <[f64; 6]>::try_from(m).ok()
            })
            .map(Ctm::from_array)
            .unwrap_or_default();
        // Forms without /Resources use the painting stream's.
        let dict = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|o| resolve(self.doc, o).as_dict().ok())
            .unwrap_or(self.dict);
        XObject::Form {
            content,
            matrix,
            resources: self.nested(dict),
        }
    }
}

impl ResourceProvider for LopdfResources<'_> {
    fn font(&self, name: &str) -> Result<Rc<FontInfo>, BackendError> {
        let entry = self
            .category(b"Font")?
            .get(name.as_bytes())
            .map_err(|_| BackendError::Font(format!("font /{name} not found in resources")))?;
        let id = entry.as_reference().ok();
        if let Some(font) = id.and_then(|id| self.fonts.borrow().get(&id).cloned()) {
            return Ok(font);
        }
        let dict = resolve(self.doc, entry)
            .as_dict()
            .map_err(|_| BackendError::Font(format!("font /{name} is not a dictionary")))?;
        let font = Rc::new(FontInfo::from_dict(self.doc, dict));
        if let Some(id) = id {
            self.fonts.borrow_mut().insert(id, Rc::clone(&font));
        }
        Ok(font)
    }

    fn xobject(&self, name: &str) -> Result<XObject<Self>, BackendError> {
        let entry = self.category(b"XObject")?.get(name.as_bytes()).map_err(|_| {
            BackendError::Parse(format!("XObject /{name} not found in resources"))
        })?;
        let id = entry
            .as_reference()
            .map_err(|_| BackendError::Parse(format!("XObject /{name} is not an indirect reference")))?;
        if let Some(image) = self.images.borrow().get(&id) {
            return Ok(XObject::Image(Rc::clone(image)));
        }
        let stream = self
            .doc
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(|e| BackendError::Parse(format!("XObject /{name} is not a stream: {e}")))?;

        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .unwrap_or_default();
        match subtype {
            b"Image" => match read_image(self.doc, stream) {
                Ok(image) => {
                    let image = Rc::new(image);
                    self.images.borrow_mut().insert(id, Rc::clone(&image));
                    Ok(XObject::Image(image))
                }
                Err(err) => Ok(XObject::Skipped(
                    ExtractWarning::with_code(
                        ExtractWarningCode::ImageSkipped,
                        format!("image /{name}: {err}"),
                    )
                    .for_element(name),
                )),
            },
            b"Form" => Ok(self.read_form(name, stream)),
            _ => Ok(XObject::Other),
        }
    }
}

fn name_str(obj: &Object) -> Option<String> {
    obj.as_name()
        .ok()
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

/// Color space name, normalising ICC profiles to their device equivalent.
fn color_space_name(doc: &Document, obj: Option<&Object>) -> String {
    let Some(obj) = obj.map(|o| resolve(doc, o)) else {
        return "DeviceRGB".to_string();
    };
    if let Some(name) = name_str(obj) {
        return name;
    }
    let Ok(arr) = obj.as_array() else {
        return "DeviceRGB".to_string();
    };
    let family = arr.first().and_then(name_str).unwrap_or_default();
    if family != "ICCBased" {
        return family;
    }
    let n = arr
        .get(1)
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_stream().ok())
        .and_then(|s| s.dict.get(b"N").ok())
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(3);
    match n {
        1 => "DeviceGray",
        4 => "DeviceCMYK",
        _ => "DeviceRGB",
    }
    .to_string()
}

/// Read an image XObject. Identity is the SHA-256 of the stored bytes.
fn read_image(doc: &Document, stream: &Stream) -> Result<RasterImage, BackendError> {
    let dict = &stream.dict;
    let int = |key: &[u8]| dict.get(key).ok().and_then(|o| o.as_i64().ok());

    let filters: Vec<String> = match dict.get(b"Filter").ok().map(|o| resolve(doc, o)) {
        Some(Object::Array(arr)) => arr.iter().filter_map(|o| name_str(resolve(doc, o))).collect(),
        Some(other) => name_str(other).into_iter().collect(),
        None => Vec::new(),
    };
    let filter = filters
        .last()
        .map_or(ImageFilter::Raw, |f| ImageFilter::from_pdf_name(f));

    let data = match filter {
        ImageFilter::Raw => stream.content.clone(),
        ImageFilter::DCTDecode | ImageFilter::JPXDecode if filters.len() == 1 => {
            stream.content.clone()
        }
        ImageFilter::Other => stream.content.clone(),
        _ => stream
            .decompressed_content()
            .map_err(|e| BackendError::Parse(format!("failed to decompress image: {e}")))?,
    };

    let width = int(b"Width").unwrap_or(0);
    let height = int(b"Height").unwrap_or(0);
    if width <= 0 || height <= 0 {
        return Err(BackendError::Parse(format!(
            "invalid image size {width}x{height}"
        )));
    }

    Ok(RasterImage {
        width: width as u32,
        height: height as u32,
        data,
        filter,
        color_space: color_space_name(doc, dict.get(b"ColorSpace").ok()),
        bits_per_component: int(b"BitsPerComponent").unwrap_or(8).max(1) as u32,
        hash: format!("{:x}", Sha256::digest(&stream.content)),
        placements: Vec::new(),
    })
}

/// Extract a [`BBox`] from a lopdf array of 4 numbers `[x0, y0, x1, y1]`.
///
/// The box keeps PDF orientation: `top` holds the lower y.
fn extract_bbox_from_array(array: &[Object]) -> Result<BBox, BackendError> {
    if array.len() != 4 {
        return Err(BackendError::Parse(format!(
            "expected 4-element array for box, got {}",
            array.len()
        )));
    }
    let x0 = object_to_f64(&array[0])?;
    let y0 = object_to_f64(&array[1])?;
    let x1 = object_to_f64(&array[2])?;
    let y1 = object_to_f64(&array[3])?;
    Ok(BBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
}

/// Convert a lopdf numeric object (Integer or Real) to f64.
pub(crate) fn object_to_f64(obj: &Object) -> Result<f64, BackendError> {
    match obj {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(f) => Ok(*f as f64),
        _ => Err(BackendError::Parse(format!("expected number, got {obj:?}"))),
    }
}

/// Follow an indirect reference; anything else is returned as is.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look up a key on the page, walking up the page tree via /Parent.
fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, BackendError> {
    let mut current_id = page_id;
    loop {
        let dict = doc
            .get_object(current_id)
            .and_then(Object::as_dict)
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent) => {
                current_id = parent
                    .as_reference()
                    .map_err(|e| BackendError::Parse(format!("invalid /Parent reference: {e}")))?;
            }
            Err(_) => return Ok(None),
        }
    }
}

/// Page content bytes; multiple streams are joined with a space.
fn get_page_content_bytes(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>, BackendError> {
    let Ok(contents) = page_dict.get(b"Contents") else {
        return Ok(Vec::new());
    };

    match resolve(doc, contents) {
        Object::Stream(stream) => decode_content_stream(stream),
        Object::Array(arr) => {
            let mut content = Vec::new();
            for item in arr {
                let stream = resolve(doc, item).as_stream().map_err(|e| {
                    BackendError::Parse(format!("/Contents array item is not a stream: {e}"))
                })?;
                let bytes = decode_content_stream(stream)?;
                if !content.is_empty() {
                    content.push(b' ');
                }
                content.extend_from_slice(&bytes);
            }
            Ok(content)
        }
        _ => Err(BackendError::Parse(
            "/Contents is not a stream or array".to_string(),
        )),
    }
}

/// Decode a content stream, decompressing if needed.
fn decode_content_stream(stream: &Stream) -> Result<Vec<u8>, BackendError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| BackendError::Parse(format!("failed to decompress content stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// The page's resources, inherited if needed; empty when there are none.
fn get_page_resources(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, BackendError> {
    match resolve_inherited(doc, page_id, b"Resources")? {
        Some(obj) => resolve(doc, obj)
            .as_dict()
            .map_err(|_| BackendError::Parse("/Resources is not a dictionary".to_string())),
        None => Ok(&EMPTY_DICT),
    }
}

#[cfg(test)]
mod tests {
    use lopdf::dictionary;

    use super::*;
    use crate::handler::{CharEvent, ImageEvent};

    #[derive(Default)]
    struct Collect {
        chars: Vec<CharEvent>,
        images: Vec<ImageEvent>,
        warnings: Vec<ExtractWarning>,
    }

    impl ContentHandler for Collect {
        fn on_char(&mut self, event: CharEvent) {
            self.chars.push(event);
        }
        fn on_image(&mut self, event: ImageEvent) {
            self.images.push(event);
        }
        fn on_warning(&mut self, warning: ExtractWarning) {
            self.warnings.push(warning);
        }
    }

    /// One page with resources on the Pages node so they must be inherited.
    fn build_pdf(content: &[u8], media_box: [i64; 4], extra: impl FnOnce(&mut Document) -> Dictionary) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let xobjects = extra(&mut doc);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobjects,
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::from(page_id)],
                "Count" => 1i64,
                "Resources" => resources_id,
                "MediaBox" => media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn image_stream(pixels: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            pixels,
        )
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = LopdfDocument::open(b"not a pdf").unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }

    #[test]
    fn inherited_media_box_and_resources() {
        let pdf = build_pdf(b"BT /F1 12 Tf 100 700 Td (Hi) Tj ET", [0, 0, 792, 612], |_| dictionary! {});
        let doc = LopdfDocument::open(&pdf).unwrap();
        assert_eq!(doc.page_count(), 1);
        let mut handler = Collect::default();
        let size = doc
            .interpret_first_page(&mut handler, &DecodeOptions::default())
            .unwrap();
        assert_eq!(size, PageSize { width: 792.0, height: 612.0 });
        let text: String = handler.chars.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(text, "Hi");
        assert!(handler.warnings.is_empty());
    }

    #[test]
    fn shifted_media_box_moves_origin() {
        let pdf = build_pdf(b"BT /F1 10 Tf 150 150 Td (A) Tj ET", [100, 100, 400, 500], |_| dictionary! {});
        let doc = LopdfDocument::open(&pdf).unwrap();
        let mut handler = Collect::default();
        let size = doc
            .interpret_first_page(&mut handler, &DecodeOptions::default())
            .unwrap();
        assert_eq!(size.width, 300.0);
        assert!((handler.chars[0].bbox[0] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn identical_images_share_a_hash() {
        let pdf = build_pdf(
            b"q 10 0 0 10 0 0 cm /Im1 Do Q q 10 0 0 10 20 0 cm /Im2 Do Q q 10 0 0 10 40 0 cm /Im1 Do Q",
            [0, 0, 612, 792],
            |doc| {
                let a = doc.add_object(image_stream(vec![0, 255]));
                let b = doc.add_object(image_stream(vec![0, 255]));
                dictionary! { "Im1" => a, "Im2" => b }
            },
        );
        let doc = LopdfDocument::open(&pdf).unwrap();
        let mut handler = Collect::default();
        doc.interpret_first_page(&mut handler, &DecodeOptions::default())
            .unwrap();
        assert_eq!(handler.images.len(), 3);
        assert!(Rc::ptr_eq(&handler.images[0].image, &handler.images[2].image));
        assert_eq!(handler.images[0].image.hash, handler.images[1].image.hash);
        assert_eq!(handler.images[0].image.color_space, "DeviceGray");
        assert_eq!(handler.images[0].image.data, vec![0, 255]);
    }

    #[test]
    fn unreadable_image_is_skipped_with_warning() {
        let pdf = build_pdf(b"/Im1 Do", [0, 0, 612, 792], |doc| {
            let bad = doc.add_object(Stream::new(
                dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 0, "Height" => 0 },
                Vec::new(),
            ));
            dictionary! { "Im1" => bad }
        });
        let doc = LopdfDocument::open(&pdf).unwrap();
        let mut handler = Collect::default();
        doc.interpret_first_page(&mut handler, &DecodeOptions::default())
            .unwrap();
        assert!(handler.images.is_empty());
        assert_eq!(handler.warnings.len(), 1);
        assert_eq!(handler.warnings[0].code, ExtractWarningCode::ImageSkipped);
    }

    #[test]
    fn form_xobject_is_followed() {
        let pdf = build_pdf(b"/Fm1 Do", [0, 0, 612, 792], |doc| {
            let form = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                    "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 30.into(), 40.into()],
                },
                b"BT /F1 10 Tf (Z) Tj ET".to_vec(),
            ));
            dictionary! { "Fm1" => form }
        });
        let doc = LopdfDocument::open(&pdf).unwrap();
        let mut handler = Collect::default();
        doc.interpret_first_page(&mut handler, &DecodeOptions::default())
            .unwrap();
        assert_eq!(handler.chars.len(), 1);
        assert!((handler.chars[0].bbox[0] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn object_to_f64_rejects_names() {
        assert!(object_to_f64(&Object::Name(b"X".to_vec())).is_err());
        assert_eq!(object_to_f64(&Object::Integer(3)).unwrap(), 3.0);
    }
}
