use crate::geometry::{BBox, Ctm, Point};

/// PDF stream filter used to encode image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageFilter {
    /// JPEG compression (DCTDecode).
    DCTDecode,
    /// Flate (zlib/deflate) compression, already inflated in `data`.
    FlateDecode,
    /// JPEG 2000 compression (JPXDecode).
    JPXDecode,
    /// Anything else; `data` holds whatever the stream held.
    Other,
    /// No filter: raw uncompressed samples.
    #[default]
    Raw,
}

impl ImageFilter {
    /// Parse a PDF filter name string to an `ImageFilter`.
    pub fn from_pdf_name(name: &str) -> Self {
        match name {
            "DCTDecode" => ImageFilter::DCTDecode,
            "FlateDecode" => ImageFilter::FlateDecode,
            "JPXDecode" => ImageFilter::JPXDecode,
            _ => ImageFilter::Other,
        }
    }

    /// Whether `data` holds plain pixel samples.
    pub fn is_raw_samples(&self) -> bool {
        matches!(self, ImageFilter::Raw | ImageFilter::FlateDecode)
    }
}

/// A raster image resource with every place it is painted on the page.
///
/// Identity is the content hash: two XObjects with identical stream bytes
/// are the same image.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RasterImage {
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
    /// Pixel bytes as stored (see `filter`).
    #[cfg_attr(feature = "serde", serde(skip))]
    pub data: Vec<u8>,
    pub filter: ImageFilter,
    /// Color space name (`DeviceRGB`, `DeviceGray`, ...).
    pub color_space: String,
    pub bits_per_component: u32,
    /// SHA-256 hex digest of the raw stream bytes.
    pub hash: String,
    /// Where the image is painted, top-left origin.
    pub placements: Vec<BBox>,
}

impl RasterImage {
    /// Number of color components implied by the color space.
    pub fn components(&self) -> usize {
        match self.color_space.as_str() {
            "DeviceGray" | "CalGray" | "G" => 1,
            "DeviceCMYK" | "CMYK" => 4,
            _ => 3,
        }
    }
}

/// Compute the page placement of an image painted with the given CTM.
///
/// Images occupy the unit square in user space; the CTM maps it onto the
/// page. The four transformed corners give the box, flipped to top-left
/// origin.
pub fn placement_from_ctm(ctm: &Ctm, page_height: f64) -> BBox {
    let corners = [
        ctm.transform_point(Point::new(0.0, 0.0)),
        ctm.transform_point(Point::new(1.0, 0.0)),
        ctm.transform_point(Point::new(0.0, 1.0)),
        ctm.transform_point(Point::new(1.0, 1.0)),
    ];
    let x0 = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let x1 = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let y0 = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let y1 = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    BBox::new(x0, page_height - y1, x1, page_height - y0)
}
