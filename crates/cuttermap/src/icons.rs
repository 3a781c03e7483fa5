//! Image XObjects to PNG icons.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cuttermap_core::{CutterMapError, Icon, IconDecoder, ImageFilter, RasterImage};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};

/// Decodes JPEG streams and raw 8-bit or 1-bit samples, re-encoding them as
/// base64 PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngIconDecoder;

fn decode_error(image: &RasterImage, reason: impl std::fmt::Display) -> CutterMapError {
    CutterMapError::Other(format!(
        "cannot decode {}x{} {:?} image {}: {reason}",
        image.width, image.height, image.filter, image.hash
    ))
}

/// Unpack 1-bit rows (each padded to a byte) into 0/255 gray samples.
fn expand_bits(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let stride = (width as usize).div_ceil(8);
    let mut out = Vec::with_capacity(width as usize * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        for x in 0..width as usize {
            let bit = row.get(x / 8).map_or(0, |b| (b >> (7 - x % 8)) & 1);
            out.push(if bit == 1 { 255 } else { 0 });
        }
    }
    out
}

fn cmyk_to_rgb(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - u16::from(px[3]);
            px[..3].iter().map(move |c| ((255 - u16::from(*c)) * k / 255) as u8)
        })
        .collect()
}

fn raw_samples(image: &RasterImage) -> Result<DynamicImage, CutterMapError> {
    let (w, h) = (image.width, image.height);
    let pixels = w as usize * h as usize;
    match (image.bits_per_component, image.components()) {
        (1, 1) => GrayImage::from_raw(w, h, expand_bits(&image.data, w, h))
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| decode_error(image, "short 1-bit sample data")),
        (8, 1) => GrayImage::from_raw(w, h, image.data.get(..pixels).unwrap_or_default().to_vec())
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| decode_error(image, "short gray sample data")),
        (8, 3) => RgbImage::from_raw(w, h, image.data.get(..pixels * 3).unwrap_or_default().to_vec())
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| decode_error(image, "short RGB sample data")),
        (8, 4) => RgbImage::from_raw(
            w,
            h,
            cmyk_to_rgb(image.data.get(..pixels * 4).unwrap_or_default()),
        )
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| decode_error(image, "short CMYK sample data")),
        (bits, n) => Err(decode_error(
            image,
            format!("unsupported {bits}-bit {n}-component samples"),
        )),
    }
}

impl IconDecoder for PngIconDecoder {
    fn decode(&self, image: &RasterImage) -> Result<Icon, CutterMapError> {
        let decoded = match image.filter {
            ImageFilter::DCTDecode => image::load_from_memory_with_format(&image.data, ImageFormat::Jpeg)
                .map_err(|e| decode_error(image, e))?,
            f if f.is_raw_samples() => raw_samples(image)?,
            _ => return Err(decode_error(image, "unsupported filter")),
        };
        let mut png = Vec::new();
        decoded
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| decode_error(image, e))?;
        Ok(Icon {
            png_base64: STANDARD.encode(&png),
            width: decoded.width(),
            height: decoded.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(width: u32, height: u32, color_space: &str, bits: u32, data: Vec<u8>) -> RasterImage {
        RasterImage {
            width,
            height,
            data,
            filter: ImageFilter::FlateDecode,
            color_space: color_space.into(),
            bits_per_component: bits,
            hash: "h".into(),
            placements: Vec::new(),
        }
    }

    fn png_bytes(icon: &Icon) -> Vec<u8> {
        STANDARD.decode(&icon.png_base64).unwrap()
    }

    #[test]
    fn rgb_samples_become_png() {
        let icon = PngIconDecoder
            .decode(&raw(2, 1, "DeviceRGB", 8, vec![255, 0, 0, 0, 0, 255]))
            .unwrap();
        assert_eq!((icon.width, icon.height), (2, 1));
        let bytes = png_bytes(&icon);
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let back = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(back.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(back.get_pixel(1, 0).0, [0, 0, 255]);
    }

    #[test]
    fn one_bit_rows_are_padded() {
        assert_eq!(expand_bits(&[0b1010_0000, 0b0100_0000], 3, 2), vec![255, 0, 255, 0, 255, 0]);
    }

    #[test]
    fn cmyk_black_and_white() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255, 0, 0, 0, 0]), vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn truncated_samples_fail() {
        assert!(PngIconDecoder.decode(&raw(4, 4, "DeviceGray", 8, vec![0; 3])).is_err());
    }

    #[test]
    fn jpeg2000_is_unsupported() {
        let mut image = raw(1, 1, "DeviceRGB", 8, vec![0; 3]);
        image.filter = ImageFilter::JPXDecode;
        let err = PngIconDecoder.decode(&image).unwrap_err();
        assert!(err.to_string().contains("unsupported filter"));
    }
}
