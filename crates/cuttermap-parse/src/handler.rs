//! Content handler callback trait for content stream interpretation.
//!
//! The interpreter reports what it paints through [`ContentHandler`]; the
//! extraction layer decides what to keep.

use std::rc::Rc;

use cuttermap_core::{Ctm, ExtractWarning, Path, RasterImage, Rgb};

/// A glyph painted by a text showing operator (`Tj`, `TJ`, `'`, `"`).
#[derive(Debug, Clone)]
pub struct CharEvent {
    /// Character code from the content stream.
    pub code: u32,
    /// Decoded text.
    pub text: String,
    /// Font name (subset prefix stripped).
    pub font_name: String,
    /// Effective size on the page, after text and current transforms.
    pub size: f64,
    /// Glyph box in device space `[x0, y0, x1, y1]`, bottom-left origin.
    pub bbox: [f64; 4],
    /// Fill color at paint time.
    pub color: Rgb,
}

/// A painted path, in device space.
#[derive(Debug, Clone)]
pub struct PathEvent {
    pub path: Path,
    /// Fill color if the path was filled.
    pub fill: Option<Rgb>,
    /// Stroke color if the path was stroked.
    pub stroke: Option<Rgb>,
}

/// An image XObject painted with `Do`.
#[derive(Debug, Clone)]
pub struct ImageEvent {
    /// Resource name, without the `/`.
    pub name: String,
    /// CTM at paint time; maps the unit square onto the page.
    pub ctm: Ctm,
    /// Shared decoded resource. The same `Rc` is handed out for every
    /// placement of one XObject.
    pub image: Rc<RasterImage>,
}

/// Receives interpreter output. Every method defaults to doing nothing.
pub trait ContentHandler {
    fn on_char(&mut self, _event: CharEvent) {}

    fn on_path_painted(&mut self, _event: PathEvent) {}

    fn on_image(&mut self, _event: ImageEvent) {}

    /// A recoverable problem; interpretation continues.
    fn on_warning(&mut self, _warning: ExtractWarning) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        chars: usize,
        warnings: usize,
    }

    impl ContentHandler for Counter {
        fn on_char(&mut self, _event: CharEvent) {
            self.chars += 1;
        }

        fn on_warning(&mut self, _warning: ExtractWarning) {
            self.warnings += 1;
        }
    }

    #[test]
    fn default_methods_are_no_ops() {
        let mut handler = Counter::default();
        handler.on_path_painted(PathEvent {
            path: Path::default(),
            fill: None,
            stroke: Some(Rgb::BLACK),
        });
        handler.on_char(CharEvent {
            code: 65,
            text: "A".into(),
            font_name: "Helvetica".into(),
            size: 10.0,
            bbox: [0.0, 0.0, 6.0, 10.0],
            color: Rgb::BLACK,
        });
        handler.on_warning(ExtractWarning::new("x"));
        assert_eq!(handler.chars, 1);
        assert_eq!(handler.warnings, 1);
    }
}
