//! Content stream interpreter.
//!
//! Walks the operators of a page (and of the form XObjects it paints),
//! tracking the graphics and text state, and reports glyphs, painted paths
//! and placed images to a [`ContentHandler`]. Everything reported is in
//! device space with PDF's bottom-left origin; flipping to top-left is the
//! caller's job.

use std::collections::HashSet;
use std::rc::Rc;

use cuttermap_core::{
    Ctm, DecodeOptions, ExtractWarning, ExtractWarningCode, PathBuilder, Point, RasterImage, Rgb,
};
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::fonts::FontInfo;
use crate::handler::{CharEvent, ContentHandler, ImageEvent, PathEvent};
use crate::tokenizer::{Operand, Operator, tokenize};

/// Glyph box extent below and above the baseline, in em.
const DESCENT: f64 = -0.22;
const ASCENT: f64 = 0.78;

/// What a named XObject resource turned out to be.
pub enum XObject<R> {
    Image(Rc<RasterImage>),
    Form {
        content: Vec<u8>,
        /// `/Matrix`, form space to the painting user space.
        matrix: Ctm,
        resources: R,
    },
    /// A known XObject that could not be read; the warning says why.
    Skipped(ExtractWarning),
    /// PostScript and other XObjects that paint nothing we track.
    Other,
}

/// Named resources of the stream being interpreted.
pub trait ResourceProvider: Sized {
    /// Look up a font resource.
    ///
    /// # Errors
    ///
    /// Fails when the name is not in `/Font`.
    fn font(&self, name: &str) -> Result<Rc<FontInfo>, BackendError>;

    /// Look up an XObject resource.
    ///
    /// # Errors
    ///
    /// Fails when the name is not in `/XObject`.
    fn xobject(&self, name: &str) -> Result<XObject<Self>, BackendError>;
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Ctm,
    fill: Rgb,
    stroke: Rgb,
    font: Option<Rc<FontInfo>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// `Tz / 100`.
    h_scale: f64,
    leading: f64,
    rise: f64,
}

impl GraphicsState {
    fn new(ctm: Ctm) -> Self {
        Self {
            ctm,
            fill: Rgb::BLACK,
            stroke: Rgb::BLACK,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Per-stream state. Forms get their own frame.
struct Frame {
    gs: GraphicsState,
    saved: Vec<GraphicsState>,
    tm: Ctm,
    tlm: Ctm,
    path: PathBuilder,
}

impl Frame {
    fn new(gs: GraphicsState) -> Self {
        Self {
            gs,
            saved: Vec::new(),
            tm: Ctm::identity(),
            tlm: Ctm::identity(),
            path: PathBuilder::new(),
        }
    }

    fn move_text_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Ctm::new(1.0, 0.0, 0.0, 1.0, tx, ty).concat(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.gs.leading;
        self.move_text_line(0.0, -leading);
    }
}

/// Interprets content streams into handler callbacks.
pub struct Interpreter<'h, H> {
    handler: &'h mut H,
    max_form_depth: usize,
    fallback_font: Rc<FontInfo>,
    warned_fonts: HashSet<String>,
}

fn numbers(operands: &[Operand]) -> Vec<f64> {
    operands.iter().filter_map(Operand::as_f64).collect()
}

impl<'h, H: ContentHandler> Interpreter<'h, H> {
    pub fn new(handler: &'h mut H, options: &DecodeOptions) -> Self {
        Self {
            handler,
            max_form_depth: options.max_form_depth,
            fallback_font: Rc::new(FontInfo::default()),
            warned_fonts: HashSet::new(),
        }
    }

    /// Interpret a page content stream starting from `ctm`.
    ///
    /// # Errors
    ///
    /// Fails only when the page's own content cannot be tokenized; broken
    /// fonts, images and forms are reported through `on_warning`.
    pub fn run<R: ResourceProvider>(
        &mut self,
        content: &[u8],
        resources: &R,
        ctm: Ctm,
    ) -> Result<(), BackendError> {
        let ops = tokenize(content)?;
        self.execute(&ops, resources, GraphicsState::new(ctm), 0);
        Ok(())
    }

    fn execute<R: ResourceProvider>(
        &mut self,
        ops: &[Operator],
        resources: &R,
        gs: GraphicsState,
        depth: usize,
    ) {
        let mut frame = Frame::new(gs);
        for op in ops {
            self.apply(&mut frame, op, resources, depth);
        }
    }

    fn apply<R: ResourceProvider>(
        &mut self,
        frame: &mut Frame,
        op: &Operator,
        resources: &R,
        depth: usize,
    ) {
        let ctm = frame.gs.ctm;
        match op.name.as_str() {
            // Graphics state
            "q" => frame.saved.push(frame.gs.clone()),
            "Q" => {
                if let Some(gs) = frame.saved.pop() {
                    frame.gs = gs;
                }
            }
            "cm" => {
                if let Some(m) = op.last_numbers::<6>() {
                    frame.gs.ctm = Ctm::from_array(m).concat(&frame.gs.ctm);
                }
            }

            // Color
            "g" | "G" | "rg" | "RG" | "k" | "K" | "sc" | "SC" | "scn" | "SCN" => {
                let Some(color) = Rgb::from_components(&numbers(&op.operands)) else {
                    return;
                };
                if op.name.chars().next().is_some_and(char::is_uppercase) {
                    frame.gs.stroke = color;
                } else {
                    frame.gs.fill = color;
                }
            }
            "cs" => frame.gs.fill = Rgb::BLACK,
            "CS" => frame.gs.stroke = Rgb::BLACK,

            // Text objects and state
            "BT" => {
                frame.tm = Ctm::identity();
                frame.tlm = Ctm::identity();
            }
            "ET" => {}
            "Tf" => self.select_font(frame, op, resources),
            "Tm" => {
                if let Some(m) = op.last_numbers::<6>() {
                    frame.tlm = Ctm::from_array(m);
                    frame.tm = frame.tlm;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = op.last_numbers::<2>() {
                    frame.move_text_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = op.last_numbers::<2>() {
                    frame.gs.leading = -ty;
                    frame.move_text_line(tx, ty);
                }
            }
            "T*" => frame.next_line(),
            "Tc" => set_number(op, &mut frame.gs.char_spacing),
            "Tw" => set_number(op, &mut frame.gs.word_spacing),
            "TL" => set_number(op, &mut frame.gs.leading),
            "Ts" => set_number(op, &mut frame.gs.rise),
            "Tz" => {
                if let Some([tz]) = op.last_numbers::<1>() {
                    frame.gs.h_scale = tz / 100.0;
                }
            }

            // Text showing
            "Tj" => {
                if let Some(Operand::String(bytes)) = op.operands.last() {
                    self.show_text(frame, bytes);
                }
            }
            "'" => {
                frame.next_line();
                if let Some(Operand::String(bytes)) = op.operands.last() {
                    self.show_text(frame, bytes);
                }
            }
            "\"" => {
                if let [aw, ac, Operand::String(bytes)] = op.operands.as_slice() {
                    frame.gs.word_spacing = aw.as_f64().unwrap_or(0.0);
                    frame.gs.char_spacing = ac.as_f64().unwrap_or(0.0);
                    frame.next_line();
                    self.show_text(frame, bytes);
                }
            }
            "TJ" => {
                let Some(Operand::Array(items)) = op.operands.last() else {
                    return;
                };
                for item in items {
                    match item {
                        Operand::String(bytes) => self.show_text(frame, bytes),
                        other => {
                            if let Some(n) = other.as_f64() {
                                let tx = -n / 1000.0 * frame.gs.font_size * frame.gs.h_scale;
                                frame.tm = Ctm::new(1.0, 0.0, 0.0, 1.0, tx, 0.0).concat(&frame.tm);
                            }
                        }
                    }
                }
            }

            // Path construction
            "m" => {
                if let Some([x, y]) = op.last_numbers::<2>() {
                    frame.path.move_to(&ctm, x, y);
                }
            }
            "l" => {
                if let Some([x, y]) = op.last_numbers::<2>() {
                    frame.path.line_to(&ctm, x, y);
                }
            }
            "c" => {
                if let Some(c) = op.last_numbers::<6>() {
                    frame.path.curve_to(&ctm, c);
                }
            }
            "v" => {
                if let Some([x2, y2, x3, y3]) = op.last_numbers::<4>() {
                    frame.path.curve_to_v(&ctm, x2, y2, x3, y3);
                }
            }
            "y" => {
                if let Some([x1, y1, x3, y3]) = op.last_numbers::<4>() {
                    frame.path.curve_to_y(&ctm, x1, y1, x3, y3);
                }
            }
            "re" => {
                if let Some([x, y, w, h]) = op.last_numbers::<4>() {
                    frame.path.rectangle(&ctm, x, y, w, h);
                }
            }
            "h" => frame.path.close_path(),

            // Path painting
            "S" => self.paint(frame, false, true, false),
            "s" => self.paint(frame, false, true, true),
            "f" | "F" | "f*" => self.paint(frame, true, false, false),
            "B" | "B*" => self.paint(frame, true, true, false),
            "b" | "b*" => self.paint(frame, true, true, true),
            "n" => {
                frame.path.take();
            }

            "Do" => {
                if let Some(name) = op.operands.last().and_then(Operand::as_name) {
                    self.paint_xobject(frame, name, resources, depth);
                }
            }
            _ => {}
        }
    }

    fn select_font<R: ResourceProvider>(&mut self, frame: &mut Frame, op: &Operator, resources: &R) {
        let [Operand::Name(name), size] = op.operands.as_slice() else {
            return;
        };
        frame.gs.font_size = size.as_f64().unwrap_or(0.0);
        match resources.font(name) {
            Ok(font) => frame.gs.font = Some(font),
            Err(err) => {
                if self.warned_fonts.insert(name.clone()) {
                    warn!(font = %name, %err, "font unavailable, using Helvetica metrics");
                    self.handler.on_warning(
                        ExtractWarning::with_code(
                            ExtractWarningCode::MissingFont,
                            format!("font /{name} unavailable: {err}"),
                        )
                        .for_element(name.clone()),
                    );
                }
                frame.gs.font = Some(Rc::clone(&self.fallback_font));
            }
        }
    }

    fn show_text(&mut self, frame: &mut Frame, bytes: &[u8]) {
        let font = frame
            .gs
            .font
            .clone()
            .unwrap_or_else(|| Rc::clone(&self.fallback_font));
        let gs = &frame.gs;
        let glyph_space = Ctm::new(gs.font_size * gs.h_scale, 0.0, 0.0, gs.font_size, 0.0, gs.rise);

        for glyph in font.decode(bytes) {
            let trm = glyph_space.concat(&frame.tm).concat(&frame.gs.ctm);
            let w0 = glyph.advance / 1000.0;
            let corners = [(0.0, DESCENT), (w0, DESCENT), (0.0, ASCENT), (w0, ASCENT)]
                .map(|(x, y)| trm.transform_point(Point::new(x, y)));
            let xs = corners.map(|p| p.x);
            let ys = corners.map(|p| p.y);
            let min = |v: [f64; 4]| v.into_iter().fold(f64::INFINITY, f64::min);
            let max = |v: [f64; 4]| v.into_iter().fold(f64::NEG_INFINITY, f64::max);

            if !glyph.text.is_empty() {
                self.handler.on_char(CharEvent {
                    code: glyph.code,
                    text: glyph.text.clone(),
                    font_name: font.name.clone(),
                    size: trm.y_scale(),
                    bbox: [min(xs), min(ys), max(xs), max(ys)],
                    color: frame.gs.fill,
                });
            }

            let mut tx = w0 * frame.gs.font_size + frame.gs.char_spacing;
            if glyph.code == 32 && !font.is_composite() {
                tx += frame.gs.word_spacing;
            }
            tx *= frame.gs.h_scale;
            frame.tm = Ctm::new(1.0, 0.0, 0.0, 1.0, tx, 0.0).concat(&frame.tm);
        }
    }

    fn paint(&mut self, frame: &mut Frame, fill: bool, stroke: bool, close: bool) {
        if close {
            frame.path.close_path();
        }
        let path = frame.path.take();
        if path.is_empty() {
            return;
        }
        self.handler.on_path_painted(PathEvent {
            path,
            fill: fill.then_some(frame.gs.fill),
            stroke: stroke.then_some(frame.gs.stroke),
        });
    }

    fn paint_xobject<R: ResourceProvider>(
        &mut self,
        frame: &mut Frame,
        name: &str,
        resources: &R,
        depth: usize,
    ) {
        let xobject = match resources.xobject(name) {
            Ok(x) => x,
            Err(err) => {
                warn!(xobject = %name, %err, "XObject lookup failed");
                self.handler.on_warning(
                    ExtractWarning::with_code(
                        ExtractWarningCode::MalformedObject,
                        format!("XObject /{name}: {err}"),
                    )
                    .for_element(name),
                );
                return;
            }
        };
        match xobject {
            XObject::Image(image) => self.handler.on_image(ImageEvent {
                name: name.to_string(),
                ctm: frame.gs.ctm,
                image,
            }),
            XObject::Form {
                content,
                matrix,
                resources: form_resources,
            } => {
                if depth >= self.max_form_depth {
                    warn!(form = %name, depth, "form nesting limit reached");
                    self.handler.on_warning(
                        ExtractWarning::with_code(
                            ExtractWarningCode::ResourceLimitReached,
                            format!("form /{name} nested deeper than {}", self.max_form_depth),
                        )
                        .for_element(name),
                    );
                    return;
                }
                let ops = match tokenize(&content) {
                    Ok(ops) => ops,
                    Err(err) => {
                        warn!(form = %name, %err, "unreadable form content");
                        self.handler.on_warning(
                            ExtractWarning::with_code(
                                ExtractWarningCode::DrawingSkipped,
                                format!("form /{name}: {err}"),
                            )
                            .for_element(name),
                        );
                        return;
                    }
                };
                let mut gs = frame.gs.clone();
                gs.ctm = matrix.concat(&frame.gs.ctm);
                self.execute(&ops, &form_resources, gs, depth + 1);
            }
            XObject::Skipped(warning) => {
                warn!(xobject = %name, reason = %warning.description, "XObject skipped");
                self.handler.on_warning(warning);
            }
            XObject::Other => debug!(xobject = %name, "ignoring XObject"),
        }
    }
}

fn set_number(op: &Operator, slot: &mut f64) {
    if let Some([v]) = op.last_numbers::<1>() {
        *slot = v;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < EPS, "{actual} != {expected}");
    }

    #[derive(Clone, Default)]
    struct MapResources {
        fonts: HashMap<String, Rc<FontInfo>>,
        images: HashMap<String, Rc<RasterImage>>,
        forms: HashMap<String, (Vec<u8>, Ctm)>,
    }

    impl MapResources {
        fn helvetica() -> Self {
            let mut res = Self::default();
            res.fonts
                .insert("F1".into(), Rc::new(FontInfo::standard("Helvetica")));
            res
        }
    }

    impl ResourceProvider for MapResources {
        fn font(&self, name: &str) -> Result<Rc<FontInfo>, BackendError> {
            self.fonts
                .get(name)
                .cloned()
                .ok_or_else(|| BackendError::Font(format!("no font {name}")))
        }

        fn xobject(&self, name: &str) -> Result<XObject<Self>, BackendError> {
            if let Some(image) = self.images.get(name) {
                return Ok(XObject::Image(Rc::clone(image)));
            }
            if let Some((content, matrix)) = self.forms.get(name) {
                return Ok(XObject::Form {
                    content: content.clone(),
                    matrix: *matrix,
                    resources: self.clone(),
                });
            }
            Err(BackendError::Parse(format!("no XObject {name}")))
        }
    }

    #[derive(Default)]
    struct Recorder {
        chars: Vec<CharEvent>,
        paths: Vec<PathEvent>,
        images: Vec<ImageEvent>,
        warnings: Vec<ExtractWarning>,
    }

    impl ContentHandler for Recorder {
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

    fn run(content: &[u8], resources: &MapResources) -> Recorder {
        let mut rec = Recorder::default();
        Interpreter::new(&mut rec, &DecodeOptions::default())
            .run(content, resources, Ctm::identity())
            .unwrap();
        rec
    }

    #[test]
    fn glyph_boxes_follow_widths() {
        let rec = run(b"BT /F1 10 Tf 72 700 Td (AB) Tj ET", &MapResources::helvetica());
        assert_eq!(rec.chars.len(), 2);
        let [x0, y0, x1, y1] = rec.chars[0].bbox;
        assert_close(x0, 72.0);
        assert_close(x1, 78.67);
        assert_close(y0, 697.8);
        assert_close(y1, 707.8);
        assert_close(rec.chars[1].bbox[0], 78.67);
        assert_close(rec.chars[0].size, 10.0);
        assert_eq!(rec.chars[0].font_name, "Helvetica");
    }

    #[test]
    fn tj_adjustments_move_the_pen() {
        let rec = run(b"BT /F1 10 Tf 72 700 Td [(A) -1000 (B)] TJ ET", &MapResources::helvetica());
        assert_close(rec.chars[1].bbox[0], 72.0 + 6.67 + 10.0);
    }

    #[test]
    fn word_spacing_applies_to_spaces() {
        let rec = run(b"BT /F1 10 Tf 5 Tw (A B) Tj ET", &MapResources::helvetica());
        assert_eq!(rec.chars.len(), 3);
        assert_close(rec.chars[2].bbox[0], 6.67 + 2.78 + 5.0);
    }

    #[test]
    fn ctm_scales_glyphs() {
        let rec = run(
            b"2 0 0 2 0 0 cm BT /F1 10 Tf 10 10 Td (A) Tj ET",
            &MapResources::helvetica(),
        );
        assert_close(rec.chars[0].bbox[0], 20.0);
        assert_close(rec.chars[0].size, 20.0);
    }

    #[test]
    fn leading_and_next_line_operators() {
        let rec = run(
            b"BT /F1 10 Tf 12 TL 50 100 Td (A) Tj (B) ' ET",
            &MapResources::helvetica(),
        );
        assert_close(rec.chars[1].bbox[0], 50.0);
        assert_close(rec.chars[1].bbox[1], 88.0 - 2.2);
    }

    #[test]
    fn restore_pops_fill_color() {
        let rec = run(b"1 0 0 rg q 0 0 1 rg Q 0 0 10 10 re f", &MapResources::default());
        assert_eq!(rec.paths.len(), 1);
        assert_eq!(rec.paths[0].fill, Some(Rgb::new(255, 0, 0)));
        assert_eq!(rec.paths[0].stroke, None);
    }

    #[test]
    fn stroke_and_discard() {
        let rec = run(b"0.5 G 0 0 m 10 0 l S 0 0 m 5 5 l n", &MapResources::default());
        assert_eq!(rec.paths.len(), 1);
        assert_eq!(rec.paths[0].stroke, Some(Rgb::new(128, 128, 128)));
        assert_eq!(rec.paths[0].path.line_count(), 1);
    }

    #[test]
    fn cmyk_text_color() {
        let rec = run(b"0 0 0 1 k BT /F1 10 Tf (A) Tj ET", &MapResources::helvetica());
        assert_eq!(rec.chars[0].color, Rgb::BLACK);
    }

    #[test]
    fn missing_font_warns_once_and_falls_back() {
        let rec = run(
            b"BT /F9 10 Tf (A) Tj /F9 12 Tf (B) Tj ET",
            &MapResources::default(),
        );
        assert_eq!(rec.chars.len(), 2);
        let missing: Vec<_> = rec
            .warnings
            .iter()
            .filter(|w| w.code == ExtractWarningCode::MissingFont)
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].element.as_deref(), Some("F9"));
    }

    #[test]
    fn repeated_image_shares_one_resource() {
        let mut res = MapResources::default();
        res.images.insert(
            "Im1".into(),
            Rc::new(RasterImage {
                width: 2,
                height: 2,
                hash: "abc".into(),
                ..Default::default()
            }),
        );
        let rec = run(
            b"q 20 0 0 20 10 10 cm /Im1 Do Q q 20 0 0 20 50 10 cm /Im1 Do Q",
            &res,
        );
        assert_eq!(rec.images.len(), 2);
        assert!(Rc::ptr_eq(&rec.images[0].image, &rec.images[1].image));
        assert_close(rec.images[1].ctm.e, 50.0);
    }

    #[test]
    fn form_matrix_composes_with_ctm() {
        let mut res = MapResources::default();
        res.forms.insert(
            "Fm1".into(),
            (b"0 0 10 10 re f".to_vec(), Ctm::new(1.0, 0.0, 0.0, 1.0, 100.0, 0.0)),
        );
        let rec = run(b"1 0 0 1 0 50 cm /Fm1 Do", &res);
        assert_eq!(rec.paths.len(), 1);
        let pts = rec.paths[0].path.points();
        assert_close(pts[0].x, 100.0);
        assert_close(pts[0].y, 50.0);
    }

    #[test]
    fn self_referencing_form_hits_depth_limit() {
        let mut res = MapResources::default();
        res.forms
            .insert("Fm1".into(), (b"/Fm1 Do".to_vec(), Ctm::identity()));
        let rec = run(b"/Fm1 Do", &res);
        assert!(
            rec.warnings
                .iter()
                .any(|w| w.code == ExtractWarningCode::ResourceLimitReached)
        );
    }

    #[test]
    fn unknown_xobject_is_a_warning() {
        let rec = run(b"/Nope Do", &MapResources::default());
        assert_eq!(rec.warnings.len(), 1);
        assert_eq!(rec.warnings[0].code, ExtractWarningCode::MalformedObject);
    }
}
