//! PPTX regeneration.
//!
//! Every [`DrawItem`] of the composed sheets becomes one DrawingML shape
//! (ellipse, text box, rectangle or picture) on its own slide. Icons are
//! stored once per deck under `ppt/media/`. The deck carries the
//! minimum package a presentation reader needs: one master, one blank
//! layout, one theme and the core properties.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{Cursor, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cuttermap_core::{
    Align, BBox, CutterMapError, DrawItem, ExtractionResult, Geometry, HtmlRenderer, RenderOptions,
    Rgb, Sheet, SlideOptions, compose,
};
use cuttermap_parse::FontInfo;
use quick_xml::escape::escape;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::render::text_width;

/// English Metric Units per point.
const EMU_PER_PT: f64 = 12_700.0;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Cutter Map"><a:themeElements><a:clrScheme name="Cutter Map"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F1F1F"/></a:dk2><a:lt2><a:srgbClr val="EEEEEE"/></a:lt2><a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme><a:fontScheme name="Cutter Map"><a:majorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Cutter Map"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="28575"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

const EMPTY_TREE: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

fn emu(pt: f64) -> i64 {
    (pt * EMU_PER_PT).round() as i64
}

fn hex(c: Rgb) -> String {
    c.to_hex().trim_start_matches('#').to_string()
}

fn solid_fill(c: Rgb) -> String {
    format!(r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, hex(c))
}

/// Builds slide XML shape by shape.
struct SlideWriter<'a> {
    xml: String,
    next_id: u32,
    line_width: i64,
    metrics: &'a FontInfo,
    /// Deck media number per icon payload.
    media: &'a HashMap<String, usize>,
    /// Media numbers this slide links, in relationship order after the
    /// layout.
    linked: Vec<usize>,
}

impl SlideWriter<'_> {
    fn shape_start(&mut self, name: &str, text_box: bool) {
        self.next_id += 1;
        let id = self.next_id;
        let _ = write!(
            self.xml,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name} {id}"/><p:cNvSpPr{}/><p:nvPr/></p:nvSpPr>"#,
            if text_box { r#" txBox="1""# } else { "" }
        );
    }

    fn xfrm(&mut self, x: f64, y: f64, w: f64, h: f64, geometry: &str) {
        let _ = write!(
            self.xml,
            r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="{geometry}"><a:avLst/></a:prstGeom>"#,
            emu(x),
            emu(y),
            emu(w.max(0.0)),
            emu(h.max(0.0))
        );
    }

    fn line(&mut self, stroke: Option<Rgb>) {
        match stroke {
            Some(c) => {
                let _ = write!(self.xml, r#"<a:ln w="{}">{}</a:ln>"#, self.line_width, solid_fill(c));
            }
            None => self.xml.push_str("<a:ln><a:noFill/></a:ln>"),
        }
    }

    fn item(&mut self, item: &DrawItem) {
        match item {
            DrawItem::Circle {
                cx,
                cy,
                r,
                fill,
                stroke,
            } => {
                self.shape_start("Cutter", false);
                self.xml.push_str("<p:spPr>");
                self.xfrm(cx - r, cy - r, 2.0 * r, 2.0 * r, "ellipse");
                self.xml.push_str(&solid_fill(*fill));
                self.line(Some(*stroke));
                self.xml.push_str("</p:spPr></p:sp>");
            }
            DrawItem::Rect { bbox, fill, stroke } => {
                self.shape_start("Rectangle", false);
                self.xml.push_str("<p:spPr>");
                self.rect(bbox);
                match fill {
                    Some(c) => self.xml.push_str(&solid_fill(*c)),
                    None => self.xml.push_str("<a:noFill/>"),
                }
                self.line(*stroke);
                self.xml.push_str("</p:spPr></p:sp>");
            }
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
                let w = width.max(text_width(self.metrics, text, *size));
                self.shape_start("Text", true);
                self.xml.push_str("<p:spPr>");
                self.xfrm(*x, *top, w, size * 1.2, "rect");
                self.xml.push_str("<a:noFill/></p:spPr>");
                self.xml.push_str(
                    r#"<p:txBody><a:bodyPr wrap="none" lIns="0" tIns="0" rIns="0" bIns="0"/><a:lstStyle/><a:p>"#,
                );
                if *align == Align::Center {
                    self.xml.push_str(r#"<a:pPr algn="ctr"/>"#);
                }
                let _ = write!(
                    self.xml,
                    r#"<a:r><a:rPr lang="en-US" sz="{}"{}>{}<a:latin typeface="Arial"/></a:rPr><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
                    (size * 100.0).round() as i64,
                    if *bold { r#" b="1""# } else { "" },
                    solid_fill(*color),
                    escape(text.as_str())
                );
            }
            DrawItem::Image { bbox, icon } => self.picture(bbox, &icon.png_base64),
        }
    }

    fn rect(&mut self, bbox: &BBox) {
        self.xfrm(bbox.x0, bbox.top, bbox.width(), bbox.height(), "rect");
    }

    fn picture(&mut self, bbox: &BBox, payload: &str) {
        let Some(&n) = self.media.get(payload) else {
            return;
        };
        let slot = match self.linked.iter().position(|&m| m == n) {
            Some(slot) => slot,
            None => {
                self.linked.push(n);
                self.linked.len() - 1
            }
        };
        self.next_id += 1;
        let id = self.next_id;
        let _ = write!(
            self.xml,
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>"#,
            slot + 2
        );
        self.rect(bbox);
        self.xml.push_str("</p:spPr></p:pic>");
    }
}

/// Slide XML plus the media numbers it links, in relationship order.
fn slide_xml(
    sheet: &Sheet,
    line_width: f64,
    metrics: &FontInfo,
    media: &HashMap<String, usize>,
) -> (String, Vec<usize>) {
    let mut writer = SlideWriter {
        xml: String::new(),
        next_id: 1,
        line_width: emu(line_width),
        metrics,
        media,
        linked: Vec::new(),
    };
    for item in &sheet.items {
        writer.item(item);
    }
    let xml = format!(
        "{XML_DECL}<p:sld {NS}><p:cSld><p:spTree>{EMPTY_TREE}{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>",
        writer.xml
    );
    (xml, writer.linked)
}

/// Decoded PNG bytes for every distinct icon, numbered from 1 in order of
/// first use.
fn collect_media(sheets: &[Sheet]) -> (HashMap<String, usize>, Vec<Vec<u8>>) {
    let mut numbers = HashMap::new();
    let mut files = Vec::new();
    for (_, icon) in sheets.iter().flat_map(Sheet::images) {
        if numbers.contains_key(&icon.png_base64) {
            continue;
        }
        match STANDARD.decode(icon.png_base64.as_bytes()) {
            Ok(png) => {
                files.push(png);
                numbers.insert(icon.png_base64.clone(), files.len());
            }
            Err(err) => warn!(%err, "icon left out of the deck"),
        }
    }
    (numbers, files)
}

fn relationships(rels: &[(usize, &str, &str)]) -> String {
    let mut xml = format!(
        "{XML_DECL}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">"
    );
    for (id, kind, target) in rels {
        let _ = write!(xml, r#"<Relationship Id="rId{id}" Type="{kind}" Target="{target}"/>"#);
    }
    xml.push_str("</Relationships>");
    xml
}

fn content_types(slides: usize) -> String {
    let mut xml = format!(
        "{XML_DECL}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Default Extension=\"png\" ContentType=\"image/png\"/>\
<Override PartName=\"/ppt/presentation.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml\"/>\
<Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml\"/>\
<Override PartName=\"/ppt/slideLayouts/slideLayout1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml\"/>\
<Override PartName=\"/ppt/theme/theme1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.theme+xml\"/>\
<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>"
    );
    for n in 1..=slides {
        let _ = write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn presentation(slides: usize, width: f64, height: f64) -> String {
    let ids: String = (1..=slides)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
        .collect();
    format!(
        "{XML_DECL}<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx=\"{}\" cy=\"{}\"/><p:notesSz cx=\"6858000\" cy=\"9144000\"/></p:presentation>",
        emu(width),
        emu(height)
    )
}

fn core_properties(title: &str) -> String {
    format!(
        "{XML_DECL}<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><dc:title>{}</dc:title><dc:creator>cuttermap-rs</dc:creator></cp:coreProperties>",
        escape(title)
    )
}

fn master() -> String {
    format!(
        "{XML_DECL}<p:sldMaster {NS}><p:cSld><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/><p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst></p:sldMaster>"
    )
}

fn layout() -> String {
    format!(
        "{XML_DECL}<p:sldLayout {NS} type=\"blank\" preserve=\"1\"><p:cSld name=\"Blank\"><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"
    )
}

/// Package already composed sheets as a PPTX deck.
///
/// # Errors
///
/// Fails only when the archive cannot be written.
pub fn write_pptx(title: &str, sheets: &[Sheet], geometry: &Geometry) -> Result<Vec<u8>, CutterMapError> {
    let (width, height) = sheets
        .first()
        .map_or((960.0, 540.0), |s| (s.width, s.height));
    let metrics = FontInfo::standard("Helvetica");
    let line_width = 0.75 * geometry.scale;

    let document_rel = format!("{REL}/officeDocument");
    let slide_rel = format!("{REL}/slide");
    let master_rel = format!("{REL}/slideMaster");
    let layout_rel = format!("{REL}/slideLayout");
    let theme_rel = format!("{REL}/theme");
    let core_rel = "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

    let slide_targets: Vec<String> = (1..=sheets.len())
        .map(|n| format!("slides/slide{n}.xml"))
        .collect();
    let mut presentation_rels = vec![(1, master_rel.as_str(), "slideMasters/slideMaster1.xml")];
    for (i, target) in slide_targets.iter().enumerate() {
        presentation_rels.push((i + 2, slide_rel.as_str(), target.as_str()));
    }
    presentation_rels.push((sheets.len() + 2, theme_rel.as_str(), "theme/theme1.xml"));
    let image_rel = format!("{REL}/image");
    let (media, media_files) = collect_media(sheets);

    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".to_string(), content_types(sheets.len())),
        (
            "_rels/.rels".to_string(),
            relationships(&[
                (1, document_rel.as_str(), "ppt/presentation.xml"),
                (2, core_rel, "docProps/core.xml"),
            ]),
        ),
        ("docProps/core.xml".to_string(), core_properties(title)),
        ("ppt/presentation.xml".to_string(), presentation(sheets.len(), width, height)),
        ("ppt/_rels/presentation.xml.rels".to_string(), relationships(&presentation_rels)),
        ("ppt/slideMasters/slideMaster1.xml".to_string(), master()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(),
            relationships(&[
                (1, layout_rel.as_str(), "../slideLayouts/slideLayout1.xml"),
                (2, theme_rel.as_str(), "../theme/theme1.xml"),
            ]),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".to_string(), layout()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".to_string(),
            relationships(&[(1, master_rel.as_str(), "../slideMasters/slideMaster1.xml")]),
        ),
        ("ppt/theme/theme1.xml".to_string(), format!("{XML_DECL}{THEME}")),
    ];
    for (i, sheet) in sheets.iter().enumerate() {
        let n = i + 1;
        let (xml, linked) = slide_xml(sheet, line_width, &metrics, &media);
        let targets: Vec<String> = linked.iter().map(|m| format!("../media/image{m}.png")).collect();
        let mut rels = vec![(1, layout_rel.as_str(), "../slideLayouts/slideLayout1.xml")];
        for (k, target) in targets.iter().enumerate() {
            rels.push((k + 2, image_rel.as_str(), target.as_str()));
        }
        parts.push((format!("ppt/slides/slide{n}.xml"), xml));
        parts.push((format!("ppt/slides/_rels/slide{n}.xml.rels"), relationships(&rels)));
    }

    let archive_error = |e: zip::result::ZipError| CutterMapError::RenderError(format!("failed to write PPTX: {e}"));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, xml) in &parts {
        zip.start_file(name.as_str(), options).map_err(archive_error)?;
        zip.write_all(xml.as_bytes())?;
    }
    for (i, png) in media_files.iter().enumerate() {
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file(format!("ppt/media/image{}.png", i + 1), stored)
            .map_err(archive_error)?;
        zip.write_all(png)?;
    }
    let bytes = zip.finish().map_err(archive_error)?.into_inner();
    info!(slides = sheets.len(), bytes = bytes.len(), "wrote slide deck");
    Ok(bytes)
}

/// Regenerate `result` as a PPTX deck, one or more slides per page of
/// content.
///
/// # Errors
///
/// Fails only when the archive cannot be written.
pub fn render_pptx(
    result: &ExtractionResult,
    render: &RenderOptions,
    slides: &SlideOptions,
) -> Result<Vec<u8>, CutterMapError> {
    let geometry = Geometry::for_blades(&result.blades, render);
    let sheets = compose(result, &geometry, slides.width, slides.height);
    write_pptx(&HtmlRenderer::title(result), &sheets, &geometry)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use cuttermap_core::ReferenceMetrics;
    use quick_xml::Reader;
    use quick_xml::events::Event;
    use zip::ZipArchive;

    use super::*;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut xml = String::new();
        file.read_to_string(&mut xml).unwrap();
        xml
    }

    fn assert_well_formed(xml: &str) {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => panic!("malformed XML: {e}\n{xml}"),
            }
        }
    }

    fn geometry() -> Geometry {
        Geometry::new(1.0, &ReferenceMetrics::default())
    }

    fn sheet(items: Vec<DrawItem>) -> Sheet {
        Sheet {
            width: 960.0,
            height: 540.0,
            items,
        }
    }

    #[test]
    fn deck_has_one_slide_per_sheet() {
        let sheets = vec![sheet(Vec::new()), sheet(Vec::new())];
        let bytes = write_pptx("Cutter Map", &sheets, &geometry()).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"ppt/slides/slide1.xml"));
        assert!(names.contains(&"ppt/slides/slide2.xml"));
        assert!(!names.contains(&"ppt/slides/slide3.xml"));
        for name in names.iter().filter(|n| n.ends_with(".xml") || n.ends_with(".rels")) {
            assert_well_formed(&read_part(&bytes, name));
        }
        let presentation = read_part(&bytes, "ppt/presentation.xml");
        assert!(presentation.contains(r#"<p:sldSz cx="12192000" cy="6858000"/>"#));
    }

    #[test]
    fn cutters_become_ellipses() {
        let bytes = write_pptx(
            "Cutter Map",
            &[sheet(vec![DrawItem::Circle {
                cx: 50.0,
                cy: 60.0,
                r: 10.0,
                fill: Rgb::new(0xE5, 0x39, 0x35),
                stroke: Rgb::BLACK,
            }])],
            &geometry(),
        )
        .unwrap();
        let slide = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide.contains(r#"prst="ellipse""#));
        assert!(slide.contains(r#"<a:off x="508000" y="635000"/>"#));
        assert!(slide.contains(r#"<a:ext cx="254000" cy="254000"/>"#));
        assert!(slide.contains(r#"val="E53935""#));
    }

    #[test]
    fn text_is_escaped_and_sized() {
        let bytes = write_pptx(
            "SN <1>",
            &[sheet(vec![DrawItem::Text {
                x: 10.0,
                top: 10.0,
                width: 20.0,
                size: 9.0,
                text: "A&B".into(),
                bold: true,
                align: Align::Center,
                color: Rgb::BLACK,
            }])],
            &geometry(),
        )
        .unwrap();
        let slide = read_part(&bytes, "ppt/slides/slide1.xml");
        assert_well_formed(&slide);
        assert!(slide.contains("<a:t>A&amp;B</a:t>"));
        assert!(slide.contains(r#"sz="900" b="1""#));
        assert!(slide.contains(r#"algn="ctr""#));
        assert!(read_part(&bytes, "docProps/core.xml").contains("SN &lt;1&gt;"));
    }

    fn text_box_extent(text: &str) -> String {
        let bytes = write_pptx(
            "Cutter Map",
            &[sheet(vec![DrawItem::Text {
                x: 0.0,
                top: 0.0,
                width: 0.0,
                size: 10.0,
                text: text.into(),
                bold: false,
                align: Align::Left,
                color: Rgb::BLACK,
            }])],
            &geometry(),
        )
        .unwrap();
        let slide = read_part(&bytes, "ppt/slides/slide1.xml");
        let start = slide.find("<a:ext ").unwrap();
        let end = start + slide[start..].find("/>").unwrap();
        slide[start..end].to_string()
    }

    #[test]
    fn accented_text_measures_one_glyph_per_character() {
        assert_eq!(text_box_extent("éé"), text_box_extent("ee"));
        // Two Helvetica glyphs of 556 at 10pt.
        assert!(text_box_extent("ee").contains(r#"cx="141224""#));
    }

    #[test]
    fn icons_become_pictures_with_shared_media() {
        let img = image::RgbImage::from_pixel(3, 3, image::Rgb([0, 120, 0]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let icon = cuttermap_core::Icon {
            png_base64: STANDARD.encode(&png),
            width: 3,
            height: 3,
        };
        let picture = |x0: f64| DrawItem::Image {
            bbox: BBox::new(x0, 20.0, x0 + 30.0, 50.0),
            icon: icon.clone(),
        };
        let sheets = vec![sheet(vec![picture(10.0), picture(60.0)]), sheet(vec![picture(10.0)])];
        let bytes = write_pptx("Cutter Map", &sheets, &geometry()).unwrap();

        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let media: Vec<&str> = archive.file_names().filter(|n| n.starts_with("ppt/media/")).collect();
        assert_eq!(media, vec!["ppt/media/image1.png"]);
        let mut stored = Vec::new();
        ZipArchive::new(Cursor::new(bytes.as_slice()))
            .unwrap()
            .by_name("ppt/media/image1.png")
            .unwrap()
            .read_to_end(&mut stored)
            .unwrap();
        assert_eq!(stored, png);

        let slide = read_part(&bytes, "ppt/slides/slide1.xml");
        assert_well_formed(&slide);
        assert_eq!(slide.matches("<p:pic>").count(), 2);
        assert_eq!(slide.matches(r#"r:embed="rId2""#).count(), 2);
        assert!(slide.contains(r#"<a:off x="127000" y="254000"/><a:ext cx="381000" cy="381000"/>"#));
        let rels = read_part(&bytes, "ppt/slides/_rels/slide2.xml.rels");
        assert!(rels.contains(r#"Id="rId2""#));
        assert!(rels.contains(r#"Target="../media/image1.png""#));
        assert!(read_part(&bytes, "[Content_Types].xml").contains(r#"Extension="png""#));
    }

    #[test]
    fn extracted_drill_bit_reaches_the_deck() {
        let img = image::RgbImage::from_pixel(4, 2, image::Rgb([90, 90, 90]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let result = ExtractionResult {
            drill_bit_image: Some(cuttermap_core::Icon {
                png_base64: STANDARD.encode(&png),
                width: 4,
                height: 2,
            }),
            ..Default::default()
        };
        let bytes = render_pptx(&result, &RenderOptions::default(), &SlideOptions::default()).unwrap();
        let slide = read_part(&bytes, "ppt/slides/slide1.xml");
        assert_eq!(slide.matches("<p:pic>").count(), 1);
    }

    #[test]
    fn empty_result_still_renders_a_title_slide() {
        let bytes = render_pptx(
            &ExtractionResult::default(),
            &RenderOptions::default(),
            &SlideOptions::default(),
        )
        .unwrap();
        let slide = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide.contains("<a:t>Cutter Map</a:t>"));
    }
}
