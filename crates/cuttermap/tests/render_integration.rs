//! Regeneration from extracted data: PDF backends, HTML fallback and PPTX.

mod common;

use std::io::Cursor;

use common::{build_pdf, icon, standard_content, standard_pdf};
use cuttermap::{
    CutterMapDocument, DocumentStatus, ExtractOptions, ExtractionResult, NativeRenderer,
    PdfRenderer, RenderJob, RenderOptions, SlideOptions, decode_page, extract, render_pdf,
    render_pptx, render_with,
};

fn extracted() -> ExtractionResult {
    extract(&standard_pdf(), &ExtractOptions::default()).unwrap()
}

fn native_only() -> RenderOptions {
    RenderOptions {
        backends: vec!["native".to_string()],
        ..Default::default()
    }
}

#[test]
fn no_backend_yields_html() {
    let options = RenderOptions {
        backends: Vec::new(),
        ..Default::default()
    };
    let file = render_pdf(&extracted(), &options).unwrap();
    assert_eq!(file.file_type, "html");
    assert_eq!(file.backend, "html");
    let html = String::from_utf8(file.bytes).unwrap();
    assert!(html.contains("Cutter Map 1234"));
    assert!(html.contains("B1"));
}

#[test]
fn native_backend_output_decodes_back() {
    let file = render_pdf(&extracted(), &native_only()).unwrap();
    assert_eq!(file.backend, "native");
    assert_eq!(file.file_type, "pdf");

    let decoded = decode_page(&file.bytes, &ExtractOptions::default().decode).unwrap();
    assert_eq!(decoded.content.size.width, 792.0);
    assert_eq!(decoded.content.size.height, 612.0);
    let words: Vec<&str> = decoded.content.words.iter().map(|w| w.text.as_str()).collect();
    for expected in ["Cutter", "1234", "7654321", "B1", "R1", "R2", "CONE", "GAUGE", "CT9"] {
        assert!(words.contains(&expected), "missing {expected} in {words:?}");
    }
    // One filled circle per BOM row and per cell.
    assert!(decoded.warnings.is_empty());
}

#[test]
fn cutter_shapes_survive_regeneration() {
    let content = format!(
        "{}{}{}",
        standard_content(),
        icon(103.0, 215.0, 20.0),
        icon(123.0, 215.0, 20.0)
    );
    let result = extract(&build_pdf(&content), &ExtractOptions::default()).unwrap();
    assert_eq!(result.cutter_shapes.len(), 2);

    let file = render_pdf(&result, &native_only()).unwrap();
    let decoded = decode_page(&file.bytes, &ExtractOptions::default().decode).unwrap();
    // Both BOM rows share one shape, embedded once and drawn twice.
    assert_eq!(decoded.content.images.len(), 1);
    assert_eq!(decoded.content.images[0].placements.len(), 2);
    assert_eq!(decoded.content.images[0].width, 2);

    let bytes = render_pptx(&result, &RenderOptions::default(), &SlideOptions::default()).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert!(archive.by_name("ppt/media/image1.png").is_ok());
    let mut slide = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("ppt/slides/slide1.xml").unwrap(), &mut slide)
        .unwrap();
    assert_eq!(slide.matches("<p:pic>").count(), 2);
}

#[test]
fn unavailable_chromium_falls_back_to_native() {
    let options = RenderOptions {
        backends: vec!["chromium".to_string(), "native".to_string()],
        chromium: Some("/nonexistent/cuttermap-browser".to_string()),
        ..Default::default()
    };
    let file = render_pdf(&extracted(), &options).unwrap();
    assert_eq!(file.backend, "native");
}

#[test]
fn edited_summary_is_what_gets_drawn() {
    let mut result = extracted();
    result.summary[0].cutter_type = "CT42".to_string();
    let job = RenderJob::new(&result, &native_only());
    let renderers: Vec<Box<dyn PdfRenderer>> = vec![Box::new(NativeRenderer)];
    let file = render_with(&renderers, &job).unwrap();
    let decoded = decode_page(&file.bytes, &ExtractOptions::default().decode).unwrap();
    assert!(decoded.content.words.iter().any(|w| w.text == "CT42"));
    assert!(!decoded.content.words.iter().any(|w| w.text == "CT9"));
}

#[test]
fn slide_deck_is_a_valid_package() {
    let bytes = render_pptx(&extracted(), &RenderOptions::default(), &SlideOptions::default()).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert!(archive.by_name("[Content_Types].xml").is_ok());
    assert!(archive.by_name("ppt/presentation.xml").is_ok());
    let mut slide = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("ppt/slides/slide1.xml").unwrap(), &mut slide)
        .unwrap();
    assert!(slide.contains(r#"prst="ellipse""#));
    assert!(slide.contains("<a:t>B1</a:t>"));
}

#[test]
fn tall_layouts_break_across_slides() {
    let mut result = extracted();
    let blade = result.blades[0].clone();
    for n in 2..=8 {
        let mut extra = blade.clone();
        extra.name = format!("B{n}");
        result.blades.push(extra);
    }
    let bytes = render_pptx(&result, &RenderOptions::default(), &SlideOptions::default()).unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let slides = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .count();
    assert!(slides > 1, "expected several slides, got {slides}");
}

#[test]
fn document_lifecycle() {
    let bytes = standard_pdf();
    let mut doc = CutterMapDocument::new(bytes.clone());
    doc.record_extraction(extract(doc.original(), &ExtractOptions::default()).unwrap());
    assert_eq!(doc.status, DocumentStatus::Extracted);

    let mut edited = doc.effective_data().unwrap().clone();
    edited.summary[0].count = 9;
    let report = &doc.apply_edit(edited).unwrap().validation;
    assert!(!report.is_valid);
    assert_eq!(doc.status, DocumentStatus::Edited);

    let file = render_pdf(doc.effective_data().unwrap(), &native_only()).unwrap();
    doc.record_generation(file).unwrap();
    doc.mark_synced();
    assert_eq!(doc.status, DocumentStatus::Synced);
    assert_eq!(doc.original(), bytes.as_slice());
    assert!(doc.extracted_data.as_ref().unwrap().validation.is_valid);
}
