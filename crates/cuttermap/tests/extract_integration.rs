//! End-to-end extraction over synthetic cutter-map PDFs.

mod common;

use common::{
    STANDARD_BOM, STANDARD_CELLS, blade_block, bom_block, build_pdf, header_block, icon,
    standard_content, standard_pdf,
};
use cuttermap::cuttermap_core::validation::{CL_ONLY, COUNT_MISMATCH};
use cuttermap::cuttermap_core::{FillSource, Position, RowId};
use cuttermap::{ExtractOptions, decode_page, extract, to_json};

fn run(bytes: &[u8]) -> cuttermap::ExtractionResult {
    extract(bytes, &ExtractOptions::default()).unwrap()
}

#[test]
fn matching_bom_and_layout_validate_clean() {
    let result = run(&standard_pdf());
    let indices: Vec<u32> = result.summary.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(result.summary[0].cutter_type, "CT9");
    assert_eq!(result.summary[0].chamfer, "16C-45");
    assert_eq!(result.summary[1].count, 2);
    assert_eq!(result.summary[2].material_number, "3456789");

    assert_eq!(result.blades.len(), 1);
    assert_eq!(result.blades[0].name, "B1");
    assert_eq!(result.cell_count(), STANDARD_CELLS.len());

    assert!(result.validation.is_valid, "{:?}", result.validation.issues);
    assert!(result.validation.bom_only.is_empty());
    assert!(result.validation.cl_only.is_empty());
}

#[test]
fn cells_carry_bom_attributes() {
    let result = run(&standard_pdf());
    let blade = &result.blades[0];
    let cone = &blade.rows[&RowId::R1][&Position::Cone];
    assert_eq!(cone.iter().map(|c| c.group).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(cone[1].cutter_type, "CT13");
    let gauge = &blade.rows[&RowId::R2][&Position::Gauge];
    assert_eq!(gauge[0].group, 1);
}

#[test]
fn header_fields_round_trip() {
    let h = run(&standard_pdf()).header;
    assert_eq!(h.serial_number, "1234");
    assert_eq!(h.material_number, "7654321");
    assert_eq!(h.creation_date, "01/02/2024");
    assert_eq!(h.revision_level, "D - 390254");
    assert_eq!(h.software_version, "1.0.2345.1");
}

#[test]
fn extraction_is_idempotent() {
    let bytes = standard_pdf();
    let first = to_json(&run(&bytes)).unwrap();
    let second = to_json(&run(&bytes)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn swatches_color_the_bom() {
    let result = run(&standard_pdf());
    assert_eq!(result.extraction_stats.fill_source, FillSource::Sampled);
    assert_eq!(result.summary[0].fill_color.as_deref(), Some("#FF0000"));
    assert_eq!(result.summary[2].fill_color.as_deref(), Some("#0000FF"));
}

#[test]
fn count_mismatch_is_reported_once() {
    let mut bom = STANDARD_BOM;
    bom[0].4 = 5;
    let mut cells = STANDARD_CELLS.to_vec();
    cells.push((250.0, 140.0, "1"));
    let content = format!("{}{}{}", header_block(), bom_block(&bom), blade_block(&cells));
    let result = run(&build_pdf(&content));

    let mismatches: Vec<_> = result.validation.with_code(COUNT_MISMATCH).collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].index, Some(1));
    let check = &result.validation.counts[&1];
    assert_eq!((check.expected, check.placed), (5, 4));
    assert!(!result.validation.is_valid);
}

#[test]
fn unknown_group_is_layout_only() {
    let mut cells = STANDARD_CELLS.to_vec();
    cells.push((250.0, 220.0, "9"));
    let content = format!(
        "{}{}{}",
        header_block(),
        bom_block(&STANDARD_BOM),
        blade_block(&cells)
    );
    let result = run(&build_pdf(&content));
    assert_eq!(result.validation.cl_only, vec![9]);
    assert_eq!(result.validation.with_code(CL_ONLY).count(), 1);
    assert!(!result.validation.is_valid);
}

#[test]
fn repeated_image_is_decoded_once() {
    // The same XObject over the first `1` and the first `2` of row R1.
    let content = format!(
        "{}{}{}",
        standard_content(),
        icon(103.0, 215.0, 20.0),
        icon(123.0, 215.0, 20.0)
    );
    let result = run(&build_pdf(&content));
    let stats = &result.extraction_stats;
    assert_eq!(stats.images, 2);
    assert_eq!(stats.unique_images, 1);
    assert_eq!(stats.decoded_icons, 1);
    assert_eq!(result.cutter_shapes.len(), 2);
    assert_eq!(result.cutter_shapes[&1], result.cutter_shapes[&2]);
    assert_eq!(result.cutter_shapes[&1].width, 2);
}

#[test]
fn stats_and_page_are_reported() {
    let result = run(&standard_pdf());
    assert_eq!(result.page.width, 612.0);
    assert_eq!(result.page.height, 792.0);
    assert_eq!(result.extraction_stats.bom_rows, 3);
    assert_eq!(result.extraction_stats.blades, 1);
    assert_eq!(result.extraction_stats.cells, 6);
    assert!(result.extraction_stats.warnings.is_empty());
    assert!(result.raw_text.contains("SN 1234"));
}

#[test]
fn words_are_decoded_top_left() {
    let decoded = decode_page(&standard_pdf(), &ExtractOptions::default().decode).unwrap();
    let b1 = decoded
        .content
        .words
        .iter()
        .find(|w| w.text == "B1")
        .unwrap();
    assert!((b1.bbox.top - 220.0).abs() < 0.01);
    assert!((b1.bbox.x0 - 20.0).abs() < 0.01);
}

#[test]
fn page_without_a_map_yields_empty_result() {
    let result = run(&build_pdf(&common::text(50.0, 300.0, "Hello")));
    assert!(result.header.is_empty());
    assert!(result.summary.is_empty());
    assert!(result.blades.is_empty());
    assert!(result.validation.is_valid);
}

#[test]
fn json_has_the_documented_shape() {
    let json: serde_json::Value = serde_json::from_str(&to_json(&run(&standard_pdf())).unwrap()).unwrap();
    for key in [
        "header",
        "summary",
        "groups",
        "has_group_legend",
        "group_format",
        "group_rows",
        "blades",
        "images",
        "cutter_shapes",
        "drill_bit_image",
        "validation",
        "raw_text",
        "extraction_stats",
        "page",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
}
