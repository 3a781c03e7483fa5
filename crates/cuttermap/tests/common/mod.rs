//! Synthetic cutter-map PDFs built with lopdf.
//!
//! Positions are given top-left: `top` is the glyph box top of 10pt
//! Helvetica, which sits 7.8pt above the baseline.
#![allow(dead_code)]

use lopdf::{Document, Object, Stream, dictionary};

pub const PAGE_W: f64 = 612.0;
pub const PAGE_H: f64 = 792.0;
const SIZE: f64 = 10.0;
const ASCENT: f64 = 7.8;

/// One BOM line: index, size, chamfer, type, count, material.
pub type BomLine<'a> = (u32, &'a str, &'a str, &'a str, u32, &'a str);

/// A cell digit: row top, x, text.
pub type CellSpec<'a> = (f64, f64, &'a str);

pub fn text(x: f64, top: f64, s: &str) -> String {
    format!(
        "BT /F1 {SIZE} Tf {x} {} Td ({s}) Tj ET\n",
        PAGE_H - top - ASCENT
    )
}

/// A small filled square (8pt) whose top edge is at `top`.
pub fn swatch(x: f64, top: f64, rgb: (f64, f64, f64)) -> String {
    format!(
        "{} {} {} rg {x} {} 8 8 re f\n",
        rgb.0,
        rgb.1,
        rgb.2,
        PAGE_H - top - 8.0
    )
}

/// Paint `/Im1` as a `side` x `side` square at `(x, top)`.
pub fn icon(x: f64, top: f64, side: f64) -> String {
    format!(
        "q {side} 0 0 {side} {x} {} cm /Im1 Do Q\n",
        PAGE_H - top - side
    )
}

pub fn header_block() -> String {
    [
        text(10.0, 20.0, "SN 1234"),
        text(200.0, 20.0, "Mat Number: 7654321"),
        text(10.0, 32.0, "Date Created: 01/02/2024"),
        text(200.0, 32.0, "Revision Level: D - 390254"),
        text(10.0, 44.0, "Software Version: 1.0.2345.1"),
    ]
    .concat()
}

/// BOM header at top 100 and one line every 20pt below it, each with a
/// swatch in its own color.
pub fn bom_block(rows: &[BomLine<'_>]) -> String {
    let mut s = [
        text(60.0, 100.0, "SIZE"),
        text(120.0, 100.0, "CHAMFER"),
        text(180.0, 100.0, "TYPE"),
        text(240.0, 100.0, "COUNT"),
        text(300.0, 100.0, "MAT"),
    ]
    .concat();
    let colors = [(1.0, 0.0, 0.0), (0.0, 0.6, 0.0), (0.0, 0.0, 1.0), (1.0, 0.5, 0.0)];
    for (i, (index, size, chamfer, ty, count, mat)) in rows.iter().enumerate() {
        let top = 120.0 + 20.0 * i as f64;
        s.push_str(&swatch(40.0, top + 1.0, colors[i % colors.len()]));
        s.push_str(&text(20.0, top, &index.to_string()));
        s.push_str(&text(60.0, top, size));
        s.push_str(&text(120.0, top, chamfer));
        s.push_str(&text(180.0, top, ty));
        s.push_str(&text(240.0, top, &count.to_string()));
        s.push_str(&text(300.0, top, mat));
    }
    s
}

/// Blade `B1` with rows R1 (top 220) and R2 (top 250).
pub fn blade_block(cells: &[CellSpec<'_>]) -> String {
    let mut s = [
        text(100.0, 205.0, "CONE"),
        text(200.0, 205.0, "NOSE"),
        text(300.0, 205.0, "GAUGE"),
        text(20.0, 220.0, "B1"),
        text(50.0, 220.0, "R1"),
        text(50.0, 250.0, "R2"),
    ]
    .concat();
    for (top, x, digit) in cells {
        s.push_str(&text(*x, *top, digit));
    }
    s
}

pub const STANDARD_BOM: [BomLine<'static>; 3] = [
    (1, "1613", "16C-45", "CT9", 3, "1234567"),
    (2, "1308", "NA", "CT13", 2, "2345678"),
    (3, "1613", "U", "CR5", 1, "3456789"),
];

/// Group 1 three times, group 2 twice, group 3 once.
pub const STANDARD_CELLS: [CellSpec<'static>; 6] = [
    (220.0, 110.0, "1"),
    (220.0, 130.0, "2"),
    (220.0, 210.0, "3"),
    (220.0, 310.0, "1"),
    (250.0, 120.0, "2"),
    (250.0, 320.0, "1"),
];

pub fn standard_content() -> String {
    format!(
        "{}{}{}",
        header_block(),
        bom_block(&STANDARD_BOM),
        blade_block(&STANDARD_CELLS)
    )
}

/// A 2x2 RGB image, uncompressed.
fn icon_stream() -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
    )
}

/// A single-page PDF with Helvetica as `/F1` and the icon as `/Im1`.
pub fn build_pdf(content: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let image_id = doc.add_object(icon_stream());
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im1" => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1i64,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_W as i64),
                Object::Integer(PAGE_H as i64),
            ],
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

pub fn standard_pdf() -> Vec<u8> {
    build_pdf(&standard_content())
}
