//! Backend-neutral drawing plan for regenerated cutter maps.
//!
//! [`compose`] lays out the header, the BOM, the group legend and every
//! blade as positioned primitives on fixed-size sheets. The HTML, PDF and slide writers only
//! translate these primitives, so every output shares one geometry.

use std::collections::BTreeMap;

use crate::blade::{Blade, BladeRow, CutterCell, Position, RowId};
use crate::color::Rgb;
use crate::geometry::BBox;
use crate::model::{ExtractionResult, Icon};
use crate::palette::palette_color;
use crate::scale::Geometry;

const CELL_TEXT: Rgb = Rgb::BLACK;
const MUTED: Rgb = Rgb::new(0x55, 0x55, 0x55);
const UNKNOWN_FILL: Rgb = Rgb::new(0xBD, 0xBD, 0xBD);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// One drawing primitive. Coordinates are points, top-left origin.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    /// Text whose box starts at `(x, top)`; centered text is centered in
    /// `width`.
    Text {
        x: f64,
        top: f64,
        width: f64,
        size: f64,
        text: String,
        bold: bool,
        align: Align,
        color: Rgb,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: Rgb,
        stroke: Rgb,
    },
    Rect {
        bbox: BBox,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
    /// A PNG icon stretched over `bbox`.
    Image { bbox: BBox, icon: Icon },
}

/// One output page or slide.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub width: f64,
    pub height: f64,
    pub items: Vec<DrawItem>,
}

impl Sheet {
    fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            items: Vec::new(),
        }
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|i| match i {
            DrawItem::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn circles(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, DrawItem::Circle { .. }))
            .count()
    }

    pub fn images(&self) -> impl Iterator<Item = (&BBox, &Icon)> {
        self.items.iter().filter_map(|i| match i {
            DrawItem::Image { bbox, icon } => Some((bbox, icon)),
            _ => None,
        })
    }
}

struct Composer<'a> {
    g: &'a Geometry,
    width: f64,
    height: f64,
    sheets: Vec<Sheet>,
    cursor: f64,
}

impl Composer<'_> {
    fn current(&mut self) -> &mut Sheet {
        if self.sheets.is_empty() {
            self.sheets.push(Sheet::new(self.width, self.height));
        }
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    fn bottom_limit(&self) -> f64 {
        self.height - self.g.margin
    }

    /// Start a new sheet unless `needed` still fits on the current one.
    /// An empty sheet always accepts content, however tall.
    fn reserve(&mut self, needed: f64) {
        let fresh = self.cursor <= self.g.margin;
        if !fresh && self.cursor + needed > self.bottom_limit() {
            self.sheets.push(Sheet::new(self.width, self.height));
            self.cursor = self.g.margin;
        }
    }

    fn image(&mut self, bbox: BBox, icon: &Icon) {
        self.current().items.push(DrawItem::Image {
            bbox,
            icon: icon.clone(),
        });
    }

    fn text(&mut self, x: f64, size: f64, text: impl Into<String>, bold: bool) {
        let top = self.cursor;
        self.current().items.push(DrawItem::Text {
            x,
            top,
            width: 0.0,
            size,
            text: text.into(),
            bold,
            align: Align::Left,
            color: CELL_TEXT,
        });
    }
}

fn group_colors(result: &ExtractionResult) -> BTreeMap<u32, Rgb> {
    result
        .summary
        .iter()
        .map(|row| {
            let color = row
                .fill_color
                .as_deref()
                .and_then(Rgb::from_hex)
                .unwrap_or_else(|| palette_color(row.index));
            (row.index, color)
        })
        .collect()
}

/// Largest box of `icon`'s aspect ratio inside `max_w` by `max_h`, anchored
/// at its top-right corner when `right` is set, top-left otherwise.
fn fit_icon(icon: &Icon, x: f64, top: f64, max_w: f64, max_h: f64, right: bool) -> BBox {
    let (w, h) = if icon.width == 0 || icon.height == 0 {
        (max_w, max_h)
    } else {
        let k = (max_w / f64::from(icon.width)).min(max_h / f64::from(icon.height));
        (f64::from(icon.width) * k, f64::from(icon.height) * k)
    };
    let x0 = if right { x - w } else { x };
    BBox::new(x0, top, x0 + w, top + h)
}

/// Lay the record out on sheets of the given size.
pub fn compose(result: &ExtractionResult, g: &Geometry, width: f64, height: f64) -> Vec<Sheet> {
    let mut c = Composer {
        g,
        width,
        height,
        sheets: Vec::new(),
        cursor: g.margin,
    };
    c.current();
    let art_bottom = compose_header(&mut c, result);
    compose_bom(&mut c, result);
    compose_legend(&mut c, result);
    // Blades start below the header pictures.
    if c.sheets.len() == 1 {
        c.cursor = c.cursor.max(art_bottom + g.blade_gap);
    }
    let colors = group_colors(result);
    for blade in &result.blades {
        compose_blade(&mut c, blade, &colors);
    }
    c.sheets
}

/// Draws the title block and the pictures at the top right, returning the
/// bottom of the pictures.
fn compose_header(c: &mut Composer<'_>, result: &ExtractionResult) -> f64 {
    let g = *c.g;
    let right = c.width - g.margin;
    let mut art_bottom = g.margin;
    if let Some(logo) = &result.images.logo {
        let bbox = fit_icon(logo, right, g.margin, g.title_size * 8.0, g.title_size * 2.0, true);
        art_bottom = bbox.bottom + g.position_gap;
        c.image(bbox, logo);
    }
    if let Some(bit) = result.drill_bit_image.as_ref().or(result.images.drill_bit.as_ref()) {
        let side = g.bom_row_height * 6.0;
        let bbox = fit_icon(bit, right, art_bottom, side, side, true);
        art_bottom = bbox.bottom;
        c.image(bbox, bit);
    }

    c.text(g.margin, g.title_size, "Cutter Map", true);
    c.cursor += g.title_size * 1.4;
    let h = &result.header;
    let fields = [
        ("SN", &h.serial_number),
        ("Material", &h.material_number),
        ("Created", &h.creation_date),
        ("Revision", &h.revision_level),
        ("Version", &h.software_version),
    ];
    let line = fields
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("   ");
    if !line.is_empty() {
        c.text(g.margin, g.font_size, line, false);
        c.cursor += g.font_size * 1.6;
    }
    c.cursor += g.blade_gap;
    art_bottom
}

fn compose_bom(c: &mut Composer<'_>, result: &ExtractionResult) {
    if result.summary.is_empty() {
        return;
    }
    let g = *c.g;
    let columns: [(&str, f64); 9] = [
        ("#", 0.0),
        ("", 1.6),
        ("", 3.0),
        ("Size", 4.6),
        ("Chamfer", 7.6),
        ("Type", 11.6),
        ("Count", 16.6),
        ("Material", 19.6),
        ("Family", 25.6),
    ];
    let col_x = |i: usize| g.margin + columns[i].1 * g.bom_row_height;

    c.reserve(g.bom_row_height * 2.0);
    for (i, (label, _)) in columns.iter().enumerate() {
        if !label.is_empty() {
            c.text(col_x(i), g.font_size, *label, true);
        }
    }
    let rule_y = c.cursor + g.font_size * 1.2;
    let right = c.width - g.margin;
    c.current().items.push(DrawItem::Rect {
        bbox: BBox::new(g.margin, rule_y, right, rule_y + 0.75 * g.scale),
        fill: Some(MUTED),
        stroke: None,
    });
    c.cursor += g.bom_row_height;

    let colors = group_colors(result);
    for row in &result.summary {
        c.reserve(g.bom_row_height);
        let fill = colors.get(&row.index).copied().unwrap_or(UNKNOWN_FILL);
        let r = g.font_size * 0.55;
        let cy = c.cursor + g.font_size / 2.0;
        let cx = col_x(1) + r;
        c.current().items.push(DrawItem::Circle {
            cx,
            cy,
            r,
            fill,
            stroke: Rgb::BLACK,
        });
        if let Some(shape) = result.cutter_shapes.get(&row.index) {
            let side = g.font_size * 1.2;
            let bbox = fit_icon(shape, col_x(2), cy - side / 2.0, side, side, false);
            c.image(bbox, shape);
        }
        let cells = [
            (0, row.index.to_string()),
            (3, row.size.clone()),
            (4, row.chamfer.clone()),
            (5, row.cutter_type.clone()),
            (6, row.count.to_string()),
            (7, row.material_number.clone()),
            (8, row.family_number.clone()),
        ];
        for (i, text) in cells {
            if !text.is_empty() {
                c.text(col_x(i), g.font_size, text, false);
            }
        }
        c.cursor += g.bom_row_height;
    }
    c.cursor += g.blade_gap;
}

fn join_groups(groups: &[u32]) -> String {
    groups
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The legend: each icon with the groups it marks, then legend rows that
/// have no icon as plain text.
fn compose_legend(c: &mut Composer<'_>, result: &ExtractionResult) {
    let icons = &result.images.group_icons;
    let mut plain: Vec<&[u32]> = result
        .group_rows
        .iter()
        .filter(|row| !icons.iter().any(|m| m.groups == row.groups))
        .map(|row| row.groups.as_slice())
        .collect();
    if icons.is_empty() && plain.is_empty() && !result.groups.is_empty() {
        plain.push(&result.groups);
    }
    if icons.is_empty() && plain.is_empty() {
        return;
    }
    let g = *c.g;
    c.reserve(g.bom_row_height * 2.0);
    c.text(g.margin, g.font_size, "Groups", true);
    c.cursor += g.bom_row_height;
    let side = g.font_size * 1.4;
    let text_x = g.margin + side + g.position_gap;
    for m in icons {
        c.reserve(g.bom_row_height);
        let top = c.cursor + (g.font_size - side) / 2.0;
        c.image(fit_icon(&m.icon, g.margin, top, side, side, false), &m.icon);
        c.text(text_x, g.font_size, join_groups(&m.groups), false);
        c.cursor += g.bom_row_height.max(side);
    }
    for groups in plain {
        c.reserve(g.bom_row_height);
        c.text(text_x, g.font_size, join_groups(groups), false);
        c.cursor += g.bom_row_height;
    }
    c.cursor += g.blade_gap;
}

/// One cell placed on a wrapped blade row.
struct Placed<'b> {
    line: usize,
    x: f64,
    position: Position,
    cell: &'b CutterCell,
}

/// Place a row's cells left to right, continuing on a new line whenever the
/// next cell would cross `right`.
fn place_row<'b>(row: &'b BladeRow, start: f64, right: f64, g: &Geometry) -> Vec<Placed<'b>> {
    let mut placed = Vec::new();
    let (mut line, mut x) = (0, start);
    for position in Position::ALL {
        let Some(cells) = row.get(&position) else {
            continue;
        };
        for cell in cells {
            if x > start && x + g.pitch > right {
                line += 1;
                x = start;
            }
            placed.push(Placed {
                line,
                x,
                position,
                cell,
            });
            x += g.pitch;
        }
        if !cells.is_empty() {
            x += g.position_gap;
        }
    }
    placed
}

fn row_lines(placed: &[Placed<'_>]) -> usize {
    placed.last().map_or(1, |p| p.line + 1)
}

fn blade_height(blade: &Blade, g: &Geometry, start: f64, right: f64) -> f64 {
    let lines: usize = blade
        .rows
        .values()
        .map(|row| row_lines(&place_row(row, start, right, g)))
        .sum();
    g.title_size * 1.4 + lines as f64 * g.row_height() + g.blade_gap
}

fn compose_blade(c: &mut Composer<'_>, blade: &Blade, colors: &BTreeMap<u32, Rgb>) {
    let g = *c.g;
    let start = g.margin + g.row_label_width;
    let right = c.width - g.margin;
    c.reserve(blade_height(blade, &g, start, right));
    c.text(g.margin, g.title_size, blade.name.clone(), true);
    c.cursor += g.title_size * 1.4;

    for row_id in RowId::ALL {
        let Some(row) = blade.rows.get(&row_id) else {
            continue;
        };
        let placed = place_row(row, start, right, &g);
        let row_top = c.cursor;
        let line_top = |line: usize| row_top + line as f64 * g.row_height();
        let r = g.cutter_diameter / 2.0;
        let label_top = line_top(0) + g.font_size + r - g.font_size / 2.0;
        let sheet = c.current();
        sheet.items.push(DrawItem::Text {
            x: g.margin,
            top: label_top,
            width: 0.0,
            size: g.font_size,
            text: row_id.as_str().to_string(),
            bold: true,
            align: Align::Left,
            color: CELL_TEXT,
        });

        // Each run of one position on one line gets its own caption.
        for run in placed.chunk_by(|a, b| a.line == b.line && a.position == b.position) {
            let first = &run[0];
            sheet.items.push(DrawItem::Text {
                x: first.x,
                top: line_top(first.line),
                width: run.len() as f64 * g.pitch,
                size: g.font_size * 0.8,
                text: first.position.as_str().to_string(),
                bold: false,
                align: Align::Center,
                color: MUTED,
            });
        }
        for p in &placed {
            let cx = p.x + g.pitch / 2.0;
            let cy = line_top(p.line) + g.font_size + r;
            let fill = colors.get(&p.cell.group).copied().unwrap_or(UNKNOWN_FILL);
            sheet.items.push(DrawItem::Circle {
                cx,
                cy,
                r,
                fill,
                stroke: Rgb::BLACK,
            });
            sheet.items.push(DrawItem::Text {
                x: cx - r,
                top: cy - g.font_size / 2.0,
                width: 2.0 * r,
                size: g.font_size,
                text: p.cell.group.to_string(),
                bold: true,
                align: Align::Center,
                color: CELL_TEXT,
            });
        }
        c.cursor = row_top + row_lines(&placed) as f64 * g.row_height();
    }
    c.cursor += g.blade_gap;
}
