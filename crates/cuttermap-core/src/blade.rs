//! Blade layout extraction.
//!
//! The cutter layout lists blades top to bottom. Each blade has a `B<n>`
//! marker, up to four row markers `R1`..`R4`, position labels and the group
//! digits that reference BOM indices. The page is cut into blade bands,
//! each band into row spans, and every digit is assigned to a position.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::anchor::{dominant_level, nearest_at_or_left};
use crate::bom::{BomRow, is_blade_marker};
use crate::classify::is_chamfer;
use crate::options::BladeOptions;
use crate::words::Word;

/// A radial position on the blade profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Position {
    Cone,
    Nose,
    Shoulder,
    Gauge,
    Pad,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::Cone,
        Position::Nose,
        Position::Shoulder,
        Position::Gauge,
        Position::Pad,
    ];

    /// Parse a position label, accepting text drawn reversed.
    pub fn from_label(text: &str) -> Option<Self> {
        match text.trim_end_matches(':').to_ascii_uppercase().as_str() {
            "CONE" | "ENOC" => Some(Position::Cone),
            "NOSE" | "ESON" => Some(Position::Nose),
            "SHOULDER" | "REDLUOHS" => Some(Position::Shoulder),
            "GAUGE" | "EGUAG" => Some(Position::Gauge),
            "PAD" | "DAP" => Some(Position::Pad),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Cone => "CONE",
            Position::Nose => "NOSE",
            Position::Shoulder => "SHOULDER",
            Position::Gauge => "GAUGE",
            Position::Pad => "PAD",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cutter row within a blade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RowId {
    R1,
    R2,
    R3,
    R4,
}

impl RowId {
    pub const ALL: [RowId; 4] = [RowId::R1, RowId::R2, RowId::R3, RowId::R4];

    /// Parse an exact row marker.
    pub fn from_marker(text: &str) -> Option<Self> {
        match text {
            "R1" => Some(RowId::R1),
            "R2" => Some(RowId::R2),
            "R3" => Some(RowId::R3),
            "R4" => Some(RowId::R4),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RowId::R1 => "R1",
            RowId::R2 => "R2",
            RowId::R3 => "R3",
            RowId::R4 => "R4",
        }
    }
}

/// One cutter seat on a blade.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CutterCell {
    pub cutter_type: String,
    /// The BOM index this seat references.
    pub group: u32,
    pub chamfer: String,
}

/// Cells of one row, by position.
pub type BladeRow = BTreeMap<Position, Vec<CutterCell>>;

/// One physical blade.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Blade {
    pub name: String,
    /// Rows with at least one cell; positions with at least one cell.
    pub rows: BTreeMap<RowId, BladeRow>,
}

impl Blade {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
        }
    }

    /// Every cell of the blade, row by row.
    pub fn cells(&self) -> impl Iterator<Item = &CutterCell> {
        self.rows.values().flat_map(|row| row.values().flatten())
    }

    /// Number of cells in one row.
    pub fn row_len(row: &BladeRow) -> usize {
        row.values().map(Vec::len).sum()
    }

    /// Largest cell count of any row.
    pub fn max_row_cells(&self) -> usize {
        self.rows.values().map(Self::row_len).max().unwrap_or(0)
    }

    /// Drop empty positions and rows.
    pub fn prune(&mut self) {
        for row in self.rows.values_mut() {
            row.retain(|_, cells| !cells.is_empty());
        }
        self.rows.retain(|_, row| !row.is_empty());
    }
}

struct Span {
    row: RowId,
    top: f64,
    bottom: f64,
}

/// Vertical ranges `[start, end)` of each blade.
fn blade_ranges(
    markers: &[&Word],
    row_markers: &[(RowId, &Word)],
    layout_top: f64,
    page_bottom: f64,
    options: &BladeOptions,
) -> Vec<(f64, f64)> {
    let mut cuts: Vec<f64> = Vec::with_capacity(markers.len() + 1);
    cuts.push(layout_top);
    for pair in markers.windows(2) {
        let (yi, yn) = (pair[0].center_y(), pair[1].center_y());
        let mid = (yi + yn) / 2.0;
        let mut between: Vec<&(RowId, &Word)> = row_markers
            .iter()
            .filter(|(_, w)| {
                w.center_y() >= yi - options.marker_tolerance
                    && w.center_y() < yn + options.marker_tolerance
            })
            .collect();
        between.sort_by(|a, b| a.1.center_y().total_cmp(&b.1.center_y()));
        let r1s: Vec<usize> = between
            .iter()
            .enumerate()
            .filter(|(_, (id, _))| *id == RowId::R1)
            .map(|(k, _)| k)
            .collect();
        // The next blade's R1 is the one that follows other markers of this
        // blade, or a lone R1 sitting nearer the next blade marker.
        let next_r1 = match r1s.as_slice() {
            [] => None,
            [k] if *k > 0 => Some(between[*k].1),
            [k] if between.len() == 1 => {
                let y = between[*k].1.center_y();
                ((y - yn).abs() < (y - yi).abs()).then_some(between[*k].1)
            }
            [_] => None,
            [.., last] => Some(between[*last].1),
        };
        let mut cut = mid;
        if let Some(r1) = next_r1 {
            let above = r1.bbox.top - options.boundary_margin;
            if above < mid {
                debug!(mid, cut = above, "blade boundary pulled above next R1");
                cut = above.max(yi);
            }
        }
        cuts.push(cut);
    }
    cuts.push(page_bottom);
    cuts.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Row spans inside one blade range.
fn row_spans(markers: &[(RowId, &Word)], start: f64, end: f64, options: &BladeOptions) -> Vec<Span> {
    let mut inside: Vec<(RowId, f64)> = Vec::new();
    for (id, w) in markers {
        let y = w.center_y();
        if y >= start && y < end && !inside.iter().any(|(seen, _)| seen == id) {
            inside.push((*id, y));
        }
    }
    inside.sort_by(|a, b| a.1.total_cmp(&b.1));
    if inside.is_empty() {
        return vec![Span {
            row: RowId::R1,
            top: start,
            bottom: end,
        }];
    }
    let n = inside.len();
    (0..n)
        .map(|k| {
            let (row, y) = inside[k];
            let top = if k == 0 {
                (y - options.row_lead).max(start)
            } else {
                (inside[k - 1].1 + y) / 2.0
            };
            let bottom = if k + 1 == n {
                (y + options.last_row_height).min(end)
            } else {
                (y + inside[k + 1].1) / 2.0
            };
            Span { row, top, bottom }
        })
        .collect()
}

fn bucket_position(x: f64, edges: &[f64]) -> Position {
    let idx = edges.iter().filter(|e| **e <= x).count();
    Position::ALL[idx.min(Position::ALL.len() - 1)]
}

struct BladeContext<'a> {
    words: Vec<&'a Word>,
    labels: Vec<(Position, f64)>,
    bom: &'a BTreeMap<u32, &'a BomRow>,
    options: &'a BladeOptions,
}

impl BladeContext<'_> {
    fn position_of(&self, digit: &Word, row_labels: &[(Position, f64)]) -> Position {
        let labels = if row_labels.is_empty() {
            self.labels.as_slice()
        } else {
            row_labels
        };
        if labels.is_empty() {
            return bucket_position(digit.center_x(), &self.options.bucket_edges);
        }
        nearest_at_or_left(labels.iter(), digit.center_x(), self.options.label_slack, |l| l.1)
            .or_else(|| labels.iter().min_by(|a, b| a.1.total_cmp(&b.1)))
            .map_or(Position::Cone, |l| l.0)
    }

    fn chamfer_below(&self, digit: &Word) -> Option<&str> {
        let (dx, dy) = (digit.center_x(), digit.center_y());
        self.words
            .iter()
            .filter(|w| {
                let below = w.center_y() - dy;
                below > 0.0
                    && below <= self.options.chamfer_window
                    && (w.center_x() - dx).abs() <= self.options.chamfer_x_tolerance
                    && is_chamfer(&w.text)
            })
            .min_by(|a, b| a.center_y().total_cmp(&b.center_y()))
            .map(|w| w.text.as_str())
    }

    fn fill_row(&self, span: &Span) -> BladeRow {
        let in_span: Vec<&Word> = self
            .words
            .iter()
            .copied()
            .filter(|w| w.center_y() >= span.top && w.center_y() < span.bottom)
            .collect();
        let row_labels: Vec<(Position, f64)> = in_span
            .iter()
            .filter_map(|w| Position::from_label(&w.text).map(|p| (p, w.bbox.x0)))
            .collect();
        let digits: Vec<(&Word, u32)> = in_span
            .iter()
            .filter(|w| w.text.len() <= 2)
            .filter_map(|w| w.as_int().map(|g| (*w, g)))
            .filter(|(_, g)| (1..=self.options.max_group).contains(g))
            .collect();
        let ys: Vec<f64> = digits.iter().map(|(w, _)| w.center_y()).collect();
        let Some(level) = dominant_level(&ys, self.options.digit_y_tolerance) else {
            return BladeRow::new();
        };

        let mut placed: Vec<(Position, f64, CutterCell)> = Vec::new();
        for (w, group) in digits {
            if (w.center_y() - level).abs() > self.options.digit_y_tolerance {
                continue;
            }
            let position = self.position_of(w, &row_labels);
            let bom = self.bom.get(&group);
            let chamfer = match self.chamfer_below(w) {
                Some(c) => c.to_string(),
                None => bom.map(|r| r.chamfer.clone()).unwrap_or_default(),
            };
            let cell = CutterCell {
                cutter_type: bom.map(|r| r.cutter_type.clone()).unwrap_or_default(),
                group,
                chamfer,
            };
            placed.push((position, w.center_x(), cell));
        }
        placed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let mut row = BladeRow::new();
        for (position, _, cell) in placed {
            row.entry(position).or_default().push(cell);
        }
        row
    }
}

/// Extract every blade below `layout_top`.
pub fn extract_blades(
    words: &[Word],
    layout_top: f64,
    page_bottom: f64,
    bom: &[BomRow],
    options: &BladeOptions,
) -> Vec<Blade> {
    let area: Vec<&Word> = words.iter().filter(|w| w.center_y() > layout_top).collect();
    let mut markers: Vec<&Word> = area
        .iter()
        .copied()
        .filter(|w| is_blade_marker(&w.text))
        .collect();
    markers.sort_by(|a, b| {
        a.center_y()
            .total_cmp(&b.center_y())
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    if markers.is_empty() {
        debug!("no blade markers found");
        return Vec::new();
    }
    let row_markers: Vec<(RowId, &Word)> = area
        .iter()
        .filter_map(|w| RowId::from_marker(&w.text).map(|id| (id, *w)))
        .collect();

    let bom_map: BTreeMap<u32, &BomRow> = bom.iter().map(|r| (r.index, r)).collect();
    let ranges = blade_ranges(&markers, &row_markers, layout_top, page_bottom, options);

    let mut blades = Vec::with_capacity(markers.len());
    for (marker, (start, end)) in markers.iter().zip(ranges) {
        let in_blade: Vec<&Word> = area
            .iter()
            .copied()
            .filter(|w| w.center_y() >= start && w.center_y() < end)
            .collect();
        let ctx = BladeContext {
            labels: in_blade
                .iter()
                .filter_map(|w| Position::from_label(&w.text).map(|p| (p, w.bbox.x0)))
                .collect(),
            words: in_blade,
            bom: &bom_map,
            options,
        };
        let mut blade = Blade::new(marker.text.clone());
        for span in row_spans(&row_markers, start, end, options) {
            let row = ctx.fill_row(&span);
            blade.rows.entry(span.row).or_default().extend(row);
        }
        blade.prune();
        debug!(blade = %blade.name, start, end, cells = blade.cells().count(), "blade extracted");
        blades.push(blade);
    }
    blades
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{LineSpec, words_for};

    fn bom() -> Vec<BomRow> {
        let row = |index: u32, t: &str, c: &str| BomRow {
            index,
            cutter_type: t.to_string(),
            chamfer: c.to_string(),
            ..Default::default()
        };
        vec![row(1, "CT9", "16C-45"), row(2, "CT13", "NA"), row(3, "CR5", "U")]
    }

    fn groups(blade: &Blade, row: RowId, pos: Position) -> Vec<u32> {
        blade.rows[&row][&pos].iter().map(|c| c.group).collect()
    }

    #[test]
    fn digits_follow_labels_and_bom() {
        let words = words_for(&[
            LineSpec::new(205.0, 100.0, "CONE"),
            LineSpec::new(205.0, 200.0, "NOSE"),
            LineSpec::new(205.0, 300.0, "GAUGE"),
            LineSpec::new(220.0, 20.0, "B1"),
            LineSpec::new(220.0, 50.0, "R1"),
            LineSpec::new(220.0, 110.0, "1"),
            LineSpec::new(220.0, 130.0, "2"),
            LineSpec::new(220.0, 210.0, "3"),
            LineSpec::new(220.0, 310.0, "1"),
            LineSpec::new(250.0, 50.0, "R2"),
            LineSpec::new(250.0, 120.0, "2"),
            LineSpec::new(250.0, 320.0, "4"),
        ]);
        let blades = extract_blades(&words, 200.0, 792.0, &bom(), &BladeOptions::default());
        assert_eq!(blades.len(), 1);
        let b = &blades[0];
        assert_eq!(b.name, "B1");
        assert_eq!(groups(b, RowId::R1, Position::Cone), vec![1, 2]);
        assert_eq!(groups(b, RowId::R1, Position::Nose), vec![3]);
        assert_eq!(groups(b, RowId::R1, Position::Gauge), vec![1]);
        assert_eq!(groups(b, RowId::R2, Position::Cone), vec![2]);
        assert_eq!(groups(b, RowId::R2, Position::Gauge), vec![4]);
        assert!(!b.rows[&RowId::R1].contains_key(&Position::Shoulder));

        let first = &b.rows[&RowId::R1][&Position::Cone][0];
        assert_eq!(first.cutter_type, "CT9");
        assert_eq!(first.chamfer, "16C-45");
        let unknown = &b.rows[&RowId::R2][&Position::Gauge][0];
        assert_eq!(unknown.cutter_type, "");
        assert_eq!(b.max_row_cells(), 4);
    }

    #[test]
    fn boundary_is_pulled_above_next_first_row() {
        let words = words_for(&[
            LineSpec::new(220.0, 20.0, "B1"),
            LineSpec::new(220.0, 50.0, "R1"),
            LineSpec::new(220.0, 110.0, "1"),
            LineSpec::new(250.0, 50.0, "R2"),
            LineSpec::new(250.0, 110.0, "2"),
            // B2's first row sits above the midpoint between the markers.
            LineSpec::new(300.0, 50.0, "R1"),
            LineSpec::new(300.0, 110.0, "3"),
            LineSpec::new(400.0, 20.0, "B2"),
        ]);
        let blades = extract_blades(&words, 200.0, 792.0, &bom(), &BladeOptions::default());
        assert_eq!(blades.len(), 2);
        assert_eq!(blades[0].cells().map(|c| c.group).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(groups(&blades[1], RowId::R1, Position::Cone), vec![3]);
    }

    #[test]
    fn no_row_markers_puts_everything_in_r1_with_buckets() {
        let words = words_for(&[
            LineSpec::new(220.0, 20.0, "B1"),
            LineSpec::new(240.0, 110.0, "1"),
            LineSpec::new(240.0, 320.0, "2"),
        ]);
        let blades = extract_blades(&words, 200.0, 792.0, &bom(), &BladeOptions::default());
        let b = &blades[0];
        assert_eq!(b.rows.len(), 1);
        assert_eq!(groups(b, RowId::R1, Position::Cone), vec![1]);
        assert_eq!(groups(b, RowId::R1, Position::Shoulder), vec![2]);
    }

    #[test]
    fn chamfer_below_digit_overrides_bom() {
        let words = words_for(&[
            LineSpec::new(220.0, 20.0, "B1"),
            LineSpec::new(220.0, 50.0, "R1"),
            LineSpec::new(220.0, 110.0, "1"),
            LineSpec::new(230.0, 104.0, "12C-3"),
        ]);
        let blades = extract_blades(&words, 200.0, 792.0, &bom(), &BladeOptions::default());
        let cell = &blades[0].rows[&RowId::R1][&Position::Cone][0];
        assert_eq!(cell.chamfer, "12C-3");
        assert_eq!(cell.cutter_type, "CT9");
    }

    #[test]
    fn reversed_labels_and_off_level_digits() {
        let words = words_for(&[
            LineSpec::new(220.0, 20.0, "B1"),
            LineSpec::new(220.0, 50.0, "R1"),
            LineSpec::new(220.0, 100.0, "ENOC"),
            LineSpec::new(220.0, 300.0, "DAP"),
            LineSpec::new(221.0, 130.0, "1"),
            LineSpec::new(221.0, 140.0, "2"),
            LineSpec::new(232.0, 160.0, "3"),
            LineSpec::new(221.0, 320.0, "2"),
        ]);
        let blades = extract_blades(&words, 200.0, 792.0, &bom(), &BladeOptions::default());
        let b = &blades[0];
        assert_eq!(groups(b, RowId::R1, Position::Cone), vec![1, 2]);
        assert_eq!(groups(b, RowId::R1, Position::Pad), vec![2]);
        assert_eq!(b.cells().count(), 3);
    }

    #[test]
    fn no_markers_no_blades() {
        let words = words_for(&[LineSpec::new(220.0, 110.0, "1")]);
        assert!(extract_blades(&words, 200.0, 792.0, &bom(), &BladeOptions::default()).is_empty());
    }

    #[test]
    fn position_labels_parse() {
        assert_eq!(Position::from_label("REDLUOHS"), Some(Position::Shoulder));
        assert_eq!(Position::from_label("gauge"), Some(Position::Gauge));
        assert_eq!(Position::from_label("R1"), None);
        assert_eq!(RowId::from_marker("R3"), Some(RowId::R3));
        assert_eq!(RowId::from_marker("r3"), None);
    }
}
