//! Bill-of-materials table extraction.
//!
//! The table has no ruling and no schema. Columns are found from their
//! header labels, rows from the index column, and each row's remaining
//! tokens are classified by the ordered rules in [`crate::classify`].

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::anchor::{cluster_1d, nearest_within};
use crate::classify::{self, ColumnAnchors, Field, Rule, RuleContext};
use crate::options::BomOptions;
use crate::words::Word;

static BLADE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^B\d+$").expect("valid regex"));

/// Position labels (and their reversed renderings) that start the cutter layout.
pub(crate) const POSITION_WORDS: &[&str] = &[
    "CONE", "NOSE", "SHOULDER", "GAUGE", "PAD", "ENOC", "ESON", "REDLUOHS", "EGUAG", "DAP",
];

/// Whether the token is a blade marker (`B1`, `B2`, ...).
pub fn is_blade_marker(text: &str) -> bool {
    BLADE_MARKER_RE.is_match(text)
}

/// One line of the BOM.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BomRow {
    /// 1-based, unique within a table.
    pub index: u32,
    pub size: String,
    pub chamfer: String,
    pub cutter_type: String,
    pub count: u32,
    pub material_number: String,
    pub family_number: String,
    /// `#RRGGBB`, sampled from the page or taken from the fixed palette.
    pub fill_color: Option<String>,
}

/// The extracted table plus the geometry later stages need.
#[derive(Debug, Clone, Default)]
pub struct BomTable {
    /// Rows sorted by index, indices unique.
    pub rows: Vec<BomRow>,
    pub anchors: ColumnAnchors,
    /// Vertical center of the column header row.
    pub header_y: Option<f64>,
    /// Median spacing between index anchors.
    pub row_height: Option<f64>,
    /// Lowest y covered by the table (header row when there are no rows).
    pub bottom: Option<f64>,
}

fn column_label(text: &str) -> Option<Field> {
    match text.trim_end_matches([':', '.']).to_ascii_uppercase().as_str() {
        "SIZE" => Some(Field::Size),
        "CHAMFER" => Some(Field::Chamfer),
        "TYPE" => Some(Field::CutterType),
        "COUNT" | "QTY" => Some(Field::Count),
        "MAT" | "MATERIAL" => Some(Field::Material),
        _ => None,
    }
}

/// Find the column header row: the y-band holding the most distinct labels.
fn discover_columns(words: &[Word], options: &BomOptions) -> Option<(f64, ColumnAnchors)> {
    let mut bands: BTreeMap<i64, Vec<(Field, &Word)>> = BTreeMap::new();
    for w in words {
        if let Some(field) = column_label(&w.text) {
            let key = (w.center_y() / options.band_rounding).round() as i64;
            bands.entry(key).or_default().push((field, w));
        }
    }
    let mut best: Option<(usize, &Vec<(Field, &Word)>)> = None;
    // BTreeMap iterates top to bottom, so strict `>` keeps the topmost on ties.
    for labels in bands.values() {
        let distinct = labels.iter().map(|(f, _)| *f).collect::<HashSet<_>>().len();
        if best.is_none_or(|(n, _)| distinct > n) {
            best = Some((distinct, labels));
        }
    }
    let (_, labels) = best?;

    let mut anchors = ColumnAnchors::default();
    for (field, w) in labels {
        let slot = match field {
            Field::Size => &mut anchors.size,
            Field::Chamfer => &mut anchors.chamfer,
            Field::CutterType => &mut anchors.cutter_type,
            Field::Count => &mut anchors.count,
            Field::Material => &mut anchors.material,
        };
        if slot.is_none() {
            *slot = Some(w.center_x());
        }
    }
    let header_y = labels.iter().map(|(_, w)| w.center_y()).sum::<f64>() / labels.len() as f64;
    Some((header_y, anchors))
}

/// Longest run of strictly increasing consecutive values. Returns the start
/// and length.
fn longest_increasing_run(values: &[u32]) -> (usize, usize) {
    let mut best = (0, values.len().min(1));
    let mut start = 0;
    for i in 1..values.len() {
        if values[i] <= values[i - 1] {
            start = i;
        }
        let len = i - start + 1;
        if len > best.1 {
            best = (start, len);
        }
    }
    best
}

/// Pick the index column among small-integer tokens: the x-cluster with the
/// longest increasing run (ties: leftmost). Returns positions into `body`,
/// top to bottom.
fn discover_index_column(body: &[&Word], options: &BomOptions) -> Vec<usize> {
    let candidates: Vec<usize> = (0..body.len())
        .filter(|&i| {
            let w = body[i];
            w.text.len() <= 2 && w.as_int().is_some_and(|v| (1..=options.max_index).contains(&v))
        })
        .collect();
    let xs: Vec<f64> = candidates.iter().map(|&i| body[i].center_x()).collect();

    let mut best: Option<(usize, f64, Vec<usize>)> = None;
    for cluster in cluster_1d(&xs, options.index_column_tolerance) {
        let mut members: Vec<usize> = cluster.iter().map(|&k| candidates[k]).collect();
        members.sort_by(|&a, &b| body[a].center_y().total_cmp(&body[b].center_y()));
        let values: Vec<u32> = members.iter().filter_map(|&i| body[i].as_int()).collect();
        let (_, len) = longest_increasing_run(&values);
        let mean_x = cluster.iter().map(|&k| xs[k]).sum::<f64>() / cluster.len() as f64;
        let better = match &best {
            None => true,
            Some((blen, bx, _)) => len > *blen || (len == *blen && mean_x < *bx),
        };
        if better {
            best = Some((len, mean_x, members));
        }
    }
    best.map(|(_, _, members)| members).unwrap_or_default()
}

/// A row being assembled.
#[derive(Debug, Default)]
struct Draft<'a> {
    index: Option<u32>,
    y: f64,
    tokens: Vec<&'a Word>,
    row: BomRow,
    filled: HashSet<Field>,
    material_x1: Option<f64>,
}

/// Re-join `CT` / `CR` prefixes split from their number.
fn join_split_types(tokens: &[&Word], join_gap: f64) -> Vec<Word> {
    let mut out: Vec<Word> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let w = tokens[i];
        if let Some(next) = tokens.get(i + 1) {
            let prefix = matches!(w.text.as_str(), "CT" | "CR");
            let numeric = next.text.starts_with(|c: char| c.is_ascii_digit());
            if prefix && numeric && next.bbox.x0 - w.bbox.x1 <= join_gap {
                let mut joined = Word::new(format!("{}{}", w.text, next.text), w.bbox.union(&next.bbox));
                joined.line = w.line;
                out.push(joined);
                i += 2;
                continue;
            }
        }
        out.push((*w).clone());
        i += 1;
    }
    out
}

impl Draft<'_> {
    fn classify(&mut self, rules: &[Rule], ctx: &RuleContext<'_>) {
        let mut tokens = self.tokens.clone();
        tokens.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
        let tokens = join_split_types(&tokens, ctx.options.join_gap);

        let mut leftovers: Vec<&Word> = Vec::new();
        for w in &tokens {
            let filled = &self.filled;
            match classify::classify(w, ctx, rules, |f| filled.contains(&f)) {
                Some(rule) => {
                    self.set(rule.field, w);
                }
                None => leftovers.push(w),
            }
        }

        if !self.filled.contains(&Field::Material) {
            let chamfer_x = ctx.anchors.chamfer.unwrap_or(f64::NEG_INFINITY);
            if let Some(pos) = leftovers
                .iter()
                .position(|w| classify::is_material(&w.text) && w.center_x() > chamfer_x)
            {
                let w = leftovers.remove(pos);
                self.set(Field::Material, w);
            }
        }
        if let Some(mat_x1) = self.material_x1 {
            if let Some(w) = leftovers
                .iter()
                .find(|w| classify::is_family(&w.text) && w.bbox.x0 >= mat_x1)
            {
                self.row.family_number = w.text.clone();
            }
        }
    }

    fn set(&mut self, field: Field, w: &Word) {
        match field {
            Field::CutterType => self.row.cutter_type = w.text.clone(),
            Field::Size => self.row.size = w.text.clone(),
            Field::Count => self.row.count = w.text.parse().unwrap_or(0),
            Field::Chamfer => self.row.chamfer = w.text.clone(),
            Field::Material => {
                self.row.material_number = w.text.clone();
                self.material_x1 = Some(w.bbox.x1);
            }
        }
        self.filled.insert(field);
    }
}

fn is_layout_marker(w: &Word) -> bool {
    is_blade_marker(&w.text) || POSITION_WORDS.contains(&w.text.to_ascii_uppercase().as_str())
}

/// Extract the BOM from the words below `region_top`.
pub fn extract_bom(words: &[Word], region_top: f64, options: &BomOptions) -> BomTable {
    extract_bom_with_rules(words, region_top, options, &classify::default_rules())
}

/// [`extract_bom`] with a caller-supplied rule list.
pub fn extract_bom_with_rules(
    words: &[Word],
    region_top: f64,
    options: &BomOptions,
    rules: &[Rule],
) -> BomTable {
    let below: Vec<Word> = words
        .iter()
        .filter(|w| w.center_y() >= region_top)
        .cloned()
        .collect();
    let Some((header_y, anchors)) = discover_columns(&below, options) else {
        debug!("no BOM column header found");
        return BomTable::default();
    };
    debug!(header_y, columns = anchors.len(), "BOM header row");

    let body_top = header_y + options.row_tolerance;
    let body_bottom = below
        .iter()
        .filter(|w| w.center_y() > body_top && is_layout_marker(w))
        .map(|w| w.bbox.top)
        .fold(f64::INFINITY, f64::min);
    let body: Vec<&Word> = below
        .iter()
        .filter(|w| w.center_y() > body_top && w.center_y() < body_bottom)
        .collect();

    let index_pos = discover_index_column(&body, options);
    debug!(rows = index_pos.len(), "BOM index column");
    let index_set: HashSet<usize> = index_pos.iter().copied().collect();

    let mut drafts: Vec<Draft> = index_pos
        .iter()
        .map(|&i| Draft {
            index: body[i].as_int(),
            y: body[i].center_y(),
            ..Default::default()
        })
        .collect();
    let anchor_ys: Vec<f64> = drafts.iter().map(|d| d.y).collect();

    let count_like = |w: &Word| {
        w.text.len() <= 3
            && w.is_digits()
            && anchors
                .count
                .is_some_and(|x| (w.center_x() - x).abs() <= options.column_window)
    };

    let mut orphans: Vec<&Word> = Vec::new();
    let mut stray: Vec<&Word> = Vec::new();
    for (pos, w) in body.iter().copied().enumerate() {
        if index_set.contains(&pos) {
            continue;
        }
        let y = w.center_y();
        match nearest_within(anchor_ys.iter().enumerate(), y, options.row_tolerance, |(_, ay)| **ay) {
            Some((row, _)) => drafts[row].tokens.push(w),
            None => {
                let near_orphan =
                    nearest_within(anchor_ys.iter(), y, options.orphan_tolerance, |ay| **ay);
                if near_orphan.is_some() && count_like(w) {
                    orphans.push(w);
                } else {
                    stray.push(w);
                }
            }
        }
    }

    // Tokens away from every index anchor may still form a type-only row.
    let stray_ys: Vec<f64> = stray.iter().map(|w| w.center_y()).collect();
    for cluster in cluster_1d(&stray_ys, options.row_tolerance) {
        let tokens: Vec<&Word> = cluster.iter().map(|&i| stray[i]).collect();
        let y = cluster.iter().map(|&i| stray_ys[i]).sum::<f64>() / cluster.len() as f64;
        drafts.push(Draft {
            index: None,
            y,
            tokens,
            ..Default::default()
        });
    }

    let ctx = RuleContext {
        anchors: &anchors,
        options,
    };
    for draft in &mut drafts {
        draft.classify(rules, &ctx);
    }

    for w in orphans {
        let target = drafts
            .iter_mut()
            .filter(|d| d.index.is_some() && !d.filled.contains(&Field::Count))
            .map(|d| ((d.y - w.center_y()).abs(), d))
            .filter(|(dist, _)| *dist <= options.orphan_tolerance)
            .min_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((_, draft)) = target {
            debug!(token = %w.text, index = ?draft.index, "orphan count attached");
            draft.set(Field::Count, w);
        }
    }

    drafts.retain(|d| d.index.is_some() || d.filled.contains(&Field::CutterType));
    drafts.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut used: HashSet<u32> = drafts.iter().filter_map(|d| d.index).collect();
    let mut upper: Option<u32> = None;
    for draft in &mut drafts {
        match draft.index {
            Some(i) => upper = Some(i),
            None => {
                let mut candidate = upper.map_or(1, |i| i + 1);
                while used.contains(&candidate) {
                    candidate += 1;
                }
                debug!(index = candidate, cutter_type = %draft.row.cutter_type, "type-only row indexed");
                used.insert(candidate);
                draft.index = Some(candidate);
                upper = Some(candidate);
            }
        }
    }

    let mut seen: HashSet<u32> = HashSet::new();
    let mut rows: Vec<BomRow> = Vec::new();
    for draft in drafts {
        let Some(index) = draft.index else {
            continue;
        };
        if !seen.insert(index) {
            debug!(index, "duplicate BOM index dropped");
            continue;
        }
        let mut row = draft.row;
        row.index = index;
        rows.push(row);
    }
    rows.sort_by_key(|r| r.index);

    let row_height = median_spacing(&anchor_ys);
    let bottom = anchor_ys
        .iter()
        .copied()
        .fold(header_y, f64::max)
        + options.row_tolerance;

    BomTable {
        rows,
        anchors,
        header_y: Some(header_y),
        row_height,
        bottom: Some(bottom),
    }
}

fn median_spacing(ys: &[f64]) -> Option<f64> {
    let mut sorted = ys.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut gaps: Vec<f64> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_by(f64::total_cmp);
    Some(gaps[gaps.len() / 2])
}
