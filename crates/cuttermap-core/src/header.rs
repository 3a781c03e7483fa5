//! Header block extraction: serial, material number, date, revision and
//! software version from the top band of the page.
//!
//! Labels are found in style runs; values are read from raw words so a
//! number is never split by a style change. Every field falls back to an
//! empty string.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::geometry::BBox;
use crate::options::HeaderOptions;
use crate::text::TextRun;
use crate::words::Word;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("valid regex"));
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.").expect("valid regex"));
static MATERIAL_FALLBACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{6,7}[A-Z]?\d*").expect("valid regex"));

/// Words that belong to header labels and never to values.
const NOISE_LABELS: &[&str] = &[
    "SN", "SN:", "MAT", "MAT.", "NUMBER", "NUMBER:", "DATE", "CREATED", "CREATED:", "REVISION",
    "LEVEL", "LEVEL:", "SOFTWARE", "VERSION", "VERSION:",
];

/// Header fields of a cutter map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeaderInfo {
    pub serial_number: String,
    pub material_number: String,
    pub creation_date: String,
    pub revision_level: String,
    pub software_version: String,
}

impl HeaderInfo {
    pub fn is_empty(&self) -> bool {
        self.serial_number.is_empty()
            && self.material_number.is_empty()
            && self.creation_date.is_empty()
            && self.revision_level.is_empty()
            && self.software_version.is_empty()
    }
}

fn is_noise(text: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    NOISE_LABELS.contains(&upper.as_str())
}

struct HeaderScan<'a> {
    runs: Vec<&'a TextRun>,
    words: Vec<(usize, &'a Word)>,
    consumed: HashSet<usize>,
    options: &'a HeaderOptions,
}

impl<'a> HeaderScan<'a> {
    fn new(runs: &'a [TextRun], words: &'a [Word], options: &'a HeaderOptions) -> Self {
        Self {
            runs: runs
                .iter()
                .filter(|r| r.bbox.top < options.header_band)
                .collect(),
            words: words
                .iter()
                .enumerate()
                .filter(|(_, w)| w.bbox.top < options.header_band)
                .collect(),
            consumed: HashSet::new(),
            options,
        }
    }

    /// First label occurrence, in reading order, for any of the needles.
    fn find_label(&self, needles: &[&str]) -> Option<BBox> {
        needles.iter().find_map(|needle| {
            let mut hits: Vec<BBox> = self
                .runs
                .iter()
                .filter_map(|r| r.locate_word(needle))
                .collect();
            hits.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0)));
            hits.into_iter().next()
        })
    }

    /// Candidate value words right of the label: same line first, then the
    /// next line, each ordered left to right.
    fn candidates(&self, label: &BBox) -> Vec<(usize, &'a Word)> {
        let opts = self.options;
        let label_y = label.center_y();
        let right_of = |w: &Word| {
            w.bbox.x0 >= label.x1 - 1.0 && w.bbox.x0 - label.x1 <= opts.value_max_gap
        };
        let mut same: Vec<(usize, &Word)> = Vec::new();
        let mut next: Vec<(usize, &Word)> = Vec::new();
        for &(i, w) in &self.words {
            if self.consumed.contains(&i) {
                continue;
            }
            let dy = w.center_y() - label_y;
            if dy.abs() <= opts.line_tolerance && right_of(w) {
                same.push((i, w));
            } else if dy > opts.line_tolerance
                && dy <= opts.next_line_max
                && w.bbox.x1 >= label.x0
                && w.bbox.x0 - label.x1 <= opts.value_max_gap
            {
                next.push((i, w));
            }
        }
        same.sort_by(|a, b| a.1.bbox.x0.total_cmp(&b.1.bbox.x0));
        next.sort_by(|a, b| a.1.bbox.x0.total_cmp(&b.1.bbox.x0));
        same.extend(next);
        same
    }

    fn take_value(&mut self, needles: &[&str], test: impl Fn(&str) -> bool) -> Option<&'a Word> {
        let label = self.find_label(needles)?;
        let (idx, word) = self
            .candidates(&label)
            .into_iter()
            .find(|(_, w)| !is_noise(&w.text) && test(&w.text))?;
        self.consumed.insert(idx);
        Some(word)
    }

    /// Remainder of the label's line up to the next label or a wide gap.
    fn take_line_remainder(&mut self, needles: &[&str]) -> Option<String> {
        let label = self.find_label(needles)?;
        let mut line: Vec<(usize, &Word)> = self
            .words
            .iter()
            .copied()
            .filter(|(i, w)| {
                !self.consumed.contains(i)
                    && (w.center_y() - label.center_y()).abs() <= self.options.line_tolerance
                    && w.bbox.x0 >= label.x1 - 1.0
            })
            .collect();
        line.sort_by(|a, b| a.1.bbox.x0.total_cmp(&b.1.bbox.x0));

        let mut parts: Vec<&str> = Vec::new();
        let mut last_x1 = label.x1;
        for (i, w) in line {
            if is_noise(&w.text) || w.bbox.x0 - last_x1 > self.options.field_gap {
                break;
            }
            parts.push(&w.text);
            last_x1 = w.bbox.x1;
            self.consumed.insert(i);
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// Tokens continuing a wrapped material number in the same column.
    fn material_continuation(&mut self, first: &Word) -> String {
        let mut value = String::new();
        let mut line_y = first.center_y();
        for _ in 0..self.options.max_material_lines {
            let next = self
                .words
                .iter()
                .copied()
                .filter(|(i, w)| {
                    let dy = w.center_y() - line_y;
                    !self.consumed.contains(i)
                        && dy > self.options.line_tolerance
                        && dy <= self.options.next_line_max
                        && (w.bbox.x0 - first.bbox.x0).abs() <= self.options.column_tolerance
                        && w.text.chars().all(|c| c.is_ascii_alphanumeric())
                        && !is_noise(&w.text)
                        && !DATE_RE.is_match(&w.text)
                })
                .min_by(|a, b| a.1.center_y().total_cmp(&b.1.center_y()));
            let Some((i, w)) = next else {
                break;
            };
            value.push_str(&w.text);
            line_y = w.center_y();
            self.consumed.insert(i);
        }
        value
    }

    fn material_fallback(&self) -> Option<String> {
        let mut words: Vec<&(usize, &Word)> = self
            .words
            .iter()
            .filter(|(i, _)| !self.consumed.contains(i))
            .collect();
        words.sort_by(|a, b| a.1.line.cmp(&b.1.line).then(a.1.bbox.x0.total_cmp(&b.1.bbox.x0)));
        words
            .into_iter()
            .find_map(|(_, w)| MATERIAL_FALLBACK_RE.find(&w.text).map(|m| m.as_str().to_string()))
    }
}

/// Extract the header fields from the top band of the page.
pub fn extract_header(runs: &[TextRun], words: &[Word], options: &HeaderOptions) -> HeaderInfo {
    let mut scan = HeaderScan::new(runs, words, options);
    let mut info = HeaderInfo::default();

    if let Some(w) = scan.take_value(&["SN", "SN:"], |t| t.chars().all(|c| c.is_ascii_digit())) {
        info.serial_number = w.text.clone();
    }
    if let Some(w) = scan.take_value(&["Created:", "Created"], |t| DATE_RE.is_match(t)) {
        info.creation_date = w.text.clone();
    }
    if let Some(w) = scan.take_value(&["Version:"], |t| VERSION_RE.is_match(t)) {
        info.software_version = w.text.clone();
    }
    if let Some(w) = scan.take_value(&["Number:", "Mat"], |t| {
        t.starts_with(|c: char| c.is_ascii_digit())
    }) {
        let mut material = w.text.clone();
        material.push_str(&scan.material_continuation(w));
        info.material_number = material;
    }
    if let Some(rev) = scan.take_line_remainder(&["Level:"]) {
        info.revision_level = rev;
    }
    if info.material_number.is_empty() {
        if let Some(m) = scan.material_fallback() {
            debug!(material = %m, "material number from fallback pattern");
            info.material_number = m;
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{LineSpec, layout_lines};

    fn header_page() -> (Vec<TextRun>, Vec<Word>) {
        layout_lines(&[
            LineSpec::new(20.0, 10.0, "SN 1234"),
            LineSpec::new(20.0, 200.0, "Mat Number: 7654321"),
            LineSpec::new(32.0, 10.0, "Date Created: 01/02/2024"),
            LineSpec::new(32.0, 200.0, "Revision Level: D - 390254"),
            LineSpec::new(44.0, 10.0, "Software Version: 1.0.2345.1"),
        ])
    }

    #[test]
    fn extracts_all_five_fields() {
        let (runs, words) = header_page();
        let info = extract_header(&runs, &words, &HeaderOptions::default());
        assert_eq!(info.serial_number, "1234");
        assert_eq!(info.material_number, "7654321");
        assert_eq!(info.creation_date, "01/02/2024");
        assert_eq!(info.revision_level, "D - 390254");
        assert_eq!(info.software_version, "1.0.2345.1");
    }

    #[test]
    fn value_on_next_line_is_found() {
        let (runs, words) = layout_lines(&[
            LineSpec::new(20.0, 10.0, "SN"),
            LineSpec::new(30.0, 10.0, "99812"),
        ]);
        let info = extract_header(&runs, &words, &HeaderOptions::default());
        assert_eq!(info.serial_number, "99812");
    }

    #[test]
    fn wrapped_material_number_is_reassembled() {
        let (runs, words) = layout_lines(&[
            LineSpec::new(20.0, 10.0, "Mat Number: 76543"),
            LineSpec::new(31.0, 82.0, "21A1"),
        ]);
        let info = extract_header(&runs, &words, &HeaderOptions::default());
        assert_eq!(info.material_number, "7654321A1");
    }

    #[test]
    fn material_falls_back_to_pattern() {
        let (runs, words) = layout_lines(&[LineSpec::new(20.0, 10.0, "PART 1234567B2 ISSUED")]);
        let info = extract_header(&runs, &words, &HeaderOptions::default());
        assert_eq!(info.material_number, "1234567B2");
    }

    #[test]
    fn text_below_band_is_ignored() {
        let (runs, words) = layout_lines(&[LineSpec::new(300.0, 10.0, "SN 1234")]);
        let info = extract_header(&runs, &words, &HeaderOptions::default());
        assert!(info.is_empty());
    }

    #[test]
    fn garbage_yields_empty_fields() {
        let (runs, words) = layout_lines(&[LineSpec::new(20.0, 10.0, "SN ABC Version: x")]);
        let info = extract_header(&runs, &words, &HeaderOptions::default());
        assert_eq!(info, HeaderInfo::default());
    }
}
