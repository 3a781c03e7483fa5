//! Group legend detection.
//!
//! Below a `Group` label the page lists which group numbers share a cutter
//! icon, either as comma-separated lists (one per legend row) or as a
//! vertical column of single numbers.

use std::collections::BTreeSet;

use tracing::debug;

use crate::anchor::cluster_1d;
use crate::geometry::BBox;
use crate::options::LegendOptions;
use crate::words::Word;

/// How the legend lists its groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GroupFormat {
    /// A single comma-separated list.
    Comma,
    /// Several comma-separated lists, one per row.
    MultiRow,
    /// One number per row, stacked in a column.
    Vertical,
    #[default]
    Unknown,
}

/// One legend row: the groups it lists and where it sits.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LegendRow {
    pub groups: Vec<u32>,
    /// Vertical center of the row.
    pub y: f64,
}

/// The parsed group legend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupLegend {
    /// Where the `Group` label was found.
    pub label: Option<BBox>,
    pub format: GroupFormat,
    pub rows: Vec<LegendRow>,
}

impl GroupLegend {
    pub fn has_legend(&self) -> bool {
        self.label.is_some()
    }

    /// Every listed group, ascending, without duplicates.
    pub fn groups(&self) -> Vec<u32> {
        self.rows
            .iter()
            .flat_map(|r| r.groups.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Parse `"1,2, 3"` into numbers; `None` unless the text is a list with at
/// least one comma.
fn parse_comma_list(text: &str) -> Option<Vec<u32>> {
    if !text.contains(',') {
        return None;
    }
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>().ok())
        .collect()
}

struct Line<'a> {
    y: f64,
    words: Vec<&'a Word>,
}

/// Find the `Group` label and parse the legend beneath it.
pub fn extract_legend(words: &[Word], options: &LegendOptions) -> GroupLegend {
    let Some(label) = words
        .iter()
        .filter(|w| w.text.trim_end_matches(':').eq_ignore_ascii_case("group"))
        .min_by(|a, b| {
            a.bbox
                .top
                .total_cmp(&b.bbox.top)
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        })
    else {
        return GroupLegend::default();
    };

    let window: Vec<&Word> = words
        .iter()
        .filter(|w| {
            let dy = w.center_y() - label.center_y();
            dy > options.row_tolerance
                && w.bbox.top <= label.bbox.bottom + options.legend_window
                && w.bbox.x0 >= label.bbox.x0 - options.legend_x_margin
                && w.bbox.x0 <= label.bbox.x0 + options.legend_width
        })
        .collect();

    let ys: Vec<f64> = window.iter().map(|w| w.center_y()).collect();
    let mut lines: Vec<Line> = cluster_1d(&ys, options.row_tolerance)
        .into_iter()
        .map(|cluster| {
            let mut words: Vec<&Word> = cluster.iter().map(|&i| window[i]).collect();
            words.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
            let y = cluster.iter().map(|&i| ys[i]).sum::<f64>() / cluster.len() as f64;
            Line { y, words }
        })
        .collect();
    lines.sort_by(|a, b| a.y.total_cmp(&b.y));

    let (format, rows) = classify_lines(&lines, options);
    debug!(?format, rows = rows.len(), "group legend");
    GroupLegend {
        label: Some(label.bbox),
        format,
        rows,
    }
}

fn classify_lines(lines: &[Line<'_>], options: &LegendOptions) -> (GroupFormat, Vec<LegendRow>) {
    let in_range = |groups: &[u32]| {
        !groups.is_empty() && groups.iter().all(|g| (1..=options.max_member).contains(g))
    };
    if lines.is_empty() {
        return (GroupFormat::Unknown, Vec::new());
    }

    let comma_rows: Option<Vec<LegendRow>> = lines
        .iter()
        .map(|line| {
            let text: String = line.words.iter().map(|w| w.text.as_str()).collect();
            parse_comma_list(&text)
                .filter(|g| in_range(g))
                .map(|groups| LegendRow { groups, y: line.y })
        })
        .collect();
    if let Some(rows) = comma_rows {
        let format = if rows.len() == 1 {
            GroupFormat::Comma
        } else {
            GroupFormat::MultiRow
        };
        return (format, rows);
    }

    let first_x = lines[0].words[0].bbox.x0;
    let vertical: Option<Vec<LegendRow>> = lines
        .iter()
        .map(|line| match line.words.as_slice() {
            [w] if (w.bbox.x0 - first_x).abs() <= options.column_tolerance => w
                .as_int()
                .filter(|g| in_range(&[*g]))
                .map(|g| LegendRow {
                    groups: vec![g],
                    y: line.y,
                }),
            _ => None,
        })
        .collect();
    match vertical {
        Some(rows) => (GroupFormat::Vertical, rows),
        None => (GroupFormat::Unknown, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{LineSpec, words_for};

    fn legend(lines: &[(f64, &str)]) -> GroupLegend {
        let mut specs = vec![LineSpec::new(100.0, 400.0, "Group")];
        specs.extend(lines.iter().map(|(top, text)| LineSpec::new(*top, 400.0, text)));
        extract_legend(&words_for(&specs), &LegendOptions::default())
    }

    #[test]
    fn single_comma_list() {
        let l = legend(&[(115.0, "1, 3, 5")]);
        assert_eq!(l.format, GroupFormat::Comma);
        assert_eq!(l.rows.len(), 1);
        assert_eq!(l.rows[0].groups, vec![1, 3, 5]);
        assert!((l.rows[0].y - 120.0).abs() < 1e-9);
    }

    #[test]
    fn multi_row_lists() {
        let l = legend(&[(115.0, "1,2"), (135.0, "3,4,6")]);
        assert_eq!(l.format, GroupFormat::MultiRow);
        assert_eq!(l.groups(), vec![1, 2, 3, 4, 6]);
    }

    #[test]
    fn vertical_column() {
        let l = legend(&[(115.0, "2"), (130.0, "4"), (145.0, "7")]);
        assert_eq!(l.format, GroupFormat::Vertical);
        let groups: Vec<Vec<u32>> = l.rows.iter().map(|r| r.groups.clone()).collect();
        assert_eq!(groups, vec![vec![2], vec![4], vec![7]]);
    }

    #[test]
    fn out_of_range_member_is_unknown() {
        let l = legend(&[(115.0, "1, 42")]);
        assert_eq!(l.format, GroupFormat::Unknown);
        assert!(l.rows.is_empty());
        assert!(l.has_legend());
    }

    #[test]
    fn text_outside_window_is_ignored() {
        let l = legend(&[(115.0, "1,2"), (300.0, "HELLO")]);
        assert_eq!(l.format, GroupFormat::Comma);
    }

    #[test]
    fn missing_label_means_no_legend() {
        let words = words_for(&[LineSpec::new(115.0, 400.0, "1, 2")]);
        let l = extract_legend(&words, &LegendOptions::default());
        assert!(!l.has_legend());
        assert_eq!(l.format, GroupFormat::Unknown);
    }

    #[test]
    fn comma_list_parsing() {
        assert_eq!(parse_comma_list("1,2,"), Some(vec![1, 2]));
        assert_eq!(parse_comma_list("12"), None);
        assert_eq!(parse_comma_list("1,x"), None);
    }
}
