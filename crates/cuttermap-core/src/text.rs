use crate::color::Rgb;
use crate::geometry::BBox;

/// A single glyph decoded from a page content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Char {
    /// The text content of this character.
    pub text: String,
    /// Bounding box in top-left origin coordinates.
    pub bbox: BBox,
    /// Font name (subset prefix stripped).
    pub fontname: String,
    /// Font size in points (after text and current transforms).
    pub size: f64,
    /// Fill color used to paint the glyph.
    pub color: Rgb,
}

/// A style-annotated span of text: contiguous glyphs sharing font, size and color.
///
/// Runs keep whitespace and are the unit used for label matching. Numeric
/// values are read from [`Word`](crate::words::Word) tokens instead, because a
/// styled span may split a number in two.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextRun {
    pub text: String,
    pub bbox: BBox,
    pub fontname: String,
    pub size: f64,
    /// Packed `0xRRGGBB` fill color.
    pub color: u32,
    /// Block index (groups of lines separated by vertical whitespace).
    pub block: usize,
    /// Line index, page-wide, top to bottom.
    pub line: usize,
    /// Ordinal of this run within its line, left to right.
    pub word: usize,
    /// Left edge of every character plus the right edge of the last one
    /// (`text.chars().count() + 1` entries).
    #[cfg_attr(feature = "serde", serde(skip))]
    glyph_edges: Vec<f64>,
}

impl TextRun {
    /// Create a run whose glyph edges are spread evenly across the box.
    pub fn new(text: impl Into<String>, bbox: BBox, fontname: impl Into<String>, size: f64) -> Self {
        let text = text.into();
        let n = text.chars().count().max(1);
        let step = bbox.width() / n as f64;
        let glyph_edges = (0..=n).map(|i| bbox.x0 + step * i as f64).collect();
        Self {
            text,
            bbox,
            fontname: fontname.into(),
            size,
            color: 0,
            block: 0,
            line: 0,
            word: 0,
            glyph_edges,
        }
    }

    /// Replace the evenly spread glyph edges with measured ones.
    pub fn with_glyph_edges(mut self, edges: Vec<f64>) -> Self {
        if edges.len() == self.text.chars().count() + 1 {
            self.glyph_edges = edges;
        }
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color.packed();
        self
    }

    /// Locate the first occurrence of `needle` (case-insensitive) inside the run
    /// and return its bounding box.
    pub fn locate(&self, needle: &str) -> Option<BBox> {
        if needle.is_empty() {
            return None;
        }
        let hay: Vec<char> = self.text.chars().flat_map(|c| c.to_uppercase()).collect();
        let pat: Vec<char> = needle.chars().flat_map(|c| c.to_uppercase()).collect();
        if hay.len() != self.text.chars().count() || pat.len() > hay.len() {
            // Case folding changed the length; fall back to the whole run.
            return self
                .text
                .to_uppercase()
                .contains(&needle.to_uppercase())
                .then_some(self.bbox);
        }
        let start = hay.windows(pat.len()).position(|w| w == pat.as_slice())?;
        let end = start + pat.len();
        let x0 = self.glyph_edges.get(start).copied().unwrap_or(self.bbox.x0);
        let x1 = self.glyph_edges.get(end).copied().unwrap_or(self.bbox.x1);
        Some(BBox::new(x0, self.bbox.top, x1, self.bbox.bottom))
    }

    /// Like [`locate`](Self::locate), but the match must not touch other
    /// letters or digits on either side (`SN` does not match `DESIGN`).
    pub fn locate_word(&self, needle: &str) -> Option<BBox> {
        let hay: Vec<char> = self.text.chars().map(|c| c.to_ascii_uppercase()).collect();
        let pat: Vec<char> = needle.chars().map(|c| c.to_ascii_uppercase()).collect();
        if pat.is_empty() || pat.len() > hay.len() {
            return None;
        }
        let is_word = |c: Option<&char>| c.is_some_and(|c| c.is_alphanumeric());
        let start = (0..=hay.len() - pat.len()).find(|&i| {
            hay[i..i + pat.len()] == pat[..]
                && !is_word(i.checked_sub(1).and_then(|p| hay.get(p)))
                && !is_word(hay.get(i + pat.len()))
        })?;
        let end = start + pat.len();
        let x0 = self.glyph_edges.get(start).copied().unwrap_or(self.bbox.x0);
        let x1 = self.glyph_edges.get(end).copied().unwrap_or(self.bbox.x1);
        Some(BBox::new(x0, self.bbox.top, x1, self.bbox.bottom))
    }

    /// The run's color unpacked.
    pub fn rgb(&self) -> Rgb {
        Rgb::from_packed(self.color)
    }
}

/// Options for grouping decoded glyphs into runs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Baseline difference (points) that ends a run.
    pub y_tolerance: f64,
    /// Horizontal gap, as a multiple of the font size, that ends a run.
    pub gap_factor: f64,
    /// Vertical gap, as a multiple of the font size, that starts a new block.
    pub block_gap_factor: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            y_tolerance: 2.0,
            gap_factor: 1.0,
            block_gap_factor: 1.5,
        }
    }
}

fn same_style(a: &Char, b: &Char) -> bool {
    a.fontname == b.fontname && (a.size - b.size).abs() < 0.01 && a.color == b.color
}

/// Group glyphs (in content-stream order) into style runs and assign
/// block / line / word indices.
pub fn build_runs(chars: &[Char], options: &RunOptions) -> Vec<TextRun> {
    let mut runs: Vec<TextRun> = Vec::new();
    let mut current: Vec<&Char> = Vec::new();

    for ch in chars {
        if let Some(last) = current.last() {
            let gap = ch.bbox.x0 - last.bbox.x1;
            let breaks = !same_style(last, ch)
                || (ch.bbox.bottom - last.bbox.bottom).abs() > options.y_tolerance
                || gap > options.gap_factor * last.size.max(1.0)
                || ch.bbox.x1 < last.bbox.x0;
            if breaks {
                flush_run(&mut current, &mut runs);
            }
        }
        current.push(ch);
    }
    flush_run(&mut current, &mut runs);

    // Trim leading/trailing whitespace while keeping glyph edges aligned.
    for run in &mut runs {
        let chars: Vec<char> = run.text.chars().collect();
        let lead = chars.iter().take_while(|c| c.is_whitespace()).count();
        let trail = chars.iter().rev().take_while(|c| c.is_whitespace()).count();
        if lead == 0 && trail == 0 {
            continue;
        }
        let keep = chars.len() - lead - trail;
        let edges = run.glyph_edges[lead..=lead + keep].to_vec();
        run.text = chars[lead..lead + keep].iter().collect();
        run.bbox.x0 = edges[0];
        run.bbox.x1 = edges[edges.len() - 1];
        run.glyph_edges = edges;
    }

    assign_layout_indices(&mut runs, options);
    runs
}

/// Close the pending glyphs into a run, dropping whitespace-only spans.
fn flush_run(current: &mut Vec<&Char>, runs: &mut Vec<TextRun>) {
    if current.iter().all(|c| c.text.trim().is_empty()) {
        current.clear();
        return;
    }
    let first = current[0];
    let bbox = current
        .iter()
        .skip(1)
        .fold(first.bbox, |acc, c| acc.union(&c.bbox));
    let text: String = current.iter().map(|c| c.text.as_str()).collect();
    let mut edges: Vec<f64> = Vec::new();
    for c in current.iter() {
        for _ in c.text.chars() {
            edges.push(c.bbox.x0);
        }
    }
    edges.push(current.last().map_or(bbox.x1, |c| c.bbox.x1));
    let run = TextRun::new(text, bbox, first.fontname.clone(), first.size)
        .with_color(first.color)
        .with_glyph_edges(edges);
    runs.push(run);
    current.clear();
}

/// Assign line, word and block indices to runs based on their position.
fn assign_layout_indices(runs: &mut [TextRun], options: &RunOptions) {
    let mut order: Vec<usize> = (0..runs.len()).collect();
    order.sort_by(|&a, &b| {
        runs[a]
            .bbox
            .bottom
            .total_cmp(&runs[b].bbox.bottom)
            .then(runs[a].bbox.x0.total_cmp(&runs[b].bbox.x0))
    });

    let mut line = 0usize;
    let mut block = 0usize;
    let mut line_bottom: Option<f64> = None;
    let mut word = 0usize;
    for idx in order.iter().copied() {
        let bottom = runs[idx].bbox.bottom;
        match line_bottom {
            Some(prev) if (bottom - prev).abs() <= options.y_tolerance => {
                word += 1;
            }
            Some(prev) => {
                line += 1;
                word = 0;
                if bottom - prev > options.block_gap_factor * runs[idx].size.max(1.0) * 2.0 {
                    block += 1;
                }
                line_bottom = Some(bottom);
            }
            None => line_bottom = Some(bottom),
        }
        runs[idx].line = line;
        runs[idx].word = word;
        runs[idx].block = block;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(text: &str, x0: f64, bottom: f64, size: f64) -> Char {
        Char {
            text: text.to_string(),
            bbox: BBox::new(x0, bottom - size, x0 + size * 0.5, bottom),
            fontname: "Helvetica".to_string(),
            size,
            color: Rgb::BLACK,
        }
    }

    fn word_chars(text: &str, x0: f64, bottom: f64) -> Vec<Char> {
        text.chars()
            .enumerate()
            .map(|(i, c)| ch(&c.to_string(), x0 + i as f64 * 5.0, bottom, 10.0))
            .collect()
    }

    #[test]
    fn contiguous_glyphs_form_one_run() {
        let chars = word_chars("Mat Number:", 10.0, 30.0);
        let runs = build_runs(&chars, &RunOptions::default());
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Mat Number:");
        assert_eq!(runs[0].bbox.x0, 10.0);
    }

    #[test]
    fn style_change_splits_run() {
        let mut chars = word_chars("AB", 10.0, 30.0);
        chars[1].fontname = "Helvetica-Bold".to_string();
        let runs = build_runs(&chars, &RunOptions::default());
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "A");
        assert_eq!(runs[1].text, "B");
    }

    #[test]
    fn large_gap_splits_run_and_sets_word_index() {
        let mut chars = word_chars("SN", 10.0, 30.0);
        chars.extend(word_chars("1234", 100.0, 30.0));
        let runs = build_runs(&chars, &RunOptions::default());
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].line, runs[1].line);
        assert_eq!(runs[0].word, 0);
        assert_eq!(runs[1].word, 1);
    }

    #[test]
    fn lines_and_blocks_are_numbered_top_to_bottom() {
        let mut chars = word_chars("B", 10.0, 200.0);
        chars.extend(word_chars("A", 10.0, 30.0));
        chars.extend(word_chars("C", 10.0, 42.0));
        let runs = build_runs(&chars, &RunOptions::default());
        let by_text = |t: &str| runs.iter().find(|r| r.text == t).unwrap().clone();
        assert_eq!(by_text("A").line, 0);
        assert_eq!(by_text("C").line, 1);
        assert_eq!(by_text("B").line, 2);
        assert_eq!(by_text("A").block, by_text("C").block);
        assert!(by_text("B").block > by_text("C").block);
    }

    #[test]
    fn whitespace_is_trimmed_from_run_edges() {
        let chars = word_chars(" SN ", 10.0, 30.0);
        let runs = build_runs(&chars, &RunOptions::default());
        assert_eq!(runs[0].text, "SN");
        assert_eq!(runs[0].bbox.x0, 15.0);
        assert_eq!(runs[0].bbox.x1, 25.0);
    }

    #[test]
    fn locate_returns_substring_box() {
        let run = TextRun::new("Mat Number: 7654321", BBox::new(0.0, 0.0, 190.0, 10.0), "F", 10.0);
        let label = run.locate("number:").unwrap();
        assert_eq!(label.x0, 40.0);
        assert_eq!(label.x1, 110.0);
        assert!(run.locate("Version").is_none());
    }

    #[test]
    fn locate_word_requires_boundaries() {
        let run = TextRun::new("DESIGN SN", BBox::new(0.0, 0.0, 90.0, 10.0), "F", 10.0);
        let hit = run.locate_word("sn").unwrap();
        assert_eq!(hit.x0, 70.0);
        assert_eq!(hit.x1, 90.0);
        assert!(run.locate_word("SIG").is_none());
    }

    #[test]
    fn measured_glyph_edges_must_match_length() {
        let run = TextRun::new("AB", BBox::new(0.0, 0.0, 10.0, 10.0), "F", 10.0)
            .with_glyph_edges(vec![0.0, 1.0]);
        // Wrong length is ignored, even spread kept.
        assert_eq!(run.locate("B").unwrap().x0, 5.0);
    }
}
