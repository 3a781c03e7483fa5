use crate::geometry::BBox;
use crate::text::Char;

/// Options for word extraction.
#[derive(Debug, Clone)]
pub struct WordOptions {
    /// Maximum horizontal distance between characters to group into a word.
    pub x_tolerance: f64,
    /// Maximum vertical distance between characters to group into a word.
    pub y_tolerance: f64,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 3.0,
            y_tolerance: 3.0,
        }
    }
}

/// A whitespace-delimited token from the plain text layer.
///
/// Words are the source of truth for numeric fields: they are built purely
/// from glyph positions, so a number is never split by a style change.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Word {
    /// The text content of this word.
    pub text: String,
    /// Bounding box encompassing all constituent characters.
    pub bbox: BBox,
    /// Page-wide line index, top to bottom.
    pub line: usize,
}

impl Word {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
            line: 0,
        }
    }

    pub fn center_x(&self) -> f64 {
        self.bbox.center_x()
    }

    pub fn center_y(&self) -> f64 {
        self.bbox.center_y()
    }

    /// Whether the token is made only of ASCII digits.
    pub fn is_digits(&self) -> bool {
        !self.text.is_empty() && self.text.chars().all(|c| c.is_ascii_digit())
    }

    /// The token as a small integer, when it is one.
    pub fn as_int(&self) -> Option<u32> {
        if self.is_digits() && self.text.len() <= 9 {
            self.text.parse().ok()
        } else {
            None
        }
    }
}

/// Extracts words from a sequence of characters based on spatial proximity.
pub struct WordExtractor;

impl WordExtractor {
    /// Extract words from the given characters.
    ///
    /// Characters are first grouped into text lines (tops within
    /// `y_tolerance`), each line is read left to right, and a word ends on
    /// whitespace or on a horizontal gap larger than `x_tolerance`.
    pub fn extract(chars: &[Char], options: &WordOptions) -> Vec<Word> {
        let mut words = Vec::new();
        for (line_idx, line) in group_char_lines(chars, options.y_tolerance)
            .into_iter()
            .enumerate()
        {
            let mut current: Vec<&Char> = Vec::new();
            for ch in line {
                if ch.text.chars().all(char::is_whitespace) {
                    Self::flush(&mut current, line_idx, &mut words);
                    continue;
                }
                if let Some(last) = current.last() {
                    if Self::should_split(last, ch, options) {
                        Self::flush(&mut current, line_idx, &mut words);
                    }
                }
                current.push(ch);
            }
            Self::flush(&mut current, line_idx, &mut words);
        }
        words
    }

    /// Gap between x-intervals; overlapping glyphs (fake bold) stay together.
    fn should_split(last: &Char, current: &Char, options: &WordOptions) -> bool {
        let x_gap =
            (last.bbox.x0.max(current.bbox.x0) - last.bbox.x1.min(current.bbox.x1)).max(0.0);
        x_gap > options.x_tolerance
    }

    fn flush(current: &mut Vec<&Char>, line: usize, words: &mut Vec<Word>) {
        let Some(first) = current.first() else {
            return;
        };
        let bbox = current
            .iter()
            .skip(1)
            .fold(first.bbox, |acc, c| acc.union(&c.bbox));
        let text: String = current.iter().map(|c| c.text.as_str()).collect();
        words.push(Word { text, bbox, line });
        current.clear();
    }
}

/// Cluster characters into lines by their top edge, each line sorted by x.
fn group_char_lines(chars: &[Char], y_tolerance: f64) -> Vec<Vec<&Char>> {
    let mut sorted: Vec<&Char> = chars.iter().collect();
    sorted.sort_by(|a, b| a.bbox.top.total_cmp(&b.bbox.top));

    let mut lines: Vec<Vec<&Char>> = Vec::new();
    let mut line_top = f64::NEG_INFINITY;
    for ch in sorted {
        match lines.last_mut() {
            Some(line) if (ch.bbox.top - line_top).abs() <= y_tolerance => line.push(ch),
            _ => {
                line_top = ch.bbox.top;
                lines.push(vec![ch]);
            }
        }
    }
    for line in &mut lines {
        line.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    }
    lines
}

/// Group words by their line index, preserving left-to-right order.
pub fn group_lines(words: &[Word]) -> Vec<Vec<&Word>> {
    let mut lines: Vec<Vec<&Word>> = Vec::new();
    for word in words {
        while lines.len() <= word.line {
            lines.push(Vec::new());
        }
        lines[word.line].push(word);
    }
    for line in &mut lines {
        line.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    }
    lines.retain(|l| !l.is_empty());
    lines
}

/// Reconstruct the plain text of the page, one line per text line.
pub fn raw_text(words: &[Word]) -> String {
    group_lines(words)
        .iter()
        .map(|line| {
            line.iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    fn make_char(text: &str, x0: f64, top: f64, x1: f64, bottom: f64) -> Char {
        Char {
            text: text.to_string(),
            bbox: BBox::new(x0, top, x1, bottom),
            fontname: "Helvetica".to_string(),
            size: 12.0,
            color: Rgb::BLACK,
        }
    }

    #[test]
    fn test_default_options() {
        let opts = WordOptions::default();
        assert_eq!(opts.x_tolerance, 3.0);
        assert_eq!(opts.y_tolerance, 3.0);
    }

    #[test]
    fn test_single_word() {
        let chars = vec![
            make_char("C", 10.0, 100.0, 20.0, 112.0),
            make_char("T", 20.0, 100.0, 30.0, 112.0),
            make_char("9", 30.0, 100.0, 40.0, 112.0),
        ];
        let words = WordExtractor::extract(&chars, &WordOptions::default());
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "CT9");
        assert_eq!(words[0].bbox, BBox::new(10.0, 100.0, 40.0, 112.0));
    }

    #[test]
    fn test_space_splits_words() {
        let chars = vec![
            make_char("S", 10.0, 100.0, 20.0, 112.0),
            make_char("N", 20.0, 100.0, 30.0, 112.0),
            make_char(" ", 30.0, 100.0, 35.0, 112.0),
            make_char("1", 35.0, 100.0, 45.0, 112.0),
        ];
        let words = WordExtractor::extract(&chars, &WordOptions::default());
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["SN", "1"]);
    }

    #[test]
    fn test_gap_splits_words() {
        let chars = vec![
            make_char("1", 10.0, 100.0, 16.0, 112.0),
            make_char("2", 30.0, 100.0, 36.0, 112.0),
        ];
        let words = WordExtractor::extract(&chars, &WordOptions::default());
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn test_content_order_does_not_matter() {
        let chars = vec![
            make_char("B", 10.0, 200.0, 20.0, 212.0),
            make_char("2", 16.0, 100.0, 22.0, 112.0),
            make_char("1", 10.0, 101.0, 16.0, 113.0),
        ];
        let words = WordExtractor::extract(&chars, &WordOptions::default());
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "12");
        assert_eq!(words[0].line, 0);
        assert_eq!(words[1].text, "B");
        assert_eq!(words[1].line, 1);
    }

    #[test]
    fn test_raw_text_joins_lines() {
        let chars = vec![
            make_char("A", 10.0, 100.0, 20.0, 112.0),
            make_char("B", 40.0, 100.0, 50.0, 112.0),
            make_char("C", 10.0, 130.0, 20.0, 142.0),
        ];
        let words = WordExtractor::extract(&chars, &WordOptions::default());
        assert_eq!(raw_text(&words), "A B\nC");
    }

    #[test]
    fn test_as_int() {
        let w = Word::new("17", BBox::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(w.as_int(), Some(17));
        assert_eq!(Word::new("1.5", w.bbox).as_int(), None);
        assert_eq!(Word::new("", w.bbox).as_int(), None);
    }
}
