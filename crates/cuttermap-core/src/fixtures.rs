//! Synthetic page text for unit tests.
//!
//! Glyphs are laid out on a fixed grid: every character is `CHAR_W` wide
//! and `LINE_H` tall, starting at the given left edge and top.

use crate::color::Rgb;
use crate::geometry::BBox;
use crate::text::{Char, RunOptions, TextRun, build_runs};
use crate::words::{Word, WordExtractor, WordOptions};

pub(crate) const CHAR_W: f64 = 6.0;
pub(crate) const LINE_H: f64 = 10.0;

/// One line of text placed at `(x0, top)`.
pub(crate) struct LineSpec {
    pub top: f64,
    pub x0: f64,
    pub text: String,
}

impl LineSpec {
    pub fn new(top: f64, x0: f64, text: &str) -> Self {
        Self {
            top,
            x0,
            text: text.to_string(),
        }
    }
}

pub(crate) fn chars_for(specs: &[LineSpec]) -> Vec<Char> {
    let mut chars = Vec::new();
    for spec in specs {
        for (i, c) in spec.text.chars().enumerate() {
            let x0 = spec.x0 + i as f64 * CHAR_W;
            chars.push(Char {
                text: c.to_string(),
                bbox: BBox::new(x0, spec.top, x0 + CHAR_W, spec.top + LINE_H),
                fontname: "Helvetica".to_string(),
                size: LINE_H,
                color: Rgb::BLACK,
            });
        }
    }
    chars
}

/// Runs and words for the given lines.
pub(crate) fn layout_lines(specs: &[LineSpec]) -> (Vec<TextRun>, Vec<Word>) {
    let chars = chars_for(specs);
    (
        build_runs(&chars, &RunOptions::default()),
        WordExtractor::extract(&chars, &WordOptions::default()),
    )
}

pub(crate) fn words_for(specs: &[LineSpec]) -> Vec<Word> {
    WordExtractor::extract(&chars_for(specs), &WordOptions::default())
}

/// A single word at `(x0, top)`.
pub(crate) fn word(text: &str, x0: f64, top: f64) -> Word {
    let width = text.chars().count() as f64 * CHAR_W;
    Word::new(text, BBox::new(x0, top, x0 + width, top + LINE_H))
}
