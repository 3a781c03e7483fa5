//! Font widths and code-to-text decoding.
//!
//! Glyph advances come from the font's `/FirstChar` + `/Widths`, falling
//! back to built-in Helvetica (or Courier) metrics. Text comes from the
//! `/ToUnicode` CMap when there is one, otherwise each code byte is read as
//! Latin-1.

use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use crate::cmap::ToUnicodeCMap;
use crate::lopdf_backend::{object_to_f64, resolve};

/// Helvetica advances for codes 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const DEFAULT_ADVANCE: f64 = 556.0;

/// Built-in metrics used when a font has no `/Widths`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuiltinMetrics {
    Helvetica,
    Courier,
}

impl BuiltinMetrics {
    fn for_base_font(name: &str) -> Self {
        if name.contains("Courier") {
            BuiltinMetrics::Courier
        } else {
            BuiltinMetrics::Helvetica
        }
    }

    fn advance(self, code: u32) -> f64 {
        match self {
            BuiltinMetrics::Courier => 600.0,
            BuiltinMetrics::Helvetica => (32..=126)
                .contains(&code)
                .then(|| f64::from(HELVETICA_ASCII[(code - 32) as usize]))
                .unwrap_or(DEFAULT_ADVANCE),
        }
    }
}

/// One decoded glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub code: u32,
    pub text: String,
    /// Advance in 1/1000 text space units.
    pub advance: f64,
}

/// Everything the interpreter needs from a font.
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// `/BaseFont` without a subset prefix.
    pub name: String,
    first_char: u32,
    widths: Vec<f64>,
    missing_width: f64,
    builtin: BuiltinMetrics,
    to_unicode: Option<ToUnicodeCMap>,
    /// Composite (Type0) fonts use two-byte codes.
    composite: bool,
    default_cid_width: f64,
    cid_widths: Vec<(u32, u32, f64)>,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self::standard("Helvetica")
    }
}

fn strip_subset(name: &str) -> &str {
    match name.split_once('+') {
        Some((prefix, rest)) if prefix.len() == 6 && prefix.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

fn name_of(obj: &Object) -> Option<String> {
    obj.as_name()
        .ok()
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

impl FontInfo {
    /// A standard font with built-in metrics.
    pub fn standard(name: &str) -> Self {
        Self {
            name: name.to_string(),
            first_char: 0,
            widths: Vec::new(),
            missing_width: 0.0,
            builtin: BuiltinMetrics::for_base_font(name),
            to_unicode: None,
            composite: false,
            default_cid_width: 1000.0,
            cid_widths: Vec::new(),
        }
    }

    /// Read a font dictionary. Broken parts degrade to defaults.
    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let base = dict
            .get(b"BaseFont")
            .ok()
            .and_then(name_of)
            .unwrap_or_else(|| "Helvetica".to_string());
        let mut font = Self::standard(strip_subset(&base));

        let subtype = dict.get(b"Subtype").ok().and_then(name_of);
        if subtype.as_deref() == Some("Type0") {
            font.composite = true;
            font.read_descendant(doc, dict);
        } else {
            font.first_char = dict
                .get(b"FirstChar")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0)
                .max(0) as u32;
            if let Ok(widths) = dict.get(b"Widths").map(|o| resolve(doc, o)) {
                if let Ok(arr) = widths.as_array() {
                    font.widths = arr
                        .iter()
                        .map(|w| object_to_f64(resolve(doc, w)).unwrap_or(0.0))
                        .collect();
                }
            }
            font.missing_width = dict
                .get(b"FontDescriptor")
                .ok()
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_dict().ok())
                .and_then(|d| d.get(b"MissingWidth").ok())
                .and_then(|o| object_to_f64(o).ok())
                .unwrap_or(0.0);
        }

        if let Ok(obj) = dict.get(b"ToUnicode") {
            let cmap = resolve(doc, obj)
                .as_stream()
                .ok()
                .and_then(|s| s.decompressed_content().ok().or_else(|| Some(s.content.clone())))
                .map(|bytes| ToUnicodeCMap::parse(&bytes));
            match cmap {
                Some(Ok(cmap)) => font.to_unicode = Some(cmap),
                Some(Err(err)) => debug!(font = %font.name, %err, "unreadable ToUnicode"),
                None => {}
            }
        }
        font
    }

    fn read_descendant(&mut self, doc: &Document, dict: &Dictionary) {
        let Some(desc) = dict
            .get(b"DescendantFonts")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok())
            .and_then(|a| a.first())
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        else {
            return;
        };
        if let Some(dw) = desc.get(b"DW").ok().and_then(|o| object_to_f64(o).ok()) {
            self.default_cid_width = dw;
        }
        let Some(w) = desc
            .get(b"W")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok())
        else {
            return;
        };
        // Entries are either `c [w1 w2 ...]` or `c_first c_last w`.
        let mut i = 0;
        while i < w.len() {
            let Ok(start) = w[i].as_i64() else {
                break;
            };
            let Ok(start) = u32::try_from(start.max(0)) else {
                break;
            };
            match w.get(i + 1).map(|o| resolve(doc, o)) {
                Some(Object::Array(list)) => {
                    for (k, width) in list.iter().enumerate() {
                        let Some(cid) = u32::try_from(k).ok().and_then(|k| start.checked_add(k))
                        else {
                            break;
                        };
                        let width = object_to_f64(width).unwrap_or(self.default_cid_width);
                        self.cid_widths.push((cid, cid, width));
                    }
                    i += 2;
                }
                Some(end) => {
                    let end = end
                        .as_i64()
                        .ok()
                        .and_then(|e| u32::try_from(e.max(0)).ok())
                        .unwrap_or(u32::MAX);
                    let width = w
                        .get(i + 2)
                        .and_then(|o| object_to_f64(o).ok())
                        .unwrap_or(self.default_cid_width);
                    self.cid_widths.push((start, end, width));
                    i += 3;
                }
                None => break,
            }
        }
    }

    fn advance(&self, code: u32) -> f64 {
        if self.composite {
            return self
                .cid_widths
                .iter()
                .find(|(lo, hi, _)| (*lo..=*hi).contains(&code))
                .map(|(_, _, w)| *w)
                .unwrap_or(self.default_cid_width);
        }
        if !self.widths.is_empty() {
            let slot = code
                .checked_sub(self.first_char)
                .and_then(|i| self.widths.get(i as usize));
            return match slot {
                Some(w) => *w,
                None if self.missing_width > 0.0 => self.missing_width,
                None => self.builtin.advance(code),
            };
        }
        self.builtin.advance(code)
    }

    /// Whether codes are two bytes wide; word spacing never applies then.
    pub fn is_composite(&self) -> bool {
        self.composite
    }

    fn code_len(&self) -> usize {
        if self.composite {
            return 2;
        }
        self.to_unicode.as_ref().map_or(1, |c| c.code_len())
    }

    fn text_for(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|c| c.lookup(code)) {
            return text.to_string();
        }
        if self.composite {
            return char::from_u32(code).map(String::from).unwrap_or_default();
        }
        char::from(code as u8).to_string()
    }

    /// Split a shown string into glyphs.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        bytes
            .chunks(self.code_len())
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                Glyph {
                    code,
                    text: self.text_for(code),
                    advance: self.advance(code),
                }
            })
            .collect()
    }
}
