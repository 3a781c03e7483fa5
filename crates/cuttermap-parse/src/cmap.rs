//! ToUnicode CMap parsing.
//!
//! A `/ToUnicode` stream is itself PostScript-like operator soup, so it is
//! read with the content stream tokenizer: the operands of each
//! `endbfchar`, `endbfrange` and `endcodespacerange` operator carry the
//! mappings.

use std::collections::HashMap;

use crate::error::BackendError;
use crate::tokenizer::{Operand, tokenize};

/// Character code to Unicode mapping of one font.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeCMap {
    mappings: HashMap<u32, String>,
    /// Bytes per character code (1 or 2).
    code_len: usize,
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

/// Decode UTF-16BE destination bytes.
fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|c| match c {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [b] => u16::from(*b),
            _ => 0,
        })
        .collect();
    String::from_utf16_lossy(&units)
}

/// The destination string with its last UTF-16 unit advanced by `offset`.
fn offset_text(base: &[u8], offset: u32) -> String {
    let mut bytes = base.to_vec();
    if bytes.len() >= 2 {
        let n = bytes.len();
        let last = u16::from_be_bytes([bytes[n - 2], bytes[n - 1]]).wrapping_add(offset as u16);
        bytes[n - 2..].copy_from_slice(&last.to_be_bytes());
    } else if let Some(b) = bytes.last_mut() {
        *b = b.wrapping_add(offset as u8);
    }
    utf16_text(&bytes)
}

impl ToUnicodeCMap {
    /// Parse the decoded bytes of a `/ToUnicode` stream.
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let mut mappings = HashMap::new();
        let mut code_len = 0usize;

        for op in tokenize(data)? {
            match op.name.as_str() {
                "endcodespacerange" => {
                    for o in &op.operands {
                        if let Operand::String(s) = o {
                            code_len = code_len.max(s.len());
                        }
                    }
                }
                "endbfchar" => {
                    for pair in op.operands.chunks_exact(2) {
                        if let [Operand::String(src), Operand::String(dst)] = pair {
                            code_len = code_len.max(src.len());
                            mappings.insert(code_of(src), utf16_text(dst));
                        }
                    }
                }
                "endbfrange" => {
                    for triple in op.operands.chunks_exact(3) {
                        let [Operand::String(lo), Operand::String(hi), dst] = triple else {
                            continue;
                        };
                        code_len = code_len.max(lo.len());
                        let (lo, hi) = (code_of(lo), code_of(hi));
                        if hi < lo || hi - lo > 0xFFFF {
                            return Err(BackendError::Font(format!(
                                "bad bfrange {lo:#x}..{hi:#x}"
                            )));
                        }
                        match dst {
                            Operand::String(base) => {
                                for code in lo..=hi {
                                    mappings.insert(code, offset_text(base, code - lo));
                                }
                            }
                            Operand::Array(items) => {
                                for (code, item) in (lo..=hi).zip(items) {
                                    if let Operand::String(s) = item {
                                        mappings.insert(code, utf16_text(s));
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            mappings,
            code_len: code_len.clamp(1, 2),
        })
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    /// Bytes per character code.
    pub fn code_len(&self) -> usize {
        self.code_len.max(1)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOILERPLATE: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0011> <0041>
endbfchar
1 beginbfrange
<0020> <0022> <0030>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

    #[test]
    fn two_byte_cmap_with_boilerplate() {
        let cmap = ToUnicodeCMap::parse(BOILERPLATE).unwrap();
        assert_eq!(cmap.code_len(), 2);
        assert_eq!(cmap.lookup(0x0003), Some(" "));
        assert_eq!(cmap.lookup(0x0011), Some("A"));
        assert_eq!(cmap.lookup(0x0020), Some("0"));
        assert_eq!(cmap.lookup(0x0022), Some("2"));
        assert_eq!(cmap.len(), 5);
    }

    #[test]
    fn one_byte_codes() {
        let cmap = ToUnicodeCMap::parse(b"1 beginbfchar <41> <0042> endbfchar").unwrap();
        assert_eq!(cmap.code_len(), 1);
        assert_eq!(cmap.lookup(0x41), Some("B"));
    }

    #[test]
    fn range_with_array_destination() {
        let cmap =
            ToUnicodeCMap::parse(b"1 beginbfrange <01> <02> [<0066 0069> <0058>] endbfrange")
                .unwrap();
        assert_eq!(cmap.lookup(1), Some("fi"));
        assert_eq!(cmap.lookup(2), Some("X"));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(ToUnicodeCMap::parse(b"1 beginbfrange <05> <01> <0041> endbfrange").is_err());
    }

    #[test]
    fn empty_cmap() {
        let cmap = ToUnicodeCMap::parse(b"").unwrap();
        assert!(cmap.is_empty());
        assert_eq!(cmap.lookup(1), None);
    }
}
