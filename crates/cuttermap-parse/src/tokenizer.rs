//! Content stream tokenizer.
//!
//! Splits raw content stream bytes into [`Operator`]s, each carrying the
//! [`Operand`]s that preceded it. Comments are dropped and inline images
//! (`BI ... ID ... EI`) are skipped whole.

use crate::error::BackendError;

/// A content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Integer(i64),
    Real(f64),
    /// Stored without the leading `/`.
    Name(String),
    /// Literal or hex string, as raw bytes.
    String(Vec<u8>),
    Array(Vec<Operand>),
    Boolean(bool),
    Null,
    Dictionary(Vec<(String, Operand)>),
}

impl Operand {
    /// Numeric value of an integer or real operand.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Operand::Integer(i) => Some(*i as f64),
            Operand::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }
}

/// An operator with its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub name: String,
    pub operands: Vec<Operand>,
}

impl Operator {
    /// All operands as numbers, or `None` if any is not numeric.
    pub fn numbers(&self) -> Option<Vec<f64>> {
        self.operands.iter().map(Operand::as_f64).collect()
    }

    /// The last `N` operands as numbers.
    pub fn last_numbers<const N: usize>(&self) -> Option<[f64; N]> {
        let start = self.operands.len().checked_sub(N)?;
        let mut out = [0.0; N];
        for (slot, op) in out.iter_mut().zip(&self.operands[start..]) {
            *slot = op.as_f64()?;
        }
        Some(out)
    }
}

/// Parse content stream bytes into operators.
///
/// # Errors
///
/// Returns [`BackendError::Interpreter`] for malformed strings, arrays and
/// dictionaries.
pub fn tokenize(input: &[u8]) -> Result<Vec<Operator>, BackendError> {
    let mut lexer = Lexer { input, pos: 0 };
    let mut ops = Vec::new();
    let mut stack: Vec<Operand> = Vec::new();

    loop {
        lexer.skip_blank();
        let Some(b) = lexer.peek() else {
            break;
        };
        if b == b']' {
            return Err(BackendError::Interpreter(
                "unexpected ']' outside array".to_string(),
            ));
        }
        if is_keyword_start(b) {
            let keyword = lexer.keyword();
            match keyword.as_str() {
                "true" => stack.push(Operand::Boolean(true)),
                "false" => stack.push(Operand::Boolean(false)),
                "null" => stack.push(Operand::Null),
                "BI" => {
                    lexer.skip_inline_image();
                    stack.clear();
                }
                _ => ops.push(Operator {
                    name: keyword,
                    operands: std::mem::take(&mut stack),
                }),
            }
            continue;
        }
        match lexer.value()? {
            Some(v) => stack.push(v),
            None => lexer.pos += 1,
        }
    }
    Ok(ops)
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_keyword_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'*' | b'\'' | b'"')
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn skip_blank(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while self.peek().is_some_and(|c| c != b'\n' && c != b'\r') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Parse one operand at the cursor. `None` for a byte that starts no
    /// operand.
    fn value(&mut self) -> Result<Option<Operand>, BackendError> {
        let Some(b) = self.peek() else {
            return Ok(None);
        };
        let v = match b {
            b'(' => Operand::String(self.literal_string()?),
            b'<' if self.peek_at(1) == Some(b'<') => Operand::Dictionary(self.dictionary()?),
            b'<' => Operand::String(self.hex_string()?),
            b'[' => {
                self.pos += 1;
                Operand::Array(self.array()?)
            }
            b'/' => Operand::Name(self.name()),
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.number()?,
            _ if b.is_ascii_alphabetic() => match self.keyword().as_str() {
                "true" => Operand::Boolean(true),
                "false" => Operand::Boolean(false),
                "null" => Operand::Null,
                other => Operand::Name(other.to_string()),
            },
            _ => return Ok(None),
        };
        Ok(Some(v))
    }

    fn literal_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1u32;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\\' => self.escape(&mut out)?,
                _ => out.push(b),
            }
        }
        Err(BackendError::Interpreter(
            "unterminated literal string".to_string(),
        ))
    }

    /// Decode one escape sequence; the backslash is already consumed.
    fn escape(&mut self, out: &mut Vec<u8>) -> Result<(), BackendError> {
        let Some(e) = self.peek() else {
            return Err(BackendError::Interpreter(
                "unterminated escape in literal string".to_string(),
            ));
        };
        self.pos += 1;
        match e {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'\r' => {
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            b'0'..=b'7' => {
                let mut val = u32::from(e - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            val = val * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push((val & 0xFF) as u8);
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn hex_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut nibbles = Vec::new();
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'>' {
                break;
            }
            if is_whitespace(b) {
                continue;
            }
            let v = hex_value(b).ok_or_else(|| {
                BackendError::Interpreter(format!("invalid hex digit: {:?}", b as char))
            })?;
            nibbles.push(v);
        }
        if nibbles.len() % 2 != 0 {
            nibbles.push(0);
        }
        Ok(nibbles.chunks(2).map(|p| (p[0] << 4) | p[1]).collect())
    }

    /// Parse array elements; the `[` is already consumed.
    fn array(&mut self) -> Result<Vec<Operand>, BackendError> {
        let mut items = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                None => return Err(BackendError::Interpreter("unterminated array".to_string())),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(b) => match self.value()? {
                    Some(v) => items.push(v),
                    None => {
                        return Err(BackendError::Interpreter(format!(
                            "unexpected byte in array: 0x{b:02X}"
                        )));
                    }
                },
            }
        }
    }

    fn dictionary(&mut self) -> Result<Vec<(String, Operand)>, BackendError> {
        self.pos += 2;
        let mut entries = Vec::new();
        loop {
            self.skip_blank();
            match (self.peek(), self.peek_at(1)) {
                (None, _) => {
                    return Err(BackendError::Interpreter(
                        "unterminated dictionary".to_string(),
                    ));
                }
                (Some(b'>'), Some(b'>')) => {
                    self.pos += 2;
                    return Ok(entries);
                }
                (Some(b'/'), _) => {
                    let key = self.name();
                    self.skip_blank();
                    let value = self.value()?.ok_or_else(|| {
                        BackendError::Interpreter(format!("missing value for /{key}"))
                    })?;
                    entries.push((key, value));
                }
                _ => {
                    return Err(BackendError::Interpreter(
                        "expected name key in dictionary".to_string(),
                    ));
                }
            }
        }
    }

    /// Parse a `/Name`, resolving `#XX` escapes.
    fn name(&mut self) -> String {
        self.pos += 1;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !is_whitespace(b) && !is_delimiter(b))
        {
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        let mut name = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            let escaped = (raw[i] == b'#' && i + 2 < raw.len())
                .then(|| Some((hex_value(raw[i + 1])? << 4) | hex_value(raw[i + 2])?))
                .flatten();
            match escaped {
                Some(v) => {
                    name.push(v);
                    i += 3;
                }
                None => {
                    name.push(raw[i]);
                    i += 1;
                }
            }
        }
        String::from_utf8_lossy(&name).into_owned()
    }

    fn number(&mut self) -> Result<Operand, BackendError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut has_dot = false;
        while let Some(b) = self.peek() {
            if b == b'.' && !has_dot {
                has_dot = true;
            } else if !b.is_ascii_digit() {
                break;
            }
            self.pos += 1;
        }
        let token = String::from_utf8_lossy(&self.input[start..self.pos]);
        if has_dot {
            // A lone "." or "-." reads as zero.
            let digits = token.trim_start_matches(['+', '-']);
            if digits == "." {
                return Ok(Operand::Real(0.0));
            }
            token
                .parse::<f64>()
                .map(Operand::Real)
                .map_err(|_| BackendError::Interpreter(format!("invalid real number: {token}")))
        } else {
            token
                .parse::<i64>()
                .map(Operand::Integer)
                .map_err(|_| BackendError::Interpreter(format!("invalid integer: {token}")))
        }
    }

    fn keyword(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_keyword_start) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// Skip past the `EI` that ends an inline image.
    fn skip_inline_image(&mut self) {
        while self.pos < self.input.len() {
            let at_ei = self.input[self.pos..].starts_with(b"EI")
                && self.pos > 0
                && is_whitespace(self.input[self.pos - 1])
                && self
                    .input
                    .get(self.pos + 2)
                    .is_none_or(|b| is_whitespace(*b));
            if at_ei {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }
}
