//! Recursive-descent JSON parser over UTF-8 bytes.
//!
//! Errors carry the byte offset of the offending input. Nesting is bounded
//! by an explicit depth counter so adversarial documents fail with
//! `DepthExceeded` instead of exhausting the call stack.

use crate::errors::{JsonQueryError, JsonQueryResult};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum container nesting. The root value sits at depth 1.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { max_depth: 256 }
    }
}

/// Parse a complete JSON document. Trailing non-whitespace is an error.
pub fn parse(text: &str) -> JsonQueryResult<Value> {
    parse_with_options(text, &ParseOptions::default())
}

pub fn parse_with_options(text: &str, options: &ParseOptions) -> JsonQueryResult<Value> {
    let mut parser = Parser {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        max_depth: options.max_depth,
    };
    parser.skip_whitespace();
    let value = parser.parse_value(0)?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(value),
        Some(_) => Err(parser.error("trailing characters after document")),
    }
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> JsonQueryError {
        JsonQueryError::parse(self.pos, message)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> JsonQueryError {
        JsonQueryError::parse(offset, message)
    }

    fn expect(&mut self, b: u8, what: &str) -> JsonQueryResult<()> {
        match self.peek() {
            Some(c) if c == b => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.error(format!("expected {}", what))),
            None => Err(self.error(format!("unexpected end of input, expected {}", what))),
        }
    }

    fn parse_value(&mut self, depth: usize) -> JsonQueryResult<Value> {
        if depth >= self.max_depth {
            return Err(JsonQueryError::DepthExceeded(self.max_depth));
        }
        match self.peek() {
            Some(b'{') => self.parse_object(depth),
            Some(b'[') => self.parse_array(depth),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b't') => self.parse_keyword("true", Value::Bool(true)),
            Some(b'f') => self.parse_keyword("false", Value::Bool(false)),
            Some(b'n') => self.parse_keyword("null", Value::Null),
            Some(b'-') | Some(b'0'..=b'9') => self.parse_number(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_keyword(&mut self, keyword: &str, value: Value) -> JsonQueryResult<Value> {
        if self.bytes[self.pos..].starts_with(keyword.as_bytes()) {
            self.pos += keyword.len();
            Ok(value)
        } else {
            Err(self.error(format!("expected '{}'", keyword)))
        }
    }

    fn parse_object(&mut self, depth: usize) -> JsonQueryResult<Value> {
        self.expect(b'{', "'{'")?;
        let mut members: Vec<(String, Value)> = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Object(members));
        }
        loop {
            self.skip_whitespace();
            let key = self.parse_string()?;
            self.skip_whitespace();
            self.expect(b':', "':'")?;
            self.skip_whitespace();
            let value = self.parse_value(depth + 1)?;
            // Duplicate keys: last write wins, first occurrence keeps its
            // slot so member order stays stable.
            match members.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => members.push((key, value)),
            }
            self.skip_whitespace();
            match self.bump() {
                Some(b',') => continue,
                Some(b'}') => return Ok(Value::Object(members)),
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.error("expected ',' or '}'"));
                }
                None => return Err(self.error("unterminated object")),
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> JsonQueryResult<Value> {
        self.expect(b'[', "'['")?;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::Array(items));
        }
        loop {
            self.skip_whitespace();
            items.push(self.parse_value(depth + 1)?);
            self.skip_whitespace();
            match self.bump() {
                Some(b',') => continue,
                Some(b']') => return Ok(Value::Array(items)),
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.error("expected ',' or ']'"));
                }
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_string(&mut self) -> JsonQueryResult<String> {
        let start = self.pos;
        self.expect(b'"', "'\"'")?;
        let mut out = String::new();
        let mut run_start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error_at(start, "unterminated string")),
                Some(b'"') => {
                    out.push_str(&self.text[run_start..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push_str(&self.text[run_start..self.pos]);
                    self.pos += 1;
                    self.parse_escape(&mut out)?;
                    run_start = self.pos;
                }
                Some(b) if b < 0x20 => {
                    return Err(self.error("unescaped control character in string"));
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> JsonQueryResult<()> {
        let escape_pos = self.pos - 1;
        match self.bump() {
            Some(b'"') => out.push('"'),
            Some(b'\\') => out.push('\\'),
            Some(b'/') => out.push('/'),
            Some(b'b') => out.push('\u{0008}'),
            Some(b'f') => out.push('\u{000C}'),
            Some(b'n') => out.push('\n'),
            Some(b'r') => out.push('\r'),
            Some(b't') => out.push('\t'),
            Some(b'u') => {
                let unit = self.parse_hex4()?;
                let c = if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate, must pair with a following \uXXXX low
                    // surrogate.
                    if self.bump() != Some(b'\\') || self.bump() != Some(b'u') {
                        return Err(self.error_at(escape_pos, "unpaired surrogate escape"));
                    }
                    let low = self.parse_hex4()?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(self.error_at(escape_pos, "invalid low surrogate"));
                    }
                    let combined =
                        0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(combined)
                        .ok_or_else(|| self.error_at(escape_pos, "invalid surrogate pair"))?
                } else if (0xDC00..0xE000).contains(&unit) {
                    return Err(self.error_at(escape_pos, "unpaired surrogate escape"));
                } else {
                    char::from_u32(unit)
                        .ok_or_else(|| self.error_at(escape_pos, "invalid unicode escape"))?
                };
                out.push(c);
            }
            Some(_) => return Err(self.error_at(escape_pos, "invalid escape sequence")),
            None => return Err(self.error_at(escape_pos, "unterminated escape sequence")),
        }
        Ok(())
    }

    fn parse_hex4(&mut self) -> JsonQueryResult<u32> {
        let mut unit = 0u32;
        for _ in 0..4 {
            let digit = match self.bump() {
                Some(b @ b'0'..=b'9') => (b - b'0') as u32,
                Some(b @ b'a'..=b'f') => (b - b'a') as u32 + 10,
                Some(b @ b'A'..=b'F') => (b - b'A') as u32 + 10,
                _ => return Err(self.error("invalid unicode escape")),
            };
            unit = unit * 16 + digit;
        }
        Ok(unit)
    }

    fn parse_number(&mut self) -> JsonQueryResult<Value> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => {
                while matches!(self.peek(), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
            }
            _ => return Err(self.error_at(start, "invalid number")),
        }
        let mut is_integer = true;
        if self.peek() == Some(b'.') {
            is_integer = false;
            self.pos += 1;
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.error("expected digits after decimal point"));
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            is_integer = false;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.error("expected digits in exponent"));
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let literal = &self.text[start..self.pos];
        if is_integer {
            // Out-of-range integers fall through to floating point rather
            // than failing the parse.
            if let Ok(i) = literal.parse::<i64>() {
                return Ok(Value::Int(i));
            }
        }
        literal
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| self.error_at(start, "invalid number"))
    }
}
