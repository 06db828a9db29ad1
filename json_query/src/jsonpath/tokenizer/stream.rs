use peekmore::{PeekMore, PeekMoreIterator};
use std::str::Chars;

use crate::errors::{JsonQueryError, JsonQueryResult};
use crate::value::Value;

use super::constants::{DOUBLE_QUOTE, ESCAPE, MINUS, PERIOD, SINGLE_QUOTE};

/// Char stream over a query string with multi-char lookahead and a running
/// position, so syntax errors can point at the offending char.
pub struct TokenStream<'a> {
    inner: PeekMoreIterator<Chars<'a>>,
    consumed: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(text: &'a str) -> Self {
        TokenStream {
            inner: text.chars().peekmore(),
            consumed: 0,
        }
    }

    /// Chars consumed so far; the offset reported in syntax errors.
    pub fn pos(&self) -> usize {
        self.consumed
    }

    pub fn peek(&mut self) -> Option<&char> {
        self.inner.peek()
    }

    /// Peek `n` chars past the next one without consuming anything.
    pub fn peek_ahead(&mut self, n: usize) -> Option<char> {
        self.inner.peek_nth(n).copied()
    }

    pub fn next_if(&mut self, predicate: impl FnOnce(&char) -> bool) -> Option<char> {
        match self.peek() {
            Some(c) if predicate(c) => self.next(),
            _ => None,
        }
    }

    pub fn error(&self, message: impl Into<String>) -> JsonQueryError {
        JsonQueryError::path_syntax(self.consumed, message)
    }
}

impl<'a> Iterator for TokenStream<'a> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        let c = self.inner.next();
        if c.is_some() {
            self.consumed += 1;
        }
        c
    }
}

pub trait PeekableExt {
    fn drop_while<P>(&mut self, predicate: P)
    where
        P: FnMut(&char) -> bool;

    fn next_significant(&mut self) -> Option<char>;

    /// Skip whitespace, then peek. Whitespace is consumed.
    fn peek_significant(&mut self) -> Option<&char>;

    fn read_quoted_string(&mut self) -> JsonQueryResult<String>;

    fn read_int(&mut self) -> JsonQueryResult<i64>;

    fn read_number_value(&mut self) -> JsonQueryResult<Value>;
}

impl<'a> PeekableExt for TokenStream<'a> {
    fn drop_while<P>(&mut self, mut predicate: P)
    where
        P: FnMut(&char) -> bool,
    {
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.next();
            } else {
                break;
            }
        }
    }

    fn next_significant(&mut self) -> Option<char> {
        self.drop_while(|c| c.is_whitespace());
        self.next()
    }

    fn peek_significant(&mut self) -> Option<&char> {
        self.drop_while(|c| c.is_whitespace());
        self.peek()
    }

    fn read_quoted_string(&mut self) -> JsonQueryResult<String> {
        let quote = match self.next_significant() {
            Some(c) if c == SINGLE_QUOTE || c == DOUBLE_QUOTE => c,
            _ => return Err(self.error("expected quoted string")),
        };

        let start = self.pos();
        let mut s = String::new();
        loop {
            match self.next() {
                None => {
                    return Err(JsonQueryError::path_syntax(start, "unterminated string"));
                }
                Some(c) if c == quote => return Ok(s),
                Some(ESCAPE) => match self.next() {
                    Some(c @ ('\'' | '"' | '\\' | '/')) => s.push(c),
                    Some('n') => s.push('\n'),
                    Some('r') => s.push('\r'),
                    Some('t') => s.push('\t'),
                    Some('b') => s.push('\u{0008}'),
                    Some('f') => s.push('\u{000C}'),
                    _ => return Err(self.error("invalid escape in string literal")),
                },
                Some(c) => s.push(c),
            }
        }
    }

    fn read_int(&mut self) -> JsonQueryResult<i64> {
        let start = self.pos();
        let mut w = String::new();
        if self.peek() == Some(&MINUS) {
            w.push(MINUS);
            self.next();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                w.push(*c);
                self.next();
            } else {
                break;
            }
        }
        w.parse::<i64>()
            .map_err(|_| JsonQueryError::path_syntax(start, "expected integer"))
    }

    fn read_number_value(&mut self) -> JsonQueryResult<Value> {
        let start = self.pos();
        let mut w = String::new();
        if self.peek() == Some(&MINUS) {
            w.push(MINUS);
            self.next();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || *c == PERIOD || *c == 'e' || *c == 'E' {
                w.push(*c);
                self.next();
            } else if (*c == MINUS || *c == '+') && matches!(w.chars().last(), Some('e') | Some('E')) {
                w.push(*c);
                self.next();
            } else {
                break;
            }
        }
        if w.is_empty() {
            return Err(JsonQueryError::path_syntax(start, "expected number"));
        }
        if !w.contains(PERIOD) && !w.contains('e') && !w.contains('E') {
            if let Ok(i) = w.parse::<i64>() {
                return Ok(Value::Int(i));
            }
        }
        w.parse::<f64>()
            .map(Value::Double)
            .map_err(|_| JsonQueryError::path_syntax(start, "invalid number"))
    }
}
