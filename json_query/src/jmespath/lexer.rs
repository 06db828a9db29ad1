//! Tokenizes a JMESPath expression. Backtick literals are parsed with the
//! document parser, so a literal like `` `{"a": 1}` `` carries a real value
//! into the expression tree.

use peekmore::{PeekMore, PeekMoreIterator};
use std::str::Chars;

use crate::errors::{JsonQueryError, JsonQueryResult};
use crate::json;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    QuotedIdentifier(String),
    RawString(String),
    Literal(Value),
    Number(i64),
    Dot,
    Star,
    /// `[]`
    Flatten,
    /// `[?`
    Filter,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Colon,
    Pipe,
    Or,
    And,
    Not,
    At,
    Ampersand,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Eof,
}

/// A token plus the char offset where it started.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAt {
    pub pos: usize,
    pub token: Token,
}

pub fn tokenize(expression: &str) -> JsonQueryResult<Vec<TokenAt>> {
    let mut lexer = Lexer {
        stream: expression.chars().peekmore(),
        pos: 0,
    };
    lexer.run()
}

struct Lexer<'a> {
    stream: PeekMoreIterator<Chars<'a>>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn bump(&mut self) -> Option<char> {
        let c = self.stream.next();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn peek(&mut self) -> Option<char> {
        self.stream.peek().copied()
    }

    fn error(&self, at: usize, message: impl Into<String>) -> JsonQueryError {
        JsonQueryError::path_syntax(at, message)
    }

    fn run(&mut self) -> JsonQueryResult<Vec<TokenAt>> {
        let mut tokens = Vec::new();
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.bump();
            }
            let at = self.pos;
            let Some(c) = self.bump() else {
                tokens.push(TokenAt {
                    pos: at,
                    token: Token::Eof,
                });
                return Ok(tokens);
            };
            let token = match c {
                'a'..='z' | 'A'..='Z' | '_' => self.identifier(c),
                '0'..='9' => self.number(c, at)?,
                '-' => match self.peek() {
                    Some(d) if d.is_ascii_digit() => {
                        let d = self.bump().unwrap();
                        match self.number(d, at)? {
                            Token::Number(n) => Token::Number(-n),
                            _ => unreachable!(),
                        }
                    }
                    _ => return Err(self.error(at, "expected digit after '-'")),
                },
                '"' => self.quoted_identifier(at)?,
                '\'' => self.raw_string(at)?,
                '`' => self.json_literal(at)?,
                '.' => Token::Dot,
                '*' => Token::Star,
                ',' => Token::Comma,
                ':' => Token::Colon,
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                '(' => Token::LParen,
                ')' => Token::RParen,
                ']' => Token::RBracket,
                '@' => Token::At,
                '[' => match self.peek() {
                    Some(']') => {
                        self.bump();
                        Token::Flatten
                    }
                    Some('?') => {
                        self.bump();
                        Token::Filter
                    }
                    _ => Token::LBracket,
                },
                '|' => {
                    if self.peek() == Some('|') {
                        self.bump();
                        Token::Or
                    } else {
                        Token::Pipe
                    }
                }
                '&' => {
                    if self.peek() == Some('&') {
                        self.bump();
                        Token::And
                    } else {
                        Token::Ampersand
                    }
                }
                '!' => {
                    if self.peek() == Some('=') {
                        self.bump();
                        Token::Ne
                    } else {
                        Token::Not
                    }
                }
                '=' => {
                    if self.peek() == Some('=') {
                        self.bump();
                        Token::Eq
                    } else {
                        return Err(self.error(at, "expected '==', got '='"));
                    }
                }
                '<' => {
                    if self.peek() == Some('=') {
                        self.bump();
                        Token::Le
                    } else {
                        Token::Lt
                    }
                }
                '>' => {
                    if self.peek() == Some('=') {
                        self.bump();
                        Token::Ge
                    } else {
                        Token::Gt
                    }
                }
                other => {
                    return Err(self.error(at, format!("unexpected character '{}'", other)));
                }
            };
            tokens.push(TokenAt { pos: at, token });
        }
    }

    fn identifier(&mut self, first: char) -> Token {
        let mut name = String::new();
        name.push(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token::Identifier(name)
    }

    fn number(&mut self, first: char, at: usize) -> JsonQueryResult<Token> {
        let mut digits = String::new();
        digits.push(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }
        digits
            .parse::<i64>()
            .map(Token::Number)
            .map_err(|_| self.error(at, "number out of range"))
    }

    /// Quoted identifiers use JSON string syntax; delegate the unescaping to
    /// the document parser.
    fn quoted_identifier(&mut self, at: usize) -> JsonQueryResult<Token> {
        let mut raw = String::from('"');
        loop {
            match self.bump() {
                None => return Err(self.error(at, "unterminated quoted identifier")),
                Some('\\') => {
                    raw.push('\\');
                    match self.bump() {
                        Some(c) => raw.push(c),
                        None => return Err(self.error(at, "unterminated quoted identifier")),
                    }
                }
                Some('"') => break,
                Some(c) => raw.push(c),
            }
        }
        raw.push('"');
        match json::parse(&raw) {
            Ok(Value::String(s)) => Ok(Token::QuotedIdentifier(s)),
            _ => Err(self.error(at, "invalid quoted identifier")),
        }
    }

    fn raw_string(&mut self, at: usize) -> JsonQueryResult<Token> {
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(at, "unterminated raw string")),
                Some('\\') => match self.bump() {
                    Some('\'') => s.push('\''),
                    Some('\\') => s.push('\\'),
                    Some(c) => {
                        s.push('\\');
                        s.push(c);
                    }
                    None => return Err(self.error(at, "unterminated raw string")),
                },
                Some('\'') => return Ok(Token::RawString(s)),
                Some(c) => s.push(c),
            }
        }
    }

    fn json_literal(&mut self, at: usize) -> JsonQueryResult<Token> {
        let mut raw = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(at, "unterminated literal")),
                Some('\\') if self.peek() == Some('`') => {
                    self.bump();
                    raw.push('`');
                }
                Some('`') => break,
                Some(c) => raw.push(c),
            }
        }
        let value = json::parse(raw.trim())
            .map_err(|_| self.error(at, "literal is not valid JSON"))?;
        Ok(Token::Literal(value))
    }
}

#[cfg(test)]
mod test {
    use super::{tokenize, Token};
    use crate::value::Value;

    fn kinds(expr: &str) -> Vec<Token> {
        tokenize(expr).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn tokenizes_projections_and_operators() {
        assert_eq!(
            vec![
                Token::Identifier("a".to_string()),
                Token::Flatten,
                Token::Dot,
                Token::Identifier("b".to_string()),
                Token::LBracket,
                Token::Star,
                Token::RBracket,
                Token::Pipe,
                Token::At,
                Token::Eof
            ],
            kinds("a[].b[*] | @")
        );
        assert_eq!(
            vec![Token::Filter, Token::Identifier("x".to_string()), Token::Ge, Token::Literal(Value::Int(3)), Token::RBracket, Token::Eof],
            kinds("[?x >= `3`]")
        );
    }

    #[test]
    fn tokenizes_strings_and_literals() {
        assert_eq!(
            vec![Token::RawString("a'b".to_string()), Token::Eof],
            kinds(r"'a\'b'")
        );
        assert_eq!(
            vec![Token::QuotedIdentifier("a b".to_string()), Token::Eof],
            kinds("\"a b\"")
        );
        let tokens = kinds("`{\"a\": 1}`");
        match &tokens[0] {
            Token::Literal(v) => assert_eq!(Some(&Value::Int(1)), v.get("a")),
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(tokenize("a = b").is_err());
        assert!(tokenize("'unterminated").is_err());
        assert!(tokenize("`not json`").is_err());
        assert!(tokenize("a # b").is_err());
    }

    #[test]
    fn tokens_carry_positions() {
        let tokens = tokenize("ab . cd").unwrap();
        assert_eq!(0, tokens[0].pos);
        assert_eq!(3, tokens[1].pos);
        assert_eq!(5, tokens[2].pos);
    }
}
