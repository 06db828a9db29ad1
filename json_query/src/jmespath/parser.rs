//! Pratt parser for JMESPath expressions.
//!
//! Binding powers follow the published JMESPath grammar. A projection stays
//! open while the next operator binds at least as tightly as
//! `PROJECTION_STOP`; a pipe or a logical/comparison operator binds looser
//! and therefore closes it. That is how `a[*].b | c` applies `b` per
//! element but `c` to the collected result.

use super::ast::{Ast, Comparator};
use super::lexer::{tokenize, Token, TokenAt};
use crate::errors::{JsonQueryError, JsonQueryResult};

const MAX_PARSE_DEPTH: usize = 128;
const PROJECTION_STOP: usize = 10;

pub fn parse(expression: &str) -> JsonQueryResult<Ast> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser { tokens, index: 0 };
    let ast = parser.expression(0, 0)?;
    match parser.current().token {
        Token::Eof => Ok(ast),
        _ => Err(parser.error("unexpected trailing tokens")),
    }
}

struct Parser {
    tokens: Vec<TokenAt>,
    index: usize,
}

fn lbp(token: &Token) -> usize {
    match token {
        Token::Pipe => 1,
        Token::Or => 2,
        Token::And => 3,
        Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge => 5,
        Token::Flatten => 9,
        Token::Star => 20,
        Token::Filter => 21,
        Token::Dot => 40,
        Token::Not => 45,
        Token::LBrace => 50,
        Token::LBracket => 55,
        Token::LParen => 60,
        _ => 0,
    }
}

impl Parser {
    fn current(&self) -> &TokenAt {
        &self.tokens[self.index]
    }

    fn next_token(&self) -> Option<&Token> {
        self.tokens.get(self.index + 1).map(|t| &t.token)
    }

    fn advance(&mut self) -> TokenAt {
        let t = self.tokens[self.index].clone();
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        t
    }

    fn error(&self, message: impl Into<String>) -> JsonQueryError {
        JsonQueryError::path_syntax(self.current().pos, message)
    }

    fn expect(&mut self, token: Token, what: &str) -> JsonQueryResult<()> {
        if self.current().token == token {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn expression(&mut self, rbp: usize, depth: usize) -> JsonQueryResult<Ast> {
        if depth >= MAX_PARSE_DEPTH {
            return Err(JsonQueryError::DepthExceeded(MAX_PARSE_DEPTH));
        }
        let t = self.advance();
        let mut left = self.nud(t, depth)?;
        while lbp(&self.current().token) > rbp {
            let t = self.advance();
            left = self.led(t, left, depth)?;
        }
        Ok(left)
    }

    fn nud(&mut self, t: TokenAt, depth: usize) -> JsonQueryResult<Ast> {
        match t.token {
            Token::At => Ok(Ast::Identity),
            Token::Identifier(name) | Token::QuotedIdentifier(name) => Ok(Ast::Field(name)),
            Token::RawString(s) => Ok(Ast::Literal(crate::value::Value::String(s))),
            Token::Literal(v) => Ok(Ast::Literal(v)),
            Token::Star => Ok(Ast::Projection {
                lhs: Box::new(Ast::ObjectValues(Box::new(Ast::Identity))),
                rhs: Box::new(self.projection_rhs(lbp(&Token::Star), depth)?),
            }),
            Token::Flatten => Ok(Ast::Projection {
                lhs: Box::new(Ast::Flatten(Box::new(Ast::Identity))),
                rhs: Box::new(self.projection_rhs(lbp(&Token::Flatten), depth)?),
            }),
            Token::Filter => self.filter(Ast::Identity, depth),
            Token::LBracket => self.nud_bracket(depth),
            Token::LBrace => self.multi_hash(depth),
            Token::Not => Ok(Ast::Not(Box::new(
                self.expression(lbp(&Token::Not), depth + 1)?,
            ))),
            Token::Ampersand => Ok(Ast::Expref(Box::new(self.expression(0, depth + 1)?))),
            Token::LParen => {
                let inner = self.expression(0, depth + 1)?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(JsonQueryError::path_syntax(t.pos, "unexpected token")),
        }
    }

    fn led(&mut self, t: TokenAt, left: Ast, depth: usize) -> JsonQueryResult<Ast> {
        match t.token {
            Token::Dot => {
                if self.current().token == Token::Star {
                    self.advance();
                    return Ok(Ast::Projection {
                        lhs: Box::new(Ast::ObjectValues(Box::new(left))),
                        rhs: Box::new(self.projection_rhs(lbp(&Token::Star), depth)?),
                    });
                }
                Ok(Ast::Subexpr {
                    lhs: Box::new(left),
                    rhs: Box::new(self.dot_rhs(lbp(&Token::Dot), depth)?),
                })
            }
            Token::Pipe => Ok(Ast::Pipe {
                lhs: Box::new(left),
                rhs: Box::new(self.expression(lbp(&Token::Pipe), depth + 1)?),
            }),
            Token::Or => Ok(Ast::Or {
                lhs: Box::new(left),
                rhs: Box::new(self.expression(lbp(&Token::Or), depth + 1)?),
            }),
            Token::And => Ok(Ast::And {
                lhs: Box::new(left),
                rhs: Box::new(self.expression(lbp(&Token::And), depth + 1)?),
            }),
            Token::Eq => self.comparison(Comparator::Eq, left, depth),
            Token::Ne => self.comparison(Comparator::Ne, left, depth),
            Token::Lt => self.comparison(Comparator::Lt, left, depth),
            Token::Le => self.comparison(Comparator::Le, left, depth),
            Token::Gt => self.comparison(Comparator::Gt, left, depth),
            Token::Ge => self.comparison(Comparator::Ge, left, depth),
            Token::Flatten => Ok(Ast::Projection {
                lhs: Box::new(Ast::Flatten(Box::new(left))),
                rhs: Box::new(self.projection_rhs(lbp(&Token::Flatten), depth)?),
            }),
            Token::Filter => self.filter(left, depth),
            Token::LBracket => self.led_bracket(left, depth),
            // A call target must be a plain identifier; quoted identifiers
            // are always field lookups.
            Token::LParen => match left {
                Ast::Field(name)
                    if matches!(self.tokens[self.index - 2].token, Token::Identifier(_)) =>
                {
                    self.function_call(name, depth)
                }
                _ => Err(JsonQueryError::path_syntax(
                    t.pos,
                    "only an unquoted identifier can name a function",
                )),
            },
            _ => Err(JsonQueryError::path_syntax(t.pos, "unexpected token")),
        }
    }

    fn comparison(&mut self, op: Comparator, left: Ast, depth: usize) -> JsonQueryResult<Ast> {
        Ok(Ast::Comparison {
            op,
            lhs: Box::new(left),
            rhs: Box::new(self.expression(5, depth + 1)?),
        })
    }

    /// `[` at the start of an expression: index, slice, or multi-select
    /// list. The lexer already folded `[]` and `[?` into their own tokens.
    fn nud_bracket(&mut self, depth: usize) -> JsonQueryResult<Ast> {
        match (&self.current().token, self.next_token()) {
            (Token::Number(n), Some(Token::RBracket)) => {
                let n = *n;
                self.advance();
                self.advance();
                Ok(Ast::Index(n))
            }
            (Token::Number(_), Some(Token::Colon)) | (Token::Colon, _) => {
                let slice = self.slice_parts()?;
                Ok(Ast::Projection {
                    lhs: Box::new(slice),
                    rhs: Box::new(self.projection_rhs(lbp(&Token::Star), depth)?),
                })
            }
            (Token::Star, Some(Token::RBracket)) => {
                self.advance();
                self.advance();
                Ok(Ast::Projection {
                    lhs: Box::new(Ast::Identity),
                    rhs: Box::new(self.projection_rhs(lbp(&Token::Star), depth)?),
                })
            }
            _ => self.multi_select_list(depth),
        }
    }

    /// `[` after an expression: index, slice, or `[*]` projection.
    fn led_bracket(&mut self, left: Ast, depth: usize) -> JsonQueryResult<Ast> {
        match (&self.current().token, self.next_token()) {
            (Token::Number(n), Some(Token::RBracket)) => {
                let n = *n;
                self.advance();
                self.advance();
                Ok(Ast::Subexpr {
                    lhs: Box::new(left),
                    rhs: Box::new(Ast::Index(n)),
                })
            }
            (Token::Number(_), Some(Token::Colon)) | (Token::Colon, _) => {
                let slice = self.slice_parts()?;
                Ok(Ast::Projection {
                    lhs: Box::new(Ast::Subexpr {
                        lhs: Box::new(left),
                        rhs: Box::new(slice),
                    }),
                    rhs: Box::new(self.projection_rhs(lbp(&Token::Star), depth)?),
                })
            }
            (Token::Star, Some(Token::RBracket)) => {
                self.advance();
                self.advance();
                Ok(Ast::Projection {
                    lhs: Box::new(left),
                    rhs: Box::new(self.projection_rhs(lbp(&Token::Star), depth)?),
                })
            }
            _ => Err(self.error("expected a number, ':' or '*' in brackets")),
        }
    }

    fn slice_parts(&mut self) -> JsonQueryResult<Ast> {
        let mut start = None;
        let mut end = None;
        let mut step = 1;
        if let Token::Number(n) = self.current().token {
            start = Some(n);
            self.advance();
        }
        self.expect(Token::Colon, "':'")?;
        if let Token::Number(n) = self.current().token {
            end = Some(n);
            self.advance();
        }
        if self.current().token == Token::Colon {
            self.advance();
            if let Token::Number(n) = self.current().token {
                if n == 0 {
                    return Err(self.error("slice step must not be zero"));
                }
                step = n;
                self.advance();
            }
        }
        self.expect(Token::RBracket, "']'")?;
        Ok(Ast::Slice { start, end, step })
    }

    fn filter(&mut self, lhs: Ast, depth: usize) -> JsonQueryResult<Ast> {
        let predicate = self.expression(0, depth + 1)?;
        self.expect(Token::RBracket, "']' closing the filter")?;
        Ok(Ast::FilterProjection {
            lhs: Box::new(lhs),
            predicate: Box::new(predicate),
            rhs: Box::new(self.projection_rhs(lbp(&Token::Filter), depth)?),
        })
    }

    /// What a projection maps over each element, `Identity` when the
    /// projection is closed right away (by a pipe, a comparison, EOF, ...).
    fn projection_rhs(&mut self, rbp: usize, depth: usize) -> JsonQueryResult<Ast> {
        if lbp(&self.current().token) < PROJECTION_STOP {
            return Ok(Ast::Identity);
        }
        match self.current().token {
            Token::Dot => {
                self.advance();
                self.dot_rhs(rbp, depth)
            }
            Token::LBracket | Token::Filter => self.expression(rbp, depth + 1),
            _ => Err(self.error("expected '.', '[' or '[?' after the projection")),
        }
    }

    fn dot_rhs(&mut self, rbp: usize, depth: usize) -> JsonQueryResult<Ast> {
        match self.current().token {
            Token::Identifier(_) | Token::QuotedIdentifier(_) => self.expression(rbp, depth + 1),
            Token::LBracket => {
                self.advance();
                self.multi_select_list(depth)
            }
            Token::LBrace => {
                self.advance();
                self.multi_hash(depth)
            }
            _ => Err(self.error("expected an identifier, '[' or '{' after '.'")),
        }
    }

    fn multi_select_list(&mut self, depth: usize) -> JsonQueryResult<Ast> {
        let mut elements = Vec::new();
        loop {
            elements.push(self.expression(0, depth + 1)?);
            match self.advance().token {
                Token::Comma => continue,
                Token::RBracket => break,
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
        Ok(Ast::MultiList(elements))
    }

    fn multi_hash(&mut self, depth: usize) -> JsonQueryResult<Ast> {
        let mut members = Vec::new();
        loop {
            let key = match self.advance().token {
                Token::Identifier(name) | Token::QuotedIdentifier(name) => name,
                _ => return Err(self.error("expected a key in the multi-select hash")),
            };
            self.expect(Token::Colon, "':'")?;
            members.push((key, self.expression(0, depth + 1)?));
            match self.advance().token {
                Token::Comma => continue,
                Token::RBrace => break,
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
        Ok(Ast::MultiHash(members))
    }

    fn function_call(&mut self, name: String, depth: usize) -> JsonQueryResult<Ast> {
        let mut args = Vec::new();
        if self.current().token == Token::RParen {
            self.advance();
        } else {
            loop {
                args.push(self.expression(0, depth + 1)?);
                match self.advance().token {
                    Token::Comma => continue,
                    Token::RParen => break,
                    _ => return Err(self.error("expected ',' or ')' in the argument list")),
                }
            }
        }
        Ok(Ast::Function { name, args })
    }
}

#[cfg(test)]
mod test {
    use super::parse;
    use crate::errors::JsonQueryError;
    use crate::jmespath::ast::{Ast, Comparator};

    fn field(name: &str) -> Box<Ast> {
        Box::new(Ast::Field(name.to_string()))
    }

    #[test]
    fn parses_subexpressions() {
        assert_eq!(
            Ast::Subexpr {
                lhs: Box::new(Ast::Subexpr {
                    lhs: field("a"),
                    rhs: field("b"),
                }),
                rhs: field("c"),
            },
            parse("a.b.c").unwrap()
        );
    }

    #[test]
    fn projection_stays_open_until_the_pipe() {
        // a[*].b | c : the field b is mapped inside the projection, c is
        // applied to the whole collected array.
        let ast = parse("a[*].b | c").unwrap();
        match ast {
            Ast::Pipe { lhs, rhs } => {
                assert_eq!(*rhs, Ast::Field("c".to_string()));
                match *lhs {
                    Ast::Projection { lhs, rhs } => {
                        assert_eq!(*lhs, Ast::Field("a".to_string()));
                        assert_eq!(*rhs, Ast::Field("b".to_string()));
                    }
                    other => panic!("expected projection, got {:?}", other),
                }
            }
            other => panic!("expected pipe, got {:?}", other),
        }
    }

    #[test]
    fn comparison_closes_a_projection() {
        // The comparison applies to the whole projection result, not per
        // element.
        let ast = parse("a[*] == `[]`").unwrap();
        assert!(matches!(ast, Ast::Comparison { op: Comparator::Eq, .. }));
    }

    #[test]
    fn parses_index_and_slice() {
        assert_eq!(
            Ast::Subexpr {
                lhs: field("a"),
                rhs: Box::new(Ast::Index(-1)),
            },
            parse("a[-1]").unwrap()
        );
        match parse("a[1:3].b").unwrap() {
            Ast::Projection { lhs, rhs } => {
                assert!(matches!(
                    *lhs,
                    Ast::Subexpr { .. }
                ));
                assert_eq!(*rhs, Ast::Field("b".to_string()));
            }
            other => panic!("expected projection, got {:?}", other),
        }
    }

    #[test]
    fn parses_filters_and_multi_selects() {
        assert!(matches!(
            parse("people[?age > `30`].name").unwrap(),
            Ast::FilterProjection { .. }
        ));
        assert!(matches!(parse("a.[b, c]").unwrap(), Ast::Subexpr { .. }));
        assert!(matches!(
            parse("{name: a, value: b.c}").unwrap(),
            Ast::MultiHash(_)
        ));
    }

    #[test]
    fn parses_functions_and_exprefs() {
        match parse("sort_by(@, &name)").unwrap() {
            Ast::Function { name, args } => {
                assert_eq!("sort_by", name);
                assert_eq!(2, args.len());
                assert!(matches!(args[1], Ast::Expref(_)));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(parse("a.").is_err());
        assert!(parse("a[").is_err());
        assert!(parse("[?]").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("a[1:2:0]").is_err());
        assert!(parse("\"quoted\"(x)").is_err());
        match parse(".a") {
            Err(JsonQueryError::PathSyntax { .. }) => {}
            other => panic!("expected syntax error, got {:?}", other),
        }
    }
}
