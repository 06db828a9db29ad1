//! Filter predicate expressions: the boolean language inside `[?(...)]`.
//!
//! Grammar, loosest first: `||`, `&&`, `!`, comparisons, primaries. A
//! primary is a relative path (`@...`), an absolute path (`$...`), a
//! literal, a function call, or a parenthesized expression. Evaluation is
//! in `eval.rs`; type errors there are false, never raised.

use crate::errors::{JsonQueryError, JsonQueryResult};
use crate::value::Value;

use super::constants::{
    AND, BEGIN_FILTER, CLOSE_PARENTHESIS, CLOSE_SQUARE_BRACKET, DOC_CONTEXT, DOUBLE_QUOTE, EQUAL,
    EVAL_CONTEXT, GREATER, LESS, MINUS, NOT, OPEN_PARENTHESIS, OR, SINGLE_QUOTE,
};
use super::stream::{PeekableExt, TokenStream};
use super::tokens::{PathFunction, Token};
use super::Tokenizer;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// An embedded path, `@...` or `$...`. Bare paths are existence tests.
    Path(Vec<Token>),
    Literal(Value),
    Compare {
        op: CompareOp,
        lhs: Box<FilterExpr>,
        rhs: Box<FilterExpr>,
    },
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Function {
        function: PathFunction,
        args: Vec<FilterExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Nesting bound for parentheses and `!` chains, so adversarial filter text
/// cannot grow the parse stack without limit.
const MAX_FILTER_DEPTH: usize = 128;

/// Parses the body of a filter selector. The caller has consumed `[?` and
/// passes its own nesting depth, since an embedded path may carry another
/// filter. This consumes through the closing `]`. Parentheses need no
/// special casing here, a parenthesized expression is an ordinary primary.
pub fn read_filter(
    tokenizer: &Tokenizer,
    stream: &mut TokenStream,
    depth: usize,
) -> JsonQueryResult<FilterExpr> {
    let expr = parse_or(tokenizer, stream, depth)?;
    match stream.next_significant() {
        Some(CLOSE_SQUARE_BRACKET) => Ok(expr),
        _ => Err(stream.error("expected ']' closing the filter")),
    }
}

fn parse_or(
    tokenizer: &Tokenizer,
    stream: &mut TokenStream,
    depth: usize,
) -> JsonQueryResult<FilterExpr> {
    let mut lhs = parse_and(tokenizer, stream, depth)?;
    while stream.peek_significant() == Some(&OR) && stream.peek_ahead(1) == Some(OR) {
        stream.next();
        stream.next();
        let rhs = parse_and(tokenizer, stream, depth)?;
        lhs = FilterExpr::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_and(
    tokenizer: &Tokenizer,
    stream: &mut TokenStream,
    depth: usize,
) -> JsonQueryResult<FilterExpr> {
    let mut lhs = parse_unary(tokenizer, stream, depth)?;
    while stream.peek_significant() == Some(&AND) && stream.peek_ahead(1) == Some(AND) {
        stream.next();
        stream.next();
        let rhs = parse_unary(tokenizer, stream, depth)?;
        lhs = FilterExpr::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_unary(
    tokenizer: &Tokenizer,
    stream: &mut TokenStream,
    depth: usize,
) -> JsonQueryResult<FilterExpr> {
    if depth >= MAX_FILTER_DEPTH {
        return Err(JsonQueryError::DepthExceeded(MAX_FILTER_DEPTH));
    }
    if stream.peek_significant() == Some(&NOT) && stream.peek_ahead(1) != Some(EQUAL) {
        stream.next();
        let inner = parse_unary(tokenizer, stream, depth + 1)?;
        return Ok(FilterExpr::Not(Box::new(inner)));
    }
    parse_comparison(tokenizer, stream, depth)
}

fn parse_comparison(
    tokenizer: &Tokenizer,
    stream: &mut TokenStream,
    depth: usize,
) -> JsonQueryResult<FilterExpr> {
    let lhs = parse_primary(tokenizer, stream, depth)?;
    let peeked = stream.peek_significant().copied();
    let op = match peeked {
        Some(EQUAL) if stream.peek_ahead(1) == Some(EQUAL) => {
            stream.next();
            stream.next();
            CompareOp::Eq
        }
        Some(NOT) if stream.peek_ahead(1) == Some(EQUAL) => {
            stream.next();
            stream.next();
            CompareOp::Ne
        }
        Some(LESS) => {
            stream.next();
            if stream.next_if(|c| *c == EQUAL).is_some() {
                CompareOp::Le
            } else {
                CompareOp::Lt
            }
        }
        Some(GREATER) => {
            stream.next();
            if stream.next_if(|c| *c == EQUAL).is_some() {
                CompareOp::Ge
            } else {
                CompareOp::Gt
            }
        }
        _ => return Ok(lhs),
    };
    let rhs = parse_primary(tokenizer, stream, depth)?;
    Ok(FilterExpr::Compare {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn parse_primary(
    tokenizer: &Tokenizer,
    stream: &mut TokenStream,
    depth: usize,
) -> JsonQueryResult<FilterExpr> {
    match stream.peek_significant() {
        Some(&OPEN_PARENTHESIS) => {
            stream.next();
            let inner = parse_or(tokenizer, stream, depth + 1)?;
            match stream.next_significant() {
                Some(CLOSE_PARENTHESIS) => Ok(inner),
                _ => Err(stream.error("expected ')'")),
            }
        }
        Some(&EVAL_CONTEXT) | Some(&DOC_CONTEXT) => {
            let tokens = tokenizer.tokenize_embedded(stream, depth + 1)?;
            Ok(FilterExpr::Path(tokens))
        }
        Some(&SINGLE_QUOTE) | Some(&DOUBLE_QUOTE) => {
            let s = stream.read_quoted_string()?;
            Ok(FilterExpr::Literal(Value::String(s)))
        }
        Some(c) if c.is_ascii_digit() || *c == MINUS => {
            let n = stream.read_number_value()?;
            Ok(FilterExpr::Literal(n))
        }
        Some(c) if c.is_alphabetic() || *c == '_' => parse_word(tokenizer, stream, depth),
        Some(&BEGIN_FILTER) => Err(stream.error("nested filters are not supported")),
        _ => Err(stream.error("expected filter expression")),
    }
}

/// `true`, `false`, `null`, or a function call.
fn parse_word(
    tokenizer: &Tokenizer,
    stream: &mut TokenStream,
    depth: usize,
) -> JsonQueryResult<FilterExpr> {
    let start = stream.pos();
    let mut word = String::new();
    while let Some(c) = stream.peek() {
        if c.is_alphanumeric() || *c == '_' {
            word.push(*c);
            stream.next();
        } else {
            break;
        }
    }
    match word.as_str() {
        "true" => return Ok(FilterExpr::Literal(Value::Bool(true))),
        "false" => return Ok(FilterExpr::Literal(Value::Bool(false))),
        "null" => return Ok(FilterExpr::Literal(Value::Null)),
        _ => {}
    }
    if stream.peek_significant() != Some(&OPEN_PARENTHESIS) {
        return Err(JsonQueryError::path_syntax(
            start,
            format!("unexpected word '{}' in filter", word),
        ));
    }
    let function = PathFunction::from_name(&word).ok_or_else(|| {
        JsonQueryError::path_syntax(start, format!("unknown function '{}'", word))
    })?;
    stream.next();
    let mut args = Vec::new();
    if stream.peek_significant() == Some(&CLOSE_PARENTHESIS) {
        stream.next();
    } else {
        loop {
            args.push(parse_or(tokenizer, stream, depth + 1)?);
            match stream.next_significant() {
                Some(',') => continue,
                Some(CLOSE_PARENTHESIS) => break,
                _ => return Err(stream.error("expected ',' or ')' in function call")),
            }
        }
    }
    Ok(FilterExpr::Function { function, args })
}
