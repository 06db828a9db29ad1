//! The JMESPath engine: lexer, Pratt parser and tree evaluator. A search
//! always produces exactly one value; queries that select nothing produce
//! `null` rather than an error.

pub mod ast;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::Ast;

use crate::errors::JsonQueryResult;
use crate::value::Value;

/// Parse and evaluate a JMESPath expression against `root`.
pub fn search(root: &Value, expression: &str) -> JsonQueryResult<Value> {
    let ast = parser::parse(expression)?;
    eval::search(root, &ast)
}
