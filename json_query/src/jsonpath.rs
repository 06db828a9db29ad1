//! The JSONPath engine: selector tokenizer plus sequence evaluator. A query
//! produces an ordered sequence of matches, each carrying the value and its
//! normalized path.

pub mod eval;
pub mod tokenizer;

pub use eval::{Eval, Match};
pub use tokenizer::Tokenizer;

use crate::errors::JsonQueryResult;
use crate::value::Value;

/// Parse and evaluate a JSONPath query against `root`.
pub fn query(root: &Value, jsonpath: &str) -> JsonQueryResult<Vec<Match>> {
    let tokens = Tokenizer::new().tokenize(jsonpath)?;
    Eval::new(root).eval(&tokens)
}
