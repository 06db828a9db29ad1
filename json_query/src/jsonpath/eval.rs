mod functions;
mod matches;

pub use matches::Match;

use crate::errors::{JsonQueryError, JsonQueryResult};
use crate::jsonpath::tokenizer::{
    ArraySlicePathToken, CompareOp, FilterExpr, PredicatePathToken, PropertyPathToken, Token,
    UnionMember, UnionPathToken,
};
use crate::value::Value;

use matches::{append_index, append_name};

const MAX_EVAL_DEPTH: usize = 256;

/// Evaluates a token list against a document, producing the ordered match
/// sequence. Each selector maps the current sequence of (value, path) nodes
/// to the next one; the whole query is a left-to-right fold over selectors.
///
/// `root` is the document root and never rebound, so `$` inside nested
/// filters still means the whole document. `depth` counts filter nesting.
pub struct Eval<'a> {
    root: &'a Value,
    max_depth: usize,
    depth: usize,
}

/// A working node in the pipeline: borrowed value plus the normalized path
/// that led to it.
struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Eval<'a> {
    pub fn new(root: &'a Value) -> Self {
        Eval {
            root,
            max_depth: MAX_EVAL_DEPTH,
            depth: 0,
        }
    }

    pub fn eval(&self, tokens: &[Token]) -> JsonQueryResult<Vec<Match>> {
        self.eval_from(self.root, tokens)
    }

    /// Runs the pipeline starting at `start`, which is the document root for
    /// whole queries and the current node for `@` paths inside filters.
    fn eval_from(&self, start: &'a Value, tokens: &[Token]) -> JsonQueryResult<Vec<Match>> {
        let (root_char, selectors) = match tokens.split_first() {
            Some((Token::Root(root), rest)) => (root.root_path_char, rest),
            _ => {
                return Err(JsonQueryError::eval(
                    "the jsonpath must begin with a root token",
                ))
            }
        };

        // A trailing function builds new values, everything before it only
        // borrows from the document.
        let (selectors, tail_function) = match selectors.split_last() {
            Some((Token::Function(f), rest)) => (rest, Some(f.function)),
            _ => (selectors, None),
        };

        let mut seq = vec![Node {
            value: start,
            path: root_char.to_string(),
        }];
        for token in selectors {
            seq = self.apply_token(token, seq)?;
            if seq.is_empty() {
                break;
            }
        }

        let matches = seq
            .into_iter()
            .filter_map(|node| match tail_function {
                None => Some(Match {
                    value: node.value.clone(),
                    path: node.path,
                }),
                // Wrong input shape drops the match, per the error-as-false
                // convention.
                Some(f) => functions::apply(f, node.value).map(|value| Match {
                    value,
                    path: node.path,
                }),
            })
            .collect();
        Ok(matches)
    }

    fn apply_token(&self, token: &Token, seq: Vec<Node<'a>>) -> JsonQueryResult<Vec<Node<'a>>> {
        let mut out = Vec::new();
        for node in &seq {
            match token {
                Token::Property(property) => self.apply_property(property, node, &mut out),
                Token::ArrayIndex(index) => self.apply_indexes(&index.indexes, node, &mut out),
                Token::ArraySlice(slice) => self.apply_slice(slice, node, &mut out),
                Token::Union(union) => self.apply_union(union, node, &mut out),
                Token::Wildcard(_) => self.apply_wildcard(node, &mut out),
                Token::Scan(_) => self.apply_scan(node, &mut out)?,
                Token::Predicate(predicate) => self.apply_filter(predicate, node, &mut out)?,
                Token::Root(_) | Token::Function(_) => {
                    return Err(JsonQueryError::eval("misplaced token in the jsonpath"));
                }
            }
        }
        Ok(out)
    }

    fn apply_property(&self, token: &PropertyPathToken, node: &Node<'a>, out: &mut Vec<Node<'a>>) {
        for name in &token.properties {
            if let Some(child) = node.value.get(name) {
                out.push(Node {
                    value: child,
                    path: append_name(&node.path, name),
                });
            }
        }
    }

    fn apply_indexes(&self, indexes: &[i64], node: &Node<'a>, out: &mut Vec<Node<'a>>) {
        let Some(items) = node.value.as_array() else {
            return;
        };
        for &index in indexes {
            let resolved = if index < 0 {
                index + items.len() as i64
            } else {
                index
            };
            if resolved >= 0 && (resolved as usize) < items.len() {
                out.push(Node {
                    value: &items[resolved as usize],
                    path: append_index(&node.path, resolved as usize),
                });
            }
        }
    }

    fn apply_slice(&self, token: &ArraySlicePathToken, node: &Node<'a>, out: &mut Vec<Node<'a>>) {
        let Some(items) = node.value.as_array() else {
            return;
        };
        for i in slice_positions(items.len(), token.start, token.end, token.step) {
            out.push(Node {
                value: &items[i],
                path: append_index(&node.path, i),
            });
        }
    }

    fn apply_union(&self, token: &UnionPathToken, node: &Node<'a>, out: &mut Vec<Node<'a>>) {
        for member in &token.members {
            match member {
                UnionMember::Name(name) => self.apply_property(
                    &PropertyPathToken {
                        properties: vec![name.clone()],
                    },
                    node,
                    out,
                ),
                UnionMember::Index(index) => self.apply_indexes(&[*index], node, out),
                UnionMember::Slice { start, end, step } => self.apply_slice(
                    &ArraySlicePathToken {
                        start: *start,
                        end: *end,
                        step: *step,
                    },
                    node,
                    out,
                ),
            }
        }
    }

    fn apply_wildcard(&self, node: &Node<'a>, out: &mut Vec<Node<'a>>) {
        match node.value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    out.push(Node {
                        value: item,
                        path: append_index(&node.path, i),
                    });
                }
            }
            Value::Object(members) => {
                for (key, value) in members {
                    out.push(Node {
                        value,
                        path: append_name(&node.path, key),
                    });
                }
            }
            _ => {}
        }
    }

    /// Emits the node itself and then every descendant, depth first in
    /// document order.
    fn apply_scan(&self, node: &Node<'a>, out: &mut Vec<Node<'a>>) -> JsonQueryResult<()> {
        self.collect_descendants(node.value, node.path.clone(), out, 0)
    }

    fn collect_descendants(
        &self,
        value: &'a Value,
        path: String,
        out: &mut Vec<Node<'a>>,
        depth: usize,
    ) -> JsonQueryResult<()> {
        if depth >= self.max_depth {
            return Err(JsonQueryError::DepthExceeded(self.max_depth));
        }
        out.push(Node {
            value,
            path: path.clone(),
        });
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.collect_descendants(item, append_index(&path, i), out, depth + 1)?;
                }
            }
            Value::Object(members) => {
                for (key, child) in members {
                    self.collect_descendants(child, append_name(&path, key), out, depth + 1)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Keeps the elements of each container for which the predicate is
    /// truthy. Applies to array elements and object member values alike;
    /// scalars produce nothing.
    fn apply_filter(
        &self,
        token: &PredicatePathToken,
        node: &Node<'a>,
        out: &mut Vec<Node<'a>>,
    ) -> JsonQueryResult<()> {
        match node.value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if self.filter_matches(&token.filter, item)? {
                        out.push(Node {
                            value: item,
                            path: append_index(&node.path, i),
                        });
                    }
                }
            }
            Value::Object(members) => {
                for (key, value) in members {
                    if self.filter_matches(&token.filter, value)? {
                        out.push(Node {
                            value,
                            path: append_name(&node.path, key),
                        });
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

// Filter predicate evaluation. Type mismatches and missing paths make the
// predicate false; only depth exhaustion is a real error.
impl<'a> Eval<'a> {
    fn filter_matches(&self, expr: &FilterExpr, current: &'a Value) -> JsonQueryResult<bool> {
        match expr {
            FilterExpr::Path(tokens) => Ok(!self.eval_embedded(tokens, current)?.is_empty()),
            FilterExpr::And(lhs, rhs) => {
                Ok(self.filter_matches(lhs, current)? && self.filter_matches(rhs, current)?)
            }
            FilterExpr::Or(lhs, rhs) => {
                Ok(self.filter_matches(lhs, current)? || self.filter_matches(rhs, current)?)
            }
            FilterExpr::Not(inner) => Ok(!self.filter_matches(inner, current)?),
            FilterExpr::Compare { op, lhs, rhs } => {
                let lhs = self.filter_value(lhs, current)?;
                let rhs = self.filter_value(rhs, current)?;
                Ok(match (lhs, rhs) {
                    (Some(l), Some(r)) => compare_values(*op, &l, &r).unwrap_or(false),
                    _ => false,
                })
            }
            FilterExpr::Literal(v) => Ok(is_truthy(v)),
            FilterExpr::Function { .. } => Ok(self
                .filter_value(expr, current)?
                .map(|v| is_truthy(&v))
                .unwrap_or(false)),
        }
    }

    fn filter_value(&self, expr: &FilterExpr, current: &'a Value) -> JsonQueryResult<Option<Value>> {
        match expr {
            FilterExpr::Literal(v) => Ok(Some(v.clone())),
            // Comparisons use the first match; a path with no matches has no
            // value.
            FilterExpr::Path(tokens) => Ok(self
                .eval_embedded(tokens, current)?
                .into_iter()
                .next()
                .map(|m| m.value)),
            FilterExpr::Function { function, args } => {
                use crate::jsonpath::tokenizer::PathFunction;
                if *function == PathFunction::Count {
                    if let [FilterExpr::Path(tokens)] = args.as_slice() {
                        let count = self.eval_embedded(tokens, current)?.len();
                        return Ok(Some(Value::Int(count as i64)));
                    }
                }
                match args.as_slice() {
                    [arg] => {
                        let value = self.filter_value(arg, current)?;
                        Ok(value.and_then(|v| functions::apply(*function, &v)))
                    }
                    _ => Ok(None),
                }
            }
            FilterExpr::Compare { .. }
            | FilterExpr::And(..)
            | FilterExpr::Or(..)
            | FilterExpr::Not(_) => {
                Ok(Some(Value::Bool(self.filter_matches(expr, current)?)))
            }
        }
    }

    /// Nested evaluation keeps the document root, so `$` paths resolve
    /// against the whole document even inside a filter inside a filter.
    fn eval_embedded(&self, tokens: &[Token], current: &'a Value) -> JsonQueryResult<Vec<Match>> {
        if self.depth >= self.max_depth {
            return Err(JsonQueryError::DepthExceeded(self.max_depth));
        }
        let nested = Eval {
            root: self.root,
            max_depth: self.max_depth,
            depth: self.depth + 1,
        };
        let start = match tokens.first() {
            Some(Token::Root(root)) if root.root_path_char == '@' => current,
            _ => self.root,
        };
        nested.eval_from(start, tokens)
    }
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// Compares with engine-level numeric coercion: ints and doubles compare
/// numerically, strings lexicographically. Anything else supports only
/// equality; incompatible kinds yield `None`, which filters read as false.
fn compare_values(op: CompareOp, lhs: &Value, rhs: &Value) -> Option<bool> {
    use std::cmp::Ordering;

    let ordering = if lhs.is_number() && rhs.is_number() {
        lhs.as_f64()?.partial_cmp(&rhs.as_f64()?)
    } else if lhs.is_string() && rhs.is_string() {
        Some(lhs.as_str()?.cmp(rhs.as_str()?))
    } else {
        let eq = lhs == rhs;
        return match op {
            CompareOp::Eq => Some(eq),
            CompareOp::Ne => Some(!eq),
            _ => None,
        };
    };
    let ordering = ordering?;
    Some(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    })
}

/// Python slice semantics: start inclusive, end exclusive, step sign picks
/// the direction. Out-of-range bounds clamp instead of failing.
fn slice_positions(
    len: usize,
    start: Option<i64>,
    end: Option<i64>,
    step: Option<i64>,
) -> Vec<usize> {
    let len = len as i64;
    let step = step.unwrap_or(1);
    let resolve = |v: i64| if v < 0 { v + len } else { v };
    let mut positions = Vec::new();
    if step > 0 {
        let mut i = start.map(resolve).unwrap_or(0).clamp(0, len);
        let end = end.map(resolve).unwrap_or(len).clamp(0, len);
        while i < end {
            positions.push(i as usize);
            i += step;
        }
    } else {
        let mut i = start.map(resolve).unwrap_or(len - 1).clamp(-1, len - 1);
        let end = end.map(resolve).unwrap_or(-1).clamp(-1, len - 1);
        while i > end {
            positions.push(i as usize);
            i += step;
        }
    }
    positions
}

#[cfg(test)]
mod test {
    use super::{Eval, Match};
    use crate::errors::JsonQueryResult;
    use crate::json::parse;
    use crate::jsonpath::tokenizer::Tokenizer;
    use crate::value::Value;

    fn query(json: &str, path: &str) -> JsonQueryResult<Vec<Match>> {
        let doc = parse(json).unwrap();
        let tokens = Tokenizer::new().tokenize(path)?;
        Eval::new(&doc).eval(&tokens)
    }

    fn values(json: &str, path: &str) -> Vec<Value> {
        query(json, path)
            .unwrap()
            .into_iter()
            .map(|m| m.value)
            .collect()
    }

    fn paths(json: &str, path: &str) -> Vec<String> {
        query(json, path)
            .unwrap()
            .into_iter()
            .map(|m| m.path)
            .collect()
    }

    #[test]
    fn root_query_yields_the_document_itself() {
        let matches = query(r#"{"data": {"msg": "hello"}}"#, "$").unwrap();
        assert_eq!(1, matches.len());
        assert_eq!("$", matches[0].path);
        assert_eq!(parse(r#"{"data": {"msg": "hello"}}"#).unwrap(), matches[0].value);
    }

    #[test]
    fn can_query_single_property() {
        assert_eq!(
            vec![Value::from("hello")],
            values(r#"{"data": {"msg": "hello"}}"#, "$.data.msg")
        );
    }

    #[test]
    fn can_query_multiple_bracket_properties() {
        assert_eq!(
            vec![Value::from("hello"), Value::from("jsonpath")],
            values(
                r#"{"data": {"msg": "hello"}, "value": {"msg": "jsonpath"}}"#,
                "$['data','value'].msg"
            )
        );
    }

    #[test]
    fn wildcard_preserves_member_order() {
        assert_eq!(
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
            values(r#"{"b": 1, "a": 2, "c": 3}"#, "$.*")
        );
    }

    #[test]
    fn can_scan_properties_with_arrays() {
        assert_eq!(
            vec![Value::from("hello"), Value::from("jsonpath"), Value::from("!")],
            values(
                r#"{"data": {"items": [{"msg": "jsonpath"}, {"msg": "!"}], "msg": "hello"}}"#,
                "$.data..msg"
            )
        );
    }

    #[test]
    fn slices_follow_python_semantics() {
        let json = "[0,1,2,3,4]";
        assert_eq!(vec![Value::Int(1), Value::Int(2)], values(json, "$[1:3]"));
        assert_eq!(vec![Value::Int(3), Value::Int(4)], values(json, "$[-2:]"));
        assert_eq!(
            vec![Value::Int(0), Value::Int(2), Value::Int(4)],
            values(json, "$[::2]")
        );
        assert_eq!(
            vec![
                Value::Int(4),
                Value::Int(3),
                Value::Int(2),
                Value::Int(1),
                Value::Int(0)
            ],
            values(json, "$[::-1]")
        );
        assert!(values(json, "$[9:]").is_empty());
        assert!(values(json, "$[5]").is_empty());
    }

    #[test]
    fn unions_preserve_declared_order_and_duplicates() {
        assert_eq!(
            vec![Value::Int(2), Value::Int(0), Value::Int(0)],
            values("[0,1,2]", "$[2,0,0]")
        );
        // Non-arrays simply produce nothing for the index step.
        assert_eq!(
            vec![Value::Int(0)],
            values(r#"{"name": "x", "items": [0]}"#, "$['name', 'items'][0]")
        );
    }

    #[test]
    fn filters_keep_matching_elements() {
        let json = r#"[{"price": 5}, {"price": 15}, {"x": 1}]"#;
        assert_eq!(
            vec![parse(r#"{"price": 15}"#).unwrap()],
            values(json, "$[?(@.price > 10)]")
        );
        assert_eq!(
            vec![parse(r#"{"price": 5}"#).unwrap(), parse(r#"{"price": 15}"#).unwrap()],
            values(json, "$[?(@.price)]")
        );
    }

    #[test]
    fn filter_comparison_operators() {
        let json = r#"[{"n": 1}, {"n": 2}, {"n": 3}]"#;
        assert_eq!(
            vec![parse(r#"{"n": 2}"#).unwrap()],
            values(json, "$[?(@.n == 2)]")
        );
        assert_eq!(2, values(json, "$[?(@.n != 2)]").len());
        assert_eq!(1, values(json, "$[?(@.n < 2)]").len());
        assert_eq!(2, values(json, "$[?(@.n <= 2)]").len());
        assert_eq!(1, values(json, "$[?(@.n > 2)]").len());
        assert_eq!(2, values(json, "$[?(@.n >= 2)]").len());
    }

    #[test]
    fn absolute_paths_in_nested_filters_use_the_document_root() {
        // The inner $ must still mean the whole document, not the row the
        // outer filter is visiting.
        let json = r#"{"limit": 1, "rows": [[5], [7]]}"#;
        assert_eq!(
            vec![parse("[5]").unwrap(), parse("[7]").unwrap()],
            values(json, "$.rows[?(@[?($.limit == 1)])]")
        );
        assert!(values(json, "$.rows[?(@[?($.limit == 2)])]").is_empty());
    }

    #[test]
    fn nested_filter_evaluation_is_bounded() {
        use crate::jsonpath::tokenizer::{
            FilterExpr, PredicatePathToken, RootPathToken, Token,
        };
        let mut embedded = vec![Token::Root(RootPathToken {
            root_path_char: '@',
        })];
        for _ in 0..300 {
            embedded = vec![
                Token::Root(RootPathToken {
                    root_path_char: '@',
                }),
                Token::Predicate(PredicatePathToken {
                    filter: FilterExpr::Path(embedded),
                }),
            ];
        }
        let mut doc = Value::Int(1);
        for _ in 0..310 {
            doc = Value::Array(vec![doc]);
        }
        assert!(matches!(
            Eval::new(&doc).eval(&embedded),
            Err(crate::errors::JsonQueryError::DepthExceeded(_))
        ));
    }

    #[test]
    fn filter_type_mismatch_is_false_not_an_error() {
        let json = r#"[{"x": 1}, {"x": 2}]"#;
        assert!(values(json, "$[?(@.x > 'str')]").is_empty());
        assert!(values(json, "$[?(@.missing > 1)]").is_empty());
    }

    #[test]
    fn filter_logic_and_literals() {
        let json = r#"[{"a": 1, "b": "x"}, {"a": 2, "b": "y"}, {"a": 3}]"#;
        assert_eq!(
            vec![parse(r#"{"a": 2, "b": "y"}"#).unwrap()],
            values(json, "$[?(@.a > 1 && @.b == 'y')]")
        );
        assert_eq!(
            vec![parse(r#"{"a": 1, "b": "x"}"#).unwrap(), parse(r#"{"a": 3}"#).unwrap()],
            values(json, "$[?(@.a == 1 || !@.b)]")
        );
    }

    #[test]
    fn filter_functions_and_absolute_paths() {
        let json = r#"{"limit": 2, "rows": [[1], [1,2,3], []]}"#;
        assert_eq!(
            vec![parse("[1,2,3]").unwrap()],
            values(json, "$.rows[?(length(@) > $.limit)]")
        );
    }

    #[test]
    fn tail_functions_map_each_match() {
        let json = r#"{"a": [1,2,3], "b": [4,5]}"#;
        assert_eq!(
            vec![Value::Int(3), Value::Int(2)],
            values(json, "$.*.length()")
        );
        // Type mismatches drop the match instead of failing.
        assert!(values(r#"{"a": 1}"#, "$.a.keys()").is_empty());
    }

    #[test]
    fn paths_are_normalized_bracket_notation() {
        let json = r#"{"store": {"book": [{"title": "t"}]}}"#;
        assert_eq!(
            vec!["$['store']['book'][0]['title']".to_string()],
            paths(json, "$.store.book[0].title")
        );
        assert_eq!(vec!["$[4]".to_string()], paths("[0,1,2,3,4]", "$[-1]"));
    }

    #[test]
    fn scan_depth_is_bounded() {
        let mut json = String::new();
        for _ in 0..300 {
            json.push_str("{\"a\":");
        }
        json.push_str("1");
        for _ in 0..300 {
            json.push('}');
        }
        let doc = crate::json::parse_with_options(
            &json,
            &crate::json::ParseOptions { max_depth: 400 },
        )
        .unwrap();
        let tokens = Tokenizer::new().tokenize("$..a").unwrap();
        assert!(matches!(
            Eval::new(&doc).eval(&tokens),
            Err(crate::errors::JsonQueryError::DepthExceeded(_))
        ));
    }
}
