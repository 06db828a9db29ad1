//! Query JSON documents with JSONPath or JMESPath.
//!
//! Both engines share one value model ([`Value`]) and one document
//! parser/serializer ([`json`]). The text-in/text-out entry point is
//! [`evaluate`]; for working with already-parsed values there are the
//! [`JsonPathQuery`] and [`JmesPathQuery`] extension traits.

mod errors;
pub mod jmespath;
pub mod json;
pub mod jsonpath;
pub mod value;

pub use errors::*;
pub use json::{NonFinitePolicy, ParseOptions, SerializeOptions};
pub use jsonpath::Match;
pub use value::Value;

use std::str::FromStr;

/// The library version, as reported by the CLI and bindings.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryLang {
    JsonPath,
    JmesPath,
}

impl FromStr for QueryLang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jsonpath" => Ok(QueryLang::JsonPath),
            "jmespath" => Ok(QueryLang::JmesPath),
            other => Err(format!(
                "unknown query language '{}', expected 'jsonpath' or 'jmespath'",
                other
            )),
        }
    }
}

/// What a JSONPath query reports for each match: the value itself or its
/// normalized path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultMode {
    #[default]
    Value,
    Path,
}

impl FromStr for ResultMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "value" => Ok(ResultMode::Value),
            "path" => Ok(ResultMode::Path),
            other => Err(format!(
                "unknown result mode '{}', expected 'value' or 'path'",
                other
            )),
        }
    }
}

/// Parse `document`, run `query` against it and serialize the result.
///
/// JSONPath returns a JSON array holding every match (values or normalized
/// paths depending on `mode`). JMESPath returns its single result value and
/// only supports [`ResultMode::Value`].
pub fn evaluate(
    document: &str,
    query: &str,
    lang: QueryLang,
    mode: ResultMode,
    options: &SerializeOptions,
) -> JsonQueryResult<String> {
    let root = json::parse(document)?;
    log::debug!("evaluating {:?} query: {}", lang, query);
    let result = match lang {
        QueryLang::JsonPath => {
            let matches = jsonpath::query(&root, query)?;
            log::debug!("query matched {} node(s)", matches.len());
            match mode {
                ResultMode::Value => {
                    Value::Array(matches.into_iter().map(|m| m.value).collect())
                }
                ResultMode::Path => Value::Array(
                    matches
                        .into_iter()
                        .map(|m| Value::String(m.path))
                        .collect(),
                ),
            }
        }
        QueryLang::JmesPath => {
            if mode == ResultMode::Path {
                return Err(JsonQueryError::eval(
                    "JMESPath produces a single value, not a node list; path output is unavailable",
                ));
            }
            jmespath::search(&root, query)?
        }
    };
    json::to_string_with_options(&result, options)
}

pub trait JsonPathQuery {
    fn query(&self, jsonpath: &str) -> JsonQueryResult<Vec<Value>>;
    fn query_with_paths(&self, jsonpath: &str) -> JsonQueryResult<Vec<Match>>;
}

impl JsonPathQuery for Value {
    fn query(&self, jsonpath: &str) -> JsonQueryResult<Vec<Value>> {
        let matches = jsonpath::query(self, jsonpath)?;
        Ok(matches.into_iter().map(|m| m.value).collect())
    }

    fn query_with_paths(&self, jsonpath: &str) -> JsonQueryResult<Vec<Match>> {
        jsonpath::query(self, jsonpath)
    }
}

pub trait JmesPathQuery {
    fn search(&self, expression: &str) -> JsonQueryResult<Value>;
}

impl JmesPathQuery for Value {
    fn search(&self, expression: &str) -> JsonQueryResult<Value> {
        jmespath::search(self, expression)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_is_the_package_version() {
        assert_eq!(env!("CARGO_PKG_VERSION"), version());
    }

    #[test]
    fn evaluate_jsonpath_values_and_paths() {
        let doc = r#"{"store": {"book": [{"title": "a"}, {"title": "b"}]}}"#;
        let values = evaluate(
            doc,
            "$.store.book[*].title",
            QueryLang::JsonPath,
            ResultMode::Value,
            &SerializeOptions::default(),
        )
        .unwrap();
        assert_eq!(r#"["a","b"]"#, values);

        let paths = evaluate(
            doc,
            "$.store.book[*].title",
            QueryLang::JsonPath,
            ResultMode::Path,
            &SerializeOptions::default(),
        )
        .unwrap();
        assert_eq!(
            r#"["$['store']['book'][0]['title']","$['store']['book'][1]['title']"]"#,
            paths
        );
    }

    #[test]
    fn evaluate_jmespath_rejects_path_mode() {
        let result = evaluate(
            "{}",
            "@",
            QueryLang::JmesPath,
            ResultMode::Path,
            &SerializeOptions::default(),
        );
        assert!(matches!(result, Err(JsonQueryError::Eval(_))));
    }

    #[test]
    fn lang_and_mode_parse_from_cli_words() {
        assert_eq!(Ok(QueryLang::JmesPath), "JMESPath".parse());
        assert_eq!(Ok(ResultMode::Path), "path".parse());
        assert!("xpath".parse::<QueryLang>().is_err());
    }
}
