use json_query::{json, JsonPathQuery, Value};

#[test]
fn json_path_query_api_works() {
    let doc = json::parse(r#"{"greetings": "hello, json_query"}"#).unwrap();
    let result = doc.query("$.['greetings']").unwrap();
    assert_eq!(vec![Value::from("hello, json_query")], result);
}

#[test]
fn root_query_yields_the_document_itself() {
    let doc = json::parse(r#"{"a": [1, 2]}"#).unwrap();
    let matches = doc.query_with_paths("$").unwrap();
    assert_eq!(1, matches.len());
    assert_eq!(doc, matches[0].value);
    assert_eq!("$", matches[0].path);
}

#[test]
fn wildcard_preserves_declaration_order() {
    let doc = json::parse(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
    let result = doc.query("$.*").unwrap();
    assert_eq!(
        vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        result
    );
}

#[test]
fn slices_follow_python_semantics() {
    let doc = json::parse("[0, 1, 2, 3, 4]").unwrap();
    assert_eq!(
        vec![Value::Int(1), Value::Int(2)],
        doc.query("$[1:3]").unwrap()
    );
    assert_eq!(
        vec![Value::Int(3), Value::Int(4)],
        doc.query("$[-2:]").unwrap()
    );
}

#[test]
fn filter_type_mismatch_is_false_not_an_error() {
    let doc = json::parse(r#"[{"x": 1}, {"x": 2}]"#).unwrap();
    let result = doc.query("$[?(@.x > 'str')]").unwrap();
    assert!(result.is_empty());
}

#[test]
fn recursive_descent_walks_the_whole_tree() {
    let doc = json::parse(
        r#"{"store": {"book": [{"price": 8}, {"price": 13}], "bicycle": {"price": 20}}}"#,
    )
    .unwrap();
    let result = doc.query("$..price").unwrap();
    assert_eq!(
        vec![Value::Int(8), Value::Int(13), Value::Int(20)],
        result
    );
}

#[test]
fn matches_report_normalized_paths() {
    let doc = json::parse(r#"{"a": {"b": [10, 20]}}"#).unwrap();
    let matches = doc.query_with_paths("$.a.b[*]").unwrap();
    let paths: Vec<&str> = matches.iter().map(|m| m.path.as_str()).collect();
    assert_eq!(vec!["$['a']['b'][0]", "$['a']['b'][1]"], paths);
}

#[test]
fn malformed_queries_are_syntax_errors() {
    let doc = json::parse("{}").unwrap();
    assert!(doc.query("$[").is_err());
    assert!(doc.query("$.a[?(@.b >)]").is_err());
}
