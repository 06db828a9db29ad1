//! The JMESPath builtin function library. Everything here takes already
//! evaluated argument values; the functions that take expression references
//! (`map`, `sort_by`, `min_by`, `max_by`) live in the evaluator because they
//! re-enter it.

use crate::errors::{JsonQueryError, JsonQueryResult};
use crate::json;
use crate::value::Value;

pub(crate) fn dispatch(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    match name {
        "abs" => abs(name, args),
        "avg" => avg(name, args),
        "ceil" => ceil_or_floor(name, args, f64::ceil),
        "contains" => contains(name, args),
        "ends_with" => string_pair(name, args, |s, suffix| s.ends_with(suffix)),
        "floor" => ceil_or_floor(name, args, f64::floor),
        "join" => join(name, args),
        "keys" => keys(name, args),
        "length" => length(name, args),
        "max" => extremum(name, args, true),
        "merge" => merge(name, args),
        "min" => extremum(name, args, false),
        "not_null" => not_null(name, args),
        "reverse" => reverse(name, args),
        "sort" => sort(name, args),
        "starts_with" => string_pair(name, args, |s, prefix| s.starts_with(prefix)),
        "sum" => sum(name, args),
        "to_array" => to_array(name, args),
        "to_number" => to_number(name, args),
        "to_string" => to_string(name, args),
        "type" => type_name(name, args),
        "values" => values(name, args),
        _ => Err(JsonQueryError::eval(format!("unknown function '{}'", name))),
    }
}

/// Equality with numeric coercion: JMESPath compares `1` and `1.0` equal
/// even though the value model keeps them distinct tags.
pub(crate) fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => {
            let (x, y) = (a.as_f64().unwrap(), b.as_f64().unwrap());
            (x.is_nan() && y.is_nan()) || x == y
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(va, vb)| value_eq(va, vb))
        }
        (Value::Object(_), Value::Object(_)) => {
            let x = resolved(a);
            let y = resolved(b);
            x.len() == y.len()
                && x.iter().all(|(k, va)| {
                    y.iter()
                        .find(|(kb, _)| kb == k)
                        .is_some_and(|(_, vb)| value_eq(va, vb))
                })
        }
        _ => a == b,
    }
}

/// Object members with duplicate keys collapsed to their last occurrence.
pub(crate) fn resolved(value: &Value) -> Vec<(&str, &Value)> {
    let mut out: Vec<(&str, &Value)> = Vec::new();
    if let Some(members) = value.as_object() {
        for (k, v) in members {
            match out.iter_mut().find(|(rk, _)| *rk == k.as_str()) {
                Some(slot) => slot.1 = v,
                None => out.push((k.as_str(), v)),
            }
        }
    }
    out
}

fn arity(name: &str, args: &[Value], expected: usize) -> JsonQueryResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(JsonQueryError::eval(format!(
            "{}() expects {} argument(s), got {}",
            name,
            expected,
            args.len()
        )))
    }
}

fn type_error(name: &str, wanted: &str, got: &Value) -> JsonQueryError {
    JsonQueryError::eval(format!(
        "{}() expects {}, got {}",
        name,
        wanted,
        got.kind().name()
    ))
}

fn number_items<'a>(name: &str, arg: &'a Value) -> JsonQueryResult<&'a [Value]> {
    let items = arg
        .as_array()
        .ok_or_else(|| type_error(name, "an array of numbers", arg))?;
    match items.iter().find(|v| !v.is_number()) {
        Some(bad) => Err(type_error(name, "an array of numbers", bad)),
        None => Ok(items),
    }
}

fn abs(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
        Value::Double(d) => Ok(Value::Double(d.abs())),
        other => Err(type_error(name, "a number", other)),
    }
}

fn avg(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    let items = number_items(name, &args[0])?;
    if items.is_empty() {
        return Ok(Value::Null);
    }
    let total: f64 = items.iter().filter_map(Value::as_f64).sum();
    Ok(Value::Double(total / items.len() as f64))
}

fn ceil_or_floor(name: &str, args: &[Value], round: fn(f64) -> f64) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Double(d) => {
            let r = round(*d);
            if r.is_finite() && r >= i64::MIN as f64 && r <= i64::MAX as f64 {
                Ok(Value::Int(r as i64))
            } else {
                Ok(Value::Double(r))
            }
        }
        other => Err(type_error(name, "a number", other)),
    }
}

fn contains(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Array(items), needle) => {
            Ok(Value::Bool(items.iter().any(|v| value_eq(v, needle))))
        }
        (Value::String(s), Value::String(needle)) => Ok(Value::Bool(s.contains(needle.as_str()))),
        (Value::String(_), other) => Err(type_error(name, "a string to search for", other)),
        (other, _) => Err(type_error(name, "an array or string", other)),
    }
}

fn string_pair(
    name: &str,
    args: &[Value],
    test: fn(&str, &str) -> bool,
) -> JsonQueryResult<Value> {
    arity(name, args, 2)?;
    let subject = args[0]
        .as_str()
        .ok_or_else(|| type_error(name, "a string", &args[0]))?;
    let probe = args[1]
        .as_str()
        .ok_or_else(|| type_error(name, "a string", &args[1]))?;
    Ok(Value::Bool(test(subject, probe)))
}

fn join(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 2)?;
    let glue = args[0]
        .as_str()
        .ok_or_else(|| type_error(name, "a string separator", &args[0]))?;
    let items = args[1]
        .as_array()
        .ok_or_else(|| type_error(name, "an array of strings", &args[1]))?;
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str() {
            Some(s) => parts.push(s),
            None => return Err(type_error(name, "an array of strings", item)),
        }
    }
    Ok(Value::String(parts.join(glue)))
}

fn keys(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    if !args[0].is_object() {
        return Err(type_error(name, "an object", &args[0]));
    }
    Ok(Value::Array(
        resolved(&args[0])
            .into_iter()
            .map(|(k, _)| Value::String(k.to_string()))
            .collect(),
    ))
}

fn length(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(_) => resolved(&args[0]).len(),
        other => return Err(type_error(name, "a string, array or object", other)),
    };
    Ok(Value::Int(n as i64))
}

fn extremum(name: &str, args: &[Value], largest: bool) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    let items = args[0]
        .as_array()
        .ok_or_else(|| type_error(name, "an array", &args[0]))?;
    if items.is_empty() {
        return Ok(Value::Null);
    }
    if items.iter().all(Value::is_number) {
        let mut best = &items[0];
        for item in &items[1..] {
            let ord = item.as_f64().unwrap() > best.as_f64().unwrap();
            if ord == largest {
                best = item;
            }
        }
        return Ok(best.clone());
    }
    if items.iter().all(Value::is_string) {
        let mut best = &items[0];
        for item in &items[1..] {
            let ord = item.as_str().unwrap() > best.as_str().unwrap();
            if ord == largest {
                best = item;
            }
        }
        return Ok(best.clone());
    }
    Err(JsonQueryError::eval(format!(
        "{}() expects an array of all numbers or all strings",
        name
    )))
}

fn merge(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    if args.is_empty() {
        return Err(JsonQueryError::eval(format!(
            "{}() expects at least one argument",
            name
        )));
    }
    let mut out: Vec<(String, Value)> = Vec::new();
    for arg in args {
        if !arg.is_object() {
            return Err(type_error(name, "objects", arg));
        }
        for (k, v) in resolved(arg) {
            match out.iter_mut().find(|(ok, _)| ok == k) {
                Some(slot) => slot.1 = v.clone(),
                None => out.push((k.to_string(), v.clone())),
            }
        }
    }
    Ok(Value::Object(out))
}

fn not_null(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    if args.is_empty() {
        return Err(JsonQueryError::eval(format!(
            "{}() expects at least one argument",
            name
        )));
    }
    Ok(args
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null))
}

fn reverse(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    match &args[0] {
        Value::Array(items) => Ok(Value::Array(items.iter().rev().cloned().collect())),
        Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
        other => Err(type_error(name, "an array or string", other)),
    }
}

fn sort(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    let items = args[0]
        .as_array()
        .ok_or_else(|| type_error(name, "an array", &args[0]))?;
    let mut sorted = items.to_vec();
    if items.iter().all(Value::is_number) {
        sorted.sort_by(|a, b| {
            a.as_f64()
                .unwrap()
                .partial_cmp(&b.as_f64().unwrap())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    } else if items.iter().all(Value::is_string) {
        sorted.sort_by(|a, b| a.as_str().unwrap().cmp(b.as_str().unwrap()));
    } else if !items.is_empty() {
        return Err(JsonQueryError::eval(format!(
            "{}() expects an array of all numbers or all strings",
            name
        )));
    }
    Ok(Value::Array(sorted))
}

/// An empty array sums to `Int(0)`; an all-integer array stays integral
/// unless the total overflows.
fn sum(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    let items = number_items(name, &args[0])?;
    if items.iter().all(|v| v.as_i64().is_some()) {
        let mut total = 0i64;
        let mut overflowed = false;
        for item in items {
            match total.checked_add(item.as_i64().unwrap()) {
                Some(t) => total = t,
                None => {
                    overflowed = true;
                    break;
                }
            }
        }
        if !overflowed {
            return Ok(Value::Int(total));
        }
    }
    Ok(Value::Double(items.iter().filter_map(Value::as_f64).sum()))
}

fn to_array(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    match &args[0] {
        Value::Array(_) => Ok(args[0].clone()),
        other => Ok(Value::Array(vec![other.clone()])),
    }
}

fn to_number(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    match &args[0] {
        Value::Int(_) | Value::Double(_) => Ok(args[0].clone()),
        Value::String(s) => match json::parse(s.trim()) {
            Ok(v @ (Value::Int(_) | Value::Double(_))) => Ok(v),
            _ => Ok(Value::Null),
        },
        _ => Ok(Value::Null),
    }
}

fn to_string(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    match &args[0] {
        Value::String(_) => Ok(args[0].clone()),
        other => Ok(Value::String(json::to_string(other)?)),
    }
}

fn type_name(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    Ok(Value::String(args[0].kind().name().to_string()))
}

fn values(name: &str, args: &[Value]) -> JsonQueryResult<Value> {
    arity(name, args, 1)?;
    if !args[0].is_object() {
        return Err(type_error(name, "an object", &args[0]));
    }
    Ok(Value::Array(
        resolved(&args[0])
            .into_iter()
            .map(|(_, v)| v.clone())
            .collect(),
    ))
}

#[cfg(test)]
mod test {
    use super::{dispatch, value_eq};
    use crate::errors::JsonQueryError;
    use crate::value::Value;

    fn ints(values: &[i64]) -> Value {
        Value::Array(values.iter().map(|i| Value::Int(*i)).collect())
    }

    #[test]
    fn equality_coerces_across_number_tags() {
        assert!(value_eq(&Value::Int(1), &Value::Double(1.0)));
        assert!(!value_eq(&Value::Int(1), &Value::String("1".to_string())));
    }

    #[test]
    fn numeric_aggregates() {
        assert_eq!(Value::Int(6), dispatch("sum", &[ints(&[1, 2, 3])]).unwrap());
        assert_eq!(Value::Int(0), dispatch("sum", &[ints(&[])]).unwrap());
        assert_eq!(
            Value::Double(2.0),
            dispatch("avg", &[ints(&[1, 2, 3])]).unwrap()
        );
        assert_eq!(Value::Null, dispatch("avg", &[ints(&[])]).unwrap());
        assert_eq!(Value::Int(3), dispatch("max", &[ints(&[1, 3, 2])]).unwrap());
        assert_eq!(Value::Int(1), dispatch("min", &[ints(&[1, 3, 2])]).unwrap());
    }

    #[test]
    fn rounding_returns_integers() {
        assert_eq!(
            Value::Int(2),
            dispatch("ceil", &[Value::Double(1.2)]).unwrap()
        );
        assert_eq!(
            Value::Int(1),
            dispatch("floor", &[Value::Double(1.8)]).unwrap()
        );
        assert_eq!(Value::Int(5), dispatch("abs", &[Value::Int(-5)]).unwrap());
    }

    #[test]
    fn string_functions() {
        assert_eq!(
            Value::String("a,b".to_string()),
            dispatch(
                "join",
                &[
                    Value::from(","),
                    Value::Array(vec![Value::from("a"), Value::from("b")])
                ]
            )
            .unwrap()
        );
        assert_eq!(
            Value::Bool(true),
            dispatch("starts_with", &[Value::from("abc"), Value::from("ab")]).unwrap()
        );
        assert_eq!(
            Value::Bool(false),
            dispatch("ends_with", &[Value::from("abc"), Value::from("ab")]).unwrap()
        );
        assert_eq!(
            Value::String("cba".to_string()),
            dispatch("reverse", &[Value::from("abc")]).unwrap()
        );
    }

    #[test]
    fn sort_requires_homogeneous_elements() {
        assert_eq!(
            ints(&[1, 2, 3]),
            dispatch("sort", &[ints(&[3, 1, 2])]).unwrap()
        );
        let mixed = Value::Array(vec![Value::Int(1), Value::from("a")]);
        assert!(matches!(
            dispatch("sort", &[mixed]),
            Err(JsonQueryError::Eval(_))
        ));
    }

    #[test]
    fn conversions() {
        assert_eq!(
            Value::Int(42),
            dispatch("to_number", &[Value::from("42")]).unwrap()
        );
        assert_eq!(
            Value::Null,
            dispatch("to_number", &[Value::from("nope")]).unwrap()
        );
        assert_eq!(
            Value::String("[1]".to_string()),
            dispatch("to_string", &[ints(&[1])]).unwrap()
        );
        assert_eq!(
            Value::Array(vec![Value::Int(7)]),
            dispatch("to_array", &[Value::Int(7)]).unwrap()
        );
        assert_eq!(
            Value::String("number".to_string()),
            dispatch("type", &[Value::Double(1.5)]).unwrap()
        );
    }

    #[test]
    fn object_helpers_and_merge() {
        let obj = Value::Object(vec![
            ("a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Int(2)),
        ]);
        assert_eq!(
            Value::Array(vec![Value::from("a"), Value::from("b")]),
            dispatch("keys", &[obj.clone()]).unwrap()
        );
        assert_eq!(
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            dispatch("values", &[obj.clone()]).unwrap()
        );
        let override_b = Value::Object(vec![("b".to_string(), Value::Int(9))]);
        let merged = dispatch("merge", &[obj, override_b]).unwrap();
        assert_eq!(Some(&Value::Int(9)), merged.get("b"));
        assert_eq!(Some(&Value::Int(1)), merged.get("a"));
    }

    #[test]
    fn unknown_function_is_an_eval_error() {
        assert!(matches!(
            dispatch("no_such_fn", &[]),
            Err(JsonQueryError::Eval(_))
        ));
    }

    #[test]
    fn not_null_returns_first_non_null() {
        assert_eq!(
            Value::Int(1),
            dispatch("not_null", &[Value::Null, Value::Int(1), Value::Int(2)]).unwrap()
        );
        assert_eq!(
            Value::Null,
            dispatch("not_null", &[Value::Null, Value::Null]).unwrap()
        );
    }
}
