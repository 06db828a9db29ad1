//! Application of the built-in path functions.
//!
//! Returns `None` when the argument has the wrong shape. Inside filters that
//! makes the predicate false; as a trailing selector it drops the match.
//! Either way a type mismatch never aborts the query.

use crate::jsonpath::tokenizer::PathFunction;
use crate::value::Value;

pub(crate) fn apply(function: PathFunction, value: &Value) -> Option<Value> {
    match function {
        PathFunction::Length | PathFunction::Count => length(value),
        PathFunction::Keys => keys(value),
        PathFunction::Sum => sum(value),
        PathFunction::Avg => avg(value),
        PathFunction::Min => extremum(value, false),
        PathFunction::Max => extremum(value, true),
        PathFunction::Abs => abs(value),
        PathFunction::Ceil => round(value, f64::ceil),
        PathFunction::Floor => round(value, f64::floor),
        PathFunction::ToNumber => to_number(value),
    }
}

fn length(value: &Value) -> Option<Value> {
    let n = match value {
        Value::Array(items) => items.len(),
        Value::Object(members) => members.len(),
        Value::String(s) => s.chars().count(),
        _ => return None,
    };
    Some(Value::Int(n as i64))
}

fn keys(value: &Value) -> Option<Value> {
    let members = value.as_object()?;
    Some(Value::Array(
        members
            .iter()
            .map(|(k, _)| Value::String(k.clone()))
            .collect(),
    ))
}

fn numbers(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(|v| v.as_f64()).collect()
}

fn sum(value: &Value) -> Option<Value> {
    let items = value.as_array()?;
    if items.iter().all(|v| matches!(v, Value::Int(_))) {
        let mut total: i64 = 0;
        for item in items {
            total = total.checked_add(item.as_i64()?)?;
        }
        return Some(Value::Int(total));
    }
    let ns = numbers(value)?;
    Some(Value::Double(ns.iter().sum()))
}

fn avg(value: &Value) -> Option<Value> {
    let ns = numbers(value)?;
    if ns.is_empty() {
        return None;
    }
    Some(Value::Double(ns.iter().sum::<f64>() / ns.len() as f64))
}

fn extremum(value: &Value, max: bool) -> Option<Value> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    if items.iter().all(Value::is_number) {
        let mut best = &items[0];
        for item in &items[1..] {
            let better = if max {
                item.as_f64() > best.as_f64()
            } else {
                item.as_f64() < best.as_f64()
            };
            if better {
                best = item;
            }
        }
        return Some(best.clone());
    }
    if items.iter().all(Value::is_string) {
        let mut best = items[0].as_str()?;
        for item in &items[1..] {
            let s = item.as_str()?;
            if (max && s > best) || (!max && s < best) {
                best = s;
            }
        }
        return Some(Value::from(best));
    }
    None
}

fn abs(value: &Value) -> Option<Value> {
    match value {
        Value::Int(i) => Some(Value::Int(i.saturating_abs())),
        Value::Double(d) => Some(Value::Double(d.abs())),
        _ => None,
    }
}

fn round(value: &Value, f: fn(f64) -> f64) -> Option<Value> {
    match value {
        Value::Int(i) => Some(Value::Int(*i)),
        Value::Double(d) => Some(Value::Double(f(*d))),
        _ => None,
    }
}

fn to_number(value: &Value) -> Option<Value> {
    match value {
        Value::Int(_) | Value::Double(_) => Some(value.clone()),
        Value::String(s) => {
            if let Ok(i) = s.parse::<i64>() {
                Some(Value::Int(i))
            } else {
                s.trim().parse::<f64>().ok().map(Value::Double)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::apply;
    use crate::jsonpath::tokenizer::PathFunction;
    use crate::json::parse;
    use crate::value::Value;

    #[test]
    fn length_counts_elements_members_and_chars() {
        let arr = parse("[1,2,3]").unwrap();
        assert_eq!(Some(Value::Int(3)), apply(PathFunction::Length, &arr));
        let s = Value::from("héllo");
        assert_eq!(Some(Value::Int(5)), apply(PathFunction::Length, &s));
        assert_eq!(None, apply(PathFunction::Length, &Value::Int(1)));
    }

    #[test]
    fn numeric_aggregates() {
        let ints = parse("[1,2,3]").unwrap();
        assert_eq!(Some(Value::Int(6)), apply(PathFunction::Sum, &ints));
        let mixed = parse("[1,2.5]").unwrap();
        assert_eq!(Some(Value::Double(3.5)), apply(PathFunction::Sum, &mixed));
        assert_eq!(Some(Value::Double(2.0)), apply(PathFunction::Avg, &ints));
        assert_eq!(Some(Value::Int(3)), apply(PathFunction::Max, &ints));
        assert_eq!(Some(Value::Int(1)), apply(PathFunction::Min, &ints));
        assert_eq!(None, apply(PathFunction::Sum, &parse("[1,\"x\"]").unwrap()));
    }

    #[test]
    fn rounding_preserves_the_numeric_tag() {
        assert_eq!(
            Some(Value::Double(2.0)),
            apply(PathFunction::Ceil, &Value::Double(1.2))
        );
        assert_eq!(Some(Value::Int(7)), apply(PathFunction::Floor, &Value::Int(7)));
    }

    #[test]
    fn to_number_parses_strings() {
        assert_eq!(
            Some(Value::Int(12)),
            apply(PathFunction::ToNumber, &Value::from("12"))
        );
        assert_eq!(
            Some(Value::Double(1.5)),
            apply(PathFunction::ToNumber, &Value::from("1.5"))
        );
        assert_eq!(None, apply(PathFunction::ToNumber, &Value::from("nope")));
    }
}
