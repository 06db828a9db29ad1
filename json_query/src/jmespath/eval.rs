//! Tree-walking evaluator for the JMESPath AST. Evaluation never fails on
//! type mismatches in the data (those produce `null`); errors are reserved
//! for bad function calls and the recursion limit.

use super::ast::{Ast, Comparator};
use super::functions;
use crate::errors::{JsonQueryError, JsonQueryResult};
use crate::value::Value;

const MAX_EVAL_DEPTH: usize = 256;

pub fn search(root: &Value, ast: &Ast) -> JsonQueryResult<Value> {
    Context { depth: 0 }.eval(ast, root)
}

struct Context {
    depth: usize,
}

impl Context {
    fn eval(&mut self, ast: &Ast, current: &Value) -> JsonQueryResult<Value> {
        self.depth += 1;
        if self.depth > MAX_EVAL_DEPTH {
            return Err(JsonQueryError::DepthExceeded(MAX_EVAL_DEPTH));
        }
        let result = self.eval_inner(ast, current);
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, ast: &Ast, current: &Value) -> JsonQueryResult<Value> {
        match ast {
            Ast::Identity => Ok(current.clone()),
            Ast::Field(name) => Ok(current.get(name).cloned().unwrap_or(Value::Null)),
            Ast::Index(i) => Ok(current.get_index(*i).cloned().unwrap_or(Value::Null)),
            Ast::Slice { start, end, step } => match current.as_array() {
                Some(items) => Ok(Value::Array(slice(items, *start, *end, *step))),
                None => Ok(Value::Null),
            },
            Ast::Subexpr { lhs, rhs } | Ast::Pipe { lhs, rhs } => {
                let left = self.eval(lhs, current)?;
                self.eval(rhs, &left)
            }
            Ast::Projection { lhs, rhs } => {
                let left = self.eval(lhs, current)?;
                let Some(items) = left.as_array() else {
                    return Ok(Value::Null);
                };
                let mut out = Vec::new();
                for item in items {
                    let mapped = self.eval(rhs, item)?;
                    if !mapped.is_null() {
                        out.push(mapped);
                    }
                }
                Ok(Value::Array(out))
            }
            Ast::ObjectValues(inner) => {
                let left = self.eval(inner, current)?;
                if left.is_object() {
                    Ok(Value::Array(
                        functions::resolved(&left)
                            .into_iter()
                            .map(|(_, v)| v.clone())
                            .collect(),
                    ))
                } else {
                    Ok(Value::Null)
                }
            }
            Ast::Flatten(inner) => {
                let left = self.eval(inner, current)?;
                let Some(items) = left.as_array() else {
                    return Ok(Value::Null);
                };
                let mut out = Vec::new();
                for item in items {
                    match item {
                        Value::Array(nested) => out.extend(nested.iter().cloned()),
                        other => out.push(other.clone()),
                    }
                }
                Ok(Value::Array(out))
            }
            Ast::FilterProjection {
                lhs,
                predicate,
                rhs,
            } => {
                let left = self.eval(lhs, current)?;
                let Some(items) = left.as_array() else {
                    return Ok(Value::Null);
                };
                let mut out = Vec::new();
                for item in items {
                    if !truthy(&self.eval(predicate, item)?) {
                        continue;
                    }
                    let mapped = self.eval(rhs, item)?;
                    if !mapped.is_null() {
                        out.push(mapped);
                    }
                }
                Ok(Value::Array(out))
            }
            Ast::MultiList(elements) => {
                if current.is_null() {
                    return Ok(Value::Null);
                }
                let mut out = Vec::with_capacity(elements.len());
                for element in elements {
                    out.push(self.eval(element, current)?);
                }
                Ok(Value::Array(out))
            }
            Ast::MultiHash(members) => {
                if current.is_null() {
                    return Ok(Value::Null);
                }
                let mut out = Vec::with_capacity(members.len());
                for (key, expr) in members {
                    out.push((key.clone(), self.eval(expr, current)?));
                }
                Ok(Value::Object(out))
            }
            Ast::Comparison { op, lhs, rhs } => {
                let a = self.eval(lhs, current)?;
                let b = self.eval(rhs, current)?;
                Ok(compare(*op, &a, &b))
            }
            Ast::And { lhs, rhs } => {
                let left = self.eval(lhs, current)?;
                if truthy(&left) {
                    self.eval(rhs, current)
                } else {
                    Ok(left)
                }
            }
            Ast::Or { lhs, rhs } => {
                let left = self.eval(lhs, current)?;
                if truthy(&left) {
                    Ok(left)
                } else {
                    self.eval(rhs, current)
                }
            }
            Ast::Not(inner) => Ok(Value::Bool(!truthy(&self.eval(inner, current)?))),
            Ast::Literal(v) => Ok(v.clone()),
            Ast::Function { name, args } => self.call(name, args, current),
            Ast::Expref(_) => Err(JsonQueryError::eval(
                "expression reference used outside a function argument",
            )),
        }
    }

    fn call(&mut self, name: &str, args: &[Ast], current: &Value) -> JsonQueryResult<Value> {
        match name {
            "map" => self.map(args, current),
            "sort_by" => self.sort_by(args, current),
            "min_by" => self.extremum_by(name, args, current, false),
            "max_by" => self.extremum_by(name, args, current, true),
            _ => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, current)?);
                }
                functions::dispatch(name, &values)
            }
        }
    }

    /// `map(&expr, array)`. Unlike a projection, nulls are kept.
    fn map(&mut self, args: &[Ast], current: &Value) -> JsonQueryResult<Value> {
        let (expr, subject) = match args {
            [Ast::Expref(expr), subject] => (expr, subject),
            _ => {
                return Err(JsonQueryError::eval(
                    "map() expects an expression reference and an array",
                ))
            }
        };
        let subject = self.eval(subject, current)?;
        let items = subject
            .as_array()
            .ok_or_else(|| JsonQueryError::eval("map() expects an array as second argument"))?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(self.eval(expr, item)?);
        }
        Ok(Value::Array(out))
    }

    /// The per-element sort keys must be all numbers or all strings.
    fn keyed_items(
        &mut self,
        name: &str,
        args: &[Ast],
        current: &Value,
    ) -> JsonQueryResult<Vec<(Value, Value)>> {
        let (subject, expr) = match args {
            [subject, Ast::Expref(expr)] => (subject, expr),
            _ => {
                return Err(JsonQueryError::eval(format!(
                    "{}() expects an array and an expression reference",
                    name
                )))
            }
        };
        let subject = self.eval(subject, current)?;
        let items = subject.as_array().ok_or_else(|| {
            JsonQueryError::eval(format!("{}() expects an array as first argument", name))
        })?;
        let mut keyed = Vec::with_capacity(items.len());
        for item in items {
            let key = self.eval(expr, item)?;
            if !key.is_number() && !key.is_string() {
                return Err(JsonQueryError::eval(format!(
                    "{}() keys must be numbers or strings",
                    name
                )));
            }
            keyed.push((key, item.clone()));
        }
        if let Some(((first, _), rest)) = keyed.split_first() {
            if rest.iter().any(|(k, _)| k.is_string() != first.is_string()) {
                return Err(JsonQueryError::eval(format!(
                    "{}() keys must be all numbers or all strings",
                    name
                )));
            }
        }
        Ok(keyed)
    }

    fn sort_by(&mut self, args: &[Ast], current: &Value) -> JsonQueryResult<Value> {
        let mut keyed = self.keyed_items("sort_by", args, current)?;
        keyed.sort_by(|(a, _), (b, _)| key_order(a, b));
        Ok(Value::Array(keyed.into_iter().map(|(_, v)| v).collect()))
    }

    fn extremum_by(
        &mut self,
        name: &str,
        args: &[Ast],
        current: &Value,
        largest: bool,
    ) -> JsonQueryResult<Value> {
        let keyed = self.keyed_items(name, args, current)?;
        let best = if largest {
            keyed.into_iter().max_by(|(a, _), (b, _)| key_order(a, b))
        } else {
            keyed.into_iter().min_by(|(a, _), (b, _)| key_order(a, b))
        };
        Ok(best.map(|(_, v)| v).unwrap_or(Value::Null))
    }
}

/// Everything is truthy except `null`, `false` and empty strings, arrays
/// and objects. Zero is truthy.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(members) => !members.is_empty(),
        _ => true,
    }
}

/// Ordering comparators yield `null` unless both sides are numbers;
/// equality works on any pair of values.
fn compare(op: Comparator, a: &Value, b: &Value) -> Value {
    match op {
        Comparator::Eq => Value::Bool(functions::value_eq(a, b)),
        Comparator::Ne => Value::Bool(!functions::value_eq(a, b)),
        _ => {
            let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
                return Value::Null;
            };
            let result = match op {
                Comparator::Lt => x < y,
                Comparator::Le => x <= y,
                Comparator::Gt => x > y,
                Comparator::Ge => x >= y,
                Comparator::Eq | Comparator::Ne => unreachable!(),
            };
            Value::Bool(result)
        }
    }
}

fn key_order(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => a
            .as_f64()
            .unwrap_or(f64::NAN)
            .partial_cmp(&b.as_f64().unwrap_or(f64::NAN))
            .unwrap_or(std::cmp::Ordering::Equal),
    }
}

fn slice(items: &[Value], start: Option<i64>, end: Option<i64>, step: i64) -> Vec<Value> {
    let len = items.len() as i64;
    let clamp = |i: i64, low: i64, high: i64| {
        let i = if i < 0 { i + len } else { i };
        i.clamp(low, high)
    };
    let mut out = Vec::new();
    if step > 0 {
        let from = clamp(start.unwrap_or(0), 0, len);
        let to = clamp(end.unwrap_or(len), 0, len);
        let mut i = from;
        while i < to {
            out.push(items[i as usize].clone());
            i += step;
        }
    } else {
        // A negative step walks backwards; -1 marks "before the start".
        let from = clamp(start.unwrap_or(len - 1), -1, len - 1);
        let to = clamp(end.unwrap_or(-len - 1), -1, len - 1);
        let mut i = from;
        while i > to {
            out.push(items[i as usize].clone());
            i += step;
        }
    }
    out
}
