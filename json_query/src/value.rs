//! The value model shared by both query engines: an immutable, ordered tree
//! representation of a JSON document.
//!
//! Objects keep their members in insertion order and may, when constructed by
//! hand, carry duplicate keys; lookups resolve to the last occurrence, which
//! matches the parser's last-write-wins policy. Numbers preserve the
//! integer/floating distinction from the source text. A `Double` may hold
//! NaN or an infinity internally even though standard JSON text has no
//! literal for them; the serializer decides how those leave the tree.

/// A JSON value. Transformations never mutate in place; they build new trees.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

/// Discriminant-only view of a [`Value`], mostly for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Double,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Int => "number",
            ValueKind::Double => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Double(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; widens `Int` so engine arithmetic has one code path.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(members) => Some(members.as_slice()),
            _ => None,
        }
    }

    /// Member lookup on objects. Duplicate keys resolve to the last
    /// occurrence. Returns `None` for non-objects and missing keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(members) => members
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Element lookup on arrays; negative indexes count from the end.
    pub fn get_index(&self, index: i64) -> Option<&Value> {
        let items = self.as_array()?;
        let len = items.len() as i64;
        let idx = if index < 0 { index + len } else { index };
        if idx < 0 || idx >= len {
            return None;
        }
        items.get(idx as usize)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Vec<(String, Value)>> for Value {
    fn from(members: Vec<(String, Value)>) -> Self {
        Value::Object(members)
    }
}

/// Structural equality. Arrays compare element-wise in order. Objects
/// compare key-order-insensitively (iteration order is preserved elsewhere,
/// it just does not participate in equality). Two NaNs compare equal so that
/// equality stays an equivalence relation. There is no cross-tag coercion:
/// `Int(1) != Double(1.0)`.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => {
                (a.is_nan() && b.is_nan()) || a == b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => object_eq(a, b),
            _ => false,
        }
    }
}

fn object_eq(a: &[(String, Value)], b: &[(String, Value)]) -> bool {
    let ra = resolve_members(a);
    let rb = resolve_members(b);
    if ra.len() != rb.len() {
        return false;
    }
    ra.iter().all(|(k, va)| {
        rb.iter()
            .find(|(kb, _)| kb == k)
            .is_some_and(|(_, vb)| va == vb)
    })
}

/// Collapse duplicate keys to their last occurrence, keeping the position of
/// the first.
fn resolve_members(members: &[(String, Value)]) -> Vec<(&str, &Value)> {
    let mut resolved: Vec<(&str, &Value)> = Vec::with_capacity(members.len());
    for (k, v) in members {
        match resolved.iter_mut().find(|(rk, _)| *rk == k.as_str()) {
            Some(slot) => slot.1 = v,
            None => resolved.push((k.as_str(), v)),
        }
    }
    resolved
}
