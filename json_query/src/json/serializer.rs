//! Serialize a [`Value`] back to JSON text.

use crate::errors::{JsonQueryError, JsonQueryResult};
use crate::value::Value;

/// What to emit when a `Double` holds NaN or an infinity, neither of which
/// has a literal in standard JSON text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonFinitePolicy {
    /// Emit `null` (lossy, always valid JSON). The default.
    #[default]
    Null,
    /// Emit `"NaN"`, `"Infinity"` or `"-Infinity"` as JSON strings.
    String,
    /// Fail the serialization with `SerializeError`.
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    /// `None` for compact output, `Some(width)` for pretty-printing with
    /// `width` spaces per nesting level.
    pub indent: Option<usize>,
    pub non_finite: NonFinitePolicy,
}

/// Compact serialization with the default non-finite policy.
pub fn to_string(value: &Value) -> JsonQueryResult<String> {
    to_string_with_options(value, &SerializeOptions::default())
}

pub fn to_string_with_options(
    value: &Value,
    options: &SerializeOptions,
) -> JsonQueryResult<String> {
    let mut writer = Writer {
        out: String::new(),
        indent: options.indent,
        non_finite: options.non_finite,
    };
    writer.write_value(value, 0)?;
    Ok(writer.out)
}

struct Writer {
    out: String,
    indent: Option<usize>,
    non_finite: NonFinitePolicy,
}

impl Writer {
    fn write_value(&mut self, value: &Value, level: usize) -> JsonQueryResult<()> {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::Bool(true) => self.out.push_str("true"),
            Value::Bool(false) => self.out.push_str("false"),
            Value::Int(i) => self.out.push_str(&i.to_string()),
            Value::Double(d) => self.write_double(*d)?,
            Value::String(s) => self.write_string(s),
            Value::Array(items) => self.write_array(items, level)?,
            Value::Object(members) => self.write_object(members, level)?,
        }
        Ok(())
    }

    fn write_double(&mut self, d: f64) -> JsonQueryResult<()> {
        if !d.is_finite() {
            match self.non_finite {
                NonFinitePolicy::Null => self.out.push_str("null"),
                NonFinitePolicy::String => {
                    let text = if d.is_nan() {
                        "\"NaN\""
                    } else if d > 0.0 {
                        "\"Infinity\""
                    } else {
                        "\"-Infinity\""
                    };
                    self.out.push_str(text);
                }
                NonFinitePolicy::Error => {
                    return Err(JsonQueryError::Serialize(
                        "non-finite number has no JSON representation".to_string(),
                    ));
                }
            }
            return Ok(());
        }
        let mut text = d.to_string();
        // Keep the floating tag visible on whole numbers so a round trip
        // does not turn 1.0 into 1.
        if !text.contains('.') {
            text.push_str(".0");
        }
        self.out.push_str(&text);
        Ok(())
    }

    fn write_string(&mut self, s: &str) {
        self.out.push('"');
        for c in s.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\u{0008}' => self.out.push_str("\\b"),
                '\u{000C}' => self.out.push_str("\\f"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    self.out.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }

    fn write_array(&mut self, items: &[Value], level: usize) -> JsonQueryResult<()> {
        if items.is_empty() {
            self.out.push_str("[]");
            return Ok(());
        }
        self.out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline_and_indent(level + 1);
            self.write_value(item, level + 1)?;
        }
        self.newline_and_indent(level);
        self.out.push(']');
        Ok(())
    }

    fn write_object(&mut self, members: &[(String, Value)], level: usize) -> JsonQueryResult<()> {
        if members.is_empty() {
            self.out.push_str("{}");
            return Ok(());
        }
        self.out.push('{');
        for (i, (key, value)) in members.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline_and_indent(level + 1);
            self.write_string(key);
            self.out.push(':');
            if self.indent.is_some() {
                self.out.push(' ');
            }
            self.write_value(value, level + 1)?;
        }
        self.newline_and_indent(level);
        self.out.push('}');
        Ok(())
    }

    fn newline_and_indent(&mut self, level: usize) {
        if let Some(width) = self.indent {
            self.out.push('\n');
            for _ in 0..level * width {
                self.out.push(' ');
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{to_string, to_string_with_options, NonFinitePolicy, SerializeOptions};
    use crate::errors::JsonQueryError;
    use crate::json::parse;
    use crate::value::Value;

    #[test]
    fn compact_round_trip_is_byte_identical() {
        let text = r#"{"a":[1,2.5,"x"],"b":{"c":null,"d":false}}"#;
        let value = parse(text).unwrap();
        assert_eq!(text, to_string(&value).unwrap());
    }

    #[test]
    fn whole_doubles_keep_their_tag() {
        assert_eq!("1.0", to_string(&Value::Double(1.0)).unwrap());
        assert_eq!("1", to_string(&Value::Int(1)).unwrap());
    }

    #[test]
    fn indented_output() {
        let value = parse(r#"{"a":[1],"b":{}}"#).unwrap();
        let options = SerializeOptions {
            indent: Some(2),
            ..Default::default()
        };
        let expected = "{\n  \"a\": [\n    1\n  ],\n  \"b\": {}\n}";
        assert_eq!(expected, to_string_with_options(&value, &options).unwrap());
    }

    #[test]
    fn escapes_control_characters() {
        let value = Value::from("a\"b\\c\nd\u{0001}");
        assert_eq!("\"a\\\"b\\\\c\\nd\\u0001\"", to_string(&value).unwrap());
    }

    #[test]
    fn non_finite_policies() {
        let nan = Value::Double(f64::NAN);
        let inf = Value::Double(f64::NEG_INFINITY);
        assert_eq!("null", to_string(&nan).unwrap());

        let as_string = SerializeOptions {
            non_finite: NonFinitePolicy::String,
            ..Default::default()
        };
        assert_eq!("\"NaN\"", to_string_with_options(&nan, &as_string).unwrap());
        assert_eq!(
            "\"-Infinity\"",
            to_string_with_options(&inf, &as_string).unwrap()
        );

        let as_error = SerializeOptions {
            non_finite: NonFinitePolicy::Error,
            ..Default::default()
        };
        assert!(matches!(
            to_string_with_options(&nan, &as_error),
            Err(JsonQueryError::Serialize(_))
        ));
    }
}
