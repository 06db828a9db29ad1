//! JSON document text to [`crate::Value`] and back.

pub mod parser;
pub mod serializer;

pub use parser::{parse, parse_with_options, ParseOptions};
pub use serializer::{to_string, to_string_with_options, NonFinitePolicy, SerializeOptions};
