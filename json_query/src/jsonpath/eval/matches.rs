use crate::value::Value;

/// One result of a JSONPath query: the matched value and its normalized
/// location, in canonical bracket notation (`$['store']['book'][0]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub value: Value,
    pub path: String,
}

pub(crate) fn append_name(path: &str, name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("{}['{}']", path, escaped)
}

pub(crate) fn append_index(path: &str, index: usize) -> String {
    format!("{}[{}]", path, index)
}

#[cfg(test)]
mod test {
    use super::{append_index, append_name};

    #[test]
    fn paths_use_bracket_notation() {
        assert_eq!("$['a']", append_name("$", "a"));
        assert_eq!("$['a'][3]", append_index("$['a']", 3));
        assert_eq!("$['it\\'s']", append_name("$", "it's"));
    }
}
