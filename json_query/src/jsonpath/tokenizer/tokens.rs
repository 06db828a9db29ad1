use super::filter::FilterExpr;

/// One selector step of a parsed JSONPath. A query is a `Root` token
/// followed by zero or more selectors, applied left to right.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Root(RootPathToken),
    Property(PropertyPathToken),
    ArrayIndex(ArrayIndexPathToken),
    ArraySlice(ArraySlicePathToken),
    Union(UnionPathToken),
    Predicate(PredicatePathToken),
    Function(FunctionPathToken),
    Scan(ScanPathToken),
    Wildcard(WildcardPathToken),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RootPathToken {
    /// `$` for the document root, `@` for the current node inside filters.
    pub root_path_char: char,
}

/// One or more member names; more than one means a union of names, e.g.
/// `['a','b']`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPathToken {
    pub properties: Vec<String>,
}

/// One or more array indexes; negative indexes count from the end.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayIndexPathToken {
    pub indexes: Vec<i64>,
}

/// Python-style slice: start inclusive, end exclusive, step sign gives the
/// direction. Missing bounds take the whole range.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySlicePathToken {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub step: Option<i64>,
}

/// Bracket union with members of mixed kinds, e.g. `['name', 0, 1:3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionPathToken {
    pub members: Vec<UnionMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnionMember {
    Name(String),
    Index(i64),
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredicatePathToken {
    pub filter: FilterExpr,
}

/// Trailing function applied to every match, e.g. `$..book.length()`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionPathToken {
    pub function: PathFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanPathToken {}

#[derive(Debug, Clone, PartialEq)]
pub struct WildcardPathToken {}

/// The built-in function set, resolved at parse time so an unknown name is
/// a syntax error rather than a late evaluation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFunction {
    Length,
    Count,
    Keys,
    Sum,
    Avg,
    Min,
    Max,
    Abs,
    Ceil,
    Floor,
    ToNumber,
}

impl PathFunction {
    pub fn from_name(name: &str) -> Option<PathFunction> {
        match name {
            "length" => Some(PathFunction::Length),
            "count" => Some(PathFunction::Count),
            "keys" => Some(PathFunction::Keys),
            "sum" => Some(PathFunction::Sum),
            "avg" => Some(PathFunction::Avg),
            "min" => Some(PathFunction::Min),
            "max" => Some(PathFunction::Max),
            "abs" => Some(PathFunction::Abs),
            "ceil" => Some(PathFunction::Ceil),
            "floor" => Some(PathFunction::Floor),
            "to_number" => Some(PathFunction::ToNumber),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PathFunction::Length => "length",
            PathFunction::Count => "count",
            PathFunction::Keys => "keys",
            PathFunction::Sum => "sum",
            PathFunction::Avg => "avg",
            PathFunction::Min => "min",
            PathFunction::Max => "max",
            PathFunction::Abs => "abs",
            PathFunction::Ceil => "ceil",
            PathFunction::Floor => "floor",
            PathFunction::ToNumber => "to_number",
        }
    }
}
