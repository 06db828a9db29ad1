use crate::value::Value;

/// The JMESPath expression tree. Projections are explicit nodes: the parser
/// decides where a projection stops (at a pipe or a weaker-binding operator)
/// and everything inside it becomes the projection's right-hand side, which
/// the evaluator maps over each element.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// The current value, `@` or an elided projection rhs.
    Identity,
    Field(String),
    Index(i64),
    /// Slice of the current value. Step defaults to 1 and is never zero.
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: i64,
    },
    /// `lhs.rhs` — evaluate rhs against the result of lhs.
    Subexpr {
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    /// Evaluate lhs to an array, map rhs over its elements, drop nulls.
    Projection {
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    /// Object member values as an array (the lhs of a `*` projection).
    ObjectValues(Box<Ast>),
    /// Flatten one level of nesting (the lhs of a `[]` projection).
    Flatten(Box<Ast>),
    FilterProjection {
        lhs: Box<Ast>,
        predicate: Box<Ast>,
        rhs: Box<Ast>,
    },
    MultiList(Vec<Ast>),
    MultiHash(Vec<(String, Ast)>),
    Comparison {
        op: Comparator,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    And {
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    Or {
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    Not(Box<Ast>),
    Pipe {
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    Literal(Value),
    Function {
        name: String,
        args: Vec<Ast>,
    },
    /// `&expr`, passed unevaluated to functions like `sort_by`.
    Expref(Box<Ast>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
