use thiserror::Error;

pub type JsonQueryResult<T> = Result<T, JsonQueryError>;

/// Everything that can go wrong between receiving document text and
/// returning result text. Offsets are byte offsets for document errors and
/// char offsets for query-string errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JsonQueryError {
    #[error("invalid JSON at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("invalid query at offset {offset}: {message}")]
    PathSyntax { offset: usize, message: String },

    #[error("evaluation error: {0}")]
    Eval(String),

    #[error("nesting depth limit of {0} exceeded")]
    DepthExceeded(usize),

    #[error("serialization error: {0}")]
    Serialize(String),
}

impl JsonQueryError {
    pub fn parse(offset: usize, message: impl Into<String>) -> Self {
        JsonQueryError::Parse {
            offset,
            message: message.into(),
        }
    }

    pub fn path_syntax(offset: usize, message: impl Into<String>) -> Self {
        JsonQueryError::PathSyntax {
            offset,
            message: message.into(),
        }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        JsonQueryError::Eval(message.into())
    }
}
