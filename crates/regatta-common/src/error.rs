use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub enum Error {
    ArgumentCountMismatch(String),
    IllegalColumn(String),
    TypeMismatch { expected: String, actual: String },
    InvalidFunction(String),
    LogicError(String),
}

impl Error {
    pub fn argument_count_mismatch(msg: impl Into<String>) -> Self {
        Error::ArgumentCountMismatch(msg.into())
    }

    pub fn illegal_column(msg: impl Into<String>) -> Self {
        Error::IllegalColumn(msg.into())
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_function(msg: impl Into<String>) -> Self {
        Error::InvalidFunction(msg.into())
    }

    pub fn logic(msg: impl Into<String>) -> Self {
        Error::LogicError(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ArgumentCountMismatch(msg) => write!(f, "Argument count mismatch: {}", msg),
            Error::IllegalColumn(msg) => write!(f, "Illegal column: {}", msg),
            Error::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
            Error::InvalidFunction(msg) => write!(f, "Invalid function: {}", msg),
            Error::LogicError(msg) => write!(f, "Logic error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
