// Error handling for the policy runtime

use crate::ast::SourcePos;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that abort the evaluation of a policy program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Symbol not bound in any enclosing scope
    #[error("undefined symbol {0}")]
    UndefinedSymbol(String),

    /// Call head names neither a built-in, a user function nor a host method
    #[error("unknown function \"{0}\"")]
    UnknownFunction(String),

    #[error("function \"{function}\" expects {expected} arguments, got {actual}")]
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Structurally invalid expression (bad call head, non-symbol where a
    /// symbol is required, malformed binding list, ...)
    #[error("{pos}: malformed expression: {message}")]
    MalformedExpression { message: String, pos: SourcePos },

    #[error("type error in {operation}: expected {expected}, got {actual}")]
    TypeError {
        expected: String,
        actual: String,
        operation: String,
    },

    #[error("division by zero in {0}")]
    DivisionByZero(String),

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(String),

    #[error("{object} has no method \"{method}\"")]
    UnknownMethod { object: String, method: String },

    /// Error raised by a host object method
    #[error("{object}: {message}")]
    HostError { object: String, message: String },

    #[error("maximum call depth {0} exceeded")]
    StackOverflow(usize),

    #[error("maximum evaluation depth {0} exceeded")]
    EvaluationTooDeep(usize),

    /// A string or list would grow past `MAX_SEQUENCE_LEN`
    #[error("{operation} would produce {requested} elements, limit is {limit}")]
    LimitExceeded {
        operation: String,
        requested: String,
        limit: usize,
    },
}

impl RuntimeError {
    pub fn malformed(message: impl Into<String>, pos: SourcePos) -> Self {
        RuntimeError::MalformedExpression {
            message: message.into(),
            pos,
        }
    }

    pub fn arity(function: &str, expected: impl ToString, actual: usize) -> Self {
        RuntimeError::ArityMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            actual,
        }
    }

    pub fn limit(operation: &str, requested: Option<usize>, limit: usize) -> Self {
        RuntimeError::LimitExceeded {
            operation: operation.to_string(),
            requested: requested.map_or_else(|| "too many".to_string(), |n| n.to_string()),
            limit,
        }
    }

    pub fn type_error(expected: &str, actual: &str, operation: &str) -> Self {
        RuntimeError::TypeError {
            expected: expected.to_string(),
            actual: actual.to_string(),
            operation: operation.to_string(),
        }
    }
}
