//! Errors raised while parsing or evaluating a contract expression.
//!
//! A contract that cannot be evaluated is never treated as satisfied: the
//! checkers turn every [`EvalError`] into a violation whose cause carries
//! the error, so a typo or an unbound `$__old` surfaces instead of passing
//! silently.

use serde::{Deserialize, Serialize};

/// Parse and evaluation failures of a contract expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum EvalError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("undefined variable ${name}")]
    UndefinedVariable { name: String },

    #[error("undefined field '{field}' on {class}")]
    UndefinedField { class: String, field: String },

    #[error("type mismatch in {operation}: expected {expected}, got {got}")]
    TypeMismatch {
        operation: String,
        expected: String,
        got: String,
    },

    #[error("index {index} out of bounds for list of length {len}")]
    OutOfBounds { index: i64, len: usize },

    #[error("integer overflow in {operation}")]
    IntegerOverflow { operation: String },

    #[error("division by zero")]
    DivideByZero,

    #[error("unknown function {name}()")]
    UnknownFunction { name: String },

    #[error("{name}() expects {expected} argument(s), got {got}")]
    WrongArgumentCount {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("contract must evaluate to bool, got {got}")]
    NonBooleanCondition { got: String },
}

impl EvalError {
    pub(crate) fn mismatch(operation: &str, expected: &str, got: &deal_core::Value) -> Self {
        EvalError::TypeMismatch {
            operation: operation.to_string(),
            expected: expected.to_string(),
            got: got.type_name().to_string(),
        }
    }
}
