//! Evaluation of parsed contract expressions.
//!
//! [`evaluate`] parses and evaluates source text in one step; checkers use
//! [`eval_condition`] on pre-parsed expressions so a contract that fires on
//! every call is parsed once.

pub mod error;
pub mod eval;

pub use error::EvalError;
pub use eval::{eval_condition, eval_expr};

use deal_core::Value;

use crate::context::EvaluationContext;
use crate::expr::parse;

/// Parses `src` and evaluates it against `ctx`.
pub fn evaluate(src: &str, ctx: &EvaluationContext) -> Result<Value, EvalError> {
    eval_expr(&parse(src)?, ctx)
}

/// Parses `src` and evaluates it as a boolean condition.
pub fn evaluate_condition(src: &str, ctx: &EvaluationContext) -> Result<bool, EvalError> {
    eval_condition(&parse(src)?, ctx)
}
