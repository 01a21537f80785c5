//! The contract expression language.
//!
//! Contracts are written as PHP-flavoured boolean expressions over the
//! bindings of an [`EvaluationContext`](crate::context::EvaluationContext):
//!
//! ```text
//! $this->balance == $__old->balance + $amount
//! count($__result) <= $limit && !is_null($this->owner)
//! ```
//!
//! [`parse`] turns source text into an [`Expr`]; evaluation lives in
//! [`crate::interpreter`].

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use parser::parse;
