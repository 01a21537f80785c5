//! Contract resolution, evaluation and violation diagnostics.
//!
//! Contracts are declared on methods and classes in the
//! [`MetadataReader`](deal_core::MetadataReader), merged along the class
//! hierarchy by [`fetch`], and evaluated against an
//! [`EvaluationContext`](crate::context::EvaluationContext) by [`check`].
//! A failing contract produces a [`ContractViolation`] carrying the
//! declaration, the bound context and, for postconditions, the actual return
//! value.

pub mod check;
pub mod fetch;
pub mod property;

use std::fmt;

use deal_core::{ContractDecl, ContractKind, Value};
use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::interpreter::error::EvalError;

/// Why a contract failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "error", rename_all = "snake_case")]
pub enum ViolationCause {
    /// The expression evaluated to `false`.
    Unsatisfied,
    /// The expression could not be evaluated (syntax error, unbound
    /// variable, type error). Never treated as a pass.
    EvaluationFailed(EvalError),
}

/// A structured contract violation diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractViolation {
    pub kind: ContractKind,
    /// The declaration that failed, including where it was declared.
    pub contract: ContractDecl,
    /// The intercepted call, `Class::method`.
    pub method: String,
    /// Human-readable summary.
    pub message: String,
    pub cause: ViolationCause,
    /// Bindings the expression was evaluated against.
    pub context: EvaluationContext,
    /// For postconditions, the value the method returned.
    pub actual_return: Option<Value>,
}

/// The violations of one failed check, in evaluation order. Never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationReport {
    pub violations: Vec<ContractViolation>,
}

impl ViolationReport {
    pub fn first(&self) -> Option<&ContractViolation> {
        self.violations.first()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ViolationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.as_slice() {
            [] => write!(f, "no contract violations"),
            [single] => write!(f, "{}", single.message),
            [first, rest @ ..] => write!(
                f,
                "{} (and {} more violation{})",
                first.message,
                rest.len(),
                if rest.len() == 1 { "" } else { "s" }
            ),
        }
    }
}
