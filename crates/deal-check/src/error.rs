//! Errors surfaced by checked invocations.

use deal_core::CoreError;

use crate::contracts::{ContractViolation, ViolationReport};

/// Failure raised by the intercepted method body itself.
pub type MethodError = Box<dyn std::error::Error + Send + Sync>;

/// Everything a checked call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// Class or method metadata could not be resolved.
    #[error(transparent)]
    Metadata(#[from] CoreError),

    /// One or more contracts did not hold.
    #[error("{0}")]
    Violated(ViolationReport),

    /// The original method failed; no contracts were evaluated after it.
    #[error("{method} failed: {source}")]
    MethodFailed {
        method: String,
        #[source]
        source: MethodError,
    },
}

impl ContractError {
    /// The violations carried by a [`ContractError::Violated`], empty otherwise.
    pub fn violations(&self) -> &[ContractViolation] {
        match self {
            ContractError::Violated(report) => &report.violations,
            _ => &[],
        }
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, ContractError::Violated(_))
    }
}

impl From<ViolationReport> for ContractError {
    fn from(report: ViolationReport) -> Self {
        ContractError::Violated(report)
    }
}
