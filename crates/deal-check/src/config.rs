//! Checker configuration.

use serde::{Deserialize, Serialize};

/// How many violations a checker collects before failing the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reporting {
    /// Stop at the first failing contract.
    #[default]
    FirstFailure,
    /// Evaluate every contract of the set and report all failures.
    AllFailures,
}

/// Configuration shared by every checker a [`Weaver`](crate::weaver::Weaver)
/// builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    pub reporting: Reporting,
    /// Snapshot cloneable receivers before the call so postconditions can
    /// read `$__old`.
    pub capture_old: bool,
    pub check_preconditions: bool,
    pub check_postconditions: bool,
    pub check_invariants: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            reporting: Reporting::FirstFailure,
            capture_old: true,
            check_preconditions: true,
            check_postconditions: true,
            check_invariants: true,
        }
    }
}

impl CheckerConfig {
    /// Only postconditions, the minimal checker set.
    pub fn postconditions_only() -> Self {
        CheckerConfig {
            check_preconditions: false,
            check_invariants: false,
            ..Self::default()
        }
    }

    pub fn with_reporting(mut self, reporting: Reporting) -> Self {
        self.reporting = reporting;
        self
    }
}
