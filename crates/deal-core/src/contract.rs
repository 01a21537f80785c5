//! Contract declarations attached to methods and classes.
//!
//! A [`ContractDecl`] is the metadata a class author writes next to a method
//! (`requires`/`ensures`) or a class (`invariant`). Declarations are inherited
//! along the class hierarchy; merged sets are deduplicated with
//! [`dedup_contracts`], which compares declarations structurally rather than by
//! where they were declared.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a contract declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// Checked before the method body runs.
    Precondition,
    /// Checked after the method body returns.
    Postcondition,
    /// Checked on the receiver after every intercepted call.
    Invariant,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractKind::Precondition => "precondition",
            ContractKind::Postcondition => "postcondition",
            ContractKind::Invariant => "invariant",
        };
        f.write_str(name)
    }
}

/// A single declared condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDecl {
    pub kind: ContractKind,
    /// Boolean expression in the contract expression language.
    pub expression: String,
    /// Name of the class (or interface) that declares the contract.
    pub source_class: String,
    /// Method the contract is attached to. `None` for class invariants.
    pub source_method: Option<String>,
}

impl ContractDecl {
    pub fn precondition(class: &str, method: &str, expression: impl Into<String>) -> Self {
        Self::method_contract(ContractKind::Precondition, class, method, expression)
    }

    pub fn postcondition(class: &str, method: &str, expression: impl Into<String>) -> Self {
        Self::method_contract(ContractKind::Postcondition, class, method, expression)
    }

    pub fn invariant(class: &str, expression: impl Into<String>) -> Self {
        ContractDecl {
            kind: ContractKind::Invariant,
            expression: expression.into(),
            source_class: class.to_string(),
            source_method: None,
        }
    }

    fn method_contract(
        kind: ContractKind,
        class: &str,
        method: &str,
        expression: impl Into<String>,
    ) -> Self {
        ContractDecl {
            kind,
            expression: expression.into(),
            source_class: class.to_string(),
            source_method: Some(method.to_string()),
        }
    }

    /// Structural identity used for deduplication: the kind, the method name
    /// and the expression with whitespace runs collapsed.
    ///
    /// The declaring class is deliberately not part of the key, so the same
    /// condition restated in a subclass counts once.
    pub fn identity(&self) -> ContractIdentity {
        ContractIdentity {
            kind: self.kind,
            method: self.source_method.clone(),
            expression: normalize_expression(&self.expression),
        }
    }

    /// `Class::method` or just `Class` for invariants.
    pub fn location(&self) -> String {
        match &self.source_method {
            Some(method) => format!("{}::{}", self.source_class, method),
            None => self.source_class.clone(),
        }
    }
}

impl fmt::Display for ContractDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}` ({})", self.kind, self.expression, self.location())
    }
}

/// Deduplication key of a [`ContractDecl`]. See [`ContractDecl::identity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractIdentity {
    pub kind: ContractKind,
    pub method: Option<String>,
    pub expression: String,
}

/// Collapses every whitespace run to a single space and trims the ends.
pub fn normalize_expression(expression: &str) -> String {
    expression.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes structural duplicates, keeping the first occurrence of each.
pub fn dedup_contracts(contracts: Vec<ContractDecl>) -> Vec<ContractDecl> {
    let mut seen = HashSet::new();
    contracts
        .into_iter()
        .filter(|c| seen.insert(c.identity()))
        .collect()
}
