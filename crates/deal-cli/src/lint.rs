//! Static checks over the contracts of a registry.
//!
//! Every declaration is parsed, and the variables it references are checked
//! against what its context will bind when it is evaluated.

use std::fmt;

use deal_check::context::{OLD, RESULT, THIS};
use deal_check::expr::parse;
use deal_core::{ClassDef, ClassRegistry, ContractDecl, ContractKind, CoreError, MethodDef};

/// A problem with one contract declaration.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub contract: ContractDecl,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} `{}`: {}",
            self.contract.location(),
            self.contract.kind,
            self.contract.expression,
            self.message
        )
    }
}

#[derive(Debug, Default)]
pub struct LintSummary {
    pub classes: usize,
    pub contracts: usize,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn lint_registry(registry: &ClassRegistry) -> Result<LintSummary, CoreError> {
    let mut summary = LintSummary::default();
    for class in registry.classes() {
        summary.classes += 1;
        for invariant in &class.invariants {
            summary.contracts += 1;
            lint_contract(invariant, class, None, &mut summary.diagnostics);
        }
        for id in &class.methods {
            let method = registry.method(*id)?;
            for contract in &method.contracts {
                summary.contracts += 1;
                lint_contract(contract, class, Some(method), &mut summary.diagnostics);
            }
        }
    }
    Ok(summary)
}

fn lint_contract(
    contract: &ContractDecl,
    class: &ClassDef,
    method: Option<&MethodDef>,
    out: &mut Vec<Diagnostic>,
) {
    let mut report = |message: String| {
        out.push(Diagnostic {
            contract: contract.clone(),
            message,
        })
    };

    let expr = match parse(&contract.expression) {
        Ok(expr) => expr,
        Err(err) => return report(err.to_string()),
    };

    for var in expr.variables() {
        let problem = match (contract.kind, method) {
            (ContractKind::Invariant, _) if var != THIS => {
                Some(format!("invariants can only reference $this, found ${}", var))
            }
            (ContractKind::Invariant, _) => None,
            (ContractKind::Precondition, _) if var == RESULT || var == OLD => {
                Some(format!("${} is not bound in preconditions", var))
            }
            (_, Some(m)) if var == THIS && m.is_static => {
                Some("static methods have no $this".to_string())
            }
            (ContractKind::Postcondition, _) if var == OLD && !class.cloneable => Some(format!(
                "$__old is never bound: {} is not cloneable",
                class.name
            )),
            (_, Some(m)) => {
                let known = var == THIS
                    || var == RESULT
                    || var == OLD
                    || m.params.iter().any(|p| p.name == var);
                (!known).then(|| format!("unknown variable ${}", var))
            }
            (_, None) => None,
        };
        if let Some(message) = problem {
            report(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deal_core::Manifest;

    fn lint(json: &str) -> LintSummary {
        let registry = Manifest::from_json_str(json).unwrap().build_registry().unwrap();
        lint_registry(&registry).unwrap()
    }

    #[test]
    fn clean_manifest_has_no_diagnostics() {
        let summary = lint(
            r#"{"classes": [{
                "name": "Account",
                "invariants": ["$this->balance >= 0"],
                "methods": [{
                    "name": "deposit",
                    "params": [{"name": "amount"}],
                    "requires": ["$amount > 0"],
                    "ensures": ["$this->balance == $__old->balance + $amount"]
                }]
            }]}"#,
        );
        assert_eq!(summary.classes, 1);
        assert_eq!(summary.contracts, 3);
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn reports_misplaced_and_unknown_variables() {
        let summary = lint(
            r#"{"classes": [
                {
                    "name": "Box",
                    "cloneable": false,
                    "invariants": ["$size > 0"],
                    "methods": [
                        {"name": "put", "params": [{"name": "x"}],
                         "requires": ["$__result > 0"],
                         "ensures": ["$__old->n < $this->n", "$y == 1"]},
                        {"name": "make", "static": true, "ensures": ["$this != null"]}
                    ]
                }
            ]}"#,
        );
        let messages: Vec<String> = summary.diagnostics.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "Box: invariant `$size > 0`: invariants can only reference $this, found $size",
                "Box::put: precondition `$__result > 0`: $__result is not bound in preconditions",
                "Box::put: postcondition `$__old->n < $this->n`: $__old is never bound: Box is not cloneable",
                "Box::put: postcondition `$y == 1`: unknown variable $y",
                "Box::make: postcondition `$this != null`: static methods have no $this",
            ]
        );
    }

    #[test]
    fn syntax_errors_are_diagnostics() {
        let summary = lint(
            r#"{"classes": [{"name": "A", "methods": [{"name": "f", "ensures": ["$__result = 1"]}]}]}"#,
        );
        assert_eq!(summary.diagnostics.len(), 1);
        assert_eq!(
            summary.diagnostics[0].message,
            "syntax error at offset 10: assignment is not allowed in contracts"
        );
    }
}
