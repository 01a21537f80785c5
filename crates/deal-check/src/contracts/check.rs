//! Contract evaluation: run each declaration against a context and turn
//! failures into [`ContractViolation`]s.
//!
//! Called by the precondition checker before a method body runs, by the
//! postcondition checker after it returns, and by the invariant checker
//! after every intercepted call on a receiver.

use deal_core::{ContractDecl, Value};

use crate::config::Reporting;
use crate::context::EvaluationContext;
use crate::contracts::{ContractViolation, ViolationCause, ViolationReport};
use crate::expr::parse;
use crate::interpreter::error::EvalError;
use crate::interpreter::eval::eval_condition;

/// Parses and evaluates one contract's condition.
pub fn evaluate_contract(contract: &ContractDecl, ctx: &EvaluationContext) -> Result<bool, EvalError> {
    let expr = parse(&contract.expression)?;
    eval_condition(&expr, ctx)
}

/// Evaluates one contract; `None` when it holds.
///
/// An expression that cannot be evaluated is a violation with
/// [`ViolationCause::EvaluationFailed`].
pub fn check_contract(
    contract: &ContractDecl,
    ctx: &EvaluationContext,
    method: &str,
    actual_return: Option<&Value>,
) -> Option<ContractViolation> {
    let outcome = evaluate_contract(contract, ctx);
    tracing::trace!(contract = %contract, method, ?outcome, "evaluated contract");

    let cause = match outcome {
        Ok(true) => return None,
        Ok(false) => ViolationCause::Unsatisfied,
        Err(err) => ViolationCause::EvaluationFailed(err),
    };
    let message = violation_message(contract, method, &cause);
    tracing::debug!(kind = %contract.kind, method, expression = %contract.expression, "{}", message);

    Some(ContractViolation {
        kind: contract.kind,
        contract: contract.clone(),
        method: method.to_string(),
        message,
        cause,
        context: ctx.clone(),
        actual_return: actual_return.cloned(),
    })
}

/// Evaluates `contracts` in order against `ctx`.
///
/// With [`Reporting::FirstFailure`] evaluation stops at the first violation;
/// with [`Reporting::AllFailures`] every contract is evaluated and all
/// violations are reported.
pub fn check_contracts(
    contracts: &[ContractDecl],
    ctx: &EvaluationContext,
    method: &str,
    reporting: Reporting,
    actual_return: Option<&Value>,
) -> Result<(), ViolationReport> {
    let mut violations = Vec::new();
    for contract in contracts {
        if let Some(violation) = check_contract(contract, ctx, method, actual_return) {
            violations.push(violation);
            if reporting == Reporting::FirstFailure {
                break;
            }
        }
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ViolationReport { violations })
    }
}

fn violation_message(contract: &ContractDecl, method: &str, cause: &ViolationCause) -> String {
    let mut message = format!(
        "{} violated in {}: `{}` (declared in {})",
        contract.kind,
        method,
        contract.expression,
        contract.location()
    );
    if let ViolationCause::EvaluationFailed(err) = cause {
        message.push_str(&format!("; could not be evaluated: {}", err));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RESULT;
    use deal_core::ContractKind;

    fn ctx(result: i64) -> EvaluationContext {
        let mut ctx = EvaluationContext::new();
        ctx.bind("x", Value::Int(3));
        ctx.bind(RESULT, Value::Int(result));
        ctx
    }

    fn post(expr: &str) -> ContractDecl {
        ContractDecl::postcondition("Calc", "double", expr)
    }

    #[test]
    fn satisfied_contracts_produce_no_violation() {
        let contracts = [post("$__result == $x * 2"), post("$__result > 0")];
        assert!(check_contracts(&contracts, &ctx(6), "Calc::double", Reporting::FirstFailure, None).is_ok());
    }

    #[test]
    fn first_failure_stops_early() {
        let contracts = [post("$__result == $x * 2"), post("$__result > 100")];
        let report = check_contracts(
            &contracts,
            &ctx(7),
            "Calc::double",
            Reporting::FirstFailure,
            Some(&Value::Int(7)),
        )
        .unwrap_err();
        assert_eq!(report.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.kind, ContractKind::Postcondition);
        assert_eq!(v.cause, ViolationCause::Unsatisfied);
        assert_eq!(v.actual_return, Some(Value::Int(7)));
        assert_eq!(v.context.lookup("x"), Some(&Value::Int(3)));
    }

    #[test]
    fn all_failures_reports_every_violation() {
        let contracts = [post("$__result == $x * 2"), post("$__result > 0"), post("$__result > 100")];
        let report =
            check_contracts(&contracts, &ctx(7), "Calc::double", Reporting::AllFailures, None)
                .unwrap_err();
        let exprs: Vec<&str> = report
            .violations
            .iter()
            .map(|v| v.contract.expression.as_str())
            .collect();
        assert_eq!(exprs, vec!["$__result == $x * 2", "$__result > 100"]);
    }

    #[test]
    fn evaluation_errors_are_violations() {
        let v = check_contract(&post("$__old->n < $__result"), &ctx(1), "Calc::double", None)
            .expect("unbound $__old must not pass");
        assert_eq!(
            v.cause,
            ViolationCause::EvaluationFailed(EvalError::UndefinedVariable {
                name: "__old".into()
            })
        );

        let v = check_contract(&post("$__result +"), &ctx(1), "Calc::double", None).unwrap();
        assert!(matches!(v.cause, ViolationCause::EvaluationFailed(EvalError::Syntax { .. })));
    }

    #[test]
    fn messages_name_the_contract_and_call() {
        let v = check_contract(&post("$__result > 5"), &ctx(1), "Calc::double", None).unwrap();
        insta::assert_snapshot!(v.message, @"postcondition violated in Calc::double: `$__result > 5` (declared in Calc::double)");

        let v = check_contract(&post("$y"), &ctx(1), "Sub::double", None).unwrap();
        insta::assert_snapshot!(v.message, @"postcondition violated in Sub::double: `$y` (declared in Calc::double); could not be evaluated: undefined variable $y");
    }

    #[test]
    fn report_display_counts_the_rest() {
        let contracts = [post("false"), post("false"), post("false")];
        let report =
            check_contracts(&contracts, &ctx(1), "Calc::double", Reporting::AllFailures, None)
                .unwrap_err();
        assert_eq!(
            report.to_string(),
            "postcondition violated in Calc::double: `false` (declared in Calc::double) (and 2 more violations)"
        );
    }

    #[test]
    fn runaway_nesting_is_an_evaluation_failure() {
        let n = 200_000;
        let contract = post(&format!("{}true{}", "(".repeat(n), ")".repeat(n)));
        let violation = check_contract(&contract, &EvaluationContext::new(), "Calc::double", None)
            .expect("too deep to evaluate");
        assert!(matches!(
            violation.cause,
            ViolationCause::EvaluationFailed(EvalError::Syntax { .. })
        ));
    }
}
