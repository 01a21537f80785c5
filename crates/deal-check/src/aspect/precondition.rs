//! The precondition checker.
//!
//! Preconditions may only be weakened by subclasses. The contracts are
//! grouped by the class that declares them (the call's class first, then
//! each ancestor) and the call is admitted when every contract of some
//! non-empty group holds. Otherwise the call is rejected before the body
//! runs, reporting the failures of the nearest non-empty group.

use deal_core::{ContractKind, MetadataReader, Value};

use super::{resolve_call, Interceptor, MethodInvocation};
use crate::config::CheckerConfig;
use crate::context::EvaluationContext;
use crate::contracts::check::{check_contracts, evaluate_contract};
use crate::contracts::fetch::fetch_contract_levels;
use crate::error::ContractError;

pub struct PreconditionChecker<'r> {
    reader: &'r dyn MetadataReader,
    config: CheckerConfig,
}

impl<'r> PreconditionChecker<'r> {
    pub fn new(reader: &'r dyn MetadataReader, config: CheckerConfig) -> Self {
        PreconditionChecker { reader, config }
    }
}

impl Interceptor for PreconditionChecker<'_> {
    fn name(&self) -> &'static str {
        "precondition"
    }

    fn invoke(&self, invocation: &mut dyn MethodInvocation) -> Result<Value, ContractError> {
        let call = resolve_call(self.reader, invocation.method())?;
        let levels = fetch_contract_levels(
            self.reader,
            call.class,
            &call.method.name,
            ContractKind::Precondition,
        )?;
        let mut groups = levels.iter().filter(|level| !level.contracts.is_empty());
        let Some(nearest) = groups.next() else {
            return invocation.proceed();
        };

        let ctx = EvaluationContext::for_precondition(
            &call.method.params,
            invocation.arguments(),
            invocation.this(),
        );
        let report =
            match check_contracts(&nearest.contracts, &ctx, &call.site, self.config.reporting, None) {
                Ok(()) => return invocation.proceed(),
                Err(report) => report,
            };
        let weakened = groups.any(|level| {
            level
                .contracts
                .iter()
                .all(|contract| matches!(evaluate_contract(contract, &ctx), Ok(true)))
        });
        if !weakened {
            return Err(report.into());
        }
        tracing::debug!(method = %call.site, "precondition satisfied by an inherited group");
        invocation.proceed()
    }
}
