//! The postcondition checker.
//!
//! Snapshots the receiver (when its declaring class is cloneable), runs the
//! call, then evaluates the merged postconditions of the method against
//! `{arguments, $this, $__old, $__result}`. The original result is returned
//! unchanged when every postcondition holds.

use deal_core::{ContractKind, MetadataReader, Value};

use super::{resolve_call, Interceptor, MethodInvocation};
use crate::config::CheckerConfig;
use crate::context::EvaluationContext;
use crate::contracts::check::check_contracts;
use crate::contracts::fetch::fetch_all_contracts;
use crate::error::ContractError;

pub struct PostconditionChecker<'r> {
    reader: &'r dyn MetadataReader,
    config: CheckerConfig,
}

impl<'r> PostconditionChecker<'r> {
    pub fn new(reader: &'r dyn MetadataReader, config: CheckerConfig) -> Self {
        PostconditionChecker { reader, config }
    }
}

impl Interceptor for PostconditionChecker<'_> {
    fn name(&self) -> &'static str {
        "postcondition"
    }

    fn invoke(&self, invocation: &mut dyn MethodInvocation) -> Result<Value, ContractError> {
        let call = resolve_call(self.reader, invocation.method())?;
        let contracts = fetch_all_contracts(
            self.reader,
            call.class,
            &call.method.name,
            ContractKind::Postcondition,
        )?;
        if contracts.is_empty() {
            return invocation.proceed();
        }

        let declaring = self.reader.class(call.method.class)?;
        let old = if self.config.capture_old && declaring.cloneable {
            invocation.this().cloned()
        } else {
            None
        };
        if old.is_none() && invocation.this().is_some() {
            tracing::debug!(method = %call.site, class = %declaring.name, "no $__old snapshot for this call");
        }

        // A failing body propagates as-is and no postcondition is evaluated.
        let result = invocation.proceed()?;

        let ctx = EvaluationContext::for_postcondition(
            &call.method.params,
            invocation.arguments(),
            invocation.this(),
            old,
            result.clone(),
        );
        check_contracts(
            &contracts,
            &ctx,
            &call.site,
            self.config.reporting,
            Some(&result),
        )?;
        Ok(result)
    }
}
