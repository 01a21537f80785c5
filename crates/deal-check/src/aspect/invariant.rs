//! The invariant checker.
//!
//! Runs the call, then evaluates the invariants of the receiver's class and
//! all of its ancestors against the post-call receiver. The receiver's own
//! class (its runtime class) decides which invariants apply; the call's
//! class is used when the receiver is not an object of a known class.

use deal_core::{ClassId, MetadataReader, Value};

use super::{resolve_call, Interceptor, MethodInvocation};
use crate::config::CheckerConfig;
use crate::context::EvaluationContext;
use crate::contracts::check::check_contracts;
use crate::contracts::fetch::fetch_class_invariants;
use crate::error::ContractError;

pub struct InvariantChecker<'r> {
    reader: &'r dyn MetadataReader,
    config: CheckerConfig,
}

impl<'r> InvariantChecker<'r> {
    pub fn new(reader: &'r dyn MetadataReader, config: CheckerConfig) -> Self {
        InvariantChecker { reader, config }
    }
}

/// The class whose invariants apply to `receiver`.
pub(crate) fn runtime_class(reader: &dyn MetadataReader, receiver: &Value, fallback: ClassId) -> ClassId {
    match receiver.as_object() {
        Some(obj) => match reader.resolve_class(&obj.class) {
            Ok(class) => class,
            Err(err) => {
                tracing::trace!(class = %obj.class, %err, "receiver class not registered");
                fallback
            }
        },
        None => fallback,
    }
}

impl Interceptor for InvariantChecker<'_> {
    fn name(&self) -> &'static str {
        "invariant"
    }

    fn invoke(&self, invocation: &mut dyn MethodInvocation) -> Result<Value, ContractError> {
        let call = resolve_call(self.reader, invocation.method())?;
        let result = invocation.proceed()?;

        if call.method.is_static {
            return Ok(result);
        }
        let Some(this) = invocation.this() else {
            return Ok(result);
        };
        let class = runtime_class(self.reader, this, call.class);
        let invariants = fetch_class_invariants(self.reader, class)?;
        let ctx = EvaluationContext::for_invariant(this);
        check_contracts(&invariants, &ctx, &call.site, self.config.reporting, None)?;
        Ok(result)
    }
}
