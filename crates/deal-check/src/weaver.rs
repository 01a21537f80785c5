//! Weaving contract checkers around method calls.
//!
//! The [`Weaver`] decides per call which checkers apply (the pointcut) and
//! runs the call through them:
//!
//! - a [`PreconditionChecker`] when the method has preconditions, own or
//!   inherited;
//! - an [`InvariantChecker`] when the call has a receiver and its class or
//!   an ancestor declares invariants;
//! - a [`PostconditionChecker`] when the method has postconditions, own or
//!   inherited.
//!
//! Preconditions are outermost, postconditions innermost, so a rejected call
//! never runs and invariants are checked after postconditions passed.

use deal_core::{ContractKind, MetadataReader, Value};

use crate::aspect::invariant::runtime_class;
use crate::aspect::{
    resolve_call, ClosureInvocation, InterceptorChain, InvariantChecker, MethodInvocation,
    MethodRef, PostconditionChecker, PreconditionChecker,
};
use crate::config::CheckerConfig;
use crate::contracts::fetch::{fetch_all_contracts, fetch_class_invariants};
use crate::error::{ContractError, MethodError};

/// Builds and runs checker chains for calls against one metadata source.
pub struct Weaver<'r> {
    reader: &'r dyn MetadataReader,
    config: CheckerConfig,
}

impl<'r> Weaver<'r> {
    pub fn new(reader: &'r dyn MetadataReader, config: CheckerConfig) -> Self {
        Weaver { reader, config }
    }

    pub fn reader(&self) -> &'r dyn MetadataReader {
        self.reader
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// The checkers that apply to `method` called on `receiver`, outermost
    /// first. Fails when the class or method cannot be resolved.
    pub fn advice_for(
        &self,
        method: &MethodRef,
        receiver: Option<&Value>,
    ) -> Result<InterceptorChain<'r>, ContractError> {
        let call = resolve_call(self.reader, method)?;
        let name = &call.method.name;
        let mut chain = InterceptorChain::new();

        if self.config.check_preconditions
            && !fetch_all_contracts(self.reader, call.class, name, ContractKind::Precondition)?
                .is_empty()
        {
            chain.push(Box::new(PreconditionChecker::new(self.reader, self.config.clone())));
        }

        if self.config.check_invariants && !call.method.is_static {
            if let Some(this) = receiver {
                let class = runtime_class(self.reader, this, call.class);
                if !fetch_class_invariants(self.reader, class)?.is_empty() {
                    chain.push(Box::new(InvariantChecker::new(self.reader, self.config.clone())));
                }
            }
        }

        if self.config.check_postconditions
            && !fetch_all_contracts(self.reader, call.class, name, ContractKind::Postcondition)?
                .is_empty()
        {
            chain.push(Box::new(PostconditionChecker::new(self.reader, self.config.clone())));
        }

        Ok(chain)
    }

    /// Runs an invocation through the checkers that apply to it.
    pub fn invoke(&self, invocation: &mut dyn MethodInvocation) -> Result<Value, ContractError> {
        let chain = self.advice_for(invocation.method(), invocation.this())?;
        tracing::debug!(method = %invocation.method(), advice = ?chain.names(), "weaving call");

        let outcome = chain.invoke(invocation);
        if let Err(ContractError::Violated(report)) = &outcome {
            for violation in &report.violations {
                tracing::warn!(
                    kind = %violation.kind,
                    method = %violation.method,
                    "{}",
                    violation.message
                );
            }
        }
        outcome
    }

    /// Calls `body` as `class::method` on `receiver` with contract checking.
    ///
    /// `body` receives the receiver (mutably, so it can change state) and the
    /// arguments. Its error is reported as [`ContractError::MethodFailed`].
    pub fn call<F>(
        &self,
        class: &str,
        method: &str,
        receiver: Option<&mut Value>,
        args: Vec<Value>,
        body: F,
    ) -> Result<Value, ContractError>
    where
        F: FnMut(Option<&mut Value>, &[Value]) -> Result<Value, MethodError>,
    {
        let mut invocation = ClosureInvocation::new(MethodRef::new(class, method), receiver, args, body);
        self.invoke(&mut invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deal_core::{ClassKind, ClassRegistry, Object, Param};

    fn registry() -> ClassRegistry {
        let mut reg = ClassRegistry::new();
        let account = reg.add_class("Account", ClassKind::Class, true).unwrap();
        reg.add_invariant(account, "$this->balance >= 0").unwrap();
        let deposit = reg.add_method(account, "deposit", [Param::new("amount")]).unwrap();
        reg.add_contract(deposit, ContractKind::Precondition, "$amount > 0").unwrap();
        reg.add_contract(deposit, ContractKind::Postcondition, "$__result").unwrap();
        reg.add_method(account, "balance", []).unwrap();
        let open = reg.add_method(account, "open", []).unwrap();
        reg.set_static(open, true).unwrap();

        let util = reg.add_class("Util", ClassKind::Class, true).unwrap();
        reg.add_method(util, "noop", []).unwrap();
        reg
    }

    fn account() -> Value {
        Value::Object(Object::new("Account").with_field("balance", 0))
    }

    #[test]
    fn pointcut_orders_checkers_outermost_first() {
        let reg = registry();
        let weaver = Weaver::new(&reg, CheckerConfig::default());
        let this = account();

        let chain = weaver
            .advice_for(&MethodRef::new("Account", "deposit"), Some(&this))
            .unwrap();
        assert_eq!(chain.names(), vec!["precondition", "invariant", "postcondition"]);

        let chain = weaver
            .advice_for(&MethodRef::new("Account", "balance"), Some(&this))
            .unwrap();
        assert_eq!(chain.names(), vec!["invariant"]);

        let chain = weaver.advice_for(&MethodRef::new("Account", "open"), None).unwrap();
        assert!(chain.is_empty());

        let chain = weaver.advice_for(&MethodRef::new("Util", "noop"), None).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn disabled_checkers_are_not_woven() {
        let reg = registry();
        let weaver = Weaver::new(&reg, CheckerConfig::postconditions_only());
        let this = account();
        let chain = weaver
            .advice_for(&MethodRef::new("Account", "deposit"), Some(&this))
            .unwrap();
        assert_eq!(chain.names(), vec!["postcondition"]);
    }

    #[test]
    fn unresolvable_calls_are_metadata_errors() {
        let reg = registry();
        let weaver = Weaver::new(&reg, CheckerConfig::default());
        let err = weaver
            .call("Ghost", "run", None, Vec::new(), |_, _| Ok(Value::Null))
            .unwrap_err();
        assert!(matches!(err, ContractError::Metadata(_)));

        let err = weaver
            .call("Util", "missing", None, Vec::new(), |_, _| Ok(Value::Null))
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown method: Util::missing");
    }
}
