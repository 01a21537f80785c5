//! Around advice over method invocations.
//!
//! An [`Interceptor`] wraps a [`MethodInvocation`]: it may inspect the call,
//! run it with `proceed`, and inspect the result. An [`InterceptorChain`]
//! nests interceptors so the first one pushed is the outermost; the innermost
//! `proceed` runs the target invocation itself.
//!
//! The contract checkers in this module are interceptors:
//! [`PreconditionChecker`], [`InvariantChecker`] and [`PostconditionChecker`].

pub mod invariant;
pub mod invocation;
pub mod postcondition;
pub mod precondition;

pub use invariant::InvariantChecker;
pub use invocation::{ClosureInvocation, MethodInvocation, MethodRef};
pub use postcondition::PostconditionChecker;
pub use precondition::PreconditionChecker;

use deal_core::{ClassId, CoreError, MethodDef, MetadataReader, Value};

use crate::error::ContractError;

/// Around advice.
pub trait Interceptor {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    fn invoke(&self, invocation: &mut dyn MethodInvocation) -> Result<Value, ContractError>;
}

/// Interceptors applied outermost-first around a target invocation.
#[derive(Default)]
pub struct InterceptorChain<'a> {
    interceptors: Vec<Box<dyn Interceptor + 'a>>,
}

impl<'a> InterceptorChain<'a> {
    pub fn new() -> Self {
        InterceptorChain {
            interceptors: Vec::new(),
        }
    }

    /// Appends an interceptor inside the ones already present.
    pub fn push(&mut self, interceptor: Box<dyn Interceptor + 'a>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Interceptor names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Runs `target` through every interceptor.
    pub fn invoke(&self, target: &mut dyn MethodInvocation) -> Result<Value, ContractError> {
        let mut link = ChainLink {
            rest: &self.interceptors,
            target,
        };
        link.proceed()
    }
}

/// The invocation handed to one interceptor: proceeding runs the remaining
/// interceptors, then the target.
struct ChainLink<'c, 't, 'a> {
    rest: &'c [Box<dyn Interceptor + 'a>],
    target: &'c mut (dyn MethodInvocation + 't),
}

impl MethodInvocation for ChainLink<'_, '_, '_> {
    fn this(&self) -> Option<&Value> {
        self.target.this()
    }

    fn method(&self) -> &MethodRef {
        self.target.method()
    }

    fn arguments(&self) -> &[Value] {
        self.target.arguments()
    }

    fn proceed(&mut self) -> Result<Value, ContractError> {
        match self.rest.split_first() {
            None => self.target.proceed(),
            Some((first, rest)) => {
                let mut next = ChainLink {
                    rest,
                    target: &mut *self.target,
                };
                first.invoke(&mut next)
            }
        }
    }
}

/// A call resolved against the metadata: the class it is dispatched on and
/// the method definition it reaches (declared there or inherited).
pub(crate) struct ResolvedCall<'r> {
    pub class: ClassId,
    pub method: &'r MethodDef,
    /// `Class::method` of the call, for diagnostics.
    pub site: String,
}

pub(crate) fn resolve_call<'r>(
    reader: &'r dyn MetadataReader,
    method: &MethodRef,
) -> Result<ResolvedCall<'r>, CoreError> {
    let class = reader.resolve_class(&method.class)?;
    let def = reader
        .find_method(class, &method.method)?
        .ok_or_else(|| CoreError::UnknownMethod {
            class: method.class.clone(),
            method: method.method.clone(),
        })?;
    Ok(ResolvedCall {
        class,
        method: def,
        site: method.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records entry and exit around proceed.
    struct Tracer<'l> {
        name: &'static str,
        log: &'l RefCell<Vec<String>>,
    }

    impl Interceptor for Tracer<'_> {
        fn name(&self) -> &'static str {
            self.name
        }

        fn invoke(&self, invocation: &mut dyn MethodInvocation) -> Result<Value, ContractError> {
            self.log.borrow_mut().push(format!("enter {}", self.name));
            let result = invocation.proceed();
            self.log.borrow_mut().push(format!("exit {}", self.name));
            result
        }
    }

    /// Replaces the result without proceeding.
    struct ShortCircuit;

    impl Interceptor for ShortCircuit {
        fn name(&self) -> &'static str {
            "short"
        }

        fn invoke(&self, _: &mut dyn MethodInvocation) -> Result<Value, ContractError> {
            Ok(Value::Str("cached".into()))
        }
    }

    fn target<'l>(
        log: &'l RefCell<Vec<String>>,
    ) -> ClosureInvocation<'static, impl FnMut(Option<&mut Value>, &[Value]) -> Result<Value, crate::error::MethodError> + 'l>
    {
        ClosureInvocation::new(
            MethodRef::new("Svc", "run"),
            None,
            vec![Value::Int(1)],
            move |_: Option<&mut Value>, args: &[Value]| {
                log.borrow_mut().push("body".into());
                Ok(args[0].clone())
            },
        )
    }

    #[test]
    fn first_pushed_is_outermost() {
        let log = RefCell::new(Vec::new());
        let mut chain = InterceptorChain::new();
        chain.push(Box::new(Tracer { name: "outer", log: &log }));
        chain.push(Box::new(Tracer { name: "inner", log: &log }));
        assert_eq!(chain.names(), vec!["outer", "inner"]);

        let mut inv = target(&log);
        assert_eq!(chain.invoke(&mut inv).unwrap(), Value::Int(1));
        assert_eq!(
            *log.borrow(),
            vec!["enter outer", "enter inner", "body", "exit inner", "exit outer"]
        );
    }

    #[test]
    fn empty_chain_runs_target() {
        let log = RefCell::new(Vec::new());
        let chain = InterceptorChain::new();
        let mut inv = target(&log);
        assert_eq!(chain.invoke(&mut inv).unwrap(), Value::Int(1));
        assert_eq!(*log.borrow(), vec!["body"]);
    }

    #[test]
    fn interceptors_may_skip_proceed() {
        let log = RefCell::new(Vec::new());
        let mut chain = InterceptorChain::new();
        chain.push(Box::new(ShortCircuit));
        chain.push(Box::new(Tracer { name: "never", log: &log }));
        let mut inv = target(&log);
        assert_eq!(chain.invoke(&mut inv).unwrap(), Value::Str("cached".into()));
        assert!(log.borrow().is_empty());
    }
}
