//! Runtime design-by-contract checking for intercepted method calls.
//!
//! Contracts (preconditions, postconditions and class invariants) are
//! declared in a [`MetadataReader`](deal_core::MetadataReader) and enforced
//! by checkers woven around method calls:
//!
//! ```text
//! Weaver::call(class, method, receiver, args, body)
//!   -> PreconditionChecker   (arguments, $this)
//!     -> InvariantChecker    (after the call: $this)
//!       -> PostconditionChecker (arguments, $this, $__old, $__result)
//!         -> body
//! ```
//!
//! Contract expressions are parsed by [`expr`] and evaluated by
//! [`interpreter`] against an [`EvaluationContext`].

pub mod aspect;
pub mod config;
pub mod context;
pub mod contracts;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod weaver;

pub use aspect::{
    ClosureInvocation, Interceptor, InterceptorChain, InvariantChecker, MethodInvocation,
    MethodRef, PostconditionChecker, PreconditionChecker,
};
pub use config::{CheckerConfig, Reporting};
pub use context::EvaluationContext;
pub use contracts::{ContractViolation, ViolationCause, ViolationReport};
pub use error::{ContractError, MethodError};
pub use interpreter::EvalError;
pub use weaver::Weaver;
