//! The interception boundary: a method call paused before its body runs.

use std::fmt;

use deal_core::Value;
use serde::{Deserialize, Serialize};

use crate::error::{ContractError, MethodError};

/// Names the method being called: the class the call is dispatched on and
/// the method name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub class: String,
    pub method: String,
}

impl MethodRef {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        MethodRef {
            class: class.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.method)
    }
}

/// A method call as seen by around advice.
///
/// `proceed` runs the rest of the call (further interceptors, then the
/// method body) and yields its result. The body's own failure surfaces as
/// [`ContractError::MethodFailed`].
pub trait MethodInvocation {
    /// The receiver, `None` for static calls.
    fn this(&self) -> Option<&Value>;

    fn method(&self) -> &MethodRef;

    fn arguments(&self) -> &[Value];

    fn proceed(&mut self) -> Result<Value, ContractError>;
}

/// An invocation whose body is a Rust closure over the receiver and the
/// arguments.
pub struct ClosureInvocation<'a, F> {
    method: MethodRef,
    receiver: Option<&'a mut Value>,
    args: Vec<Value>,
    body: F,
}

impl<'a, F> ClosureInvocation<'a, F>
where
    F: FnMut(Option<&mut Value>, &[Value]) -> Result<Value, MethodError>,
{
    pub fn new(method: MethodRef, receiver: Option<&'a mut Value>, args: Vec<Value>, body: F) -> Self {
        ClosureInvocation {
            method,
            receiver,
            args,
            body,
        }
    }
}

impl<'a, F> MethodInvocation for ClosureInvocation<'a, F>
where
    F: FnMut(Option<&mut Value>, &[Value]) -> Result<Value, MethodError>,
{
    fn this(&self) -> Option<&Value> {
        self.receiver.as_deref()
    }

    fn method(&self) -> &MethodRef {
        &self.method
    }

    fn arguments(&self) -> &[Value] {
        &self.args
    }

    fn proceed(&mut self) -> Result<Value, ContractError> {
        (self.body)(self.receiver.as_deref_mut(), &self.args).map_err(|source| {
            ContractError::MethodFailed {
                method: self.method.to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deal_core::Object;

    #[test]
    fn proceed_runs_the_body_against_the_receiver() {
        let mut counter = Value::Object(Object::new("Counter").with_field("n", 1));
        let mut inv = ClosureInvocation::new(
            MethodRef::new("Counter", "add"),
            Some(&mut counter),
            vec![Value::Int(4)],
            |this: Option<&mut Value>, args: &[Value]| {
                let obj = this.and_then(Value::as_object_mut).ok_or("no receiver")?;
                let (Some(Value::Int(n)), Some(Value::Int(k))) = (obj.field("n").cloned(), args.first()) else {
                    return Err("bad state".into());
                };
                obj.set_field("n", n + k);
                Ok(Value::Int(n + k))
            },
        );
        assert_eq!(inv.method().to_string(), "Counter::add");
        assert_eq!(inv.proceed().unwrap(), Value::Int(5));
        assert_eq!(
            inv.this().and_then(Value::as_object).and_then(|o| o.field("n")),
            Some(&Value::Int(5))
        );
    }

    #[test]
    fn body_failures_become_method_failed() {
        let mut inv = ClosureInvocation::new(
            MethodRef::new("Util", "boom"),
            None,
            Vec::new(),
            |_: Option<&mut Value>, _: &[Value]| Err("kaput".into()),
        );
        let err = inv.proceed().unwrap_err();
        assert!(matches!(err, ContractError::MethodFailed { ref method, .. } if method == "Util::boom"));
        assert_eq!(err.to_string(), "Util::boom failed: kaput");
    }
}
