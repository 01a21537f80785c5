//! Evaluation contexts: the variables a contract expression can see.
//!
//! Each checker builds its context through a dedicated constructor so the
//! binding rules hold by construction:
//! - preconditions see the arguments and `$this`, never `$__result`;
//! - postconditions additionally see `$__result` and, when a snapshot was
//!   taken, `$__old`;
//! - invariants see only `$this`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use deal_core::{Param, Value};

/// Binding name of the receiver.
pub const THIS: &str = "this";
/// Binding name of the receiver snapshot taken before the call.
pub const OLD: &str = "__old";
/// Binding name of the method's return value.
pub const RESULT: &str = "__result";

/// Ordered name -> value bindings for one contract evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    bindings: IndexMap<String, Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds arguments to parameter names positionally.
    ///
    /// Missing trailing arguments take the parameter's default; a missing
    /// argument without a default stays unbound. Surplus arguments are ignored.
    pub fn with_arguments(params: &[Param], args: &[Value]) -> Self {
        let mut ctx = Self::new();
        for (index, param) in params.iter().enumerate() {
            match args.get(index).or(param.default.as_ref()) {
                Some(value) => ctx.bind(&param.name, value.clone()),
                None => {
                    tracing::trace!(param = %param.name, "argument missing and no default; left unbound");
                }
            }
        }
        ctx
    }

    /// Context for preconditions: arguments and `$this`.
    pub fn for_precondition(params: &[Param], args: &[Value], this: Option<&Value>) -> Self {
        let mut ctx = Self::with_arguments(params, args);
        if let Some(this) = this {
            ctx.bind(THIS, this.clone());
        }
        ctx
    }

    /// Context for postconditions: arguments, `$this` as it is after the call,
    /// the optional `$__old` snapshot and `$__result`.
    pub fn for_postcondition(
        params: &[Param],
        args: &[Value],
        this: Option<&Value>,
        old: Option<Value>,
        result: Value,
    ) -> Self {
        let mut ctx = Self::for_precondition(params, args, this);
        if let Some(old) = old {
            ctx.bind(OLD, old);
        }
        ctx.bind(RESULT, result);
        ctx
    }

    /// Context for invariants: only `$this`.
    pub fn for_invariant(this: &Value) -> Self {
        let mut ctx = Self::new();
        ctx.bind(THIS, this.clone());
        ctx
    }

    /// Binds (or rebinds) a name.
    pub fn bind(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn bindings(&self) -> &IndexMap<String, Value> {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Renders the bindings as a JSON object for diagnostics.
    pub fn to_json(&self) -> serde_json::Value {
        let members = self
            .bindings
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::Value::Object(members)
    }
}
