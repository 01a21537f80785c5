//! Class and method definitions.
//!
//! [`ClassDef`] is the reflection metadata of one class or interface: its
//! place in the hierarchy, whether instances can be snapshotted, its
//! invariants and the methods it declares. [`MethodDef`] carries a method's
//! parameter list and its own (non-inherited) contract declarations.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::contract::{ContractDecl, ContractKind};
use crate::id::{ClassId, MethodId};
use crate::value::Value;

/// Whether a type is a concrete class or an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
}

/// A class or interface in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    pub kind: ClassKind,
    /// Superclass (classes) or `None`. Interfaces never have one; they list
    /// the interfaces they extend in [`interfaces`](ClassDef::interfaces).
    pub parent: Option<ClassId>,
    /// Directly implemented (or, for interfaces, extended) interfaces.
    pub interfaces: Vec<ClassId>,
    /// Whether instances may be copied to give postconditions an "old" state.
    /// Always `false` for interfaces.
    pub cloneable: bool,
    /// Invariants declared on this class itself.
    pub invariants: Vec<ContractDecl>,
    /// Methods declared on this class itself, in declaration order.
    pub methods: Vec<MethodId>,
}

impl ClassDef {
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }
}

/// A named method parameter with an optional default used when the caller
/// omits the argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: Value) -> Self {
        Param {
            name: name.into(),
            default: Some(default),
        }
    }
}

/// Parameter lists are almost always short.
pub type ParamList = SmallVec<[Param; 4]>;

/// A method declared on a class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    pub id: MethodId,
    pub name: String,
    /// The class that declares this method.
    pub class: ClassId,
    pub params: ParamList,
    /// Static methods have no receiver, so no old state and no invariants.
    pub is_static: bool,
    /// Contracts declared on this method itself.
    pub contracts: Vec<ContractDecl>,
}

impl MethodDef {
    /// This method's own contracts of one kind, in declaration order.
    pub fn contracts_of(&self, kind: ContractKind) -> impl Iterator<Item = &ContractDecl> + '_ {
        self.contracts.iter().filter(move |c| c.kind == kind)
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}
