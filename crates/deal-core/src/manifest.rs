//! JSON manifests describing a class hierarchy and its contracts.
//!
//! A manifest is the declarative counterpart of building a
//! [`ClassRegistry`] by hand. Classes may appear in any order; parents and
//! interfaces are linked in a second pass once every name is known.
//!
//! ```json
//! {
//!   "classes": [
//!     {
//!       "name": "Account",
//!       "cloneable": true,
//!       "invariants": ["$this->balance >= 0"],
//!       "methods": [
//!         {
//!           "name": "deposit",
//!           "params": [{ "name": "amount" }],
//!           "requires": ["$amount > 0"],
//!           "ensures": ["$this->balance == $__old->balance + $amount"]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::class::{ClassKind, Param};
use crate::contract::ContractKind;
use crate::error::CoreError;
use crate::hierarchy::ClassRegistry;
use crate::reader::MetadataReader;
use crate::value::Value;

/// Top-level manifest document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub classes: Vec<ClassManifest>,
}

fn default_cloneable() -> bool {
    true
}

/// One class or interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassManifest {
    pub name: String,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default = "default_cloneable")]
    pub cloneable: bool,
    #[serde(default)]
    pub invariants: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodManifest>,
}

/// One method and its own contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodManifest {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamManifest>,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub ensures: Vec<String>,
}

/// A parameter with an optional JSON default value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamManifest {
    pub name: String,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

impl Manifest {
    pub fn from_json_str(json: &str) -> Result<Manifest, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Manifest, CoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Builds a registry from the manifest.
    ///
    /// Fails on duplicate names, unknown parents or interfaces, invalid
    /// inheritance, cycles and empty contract expressions.
    pub fn build_registry(&self) -> Result<ClassRegistry, CoreError> {
        let mut reg = ClassRegistry::new();

        for class in &self.classes {
            let id = reg.add_class(&class.name, class.kind, class.cloneable)?;
            for invariant in &class.invariants {
                reg.add_invariant(id, invariant)?;
            }
            for method in &class.methods {
                let params = method.params.iter().map(|p| match &p.default {
                    Some(default) => Param::with_default(&p.name, Value::from_json(default)),
                    None => Param::new(&p.name),
                });
                let method_id = reg.add_method(id, &method.name, params)?;
                reg.set_static(method_id, method.is_static)?;
                for expr in &method.requires {
                    reg.add_contract(method_id, ContractKind::Precondition, expr)?;
                }
                for expr in &method.ensures {
                    reg.add_contract(method_id, ContractKind::Postcondition, expr)?;
                }
            }
        }

        for class in &self.classes {
            let id = reg.resolve_class(&class.name)?;
            if let Some(parent) = &class.parent {
                let parent_id = reg.resolve_class(parent)?;
                reg.set_parent(id, parent_id)?;
            }
            for iface in &class.interfaces {
                let iface_id = reg.resolve_class(iface)?;
                reg.add_interface(id, iface_id)?;
            }
        }

        Ok(reg)
    }
}
