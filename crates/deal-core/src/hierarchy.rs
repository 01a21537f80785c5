//! The class registry: an inheritance graph of classes and interfaces with
//! their methods and contract declarations.
//!
//! Inheritance is stored twice: as `parent`/`interfaces` fields on each
//! [`ClassDef`] (declaration order, used for ancestor linearization) and as a
//! petgraph `DiGraph` with an edge from every type to each type it inherits
//! from (used to reject cycles and to answer subtype queries).

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::class::{ClassDef, ClassKind, MethodDef, Param, ParamList};
use crate::contract::{ContractDecl, ContractKind};
use crate::error::CoreError;
use crate::id::{ClassId, MethodId};
use crate::reader::MetadataReader;

/// The kind of an inheritance edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inheritance {
    /// Class extends class.
    Extends,
    /// Class implements interface, or interface extends interface.
    Implements,
}

/// In-memory registry of classes, interfaces and methods.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    /// Edge `a -> b` means `a` inherits from `b`. Node index == ClassId.0.
    graph: DiGraph<ClassId, Inheritance, u32>,
    /// Classes indexed by ClassId.0.
    classes: Vec<ClassDef>,
    /// Methods indexed by MethodId.0.
    methods: Vec<MethodDef>,
    names: HashMap<String, ClassId>,
    method_index: HashMap<(ClassId, String), MethodId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered classes and interfaces.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// All registered classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter()
    }

    /// Registers a class or interface and returns its id.
    ///
    /// `cloneable` is ignored for interfaces, which are never cloneable.
    pub fn add_class(
        &mut self,
        name: &str,
        kind: ClassKind,
        cloneable: bool,
    ) -> Result<ClassId, CoreError> {
        if self.names.contains_key(name) {
            return Err(CoreError::DuplicateClassName {
                name: name.to_string(),
            });
        }
        let id = ClassId(self.classes.len() as u32);
        let idx = self.graph.add_node(id);
        debug_assert_eq!(ClassId::from(idx), id);

        self.classes.push(ClassDef {
            id,
            name: name.to_string(),
            kind,
            parent: None,
            interfaces: Vec::new(),
            cloneable: cloneable && kind == ClassKind::Class,
            invariants: Vec::new(),
            methods: Vec::new(),
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Makes `child` extend `parent`. Both must be classes and `child` must
    /// not have a superclass yet.
    pub fn set_parent(&mut self, child: ClassId, parent: ClassId) -> Result<(), CoreError> {
        let child_def = self.get(child)?;
        let parent_def = self.get(parent)?;
        if child_def.is_interface() || parent_def.is_interface() {
            return Err(CoreError::InvalidInheritance {
                reason: format!(
                    "'{}' cannot extend '{}': only classes have superclasses",
                    child_def.name, parent_def.name
                ),
            });
        }
        if let Some(existing) = child_def.parent {
            return Err(CoreError::InvalidInheritance {
                reason: format!(
                    "'{}' already extends '{}'",
                    child_def.name,
                    self.get(existing)?.name
                ),
            });
        }
        self.link(child, parent, Inheritance::Extends)?;
        self.classes[child.0 as usize].parent = Some(parent);
        Ok(())
    }

    /// Makes `class` implement (or, for an interface, extend) `interface`.
    pub fn add_interface(&mut self, class: ClassId, interface: ClassId) -> Result<(), CoreError> {
        let class_def = self.get(class)?;
        let iface_def = self.get(interface)?;
        if !iface_def.is_interface() {
            return Err(CoreError::InvalidInheritance {
                reason: format!(
                    "'{}' cannot implement '{}': it is not an interface",
                    class_def.name, iface_def.name
                ),
            });
        }
        if class_def.interfaces.contains(&interface) {
            return Ok(());
        }
        self.link(class, interface, Inheritance::Implements)?;
        self.classes[class.0 as usize].interfaces.push(interface);
        Ok(())
    }

    fn link(&mut self, from: ClassId, to: ClassId, kind: Inheritance) -> Result<(), CoreError> {
        let from_idx: NodeIndex<u32> = from.into();
        let to_idx: NodeIndex<u32> = to.into();
        if from == to || has_path_connecting(&self.graph, to_idx, from_idx, None) {
            return Err(CoreError::CyclicHierarchy {
                class: self.get(from)?.name.clone(),
            });
        }
        self.graph.add_edge(from_idx, to_idx, kind);
        Ok(())
    }

    /// Declares a method with the given parameters on `class`.
    pub fn add_method(
        &mut self,
        class: ClassId,
        name: &str,
        params: impl IntoIterator<Item = Param>,
    ) -> Result<MethodId, CoreError> {
        let class_name = self.get(class)?.name.clone();
        let key = (class, name.to_string());
        if self.method_index.contains_key(&key) {
            return Err(CoreError::DuplicateMethod {
                class: class_name,
                method: name.to_string(),
            });
        }
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(MethodDef {
            id,
            name: name.to_string(),
            class,
            params: params.into_iter().collect::<ParamList>(),
            is_static: false,
            contracts: Vec::new(),
        });
        self.method_index.insert(key, id);
        self.classes[class.0 as usize].methods.push(id);
        Ok(id)
    }

    /// Marks a method as static (no receiver).
    pub fn set_static(&mut self, method: MethodId, is_static: bool) -> Result<(), CoreError> {
        self.method_mut(method)?.is_static = is_static;
        Ok(())
    }

    /// Attaches a precondition or postcondition to a method.
    pub fn add_contract(
        &mut self,
        method: MethodId,
        kind: ContractKind,
        expression: &str,
    ) -> Result<(), CoreError> {
        let def = self.method(method)?;
        let class_name = self.get(def.class)?.name.clone();
        let owner = format!("{}::{}", class_name, def.name);
        if kind == ContractKind::Invariant {
            return Err(CoreError::InvalidContract {
                owner,
                reason: "invariants belong to classes, not methods".into(),
            });
        }
        if expression.trim().is_empty() {
            return Err(CoreError::InvalidContract {
                owner,
                reason: "empty expression".into(),
            });
        }
        let decl = match kind {
            ContractKind::Precondition => {
                ContractDecl::precondition(&class_name, &def.name, expression)
            }
            _ => ContractDecl::postcondition(&class_name, &def.name, expression),
        };
        self.method_mut(method)?.contracts.push(decl);
        Ok(())
    }

    /// Attaches an invariant to a class.
    pub fn add_invariant(&mut self, class: ClassId, expression: &str) -> Result<(), CoreError> {
        let def = self.get(class)?;
        if expression.trim().is_empty() {
            return Err(CoreError::InvalidContract {
                owner: def.name.clone(),
                reason: "empty expression".into(),
            });
        }
        let decl = ContractDecl::invariant(&def.name, expression);
        self.classes[class.0 as usize].invariants.push(decl);
        Ok(())
    }

    /// Looks up a method by id.
    pub fn method(&self, id: MethodId) -> Result<&MethodDef, CoreError> {
        self.methods
            .get(id.0 as usize)
            .ok_or(CoreError::MethodNotFound { id })
    }

    fn method_mut(&mut self, id: MethodId) -> Result<&mut MethodDef, CoreError> {
        self.methods
            .get_mut(id.0 as usize)
            .ok_or(CoreError::MethodNotFound { id })
    }

    fn get(&self, id: ClassId) -> Result<&ClassDef, CoreError> {
        self.classes
            .get(id.0 as usize)
            .ok_or(CoreError::ClassNotFound { id })
    }

    /// Returns `true` if `class` is `ancestor` or inherits from it.
    pub fn is_subtype_of(&self, class: ClassId, ancestor: ClassId) -> bool {
        if class.0 as usize >= self.classes.len() || ancestor.0 as usize >= self.classes.len() {
            return false;
        }
        class == ancestor || has_path_connecting(&self.graph, class.into(), ancestor.into(), None)
    }
}

impl MetadataReader for ClassRegistry {
    fn resolve_class(&self, name: &str) -> Result<ClassId, CoreError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| CoreError::UnknownClass {
                name: name.to_string(),
            })
    }

    fn class(&self, id: ClassId) -> Result<&ClassDef, CoreError> {
        self.get(id)
    }

    fn ancestors(&self, id: ClassId) -> Result<Vec<ClassId>, CoreError> {
        let start = self.get(id)?;

        // Superclass chain, nearest first.
        let mut chain = Vec::new();
        let mut current = start.parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.get(parent)?.parent;
        }

        // Interfaces reachable from the class or any superclass, breadth-first.
        let mut seen: HashSet<ClassId> = chain.iter().copied().collect();
        seen.insert(id);
        let mut queue: VecDeque<ClassId> = VecDeque::new();
        for owner in std::iter::once(id).chain(chain.iter().copied()) {
            queue.extend(self.get(owner)?.interfaces.iter().copied());
        }
        let mut interfaces = Vec::new();
        while let Some(iface) = queue.pop_front() {
            if !seen.insert(iface) {
                continue;
            }
            interfaces.push(iface);
            queue.extend(self.get(iface)?.interfaces.iter().copied());
        }

        chain.extend(interfaces);
        Ok(chain)
    }

    fn declared_method(&self, class: ClassId, name: &str) -> Result<Option<&MethodDef>, CoreError> {
        self.get(class)?;
        match self.method_index.get(&(class, name.to_string())) {
            Some(id) => self.method(*id).map(Some),
            None => Ok(None),
        }
    }
}
