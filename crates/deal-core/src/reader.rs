//! The [`MetadataReader`] trait: the reflection seam contract checkers read
//! class and method metadata through.
//!
//! [`ClassRegistry`](crate::hierarchy::ClassRegistry) is the in-memory
//! implementation. Checkers only ever depend on this trait, so any other
//! source of metadata (generated tables, a build-time manifest) can stand in.

use crate::class::{ClassDef, MethodDef};
use crate::error::CoreError;
use crate::id::ClassId;

/// Read-only access to the class hierarchy and its contract declarations.
pub trait MetadataReader {
    /// Resolves a class or interface by name.
    fn resolve_class(&self, name: &str) -> Result<ClassId, CoreError>;

    /// Looks up a class by id.
    fn class(&self, id: ClassId) -> Result<&ClassDef, CoreError>;

    /// All ancestors of `id`, excluding `id` itself.
    ///
    /// Order: the superclass chain nearest-first, then every interface
    /// reachable from the class or its superclasses, breadth-first. Each
    /// ancestor appears once.
    fn ancestors(&self, id: ClassId) -> Result<Vec<ClassId>, CoreError>;

    /// The method named `name` declared on `class` itself, if any.
    fn declared_method(&self, class: ClassId, name: &str) -> Result<Option<&MethodDef>, CoreError>;

    /// The method named `name` as seen from `class`: declared on the class
    /// or inherited from the nearest ancestor that declares it.
    fn find_method(&self, class: ClassId, name: &str) -> Result<Option<&MethodDef>, CoreError> {
        if let Some(method) = self.declared_method(class, name)? {
            return Ok(Some(method));
        }
        for ancestor in self.ancestors(class)? {
            if let Some(method) = self.declared_method(ancestor, name)? {
                return Ok(Some(method));
            }
        }
        Ok(None)
    }
}
