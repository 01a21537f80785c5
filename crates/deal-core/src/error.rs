//! Core error types for deal-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! metadata-resolution failures of the class hierarchy and manifest loading.

use crate::id::{ClassId, MethodId};
use thiserror::Error;

/// Metadata errors produced by the deal-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Attempting to register a class name that already exists in the registry.
    #[error("duplicate class name: '{name}'")]
    DuplicateClassName { name: String },

    /// No class is registered under this name.
    #[error("unknown class: '{name}'")]
    UnknownClass { name: String },

    /// A ClassId was not found in the registry.
    #[error("class not found: ClassId({id})", id = id.0)]
    ClassNotFound { id: ClassId },

    /// A MethodId was not found in the registry.
    #[error("method not found: MethodId({id})", id = id.0)]
    MethodNotFound { id: MethodId },

    /// The class (and its ancestors) have no method with this name.
    #[error("unknown method: {class}::{method}")]
    UnknownMethod { class: String, method: String },

    /// A method with this name is already declared on the class.
    #[error("duplicate method: {class}::{method}")]
    DuplicateMethod { class: String, method: String },

    /// An inheritance edge is not allowed (e.g. a class extending an interface).
    #[error("invalid inheritance: {reason}")]
    InvalidInheritance { reason: String },

    /// Adding an inheritance edge would close a cycle.
    #[error("cyclic hierarchy: '{class}' would inherit from itself")]
    CyclicHierarchy { class: String },

    /// A contract declaration is malformed (e.g. empty expression).
    #[error("invalid contract on {owner}: {reason}")]
    InvalidContract { owner: String, reason: String },

    /// The manifest could not be parsed.
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// The manifest file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
