pub mod class;
pub mod contract;
pub mod error;
pub mod hierarchy;
pub mod id;
pub mod manifest;
pub mod reader;
pub mod value;

// Re-export commonly used types
pub use class::{ClassDef, ClassKind, MethodDef, Param, ParamList};
pub use contract::{dedup_contracts, ContractDecl, ContractIdentity, ContractKind};
pub use error::CoreError;
pub use hierarchy::{ClassRegistry, Inheritance};
pub use id::{ClassId, MethodId};
pub use manifest::Manifest;
pub use reader::MetadataReader;
pub use value::{to_value, Object, Value};
