//! Stable ID newtypes for hierarchy entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `ClassId` cannot be accidentally used where a `MethodId` is expected.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Class (or interface) identity within a [`ClassRegistry`](crate::hierarchy::ClassRegistry).
/// Maps to a petgraph `NodeIndex<u32>` in the inheritance graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// Method identity within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Bridge between ClassId and petgraph's NodeIndex<u32>.

impl From<NodeIndex<u32>> for ClassId {
    fn from(idx: NodeIndex<u32>) -> Self {
        ClassId(idx.index() as u32)
    }
}

impl From<ClassId> for NodeIndex<u32> {
    fn from(id: ClassId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_id_to_node_index_roundtrip() {
        let idx = NodeIndex::<u32>::new(42);
        let class_id = ClassId::from(idx);
        assert_eq!(class_id.0, 42);

        let back: NodeIndex<u32> = class_id.into();
        assert_eq!(back.index(), 42);
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", ClassId(7)), "7");
        assert_eq!(format!("{}", MethodId(99)), "99");
    }

    #[test]
    fn serde_as_plain_numbers() {
        let json = serde_json::to_string(&ClassId(3)).unwrap();
        assert_eq!(json, "3");
        let back: MethodId = serde_json::from_str("12").unwrap();
        assert_eq!(back, MethodId(12));
    }
}
