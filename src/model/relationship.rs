//! Relationship records and traversal direction.

use serde::{Deserialize, Serialize};

use super::{NodeId, StoredProperties};

/// Storage-assigned relationship handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelId(pub u64);

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which edges of a node to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// A typed, directed edge `src -[rel_type]-> dst`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    pub src: NodeId,
    pub dst: NodeId,
    pub rel_type: String,
    pub properties: StoredProperties,
}

impl Relationship {
    /// True when `node` is the start or end of this edge.
    pub fn touches(&self, node: NodeId) -> bool {
        self.src == node || self.dst == node
    }
}
