//! # Property Graph Model
//!
//! Plain data that crosses every boundary of the property layer:
//! storage ↔ converters ↔ search ↔ callers.
//!
//! Design rule: no storage handles and no key descriptors here.
//! Pure data, no I/O and no state.

pub mod node;
pub mod relationship;
pub mod value;
pub mod stored;
pub mod value_type;

pub use node::{Node, NodeId};
pub use relationship::{Relationship, RelId, Direction};
pub use value::Value;
pub use stored::StoredProperties;
pub use value_type::ValueType;

use serde::{Deserialize, Serialize};

/// Identifies either kind of graph entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityId {
    Node(NodeId),
    Relationship(RelId),
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityId::Node(id) => write!(f, "n{id}"),
            EntityId::Relationship(id) => write!(f, "r{id}"),
        }
    }
}
