//! Node records.

use serde::{Deserialize, Serialize};

use super::{StoredProperties, Value};

/// Storage-assigned node handle. Not the entity uuid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a backend keeps per node: its labels and stored-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: StoredProperties,
}

impl Node {
    /// Stored value under a database name.
    pub fn get(&self, db_name: &str) -> Option<&Value> {
        self.properties.get(db_name)
    }
}
