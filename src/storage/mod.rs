//! # Storage Contract
//!
//! The property layer reads and writes through two traits:
//!
//! - [`PropertyContainer`]: the get/set/remove surface of one node or relationship
//! - [`GraphStore`]: node/relationship lifecycle, labels and adjacency
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryGraph` | `memory` | In-memory reference backend for testing/embedding |
//!
//! All calls are synchronous. A backend signals transient conflicts with
//! [`Error::Retry`](crate::Error::Retry); the property layer never wraps it.

pub mod memory;

use crate::model::*;
use crate::Result;

pub use memory::MemoryGraph;

// ============================================================================
// PropertyContainer
// ============================================================================

/// Storage-facing read/write surface of a single node or relationship.
///
/// Keys are database names and values are in stored form.
pub trait PropertyContainer {
    fn get_property(&self, key: &str) -> Option<Value>;

    fn set_property(&self, key: &str, value: Value) -> Result<()>;

    fn remove_property(&self, key: &str) -> Result<()>;

    fn has_property(&self, key: &str) -> bool {
        self.get_property(key).is_some()
    }
}

// ============================================================================
// GraphStore
// ============================================================================

/// The storage engine as seen from the property layer.
pub trait GraphStore: Send + Sync + 'static {
    // ========================================================================
    // Node CRUD
    // ========================================================================

    /// Create a node with the given labels and stored properties.
    fn create_node(&self, labels: &[&str], props: StoredProperties) -> Result<NodeId>;

    /// Get a node record by ID.
    fn get_node(&self, id: NodeId) -> Option<Node>;

    /// Delete a node and all its relationships. Returns true if it existed.
    fn delete_node(&self, id: NodeId) -> Result<bool>;

    fn node_property(&self, id: NodeId, key: &str) -> Option<Value>;

    /// Set a property on a node (upsert).
    fn set_node_property(&self, id: NodeId, key: &str, val: Value) -> Result<()>;

    fn remove_node_property(&self, id: NodeId, key: &str) -> Result<()>;

    fn node_labels(&self, id: NodeId) -> Vec<String>;

    fn add_label(&self, id: NodeId, label: &str) -> Result<()>;

    fn remove_label(&self, id: NodeId, label: &str) -> Result<()>;

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    fn create_relationship(
        &self,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
        props: StoredProperties,
    ) -> Result<RelId>;

    fn get_relationship(&self, id: RelId) -> Option<Relationship>;

    fn delete_relationship(&self, id: RelId) -> Result<bool>;

    fn relationship_property(&self, id: RelId, key: &str) -> Option<Value>;

    fn set_relationship_property(&self, id: RelId, key: &str, val: Value) -> Result<()>;

    fn remove_relationship_property(&self, id: RelId, key: &str) -> Result<()>;

    // ========================================================================
    // Traversal & scan
    // ========================================================================

    /// All relationships of a node, optionally filtered by direction and type.
    fn get_relationships(
        &self,
        node: NodeId,
        dir: Direction,
        rel_type: Option<&str>,
    ) -> Vec<Relationship>;

    /// All nodes carrying a label, in creation order.
    fn nodes_by_label(&self, label: &str) -> Vec<NodeId>;

    /// Find a node by a stored property value.
    ///
    /// Default: scans every node.
    fn find_node(&self, key: &str, value: &Value) -> Option<NodeId> {
        self.all_nodes()
            .into_iter()
            .find(|id| self.node_property(*id, key).as_ref() == Some(value))
    }

    fn all_nodes(&self) -> Vec<NodeId>;

    // ========================================================================
    // Entity-generic helpers
    // ========================================================================

    fn entity_property(&self, id: EntityId, key: &str) -> Option<Value> {
        match id {
            EntityId::Node(n) => self.node_property(n, key),
            EntityId::Relationship(r) => self.relationship_property(r, key),
        }
    }

    fn set_entity_property(&self, id: EntityId, key: &str, val: Value) -> Result<()> {
        match id {
            EntityId::Node(n) => self.set_node_property(n, key, val),
            EntityId::Relationship(r) => self.set_relationship_property(r, key, val),
        }
    }

    fn remove_entity_property(&self, id: EntityId, key: &str) -> Result<()> {
        match id {
            EntityId::Node(n) => self.remove_node_property(n, key),
            EntityId::Relationship(r) => self.remove_relationship_property(r, key),
        }
    }
}
