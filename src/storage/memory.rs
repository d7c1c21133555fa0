//! `MemoryGraph`: the reference `GraphStore`, kept in lock-guarded maps.
//!
//! ## Caveats
//!
//! - Writes land immediately. The `Transaction` seen by the property layer
//!   only gates and records them, it cannot roll anything back.
//! - `find_node()` scans every node; there are no property indexes.
//! - `inject_retry_once()` makes the next property write fail with
//!   `Error::Retry`, for exercising retry propagation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::model::*;
use crate::{Error, Result};
use super::GraphStore;

// ============================================================================
// MemoryGraph
// ============================================================================

/// Most nodes have only a handful of relationships.
type AdjacencyList = SmallVec<[RelId; 4]>;

/// In-memory property graph storage.
#[derive(Clone, Default)]
pub struct MemoryGraph {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    nodes: RwLock<HashMap<NodeId, Node>>,
    relationships: RwLock<HashMap<RelId, Relationship>>,
    /// Relationships touching each node, in creation order.
    adjacency: RwLock<HashMap<NodeId, AdjacencyList>>,
    /// label → node IDs in insertion order
    label_index: RwLock<HashMap<String, Vec<NodeId>>>,
    next_node_id: AtomicU64,
    next_rel_id: AtomicU64,
    /// Fail the next write with `Error::Retry`.
    retry_pending: AtomicBool,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next property write fail with a retry signal, the way a real
    /// engine reports a deadlock or write conflict.
    pub fn inject_retry_once(&self) {
        self.inner.retry_pending.store(true, Ordering::SeqCst);
    }

    fn check_retry(&self) -> Result<()> {
        if self.inner.retry_pending.swap(false, Ordering::SeqCst) {
            return Err(Error::Retry("write conflict".into()));
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.inner.nodes.read().len()
    }

    pub fn relationship_count(&self) -> usize {
        self.inner.relationships.read().len()
    }

    fn with_node<T>(&self, id: NodeId, f: impl FnOnce(&mut Node) -> T) -> Result<T> {
        let mut nodes = self.inner.nodes.write();
        let node = nodes.get_mut(&id).ok_or_else(|| Error::NotFound(format!("node {id}")))?;
        Ok(f(node))
    }

    fn with_relationship<T>(&self, id: RelId, f: impl FnOnce(&mut Relationship) -> T) -> Result<T> {
        let mut rels = self.inner.relationships.write();
        let rel = rels.get_mut(&id).ok_or_else(|| Error::NotFound(format!("relationship {id}")))?;
        Ok(f(rel))
    }

    fn unindex_label(&self, label: &str, id: NodeId) {
        if let Some(ids) = self.inner.label_index.write().get_mut(label) {
            ids.retain(|n| *n != id);
        }
    }
}

impl GraphStore for MemoryGraph {
    // ========================================================================
    // Nodes
    // ========================================================================

    fn create_node(&self, labels: &[&str], props: StoredProperties) -> Result<NodeId> {
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed) + 1);
        let labels: Vec<String> = labels.iter().map(|l| (*l).to_owned()).collect();
        {
            let mut index = self.inner.label_index.write();
            for label in &labels {
                index.entry(label.clone()).or_default().push(id);
            }
        }
        self.inner.nodes.write().insert(id, Node { id, labels, properties: props });
        self.inner.adjacency.write().insert(id, AdjacencyList::new());
        Ok(id)
    }

    fn get_node(&self, id: NodeId) -> Option<Node> {
        self.inner.nodes.read().get(&id).cloned()
    }

    fn delete_node(&self, id: NodeId) -> Result<bool> {
        let attached = self.inner.adjacency.write().remove(&id).unwrap_or_default();
        for rel in attached {
            self.delete_relationship(rel)?;
        }
        let Some(node) = self.inner.nodes.write().remove(&id) else { return Ok(false) };
        for label in &node.labels {
            self.unindex_label(label, id);
        }
        Ok(true)
    }

    fn node_property(&self, id: NodeId, key: &str) -> Option<Value> {
        self.inner.nodes.read().get(&id)?.get(key).cloned()
    }

    fn set_node_property(&self, id: NodeId, key: &str, val: Value) -> Result<()> {
        self.check_retry()?;
        self.with_node(id, |n| {
            n.properties.insert(key.to_owned(), val);
        })
    }

    fn remove_node_property(&self, id: NodeId, key: &str) -> Result<()> {
        self.check_retry()?;
        self.with_node(id, |n| {
            n.properties.remove(key);
        })
    }

    fn node_labels(&self, id: NodeId) -> Vec<String> {
        self.inner.nodes.read().get(&id).map(|n| n.labels.clone()).unwrap_or_default()
    }

    fn add_label(&self, id: NodeId, label: &str) -> Result<()> {
        let added = self.with_node(id, |n| {
            let missing = !n.labels.iter().any(|l| l == label);
            if missing {
                n.labels.push(label.to_owned());
            }
            missing
        })?;
        if added {
            self.inner.label_index.write().entry(label.to_owned()).or_default().push(id);
        }
        Ok(())
    }

    fn remove_label(&self, id: NodeId, label: &str) -> Result<()> {
        self.with_node(id, |n| n.labels.retain(|l| l != label))?;
        self.unindex_label(label, id);
        Ok(())
    }

    // ========================================================================
    // Relationships
    // ========================================================================

    fn create_relationship(
        &self,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
        props: StoredProperties,
    ) -> Result<RelId> {
        {
            let nodes = self.inner.nodes.read();
            if let Some(missing) = [src, dst].into_iter().find(|n| !nodes.contains_key(n)) {
                return Err(Error::NotFound(format!("node {missing}")));
            }
        }

        let id = RelId(self.inner.next_rel_id.fetch_add(1, Ordering::Relaxed) + 1);
        let rel = Relationship { id, src, dst, rel_type: rel_type.to_owned(), properties: props };
        self.inner.relationships.write().insert(id, rel);

        let mut adjacency = self.inner.adjacency.write();
        adjacency.entry(src).or_default().push(id);
        if src != dst {
            adjacency.entry(dst).or_default().push(id);
        }
        Ok(id)
    }

    fn get_relationship(&self, id: RelId) -> Option<Relationship> {
        self.inner.relationships.read().get(&id).cloned()
    }

    fn delete_relationship(&self, id: RelId) -> Result<bool> {
        let Some(rel) = self.inner.relationships.write().remove(&id) else { return Ok(false) };
        let mut adjacency = self.inner.adjacency.write();
        for end in [rel.src, rel.dst] {
            if let Some(list) = adjacency.get_mut(&end) {
                list.retain(|r| *r != id);
            }
        }
        Ok(true)
    }

    fn relationship_property(&self, id: RelId, key: &str) -> Option<Value> {
        self.inner.relationships.read().get(&id)?.properties.get(key).cloned()
    }

    fn set_relationship_property(&self, id: RelId, key: &str, val: Value) -> Result<()> {
        self.check_retry()?;
        self.with_relationship(id, |r| {
            r.properties.insert(key.to_owned(), val);
        })
    }

    fn remove_relationship_property(&self, id: RelId, key: &str) -> Result<()> {
        self.check_retry()?;
        self.with_relationship(id, |r| {
            r.properties.remove(key);
        })
    }

    // ========================================================================
    // Traversal & scan
    // ========================================================================

    fn get_relationships(
        &self,
        node: NodeId,
        dir: Direction,
        rel_type: Option<&str>,
    ) -> Vec<Relationship> {
        let adj = self.inner.adjacency.read();
        let rels = self.inner.relationships.read();
        let Some(rel_ids) = adj.get(&node) else { return Vec::new() };

        rel_ids
            .iter()
            .filter_map(|rid| rels.get(rid))
            .filter(|rel| match dir {
                Direction::Outgoing => rel.src == node,
                Direction::Incoming => rel.dst == node,
                Direction::Both => rel.touches(node),
            })
            .filter(|rel| rel_type.is_none_or(|t| rel.rel_type == t))
            .cloned()
            .collect()
    }

    fn nodes_by_label(&self, label: &str) -> Vec<NodeId> {
        self.inner.label_index.read().get(label).cloned().unwrap_or_default()
    }

    fn all_nodes(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.inner.nodes.read().keys().copied().collect();
        ids.sort();
        ids
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_node() {
        let db = MemoryGraph::new();

        let mut props = StoredProperties::new();
        props.insert("name".into(), Value::from("Ada"));

        let id = db.create_node(&["Person"], props).unwrap();
        let node = db.get_node(id).unwrap();

        assert_eq!(node.labels, vec!["Person"]);
        assert_eq!(node.get("name"), Some(&Value::from("Ada")));
    }

    #[test]
    fn test_create_relationship() {
        let db = MemoryGraph::new();
        let a = db.create_node(&["Person"], StoredProperties::new()).unwrap();
        let b = db.create_node(&["Person"], StoredProperties::new()).unwrap();

        let rel_id = db.create_relationship(a, b, "KNOWS", StoredProperties::new()).unwrap();
        let rel = db.get_relationship(rel_id).unwrap();

        assert_eq!(rel.src, a);
        assert_eq!(rel.dst, b);
        assert_eq!(rel.rel_type, "KNOWS");
        assert_eq!(db.get_relationships(a, Direction::Outgoing, Some("KNOWS")).len(), 1);
        assert_eq!(db.get_relationships(a, Direction::Incoming, None).len(), 0);
    }

    #[test]
    fn test_delete_node_detaches() {
        let db = MemoryGraph::new();
        let a = db.create_node(&["Person"], StoredProperties::new()).unwrap();
        let b = db.create_node(&["Person"], StoredProperties::new()).unwrap();
        db.create_relationship(a, b, "KNOWS", StoredProperties::new()).unwrap();

        assert!(db.delete_node(a).unwrap());
        assert!(db.get_node(a).is_none());
        assert_eq!(db.relationship_count(), 0);
        assert_eq!(db.nodes_by_label("Person"), vec![b]);
    }

    #[test]
    fn test_labels() {
        let db = MemoryGraph::new();
        let a = db.create_node(&["A"], StoredProperties::new()).unwrap();
        db.add_label(a, "B").unwrap();
        db.add_label(a, "B").unwrap();
        db.remove_label(a, "A").unwrap();
        assert_eq!(db.node_labels(a), vec!["B"]);
        assert!(db.nodes_by_label("A").is_empty());
    }

    #[test]
    fn test_injected_retry_fails_exactly_once() {
        let db = MemoryGraph::new();
        let a = db.create_node(&[], StoredProperties::new()).unwrap();
        db.inject_retry_once();
        assert!(matches!(db.set_node_property(a, "x", Value::Int(1)), Err(Error::Retry(_))));
        db.set_node_property(a, "x", Value::Int(1)).unwrap();
        assert_eq!(db.node_property(a, "x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_find_node_by_property() {
        let db = MemoryGraph::new();
        db.create_node(&[], StoredProperties::new()).unwrap();
        let b = db.create_node(&[], [("id".to_string(), Value::from("abc"))].into()).unwrap();
        assert_eq!(db.find_node("id", &Value::from("abc")), Some(b));
        assert_eq!(db.find_node("id", &Value::from("nope")), None);
    }
}
