//! Type registry: which keys a type declares and which labels it carries.
//!
//! Schema definition itself happens elsewhere; this registry is the minimum
//! the property layer needs to resolve keys by name and compute labels.

use std::collections::HashMap;
use std::sync::Arc;

use crate::property::keys;
use crate::property::relation::RelationArena;
use crate::property::KeyRef;

/// A node or relationship type with its declared keys.
#[derive(Debug, Clone)]
pub struct EntityType {
    name: String,
    rel_type: Option<String>,
    labels: Vec<String>,
    keys: Vec<KeyRef>,
    by_json_name: HashMap<String, usize>,
    by_db_name: HashMap<String, usize>,
}

impl EntityType {
    /// A node type. Carries the common node keys (`id`, `type`, dates).
    pub fn node(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut t = Self::empty(name.clone(), None);
        t.labels.push(name);
        t.with_keys(keys::node_base_keys())
    }

    /// A relationship type stored under the given relationship type name.
    pub fn relationship(name: impl Into<String>, rel_type: impl Into<String>) -> Self {
        let t = Self::empty(name.into(), Some(rel_type.into()));
        t.with_keys(keys::relationship_base_keys())
    }

    fn empty(name: String, rel_type: Option<String>) -> Self {
        Self {
            name,
            rel_type,
            labels: Vec::new(),
            keys: Vec::new(),
            by_json_name: HashMap::new(),
            by_db_name: HashMap::new(),
        }
    }

    /// Inherit labels and keys of a parent type. The own label stays last.
    pub fn extends(mut self, parent: &EntityType) -> Self {
        let own = self.labels.pop();
        for label in &parent.labels {
            if !self.labels.contains(label) {
                self.labels.push(label.clone());
            }
        }
        if let Some(own) = own {
            self.labels.push(own);
        }
        self.with_keys(parent.keys.iter().cloned())
    }

    pub fn with_key(mut self, key: KeyRef) -> Self {
        self.add_key(key);
        self
    }

    pub fn with_keys(mut self, keys: impl IntoIterator<Item = KeyRef>) -> Self {
        for key in keys {
            self.add_key(key);
        }
        self
    }

    fn add_key(&mut self, key: KeyRef) {
        let companions = key.companion_keys();
        match self.by_json_name.get(key.json_name()) {
            Some(&idx) => {
                let stale = self.keys[idx].db_name().to_owned();
                if self.by_db_name.get(&stale) == Some(&idx) {
                    self.by_db_name.remove(&stale);
                }
                self.by_db_name.insert(key.db_name().to_owned(), idx);
                self.keys[idx] = key.clone();
            }
            None => {
                self.by_json_name.insert(key.json_name().to_owned(), self.keys.len());
                self.by_db_name.insert(key.db_name().to_owned(), self.keys.len());
                self.keys.push(key);
            }
        }
        for companion in companions {
            self.add_key(companion);
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn labels(&self) -> &[String] { &self.labels }
    pub fn keys(&self) -> &[KeyRef] { &self.keys }
    pub fn is_relationship(&self) -> bool { self.rel_type.is_some() }
    pub fn rel_type(&self) -> Option<&str> { self.rel_type.as_deref() }

    pub fn key(&self, json_name: &str) -> Option<&KeyRef> {
        self.by_json_name.get(json_name).map(|&i| &self.keys[i])
    }

    pub fn key_by_db_name(&self, db_name: &str) -> Option<&KeyRef> {
        self.by_db_name.get(db_name).map(|&i| &self.keys[i])
    }
}

/// All registered types plus the relation descriptors their keys point at.
#[derive(Debug, Default)]
pub struct Schema {
    types: HashMap<String, Arc<EntityType>>,
    relations: RelationArena,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity_type: EntityType) -> Arc<EntityType> {
        let t = Arc::new(entity_type);
        self.types.insert(t.name().to_owned(), t.clone());
        t
    }

    pub fn get(&self, name: &str) -> Option<&Arc<EntityType>> {
        self.types.get(name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Labels a node of the given type must carry. Unknown types map to
    /// their own name.
    pub fn labels_for(&self, type_name: &str) -> Vec<String> {
        self.get(type_name)
            .map(|t| t.labels().to_vec())
            .unwrap_or_else(|| vec![type_name.to_owned()])
    }

    pub fn relations(&self) -> &RelationArena { &self.relations }
    pub fn relations_mut(&mut self) -> &mut RelationArena { &mut self.relations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{PropertyBuilder, StringProperty};

    #[test]
    fn test_node_type_has_base_keys() {
        let t = EntityType::node("Person");
        assert!(t.key("id").is_some());
        assert!(t.key("type").is_some());
        assert_eq!(t.labels(), ["Person".to_string()]);
    }

    #[test]
    fn test_extends_merges_labels_and_keys() {
        let parent = EntityType::node("Person").with_key(StringProperty::new("name").build());
        let child = EntityType::node("Employee").extends(&parent);
        assert_eq!(child.labels(), ["Person".to_string(), "Employee".to_string()]);
        assert!(child.key("name").is_some());
    }

    #[test]
    fn test_lookup_by_db_name() {
        let t = EntityType::node("Person")
            .with_key(StringProperty::new("displayName").with_db_name("display_name").build());
        assert_eq!(t.key_by_db_name("display_name").unwrap().json_name(), "displayName");
    }

    #[test]
    fn test_replaced_key_moves_db_name_lookup() {
        let t = EntityType::node("Person")
            .with_key(StringProperty::new("displayName").with_db_name("display_name").build())
            .with_key(StringProperty::new("displayName").with_db_name("label").build());
        assert!(t.key_by_db_name("display_name").is_none());
        assert_eq!(t.key_by_db_name("label").unwrap().json_name(), "displayName");
        assert_eq!(t.keys().iter().filter(|k| k.json_name() == "displayName").count(), 1);
    }

    #[test]
    fn test_unknown_type_labels() {
        let schema = Schema::new();
        assert_eq!(schema.labels_for("Ghost"), vec!["Ghost".to_string()]);
    }
}
