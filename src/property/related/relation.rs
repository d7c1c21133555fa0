//! Relation descriptors and the arena that owns them.
//!
//! A relation is declared once. Endpoint keys register against its
//! [`RelationId`] instead of holding a back-pointer, and the arena records
//! which key serves each side.

use std::sync::Arc;

use crate::{Error, Result};

/// How many entities may sit on each side of a relation, read as
/// `source → target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// A target has at most one source.
    pub fn single_source(self) -> bool {
        matches!(self, Cardinality::OneToOne | Cardinality::OneToMany)
    }

    /// A source has at most one target.
    pub fn single_target(self) -> bool {
        matches!(self, Cardinality::OneToOne | Cardinality::ManyToOne)
    }
}

/// Which side may be created from a nested object on write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Autocreate {
    #[default]
    None,
    Source,
    Target,
    Both,
}

impl Autocreate {
    pub fn source(self) -> bool {
        matches!(self, Autocreate::Source | Autocreate::Both)
    }

    pub fn target(self) -> bool {
        matches!(self, Autocreate::Target | Autocreate::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub rel_type: String,
    pub source_type: String,
    pub target_type: String,
    pub cardinality: Cardinality,
    pub autocreate: Autocreate,
}

impl Relation {
    pub fn new(
        source_type: impl Into<String>,
        rel_type: impl Into<String>,
        target_type: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            rel_type: rel_type.into(),
            source_type: source_type.into(),
            target_type: target_type.into(),
            cardinality,
            autocreate: Autocreate::None,
        }
    }

    pub fn with_autocreate(mut self, autocreate: Autocreate) -> Self {
        self.autocreate = autocreate;
        self
    }
}

/// Handle of a relation in a [`RelationArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationId(usize);

#[derive(Debug, Clone)]
struct Slot {
    relation: Arc<Relation>,
    source_property: Option<String>,
    target_property: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RelationArena {
    slots: Vec<Slot>,
}

impl RelationArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, relation: Relation) -> RelationId {
        self.slots.push(Slot { relation: Arc::new(relation), source_property: None, target_property: None });
        RelationId(self.slots.len() - 1)
    }

    pub fn get(&self, id: RelationId) -> Option<&Arc<Relation>> {
        self.slots.get(id.0).map(|s| &s.relation)
    }

    fn slot_mut(&mut self, id: RelationId) -> Result<&mut Slot> {
        self.slots
            .get_mut(id.0)
            .ok_or_else(|| Error::Configuration(format!("unknown relation {}", id.0)))
    }

    /// Record the key on the source type that reaches the targets.
    pub fn register_source(&mut self, id: RelationId, json_name: &str) -> Result<Arc<Relation>> {
        let slot = self.slot_mut(id)?;
        slot.source_property = Some(json_name.to_owned());
        Ok(slot.relation.clone())
    }

    /// Record the key on the target type that reaches the sources.
    pub fn register_target(&mut self, id: RelationId, json_name: &str) -> Result<Arc<Relation>> {
        let slot = self.slot_mut(id)?;
        slot.target_property = Some(json_name.to_owned());
        Ok(slot.relation.clone())
    }

    pub fn source_property(&self, id: RelationId) -> Option<&str> {
        self.slots.get(id.0)?.source_property.as_deref()
    }

    pub fn target_property(&self, id: RelationId) -> Option<&str> {
        self.slots.get(id.0)?.target_property.as_deref()
    }

    /// First relation stored under `rel_type`.
    pub fn find(&self, rel_type: &str) -> Option<RelationId> {
        self.slots.iter().position(|s| s.relation.rel_type == rel_type).map(RelationId)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
