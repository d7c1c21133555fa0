//! Relationship-valued keys.
//!
//! A [`RelatedProperty`] binds a name to one side of a [`Relation`]. Reads
//! traverse the graph and project each related entity through a
//! [`Notion`]; writes resolve input values to entities and relink.

pub mod endpoint;
pub mod hyper;
pub mod ids;
pub mod notion;
pub mod reference;
pub mod relation;

use std::sync::Arc;

use crate::context::SecurityContext;
use crate::model::{Direction, Value, ValueType};
use crate::object::GraphObject;
use crate::{Error, Result};

use super::base;
use super::config::{impl_builder, PropertyConfig};
use super::key::{KeyRef, Predicate, PropertyKey};
use super::search::{Occurrence, SearchAttribute};

pub use endpoint::EndpointKind;
pub use hyper::HyperRelationProperty;
pub use ids::{CollectionIdProperty, EntityIdProperty};
pub use notion::Notion;
pub use reference::{NullValuesOnlyProperty, Reference, ReferenceGroup, ReferenceSource};
pub use relation::{Autocreate, Cardinality, Relation, RelationArena, RelationId};

use endpoint::Endpoint;

#[derive(Debug, Clone)]
pub struct RelatedProperty {
    config: PropertyConfig,
    relation: Arc<Relation>,
    relation_id: RelationId,
    kind: EndpointKind,
    notion: Notion,
}

impl RelatedProperty {
    fn register(name: String, arena: &mut RelationArena, id: RelationId, kind: EndpointKind) -> Result<Self> {
        let relation = match kind.direction() {
            Direction::Incoming => arena.register_target(id, &name)?,
            _ => arena.register_source(id, &name)?,
        };
        Ok(Self { config: PropertyConfig::new(name), relation, relation_id: id, kind, notion: Notion::Object })
    }

    /// Single target of a source.
    pub fn end_node(name: impl Into<String>, arena: &mut RelationArena, id: RelationId) -> Result<Self> {
        Self::register(name.into(), arena, id, EndpointKind::OneEndpoint)
    }

    /// All targets of a source.
    pub fn end_nodes(name: impl Into<String>, arena: &mut RelationArena, id: RelationId) -> Result<Self> {
        Self::register(name.into(), arena, id, EndpointKind::ManyEndpoint)
    }

    /// Single source of a target.
    pub fn start_node(name: impl Into<String>, arena: &mut RelationArena, id: RelationId) -> Result<Self> {
        Self::register(name.into(), arena, id, EndpointKind::OneStartpoint)
    }

    /// All sources of a target.
    pub fn start_nodes(name: impl Into<String>, arena: &mut RelationArena, id: RelationId) -> Result<Self> {
        Self::register(name.into(), arena, id, EndpointKind::ManyStartpoint)
    }

    pub fn with_notion(mut self, notion: Notion) -> Self {
        self.notion = notion;
        self
    }

    pub fn relation(&self) -> &Arc<Relation> { &self.relation }
    pub fn relation_id(&self) -> RelationId { self.relation_id }
    pub fn kind(&self) -> EndpointKind { self.kind }
    pub fn notion(&self) -> &Notion { &self.notion }

    /// Type of the entities on the far side.
    pub fn other_type(&self) -> &str {
        match self.kind.direction() {
            Direction::Incoming => &self.relation.source_type,
            _ => &self.relation.target_type,
        }
    }

    fn endpoint(&self) -> Endpoint<'_> {
        Endpoint { kind: self.kind, relation: &self.relation }
    }

    fn may_autocreate(&self) -> bool {
        match self.kind.direction() {
            Direction::Incoming => self.relation.autocreate.source(),
            _ => self.relation.autocreate.target(),
        }
    }

    /// Related entities, optionally filtered.
    pub fn related(&self, obj: &GraphObject, predicate: Option<Predicate<'_>>) -> Vec<GraphObject> {
        self.endpoint().related(obj, predicate)
    }

    /// Project related entities with this key's notion. Collections drop
    /// null projections.
    pub(crate) fn project(&self, ctx: &SecurityContext, related: &[GraphObject]) -> Value {
        if self.kind.is_many() {
            Value::List(
                related
                    .iter()
                    .map(|r| self.notion.project(ctx, r))
                    .filter(|v| !v.is_null())
                    .collect(),
            )
        } else {
            related.first().map_or(Value::Null, |r| self.notion.project(ctx, r))
        }
    }

    fn wrap(&self, error: Error) -> Error {
        match error {
            Error::Retry(_) | Error::Relation { .. } => error,
            other => Error::Relation { property: self.config.json_name.clone(), source: Box::new(other) },
        }
    }

    fn link(&self, ctx: &SecurityContext, obj: &GraphObject, value: &Value) -> Result<()> {
        let inputs = match value {
            Value::List(items) => items.clone(),
            Value::Null => Vec::new(),
            single => vec![single.clone()],
        };
        let mut targets = Vec::with_capacity(inputs.len());
        for input in &inputs {
            if let Some(target) = notion::resolve(ctx, obj, self.other_type(), self.may_autocreate(), input)? {
                targets.push(target);
            }
        }
        if let Some(callback) = &self.config.update_callback {
            callback.property_updated(ctx, obj, value)?;
        }
        self.endpoint().set(ctx, obj, &targets)
    }
}

impl PropertyKey for RelatedProperty {
    fn config(&self) -> &PropertyConfig { &self.config }

    fn value_type(&self) -> ValueType {
        let other = self.other_type().to_owned();
        if self.kind.is_many() { ValueType::Collection(other) } else { ValueType::Entity(other) }
    }

    /// Without the converter the raw node references are returned.
    fn get_property(
        &self,
        ctx: &SecurityContext,
        obj: &GraphObject,
        apply_converter: bool,
        predicate: Option<Predicate<'_>>,
    ) -> Value {
        let related = self.related(obj, predicate);
        if apply_converter {
            return self.project(ctx, &related);
        }
        let ids: Vec<Value> = related.iter().filter_map(GraphObject::node_id).map(Value::Node).collect();
        if self.kind.is_many() {
            Value::List(ids)
        } else {
            ids.into_iter().next().unwrap_or(Value::Null)
        }
    }

    fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
        let unlocked = obj.read_only_properties_unlocked();
        obj.relock();
        if self.is_read_only() && !unlocked {
            return Err(base::read_only_error(self, obj));
        }
        ctx.require_write_tx()?;

        let previous = self.get_property(ctx, obj, false, None);
        self.link(ctx, obj, &value).map_err(|e| self.wrap(e))?;
        Ok((!previous.is_blank()).then_some(previous))
    }

    fn search_attribute(
        &self,
        this: &KeyRef,
        _ctx: &SecurityContext,
        occur: Occurrence,
        value: Value,
        _exact: bool,
    ) -> SearchAttribute {
        SearchAttribute::Related { key: this.clone(), value, occur }
    }
}

impl_builder!(RelatedProperty);
