//! Flat views over the endpoints of a relationship.
//!
//! A [`ReferenceGroup`] on a relationship type reads named keys of the start
//! node, the relationship itself and the end node into one map, and writes
//! such a map back field by field.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::base;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::key::{KeyRef, Predicate, PropertyKey};
use crate::property::search::{Occurrence, QueryGroup, SearchAttribute};
use crate::property::PropertyBuilder;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSource {
    StartNode,
    Relationship,
    EndNode,
}

impl ReferenceSource {
    pub(crate) fn resolve(self, obj: &GraphObject) -> Option<GraphObject> {
        match self {
            ReferenceSource::StartNode => obj.start_node(),
            ReferenceSource::Relationship => obj.rel_id().map(|_| obj.clone()),
            ReferenceSource::EndNode => obj.end_node(),
        }
    }
}

/// One field of a group: `name` reads `key` on the entity at `source`.
#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    pub source: ReferenceSource,
    pub key: KeyRef,
}

impl Reference {
    pub fn new(name: impl Into<String>, source: ReferenceSource, key: KeyRef) -> Self {
        Self { name: name.into(), source, key }
    }

    fn read(&self, ctx: &SecurityContext, obj: &GraphObject) -> Value {
        self.source
            .resolve(obj)
            .map_or(Value::Null, |target| self.key.get_property(ctx, &target, true, None))
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceGroup {
    config: PropertyConfig,
    references: Arc<[Reference]>,
}

impl ReferenceGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name), references: Arc::from(Vec::new()) }
    }

    pub fn with_reference(mut self, name: impl Into<String>, source: ReferenceSource, key: KeyRef) -> Self {
        let mut references = self.references.to_vec();
        references.push(Reference::new(name, source, key));
        self.references = references.into();
        self
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    fn null_values_only_name(&self) -> String {
        format!("{}.nullValuesOnly", self.config.json_name)
    }
}

impl PropertyKey for ReferenceGroup {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Map }

    fn get_property(&self, ctx: &SecurityContext, obj: &GraphObject, _apply: bool, _p: Option<Predicate<'_>>) -> Value {
        let fields: BTreeMap<String, Value> =
            self.references.iter().map(|r| (r.name.clone(), r.read(ctx, obj))).collect();
        Value::Map(fields)
    }

    /// Fields absent from the input map are left untouched.
    fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
        let unlocked = obj.read_only_properties_unlocked();
        obj.relock();
        if self.is_read_only() && !unlocked {
            return Err(base::read_only_error(self, obj));
        }
        let Value::Map(fields) = value else {
            return Err(Error::TypeError { expected: "map".into(), got: value.type_name().to_owned() });
        };
        ctx.require_write_tx()?;

        let previous = self.get_property(ctx, obj, true, None);
        for reference in self.references.iter() {
            let Some(field) = fields.get(&reference.name) else { continue };
            let target = reference.source.resolve(obj).ok_or_else(|| {
                Error::NotFound(format!("{:?} of {}", reference.source, obj.id()))
            })?;
            reference.key.set_property(ctx, &target, field.clone())?;
            debug!(group = self.json_name(), field = %reference.name, entity = %target.id(), "reference written");
        }
        let blank = previous.as_map().is_none_or(|m| m.values().all(Value::is_null));
        Ok((!blank).then_some(previous))
    }

    /// One constraint per field against the referenced key, evaluated on the
    /// entity the field reads from: all of them required for exact
    /// searches, any of them otherwise.
    fn determine_search_type(
        &self,
        _this: &KeyRef,
        ctx: &SecurityContext,
        raw: &str,
        exact: bool,
        query: &mut QueryGroup,
    ) -> Result<()> {
        let member = if exact { Occurrence::Required } else { Occurrence::Optional };
        let mut attributes = Vec::with_capacity(self.references.len());
        for reference in self.references.iter() {
            let mut sub = QueryGroup::new();
            reference.key.determine_search_type(ctx, raw, exact, &mut sub)?;
            attributes.push(SearchAttribute::Endpoint {
                source: reference.source,
                occur: member,
                attribute: Box::new(sub.into_attribute(Occurrence::Required)),
            });
        }
        query.push(SearchAttribute::Group { occur: Occurrence::Required, attributes });
        Ok(())
    }

    fn companion_keys(&self) -> Vec<KeyRef> {
        vec![NullValuesOnlyProperty::new(self.null_values_only_name(), self.references.clone()).build()]
    }
}

/// True when every field of the owning group reads null.
#[derive(Debug, Clone)]
pub struct NullValuesOnlyProperty {
    config: PropertyConfig,
    references: Arc<[Reference]>,
}

impl NullValuesOnlyProperty {
    fn new(name: String, references: Arc<[Reference]>) -> Self {
        let mut config = PropertyConfig::new(name);
        config.flags.read_only = true;
        Self { config, references }
    }
}

impl PropertyKey for NullValuesOnlyProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Boolean }

    fn get_property(&self, ctx: &SecurityContext, obj: &GraphObject, _apply: bool, _p: Option<Predicate<'_>>) -> Value {
        Value::Bool(self.references.iter().all(|r| r.read(ctx, obj).is_null()))
    }

    fn set_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _value: Value) -> Result<Option<Value>> {
        obj.relock();
        Err(base::read_only_error(self, obj))
    }
}

impl_builder!(ReferenceGroup, NullValuesOnlyProperty);
