//! Keys that follow a chain of relations, e.g. `project.tasks.assignee`.

use std::collections::HashSet;

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::base;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::key::{Predicate, PropertyKey};
use crate::{Error, Result};

use super::RelatedProperty;

/// Read-only traversal over several relationship keys. The result is the
/// deduplicated set of entities reached by the last hop, projected with
/// that hop's notion.
#[derive(Debug, Clone)]
pub struct HyperRelationProperty {
    config: PropertyConfig,
    hops: Vec<RelatedProperty>,
}

impl HyperRelationProperty {
    pub fn new(name: impl Into<String>, hops: Vec<RelatedProperty>) -> Result<Self> {
        if hops.is_empty() {
            return Err(Error::Configuration("relation chain needs at least one hop".into()));
        }
        let mut config = PropertyConfig::new(name);
        config.flags.read_only = true;
        Ok(Self { config, hops })
    }

    pub fn hops(&self) -> &[RelatedProperty] {
        &self.hops
    }

    /// Entities reached by walking every hop in order.
    pub fn reached(&self, obj: &GraphObject, predicate: Option<Predicate<'_>>) -> Vec<GraphObject> {
        let mut frontier = vec![obj.clone()];
        let last = self.hops.len() - 1;
        for (i, hop) in self.hops.iter().enumerate() {
            let filter = if i == last { predicate } else { None };
            let mut seen = HashSet::new();
            frontier = frontier
                .iter()
                .flat_map(|o| hop.related(o, filter))
                .filter(|o| seen.insert(o.id()))
                .collect();
        }
        frontier
    }

    fn last(&self) -> &RelatedProperty {
        &self.hops[self.hops.len() - 1]
    }
}

impl PropertyKey for HyperRelationProperty {
    fn config(&self) -> &PropertyConfig { &self.config }

    fn value_type(&self) -> ValueType {
        ValueType::Collection(self.last().other_type().to_owned())
    }

    fn get_property(
        &self,
        ctx: &SecurityContext,
        obj: &GraphObject,
        _apply_converter: bool,
        predicate: Option<Predicate<'_>>,
    ) -> Value {
        let reached = self.reached(obj, predicate);
        let last = self.last();
        Value::List(
            reached
                .iter()
                .map(|r| last.notion().project(ctx, r))
                .filter(|v| !v.is_null())
                .collect(),
        )
    }

    fn set_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _value: Value) -> Result<Option<Value>> {
        obj.relock();
        Err(base::read_only_error(self, obj))
    }
}

impl_builder!(HyperRelationProperty);
