//! Keys backed by a graph query.

use std::collections::BTreeMap;

use tracing::warn;

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::key::{Predicate, PropertyKey};
use crate::Result;

use super::{read_only_config, reject_write};

/// Runs `query` through the configured query service with `this` bound to
/// the entity uuid. A single-row result is returned unwrapped.
#[derive(Debug, Clone)]
pub struct CypherQueryProperty {
    config: PropertyConfig,
    query: String,
}

impl CypherQueryProperty {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self { config: read_only_config(name), query: query.into() }
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl PropertyKey for CypherQueryProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Any }

    fn get_property(&self, ctx: &SecurityContext, obj: &GraphObject, _apply: bool, _p: Option<Predicate<'_>>) -> Value {
        let Some(service) = ctx.services().query_service() else {
            warn!(property = self.json_name(), "no query service configured");
            return Value::Null;
        };
        let params = BTreeMap::from([("this".to_owned(), obj.uuid().map_or(Value::Null, Value::String))]);
        match service.query(ctx, &self.query, &params) {
            Ok(mut rows) if rows.len() == 1 => rows.remove(0),
            Ok(rows) => Value::List(rows),
            Err(e) => {
                warn!(property = self.json_name(), entity = %obj.id(), error = %e, "query failed");
                Value::Null
            }
        }
    }

    fn set_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _value: Value) -> Result<Option<Value>> {
        reject_write(self, obj)
    }
}

impl_builder!(CypherQueryProperty);
