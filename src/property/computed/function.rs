//! Keys backed by scripted read and write expressions.

use std::sync::LazyLock;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::converter::convert_with;
use crate::property::key::{KeyRef, Predicate, PropertyKey};
use crate::property::keys::ID_DB_NAME;
use crate::property::primitive::for_type_hint;
use crate::script::EvaluationConfig;
use crate::storage::PropertyContainer;
use crate::{Error, Result};

use super::reject_write;

const READ_FUNCTION: &str = "readFunction";
const WRITE_FUNCTION: &str = "writeFunction";

/// Expression sources loaded from schema entities, keyed by
/// `(source id, field)`. Never invalidated automatically.
static SOURCE_CACHE: LazyLock<DashMap<(String, String), Option<String>>> = LazyLock::new(DashMap::new);

/// Drop every cached expression source. Call after schema changes.
pub fn clear_source_cache() {
    SOURCE_CACHE.clear();
    debug!("function source cache cleared");
}

/// A key computed by the script evaluator.
///
/// Expressions are either given inline or loaded from the `readFunction`
/// and `writeFunction` properties of a schema entity identified by its uuid.
/// With `caching_enabled`, read results are kept in the request scratch
/// store under `<entity>:<name>`. A type hint coerces read results through
/// the matching primitive key's input converter.
#[derive(Debug, Clone)]
pub struct FunctionProperty {
    config: PropertyConfig,
    read_function: Option<String>,
    write_function: Option<String>,
    source_id: Option<String>,
}

impl FunctionProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name), read_function: None, write_function: None, source_id: None }
    }

    pub fn with_read_function(mut self, source: impl Into<String>) -> Self {
        self.read_function = Some(source.into());
        self
    }

    pub fn with_write_function(mut self, source: impl Into<String>) -> Self {
        self.write_function = Some(source.into());
        self
    }

    /// Load expressions from the schema entity with uuid `id`.
    pub fn with_source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self
    }

    fn debug_label(&self, obj: &GraphObject) -> String {
        let owner = self.declaring_type().map(str::to_owned).or_else(|| obj.type_name()).unwrap_or_default();
        format!("{owner}.{}", self.json_name())
    }

    fn cache_key(&self, obj: &GraphObject) -> String {
        format!("{}:{}", obj.id(), self.json_name())
    }

    /// Forget the cached result of this key for `obj`.
    pub fn invalidate_cached_result(&self, ctx: &SecurityContext, obj: &GraphObject) {
        ctx.invalidate(&self.cache_key(obj));
    }

    fn source(&self, obj: &GraphObject, field: &'static str) -> Option<String> {
        let inline = match field {
            READ_FUNCTION => &self.read_function,
            _ => &self.write_function,
        };
        let Some(source_id) = &self.source_id else { return inline.clone() };

        let cache_key = (source_id.clone(), field.to_owned());
        if let Some(cached) = SOURCE_CACHE.get(&cache_key) {
            return cached.clone();
        }
        let store = obj.store();
        let loaded = store
            .find_node(ID_DB_NAME, &Value::from(source_id.as_str()))
            .map(|id| GraphObject::node(store.clone(), id))
            .and_then(|schema_node| schema_node.get_property(field))
            .and_then(|v| v.as_str().map(str::to_owned))
            .or_else(|| inline.clone());
        SOURCE_CACHE.insert(cache_key, loaded.clone());
        loaded
    }

    fn hint_key(&self) -> Option<KeyRef> {
        self.type_hint().and_then(|hint| for_type_hint(hint, self.json_name()))
    }

    fn coerce(&self, ctx: &SecurityContext, value: Value) -> Value {
        let Some(key) = self.hint_key() else { return value };
        match convert_with(key.input_converter(ctx).as_deref(), value.clone()) {
            Ok(coerced) => coerced,
            Err(e) => {
                warn!(property = self.json_name(), error = %e, "unable to coerce function result to type hint");
                value
            }
        }
    }

    fn evaluate_read(&self, ctx: &SecurityContext, obj: &GraphObject) -> Value {
        let Some(source) = self.source(obj, READ_FUNCTION) else { return Value::Null };
        let Some(evaluator) = ctx.services().evaluator() else {
            warn!(property = self.json_name(), "no script evaluator configured");
            return Value::Null;
        };
        let label = self.debug_label(obj);
        match evaluator.evaluate(ctx, obj, &source, &label, self.source_id.as_deref(), &EvaluationConfig::default()) {
            Ok(value) => self.coerce(ctx, value),
            Err(e) => {
                warn!(property = self.json_name(), entity = %obj.id(), error = %e, "read function failed");
                Value::Null
            }
        }
    }
}

impl PropertyKey for FunctionProperty {
    fn config(&self) -> &PropertyConfig { &self.config }

    fn value_type(&self) -> ValueType {
        self.hint_key().map_or(ValueType::Any, |k| k.value_type())
    }

    fn is_read_only(&self) -> bool {
        self.config.flags.read_only || (self.write_function.is_none() && self.source_id.is_none())
    }

    fn get_property(&self, ctx: &SecurityContext, obj: &GraphObject, _apply: bool, _p: Option<Predicate<'_>>) -> Value {
        let caching = self.flags().caching_enabled;
        if caching {
            if let Some(cached) = ctx.cached(&self.cache_key(obj)) {
                return cached;
            }
        }
        let value = self.evaluate_read(ctx, obj);
        if caching {
            ctx.cache(self.cache_key(obj), value.clone());
        }
        if value.is_null() { self.default_value() } else { value }
    }

    fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
        if self.config.flags.read_only && !obj.read_only_properties_unlocked() {
            return reject_write(self, obj);
        }
        let Some(source) = self.source(obj, WRITE_FUNCTION) else {
            return reject_write(self, obj);
        };
        obj.relock();
        ctx.require_write_tx()?;
        let Some(evaluator) = ctx.services().evaluator() else {
            return Err(Error::Configuration("no script evaluator configured".into()));
        };

        let label = self.debug_label(obj);
        let config = EvaluationConfig::default().bind("value", value);
        evaluator
            .evaluate(ctx, obj, &source, &label, self.source_id.as_deref(), &config)
            .map_err(|e| Error::Scripting { label, errors: e.errors })?;
        self.invalidate_cached_result(ctx, obj);
        Ok(None)
    }
}

impl_builder!(FunctionProperty);
