//! Named post-processing hooks and update observers attached to keys.
//!
//! Transformators are resolved by name from a [`TransformatorRegistry`] when
//! the key is built, so an unknown name fails at configuration time.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::context::SecurityContext;
use crate::model::Value;
use crate::object::GraphObject;
use crate::{Error, Result};

/// Hook applied to a value on every read and write of a key.
///
/// Read hooks run after the database converter; write hooks run before it.
/// Hooks run in registration order.
pub trait Transformator: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn on_read(&self, _ctx: &SecurityContext, _obj: &GraphObject, value: Value) -> Value {
        value
    }

    fn on_write(&self, _ctx: &SecurityContext, _obj: &GraphObject, value: Value) -> Result<Value> {
        Ok(value)
    }
}

/// Observer notified after a successful write.
pub trait PropertyUpdateCallback: Send + Sync {
    fn property_updated(&self, ctx: &SecurityContext, obj: &GraphObject, value: &Value) -> Result<()>;
}

impl<F> PropertyUpdateCallback for F
where
    F: Fn(&SecurityContext, &GraphObject, &Value) -> Result<()> + Send + Sync,
{
    fn property_updated(&self, ctx: &SecurityContext, obj: &GraphObject, value: &Value) -> Result<()> {
        self(ctx, obj, value)
    }
}

// ============================================================================
// Built-ins
// ============================================================================

fn map_strings(value: Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        Value::List(items) => Value::List(items.into_iter().map(|v| map_strings(v, f)).collect()),
        other => other,
    }
}

#[derive(Debug, Clone, Copy)]
struct Trim;

impl Transformator for Trim {
    fn name(&self) -> &str { "trim" }

    fn on_write(&self, _ctx: &SecurityContext, _obj: &GraphObject, value: Value) -> Result<Value> {
        Ok(map_strings(value, &|s| s.trim().to_owned()))
    }
}

#[derive(Debug, Clone, Copy)]
struct Lowercase;

impl Transformator for Lowercase {
    fn name(&self) -> &str { "lowercase" }

    fn on_write(&self, _ctx: &SecurityContext, _obj: &GraphObject, value: Value) -> Result<Value> {
        Ok(map_strings(value, &str::to_lowercase))
    }
}

#[derive(Debug, Clone, Copy)]
struct Uppercase;

impl Transformator for Uppercase {
    fn name(&self) -> &str { "uppercase" }

    fn on_write(&self, _ctx: &SecurityContext, _obj: &GraphObject, value: Value) -> Result<Value> {
        Ok(map_strings(value, &str::to_uppercase))
    }
}

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Removes markup on write and again on read, for data stored before the
/// hook was attached.
#[derive(Debug, Clone, Copy)]
struct StripTags;

impl Transformator for StripTags {
    fn name(&self) -> &str { "strip_tags" }

    fn on_read(&self, _ctx: &SecurityContext, _obj: &GraphObject, value: Value) -> Value {
        map_strings(value, &|s| TAG.replace_all(s, "").into_owned())
    }

    fn on_write(&self, _ctx: &SecurityContext, _obj: &GraphObject, value: Value) -> Result<Value> {
        Ok(map_strings(value, &|s| TAG.replace_all(s, "").into_owned()))
    }
}

// ============================================================================
// Registry
// ============================================================================

type Factory = fn() -> Arc<dyn Transformator>;

/// Maps transformator names to constructors.
#[derive(Clone)]
pub struct TransformatorRegistry {
    factories: HashMap<String, Factory>,
}

impl TransformatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { factories: HashMap::new() }
    }

    /// A registry holding `trim`, `lowercase`, `uppercase` and `strip_tags`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("trim", || Arc::new(Trim));
        registry.register("lowercase", || Arc::new(Lowercase));
        registry.register("uppercase", || Arc::new(Uppercase));
        registry.register("strip_tags", || Arc::new(StripTags));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: Factory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Transformator>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| Error::Configuration(format!("Unknown transformator {name:?}")))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TransformatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for TransformatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformatorRegistry").field("names", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_resolve() {
        let registry = TransformatorRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["lowercase", "strip_tags", "trim", "uppercase"]);
        assert_eq!(registry.resolve("trim").unwrap().name(), "trim");
    }

    #[test]
    fn test_unknown_name_is_configuration_error() {
        let err = TransformatorRegistry::new().resolve("trim").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_map_strings_recurses_into_lists() {
        let v = map_strings(Value::from(vec![" a ", "b "]), &|s| s.trim().to_owned());
        assert_eq!(v, Value::from(vec!["a", "b"]));
        assert_eq!(map_strings(Value::Int(3), &|s| s.to_owned()), Value::Int(3));
    }
}
