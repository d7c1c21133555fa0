//! The `PropertyKey` contract and the shared handle keys are passed around as.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::context::SecurityContext;
use crate::index::IndexType;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::Result;

use super::base;
use super::config::{PropertyConfig, PropertyFlags};
use super::converter::{convert_with, PropertyConverter};
use super::openapi;
use super::search::{Occurrence, QueryGroup, SearchAttribute};
use super::sort::{self, SortType};

/// Filter applied to related entities before they are projected.
pub type Predicate<'p> = &'p dyn Fn(&GraphObject) -> bool;

/// Identity and behavior of one named attribute of an entity type.
///
/// Implementors supply `config()` and `value_type()`; everything else has a
/// default that implements the common read/write/search pipeline. Keys are
/// shared between threads and never hold per-call state: the context and the
/// entity are passed to every hook that needs them.
pub trait PropertyKey: Send + Sync + fmt::Debug {
    fn config(&self) -> &PropertyConfig;

    fn value_type(&self) -> ValueType;

    // ========================================================================
    // Identity & configuration
    // ========================================================================

    fn json_name(&self) -> &str { &self.config().json_name }
    fn db_name(&self) -> &str { &self.config().db_name }
    fn declaring_type(&self) -> Option<&str> { self.config().declaring_type.as_deref() }
    fn default_value(&self) -> Value { self.config().default_value.clone() }
    fn format(&self) -> Option<&str> { self.config().format.as_deref() }
    fn type_hint(&self) -> Option<&str> { self.config().type_hint.as_deref() }
    fn flags(&self) -> PropertyFlags { self.config().flags }

    /// Name of the value type used in messages and descriptions.
    fn type_name(&self) -> String {
        self.value_type().to_string()
    }

    fn is_read_only(&self) -> bool { self.flags().read_only }
    fn is_system_internal(&self) -> bool { self.flags().system_internal }
    fn is_write_once(&self) -> bool { self.flags().write_once }
    fn is_unvalidated(&self) -> bool { self.flags().unvalidated }
    fn is_indexed(&self) -> bool { self.flags().indexed }
    fn is_dynamic(&self) -> bool { self.flags().dynamic }
    fn is_collection(&self) -> bool { self.value_type().is_collection() }

    /// Unique and compound keys need serialized validation in storage.
    fn requires_synchronization(&self) -> bool {
        let flags = self.flags();
        flags.unique || flags.compound
    }

    fn index_type(&self) -> Option<IndexType> {
        let flags = self.flags();
        if flags.unique {
            Some(IndexType::Unique)
        } else if flags.fulltext_indexed {
            Some(IndexType::FullText)
        } else if flags.indexed {
            Some(IndexType::BTree)
        } else {
            None
        }
    }

    fn is_property_value_indexable(&self, ctx: &SecurityContext) -> bool {
        ctx.services().index().supports(&self.value_type())
    }

    fn sort_type(&self) -> SortType {
        SortType::Default
    }

    // ========================================================================
    // Conversion hooks
    // ========================================================================

    /// Logical ↔ stored converter, if the stored form differs.
    fn database_converter<'a>(
        &'a self,
        _ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        None
    }

    /// Input ↔ logical converter, if the request form differs.
    fn input_converter<'a>(&'a self, _ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        None
    }

    /// Whether a stored value has the shape this key writes. Values that do
    /// not are handed to `fix_database_property` on read.
    fn accepts_stored(&self, _value: &Value) -> bool {
        true
    }

    /// Best-effort repair of a malformed or legacy stored value. Returns the
    /// repaired stored value and persists it when `entity` is given and a
    /// write transaction is active.
    fn fix_database_property(&self, _ctx: &SecurityContext, _entity: Option<&GraphObject>, value: Value) -> Value {
        value
    }

    // ========================================================================
    // Value access
    // ========================================================================

    /// Read the value. Converter failures are logged and the raw value is
    /// returned; null falls back to the default value.
    fn get_property(
        &self,
        ctx: &SecurityContext,
        obj: &GraphObject,
        apply_converter: bool,
        _predicate: Option<Predicate<'_>>,
    ) -> Value {
        base::read(self, ctx, obj, apply_converter)
    }

    /// Write a logical value. Returns the previous stored value, if any.
    fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
        base::write(self, ctx, obj, value)
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Typed search value for a raw request-parameter fragment.
    fn convert_search_value(&self, ctx: &SecurityContext, raw: &str) -> Result<Value> {
        convert_with(self.input_converter(ctx).as_deref(), Value::from(raw))
    }

    /// Whether `a;b` is split into an OR-group of values.
    fn allows_multi_value_split(&self) -> bool {
        true
    }

    fn search_attribute(
        &self,
        this: &KeyRef,
        _ctx: &SecurityContext,
        occur: Occurrence,
        value: Value,
        exact: bool,
    ) -> SearchAttribute {
        SearchAttribute::Property { key: this.clone(), value, occur, exact }
    }

    fn determine_search_type(
        &self,
        this: &KeyRef,
        ctx: &SecurityContext,
        raw: &str,
        exact: bool,
        query: &mut QueryGroup,
    ) -> Result<()> {
        base::determine_search_type(this, ctx, raw, exact, query)
    }

    /// Keys that must be registered alongside this one.
    fn companion_keys(&self) -> Vec<KeyRef> {
        Vec::new()
    }

    // ========================================================================
    // OpenAPI
    // ========================================================================

    fn describe_openapi_output_type(&self) -> serde_json::Value {
        openapi::describe_type(&self.value_type(), self.format())
    }

    fn describe_openapi_input_type(&self) -> serde_json::Value {
        openapi::describe_input(self.describe_openapi_output_type(), self.flags())
    }

    fn describe_openapi_output_schema(&self) -> serde_json::Value {
        openapi::describe_schema(self.json_name(), self.describe_openapi_output_type(), self.config())
    }
}

// ============================================================================
// KeyRef
// ============================================================================

/// A frozen, shareable key.
///
/// Equality and hashing use the `(db_name, json_name)` pair, so two
/// independently built keys with the same names are the same key.
#[derive(Clone)]
pub struct KeyRef(Arc<dyn PropertyKey>);

impl KeyRef {
    pub fn new<K: PropertyKey + 'static>(key: K) -> Self {
        KeyRef(Arc::new(key))
    }

    pub fn as_key(&self) -> &dyn PropertyKey {
        self.0.as_ref()
    }

    /// Whether both handles point at the same instance.
    pub fn ptr_eq(&self, other: &KeyRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn get_search_attribute(
        &self,
        ctx: &SecurityContext,
        occur: Occurrence,
        value: Value,
        exact: bool,
    ) -> SearchAttribute {
        self.0.search_attribute(self, ctx, occur, value, exact)
    }

    /// Parse one request parameter into constraints added to `query`.
    pub fn determine_search_type(
        &self,
        ctx: &SecurityContext,
        raw: &str,
        exact: bool,
        query: &mut QueryGroup,
    ) -> Result<()> {
        self.0.determine_search_type(self, ctx, raw, exact, query)
    }

    /// Look this key up by JSON name in the request parameters.
    pub fn extract_searchable_attribute(
        &self,
        ctx: &SecurityContext,
        params: &HashMap<String, String>,
        exact: bool,
        query: &mut QueryGroup,
    ) -> Result<()> {
        match params.get(self.json_name()) {
            Some(raw) => self.determine_search_type(ctx, raw, exact, query),
            None => Ok(()),
        }
    }

    /// Comparator over entities by this key's value. Nulls sort first in
    /// ascending order.
    pub fn sorted<'a>(
        &'a self,
        ctx: &'a SecurityContext,
        descending: bool,
    ) -> impl Fn(&GraphObject, &GraphObject) -> Ordering + 'a {
        let sort_type = self.sort_type();
        move |a, b| {
            let va = self.get_property(ctx, a, true, None);
            let vb = self.get_property(ctx, b, true, None);
            let ord = sort::compare_values(sort_type, &va, &vb);
            if descending { ord.reverse() } else { ord }
        }
    }
}

impl Deref for KeyRef {
    type Target = dyn PropertyKey;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl PartialEq for KeyRef {
    fn eq(&self, other: &Self) -> bool {
        self.db_name() == other.db_name() && self.json_name() == other.json_name()
    }
}

impl Eq for KeyRef {}

impl Hash for KeyRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.db_name().hash(state);
        self.json_name().hash(state);
    }
}

impl PartialOrd for KeyRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.json_name()
            .cmp(other.json_name())
            .then_with(|| self.db_name().cmp(other.db_name()))
    }
}

impl fmt::Debug for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyRef({}", self.json_name())?;
        if self.db_name() != self.json_name() {
            write!(f, " as {}", self.db_name())?;
        }
        write!(f, ": {})", self.type_name())
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_name())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::property::{IntegerProperty, PropertyBuilder, StringProperty};

    #[test]
    fn test_equality_by_names() {
        let a = StringProperty::new("name").build();
        let b = StringProperty::new("name").indexed().build();
        let c = StringProperty::new("name").with_db_name("_name").build();
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert_ne!(a, c);

        let set: HashSet<KeyRef> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_equality_ignores_value_type() {
        let a = StringProperty::new("n").build();
        let b = IntegerProperty::new("n").build();
        assert_eq!(a, b);
    }

    #[test]
    fn test_index_type_from_flags() {
        assert_eq!(StringProperty::new("a").build().index_type(), None);
        assert_eq!(StringProperty::new("a").indexed().build().index_type(), Some(IndexType::BTree));
        assert_eq!(StringProperty::new("a").unique().build().index_type(), Some(IndexType::Unique));
        assert_eq!(
            StringProperty::new("a").fulltext_indexed().build().index_type(),
            Some(IndexType::FullText)
        );
    }

    #[test]
    fn test_debug_shows_names_and_type() {
        let key = IntegerProperty::new("age").with_db_name("_age").build();
        assert_eq!(format!("{key:?}"), "KeyRef(age as _age: Integer)");
    }
}
