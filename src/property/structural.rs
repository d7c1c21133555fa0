//! System keys every entity carries: `id`, `type` and, on relationships,
//! `relType`.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::Result;

use super::base;
use super::config::{impl_builder, PropertyConfig};
use super::key::{KeyRef, Predicate, PropertyKey};
use super::keys::{ID_DB_NAME, TYPE_DB_NAME};
use super::search::{Occurrence, SearchAttribute};
use super::sort::SortType;

// ============================================================================
// id
// ============================================================================

/// The entity uuid. Written once at creation through the unlock escape hatch.
#[derive(Debug, Clone)]
pub struct UuidProperty {
    config: PropertyConfig,
}

impl UuidProperty {
    pub fn new() -> Self {
        let mut config = PropertyConfig::new(ID_DB_NAME);
        let flags = &mut config.flags;
        flags.system_internal = true;
        flags.read_only = true;
        flags.write_once = true;
        flags.unique = true;
        flags.not_null = true;
        flags.indexed = true;
        Self { config }
    }
}

impl Default for UuidProperty {
    fn default() -> Self {
        Self::new()
    }
}

/// 32 hex digits, optionally hyphenated.
pub fn is_valid_uuid(s: &str) -> bool {
    uuid::Uuid::try_parse(s).is_ok()
}

impl PropertyKey for UuidProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::String }
    fn sort_type(&self) -> SortType { SortType::String }

    fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
        if let Some(s) = value.as_str() {
            if !is_valid_uuid(s) {
                obj.relock();
                return Err(crate::Error::TypeError { expected: "uuid".into(), got: s.to_owned() });
            }
        }
        base::write(self, ctx, obj, value)
    }

    fn search_attribute(
        &self,
        _this: &KeyRef,
        _ctx: &SecurityContext,
        occur: Occurrence,
        value: Value,
        _exact: bool,
    ) -> SearchAttribute {
        SearchAttribute::Uuid { value: value.to_text(), occur }
    }
}

// ============================================================================
// type
// ============================================================================

/// The entity type name. Writing it also brings the node's labels in line
/// with the type.
#[derive(Debug, Clone)]
pub struct TypeProperty {
    config: PropertyConfig,
}

impl TypeProperty {
    pub fn new() -> Self {
        let mut config = PropertyConfig::new(TYPE_DB_NAME);
        let flags = &mut config.flags;
        flags.system_internal = true;
        flags.read_only = true;
        flags.write_once = true;
        flags.node_index_only = true;
        flags.indexed = true;
        Self { config }
    }

    /// Add missing labels of `type_name` and drop labels of other types.
    /// The tenant label is kept. Failures are logged only.
    fn sync_labels(&self, ctx: &SecurityContext, obj: &GraphObject, type_name: &str) {
        let Some(node) = obj.node_id() else { return };
        let tenant = ctx.settings().tenant_identifier.as_deref();

        let mut wanted: BTreeSet<String> = ctx.schema().labels_for(type_name).into_iter().collect();
        if let Some(t) = tenant {
            wanted.insert(t.to_owned());
        }
        let existing: BTreeSet<String> = obj.labels().into_iter().collect();

        let store = obj.store();
        for label in wanted.difference(&existing) {
            if let Err(e) = store.add_label(node, label) {
                warn!(node = %node, label = %label, error = %e, "unable to add label");
            }
        }
        for label in existing.difference(&wanted) {
            if let Err(e) = store.remove_label(node, label) {
                warn!(node = %node, label = %label, error = %e, "unable to remove label");
            }
        }
        debug!(node = %node, type_name, "labels synchronized");
    }
}

impl Default for TypeProperty {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyKey for TypeProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::String }
    fn sort_type(&self) -> SortType { SortType::String }

    fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
        let previous = base::write(self, ctx, obj, value.clone())?;
        if let Some(type_name) = value.as_str() {
            if obj.type_name().as_deref() == Some(type_name) {
                self.sync_labels(ctx, obj, type_name);
            }
        }
        Ok(previous)
    }
}

// ============================================================================
// relType
// ============================================================================

/// Type of the underlying relationship. Never stored.
#[derive(Debug, Clone)]
pub struct RelationshipTypeProperty {
    config: PropertyConfig,
}

impl RelationshipTypeProperty {
    pub fn new() -> Self {
        let mut config = PropertyConfig::new("relType");
        let flags = &mut config.flags;
        flags.system_internal = true;
        flags.read_only = true;
        flags.write_once = true;
        Self { config }
    }
}

impl Default for RelationshipTypeProperty {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyKey for RelationshipTypeProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::String }

    fn get_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _apply: bool, _p: Option<Predicate<'_>>) -> Value {
        obj.rel_type().map_or(Value::Null, Value::String)
    }

    fn set_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _value: Value) -> Result<Option<Value>> {
        obj.relock();
        Err(base::read_only_error(self, obj))
    }
}

impl_builder!(UuidProperty, TypeProperty, RelationshipTypeProperty);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_shapes() {
        assert!(is_valid_uuid("0123456789abcdef0123456789abcdef"));
        assert!(is_valid_uuid("01234567-89ab-cdef-0123-456789abcdef"));
        assert!(!is_valid_uuid("not-a-uuid"));
    }

    #[test]
    fn test_uuid_search_uses_identifier_attribute() {
        let ctx = SecurityContext::super_user(crate::context::Services::builder().build());
        let key = UuidProperty::new();
        let this = KeyRef::new(key.clone());
        let attr = this.get_search_attribute(&ctx, Occurrence::Required, Value::from("abc"), true);
        assert_eq!(attr, SearchAttribute::Uuid { value: "abc".into(), occur: Occurrence::Required });
    }

    #[test]
    fn test_flags() {
        let id = UuidProperty::new();
        assert!(id.flags().unique && id.flags().not_null && id.is_indexed());
        assert!(TypeProperty::new().flags().node_index_only);
        assert!(RelationshipTypeProperty::new().is_write_once());
    }
}
