//! Id-only views of relationship keys: `projectId` next to `project`.

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::key::{KeyRef, Predicate, PropertyKey};
use crate::property::search::{Occurrence, SearchAttribute};
use crate::Result;

use super::{Notion, RelatedProperty};

/// Uuid of the single related entity. Writing an id relinks.
#[derive(Debug, Clone)]
pub struct EntityIdProperty {
    config: PropertyConfig,
    inner: RelatedProperty,
}

impl EntityIdProperty {
    pub fn new(name: impl Into<String>, related: &RelatedProperty) -> Self {
        Self { config: PropertyConfig::new(name), inner: related.clone().with_notion(Notion::id()) }
    }

    pub fn related(&self) -> &RelatedProperty {
        &self.inner
    }
}

/// Uuids of all related entities.
#[derive(Debug, Clone)]
pub struct CollectionIdProperty {
    config: PropertyConfig,
    inner: RelatedProperty,
}

impl CollectionIdProperty {
    pub fn new(name: impl Into<String>, related: &RelatedProperty) -> Self {
        Self { config: PropertyConfig::new(name), inner: related.clone().with_notion(Notion::id()) }
    }

    pub fn related(&self) -> &RelatedProperty {
        &self.inner
    }
}

macro_rules! delegate_to_related {
    ($ty:ty, $value_type:expr) => {
        impl PropertyKey for $ty {
            fn config(&self) -> &PropertyConfig { &self.config }
            fn value_type(&self) -> ValueType { $value_type }

            fn get_property(
                &self,
                ctx: &SecurityContext,
                obj: &GraphObject,
                _apply_converter: bool,
                predicate: Option<Predicate<'_>>,
            ) -> Value {
                self.inner.get_property(ctx, obj, true, predicate)
            }

            fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
                if self.is_read_only() && !obj.read_only_properties_unlocked() {
                    obj.relock();
                    return Err(crate::property::base::read_only_error(self, obj));
                }
                self.inner.set_property(ctx, obj, value)
            }

            fn search_attribute(
                &self,
                _this: &KeyRef,
                _ctx: &SecurityContext,
                occur: Occurrence,
                value: Value,
                _exact: bool,
            ) -> SearchAttribute {
                SearchAttribute::Related { key: KeyRef::new(self.inner.clone()), value, occur }
            }
        }
    };
}

delegate_to_related!(EntityIdProperty, ValueType::String);
delegate_to_related!(CollectionIdProperty, ValueType::Array(Box::new(ValueType::String)));

impl_builder!(EntityIdProperty, CollectionIdProperty);
