//! Counters and numeric sums.

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::key::{KeyRef, Predicate, PropertyKey};
use crate::Result;

use super::{read_only_config, reject_write};

/// Number of elements in a collection key.
#[derive(Debug, Clone)]
pub struct ElementCounterProperty {
    config: PropertyConfig,
    collection: KeyRef,
}

impl ElementCounterProperty {
    pub fn new(name: impl Into<String>, collection: KeyRef) -> Self {
        Self { config: read_only_config(name), collection }
    }
}

impl PropertyKey for ElementCounterProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Integer }

    fn get_property(&self, ctx: &SecurityContext, obj: &GraphObject, _apply: bool, p: Option<Predicate<'_>>) -> Value {
        let count = self.collection.get_property(ctx, obj, false, p).into_list().len();
        Value::Int(i32::try_from(count).unwrap_or(i32::MAX))
    }

    fn set_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _value: Value) -> Result<Option<Value>> {
        reject_write(self, obj)
    }
}

/// Sum of sibling Integer keys; null values are skipped.
#[derive(Debug, Clone)]
pub struct IntegerSumProperty {
    config: PropertyConfig,
    summands: Vec<KeyRef>,
}

impl IntegerSumProperty {
    pub fn new(name: impl Into<String>, summands: Vec<KeyRef>) -> Self {
        Self { config: read_only_config(name), summands }
    }
}

impl PropertyKey for IntegerSumProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Integer }

    fn get_property(&self, ctx: &SecurityContext, obj: &GraphObject, _apply: bool, _p: Option<Predicate<'_>>) -> Value {
        let sum = self
            .summands
            .iter()
            .filter_map(|k| k.get_property(ctx, obj, true, None).as_int())
            .fold(0i32, i32::wrapping_add);
        Value::Int(sum)
    }

    fn set_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _value: Value) -> Result<Option<Value>> {
        reject_write(self, obj)
    }
}

/// Sum of sibling Long keys; null values are skipped.
#[derive(Debug, Clone)]
pub struct LongSumProperty {
    config: PropertyConfig,
    summands: Vec<KeyRef>,
}

impl LongSumProperty {
    pub fn new(name: impl Into<String>, summands: Vec<KeyRef>) -> Self {
        Self { config: read_only_config(name), summands }
    }
}

impl PropertyKey for LongSumProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Long }

    fn get_property(&self, ctx: &SecurityContext, obj: &GraphObject, _apply: bool, _p: Option<Predicate<'_>>) -> Value {
        let sum = self
            .summands
            .iter()
            .filter_map(|k| k.get_property(ctx, obj, true, None).as_long())
            .fold(0i64, i64::wrapping_add);
        Value::Long(sum)
    }

    fn set_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _value: Value) -> Result<Option<Value>> {
        reject_write(self, obj)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SumKind {
    Integer,
    Long,
    Float,
    Double,
}

impl SumKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int(_) => Some(SumKind::Integer),
            Value::Long(_) => Some(SumKind::Long),
            Value::Float(_) => Some(SumKind::Float),
            Value::Double(_) => Some(SumKind::Double),
            _ => None,
        }
    }
}

/// Sum of one numeric key over the entities of a relationship collection.
///
/// The result type follows the last element whose value differs from the
/// element key's default. Mixed numeric types therefore make the result
/// type depend on traversal order.
#[derive(Debug, Clone)]
pub struct CollectionSumProperty {
    config: PropertyConfig,
    collection: KeyRef,
    element: KeyRef,
}

impl CollectionSumProperty {
    pub fn new(name: impl Into<String>, collection: KeyRef, element: KeyRef) -> Self {
        Self { config: read_only_config(name), collection, element }
    }
}

impl PropertyKey for CollectionSumProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { self.element.value_type() }

    fn get_property(&self, ctx: &SecurityContext, obj: &GraphObject, _apply: bool, p: Option<Predicate<'_>>) -> Value {
        let default = self.element.default_value();
        let mut kind = SumKind::Integer;
        let mut integral: i64 = 0;
        let mut fractional: f64 = 0.0;

        for member in self.collection.get_property(ctx, obj, false, p).into_list() {
            let Some(node) = member.as_node() else { continue };
            let entity = GraphObject::node(obj.store().clone(), node);
            let value = self.element.get_property(ctx, &entity, true, None);
            if value.is_null() {
                continue;
            }
            if value != default {
                if let Some(k) = SumKind::of(&value) {
                    kind = k;
                }
            }
            integral = integral.wrapping_add(value.as_long().unwrap_or_default());
            fractional += value.as_double().unwrap_or_default();
        }

        match kind {
            SumKind::Integer => Value::Int(integral as i32),
            SumKind::Long => Value::Long(integral),
            SumKind::Float => Value::Float(fractional as f32),
            SumKind::Double => Value::Double(fractional),
        }
    }

    fn set_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _value: Value) -> Result<Option<Value>> {
        reject_write(self, obj)
    }
}

impl_builder!(ElementCounterProperty, IntegerSumProperty, LongSumProperty, CollectionSumProperty);
