//! Integer, Long, Float and Double keys.
//!
//! All four accept any numeric value (widened or narrowed to the declared
//! width) or a numeric string. Floating-point keys null out NaN and infinite
//! values unless `lenient_json` is set.

use std::fmt;
use std::marker::PhantomData;

use tracing::warn;

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::base;
use crate::property::config::{PropertyBuilder, PropertyConfig};
use crate::property::converter::PropertyConverter;
use crate::property::key::PropertyKey;
use crate::property::sort::SortType;
use crate::Result;

/// Width-specific behavior of a numeric key.
pub trait NumberKind: fmt::Debug + Clone + Copy + Send + Sync + 'static {
    const NAME: &'static str;
    const SORT: SortType;

    fn value_type() -> ValueType;

    /// Whether the value already has this width.
    fn is_native(value: &Value) -> bool;

    /// Narrow or widen another numeric value.
    fn from_number(value: &Value) -> Option<Value>;

    fn parse(s: &str) -> Option<Value>;

    fn is_finite(_value: &Value) -> bool {
        true
    }
}

fn parse_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok()
}

#[derive(Debug, Clone, Copy)]
pub struct IntKind;

impl NumberKind for IntKind {
    const NAME: &'static str = "Integer";
    const SORT: SortType = SortType::Integer;

    fn value_type() -> ValueType { ValueType::Integer }
    fn is_native(value: &Value) -> bool { matches!(value, Value::Int(_)) }
    fn from_number(value: &Value) -> Option<Value> { value.as_int().map(Value::Int) }

    fn parse(s: &str) -> Option<Value> {
        s.parse::<i32>()
            .ok()
            .or_else(|| parse_f64(s).filter(|f| f.is_finite() && f.abs() <= f64::from(i32::MAX)).map(|f| f as i32))
            .map(Value::Int)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LongKind;

impl NumberKind for LongKind {
    const NAME: &'static str = "Long";
    const SORT: SortType = SortType::Long;

    fn value_type() -> ValueType { ValueType::Long }
    fn is_native(value: &Value) -> bool { matches!(value, Value::Long(_)) }
    fn from_number(value: &Value) -> Option<Value> { value.as_long().map(Value::Long) }

    fn parse(s: &str) -> Option<Value> {
        s.parse::<i64>()
            .ok()
            .or_else(|| parse_f64(s).filter(|f| f.is_finite()).map(|f| f as i64))
            .map(Value::Long)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FloatKind;

impl NumberKind for FloatKind {
    const NAME: &'static str = "Float";
    const SORT: SortType = SortType::Double;

    fn value_type() -> ValueType { ValueType::Float }
    fn is_native(value: &Value) -> bool { matches!(value, Value::Float(_)) }
    fn from_number(value: &Value) -> Option<Value> { value.as_double().map(|d| Value::Float(d as f32)) }
    fn parse(s: &str) -> Option<Value> { s.parse::<f32>().ok().map(Value::Float) }

    fn is_finite(value: &Value) -> bool {
        !matches!(value, Value::Float(f) if !f.is_finite())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DoubleKind;

impl NumberKind for DoubleKind {
    const NAME: &'static str = "Double";
    const SORT: SortType = SortType::Double;

    fn value_type() -> ValueType { ValueType::Double }
    fn is_native(value: &Value) -> bool { matches!(value, Value::Double(_)) }
    fn from_number(value: &Value) -> Option<Value> { value.as_double().map(Value::Double) }
    fn parse(s: &str) -> Option<Value> { parse_f64(s).map(Value::Double) }

    fn is_finite(value: &Value) -> bool {
        !matches!(value, Value::Double(d) if !d.is_finite())
    }
}

// ============================================================================
// Converter
// ============================================================================

struct NumberConverter<'a, N> {
    config: &'a PropertyConfig,
    lenient: bool,
    kind: PhantomData<N>,
}

impl<'a, N: NumberKind> NumberConverter<'a, N> {
    fn new(config: &'a PropertyConfig, ctx: &SecurityContext) -> Self {
        Self { config, lenient: ctx.settings().lenient_json, kind: PhantomData }
    }

    fn coerce(&self, value: Value) -> Result<Value> {
        let number = match &value {
            Value::Null => return Ok(Value::Null),
            v if N::is_native(v) => value.clone(),
            v if v.is_numeric() => N::from_number(v).ok_or_else(|| self.config.number_error(v, N::NAME))?,
            Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
            Value::String(s) => N::parse(s.trim()).ok_or_else(|| self.config.number_error(&value, N::NAME))?,
            other => return Err(self.config.number_error(other, N::NAME)),
        };
        if !self.lenient && !N::is_finite(&number) {
            return Ok(Value::Null);
        }
        Ok(number)
    }
}

impl<N: NumberKind> PropertyConverter for NumberConverter<'_, N> {
    fn convert(&self, source: Value) -> Result<Value> {
        self.coerce(source)
    }

    fn revert(&self, source: Value) -> Result<Value> {
        self.coerce(source)
    }
}

// ============================================================================
// Key
// ============================================================================

/// Numeric key of width `N`. Use the aliases below.
#[derive(Debug, Clone)]
pub struct NumberProperty<N: NumberKind> {
    config: PropertyConfig,
    kind: PhantomData<N>,
}

pub type IntegerProperty = NumberProperty<IntKind>;
pub type LongProperty = NumberProperty<LongKind>;
pub type FloatProperty = NumberProperty<FloatKind>;
pub type DoubleProperty = NumberProperty<DoubleKind>;

impl<N: NumberKind> NumberProperty<N> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name), kind: PhantomData }
    }
}

impl<N: NumberKind> PropertyBuilder for NumberProperty<N> {
    fn config_mut(&mut self) -> &mut PropertyConfig {
        &mut self.config
    }
}

impl<N: NumberKind> PropertyKey for NumberProperty<N> {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { N::value_type() }
    fn sort_type(&self) -> SortType { N::SORT }

    fn database_converter<'a>(
        &'a self,
        ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(NumberConverter::<N>::new(&self.config, ctx)))
    }

    fn input_converter<'a>(&'a self, ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(NumberConverter::<N>::new(&self.config, ctx)))
    }

    fn accepts_stored(&self, value: &Value) -> bool {
        N::is_native(value)
    }

    fn fix_database_property(&self, ctx: &SecurityContext, entity: Option<&GraphObject>, value: Value) -> Value {
        match NumberConverter::<N>::new(&self.config, ctx).coerce(value.clone()) {
            Ok(fixed) => {
                base::persist_fix(self, ctx, entity, &fixed);
                fixed
            }
            Err(e) => {
                warn!(property = self.json_name(), error = %e, "unable to repair stored number");
                value
            }
        }
    }
}
