//! Arrays of scalars.
//!
//! The component type is a strategy value carrying the element parser and
//! coercion, chosen when the key is built.

use std::fmt;

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::base;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::converter::PropertyConverter;
use crate::property::key::{KeyRef, PropertyKey};
use crate::property::search::{Occurrence, QueryGroup, SearchAttribute};
use crate::{Error, Result};

use super::boolean::parse_bool;

/// Element strategy of an [`ArrayProperty`].
#[derive(Clone, Copy)]
pub struct ComponentType {
    pub name: &'static str,
    pub value_type: fn() -> ValueType,
    /// Parse a textual element.
    pub parse: fn(&str) -> Option<Value>,
    /// Whether an element already has the component type.
    pub accepts: fn(&Value) -> bool,
    /// Coerce a non-text element of another type.
    pub coerce: fn(&Value) -> Option<Value>,
}

fn string_type() -> ValueType { ValueType::String }
fn boolean_type() -> ValueType { ValueType::Boolean }
fn integer_type() -> ValueType { ValueType::Integer }
fn long_type() -> ValueType { ValueType::Long }
fn float_type() -> ValueType { ValueType::Float }
fn double_type() -> ValueType { ValueType::Double }

fn parse_string(s: &str) -> Option<Value> { Some(Value::from(s)) }
fn parse_boolean(s: &str) -> Option<Value> { Some(Value::Bool(parse_bool(&Value::from(s)))) }
fn parse_integer(s: &str) -> Option<Value> { s.parse::<i32>().ok().map(Value::Int) }
fn parse_long(s: &str) -> Option<Value> { s.parse::<i64>().ok().map(Value::Long) }
fn parse_float(s: &str) -> Option<Value> { s.parse::<f32>().ok().map(Value::Float) }
fn parse_double(s: &str) -> Option<Value> { s.parse::<f64>().ok().map(Value::Double) }

fn is_string(v: &Value) -> bool { v.is_string() }
fn is_boolean(v: &Value) -> bool { matches!(v, Value::Bool(_)) }
fn is_integer(v: &Value) -> bool { matches!(v, Value::Int(_)) }
fn is_long(v: &Value) -> bool { matches!(v, Value::Long(_)) }
fn is_float(v: &Value) -> bool { matches!(v, Value::Float(_)) }
fn is_double(v: &Value) -> bool { matches!(v, Value::Double(_)) }

fn coerce_string(v: &Value) -> Option<Value> { Some(Value::String(v.to_text())) }
fn coerce_boolean(v: &Value) -> Option<Value> { Some(Value::Bool(parse_bool(v))) }
fn coerce_integer(v: &Value) -> Option<Value> { v.as_int().map(Value::Int) }
fn coerce_long(v: &Value) -> Option<Value> { v.as_long().map(Value::Long) }
fn coerce_float(v: &Value) -> Option<Value> { v.as_double().map(|d| Value::Float(d as f32)) }
fn coerce_double(v: &Value) -> Option<Value> { v.as_double().map(Value::Double) }

impl ComponentType {
    pub const STRING: ComponentType = ComponentType {
        name: "String",
        value_type: string_type,
        parse: parse_string,
        accepts: is_string,
        coerce: coerce_string,
    };
    pub const BOOLEAN: ComponentType = ComponentType {
        name: "Boolean",
        value_type: boolean_type,
        parse: parse_boolean,
        accepts: is_boolean,
        coerce: coerce_boolean,
    };
    pub const INTEGER: ComponentType = ComponentType {
        name: "Integer",
        value_type: integer_type,
        parse: parse_integer,
        accepts: is_integer,
        coerce: coerce_integer,
    };
    pub const LONG: ComponentType = ComponentType {
        name: "Long",
        value_type: long_type,
        parse: parse_long,
        accepts: is_long,
        coerce: coerce_long,
    };
    pub const FLOAT: ComponentType = ComponentType {
        name: "Float",
        value_type: float_type,
        parse: parse_float,
        accepts: is_float,
        coerce: coerce_float,
    };
    pub const DOUBLE: ComponentType = ComponentType {
        name: "Double",
        value_type: double_type,
        parse: parse_double,
        accepts: is_double,
        coerce: coerce_double,
    };

    /// Convert one element. `None` when it cannot be represented.
    pub fn convert_element(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Null => Some(Value::Null),
            v if (self.accepts)(v) => Some(v.clone()),
            Value::String(s) => (self.parse)(s.trim()),
            Value::List(_) | Value::Map(_) => None,
            other => (self.coerce)(other),
        }
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({})", self.name)
    }
}

/// Split a flattened array string. A comma wins over whitespace.
fn split_text(s: &str) -> Vec<&str> {
    let parts: Vec<&str> = if s.contains(',') {
        s.split(',').collect()
    } else {
        s.split_whitespace().collect()
    };
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

#[derive(Debug, Clone)]
pub struct ArrayProperty {
    config: PropertyConfig,
    component: ComponentType,
}

impl ArrayProperty {
    pub fn new(name: impl Into<String>, component: ComponentType) -> Self {
        Self { config: PropertyConfig::new(name), component }
    }

    pub fn strings(name: impl Into<String>) -> Self { Self::new(name, ComponentType::STRING) }
    pub fn booleans(name: impl Into<String>) -> Self { Self::new(name, ComponentType::BOOLEAN) }
    pub fn integers(name: impl Into<String>) -> Self { Self::new(name, ComponentType::INTEGER) }
    pub fn longs(name: impl Into<String>) -> Self { Self::new(name, ComponentType::LONG) }
    pub fn floats(name: impl Into<String>) -> Self { Self::new(name, ComponentType::FLOAT) }
    pub fn doubles(name: impl Into<String>) -> Self { Self::new(name, ComponentType::DOUBLE) }

    pub fn component(&self) -> ComponentType {
        self.component
    }

    fn element_error(&self, element: &Value) -> Error {
        Error::ArrayElement {
            declaring_type: self.config.declaring_label().to_owned(),
            property: self.config.json_name.clone(),
            value: element.to_text(),
            component: self.component.name.to_owned(),
        }
    }

    /// Lists convert element-wise, strings are split, scalars wrap.
    fn convert_list(&self, value: Value) -> Result<Value> {
        let elements: Vec<Value> = match value {
            Value::Null => return Ok(Value::Null),
            Value::List(items) => items,
            Value::String(s) => split_text(&s).into_iter().map(Value::from).collect(),
            other => vec![other],
        };
        let mut out = Vec::with_capacity(elements.len());
        for element in &elements {
            let converted = self.component.convert_element(element).ok_or_else(|| self.element_error(element))?;
            out.push(converted);
        }
        Ok(Value::List(out))
    }
}

struct ArrayConverter<'a> {
    key: &'a ArrayProperty,
}

impl PropertyConverter for ArrayConverter<'_> {
    fn convert(&self, source: Value) -> Result<Value> {
        self.key.convert_list(source)
    }

    fn revert(&self, source: Value) -> Result<Value> {
        self.key.convert_list(source)
    }
}

impl PropertyKey for ArrayProperty {
    fn config(&self) -> &PropertyConfig { &self.config }

    fn value_type(&self) -> ValueType {
        ValueType::Array(Box::new((self.component.value_type)()))
    }

    fn database_converter<'a>(
        &'a self,
        _ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(ArrayConverter { key: self }))
    }

    fn input_converter<'a>(&'a self, _ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(ArrayConverter { key: self }))
    }

    /// Search values are single elements, not lists.
    fn convert_search_value(&self, _ctx: &SecurityContext, raw: &str) -> Result<Value> {
        let element = Value::from(raw);
        self.component.convert_element(&element).ok_or_else(|| self.element_error(&element))
    }

    fn accepts_stored(&self, value: &Value) -> bool {
        value.is_list()
    }

    /// Recovers arrays flattened into one string by older writers.
    fn fix_database_property(&self, ctx: &SecurityContext, entity: Option<&GraphObject>, value: Value) -> Value {
        let fixed = match &value {
            Value::String(s) => Value::List(split_text(s).into_iter().map(Value::from).collect()),
            Value::List(_) => return value,
            _ => Value::List(vec![value.clone()]),
        };
        let fixed = self.convert_list(fixed.clone()).unwrap_or(fixed);
        base::persist_fix(self, ctx, entity, &fixed);
        fixed
    }

    fn search_attribute(
        &self,
        this: &KeyRef,
        _ctx: &SecurityContext,
        occur: Occurrence,
        value: Value,
        exact: bool,
    ) -> SearchAttribute {
        SearchAttribute::Array { key: this.clone(), value, occur, exact }
    }

    /// Every listed element becomes an `Array` constraint: all required in
    /// exact mode, any one in inexact mode.
    fn determine_search_type(
        &self,
        this: &KeyRef,
        ctx: &SecurityContext,
        raw: &str,
        exact: bool,
        query: &mut QueryGroup,
    ) -> Result<()> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            query.push(SearchAttribute::Empty { key: this.clone(), occur: Occurrence::Required });
            return Ok(());
        }
        if trimmed == "[]" || (trimmed.starts_with('[') && trimmed.contains(" TO ")) {
            return base::determine_search_type(this, ctx, raw, exact, query);
        }

        let member = if exact { Occurrence::Required } else { Occurrence::Optional };
        let mut attributes = Vec::new();
        for part in trimmed.split([',', ';']).map(str::trim).filter(|p| !p.is_empty()) {
            let value = self.convert_search_value(ctx, part)?;
            attributes.push(this.get_search_attribute(ctx, member, value, exact));
        }
        query.push(SearchAttribute::Group { occur: Occurrence::Required, attributes });
        Ok(())
    }
}

impl_builder!(ArrayProperty);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::context::Services;
    use crate::property::PropertyBuilder;

    fn ctx() -> SecurityContext {
        SecurityContext::super_user(Services::builder().build())
    }

    #[test]
    fn test_split_prefers_comma() {
        assert_eq!(split_text("a, b c"), vec!["a", "b c"]);
        assert_eq!(split_text("a b  c"), vec!["a", "b", "c"]);
        assert!(split_text(" ").is_empty());
    }

    #[test]
    fn test_elements_are_coerced() {
        let key = ArrayProperty::integers("scores");
        let out = key.convert_list(Value::List(vec![Value::from("1"), Value::Long(2), Value::Double(3.0)])).unwrap();
        assert_eq!(out, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn test_bad_element_names_component() {
        let key = ArrayProperty::longs("ids").declared_by("Batch");
        let err = key.convert_list(Value::List(vec![Value::from("1"), Value::from("x")])).unwrap_err();
        match err {
            Error::ArrayElement { declaring_type, property, value, component } => {
                assert_eq!(declaring_type, "Batch");
                assert_eq!(property, "ids");
                assert_eq!(value, "x");
                assert_eq!(component, "Long");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_fix_splits_legacy_string() {
        let key = ArrayProperty::strings("tags");
        let fixed = key.fix_database_property(&ctx(), None, Value::from("red,green, blue"));
        assert_eq!(fixed, Value::List(vec![Value::from("red"), Value::from("green"), Value::from("blue")]));
    }

    #[test]
    fn test_search_groups_follow_exact_mode() {
        let ctx = ctx();
        let key = ArrayProperty::strings("tags").build();

        let mut q = QueryGroup::new();
        key.determine_search_type(&ctx, "a,b", true, &mut q).unwrap();
        assert!(q.attributes()[0].is_and_group());

        let mut q = QueryGroup::new();
        key.determine_search_type(&ctx, "a;b", false, &mut q).unwrap();
        assert!(q.attributes()[0].is_or_group());
        if let SearchAttribute::Group { attributes, .. } = &q.attributes()[0] {
            assert!(matches!(&attributes[0], SearchAttribute::Array { value, .. } if *value == Value::from("a")));
        }

        let mut q = QueryGroup::new();
        key.determine_search_type(&ctx, "", true, &mut q).unwrap();
        assert!(matches!(q.attributes()[0], SearchAttribute::Empty { .. }));
    }
}
