use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::base;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::converter::{FnConverter, PropertyConverter};
use crate::property::key::{Predicate, PropertyKey};
use crate::Result;

/// `true`, or a string equal to `true`, `1` or `on` ignoring case.
/// Everything else, null included, is `false`.
pub fn parse_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on"),
        _ => false,
    }
}

fn to_bool(value: Value) -> Result<Value> {
    Ok(Value::Bool(parse_bool(&value)))
}

#[derive(Debug, Clone)]
pub struct BooleanProperty {
    config: PropertyConfig,
}

impl BooleanProperty {
    pub fn new(name: impl Into<String>) -> Self {
        let mut config = PropertyConfig::new(name);
        config.default_value = Value::Bool(false);
        Self { config }
    }
}

impl PropertyKey for BooleanProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Boolean }

    fn database_converter<'a>(
        &'a self,
        _ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(FnConverter::new(to_bool, to_bool)))
    }

    fn input_converter<'a>(&'a self, _ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(FnConverter::new(to_bool, to_bool)))
    }

    fn accepts_stored(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn fix_database_property(&self, ctx: &SecurityContext, entity: Option<&GraphObject>, value: Value) -> Value {
        let fixed = Value::Bool(parse_bool(&value));
        base::persist_fix(self, ctx, entity, &fixed);
        fixed
    }
}

/// Read-only boolean with a fixed value, never stored.
#[derive(Debug, Clone)]
pub struct ConstantBooleanProperty {
    config: PropertyConfig,
    constant: bool,
}

impl ConstantBooleanProperty {
    pub fn new(name: impl Into<String>, constant: bool) -> Self {
        let mut config = PropertyConfig::new(name);
        config.default_value = Value::Bool(constant);
        config.flags.read_only = true;
        Self { config, constant }
    }
}

impl PropertyKey for ConstantBooleanProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Boolean }

    fn get_property(&self, _ctx: &SecurityContext, _obj: &GraphObject, _apply: bool, _p: Option<Predicate<'_>>) -> Value {
        Value::Bool(self.constant)
    }

    fn set_property(&self, _ctx: &SecurityContext, obj: &GraphObject, _value: Value) -> Result<Option<Value>> {
        Err(base::read_only_error(self, obj))
    }
}

impl_builder!(BooleanProperty, ConstantBooleanProperty);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        for yes in ["true", "TRUE", "1", "on", " On "] {
            assert!(parse_bool(&Value::from(yes)), "{yes}");
        }
        for no in ["false", "0", "off", "yes", ""] {
            assert!(!parse_bool(&Value::from(no)), "{no}");
        }
        assert!(parse_bool(&Value::Bool(true)));
        assert!(!parse_bool(&Value::Null));
        assert!(!parse_bool(&Value::Int(1)));
    }

    #[test]
    fn test_default_is_false() {
        assert_eq!(BooleanProperty::new("flag").default_value(), Value::Bool(false));
    }
}
