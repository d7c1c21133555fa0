use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::base;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::converter::{FnConverter, PropertyConverter};
use crate::property::key::PropertyKey;
use crate::property::sort::SortType;
use crate::Result;

fn to_string_value(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        s @ Value::String(_) => s,
        other => Value::String(other.to_text()),
    })
}

fn identity(value: Value) -> Result<Value> {
    Ok(value)
}

#[derive(Debug, Clone)]
pub struct StringProperty {
    config: PropertyConfig,
}

impl StringProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name) }
    }
}

impl PropertyKey for StringProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::String }
    fn sort_type(&self) -> SortType { SortType::String }

    fn database_converter<'a>(
        &'a self,
        _ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(FnConverter::new(to_string_value, identity)))
    }

    fn input_converter<'a>(&'a self, _ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(FnConverter::new(to_string_value, identity)))
    }

    fn accepts_stored(&self, value: &Value) -> bool {
        value.is_string()
    }

    fn fix_database_property(&self, ctx: &SecurityContext, entity: Option<&GraphObject>, value: Value) -> Value {
        let fixed = Value::String(value.to_text());
        base::persist_fix(self, ctx, entity, &fixed);
        fixed
    }
}

/// String key that stores its value lowercased. Case-insensitive lookups
/// such as e-mail addresses use it.
#[derive(Debug, Clone)]
pub struct LowercaseStringProperty {
    config: PropertyConfig,
}

impl LowercaseStringProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name) }
    }
}

fn to_lowercase_value(value: Value) -> Result<Value> {
    Ok(match to_string_value(value)? {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other,
    })
}

impl PropertyKey for LowercaseStringProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::String }
    fn sort_type(&self) -> SortType { SortType::String }

    fn database_converter<'a>(
        &'a self,
        _ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(FnConverter::new(to_lowercase_value, identity)))
    }

    fn input_converter<'a>(&'a self, _ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(FnConverter::new(to_string_value, identity)))
    }

    fn convert_search_value(&self, _ctx: &SecurityContext, raw: &str) -> Result<Value> {
        Ok(Value::String(raw.to_lowercase()))
    }

    fn accepts_stored(&self, value: &Value) -> bool {
        value.is_string()
    }
}

impl_builder!(StringProperty, LowercaseStringProperty);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Services;

    #[test]
    fn test_non_strings_are_stringified() {
        let ctx = SecurityContext::super_user(Services::builder().build());
        let key = StringProperty::new("code");
        let conv = key.input_converter(&ctx).unwrap();
        assert_eq!(conv.convert(Value::Long(12)).unwrap(), Value::from("12"));
        assert_eq!(conv.convert(Value::Null).unwrap(), Value::Null);
        assert_eq!(key.fix_database_property(&ctx, None, Value::Bool(true)), Value::from("true"));
    }

    #[test]
    fn test_lowercase_on_store() {
        let ctx = SecurityContext::super_user(Services::builder().build());
        let key = LowercaseStringProperty::new("email");
        let stored = key.database_converter(&ctx, None).unwrap().convert(Value::from("Ann@Example.COM")).unwrap();
        assert_eq!(stored, Value::from("ann@example.com"));
        assert_eq!(key.convert_search_value(&ctx, "ANN").unwrap(), Value::from("ann"));
    }
}
