//! Keys restricted to a fixed set of string constants.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::base;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::converter::{FnConverter, PropertyConverter};
use crate::property::key::PropertyKey;
use crate::property::sort::SortType;
use crate::{Error, Result};

/// A Rust enum that can back an [`EnumProperty`].
pub trait EnumConstants {
    fn constants() -> &'static [&'static str];
}

/// Allowed constants, in declaration order, shared by clones of a key.
#[derive(Debug, Clone)]
struct Constants {
    ordered: Arc<[String]>,
    lookup: Arc<BTreeSet<String>>,
}

impl Constants {
    fn new<S: Into<String>>(constants: impl IntoIterator<Item = S>) -> Self {
        let ordered: Vec<String> = constants.into_iter().map(Into::into).collect();
        let lookup = ordered.iter().cloned().collect();
        Self { ordered: ordered.into(), lookup: Arc::new(lookup) }
    }

    fn contains(&self, value: &str) -> bool {
        self.lookup.contains(value)
    }

    fn joined(&self) -> String {
        self.ordered.join(", ")
    }

    /// Reject non-blank strings outside the set.
    fn check(&self, config: &PropertyConfig, obj: &GraphObject, key: &dyn PropertyKey, value: &Value) -> Result<()> {
        let text = match value {
            Value::Null => return Ok(()),
            Value::String(s) if s.trim().is_empty() => return Ok(()),
            Value::String(s) => s.as_str(),
            other => return Err(self.not_allowed(config, obj, key, &other.to_text())),
        };
        if self.contains(text) {
            Ok(())
        } else {
            Err(self.not_allowed(config, obj, key, text))
        }
    }

    fn not_allowed(&self, config: &PropertyConfig, obj: &GraphObject, key: &dyn PropertyKey, value: &str) -> Error {
        Error::ValueNotAllowed {
            declaring_type: base::declaring_label(key, obj),
            property: config.json_name.clone(),
            value: value.to_owned(),
            allowed: self.joined(),
        }
    }

    fn schema(&self) -> Json {
        Json::Array(self.ordered.iter().map(|c| Json::from(c.as_str())).collect())
    }
}

fn to_text(value: Value) -> Result<Value> {
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
pub struct EnumProperty {
    config: PropertyConfig,
    constants: Constants,
}

impl EnumProperty {
    pub fn new<S: Into<String>>(name: impl Into<String>, constants: impl IntoIterator<Item = S>) -> Self {
        Self { config: PropertyConfig::new(name), constants: Constants::new(constants) }
    }

    /// Constants taken from a Rust enum.
    pub fn of<E: EnumConstants>(name: impl Into<String>) -> Self {
        Self::new(name, E::constants().iter().copied())
    }

    pub fn constants(&self) -> &[String] {
        &self.constants.ordered
    }
}

impl PropertyKey for EnumProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Enum }
    fn sort_type(&self) -> SortType { SortType::String }

    fn input_converter<'a>(&'a self, _ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(FnConverter::new(to_text, identity)))
    }

    /// Blank values skip validation and are stored as given.
    fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
        self.constants.check(&self.config, obj, self, &value)?;
        base::write(self, ctx, obj, value)
    }

    fn describe_openapi_output_type(&self) -> Json {
        let mut schema = crate::property::openapi::describe_type(&ValueType::Enum, self.format());
        schema["enum"] = self.constants.schema();
        schema
    }
}

/// List of enum constants; every element is validated.
#[derive(Debug, Clone)]
pub struct EnumArrayProperty {
    config: PropertyConfig,
    constants: Constants,
}

impl EnumArrayProperty {
    pub fn new<S: Into<String>>(name: impl Into<String>, constants: impl IntoIterator<Item = S>) -> Self {
        Self { config: PropertyConfig::new(name), constants: Constants::new(constants) }
    }

    pub fn of<E: EnumConstants>(name: impl Into<String>) -> Self {
        Self::new(name, E::constants().iter().copied())
    }
}

fn to_text_list(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::List(
            s.split(',').map(str::trim).filter(|p| !p.is_empty()).map(Value::from).collect(),
        ),
        other => Value::List(other.into_list().into_iter().map(|v| Value::String(v.to_text())).collect()),
    })
}

impl PropertyKey for EnumArrayProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Array(Box::new(ValueType::Enum)) }

    fn input_converter<'a>(&'a self, _ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(FnConverter::new(to_text_list, identity)))
    }

    fn convert_search_value(&self, _ctx: &SecurityContext, raw: &str) -> Result<Value> {
        Ok(Value::from(raw))
    }

    fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
        if let Value::List(items) = &value {
            for item in items {
                self.constants.check(&self.config, obj, self, item)?;
            }
        } else {
            self.constants.check(&self.config, obj, self, &value)?;
        }
        base::write(self, ctx, obj, value)
    }

    fn describe_openapi_output_type(&self) -> Json {
        serde_json::json!({
            "type": "array",
            "items": { "type": "string", "enum": self.constants.schema() },
        })
    }
}

impl_builder!(EnumProperty, EnumArrayProperty);

#[cfg(test)]
mod tests {
    use super::*;

    enum Status {}

    impl EnumConstants for Status {
        fn constants() -> &'static [&'static str] {
            &["DRAFT", "PUBLISHED"]
        }
    }

    #[test]
    fn test_constants_from_enum() {
        let key = EnumProperty::of::<Status>("status");
        assert_eq!(key.constants(), ["DRAFT", "PUBLISHED"]);
        assert_eq!(key.constants.joined(), "DRAFT, PUBLISHED");
        assert!(key.constants.contains("DRAFT"));
        assert!(!key.constants.contains("draft"));
    }

    #[test]
    fn test_openapi_lists_constants() {
        let key = EnumProperty::new("status", ["A", "B"]);
        let schema = key.describe_openapi_output_type();
        assert_eq!(schema["type"], "string");
        assert_eq!(schema["enum"], serde_json::json!(["A", "B"]));
    }

    #[test]
    fn test_array_input_splits_strings() {
        assert_eq!(
            to_text_list(Value::from("A, B")).unwrap(),
            Value::List(vec![Value::from("A"), Value::from("B")])
        );
    }
}
