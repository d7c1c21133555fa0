use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::converter::PropertyConverter;
use crate::property::key::PropertyKey;
use crate::Result;

/// Raw byte buffer.
///
/// Strings store their UTF-8 bytes and numeric lists are narrowed to bytes.
/// Anything else is stored as its JSON serialization.
#[derive(Debug, Clone)]
pub struct ByteArrayProperty {
    config: PropertyConfig,
}

impl ByteArrayProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name) }
    }
}

pub(crate) fn to_bytes(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        b @ Value::Bytes(_) => b,
        Value::String(s) => Value::Bytes(s.into_bytes()),
        Value::List(items) if items.iter().all(Value::is_numeric) => {
            Value::Bytes(items.iter().filter_map(Value::as_long).map(|n| n as u8).collect())
        }
        other => Value::Bytes(serde_json::to_vec(&other.to_json())?),
    })
}

struct BytesConverter;

impl PropertyConverter for BytesConverter {
    fn convert(&self, source: Value) -> Result<Value> {
        to_bytes(source)
    }

    fn revert(&self, source: Value) -> Result<Value> {
        to_bytes(source)
    }
}

impl PropertyKey for ByteArrayProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Bytes }

    fn database_converter<'a>(
        &'a self,
        _ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(BytesConverter))
    }

    fn input_converter<'a>(&'a self, _ctx: &'a SecurityContext) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(BytesConverter))
    }
}

impl_builder!(ByteArrayProperty);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_sources() {
        assert_eq!(to_bytes(Value::from("hi")).unwrap(), Value::Bytes(b"hi".to_vec()));
        assert_eq!(
            to_bytes(Value::List(vec![Value::Int(1), Value::Long(258)])).unwrap(),
            Value::Bytes(vec![1, 2])
        );
        assert_eq!(to_bytes(Value::Bool(true)).unwrap(), Value::Bytes(b"true".to_vec()));
        assert_eq!(to_bytes(Value::Null).unwrap(), Value::Null);
    }
}
