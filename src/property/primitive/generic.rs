use crate::model::ValueType;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::key::PropertyKey;

/// Untyped key. Values pass through unconverted; used for dynamic
/// properties the schema does not declare.
#[derive(Debug, Clone)]
pub struct GenericProperty {
    config: PropertyConfig,
}

impl GenericProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name) }
    }
}

impl PropertyKey for GenericProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::Any }
}

impl_builder!(GenericProperty);
