//! Scalar and array keys backed by a single stored value.

pub mod array;
pub mod boolean;
pub mod bytes;
pub mod date;
pub mod enums;
pub mod generic;
pub mod number;
pub mod secret;
pub mod string;

pub use array::{ArrayProperty, ComponentType};
pub use boolean::{BooleanProperty, ConstantBooleanProperty};
pub use bytes::ByteArrayProperty;
pub use date::{DateArrayProperty, DateProperty, ZonedDateTimeProperty};
pub use enums::{EnumArrayProperty, EnumConstants, EnumProperty};
pub use generic::GenericProperty;
pub use number::{DoubleProperty, FloatProperty, IntegerProperty, LongProperty, NumberKind, NumberProperty};
pub use secret::{EncryptedStringProperty, PasswordProperty};
pub use string::{LowercaseStringProperty, StringProperty};

use super::config::PropertyBuilder;
use super::key::KeyRef;

/// A throwaway key of the named primitive type, used to borrow its
/// converters. Names match case-insensitively.
pub fn for_type_hint(hint: &str, name: &str) -> Option<KeyRef> {
    let key = match hint.trim().to_ascii_lowercase().as_str() {
        "boolean" => BooleanProperty::new(name).build(),
        "int" | "integer" => IntegerProperty::new(name).build(),
        "long" => LongProperty::new(name).build(),
        "float" => FloatProperty::new(name).build(),
        "double" => DoubleProperty::new(name).build(),
        "string" => StringProperty::new(name).build(),
        "date" => DateProperty::new(name).build(),
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;

    #[test]
    fn test_type_hints() {
        assert_eq!(for_type_hint("Integer", "x").unwrap().value_type(), ValueType::Integer);
        assert_eq!(for_type_hint(" double ", "x").unwrap().value_type(), ValueType::Double);
        assert!(for_type_hint("Widget", "x").is_none());
    }
}
