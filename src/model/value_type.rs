//! Logical value type descriptors.

use std::fmt;
use serde::{Deserialize, Serialize};

/// The logical type a property key hands out.
///
/// Collections of entities and arrays of scalars are distinguished because
/// the search layer builds different attributes for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    String,
    Date,
    ZonedDateTime,
    Bytes,
    /// String constrained to a fixed constant set.
    Enum,
    /// Array of a scalar component type.
    Array(Box<ValueType>),
    /// Single related entity of the named type.
    Entity(String),
    /// Collection of related entities of the named type.
    Collection(String),
    Map,
    Any,
}

impl ValueType {
    pub fn is_collection(&self) -> bool {
        matches!(self, ValueType::Array(_) | ValueType::Collection(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Long | ValueType::Float | ValueType::Double)
    }

    /// The scalar component of arrays, the type itself otherwise.
    pub fn component(&self) -> &ValueType {
        match self {
            ValueType::Array(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Boolean => write!(f, "Boolean"),
            ValueType::Integer => write!(f, "Integer"),
            ValueType::Long => write!(f, "Long"),
            ValueType::Float => write!(f, "Float"),
            ValueType::Double => write!(f, "Double"),
            ValueType::String => write!(f, "String"),
            ValueType::Date => write!(f, "Date"),
            ValueType::ZonedDateTime => write!(f, "ZonedDateTime"),
            ValueType::Bytes => write!(f, "Byte[]"),
            ValueType::Enum => write!(f, "Enum"),
            ValueType::Array(inner) => write!(f, "{inner}[]"),
            ValueType::Entity(t) => write!(f, "{t}"),
            ValueType::Collection(t) => write!(f, "{t}[]"),
            ValueType::Map => write!(f, "Map"),
            ValueType::Any => write!(f, "Object"),
        }
    }
}
