//! Two-way value transformers.
//!
//! A database converter moves between logical and stored form; an input
//! converter moves between the JSON/request form and logical form:
//!
//! ```text
//!   input ──input.convert──▶ logical ──database.convert──▶ stored
//!   input ◀─input.revert─── logical ◀─database.revert──── stored
//! ```
//!
//! Converters are created per call by the key that owns them and may borrow
//! the key, the security context and the entity for the duration of that call.

use crate::model::Value;
use crate::Result;

pub trait PropertyConverter {
    /// Towards storage (database converters) or towards logical form (input converters).
    fn convert(&self, source: Value) -> Result<Value>;

    /// Towards logical form (database converters) or towards output form (input converters).
    fn revert(&self, source: Value) -> Result<Value>;
}

/// Converter built from two functions.
pub struct FnConverter<C, R> {
    convert: C,
    revert: R,
}

impl<C, R> FnConverter<C, R>
where
    C: Fn(Value) -> Result<Value>,
    R: Fn(Value) -> Result<Value>,
{
    pub fn new(convert: C, revert: R) -> Self {
        Self { convert, revert }
    }
}

impl<C, R> PropertyConverter for FnConverter<C, R>
where
    C: Fn(Value) -> Result<Value>,
    R: Fn(Value) -> Result<Value>,
{
    fn convert(&self, source: Value) -> Result<Value> {
        (self.convert)(source)
    }

    fn revert(&self, source: Value) -> Result<Value> {
        (self.revert)(source)
    }
}

/// Apply `convert` if a converter is present, pass the value through otherwise.
pub fn convert_with(converter: Option<&dyn PropertyConverter>, value: Value) -> Result<Value> {
    match converter {
        Some(c) => c.convert(value),
        None => Ok(value),
    }
}

/// Apply `revert` if a converter is present, pass the value through otherwise.
pub fn revert_with(converter: Option<&dyn PropertyConverter>, value: Value) -> Result<Value> {
    match converter {
        Some(c) => c.revert(value),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_converter() {
        let c = FnConverter::new(
            |v: Value| Ok(Value::Long(v.as_long().unwrap_or_default() * 10)),
            |v: Value| Ok(Value::Long(v.as_long().unwrap_or_default() / 10)),
        );
        assert_eq!(c.convert(Value::Long(4)).unwrap(), Value::Long(40));
        assert_eq!(c.revert(Value::Long(40)).unwrap(), Value::Long(4));
        assert_eq!(convert_with(None, Value::Int(1)).unwrap(), Value::Int(1));
    }
}
