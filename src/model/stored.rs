//! Stored properties: the raw key/value record on nodes and relationships.
//!
//! Keys are database names, values are in their stored representation.
//! Typed access goes through `PropertyKey`; this map never converts.

use std::collections::HashMap;
use super::Value;

/// A map of database property names to stored values.
pub type StoredProperties = HashMap<String, Value>;

/// Convert a list of (key, value) pairs into a `Value::Map`.
impl<K, V> From<Vec<(K, V)>> for Value
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
