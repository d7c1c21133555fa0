//! Keys whose values are derived on read instead of stored.
//!
//! All of them are read-only except [`FunctionProperty`] with a write
//! expression and [`JoinProperty`], which distributes a combined string
//! back onto its source keys.

pub mod aggregate;
pub mod cypher;
pub mod function;
pub mod text;

pub use aggregate::{CollectionSumProperty, ElementCounterProperty, IntegerSumProperty, LongSumProperty};
pub use cypher::CypherQueryProperty;
pub use function::FunctionProperty;
pub use text::{ConcatProperty, JoinProperty};

use crate::model::Value;
use crate::object::GraphObject;
use crate::property::base;
use crate::property::config::PropertyConfig;
use crate::property::key::PropertyKey;
use crate::Result;

/// Write path of keys that have none.
pub(crate) fn reject_write<K: PropertyKey + ?Sized>(key: &K, obj: &GraphObject) -> Result<Option<Value>> {
    obj.relock();
    Err(base::read_only_error(key, obj))
}

pub(crate) fn read_only_config(name: impl Into<String>) -> PropertyConfig {
    let mut config = PropertyConfig::new(name);
    config.flags.read_only = true;
    config
}
