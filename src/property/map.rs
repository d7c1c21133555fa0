//! Ordered key → value maps and the whole-entity conversion pipelines.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};

use tracing::{debug, warn};

use crate::context::SecurityContext;
use crate::model::{StoredProperties, Value};
use crate::object::GraphObject;
use crate::schema::EntityType;
use crate::settings::UnknownKeyPolicy;
use crate::{Error, Result};

use super::config::PropertyBuilder;
use super::converter::{convert_with, revert_with, PropertyConverter};
use super::key::KeyRef;
use super::primitive::GenericProperty;

/// Insertion-ordered map from keys to values, one value per key.
///
/// Which representation the values are in (stored, logical or input) is up
/// to the caller; the static conversion functions move whole maps between
/// them.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: Vec<(KeyRef, Value)>,
    index: hashbrown::HashMap<KeyRef, usize>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: hashbrown::HashMap::with_capacity(capacity),
        }
    }

    /// Insert or replace. A replaced entry keeps its position.
    pub fn put(&mut self, key: &KeyRef, value: impl Into<Value>) -> Option<Value> {
        let value = value.into();
        match self.index.get(key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key.clone(), value));
                None
            }
        }
    }

    /// Chainable `put`.
    pub fn with(mut self, key: &KeyRef, value: impl Into<Value>) -> Self {
        self.put(key, value);
        self
    }

    pub fn get(&self, key: &KeyRef) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_by_json_name(&self, json_name: &str) -> Option<(&KeyRef, &Value)> {
        self.entries.iter().find(|(k, _)| k.json_name() == json_name).map(|(k, v)| (k, v))
    }

    pub fn contains(&self, key: &KeyRef) -> bool {
        self.index.contains_key(key)
    }

    pub fn remove(&mut self, key: &KeyRef) -> Option<Value> {
        let i = self.index.remove(key)?;
        let (_, value) = self.entries.remove(i);
        for (k, _) in &self.entries[i..] {
            if let Some(pos) = self.index.get_mut(k) {
                *pos -= 1;
            }
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyRef, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &KeyRef> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Copy every entry of `other` into this map; `other` wins on conflicts.
    pub fn merge(&mut self, other: &PropertyMap) {
        for (k, v) in other.iter() {
            self.put(k, v.clone());
        }
    }

    /// Order-independent hash of the content.
    ///
    /// With `comparison_keys`, only those keys take part. Unvalidated keys
    /// only take part when `include_system_properties` is set.
    pub fn content_hash_code(&self, comparison_keys: Option<&HashSet<KeyRef>>, include_system_properties: bool) -> u64 {
        let mut entries: Vec<&(KeyRef, Value)> = self
            .entries
            .iter()
            .filter(|(k, _)| comparison_keys.is_none_or(|keys| keys.contains(k)))
            .filter(|(k, _)| include_system_properties || !k.is_unvalidated())
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut hasher = DefaultHasher::new();
        for (k, v) in entries {
            k.hash(&mut hasher);
            v.hash_into(&mut hasher);
        }
        hasher.finish()
    }

    // ========================================================================
    // Single-value conversions
    // ========================================================================

    /// Stored → logical. Conversion failures are logged and the raw value kept.
    pub fn database_value_to_logical(
        ctx: &SecurityContext,
        key: &KeyRef,
        entity: Option<&GraphObject>,
        value: Value,
    ) -> Value {
        let value = if !value.is_null() && !key.accepts_stored(&value) {
            key.fix_database_property(ctx, entity, value)
        } else {
            value
        };
        match revert_with(key.database_converter(ctx, entity).as_deref(), value.clone()) {
            Ok(v) => v,
            Err(e) => {
                warn!(property = key.json_name(), error = %e, "unable to convert stored value, using raw value");
                value
            }
        }
    }

    /// Logical → stored.
    pub fn logical_value_to_database(
        ctx: &SecurityContext,
        key: &KeyRef,
        entity: Option<&GraphObject>,
        value: Value,
    ) -> Result<Value> {
        convert_with(key.database_converter(ctx, entity).as_deref(), value)
    }

    /// Input (JSON) → logical.
    pub fn input_value_to_logical(ctx: &SecurityContext, key: &KeyRef, value: Value) -> Result<Value> {
        convert_with(key.input_converter(ctx).as_deref(), value)
    }

    /// Logical → output (JSON).
    pub fn logical_value_to_input(ctx: &SecurityContext, key: &KeyRef, value: Value) -> Result<Value> {
        revert_with(key.input_converter(ctx).as_deref(), value)
    }

    // ========================================================================
    // Whole-map conversions
    // ========================================================================

    /// Stored properties of an entity of `entity_type` → logical map.
    /// Undeclared stored names become dynamic generic keys.
    pub fn database_to_logical(ctx: &SecurityContext, entity_type: &EntityType, stored: &StoredProperties) -> PropertyMap {
        let mut names: Vec<&String> = stored.keys().collect();
        names.sort();

        let mut map = PropertyMap::with_capacity(names.len());
        for name in names {
            let key = match entity_type.key_by_db_name(name) {
                Some(k) => k.clone(),
                None => generic_key(name),
            };
            let value = Self::database_value_to_logical(ctx, &key, None, stored[name].clone());
            map.put(&key, value);
        }
        map
    }

    /// Logical map → stored properties keyed by database name.
    pub fn logical_to_database(ctx: &SecurityContext, map: &PropertyMap) -> Result<StoredProperties> {
        let mut stored = StoredProperties::with_capacity(map.len());
        for (key, value) in map.iter() {
            let converted = Self::logical_value_to_database(ctx, key, None, value.clone())?;
            stored.insert(key.db_name().to_owned(), converted);
        }
        Ok(stored)
    }

    /// Input map keyed by JSON name → logical map, applying the unknown-key
    /// policy from settings.
    pub fn input_to_logical(
        ctx: &SecurityContext,
        entity_type: &EntityType,
        input: &BTreeMap<String, Value>,
    ) -> Result<PropertyMap> {
        let mut map = PropertyMap::with_capacity(input.len());
        for (name, value) in input {
            let Some(key) = resolve_input_key(ctx, entity_type, name)? else { continue };
            let logical = Self::input_value_to_logical(ctx, &key, value.clone())?;
            map.put(&key, logical);
        }
        Ok(map)
    }

    /// Like `input_to_logical` for a JSON object.
    pub fn input_json_to_logical(
        ctx: &SecurityContext,
        entity_type: &EntityType,
        json: &serde_json::Value,
    ) -> Result<PropertyMap> {
        match Value::from(json.clone()) {
            Value::Map(input) => Self::input_to_logical(ctx, entity_type, &input),
            other => Err(Error::BadRequest(format!("Expected a JSON object, got {}", other.type_name()))),
        }
    }

    /// Convert many input maps of the same type, creating each key's input
    /// converter only once.
    pub fn input_to_logical_batch<'a>(
        ctx: &'a SecurityContext,
        entity_type: &'a EntityType,
        inputs: &[BTreeMap<String, Value>],
    ) -> Result<Vec<PropertyMap>> {
        let mut converters: HashMap<&'a str, Option<Box<dyn PropertyConverter + 'a>>> = HashMap::new();
        let mut maps = Vec::with_capacity(inputs.len());

        for input in inputs {
            let mut map = PropertyMap::with_capacity(input.len());
            for (name, value) in input {
                if let Some(key) = entity_type.key(name) {
                    let converter = converters
                        .entry(key.json_name())
                        .or_insert_with(|| key.input_converter(ctx));
                    let logical = convert_with(converter.as_deref(), value.clone())?;
                    map.put(key, logical);
                } else if let Some(key) = resolve_input_key(ctx, entity_type, name)? {
                    let logical = Self::input_value_to_logical(ctx, &key, value.clone())?;
                    map.put(&key, logical);
                }
            }
            maps.push(map);
        }

        debug!(count = maps.len(), converters = converters.len(), "converted input batch");
        Ok(maps)
    }

    /// Logical map → JSON object, skipping keys with serialization disabled.
    pub fn logical_to_input(ctx: &SecurityContext, map: &PropertyMap) -> Result<serde_json::Map<String, serde_json::Value>> {
        let mut out = serde_json::Map::new();
        for (key, value) in map.iter() {
            if key.flags().serialization_disabled {
                continue;
            }
            let output = Self::logical_value_to_input(ctx, key, value.clone())?;
            out.insert(key.json_name().to_owned(), output.to_json());
        }
        Ok(out)
    }
}

fn generic_key(name: &str) -> KeyRef {
    GenericProperty::new(name).dynamic().build()
}

fn resolve_input_key(ctx: &SecurityContext, entity_type: &EntityType, name: &str) -> Result<Option<KeyRef>> {
    if let Some(key) = entity_type.key(name) {
        return Ok(Some(key.clone()));
    }
    match ctx.settings().unknown_keys {
        UnknownKeyPolicy::Generic => Ok(Some(generic_key(name))),
        UnknownKeyPolicy::Ignore => {
            debug!(property = name, type_name = entity_type.name(), "ignoring unknown input key");
            Ok(None)
        }
        UnknownKeyPolicy::Reject => Err(Error::BadRequest(format!(
            "Unknown property {name} for type {}",
            entity_type.name()
        ))),
    }
}

impl PartialEq for PropertyMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl FromIterator<(KeyRef, Value)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (KeyRef, Value)>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for (k, v) in iter {
            map.put(&k, v);
        }
        map
    }
}

impl IntoIterator for PropertyMap {
    type Item = (KeyRef, Value);
    type IntoIter = std::vec::IntoIter<(KeyRef, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
