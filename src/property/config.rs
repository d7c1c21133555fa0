//! Key configuration and the builder every key type shares.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::model::Value;
use crate::{Error, Result};

use super::key::{KeyRef, PropertyKey};
use super::transform::{PropertyUpdateCallback, Transformator, TransformatorRegistry};

/// Independent boolean switches of a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropertyFlags {
    pub read_only: bool,
    pub system_internal: bool,
    pub write_once: bool,
    pub unvalidated: bool,
    pub indexed: bool,
    pub indexed_passively: bool,
    pub indexed_when_empty: bool,
    pub fulltext_indexed: bool,
    pub compound: bool,
    pub unique: bool,
    pub not_null: bool,
    pub dynamic: bool,
    pub caching_enabled: bool,
    pub node_index_only: bool,
    pub is_abstract: bool,
    pub serialization_disabled: bool,
}

/// Everything a key is configured with before it is frozen.
#[derive(Clone)]
pub struct PropertyConfig {
    pub json_name: String,
    pub db_name: String,
    pub default_value: Value,
    pub format: Option<String>,
    pub type_hint: Option<String>,
    pub declaring_type: Option<String>,
    pub description: Option<String>,
    pub flags: PropertyFlags,
    pub transformators: Vec<Arc<dyn Transformator>>,
    pub update_callback: Option<Arc<dyn PropertyUpdateCallback>>,
}

impl PropertyConfig {
    pub fn new(json_name: impl Into<String>) -> Self {
        let json_name = json_name.into();
        Self {
            db_name: json_name.clone(),
            json_name,
            default_value: Value::Null,
            format: None,
            type_hint: None,
            declaring_type: None,
            description: None,
            flags: PropertyFlags::default(),
            transformators: Vec::new(),
            update_callback: None,
        }
    }

    /// Declaring type for messages, empty when the key was never declared.
    pub fn declaring_label(&self) -> &str {
        self.declaring_type.as_deref().unwrap_or_default()
    }

    pub fn number_error(&self, value: &Value, expected: &'static str) -> Error {
        Error::NumberFormat {
            declaring_type: self.declaring_label().to_owned(),
            property: self.json_name.clone(),
            value: value.to_text(),
            expected,
        }
    }

    pub fn date_error(&self, value: &Value, format: &str) -> Error {
        Error::DateFormat {
            declaring_type: self.declaring_label().to_owned(),
            property: self.json_name.clone(),
            value: value.to_text(),
            format: format.to_owned(),
        }
    }

    pub fn read_only_error(&self) -> Error {
        Error::ReadOnlyProperty {
            declaring_type: self.declaring_label().to_owned(),
            property: self.json_name.clone(),
        }
    }
}

impl fmt::Debug for PropertyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyConfig")
            .field("json_name", &self.json_name)
            .field("db_name", &self.db_name)
            .field("default_value", &self.default_value)
            .field("format", &self.format)
            .field("declaring_type", &self.declaring_type)
            .field("flags", &self.flags)
            .field("transformators", &self.transformators)
            .field("update_callback", &self.update_callback.is_some())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder-style configuration shared by all key types.
///
/// Every method consumes and returns the key, and `build()` freezes it into
/// a shareable [`KeyRef`]. Nothing can be reconfigured after that.
pub trait PropertyBuilder: Sized {
    fn config_mut(&mut self) -> &mut PropertyConfig;

    fn with_flags(mut self, f: impl FnOnce(&mut PropertyFlags)) -> Self {
        f(&mut self.config_mut().flags);
        self
    }

    fn indexed(self) -> Self { self.with_flags(|f| f.indexed = true) }

    fn unique(self) -> Self {
        self.with_flags(|f| {
            f.unique = true;
            f.indexed = true;
        })
    }

    fn compound(self) -> Self { self.with_flags(|f| f.compound = true) }
    fn read_only(self) -> Self { self.with_flags(|f| f.read_only = true) }
    fn write_once(self) -> Self { self.with_flags(|f| f.write_once = true) }
    fn system_internal(self) -> Self { self.with_flags(|f| f.system_internal = true) }
    fn unvalidated(self) -> Self { self.with_flags(|f| f.unvalidated = true) }

    fn indexed_passively(self) -> Self {
        self.with_flags(|f| {
            f.indexed = true;
            f.indexed_passively = true;
        })
    }

    /// Index null values too, which enables the `[]` not-blank search.
    fn indexed_when_empty(self) -> Self {
        self.with_flags(|f| {
            f.indexed = true;
            f.indexed_when_empty = true;
        })
    }

    fn fulltext_indexed(self) -> Self { self.with_flags(|f| f.fulltext_indexed = true) }
    fn not_null(self) -> Self { self.with_flags(|f| f.not_null = true) }
    fn dynamic(self) -> Self { self.with_flags(|f| f.dynamic = true) }
    fn caching_enabled(self) -> Self { self.with_flags(|f| f.caching_enabled = true) }
    fn node_index_only(self) -> Self { self.with_flags(|f| f.node_index_only = true) }
    fn set_abstract(self) -> Self { self.with_flags(|f| f.is_abstract = true) }
    fn disable_serialization(self) -> Self { self.with_flags(|f| f.serialization_disabled = true) }

    fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.config_mut().db_name = db_name.into();
        self
    }

    fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.config_mut().default_value = value.into();
        self
    }

    fn with_format(mut self, format: impl Into<String>) -> Self {
        self.config_mut().format = Some(format.into());
        self
    }

    fn with_type_hint(mut self, hint: impl Into<String>) -> Self {
        self.config_mut().type_hint = Some(hint.into());
        self
    }

    fn with_description(mut self, description: impl Into<String>) -> Self {
        self.config_mut().description = Some(description.into());
        self
    }

    fn declared_by(mut self, type_name: impl Into<String>) -> Self {
        self.config_mut().declaring_type = Some(type_name.into());
        self
    }

    fn transformator(mut self, t: Arc<dyn Transformator>) -> Self {
        self.config_mut().transformators.push(t);
        self
    }

    /// Attach transformators by name; fails on the first unknown name.
    fn try_transformators<'n>(
        mut self,
        registry: &TransformatorRegistry,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Self> {
        for name in names {
            let t = registry.resolve(name)?;
            self.config_mut().transformators.push(t);
        }
        Ok(self)
    }

    fn on_update(mut self, callback: impl PropertyUpdateCallback + 'static) -> Self {
        self.config_mut().update_callback = Some(Arc::new(callback));
        self
    }

    fn build(self) -> KeyRef
    where
        Self: PropertyKey + 'static,
    {
        KeyRef::new(self)
    }
}

/// Implements [`PropertyBuilder`] for a key struct with a `config` field.
macro_rules! impl_builder {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::property::PropertyBuilder for $ty {
                fn config_mut(&mut self) -> &mut $crate::property::PropertyConfig {
                    &mut self.config
                }
            }
        )+
    };
}

pub(crate) use impl_builder;
