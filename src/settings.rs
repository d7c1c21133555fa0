//! Process-wide configuration read by the property layer.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default pattern for date keys without an explicit format.
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd'T'HH:mm:ssZ";

/// What the input pipeline does with JSON keys the target type does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeyPolicy {
    /// Accept them as untyped dynamic properties.
    #[default]
    Generic,
    /// Drop them silently.
    Ignore,
    /// Fail the whole conversion.
    Reject,
}

/// Password complexity rules enforced on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub enforce: bool,
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            enforce: false,
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_non_alphanumeric: false,
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Java-style date pattern used when a date key has no format of its own.
    pub default_date_format: String,
    /// Keep NaN and infinite doubles instead of nulling them out.
    pub lenient_json: bool,
    pub unknown_keys: UnknownKeyPolicy,
    pub password_policy: PasswordPolicy,
    /// Secret for encrypted string keys. Encrypted keys fail to write without it.
    pub encryption_secret: Option<String>,
    /// Label kept on every node when types change.
    pub tenant_identifier: Option<String>,
    /// Whether writes stamp last-modified bookkeeping unless a context opts out.
    pub access_time_tracking: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_date_format: DEFAULT_DATE_FORMAT.to_owned(),
            lenient_json: false,
            unknown_keys: UnknownKeyPolicy::default(),
            password_policy: PasswordPolicy::default(),
            encryption_secret: None,
            tenant_identifier: None,
            access_time_tracking: true,
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.default_date_format.trim().is_empty() {
            return Err(Error::Configuration("default_date_format must not be empty".into()));
        }
        if let Some(secret) = &self.encryption_secret {
            if secret.is_empty() {
                return Err(Error::Configuration("encryption_secret must not be empty".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s = Settings::from_json(r#"{"lenient_json": true, "unknown_keys": "reject"}"#).unwrap();
        assert!(s.lenient_json);
        assert_eq!(s.unknown_keys, UnknownKeyPolicy::Reject);
        assert_eq!(s.default_date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(s.password_policy.min_length, 8);
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert!(Settings::from_json(r#"{"encryption_secret": ""}"#).is_err());
    }
}
