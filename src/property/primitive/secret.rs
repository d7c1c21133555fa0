//! Keys whose stored form must not reveal the value: encrypted strings and
//! salted password hashes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::context::SecurityContext;
use crate::model::{Value, ValueType};
use crate::object::GraphObject;
use crate::property::base;
use crate::property::config::{impl_builder, PropertyConfig};
use crate::property::converter::PropertyConverter;
use crate::property::key::PropertyKey;
use crate::property::keys;
use crate::settings::PasswordPolicy;
use crate::storage::PropertyContainer;
use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 16;
const BLOCK_LEN: usize = 32;

// ============================================================================
// Encrypted string
// ============================================================================

fn mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Configuration(format!("invalid encryption secret: {e}")))
}

/// XOR `data` in place with an HMAC-derived keystream.
fn apply_keystream(secret: &str, nonce: &[u8], data: &mut [u8]) -> Result<()> {
    for (block, chunk) in data.chunks_mut(BLOCK_LEN).enumerate() {
        let mut m = mac(secret)?;
        m.update(b"stream");
        m.update(nonce);
        m.update(&(block as u64).to_be_bytes());
        let stream = m.finalize().into_bytes();
        for (byte, k) in chunk.iter_mut().zip(stream.iter()) {
            *byte ^= k;
        }
    }
    Ok(())
}

fn tag(secret: &str, nonce: &[u8], ciphertext: &[u8]) -> Result<HmacSha256> {
    let mut m = mac(secret)?;
    m.update(b"tag");
    m.update(nonce);
    m.update(ciphertext);
    Ok(m)
}

/// `base64(nonce || ciphertext || tag)`.
pub(crate) fn encrypt(secret: &str, plaintext: &str) -> Result<String> {
    let nonce = uuid::Uuid::new_v4().into_bytes();
    let mut data = plaintext.as_bytes().to_vec();
    apply_keystream(secret, &nonce, &mut data)?;
    let t = tag(secret, &nonce, &data)?.finalize().into_bytes();

    let mut out = Vec::with_capacity(NONCE_LEN + data.len() + TAG_LEN);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&data);
    out.extend_from_slice(&t[..TAG_LEN]);
    Ok(STANDARD.encode(out))
}

/// `None` when the text is malformed or was produced with another secret.
pub(crate) fn decrypt(secret: &str, encoded: &str) -> Option<String> {
    let raw = STANDARD.decode(encoded.trim()).ok()?;
    if raw.len() < NONCE_LEN + TAG_LEN {
        return None;
    }
    let (nonce, rest) = raw.split_at(NONCE_LEN);
    let (ciphertext, expected) = rest.split_at(rest.len() - TAG_LEN);
    tag(secret, nonce, ciphertext).ok()?.verify_truncated_left(expected).ok()?;

    let mut data = ciphertext.to_vec();
    apply_keystream(secret, nonce, &mut data).ok()?;
    String::from_utf8(data).ok()
}

/// String key encrypted with the configured secret at the storage boundary.
/// Reads that cannot be decrypted yield null.
#[derive(Debug, Clone)]
pub struct EncryptedStringProperty {
    config: PropertyConfig,
}

impl EncryptedStringProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { config: PropertyConfig::new(name) }
    }
}

struct EncryptionConverter<'a> {
    config: &'a PropertyConfig,
    secret: Option<&'a str>,
}

impl PropertyConverter for EncryptionConverter<'_> {
    fn convert(&self, source: Value) -> Result<Value> {
        if source.is_null() {
            return Ok(Value::Null);
        }
        let secret = self.secret.ok_or_else(|| {
            Error::Configuration(format!(
                "no encryption secret configured, cannot store property {}",
                self.config.json_name
            ))
        })?;
        Ok(Value::String(encrypt(secret, &source.to_text())?))
    }

    fn revert(&self, source: Value) -> Result<Value> {
        let Value::String(encoded) = &source else { return Ok(source) };
        let Some(secret) = self.secret else {
            warn!(property = %self.config.json_name, "no encryption secret configured, cannot decrypt");
            return Ok(Value::Null);
        };
        match decrypt(secret, encoded) {
            Some(plain) => Ok(Value::String(plain)),
            None => {
                warn!(property = %self.config.json_name, "unable to decrypt stored value");
                Ok(Value::Null)
            }
        }
    }
}

impl PropertyKey for EncryptedStringProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::String }

    fn database_converter<'a>(
        &'a self,
        ctx: &'a SecurityContext,
        _entity: Option<&'a GraphObject>,
    ) -> Option<Box<dyn PropertyConverter + 'a>> {
        Some(Box::new(EncryptionConverter {
            config: &self.config,
            secret: ctx.settings().encryption_secret.as_deref(),
        }))
    }

    fn accepts_stored(&self, value: &Value) -> bool {
        value.is_string()
    }
}

// ============================================================================
// Password
// ============================================================================

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// First rule the password breaks, if any.
fn policy_violation(policy: &PasswordPolicy, password: &str) -> Option<String> {
    if password.chars().count() < policy.min_length {
        return Some(format!("password must be at least {} characters long", policy.min_length));
    }
    if policy.require_uppercase && !password.chars().any(char::is_uppercase) {
        return Some("password must contain an uppercase letter".into());
    }
    if policy.require_lowercase && !password.chars().any(char::is_lowercase) {
        return Some("password must contain a lowercase letter".into());
    }
    if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("password must contain a digit".into());
    }
    if policy.require_non_alphanumeric && password.chars().all(char::is_alphanumeric) {
        return Some("password must contain a non-alphanumeric character".into());
    }
    None
}

/// Salted SHA-256 password hash. The salt is kept next to the hash under
/// `<db_name>Salt`. Never serialized.
#[derive(Debug, Clone)]
pub struct PasswordProperty {
    config: PropertyConfig,
}

impl PasswordProperty {
    pub fn new(name: impl Into<String>) -> Self {
        let mut config = PropertyConfig::new(name);
        config.flags.serialization_disabled = true;
        Self { config }
    }

    pub fn salt_db_name(&self) -> String {
        format!("{}Salt", self.config.db_name)
    }

    /// Whether `candidate` matches the stored hash.
    pub fn verify_password(&self, obj: &GraphObject, candidate: &str) -> bool {
        let hash = obj.get_property(&self.config.db_name);
        let salt = obj.get_property(&self.salt_db_name());
        match (hash, salt) {
            (Some(Value::String(hash)), Some(Value::String(salt))) => hash_password(&salt, candidate) == hash,
            _ => false,
        }
    }
}

impl PropertyKey for PasswordProperty {
    fn config(&self) -> &PropertyConfig { &self.config }
    fn value_type(&self) -> ValueType { ValueType::String }

    fn set_property(&self, ctx: &SecurityContext, obj: &GraphObject, value: Value) -> Result<Option<Value>> {
        let salt_name = self.salt_db_name();

        if value.is_blank() {
            let previous = base::write(self, ctx, obj, Value::Null)?;
            obj.remove_property(&salt_name)?;
            return Ok(previous);
        }

        let password = value.to_text();
        let policy = &ctx.settings().password_policy;
        if policy.enforce {
            if let Some(message) = policy_violation(policy, &password) {
                return Err(Error::Policy {
                    declaring_type: base::declaring_label(self, obj),
                    property: self.config.json_name.clone(),
                    message,
                });
            }
        }

        let salt = keys::generate_uuid();
        let hash = hash_password(&salt, &password);
        let previous = base::write(self, ctx, obj, Value::String(hash.clone()))?;

        // base::write may drop the value (system-internal without unlock)
        if obj.get_property(&self.config.db_name).as_ref().and_then(Value::as_str) == Some(hash.as_str()) {
            obj.set_property(&salt_name, Value::String(salt))?;
        } else {
            debug!(property = %self.config.json_name, entity = %obj.id(), "password not stored, salt left unchanged");
        }
        Ok(previous)
    }
}

impl_builder!(EncryptedStringProperty, PasswordProperty);
