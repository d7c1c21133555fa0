//! Keys every entity carries.

use std::sync::LazyLock;

use super::key::KeyRef;
use super::config::PropertyBuilder;
use super::primitive::{DateProperty, StringProperty};
use super::structural::{RelationshipTypeProperty, TypeProperty, UuidProperty};

pub const ID_DB_NAME: &str = "id";
pub const TYPE_DB_NAME: &str = "type";
pub const LAST_MODIFIED_DATE_DB_NAME: &str = "lastModifiedDate";
pub const LAST_MODIFIED_BY_DB_NAME: &str = "lastModifiedBy";

pub static ID: LazyLock<KeyRef> = LazyLock::new(|| UuidProperty::new().build());

pub static TYPE: LazyLock<KeyRef> = LazyLock::new(|| TypeProperty::new().build());

pub static REL_TYPE: LazyLock<KeyRef> = LazyLock::new(|| RelationshipTypeProperty::new().build());

pub static CREATED_DATE: LazyLock<KeyRef> = LazyLock::new(|| {
    DateProperty::new("createdDate")
        .indexed()
        .read_only()
        .write_once()
        .unvalidated()
        .build()
});

pub static LAST_MODIFIED_DATE: LazyLock<KeyRef> = LazyLock::new(|| {
    DateProperty::new(LAST_MODIFIED_DATE_DB_NAME)
        .indexed_passively()
        .read_only()
        .unvalidated()
        .build()
});

pub static LAST_MODIFIED_BY: LazyLock<KeyRef> = LazyLock::new(|| {
    StringProperty::new(LAST_MODIFIED_BY_DB_NAME).read_only().unvalidated().build()
});

pub fn node_base_keys() -> Vec<KeyRef> {
    vec![
        ID.clone(),
        TYPE.clone(),
        CREATED_DATE.clone(),
        LAST_MODIFIED_DATE.clone(),
        LAST_MODIFIED_BY.clone(),
    ]
}

pub fn relationship_base_keys() -> Vec<KeyRef> {
    let mut keys = node_base_keys();
    keys.push(REL_TYPE.clone());
    keys
}

/// A new uuid in the 32-hex-digit form stored under `id`.
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_uuid_shape() {
        let id = generate_uuid();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_uuid());
    }

    #[test]
    fn test_base_key_flags() {
        assert!(ID.is_read_only());
        assert!(ID.is_system_internal());
        assert!(ID.is_write_once());
        assert!(TYPE.is_read_only());
        assert!(REL_TYPE.is_read_only());
        assert_eq!(relationship_base_keys().len(), node_base_keys().len() + 1);
    }
}
