//! The read, write and search-parsing pipeline shared by every key.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tracing::{debug, warn};

use crate::context::SecurityContext;
use crate::model::{EntityId, Value};
use crate::object::GraphObject;
use crate::storage::PropertyContainer;
use crate::{Error, Result};

use super::converter::convert_with;
use super::key::{KeyRef, PropertyKey};
use super::keys;
use super::search::{Occurrence, QueryGroup, SearchAttribute};

static RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(.*) TO (.*)\]$").expect("valid range regex"));

/// Declaring type for messages: the key's own, else the entity's stored type.
pub(crate) fn declaring_label<K: PropertyKey + ?Sized>(key: &K, obj: &GraphObject) -> String {
    key.declaring_type()
        .map(str::to_owned)
        .or_else(|| obj.type_name())
        .unwrap_or_default()
}

pub(crate) fn read_only_error<K: PropertyKey + ?Sized>(key: &K, obj: &GraphObject) -> Error {
    Error::ReadOnlyProperty {
        declaring_type: declaring_label(key, obj),
        property: key.json_name().to_owned(),
    }
}

// ============================================================================
// Read
// ============================================================================

pub(crate) fn read<K: PropertyKey + ?Sized>(
    key: &K,
    ctx: &SecurityContext,
    obj: &GraphObject,
    apply_converter: bool,
) -> Value {
    let mut value = obj.get_property(key.db_name()).unwrap_or(Value::Null);

    if apply_converter {
        if !value.is_null() && !key.accepts_stored(&value) {
            value = key.fix_database_property(ctx, Some(obj), value);
        }
        if let Some(converter) = key.database_converter(ctx, Some(obj)) {
            value = match converter.revert(value.clone()) {
                Ok(converted) => converted,
                Err(e) => {
                    warn!(
                        property = key.json_name(),
                        entity = %obj.id(),
                        error = %e,
                        "unable to convert stored value, using raw value"
                    );
                    value
                }
            };
        }
    }

    for t in &key.config().transformators {
        value = t.on_read(ctx, obj, value);
    }

    if value.is_null() { key.default_value() } else { value }
}

/// Persist a repaired stored value when an entity and a write transaction
/// are available. Failures are logged only.
pub(crate) fn persist_fix<K: PropertyKey + ?Sized>(
    key: &K,
    ctx: &SecurityContext,
    entity: Option<&GraphObject>,
    fixed: &Value,
) {
    let Some(obj) = entity else { return };
    if ctx.require_write_tx().is_err() {
        debug!(property = key.json_name(), entity = %obj.id(), "not persisting repaired value outside a write transaction");
        return;
    }
    let result = if fixed.is_null() {
        obj.remove_property(key.db_name())
    } else {
        obj.set_property(key.db_name(), fixed.clone())
    };
    match result {
        Ok(()) => debug!(property = key.json_name(), entity = %obj.id(), "repaired stored value"),
        Err(e) => warn!(property = key.json_name(), entity = %obj.id(), error = %e, "unable to persist repaired value"),
    }
}

// ============================================================================
// Write
// ============================================================================

pub(crate) fn write<K: PropertyKey + ?Sized>(
    key: &K,
    ctx: &SecurityContext,
    obj: &GraphObject,
    value: Value,
) -> Result<Option<Value>> {
    let read_only_unlocked = obj.read_only_properties_unlocked();
    let system_unlocked = obj.system_properties_unlocked();
    obj.relock();

    if key.is_read_only() && !read_only_unlocked {
        return Err(read_only_error(key, obj));
    }

    let tx = ctx.require_write_tx()?;

    if key.is_system_internal() && !system_unlocked {
        warn!(
            property = key.json_name(),
            entity = %obj.id(),
            "ignoring write to system-internal property without unlock"
        );
        return Ok(None);
    }

    let previous = obj.get_property(key.db_name()).unwrap_or(Value::Null);

    if key.is_write_once() && !read_only_unlocked && !previous.is_null() {
        return Err(Error::WriteOnceViolation {
            declaring_type: declaring_label(key, obj),
            property: key.json_name().to_owned(),
        });
    }

    let mut logical = value;
    for t in &key.config().transformators {
        logical = t.on_write(ctx, obj, logical)?;
    }

    let stored = convert_with(key.database_converter(ctx, Some(obj)).as_deref(), logical.clone())?;

    if !key.is_unvalidated() {
        let queue = tx.modifications();
        match obj.id() {
            EntityId::Node(id) => queue.node_modified(ctx.user_id(), id, key.db_name(), previous.clone(), stored.clone()),
            EntityId::Relationship(id) => {
                queue.relationship_modified(ctx.user_id(), id, key.db_name(), previous.clone(), stored.clone())
            }
        }
    }

    if stored.is_null() {
        obj.remove_property(key.db_name())?;
    } else {
        obj.set_property(key.db_name(), stored)?;
    }

    update_modification_info(ctx, obj);

    if let Some(callback) = &key.config().update_callback {
        callback.property_updated(ctx, obj, &logical)?;
    }

    Ok((!previous.is_null()).then_some(previous))
}

/// Stamp last-modified date and user. Never fails the write.
pub(crate) fn update_modification_info(ctx: &SecurityContext, obj: &GraphObject) {
    if !ctx.does_access_time_tracking() {
        return;
    }
    let now = Value::Long(Utc::now().timestamp_millis());
    if let Err(e) = obj.set_property(keys::LAST_MODIFIED_DATE_DB_NAME, now) {
        warn!(entity = %obj.id(), error = %e, "unable to update last modified date");
    }
    if let Some(user) = ctx.user_id() {
        if let Err(e) = obj.set_property(keys::LAST_MODIFIED_BY_DB_NAME, Value::from(user)) {
            warn!(entity = %obj.id(), error = %e, "unable to update last modifying user");
        }
    }
}

// ============================================================================
// Search parameter parsing
// ============================================================================

/// Parse one raw request parameter into constraints:
///
/// - blank → `Empty`
/// - `[]` → `NotBlank`, only for keys indexed when empty
/// - `[A TO B]` → `Range`, an empty bound is open
/// - `a,b;c` → client error
/// - `a;b` → OR-group (or one optional value without multi-value split)
/// - `a,b` → AND-group
/// - anything else → one required value
pub(crate) fn determine_search_type(
    key: &KeyRef,
    ctx: &SecurityContext,
    raw: &str,
    exact: bool,
    query: &mut QueryGroup,
) -> Result<()> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        query.push(SearchAttribute::Empty { key: key.clone(), occur: Occurrence::Required });
        return Ok(());
    }

    if trimmed == "[]" {
        if !key.flags().indexed_when_empty {
            return Err(Error::BadRequest(format!(
                "Property {} is not indexed when empty, cannot search for non-empty values",
                key.json_name()
            )));
        }
        query.push(SearchAttribute::NotBlank { key: key.clone(), occur: Occurrence::Required });
        return Ok(());
    }

    if let Some(caps) = RANGE.captures(trimmed) {
        let bound = |s: &str| -> Result<Option<Value>> {
            let s = s.trim();
            if s.is_empty() { Ok(None) } else { key.convert_search_value(ctx, s).map(Some) }
        };
        let from = bound(&caps[1])?;
        let to = bound(&caps[2])?;
        query.push(SearchAttribute::Range { key: key.clone(), from, to, occur: Occurrence::Required });
        return Ok(());
    }

    let has_and = trimmed.contains(',');
    let has_or = trimmed.contains(';');

    if has_and && has_or {
        return Err(Error::BadRequest(format!(
            "Mixing AND (,) and OR (;) in one value is not supported for property {}",
            key.json_name()
        )));
    }

    if has_or {
        if key.allows_multi_value_split() {
            let group = split_group(key, ctx, trimmed, ';', Occurrence::Optional, exact)?;
            query.push(group);
        } else {
            let value = key.convert_search_value(ctx, trimmed)?;
            query.push(key.get_search_attribute(ctx, Occurrence::Optional, value, exact));
        }
        return Ok(());
    }

    if has_and {
        let group = split_group(key, ctx, trimmed, ',', Occurrence::Required, exact)?;
        query.push(group);
        return Ok(());
    }

    let value = key.convert_search_value(ctx, trimmed)?;
    query.push(key.get_search_attribute(ctx, Occurrence::Required, value, exact));
    Ok(())
}

fn split_group(
    key: &KeyRef,
    ctx: &SecurityContext,
    raw: &str,
    separator: char,
    member: Occurrence,
    exact: bool,
) -> Result<SearchAttribute> {
    let mut attributes = Vec::new();
    for part in raw.split(separator).map(str::trim).filter(|p| !p.is_empty()) {
        let value = key.convert_search_value(ctx, part)?;
        attributes.push(key.get_search_attribute(ctx, member, value, exact));
    }
    Ok(SearchAttribute::Group { occur: Occurrence::Required, attributes })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::context::Services;
    use crate::property::{IntegerProperty, PropertyBuilder, StringProperty};

    fn ctx() -> SecurityContext {
        SecurityContext::super_user(Services::builder().build())
    }

    fn parse(key: &KeyRef, raw: &str) -> Result<QueryGroup> {
        let mut q = QueryGroup::new();
        key.determine_search_type(&ctx(), raw, true, &mut q)?;
        Ok(q)
    }

    #[test]
    fn test_range() {
        let key = IntegerProperty::new("age").build();
        let q = parse(&key, "[5 TO 10]").unwrap();
        assert_eq!(
            q.attributes(),
            &[SearchAttribute::Range {
                key: key.clone(),
                from: Some(Value::Int(5)),
                to: Some(Value::Int(10)),
                occur: Occurrence::Required,
            }]
        );
    }

    #[test]
    fn test_open_range() {
        let key = IntegerProperty::new("age").build();
        let q = parse(&key, "[ TO 10]").unwrap();
        assert!(matches!(&q.attributes()[0], SearchAttribute::Range { from: None, to: Some(Value::Int(10)), .. }));
    }

    #[test]
    fn test_not_blank_requires_indexed_when_empty() {
        let plain = StringProperty::new("name").build();
        assert!(matches!(parse(&plain, "[]"), Err(Error::BadRequest(_))));

        let key = StringProperty::new("name").indexed_when_empty().build();
        let q = parse(&key, "[]").unwrap();
        assert!(matches!(&q.attributes()[0], SearchAttribute::NotBlank { .. }));
    }

    #[test]
    fn test_and_or_groups() {
        let key = StringProperty::new("name").build();
        let and = parse(&key, "a,b").unwrap();
        assert_eq!(and.len(), 1);
        assert!(and.attributes()[0].is_and_group());

        let or = parse(&key, "a;b").unwrap();
        assert!(or.attributes()[0].is_or_group());
        if let SearchAttribute::Group { attributes, .. } = &or.attributes()[0] {
            assert_eq!(attributes.len(), 2);
        }
    }

    #[test]
    fn test_mixing_is_client_error() {
        let key = StringProperty::new("name").build();
        let err = parse(&key, "a,b;c").unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_number_error_surfaces() {
        let key = IntegerProperty::new("age").declared_by("Person").build();
        let err = parse(&key, "abc").unwrap_err();
        assert!(matches!(err, Error::NumberFormat { .. }));
        assert!(err.to_string().contains("Person"));
    }
}
