//! How a related entity looks on read and how input is resolved to one on
//! write.

use std::collections::BTreeMap;

use tracing::debug;

use crate::context::SecurityContext;
use crate::model::Value;
use crate::object::GraphObject;
use crate::property::key::KeyRef;
use crate::property::keys::{self, ID_DB_NAME};
use crate::property::map::PropertyMap;
use crate::{Error, Result};

/// Read-side projection of a related entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Notion {
    /// The entity reference itself.
    #[default]
    Object,
    /// One key of the entity, e.g. its id.
    Property(KeyRef),
    /// A nested object with the given keys.
    Map(Vec<KeyRef>),
}

impl Notion {
    /// Collapse to the entity uuid.
    pub fn id() -> Self {
        Notion::Property(keys::ID.clone())
    }

    pub fn project(&self, ctx: &SecurityContext, obj: &GraphObject) -> Value {
        match self {
            Notion::Object => obj.node_id().map_or(Value::Null, Value::Node),
            Notion::Property(key) => key.get_property(ctx, obj, true, None),
            Notion::Map(keys) => Value::Map(
                keys.iter()
                    .map(|k| (k.json_name().to_owned(), k.get_property(ctx, obj, true, None)))
                    .collect::<BTreeMap<_, _>>(),
            ),
        }
    }
}

fn find_by_uuid(owner: &GraphObject, uuid: &str) -> Option<GraphObject> {
    owner
        .store()
        .find_node(ID_DB_NAME, &Value::from(uuid))
        .map(|id| GraphObject::node(owner.store().clone(), id))
}

/// Resolve an input value to the entity it names.
///
/// Accepts a node reference, a uuid string, or an object carrying `id`.
/// An object that names no existing entity creates one of `target_type`
/// when `autocreate` is set.
pub(crate) fn resolve(
    ctx: &SecurityContext,
    owner: &GraphObject,
    target_type: &str,
    autocreate: bool,
    value: &Value,
) -> Result<Option<GraphObject>> {
    match value {
        Value::Null => Ok(None),
        Value::Node(id) => {
            let obj = GraphObject::node(owner.store().clone(), *id);
            if obj.exists() { Ok(Some(obj)) } else { Err(Error::NotFound(format!("Node {id}"))) }
        }
        Value::String(uuid) if uuid.trim().is_empty() => Ok(None),
        Value::String(uuid) => find_by_uuid(owner, uuid.trim())
            .map(Some)
            .ok_or_else(|| Error::NotFound(format!("{target_type} with id {uuid}"))),
        Value::Map(fields) => {
            let uuid = fields.get(ID_DB_NAME).and_then(Value::as_str);
            if let Some(found) = uuid.and_then(|u| find_by_uuid(owner, u)) {
                return Ok(Some(found));
            }
            if !autocreate {
                return Err(Error::NotFound(format!(
                    "{target_type} with id {}",
                    uuid.unwrap_or("<none>")
                )));
            }
            let entity_type = ctx
                .schema()
                .get(target_type)
                .ok_or_else(|| Error::NotFound(format!("Type {target_type}")))?;
            let props = PropertyMap::input_to_logical(ctx, entity_type, fields)?;
            let created = GraphObject::create(ctx, owner.store().clone(), target_type, props)?;
            debug!(entity = %created.id(), target_type, "created related entity");
            Ok(Some(created))
        }
        other => Err(Error::TypeError {
            expected: format!("{target_type} reference"),
            got: other.type_name().to_owned(),
        }),
    }
}
