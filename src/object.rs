//! Live handle to a node or relationship in a `GraphStore`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::context::SecurityContext;
use crate::model::*;
use crate::property::keys;
use crate::property::{PropertyKey, PropertyMap};
use crate::storage::{GraphStore, PropertyContainer};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct WriteUnlocks {
    read_only: AtomicBool,
    system: AtomicBool,
}

/// A node or relationship together with the store it lives in.
///
/// Handles are cheap to clone. Two handles are equal when they point at the
/// same entity. The one-shot unlock flags are shared between clones of a
/// handle but not between independently obtained handles.
#[derive(Clone)]
pub struct GraphObject {
    store: Arc<dyn GraphStore>,
    id: EntityId,
    unlocks: Arc<WriteUnlocks>,
}

impl GraphObject {
    pub fn node(store: Arc<dyn GraphStore>, id: NodeId) -> Self {
        Self::wrap(store, EntityId::Node(id))
    }

    pub fn relationship(store: Arc<dyn GraphStore>, id: RelId) -> Self {
        Self::wrap(store, EntityId::Relationship(id))
    }

    pub fn wrap(store: Arc<dyn GraphStore>, id: EntityId) -> Self {
        Self { store, id, unlocks: Arc::new(WriteUnlocks::default()) }
    }

    pub fn id(&self) -> EntityId { self.id }
    pub fn store(&self) -> &Arc<dyn GraphStore> { &self.store }

    pub fn node_id(&self) -> Option<NodeId> {
        match self.id {
            EntityId::Node(id) => Some(id),
            EntityId::Relationship(_) => None,
        }
    }

    pub fn rel_id(&self) -> Option<RelId> {
        match self.id {
            EntityId::Relationship(id) => Some(id),
            EntityId::Node(_) => None,
        }
    }

    pub fn is_node(&self) -> bool { self.node_id().is_some() }

    /// Stored uuid (the `id` key).
    pub fn uuid(&self) -> Option<String> {
        self.get_property(keys::ID_DB_NAME).and_then(|v| v.as_str().map(str::to_owned))
    }

    /// Stored type name (the `type` key).
    pub fn type_name(&self) -> Option<String> {
        self.get_property(keys::TYPE_DB_NAME).and_then(|v| v.as_str().map(str::to_owned))
    }

    pub fn labels(&self) -> Vec<String> {
        self.node_id().map(|id| self.store.node_labels(id)).unwrap_or_default()
    }

    /// Relationship type of the underlying relationship.
    pub fn rel_type(&self) -> Option<String> {
        self.rel_id().and_then(|id| self.store.get_relationship(id)).map(|r| r.rel_type)
    }

    pub fn start_node(&self) -> Option<GraphObject> {
        let rel = self.store.get_relationship(self.rel_id()?)?;
        Some(GraphObject::node(self.store.clone(), rel.src))
    }

    pub fn end_node(&self) -> Option<GraphObject> {
        let rel = self.store.get_relationship(self.rel_id()?)?;
        Some(GraphObject::node(self.store.clone(), rel.dst))
    }

    pub fn exists(&self) -> bool {
        match self.id {
            EntityId::Node(id) => self.store.get_node(id).is_some(),
            EntityId::Relationship(id) => self.store.get_relationship(id).is_some(),
        }
    }

    // ========================================================================
    // One-shot write unlocks
    // ========================================================================

    /// Allow the next write to bypass the read-only and write-once checks.
    pub fn unlock_read_only_properties_once(&self) {
        self.unlocks.read_only.store(true, Ordering::SeqCst);
    }

    /// Allow the next write to touch system-internal keys.
    pub fn unlock_system_properties_once(&self) {
        self.unlocks.system.store(true, Ordering::SeqCst);
    }

    pub fn read_only_properties_unlocked(&self) -> bool {
        self.unlocks.read_only.load(Ordering::SeqCst)
    }

    pub fn system_properties_unlocked(&self) -> bool {
        self.unlocks.system.load(Ordering::SeqCst)
    }

    /// Consume both unlocks; called once a write has run.
    pub(crate) fn relock(&self) {
        self.unlocks.read_only.store(false, Ordering::SeqCst);
        self.unlocks.system.store(false, Ordering::SeqCst);
    }

    // ========================================================================
    // Typed access
    // ========================================================================

    /// Read a key with its converter applied.
    pub fn get<K: PropertyKey + ?Sized>(&self, ctx: &SecurityContext, key: &K) -> Value {
        key.get_property(ctx, self, true, None)
    }

    /// Write a key through its converter.
    pub fn set<K: PropertyKey + ?Sized>(&self, ctx: &SecurityContext, key: &K, value: impl Into<Value>) -> Result<Option<Value>> {
        key.set_property(ctx, self, value.into())
    }

    /// Apply every entry of a logical property map, in map order.
    pub fn set_properties(&self, ctx: &SecurityContext, props: &PropertyMap) -> Result<()> {
        for (key, value) in props.iter() {
            key.set_property(ctx, self, value.clone())?;
        }
        Ok(())
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a node of a registered type.
    ///
    /// Writes the uuid (taken from `props` or generated) and the type with
    /// the one-shot unlocks, which also synchronizes labels, then applies the
    /// remaining properties in map order.
    pub fn create(
        ctx: &SecurityContext,
        store: Arc<dyn GraphStore>,
        type_name: &str,
        props: PropertyMap,
    ) -> Result<GraphObject> {
        let entity_type = ctx
            .schema()
            .get(type_name)
            .ok_or_else(|| Error::NotFound(format!("Type {type_name}")))?;
        if entity_type.is_relationship() {
            return Err(Error::TypeError { expected: "node type".into(), got: type_name.into() });
        }
        ctx.require_write_tx()?;

        let id = store.create_node(&[], StoredProperties::new())?;
        let obj = GraphObject::node(store, id);
        debug!(node = %id, type_name, "created node");
        obj.initialize(ctx, type_name, props)?;
        Ok(obj)
    }

    /// Create a relationship of a registered relationship type.
    pub fn create_relationship(
        ctx: &SecurityContext,
        store: Arc<dyn GraphStore>,
        type_name: &str,
        src: NodeId,
        dst: NodeId,
        props: PropertyMap,
    ) -> Result<GraphObject> {
        let entity_type = ctx
            .schema()
            .get(type_name)
            .ok_or_else(|| Error::NotFound(format!("Type {type_name}")))?;
        let rel_type = entity_type.rel_type().ok_or_else(|| Error::TypeError {
            expected: "relationship type".into(),
            got: type_name.into(),
        })?;
        ctx.require_write_tx()?;

        let id = store.create_relationship(src, dst, rel_type, StoredProperties::new())?;
        let obj = GraphObject::relationship(store, id);
        obj.initialize(ctx, type_name, props)?;
        Ok(obj)
    }

    fn initialize(&self, ctx: &SecurityContext, type_name: &str, mut props: PropertyMap) -> Result<()> {
        let uuid = props
            .remove(&keys::ID)
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(keys::generate_uuid);
        props.remove(&keys::TYPE);

        self.unlock_read_only_properties_once();
        self.unlock_system_properties_once();
        keys::ID.set_property(ctx, self, Value::String(uuid))?;

        self.unlock_read_only_properties_once();
        self.unlock_system_properties_once();
        keys::TYPE.set_property(ctx, self, Value::from(type_name))?;

        self.unlock_read_only_properties_once();
        self.unlock_system_properties_once();
        keys::CREATED_DATE.set_property(ctx, self, Value::Date(chrono::Utc::now()))?;

        self.set_properties(ctx, &props)
    }
}

impl PropertyContainer for GraphObject {
    fn get_property(&self, key: &str) -> Option<Value> {
        self.store.entity_property(self.id, key)
    }

    fn set_property(&self, key: &str, value: Value) -> Result<()> {
        self.store.set_entity_property(self.id, key, value)
    }

    fn remove_property(&self, key: &str) -> Result<()> {
        self.store.remove_entity_property(self.id, key)
    }
}

impl PartialEq for GraphObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GraphObject {}

impl fmt::Debug for GraphObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphObject").field("id", &self.id).finish()
    }
}
