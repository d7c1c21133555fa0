//! Traversal and linking for one side of a relation.

use std::collections::HashSet;

use tracing::debug;

use crate::context::SecurityContext;
use crate::model::{Direction, NodeId, StoredProperties, Value};
use crate::object::GraphObject;
use crate::property::key::Predicate;
use crate::property::keys;
use crate::property::PropertyKey;
use crate::{Error, Result};

use super::relation::Relation;

/// Which side of the relation a key reads and how many entities it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// The single target reached from a source.
    OneEndpoint,
    /// All targets reached from a source.
    ManyEndpoint,
    /// The single source pointing at a target.
    OneStartpoint,
    /// All sources pointing at a target.
    ManyStartpoint,
}

impl EndpointKind {
    pub fn direction(self) -> Direction {
        match self {
            EndpointKind::OneEndpoint | EndpointKind::ManyEndpoint => Direction::Outgoing,
            EndpointKind::OneStartpoint | EndpointKind::ManyStartpoint => Direction::Incoming,
        }
    }

    pub fn is_many(self) -> bool {
        matches!(self, EndpointKind::ManyEndpoint | EndpointKind::ManyStartpoint)
    }
}

pub(crate) struct Endpoint<'a> {
    pub kind: EndpointKind,
    pub relation: &'a Relation,
}

impl Endpoint<'_> {
    fn outgoing(&self) -> bool {
        self.kind.direction() == Direction::Outgoing
    }

    /// Whether the entities on the far side may have only one partner.
    fn far_side_single(&self) -> bool {
        if self.outgoing() {
            self.relation.cardinality.single_source()
        } else {
            self.relation.cardinality.single_target()
        }
    }

    /// Related nodes in relationship creation order, filtered by `predicate`.
    pub fn related(&self, obj: &GraphObject, predicate: Option<Predicate<'_>>) -> Vec<GraphObject> {
        let Some(node) = obj.node_id() else { return Vec::new() };
        let store = obj.store();
        store
            .get_relationships(node, self.kind.direction(), Some(&self.relation.rel_type))
            .into_iter()
            .map(|rel| if self.outgoing() { rel.dst } else { rel.src })
            .map(|id| GraphObject::node(store.clone(), id))
            .filter(|other| predicate.is_none_or(|p| p(other)))
            .collect()
    }

    /// Replace the linked set with `targets`. Removed links are deleted;
    /// new links displace conflicting links of single-valued far sides.
    pub fn set(&self, ctx: &SecurityContext, obj: &GraphObject, targets: &[GraphObject]) -> Result<()> {
        ctx.require_write_tx()?;
        let node = obj.node_id().ok_or_else(|| Error::TypeError {
            expected: "node".into(),
            got: obj.id().to_string(),
        })?;
        if !self.kind.is_many() && targets.len() > 1 {
            return Err(Error::BadRequest(format!(
                "{} accepts a single entity, got {}",
                self.relation.rel_type,
                targets.len()
            )));
        }

        let store = obj.store();
        let rel_type = self.relation.rel_type.as_str();
        let wanted: HashSet<NodeId> = targets.iter().filter_map(GraphObject::node_id).collect();
        let mut linked = HashSet::new();

        for rel in store.get_relationships(node, self.kind.direction(), Some(rel_type)) {
            let other = if self.outgoing() { rel.dst } else { rel.src };
            if wanted.contains(&other) {
                linked.insert(other);
            } else {
                store.delete_relationship(rel.id)?;
                debug!(rel = %rel.id, rel_type, "unlinked");
            }
        }

        for target in targets {
            let Some(other) = target.node_id() else { continue };
            if !linked.insert(other) {
                continue;
            }
            if self.far_side_single() {
                let far_direction = if self.outgoing() { Direction::Incoming } else { Direction::Outgoing };
                for rel in store.get_relationships(other, far_direction, Some(rel_type)) {
                    store.delete_relationship(rel.id)?;
                    debug!(rel = %rel.id, rel_type, "displaced by cardinality");
                }
            }
            let (src, dst) = if self.outgoing() { (node, other) } else { (other, node) };
            let rel_id = store.create_relationship(src, dst, rel_type, StoredProperties::new())?;
            let rel = GraphObject::relationship(store.clone(), rel_id);
            rel.unlock_read_only_properties_once();
            rel.unlock_system_properties_once();
            keys::ID.set_property(ctx, &rel, Value::String(keys::generate_uuid()))?;
            debug!(rel = %rel_id, rel_type, "linked");
        }
        Ok(())
    }
}
