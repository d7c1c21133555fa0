//! Composable search constraints produced from request parameters.
//!
//! A request like `?age=[18 TO 65]&tags=a;b` becomes a [`QueryGroup`] of
//! [`SearchAttribute`]s. The index backend translates the tree into its own
//! query language; [`SearchAttribute::matches`] evaluates it in memory for
//! keys the index cannot answer and for scanning stores like `MemoryGraph`.

use serde::{Deserialize, Serialize};

use crate::context::SecurityContext;
use crate::model::Value;
use crate::object::GraphObject;
use crate::storage::GraphStore;
use std::cmp::Ordering;
use std::sync::Arc;

use super::key::KeyRef;
use super::related::ReferenceSource;

/// How a constraint takes part in its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occurrence {
    /// Must match (AND).
    Required,
    /// At least one optional constraint of a group must match (OR).
    Optional,
    /// Must not match (NOT).
    Forbidden,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchAttribute {
    /// Value equality (exact) or case-insensitive substring (inexact strings).
    Property { key: KeyRef, value: Value, occur: Occurrence, exact: bool },
    /// Inclusive range; a missing bound is open.
    Range { key: KeyRef, from: Option<Value>, to: Option<Value>, occur: Occurrence },
    /// Value is present and not blank (`[]`).
    NotBlank { key: KeyRef, occur: Occurrence },
    /// Value is absent or blank.
    Empty { key: KeyRef, occur: Occurrence },
    /// Array value contains the element.
    Array { key: KeyRef, value: Value, occur: Occurrence, exact: bool },
    /// Entity uuid equals the value.
    Uuid { value: String, occur: Occurrence },
    /// One of the related entities has the given uuid.
    Related { key: KeyRef, value: Value, occur: Occurrence },
    Group { occur: Occurrence, attributes: Vec<SearchAttribute> },
    /// Evaluated on the start node, the relationship or the end node of the
    /// searched relationship. Fails when that endpoint is missing.
    Endpoint { source: ReferenceSource, occur: Occurrence, attribute: Box<SearchAttribute> },
}

impl SearchAttribute {
    pub fn occur(&self) -> Occurrence {
        match self {
            SearchAttribute::Property { occur, .. }
            | SearchAttribute::Range { occur, .. }
            | SearchAttribute::NotBlank { occur, .. }
            | SearchAttribute::Empty { occur, .. }
            | SearchAttribute::Array { occur, .. }
            | SearchAttribute::Uuid { occur, .. }
            | SearchAttribute::Related { occur, .. }
            | SearchAttribute::Group { occur, .. }
            | SearchAttribute::Endpoint { occur, .. } => *occur,
        }
    }

    pub fn key(&self) -> Option<&KeyRef> {
        match self {
            SearchAttribute::Property { key, .. }
            | SearchAttribute::Range { key, .. }
            | SearchAttribute::NotBlank { key, .. }
            | SearchAttribute::Empty { key, .. }
            | SearchAttribute::Array { key, .. }
            | SearchAttribute::Related { key, .. } => Some(key),
            SearchAttribute::Uuid { .. } | SearchAttribute::Group { .. } | SearchAttribute::Endpoint { .. } => None,
        }
    }

    /// A group whose members are all required.
    pub fn is_and_group(&self) -> bool {
        matches!(self, SearchAttribute::Group { attributes, .. }
            if attributes.iter().all(|a| a.occur() == Occurrence::Required))
    }

    /// A group whose members are all optional.
    pub fn is_or_group(&self) -> bool {
        matches!(self, SearchAttribute::Group { attributes, .. }
            if attributes.iter().all(|a| a.occur() == Occurrence::Optional))
    }

    /// Evaluate against an entity, ignoring this attribute's own occurrence.
    pub fn matches(&self, ctx: &SecurityContext, obj: &GraphObject) -> bool {
        match self {
            SearchAttribute::Property { key, value, exact, .. } => {
                let actual = key.get_property(ctx, obj, true, None);
                match actual {
                    Value::List(items) => items.iter().any(|item| value_matches(item, value, *exact)),
                    other => value_matches(&other, value, *exact),
                }
            }
            SearchAttribute::Range { key, from, to, .. } => {
                let actual = key.get_property(ctx, obj, true, None);
                if actual.is_null() {
                    return false;
                }
                let above = from.as_ref().is_none_or(|f| {
                    matches!(actual.compare(f), Some(Ordering::Greater | Ordering::Equal))
                });
                let below = to.as_ref().is_none_or(|t| {
                    matches!(actual.compare(t), Some(Ordering::Less | Ordering::Equal))
                });
                above && below
            }
            SearchAttribute::NotBlank { key, .. } => !key.get_property(ctx, obj, true, None).is_blank(),
            SearchAttribute::Empty { key, .. } => key.get_property(ctx, obj, true, None).is_blank(),
            SearchAttribute::Array { key, value, exact, .. } => key
                .get_property(ctx, obj, true, None)
                .into_list()
                .iter()
                .any(|item| value_matches(item, value, *exact)),
            SearchAttribute::Uuid { value, .. } => obj.uuid().as_deref() == Some(value.as_str()),
            SearchAttribute::Related { key, value, .. } => {
                let related = key.get_property(ctx, obj, false, None).into_list();
                related.iter().any(|r| match (r, value) {
                    (Value::Node(a), Value::Node(b)) => a == b,
                    (Value::Node(id), Value::String(uuid)) => {
                        GraphObject::node(obj.store().clone(), *id).uuid().as_deref() == Some(uuid.as_str())
                    }
                    _ => false,
                })
            }
            SearchAttribute::Group { attributes, .. } => group_matches(attributes, ctx, obj),
            SearchAttribute::Endpoint { source, attribute, .. } => {
                source.resolve(obj).is_some_and(|target| attribute.matches(ctx, &target))
            }
        }
    }
}

fn value_matches(actual: &Value, expected: &Value, exact: bool) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(e)) if !exact => a.to_lowercase().contains(&e.to_lowercase()),
        (a, e) if a.is_numeric() || a.is_null() => a.compare(e) == Some(Ordering::Equal),
        (a, e) => a == e || a.compare(e) == Some(Ordering::Equal),
    }
}

/// Required members must match, forbidden members must not, and when there
/// are optional members at least one of them must match.
fn group_matches(attributes: &[SearchAttribute], ctx: &SecurityContext, obj: &GraphObject) -> bool {
    let mut has_optional = false;
    let mut optional_hit = false;
    for attr in attributes {
        let hit = attr.matches(ctx, obj);
        match attr.occur() {
            Occurrence::Required if !hit => return false,
            Occurrence::Forbidden if hit => return false,
            Occurrence::Optional => {
                has_optional = true;
                optional_hit |= hit;
            }
            _ => {}
        }
    }
    !has_optional || optional_hit
}

// ============================================================================
// QueryGroup
// ============================================================================

/// Top-level collection of constraints for one search request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryGroup {
    attributes: Vec<SearchAttribute>,
}

impl QueryGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attribute: SearchAttribute) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a required exact-value constraint.
    pub fn and(&mut self, key: &KeyRef, value: impl Into<Value>) -> &mut Self {
        self.push(SearchAttribute::Property {
            key: key.clone(),
            value: value.into(),
            occur: Occurrence::Required,
            exact: true,
        })
    }

    /// Add an optional exact-value constraint.
    pub fn or(&mut self, key: &KeyRef, value: impl Into<Value>) -> &mut Self {
        self.push(SearchAttribute::Property {
            key: key.clone(),
            value: value.into(),
            occur: Occurrence::Optional,
            exact: true,
        })
    }

    pub fn attributes(&self) -> &[SearchAttribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn into_attribute(self, occur: Occurrence) -> SearchAttribute {
        SearchAttribute::Group { occur, attributes: self.attributes }
    }

    pub fn matches(&self, ctx: &SecurityContext, obj: &GraphObject) -> bool {
        group_matches(&self.attributes, ctx, obj)
    }

    /// Nodes labelled `label` that satisfy every constraint, in store order.
    pub fn find(&self, ctx: &SecurityContext, store: &Arc<dyn GraphStore>, label: &str) -> Vec<GraphObject> {
        store
            .nodes_by_label(label)
            .into_iter()
            .map(|id| GraphObject::node(store.clone(), id))
            .filter(|obj| self.matches(ctx, obj))
            .collect()
    }
}
