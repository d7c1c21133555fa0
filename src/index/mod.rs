//! Index capability negotiation.
//!
//! Keys only decide *whether* and *how* a value should be indexed; the index
//! itself belongs to the storage engine.

use serde::{Deserialize, Serialize};

use crate::model::ValueType;

/// Type of index a key asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexType {
    /// B-tree index for equality and range queries.
    BTree,
    /// Full-text search index.
    FullText,
    /// Unique constraint (implies B-tree).
    Unique,
}

/// What the index backend can store.
pub trait IndexCapabilities: Send + Sync {
    /// Whether values of the given logical type can be put into the index.
    fn supports(&self, value_type: &ValueType) -> bool;
}

/// Scalars and arrays of scalars are indexable; entities and maps are not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarIndex;

impl IndexCapabilities for ScalarIndex {
    fn supports(&self, value_type: &ValueType) -> bool {
        match value_type {
            ValueType::Entity(_) | ValueType::Collection(_) | ValueType::Map | ValueType::Any => false,
            ValueType::Array(inner) => self.supports(inner),
            _ => true,
        }
    }
}
