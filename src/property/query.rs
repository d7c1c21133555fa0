//! In-memory search over a store: filter by type label and constraints,
//! then sort and page.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::context::SecurityContext;
use crate::object::GraphObject;
use crate::storage::GraphStore;
use crate::Result;

use super::key::KeyRef;
use super::search::QueryGroup;

#[derive(Debug, Clone)]
pub struct Query {
    label: String,
    group: QueryGroup,
    sort: Option<(KeyRef, bool)>,
    page: Option<(usize, usize)>,
}

impl Query {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), group: QueryGroup::new(), sort: None, page: None }
    }

    /// Build constraints from request parameters, one per matching key.
    pub fn from_params(
        ctx: &SecurityContext,
        label: impl Into<String>,
        keys: &[KeyRef],
        params: &HashMap<String, String>,
        exact: bool,
    ) -> Result<Self> {
        let mut query = Self::new(label);
        for key in keys {
            key.extract_searchable_attribute(ctx, params, exact, &mut query.group)?;
        }
        Ok(query)
    }

    pub fn with_group(mut self, group: QueryGroup) -> Self {
        self.group = group;
        self
    }

    pub fn group_mut(&mut self) -> &mut QueryGroup {
        &mut self.group
    }

    pub fn sort_by(mut self, key: KeyRef, descending: bool) -> Self {
        self.sort = Some((key, descending));
        self
    }

    /// One-based page number and page size.
    pub fn page(mut self, page: usize, size: usize) -> Self {
        self.page = Some((page.max(1), size));
        self
    }

    pub fn run(&self, ctx: &SecurityContext, store: &Arc<dyn GraphStore>) -> Vec<GraphObject> {
        let mut results = self.group.find(ctx, store, &self.label);
        if let Some((key, descending)) = &self.sort {
            results.sort_by(key.sorted(ctx, *descending));
        }
        let total = results.len();
        if let Some((page, size)) = self.page {
            let offset = (page - 1).saturating_mul(size);
            results = results.into_iter().skip(offset).take(size).collect();
        }
        debug!(label = %self.label, total, returned = results.len(), "query executed");
        results
    }
}
