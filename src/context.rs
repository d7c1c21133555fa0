//! Request-scoped security context and the process-wide services it reaches.

use std::sync::Arc;

use dashmap::DashMap;

use crate::index::{IndexCapabilities, ScalarIndex};
use crate::model::Value;
use crate::schema::Schema;
use crate::script::{QueryService, ScriptEvaluator};
use crate::settings::Settings;
use crate::tx::Transaction;
use crate::{Error, Result};

/// The acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), is_admin: false }
    }
}

// ============================================================================
// Services
// ============================================================================

/// Collaborators shared by every request: settings, the type registry and
/// the external evaluation/query/index services.
pub struct Services {
    settings: Settings,
    schema: Schema,
    evaluator: Option<Arc<dyn ScriptEvaluator>>,
    query_service: Option<Arc<dyn QueryService>>,
    index: Arc<dyn IndexCapabilities>,
}

impl Services {
    pub fn builder() -> ServicesBuilder {
        ServicesBuilder::default()
    }

    pub fn settings(&self) -> &Settings { &self.settings }
    pub fn schema(&self) -> &Schema { &self.schema }
    pub fn index(&self) -> &dyn IndexCapabilities { self.index.as_ref() }

    pub fn evaluator(&self) -> Option<&Arc<dyn ScriptEvaluator>> {
        self.evaluator.as_ref()
    }

    pub fn query_service(&self) -> Option<&Arc<dyn QueryService>> {
        self.query_service.as_ref()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("settings", &self.settings)
            .field("types", &self.schema.type_names())
            .field("evaluator", &self.evaluator.is_some())
            .field("query_service", &self.query_service.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct ServicesBuilder {
    settings: Settings,
    schema: Schema,
    evaluator: Option<Arc<dyn ScriptEvaluator>>,
    query_service: Option<Arc<dyn QueryService>>,
    index: Option<Arc<dyn IndexCapabilities>>,
}

impl ServicesBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn evaluator(mut self, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn query_service(mut self, service: Arc<dyn QueryService>) -> Self {
        self.query_service = Some(service);
        self
    }

    pub fn index(mut self, index: Arc<dyn IndexCapabilities>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn build(self) -> Arc<Services> {
        Arc::new(Services {
            settings: self.settings,
            schema: self.schema,
            evaluator: self.evaluator,
            query_service: self.query_service,
            index: self.index.unwrap_or_else(|| Arc::new(ScalarIndex)),
        })
    }
}

// ============================================================================
// SecurityContext
// ============================================================================

/// Capability object passed through every property call.
///
/// Carries the acting user, the caller's transaction, the access-time
/// tracking toggle and a per-request scratch store. Cloning is cheap and
/// clones share the scratch store.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    user: Option<Principal>,
    super_user: bool,
    services: Arc<Services>,
    transaction: Option<Arc<Transaction>>,
    access_time_tracking: bool,
    scratch: Arc<DashMap<String, Value>>,
}

impl SecurityContext {
    pub fn new(user: Principal, services: Arc<Services>) -> Self {
        Self::build(Some(user), false, services)
    }

    pub fn super_user(services: Arc<Services>) -> Self {
        Self::build(None, true, services)
    }

    pub fn anonymous(services: Arc<Services>) -> Self {
        Self::build(None, false, services)
    }

    fn build(user: Option<Principal>, super_user: bool, services: Arc<Services>) -> Self {
        let access_time_tracking = services.settings().access_time_tracking;
        Self {
            user,
            super_user,
            services,
            transaction: None,
            access_time_tracking,
            scratch: Arc::new(DashMap::new()),
        }
    }

    pub fn with_transaction(mut self, tx: Arc<Transaction>) -> Self {
        self.transaction = Some(tx);
        self
    }

    pub fn without_access_time_tracking(mut self) -> Self {
        self.access_time_tracking = false;
        self
    }

    pub fn user(&self) -> Option<&Principal> { self.user.as_ref() }
    pub fn user_id(&self) -> Option<&str> { self.user.as_ref().map(|u| u.id.as_str()) }
    pub fn is_super_user(&self) -> bool { self.super_user }
    pub fn services(&self) -> &Arc<Services> { &self.services }
    pub fn settings(&self) -> &Settings { self.services.settings() }
    pub fn schema(&self) -> &Schema { self.services.schema() }
    pub fn does_access_time_tracking(&self) -> bool { self.access_time_tracking }

    pub fn transaction(&self) -> Option<&Arc<Transaction>> {
        self.transaction.as_ref()
    }

    /// The active write transaction, or `NotInTransaction`.
    pub fn require_write_tx(&self) -> Result<&Arc<Transaction>> {
        self.transaction
            .as_ref()
            .filter(|tx| tx.is_write_active())
            .ok_or(Error::NotInTransaction)
    }

    // ========================================================================
    // Scratch store
    // ========================================================================

    pub fn cached(&self, key: &str) -> Option<Value> {
        self.scratch.get(key).map(|v| v.value().clone())
    }

    pub fn cache(&self, key: impl Into<String>, value: Value) {
        self.scratch.insert(key.into(), value);
    }

    pub fn invalidate(&self, key: &str) {
        self.scratch.remove(key);
    }

    pub fn clear_cache(&self) {
        self.scratch.clear();
    }
}
