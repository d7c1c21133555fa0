//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use graphkeys::{
    GraphObject, GraphStore, MemoryGraph, PropertyMap, Schema, SecurityContext, Services, Settings,
    Transaction, TxMode,
};

pub struct Fixture {
    pub memory: MemoryGraph,
    pub store: Arc<dyn GraphStore>,
    pub ctx: SecurityContext,
    pub tx: Arc<Transaction>,
}

impl Fixture {
    pub fn new(schema: Schema) -> Self {
        Self::with_settings(schema, Settings::default())
    }

    pub fn with_settings(schema: Schema, settings: Settings) -> Self {
        let services = Services::builder().schema(schema).settings(settings).build();
        Self::with_services(services)
    }

    pub fn with_services(services: Arc<Services>) -> Self {
        let memory = MemoryGraph::new();
        let store: Arc<dyn GraphStore> = Arc::new(memory.clone());
        let tx = Transaction::begin(TxMode::ReadWrite);
        let ctx = SecurityContext::super_user(services).with_transaction(tx.clone());
        Self { memory, store, ctx, tx }
    }

    pub fn create(&self, type_name: &str) -> GraphObject {
        GraphObject::create(&self.ctx, self.store.clone(), type_name, PropertyMap::new()).unwrap()
    }

    pub fn create_with(&self, type_name: &str, props: PropertyMap) -> GraphObject {
        GraphObject::create(&self.ctx, self.store.clone(), type_name, props).unwrap()
    }

    /// Same services, no transaction.
    pub fn read_only_ctx(&self) -> SecurityContext {
        SecurityContext::super_user(self.ctx.services().clone())
    }
}
