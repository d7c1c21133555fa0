//! # graphkeys: typed property keys over a property graph
//!
//! Maps typed, named properties onto nodes and relationships of a graph
//! store and moves their values between three representations:
//!
//! | Representation | Example (date key) | Produced by |
//! |----------------|--------------------|-------------|
//! | stored | `Value::Long(1705276800000)` | database converter `convert` |
//! | logical | `Value::Date(2024-01-15T00:00:00Z)` | database converter `revert` / input converter `convert` |
//! | input/output | `Value::String("2024-01-15")` | input converter `revert` |
//!
//! ## Design Principles
//!
//! 1. **Keys are frozen descriptors**: configured through a builder, then
//!    shared as `KeyRef` (an `Arc<dyn PropertyKey>`) across threads.
//! 2. **Per-call state is passed, never stashed**: converters and fix-ups
//!    receive the `SecurityContext` and `GraphObject` they work for.
//! 3. **Storage is a trait**: `GraphStore` / `PropertyContainer` are the only
//!    way values reach the engine; `MemoryGraph` is the reference backend.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use graphkeys::{
//!     EntityType, GraphObject, MemoryGraph, PropertyMap, Schema, SecurityContext,
//!     Services, Transaction, TxMode, Value,
//!     property::{IntegerProperty, PropertyBuilder, StringProperty},
//! };
//!
//! # fn example() -> graphkeys::Result<()> {
//! let name = StringProperty::new("name").indexed().build();
//! let age = IntegerProperty::new("age").build();
//!
//! let mut schema = Schema::new();
//! schema.register(EntityType::node("Person").with_keys([name.clone(), age.clone()]));
//!
//! let services = Services::builder().schema(schema).build();
//! let store = Arc::new(MemoryGraph::new());
//! let tx = Transaction::begin(TxMode::ReadWrite);
//! let ctx = SecurityContext::super_user(services).with_transaction(tx.clone());
//!
//! let person = GraphObject::create(&ctx, store, "Person", PropertyMap::new())?;
//! age.set_property(&ctx, &person, Value::from("42"))?;
//! assert_eq!(age.get_property(&ctx, &person, true, None), Value::Int(42));
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod storage;
pub mod tx;
pub mod index;
pub mod settings;
pub mod context;
pub mod script;
pub mod object;
pub mod schema;
pub mod property;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, Relationship, Value, ValueType, StoredProperties,
    NodeId, RelId, EntityId, Direction,
};

// ============================================================================
// Re-exports: Storage, transactions, services
// ============================================================================

pub use storage::{GraphStore, PropertyContainer, MemoryGraph};
pub use tx::{Transaction, TxMode, TxId, Modification, ModificationQueue};
pub use index::{IndexCapabilities, IndexType, ScalarIndex};
pub use settings::{Settings, UnknownKeyPolicy, PasswordPolicy};
pub use context::{SecurityContext, Services, Principal};
pub use object::GraphObject;
pub use schema::{EntityType, Schema};

// ============================================================================
// Re-exports: Property core
// ============================================================================

pub use property::{
    KeyRef, PropertyKey, PropertyMap, PropertyConverter, PropertyBuilder,
    SearchAttribute, QueryGroup, Occurrence, SortType,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Property {property} of type {declaring_type} is read-only")]
    ReadOnlyProperty { declaring_type: String, property: String },

    #[error("Property {property} of type {declaring_type} can only be written once")]
    WriteOnceViolation { declaring_type: String, property: String },

    #[error("Not in transaction: a write transaction is required")]
    NotInTransaction,

    #[error("Cannot parse {value:?} as {expected} for property {property} of type {declaring_type}")]
    NumberFormat {
        declaring_type: String,
        property: String,
        value: String,
        expected: &'static str,
    },

    #[error("Cannot parse {value:?} with format {format:?} for property {property} of type {declaring_type}")]
    DateFormat {
        declaring_type: String,
        property: String,
        value: String,
        format: String,
    },

    #[error("Value {value:?} is not allowed for property {property} of type {declaring_type}, allowed values: {allowed}")]
    ValueNotAllowed {
        declaring_type: String,
        property: String,
        value: String,
        allowed: String,
    },

    #[error("Cannot convert element {value:?} to {component} for array property {property} of type {declaring_type}")]
    ArrayElement {
        declaring_type: String,
        property: String,
        value: String,
        component: String,
    },

    #[error("Policy violation for property {property} of type {declaring_type}: {message}")]
    Policy {
        declaring_type: String,
        property: String,
        message: String,
    },

    /// Transient storage condition. Propagates unchanged through every layer.
    #[error("Retry: {0}")]
    Retry(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Scripting error in {label}: {}", errors.join("; "))]
    Scripting { label: String, errors: Vec<String> },

    #[error("Relationship property {property} failed: {source}")]
    Relation {
        property: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// HTTP-like status code the REST layer reports for this error.
    pub fn status(&self) -> u16 {
        match self {
            Error::BadRequest(_) | Error::Json(_) => 400,
            Error::NotFound(_) => 404,
            Error::ReadOnlyProperty { .. }
            | Error::WriteOnceViolation { .. }
            | Error::NumberFormat { .. }
            | Error::DateFormat { .. }
            | Error::ValueNotAllowed { .. }
            | Error::ArrayElement { .. }
            | Error::Policy { .. }
            | Error::Scripting { .. }
            | Error::TypeError { .. } => 422,
            Error::Retry(_) => 503,
            Error::Relation { source, .. } => source.status(),
            Error::NotInTransaction | Error::StorageError(_) | Error::Configuration(_) => 500,
        }
    }

    /// Whether this is the storage layer's retry signal.
    pub fn is_retry(&self) -> bool {
        matches!(self, Error::Retry(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
