//! # Property Keys
//!
//! Every attribute of an entity type is a [`PropertyKey`]: a frozen
//! descriptor that knows its names, flags and value type, converts values
//! between stored, logical and input form, and turns request parameters
//! into [`SearchAttribute`] trees.
//!
//! ## Families
//!
//! | Family | Module | Keys |
//! |--------|--------|------|
//! | Primitive | `primitive` | Boolean, Integer, Long, Float, Double, String, Date, Enum, arrays, secrets |
//! | Relationship | `related` | start/end node(s), id projections, hyper relations, reference groups |
//! | Computed | `computed` | function, concat/join, counters and sums, query-backed |
//! | Structural | `structural` | `id`, `type`, `relType` |
//!
//! ## Pipeline
//!
//! Reads and writes of all families go through `base`, which applies the
//! read-only, transaction and unlock checks, records modifications and
//! runs transformators and update callbacks.

pub(crate) mod base;
pub mod computed;
pub mod config;
pub mod converter;
pub mod date_format;
pub mod key;
pub mod keys;
pub mod map;
pub mod openapi;
pub mod primitive;
pub mod query;
pub mod related;
pub mod search;
pub mod sort;
pub mod structural;
pub mod transform;

pub use related::relation;

pub use config::{PropertyBuilder, PropertyConfig, PropertyFlags};
pub use converter::{FnConverter, PropertyConverter};
pub use key::{KeyRef, Predicate, PropertyKey};
pub use map::PropertyMap;
pub use query::Query;
pub use search::{Occurrence, QueryGroup, SearchAttribute};
pub use sort::SortType;
pub use transform::{PropertyUpdateCallback, Transformator, TransformatorRegistry};

pub use primitive::{
    ArrayProperty, BooleanProperty, ByteArrayProperty, ComponentType, ConstantBooleanProperty,
    DateArrayProperty, DateProperty, DoubleProperty, EncryptedStringProperty, EnumArrayProperty,
    EnumConstants, EnumProperty, FloatProperty, GenericProperty, IntegerProperty, LongProperty,
    LowercaseStringProperty, PasswordProperty, StringProperty, ZonedDateTimeProperty,
};
pub use related::{
    Autocreate, Cardinality, CollectionIdProperty, EndpointKind, EntityIdProperty,
    HyperRelationProperty, Notion, NullValuesOnlyProperty, Reference, ReferenceGroup,
    ReferenceSource, RelatedProperty, Relation, RelationArena, RelationId,
};
pub use computed::{
    CollectionSumProperty, ConcatProperty, CypherQueryProperty, ElementCounterProperty,
    FunctionProperty, IntegerSumProperty, JoinProperty, LongSumProperty,
};
pub use structural::{RelationshipTypeProperty, TypeProperty, UuidProperty};
