//! Universal value type flowing between storage, logical and input forms.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{NodeId, RelId};

/// A property value.
///
/// The same enum carries all three representations a property moves through:
/// - **stored**: what the `PropertyContainer` holds (e.g. `Long` millis for dates)
/// - **logical**: what a typed key hands to callers (e.g. `Date`)
/// - **input/output**: what the JSON layer sends and receives (e.g. a formatted `String`)
///
/// Integer widths are kept apart (`Int` vs `Long`, `Float` vs `Double`) because
/// keys declare exactly one of them and sum/sort semantics depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),

    // Graph references
    Node(NodeId),
    Relationship(RelId),

    // Temporal types
    Date(DateTime<Utc>),
    ZonedDateTime(DateTime<FixedOffset>),
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Int(_) => "Integer",
            Value::Long(_) => "Long",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Bytes(_) => "Byte[]",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Node(_) => "Node",
            Value::Relationship(_) => "Relationship",
            Value::Date(_) => "Date",
            Value::ZonedDateTime(_) => "ZonedDateTime",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_))
    }
    pub fn is_string(&self) -> bool { matches!(self, Value::String(_)) }
    pub fn is_list(&self) -> bool { matches!(self, Value::List(_)) }

    /// Null, an empty or whitespace-only string, or an empty list/map.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any numeric value narrowed to i32.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Long(l) => Some(*l as i32),
            Value::Float(f) => Some(*f as i32),
            Value::Double(d) => Some(*d as i32),
            _ => None,
        }
    }

    /// Any numeric value widened/narrowed to i64.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            Value::Float(f) => Some(*f as i64),
            Value::Double(d) => Some(*d as i64),
            Value::Date(d) => Some(d.timestamp_millis()),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Wraps a scalar into a one-element list; lists pass through, null stays empty.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::List(l) => l,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    /// Unquoted textual rendition, used for concatenation, string sorting and
    /// string-typed search values.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Date(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
            Value::ZonedDateTime(d) => d.to_rfc3339(),
            Value::List(l) => l.iter().map(Value::to_text).collect::<Vec<_>>().join(","),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Long(v) } }
impl From<f32> for Value { fn from(v: f32) -> Self { Value::Float(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Double(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<NodeId> for Value { fn from(v: NodeId) -> Self { Value::Node(v) } }
impl From<RelId> for Value { fn from(v: RelId) -> Self { Value::Relationship(v) } }
impl From<DateTime<Utc>> for Value { fn from(v: DateTime<Utc>) -> Self { Value::Date(v) } }
impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self { Value::ZonedDateTime(v) }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Long(i)
                } else {
                    n.as_f64().map_or(Value::Null, Value::Double)
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::List(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Value {
    /// JSON rendition used by the output side of the input converters.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Long(l) => Json::from(*l),
            Value::Float(f) => serde_json::Number::from_f64(f64::from(*f)).map_or(Json::Null, Json::Number),
            Value::Double(d) => serde_json::Number::from_f64(*d).map_or(Json::Null, Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::Array(b.iter().map(|x| Json::from(*x)).collect()),
            Value::List(l) => Json::Array(l.iter().map(Value::to_json).collect()),
            Value::Map(m) => Json::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
            Value::Node(id) => Json::from(id.0),
            Value::Relationship(id) => Json::from(id.0),
            Value::Date(_) | Value::ZonedDateTime(_) => Json::String(self.to_text()),
        }
    }
}

// ============================================================================
// Display
// ============================================================================

/// Writes `items` between `open` and `close`, comma separated.
fn write_joined<I, T>(f: &mut fmt::Formatter<'_>, open: &str, items: I, close: &str) -> fmt::Result
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    f.write_str(open)?;
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.fmt(f)?;
    }
    f.write_str(close)
}

/// Debug-friendly rendering; strings are quoted. Use `to_text()` for the
/// plain textual form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => v.fmt(f),
            Value::Int(v) => v.fmt(f),
            Value::Long(v) => v.fmt(f),
            Value::Float(v) => v.fmt(f),
            Value::Double(v) => v.fmt(f),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(items) => write_joined(f, "[", items, "]"),
            Value::Map(entries) => write_joined(f, "{", entries.iter().map(|(k, v)| format!("{k}: {v}")), "}"),
            Value::Node(n) => write!(f, "node({n})"),
            Value::Relationship(r) => write!(f, "rel({r})"),
            Value::Date(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::ZonedDateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, false)),
        }
    }
}

// ============================================================================
// Comparison & hashing
// ============================================================================

impl Value {
    /// Ordering between comparable values. Numbers compare across widths,
    /// dates compare by instant. Returns None for incompatible types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Date(a), Value::Date(b)) => a.partial_cmp(b),
            (Value::ZonedDateTime(a), Value::ZonedDateTime(b)) => a.partial_cmp(b),
            (Value::Date(a), Value::ZonedDateTime(b)) => a.partial_cmp(&b.with_timezone(&Utc)),
            (Value::ZonedDateTime(a), Value::Date(b)) => a.with_timezone(&Utc).partial_cmp(b),
            (Value::Date(a), b) if b.is_numeric() => b.as_long().map(|m| a.timestamp_millis().cmp(&m)),
            (a, Value::Date(b)) if a.is_numeric() => a.as_long().map(|m| m.cmp(&b.timestamp_millis())),
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Long(a), Value::Long(b)) => a.partial_cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_double()?.partial_cmp(&b.as_double()?)
            }
            _ => None,
        }
    }

    /// Structural hash; floats hash by bit pattern.
    pub fn hash_into<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Long(l) => l.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::List(l) => {
                l.len().hash(state);
                for v in l { v.hash_into(state); }
            }
            Value::Map(m) => {
                m.len().hash(state);
                for (k, v) in m {
                    k.hash(state);
                    v.hash_into(state);
                }
            }
            Value::Node(id) => id.hash(state),
            Value::Relationship(id) => id.hash(state),
            Value::Date(d) => d.timestamp_millis().hash(state),
            Value::ZonedDateTime(d) => d.hash(state),
        }
    }
}
