//! Declared comparison semantics for sorting by a key.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortType {
    String,
    Integer,
    Long,
    Double,
    #[default]
    Default,
}

/// Compare two logical values. Null is smaller than everything else.
pub fn compare_values(sort_type: SortType, a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    match sort_type {
        SortType::String => a.to_text().cmp(&b.to_text()),
        SortType::Integer => cmp_opt(a.as_int(), b.as_int()),
        SortType::Long => cmp_opt(a.as_long(), b.as_long()),
        SortType::Double => a
            .as_double()
            .zip(b.as_double())
            .and_then(|(x, y)| x.partial_cmp(&y))
            .unwrap_or(Ordering::Equal),
        SortType::Default => a.compare(b).unwrap_or_else(|| a.to_text().cmp(&b.to_text())),
    }
}

fn cmp_opt<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    a.cmp(&b)
}
