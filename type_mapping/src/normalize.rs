//! Timezone normalization
//!
//! Backends without per-value timezone state store and compare timestamps
//! consistently only if every bound value is naive UTC.

use crate::types::Value;

/// Convert offset-carrying timestamps to naive UTC, including inside lists
pub fn normalize_timezone(value: &Value) -> Value {
    match value {
        Value::DateTimeTz(dt) => Value::DateTime(dt.naive_utc()),
        Value::List(items) => Value::List(items.iter().map(normalize_timezone).collect()),
        other => other.clone(),
    }
}
