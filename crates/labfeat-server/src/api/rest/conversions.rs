//! Type conversion utilities
//!
//! Converts the in-memory table model into the JSON shapes the REST API
//! serves.

use labfeat_core::{Table, Value};

/// Convert a table cell to a JSON value
pub(super) fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Timestamp(ts) => {
            serde_json::Value::String(ts.format("%Y-%m-%dT%H:%M:%S").to_string())
        }
    }
}

/// Convert a table to records orientation: one JSON object per row, keyed by
/// column name, in declared column order.
pub(super) fn table_to_records(table: &Table) -> Vec<serde_json::Map<String, serde_json::Value>> {
    table
        .rows()
        .iter()
        .map(|row| {
            table
                .columns()
                .iter()
                .zip(row.iter())
                .map(|(name, cell)| (name.clone(), value_to_json(cell)))
                .collect()
        })
        .collect()
}
