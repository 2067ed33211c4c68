//! Cell value types for labfeat tables
//!
//! The `Value` enum represents all possible cell values in a labfeat table,
//! similar to JSON values but with separate integer, float, and timestamp
//! variants so columns can be mapped onto distinct storage types.

use crate::error::{CoreError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Cell value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value (absent cell, e.g. filled in by an outer join)
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// Text value
    Text(String),
    /// Timestamp value (naive, no timezone in the source extracts)
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Whether this cell is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Coerce this value to an integer cell.
    ///
    /// Null passes through unchanged: outer joins legitimately produce null
    /// ids, and only genuinely non-numeric values abort a run.
    pub fn coerce_int(&self) -> Result<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Int(n) => Ok(Value::Int(*n)),
            Value::Float(f) if f.fract() == 0.0 => Ok(Value::Int(*f as i64)),
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| CoreError::TypeError(format!("not an integer: {:?}", s))),
            other => Err(CoreError::TypeError(format!(
                "cannot coerce {:?} to integer",
                other
            ))),
        }
    }

    /// Coerce this value to a timestamp cell.
    ///
    /// Accepts dates (`2020-01-01`), date-times (`2020-01-01 12:30:00`) and
    /// RFC 3339 strings. Null passes through unchanged.
    pub fn coerce_timestamp(&self) -> Result<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
            Value::Text(s) => parse_timestamp(s.trim())
                .map(Value::Timestamp)
                .ok_or_else(|| CoreError::TypeError(format!("not a timestamp: {:?}", s))),
            other => Err(CoreError::TypeError(format!(
                "cannot coerce {:?} to timestamp",
                other
            ))),
        }
    }

    /// Numeric view of this value, widening integers and parsing text.
    pub fn parse_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// String form used for join-key and grouping comparisons.
    pub fn key_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Timestamp(ts) => ts.to_string(),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_utc());
    }
    None
}

/// Semantic column type, inferred from the cells of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Bool,
    Timestamp,
    Text,
}

impl ColumnType {
    /// Infer the column type from an iterator over its cells.
    ///
    /// Null cells are skipped; a column with no non-null cells falls back to
    /// `Text`. Integer columns widen to `Float` when mixed with floats; any
    /// other mixture falls back to `Text`.
    pub fn infer<'a, I>(cells: I) -> ColumnType
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut inferred: Option<ColumnType> = None;
        for cell in cells {
            let ty = match cell {
                Value::Null => continue,
                Value::Bool(_) => ColumnType::Bool,
                Value::Int(_) => ColumnType::Integer,
                Value::Float(_) => ColumnType::Float,
                Value::Text(_) => ColumnType::Text,
                Value::Timestamp(_) => ColumnType::Timestamp,
            };
            inferred = Some(match inferred {
                None => ty,
                Some(prev) if prev == ty => prev,
                Some(ColumnType::Integer) if ty == ColumnType::Float => ColumnType::Float,
                Some(ColumnType::Float) if ty == ColumnType::Integer => ColumnType::Float,
                Some(_) => ColumnType::Text,
            });
        }
        inferred.unwrap_or(ColumnType::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_null() {
        assert!(Value::Null.is_null());
        assert!(!Value::Int(0).is_null());
    }

    #[test]
    fn test_coerce_int_from_text() {
        let val = Value::Text("42".to_string());
        assert_eq!(val.coerce_int().unwrap(), Value::Int(42));

        let padded = Value::Text(" 7 ".to_string());
        assert_eq!(padded.coerce_int().unwrap(), Value::Int(7));
    }

    #[test]
    fn test_coerce_int_passes_null_through() {
        assert_eq!(Value::Null.coerce_int().unwrap(), Value::Null);
    }

    #[test]
    fn test_coerce_int_from_integral_float() {
        assert_eq!(Value::Float(3.0).coerce_int().unwrap(), Value::Int(3));
        assert!(Value::Float(3.5).coerce_int().is_err());
    }

    #[test]
    fn test_coerce_int_rejects_non_numeric_text() {
        let err = Value::Text("abc".to_string()).coerce_int().unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_coerce_timestamp_from_date() {
        let val = Value::Text("2020-01-01".to_string());
        match val.coerce_timestamp().unwrap() {
            Value::Timestamp(ts) => assert_eq!(ts.to_string(), "2020-01-01 00:00:00"),
            other => panic!("Expected Timestamp, got {:?}", other),
        }
    }

    #[test]
    fn test_coerce_timestamp_from_datetime() {
        let val = Value::Text("2020-01-01 12:30:00".to_string());
        match val.coerce_timestamp().unwrap() {
            Value::Timestamp(ts) => assert_eq!(ts.to_string(), "2020-01-01 12:30:00"),
            other => panic!("Expected Timestamp, got {:?}", other),
        }
    }

    #[test]
    fn test_coerce_timestamp_rejects_garbage() {
        assert!(Value::Text("yesterday".to_string())
            .coerce_timestamp()
            .is_err());
        assert!(Value::Bool(true).coerce_timestamp().is_err());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(Value::Int(2).parse_float(), Some(2.0));
        assert_eq!(Value::Float(1.5).parse_float(), Some(1.5));
        assert_eq!(Value::Text("10.5".to_string()).parse_float(), Some(10.5));
        assert_eq!(Value::Text("x".to_string()).parse_float(), None);
        assert_eq!(Value::Null.parse_float(), None);
    }

    #[test]
    fn test_key_string() {
        assert_eq!(Value::Int(5).key_string(), "5");
        assert_eq!(Value::Text("A1".to_string()).key_string(), "A1");
        assert_eq!(Value::Null.key_string(), "");
    }

    #[test]
    fn test_infer_integer_column() {
        let cells = vec![Value::Int(1), Value::Null, Value::Int(2)];
        assert_eq!(ColumnType::infer(&cells), ColumnType::Integer);
    }

    #[test]
    fn test_infer_widens_to_float() {
        let cells = vec![Value::Int(1), Value::Float(1.5)];
        assert_eq!(ColumnType::infer(&cells), ColumnType::Float);

        let cells = vec![Value::Float(1.5), Value::Int(1)];
        assert_eq!(ColumnType::infer(&cells), ColumnType::Float);
    }

    #[test]
    fn test_infer_mixed_falls_back_to_text() {
        let cells = vec![Value::Int(1), Value::Text("a".to_string())];
        assert_eq!(ColumnType::infer(&cells), ColumnType::Text);
    }

    #[test]
    fn test_infer_all_null_is_text() {
        let cells = vec![Value::Null, Value::Null];
        assert_eq!(ColumnType::infer(&cells), ColumnType::Text);
    }

    #[test]
    fn test_infer_timestamp_column() {
        let ts = Value::Text("2020-01-01".to_string())
            .coerce_timestamp()
            .unwrap();
        assert_eq!(
            ColumnType::infer(std::iter::once(&ts)),
            ColumnType::Timestamp
        );
    }

    #[test]
    fn test_value_serde_json() {
        let val = Value::Int(42);
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, "42");

        let val = Value::Text("hello".to_string());
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, "\"hello\"");
    }
}
