//! Cell value types for store-agnostic row handling.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

/// A single cell value, decoded once per column under the canonical
/// column type and carried through the transfer as a closed variant.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// NULL / absent value.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 64-bit signed integer (covers all ClickHouse integer widths).
    Int(i64),

    /// 64-bit floating point.
    Float(f64),

    /// Text data.
    Text(String),

    /// Date without time component.
    Date(NaiveDate),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Array of values sharing one element type.
    Array(Vec<CellValue>),
}

impl CellValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Short name of the variant, used in compatibility warnings.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "bool",
            CellValue::Int(_) => "integer",
            CellValue::Float(_) => "float",
            CellValue::Text(_) => "string",
            CellValue::Date(_) => "date",
            CellValue::DateTime(_) => "datetime",
            CellValue::Array(_) => "array",
        }
    }

    /// Render the value as a delimited-file field.
    ///
    /// NULL renders as the empty field; dates use the two fixed formats
    /// understood on re-import; arrays render as a JSON literal.
    pub fn render(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(v) => v.to_string(),
            CellValue::Int(v) => v.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Text(v) => v.clone(),
            CellValue::Date(v) => v.format("%Y-%m-%d").to_string(),
            CellValue::DateTime(v) => v.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Array(items) => {
                Value::Array(items.iter().map(CellValue::to_json).collect()).to_string()
            }
        }
    }

    /// Convert to a JSON value for a `JSONEachRow` insert body.
    ///
    /// Date and DateTime are serialized as their text forms, which is
    /// what ClickHouse accepts for those columns in JSON input.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Bool(v) => Value::Bool(*v),
            CellValue::Int(v) => Value::Number((*v).into()),
            CellValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Text(v) => Value::String(v.clone()),
            CellValue::Date(v) => Value::String(v.format("%Y-%m-%d").to_string()),
            CellValue::DateTime(v) => Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string()),
            CellValue::Array(items) => Value::Array(items.iter().map(CellValue::to_json).collect()),
        }
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<NaiveDate> for CellValue {
    fn from(v: NaiveDate) -> Self {
        CellValue::Date(v)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(v: NaiveDateTime) -> Self {
        CellValue::DateTime(v)
    }
}

/// A bounded batch of rows processed as one unit.
///
/// Rows are aligned to the column list of the transfer that produced
/// the batch; batch size caps memory and sets the progress granularity.
#[derive(Debug, Default)]
pub struct RowBatch {
    /// Rows in this batch.
    pub rows: Vec<Vec<CellValue>>,
}

impl RowBatch {
    /// Create a new batch with the given rows.
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Get the number of rows in this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_null() {
        assert!(CellValue::Null.is_null());
        assert!(!CellValue::Int(42).is_null());
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(CellValue::Null.render(), "");
        assert_eq!(CellValue::Int(7).render(), "7");
        assert_eq!(CellValue::Bool(true).render(), "true");
        assert_eq!(CellValue::Text("a,b".into()).render(), "a,b");
    }

    #[test]
    fn test_render_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(CellValue::Date(d).render(), "2024-01-02");
        let dt = d.and_hms_opt(3, 4, 5).unwrap();
        assert_eq!(CellValue::DateTime(dt).render(), "2024-01-02 03:04:05");
    }

    #[test]
    fn test_render_array_as_json() {
        let v = CellValue::Array(vec![CellValue::Int(1), CellValue::Text("x".into())]);
        assert_eq!(v.render(), r#"[1,"x"]"#);
    }

    #[test]
    fn test_to_json_dates_are_strings() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            CellValue::Date(d).to_json(),
            Value::String("2024-01-02".into())
        );
    }

    #[test]
    fn test_batch_len() {
        let batch = RowBatch::new(vec![vec![CellValue::Int(1)], vec![CellValue::Int(2)]]);
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
        assert!(RowBatch::default().is_empty());
    }
}
