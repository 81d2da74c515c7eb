//! Type reconciliation between ClickHouse column types and flat-file text.
//!
//! The canonical [`ColumnType`] enum is the pivot between the two type
//! systems: native type names classify into it once per column, and every
//! cell is decoded, checked, and converted under that single decision.
//! Compatibility failures are reported as warnings, never as errors - a
//! mismatched cell must not abort a running transfer.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::core::CellValue;

/// Date format accepted for `Date` values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp format accepted for `DateTime` values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical column type reconciling ClickHouse types with file data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    String,
    Bool,
    Date,
    DateTime,
    Nullable(Box<ColumnType>),
    Array(Box<ColumnType>),
}

impl ColumnType {
    /// ClickHouse type name for this canonical type, used when creating
    /// tables from inferred file schemas.
    pub fn native_type(&self) -> String {
        match self {
            ColumnType::Int64 => "Int64".to_string(),
            ColumnType::Float64 => "Float64".to_string(),
            ColumnType::String => "String".to_string(),
            ColumnType::Bool => "Bool".to_string(),
            ColumnType::Date => "Date".to_string(),
            ColumnType::DateTime => "DateTime".to_string(),
            ColumnType::Nullable(inner) => format!("Nullable({})", inner.native_type()),
            ColumnType::Array(inner) => format!("Array({})", inner.native_type()),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.native_type())
    }
}

/// Classify a ClickHouse type name into its canonical type.
///
/// Pure and total: `Nullable(...)`, `Array(...)` and `LowCardinality(...)`
/// wrappers are unwrapped recursively, all integer widths fold into
/// `Int64`, and unknown names fall back to `String` rather than being
/// rejected.
pub fn classify(native: &str) -> ColumnType {
    let native = native.trim();

    if let Some(inner) = unwrap_wrapper(native, "Nullable") {
        return ColumnType::Nullable(Box::new(classify(inner)));
    }
    if let Some(inner) = unwrap_wrapper(native, "Array") {
        return ColumnType::Array(Box::new(classify(inner)));
    }
    // LowCardinality changes storage, not the value domain.
    if let Some(inner) = unwrap_wrapper(native, "LowCardinality") {
        return classify(inner);
    }

    // Strip parameters: DateTime64(3), FixedString(16), Decimal(18, 4).
    let base = native.split('(').next().unwrap_or(native);

    match base {
        "UInt8" | "UInt16" | "UInt32" | "UInt64" | "Int8" | "Int16" | "Int32" | "Int64" => {
            ColumnType::Int64
        }
        "Float32" | "Float64" => ColumnType::Float64,
        "String" | "FixedString" => ColumnType::String,
        "Bool" => ColumnType::Bool,
        "Date" | "Date32" => ColumnType::Date,
        "DateTime" | "DateTime64" => ColumnType::DateTime,
        _ => ColumnType::String,
    }
}

/// Strip a single `Wrapper(...)` layer, returning the inner type text.
fn unwrap_wrapper<'a>(native: &'a str, wrapper: &str) -> Option<&'a str> {
    native
        .strip_prefix(wrapper)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
}

/// Outcome of a compatibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compat {
    pub ok: bool,
    pub reason: Option<String>,
}

impl Compat {
    fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Check whether a value can be represented in the given column type.
///
/// Never fails hard: NULL is compatible with every type, and any
/// parse/cast problem comes back as a warning string for the caller to
/// collect. Arrays are checked element-wise and fail with the first
/// offending element's reason.
pub fn check_compatible(value: &CellValue, ty: &ColumnType) -> Compat {
    if value.is_null() {
        return Compat::ok();
    }

    match ty {
        ColumnType::Nullable(inner) => check_compatible(value, inner),
        ColumnType::Array(elem) => match value {
            CellValue::Array(items) => {
                for item in items {
                    let compat = check_compatible(item, elem);
                    if !compat.ok {
                        return compat;
                    }
                }
                Compat::ok()
            }
            other => Compat::fail(format!("expected array, got {}", other.type_name())),
        },
        ColumnType::Int64 => match value {
            CellValue::Int(_) | CellValue::Bool(_) | CellValue::Float(_) => Compat::ok(),
            CellValue::Text(s) => match s.trim().parse::<i64>() {
                Ok(_) => Compat::ok(),
                Err(e) => Compat::fail(format!("cannot convert {:?} to Int64: {}", s, e)),
            },
            other => Compat::fail(format!("cannot convert {} to Int64", other.type_name())),
        },
        ColumnType::Float64 => match value {
            CellValue::Int(_) | CellValue::Float(_) | CellValue::Bool(_) => Compat::ok(),
            CellValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(_) => Compat::ok(),
                Err(e) => Compat::fail(format!("cannot convert {:?} to Float64: {}", s, e)),
            },
            other => Compat::fail(format!("cannot convert {} to Float64", other.type_name())),
        },
        // Everything has a string form.
        ColumnType::String => Compat::ok(),
        ColumnType::Bool => match value {
            CellValue::Bool(_) | CellValue::Int(_) | CellValue::Float(_) => Compat::ok(),
            CellValue::Text(s) => {
                if parse_bool(s).is_some() {
                    Compat::ok()
                } else {
                    Compat::fail(format!("cannot convert {:?} to Bool", s))
                }
            }
            other => Compat::fail(format!("cannot convert {} to Bool", other.type_name())),
        },
        ColumnType::Date => match value {
            CellValue::Date(_) | CellValue::DateTime(_) => Compat::ok(),
            CellValue::Text(s) => match NaiveDate::parse_from_str(s.trim(), DATE_FORMAT) {
                Ok(_) => Compat::ok(),
                Err(e) => Compat::fail(format!("cannot convert {:?} to Date: {}", s, e)),
            },
            other => Compat::fail(format!("cannot convert {} to Date", other.type_name())),
        },
        ColumnType::DateTime => match value {
            CellValue::DateTime(_) | CellValue::Date(_) => Compat::ok(),
            CellValue::Text(s) => match NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT) {
                Ok(_) => Compat::ok(),
                Err(e) => Compat::fail(format!("cannot convert {:?} to DateTime: {}", s, e)),
            },
            other => Compat::fail(format!("cannot convert {} to DateTime", other.type_name())),
        },
    }
}

/// Convert a value to the given column type, best effort.
///
/// On any failure the value's string form is returned instead of an
/// error so that ingestion keeps flowing; the accompanying
/// [`check_compatible`] warning is the observability signal.
pub fn convert(value: CellValue, ty: &ColumnType) -> CellValue {
    if value.is_null() {
        return CellValue::Null;
    }

    match ty {
        ColumnType::Nullable(inner) => convert(value, inner),
        ColumnType::Array(elem) => match value {
            CellValue::Array(items) => {
                CellValue::Array(items.into_iter().map(|v| convert(v, elem)).collect())
            }
            other => CellValue::Text(other.render()),
        },
        ColumnType::Int64 => match value {
            CellValue::Int(v) => CellValue::Int(v),
            CellValue::Bool(v) => CellValue::Int(v as i64),
            CellValue::Float(v) => CellValue::Int(v as i64),
            CellValue::Text(s) => match s.trim().parse::<i64>() {
                Ok(v) => CellValue::Int(v),
                Err(_) => CellValue::Text(s),
            },
            other => CellValue::Text(other.render()),
        },
        ColumnType::Float64 => match value {
            CellValue::Float(v) => CellValue::Float(v),
            CellValue::Int(v) => CellValue::Float(v as f64),
            CellValue::Bool(v) => CellValue::Float(if v { 1.0 } else { 0.0 }),
            CellValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(v) => CellValue::Float(v),
                Err(_) => CellValue::Text(s),
            },
            other => CellValue::Text(other.render()),
        },
        ColumnType::String => match value {
            CellValue::Text(s) => CellValue::Text(s),
            other => CellValue::Text(other.render()),
        },
        ColumnType::Bool => match value {
            CellValue::Bool(v) => CellValue::Bool(v),
            CellValue::Int(v) => CellValue::Bool(v != 0),
            CellValue::Float(v) => CellValue::Bool(v != 0.0),
            CellValue::Text(s) => match parse_bool(&s) {
                Some(v) => CellValue::Bool(v),
                None => CellValue::Text(s),
            },
            other => CellValue::Text(other.render()),
        },
        ColumnType::Date => match value {
            CellValue::Date(v) => CellValue::Date(v),
            CellValue::DateTime(v) => CellValue::Date(v.date()),
            CellValue::Text(s) => match NaiveDate::parse_from_str(s.trim(), DATE_FORMAT) {
                Ok(v) => CellValue::Date(v),
                Err(_) => CellValue::Text(s),
            },
            other => CellValue::Text(other.render()),
        },
        ColumnType::DateTime => match value {
            CellValue::DateTime(v) => CellValue::DateTime(v),
            CellValue::Date(v) => match v.and_hms_opt(0, 0, 0) {
                Some(dt) => CellValue::DateTime(dt),
                None => CellValue::Text(v.format(DATE_FORMAT).to_string()),
            },
            CellValue::Text(s) => match NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT) {
                Ok(v) => CellValue::DateTime(v),
                Err(_) => CellValue::Text(s),
            },
            other => CellValue::Text(other.render()),
        },
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        t if t.eq_ignore_ascii_case("true") => Some(true),
        t if t.eq_ignore_ascii_case("false") => Some(false),
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// Infer a canonical type from a raw file field.
///
/// Used once per column on the first chunk of an import; a sample that
/// matches neither numeric, boolean, nor the two date formats classifies
/// as plain `String`.
pub fn infer_type(sample: &str) -> ColumnType {
    let sample = sample.trim();
    if sample.parse::<i64>().is_ok() {
        return ColumnType::Int64;
    }
    if sample.parse::<f64>().is_ok() {
        return ColumnType::Float64;
    }
    if parse_bool(sample).is_some() {
        return ColumnType::Bool;
    }
    if NaiveDate::parse_from_str(sample, DATE_FORMAT).is_ok() {
        return ColumnType::Date;
    }
    if NaiveDateTime::parse_from_str(sample, DATETIME_FORMAT).is_ok() {
        return ColumnType::DateTime;
    }
    ColumnType::String
}

/// Decode a wire JSON value under the column's canonical type.
///
/// ClickHouse serializes Date/DateTime as strings in `JSONCompact`
/// output; numbers arrive as JSON numbers. Values that do not fit the
/// declared type keep their string form.
pub fn decode_cell(raw: &Value, ty: &ColumnType) -> CellValue {
    match raw {
        Value::Null => CellValue::Null,
        _ => match ty {
            ColumnType::Nullable(inner) => decode_cell(raw, inner),
            ColumnType::Array(elem) => match raw {
                Value::Array(items) => {
                    CellValue::Array(items.iter().map(|v| decode_cell(v, elem)).collect())
                }
                other => CellValue::Text(json_to_text(other)),
            },
            ColumnType::Int64 => match raw {
                Value::Number(n) if n.as_i64().is_some() => CellValue::Int(n.as_i64().unwrap()),
                // UInt64 above i64::MAX arrives as u64; keep the magnitude as text.
                other => convert(CellValue::Text(json_to_text(other)), ty),
            },
            ColumnType::Float64 => match raw {
                Value::Number(n) if n.as_f64().is_some() => CellValue::Float(n.as_f64().unwrap()),
                other => convert(CellValue::Text(json_to_text(other)), ty),
            },
            ColumnType::Bool => match raw {
                Value::Bool(b) => CellValue::Bool(*b),
                Value::Number(n) => CellValue::Bool(n.as_i64() != Some(0)),
                other => convert(CellValue::Text(json_to_text(other)), ty),
            },
            ColumnType::String => CellValue::Text(json_to_text(raw)),
            ColumnType::Date | ColumnType::DateTime => {
                convert(CellValue::Text(json_to_text(raw)), ty)
            }
        },
    }
}

fn json_to_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
