//! Table schema metadata.
//!
//! A [`Schema`] is built fresh from `DESCRIBE TABLE` for every query that
//! needs one - the catalog may change between transfers, so schemas are
//! never cached.

use crate::typemap::{classify, ColumnType};

/// Column metadata.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,

    /// Native type name as reported by the catalog (e.g. "Nullable(Int64)").
    pub native_type: String,

    /// Canonical type classified from `native_type`.
    pub kind: ColumnType,
}

/// Ordered column name to type mapping for one table.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    /// Build a schema from `DESCRIBE TABLE` (name, type) rows.
    pub fn from_describe(rows: Vec<(String, String)>) -> Self {
        let columns = rows
            .into_iter()
            .map(|(name, native_type)| {
                let kind = classify(&native_type);
                ColumnDef {
                    name,
                    native_type,
                    kind,
                }
            })
            .collect();
        Self { columns }
    }

    /// Look up a column by name.
    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Canonical type of a column; unknown columns read as `String`.
    ///
    /// Join projections reference columns of joined tables that the base
    /// table's catalog does not list, so the safe fallback applies.
    pub fn kind_of(&self, name: &str) -> ColumnType {
        self.get(name)
            .map(|c| c.kind.clone())
            .unwrap_or(ColumnType::String)
    }

    /// Canonical types for an ordered projection of column names.
    pub fn kinds_for(&self, names: &[String]) -> Vec<ColumnType> {
        names.iter().map(|n| self.kind_of(n)).collect()
    }

    /// All columns, in catalog order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::from_describe(vec![
            ("id".to_string(), "UInt64".to_string()),
            ("price".to_string(), "Float64".to_string()),
            ("note".to_string(), "Nullable(String)".to_string()),
        ])
    }

    #[test]
    fn test_from_describe_classifies() {
        let schema = sample();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.kind_of("id"), ColumnType::Int64);
        assert_eq!(
            schema.kind_of("note"),
            ColumnType::Nullable(Box::new(ColumnType::String))
        );
    }

    #[test]
    fn test_unknown_column_falls_back_to_string() {
        let schema = sample();
        assert_eq!(schema.kind_of("missing"), ColumnType::String);
    }

    #[test]
    fn test_kinds_for_projection_order() {
        let schema = sample();
        let kinds = schema.kinds_for(&["price".to_string(), "id".to_string()]);
        assert_eq!(kinds, vec![ColumnType::Float64, ColumnType::Int64]);
    }
}
