//! Statement construction for reads, table creation, and batched inserts.
//!
//! Every table and column identifier passes validation and backtick
//! quoting before it is embedded in statement text; insert values never
//! enter the text at all - they travel as a `JSONEachRow` request body.

use serde::{Deserialize, Serialize};

use crate::core::identifier::{qualify, quote_ident};
use crate::error::{IngestError, Result};
use crate::typemap::ColumnType;

/// Join type for a join chain. Defaults to INNER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    /// SQL keyword for this join type.
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        }
    }
}

/// One step of a join chain: a table and the key it joins on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinTable {
    /// Table name.
    pub table: String,

    /// Join key column in this table.
    pub key: String,
}

/// A linear join chain.
///
/// Consecutive tables are joined left-to-right on equality of their
/// keys. This is a strict path, not a general join graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinChain {
    /// Join type applied to every step (default INNER).
    #[serde(default)]
    pub join_type: JoinType,

    /// Ordered (table, key) steps; at least two are required.
    pub tables: Vec<JoinTable>,
}

impl JoinChain {
    /// Validate the chain before any query is built or executed.
    pub fn validate(&self) -> Result<()> {
        if self.tables.len() < 2 {
            return Err(IngestError::Config(
                "At least two tables required for join".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build a plain projection query.
pub fn build_select(table: &str, columns: &[String]) -> Result<String> {
    Ok(format!(
        "SELECT {} FROM {}",
        column_list(columns)?,
        quote_ident(table)?
    ))
}

/// Build a join-chain query.
///
/// Starting from the first table, each following table is appended as
/// `<TYPE> JOIN t_i ON t_{i-1}.k_{i-1} = t_i.k_i`.
///
/// # Errors
///
/// `IngestError::Config` when the chain has fewer than two tables; the
/// error surfaces before anything reaches the database.
pub fn build_join_select(chain: &JoinChain, columns: &[String]) -> Result<String> {
    chain.validate()?;

    let mut query = format!(
        "SELECT {} FROM {}",
        column_list(columns)?,
        quote_ident(&chain.tables[0].table)?
    );

    for window in chain.tables.windows(2) {
        let (prev, curr) = (&window[0], &window[1]);
        query.push_str(&format!(
            " {} JOIN {} ON {} = {}",
            chain.join_type.as_sql(),
            quote_ident(&curr.table)?,
            qualify(&prev.table, &prev.key)?,
            qualify(&curr.table, &curr.key)?,
        ));
    }

    Ok(query)
}

/// Build a `CREATE TABLE IF NOT EXISTS` statement for inferred columns.
///
/// New tables use the append-optimized MergeTree engine ordered by the
/// trivial key, matching what a column-store load with no declared
/// ordering gets.
pub fn build_create_table(table: &str, columns: &[(String, ColumnType)]) -> Result<String> {
    if columns.is_empty() {
        return Err(IngestError::Config(format!(
            "cannot create table {:?} with no columns",
            table
        )));
    }

    let defs = columns
        .iter()
        .map(|(name, kind)| Ok(format!("{} {}", quote_ident(name)?, kind.native_type())))
        .collect::<Result<Vec<_>>>()?
        .join(", ");

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) ENGINE = MergeTree() ORDER BY tuple()",
        quote_ident(table)?,
        defs
    ))
}

/// Build the statement head of a batched insert.
///
/// The row payload is shipped separately as the request body in
/// `JSONEachRow` form, so no value is ever interpolated into SQL.
pub fn build_insert(table: &str, columns: &[String]) -> Result<String> {
    Ok(format!(
        "INSERT INTO {} ({}) FORMAT JSONEachRow",
        quote_ident(table)?,
        column_list(columns)?
    ))
}

/// Append a bounded window to a read query.
pub fn with_window(query: &str, limit: usize, offset: u64) -> String {
    format!("{} LIMIT {} OFFSET {}", query, limit, offset)
}

/// Append a plain row limit to a read query.
pub fn with_limit(query: &str, limit: usize) -> String {
    format!("{} LIMIT {}", query, limit)
}

fn column_list(columns: &[String]) -> Result<String> {
    if columns.is_empty() {
        return Err(IngestError::Config(
            "column list cannot be empty".to_string(),
        ));
    }
    Ok(columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Result<Vec<_>>>()?
        .join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn chain(join_type: JoinType, steps: &[(&str, &str)]) -> JoinChain {
        JoinChain {
            join_type,
            tables: steps
                .iter()
                .map(|(t, k)| JoinTable {
                    table: t.to_string(),
                    key: k.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_build_select() {
        let sql = build_select("trades", &cols(&["price", "date"])).unwrap();
        assert_eq!(sql, "SELECT `price`, `date` FROM `trades`");
    }

    #[test]
    fn test_build_select_rejects_empty_columns() {
        assert!(build_select("trades", &[]).is_err());
    }

    #[test]
    fn test_join_chain_of_three() {
        let chain = chain(JoinType::Inner, &[("a", "k1"), ("b", "k2"), ("c", "k3")]);
        let sql = build_join_select(&chain, &cols(&["x"])).unwrap();

        assert_eq!(sql.matches("JOIN").count(), 2);
        assert!(sql.contains("INNER JOIN `b` ON `a`.`k1` = `b`.`k2`"));
        assert!(sql.contains("INNER JOIN `c` ON `b`.`k2` = `c`.`k3`"));
        // Chain order: the a-b join comes before the b-c join.
        assert!(sql.find("`b` ON").unwrap() < sql.find("`c` ON").unwrap());
    }

    #[test]
    fn test_join_types() {
        for (ty, kw) in [
            (JoinType::Left, "LEFT JOIN"),
            (JoinType::Right, "RIGHT JOIN"),
            (JoinType::Full, "FULL JOIN"),
        ] {
            let chain = chain(ty, &[("a", "k"), ("b", "k")]);
            let sql = build_join_select(&chain, &cols(&["x"])).unwrap();
            assert!(sql.contains(kw), "{}", sql);
        }
    }

    #[test]
    fn test_join_chain_too_short() {
        let chain = chain(JoinType::Inner, &[("a", "k1")]);
        let err = build_join_select(&chain, &cols(&["x"])).unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
        assert!(err.to_string().contains("two tables"));
    }

    #[test]
    fn test_build_create_table() {
        let sql = build_create_table(
            "t2",
            &[
                ("id".to_string(), ColumnType::Int64),
                ("name".to_string(), ColumnType::String),
            ],
        )
        .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `t2` (`id` Int64, `name` String) \
             ENGINE = MergeTree() ORDER BY tuple()"
        );
    }

    #[test]
    fn test_build_insert_head() {
        let sql = build_insert("t2", &cols(&["id", "name"])).unwrap();
        assert_eq!(sql, "INSERT INTO `t2` (`id`, `name`) FORMAT JSONEachRow");
    }

    #[test]
    fn test_identifiers_are_quoted_not_trusted() {
        let sql = build_select("t`; DROP TABLE x;--", &cols(&["a"])).unwrap();
        assert!(sql.contains("`t``; DROP TABLE x;--`"));
    }

    #[test]
    fn test_window_helpers() {
        assert_eq!(
            with_window("SELECT `a` FROM `t`", 1000, 2000),
            "SELECT `a` FROM `t` LIMIT 1000 OFFSET 2000"
        );
        assert_eq!(
            with_limit("SELECT `a` FROM `t`", 100),
            "SELECT `a` FROM `t` LIMIT 100"
        );
    }
}
