//! Database client seam.
//!
//! The transfer engine talks to the database only through the
//! [`DatabaseClient`] trait; [`ClickHouseHttpClient`] is the concrete
//! driver over ClickHouse's HTTP interface.

mod clickhouse;

pub use clickhouse::ClickHouseHttpClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::CellValue;
use crate::error::Result;

/// Result of a read query: ordered column names plus raw wire values.
#[derive(Debug, Default)]
pub struct FetchResult {
    /// Column names in projection order.
    pub columns: Vec<String>,

    /// Rows of raw JSON cell values, aligned to `columns`.
    pub rows: Vec<Vec<Value>>,
}

/// Capabilities the engine needs from the database.
///
/// One client is opened per transfer and reused for every batch of that
/// transfer; connections are not pooled.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Execute a statement, discarding any result.
    async fn execute(&self, statement: &str) -> Result<()>;

    /// Run a read query and collect its rows.
    async fn fetch(&self, query: &str) -> Result<FetchResult>;

    /// Run a batched insert: statement head plus the row payload.
    ///
    /// Returns the number of rows sent.
    async fn insert(
        &self,
        statement: &str,
        columns: &[String],
        rows: &[Vec<CellValue>],
    ) -> Result<u64>;

    /// List table names in the connected database.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Catalog (name, native type) pairs for a table, in column order.
    async fn describe_table(&self, table: &str) -> Result<Vec<(String, String)>>;

    /// Check whether a table exists.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Row count of a table.
    async fn count_rows(&self, table: &str) -> Result<u64>;

    /// Cheap connectivity and credential check.
    async fn ping(&self) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`DatabaseClient`] used by cursor and transfer tests.
    //!
    //! Understands exactly the statement shapes the `query` module
    //! produces: quoted projections, `LIMIT n OFFSET m` windows,
    //! `CREATE TABLE IF NOT EXISTS`, and `INSERT INTO ... FORMAT
    //! JSONEachRow` heads.

    use super::*;
    use crate::error::IngestError;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    pub(crate) struct MockTable {
        pub columns: Vec<(String, String)>,
        pub rows: Vec<Vec<Value>>,
    }

    #[derive(Default)]
    pub(crate) struct MockClient {
        pub tables: Mutex<BTreeMap<String, MockTable>>,
        pub executed: Mutex<Vec<String>>,
        pub fail_ping: bool,
        /// Fail the Nth insert call (0-based) with a query error.
        pub fail_insert_at: Option<usize>,
        pub inserts: Mutex<usize>,
    }

    impl MockClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_table(
            self,
            name: &str,
            columns: &[(&str, &str)],
            rows: Vec<Vec<Value>>,
        ) -> Self {
            self.tables.lock().unwrap().insert(
                name.to_string(),
                MockTable {
                    columns: columns
                        .iter()
                        .map(|(n, t)| (n.to_string(), t.to_string()))
                        .collect(),
                    rows,
                },
            );
            self
        }

        pub fn table_rows(&self, name: &str) -> Vec<Vec<Value>> {
            self.tables
                .lock()
                .unwrap()
                .get(name)
                .map(|t| t.rows.clone())
                .unwrap_or_default()
        }

        pub fn table_columns(&self, name: &str) -> Vec<(String, String)> {
            self.tables
                .lock()
                .unwrap()
                .get(name)
                .map(|t| t.columns.clone())
                .unwrap_or_default()
        }

        fn unquote(ident: &str) -> String {
            ident
                .trim()
                .trim_matches('`')
                .replace("``", "`")
        }

        fn parse_window(query: &str) -> (&str, usize, usize) {
            let (head, offset) = match query.rsplit_once(" OFFSET ") {
                Some((head, n)) => (head, n.trim().parse().unwrap_or(0)),
                None => (query, 0),
            };
            match head.rsplit_once(" LIMIT ") {
                Some((head, n)) => (head, n.trim().parse().unwrap_or(usize::MAX), offset),
                None => (head, usize::MAX, offset),
            }
        }
    }

    #[async_trait]
    impl DatabaseClient for MockClient {
        async fn execute(&self, statement: &str) -> Result<()> {
            self.executed.lock().unwrap().push(statement.to_string());

            if let Some(rest) = statement.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
                let (table, rest) = rest
                    .split_once(" (")
                    .ok_or_else(|| IngestError::Query(format!("bad create: {}", statement)))?;
                let defs = rest
                    .split_once(") ENGINE")
                    .ok_or_else(|| IngestError::Query(format!("bad create: {}", statement)))?
                    .0;
                let columns = defs
                    .split(", ")
                    .filter_map(|def| def.rsplit_once(' '))
                    .map(|(name, ty)| (Self::unquote(name), ty.to_string()))
                    .collect();

                let mut tables = self.tables.lock().unwrap();
                tables
                    .entry(Self::unquote(table))
                    .or_insert(MockTable {
                        columns,
                        rows: Vec::new(),
                    });
            }
            Ok(())
        }

        async fn fetch(&self, query: &str) -> Result<FetchResult> {
            let (head, limit, offset) = Self::parse_window(query);

            let projection = head
                .strip_prefix("SELECT ")
                .and_then(|rest| rest.split_once(" FROM "))
                .ok_or_else(|| IngestError::Query(format!("bad select: {}", query)))?;
            let columns: Vec<String> =
                projection.0.split(", ").map(Self::unquote).collect();
            let table = Self::unquote(
                projection
                    .1
                    .split_whitespace()
                    .next()
                    .unwrap_or_default(),
            );

            let tables = self.tables.lock().unwrap();
            let mock = tables
                .get(&table)
                .ok_or_else(|| IngestError::UnknownTable(table.clone()))?;

            let indices: Vec<Option<usize>> = columns
                .iter()
                .map(|c| mock.columns.iter().position(|(n, _)| n == c))
                .collect();

            let rows = mock
                .rows
                .iter()
                .skip(offset)
                .take(limit)
                .map(|row| {
                    indices
                        .iter()
                        .map(|idx| idx.and_then(|i| row.get(i)).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .collect();

            Ok(FetchResult { columns, rows })
        }

        async fn insert(
            &self,
            statement: &str,
            columns: &[String],
            rows: &[Vec<CellValue>],
        ) -> Result<u64> {
            let seen = {
                let mut inserts = self.inserts.lock().unwrap();
                let seen = *inserts;
                *inserts += 1;
                seen
            };
            if self.fail_insert_at == Some(seen) {
                return Err(IngestError::Query("constraint violation".to_string()));
            }

            let table = statement
                .strip_prefix("INSERT INTO ")
                .and_then(|rest| rest.split_once(" ("))
                .map(|(t, _)| Self::unquote(t))
                .ok_or_else(|| IngestError::Query(format!("bad insert: {}", statement)))?;

            let mut tables = self.tables.lock().unwrap();
            let mock = tables
                .get_mut(&table)
                .ok_or_else(|| IngestError::UnknownTable(table.clone()))?;

            let indices: Vec<Option<usize>> = mock
                .columns
                .iter()
                .map(|(n, _)| columns.iter().position(|c| c == n))
                .collect();

            for row in rows {
                mock.rows.push(
                    indices
                        .iter()
                        .map(|idx| {
                            idx.and_then(|i| row.get(i))
                                .map(CellValue::to_json)
                                .unwrap_or(Value::Null)
                        })
                        .collect(),
                );
            }
            Ok(rows.len() as u64)
        }

        async fn list_tables(&self) -> Result<Vec<String>> {
            Ok(self.tables.lock().unwrap().keys().cloned().collect())
        }

        async fn describe_table(&self, table: &str) -> Result<Vec<(String, String)>> {
            self.tables
                .lock()
                .unwrap()
                .get(table)
                .map(|t| t.columns.clone())
                .ok_or_else(|| IngestError::UnknownTable(table.to_string()))
        }

        async fn table_exists(&self, table: &str) -> Result<bool> {
            Ok(self.tables.lock().unwrap().contains_key(table))
        }

        async fn count_rows(&self, table: &str) -> Result<u64> {
            self.tables
                .lock()
                .unwrap()
                .get(table)
                .map(|t| t.rows.len() as u64)
                .ok_or_else(|| IngestError::UnknownTable(table.to_string()))
        }

        async fn ping(&self) -> Result<()> {
            if self.fail_ping {
                return Err(IngestError::connection(
                    "connection refused",
                    "mock ping",
                ));
            }
            Ok(())
        }
    }
}
