//! Batch cursor over a windowed read query.
//!
//! Produces a lazy, finite, forward-only sequence of row batches by
//! re-issuing the base query with a `LIMIT batch OFFSET n` window. An
//! empty result ends the sequence. The cursor is not restartable and
//! offers no snapshot guarantee: a source mutating between windows can
//! shift rows across window boundaries.

use crate::client::DatabaseClient;
use crate::core::RowBatch;
use crate::error::Result;
use crate::query;
use crate::typemap::{decode_cell, ColumnType};

/// Default rows per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Resumable bounded-memory producer of row batches.
pub struct BatchCursor<'a> {
    client: &'a dyn DatabaseClient,
    base_query: String,
    kinds: Vec<ColumnType>,
    batch_size: usize,
    offset: u64,
    exhausted: bool,
}

impl<'a> BatchCursor<'a> {
    /// Create a cursor over `base_query`, decoding each projected column
    /// under its canonical type.
    pub fn new(
        client: &'a dyn DatabaseClient,
        base_query: String,
        kinds: Vec<ColumnType>,
        batch_size: usize,
    ) -> Self {
        Self {
            client,
            base_query,
            kinds,
            batch_size: batch_size.max(1),
            offset: 0,
            exhausted: false,
        }
    }

    /// Fetch the next batch, or `None` once the source is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<RowBatch>> {
        if self.exhausted {
            return Ok(None);
        }

        let windowed = query::with_window(&self.base_query, self.batch_size, self.offset);
        let result = self.client.fetch(&windowed).await?;

        if result.rows.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        self.offset += self.batch_size as u64;

        let rows = result
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.kinds.iter())
                    .map(|(raw, kind)| decode_cell(raw, kind))
                    .collect()
            })
            .collect();

        Ok(Some(RowBatch::new(rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::MockClient;
    use crate::core::CellValue;
    use serde_json::json;

    fn client_with_rows(n: i64) -> MockClient {
        let rows = (0..n).map(|i| vec![json!(i)]).collect();
        MockClient::new().with_table("t", &[("id", "Int64")], rows)
    }

    #[tokio::test]
    async fn test_cursor_batch_counts() {
        // 7 rows, batch size 3: expect batches of 3, 3, 1, then None.
        let client = client_with_rows(7);
        let mut cursor = BatchCursor::new(
            &client,
            "SELECT `id` FROM `t`".to_string(),
            vec![ColumnType::Int64],
            3,
        );

        let mut lengths = Vec::new();
        while let Some(batch) = cursor.next_batch().await.unwrap() {
            lengths.push(batch.len());
        }
        assert_eq!(lengths, vec![3, 3, 1]);
        assert_eq!(lengths.iter().sum::<usize>(), 7);
    }

    #[tokio::test]
    async fn test_cursor_exact_multiple() {
        // 6 rows, batch size 3: two full batches, then the empty fetch
        // flips the cursor to exhausted.
        let client = client_with_rows(6);
        let mut cursor = BatchCursor::new(
            &client,
            "SELECT `id` FROM `t`".to_string(),
            vec![ColumnType::Int64],
            3,
        );

        let mut count = 0;
        while let Some(batch) = cursor.next_batch().await.unwrap() {
            assert!(!batch.is_empty());
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_cursor_stays_exhausted() {
        let client = client_with_rows(1);
        let mut cursor = BatchCursor::new(
            &client,
            "SELECT `id` FROM `t`".to_string(),
            vec![ColumnType::Int64],
            5,
        );

        assert!(cursor.next_batch().await.unwrap().is_some());
        assert!(cursor.next_batch().await.unwrap().is_none());
        assert!(cursor.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cursor_empty_source() {
        let client = client_with_rows(0);
        let mut cursor = BatchCursor::new(
            &client,
            "SELECT `id` FROM `t`".to_string(),
            vec![ColumnType::Int64],
            5,
        );
        assert!(cursor.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cursor_decodes_under_kinds() {
        let client = MockClient::new().with_table(
            "t",
            &[("id", "UInt64"), ("note", "String")],
            vec![vec![json!("11"), json!("x")]],
        );
        let mut cursor = BatchCursor::new(
            &client,
            "SELECT `id`, `note` FROM `t`".to_string(),
            vec![ColumnType::Int64, ColumnType::String],
            10,
        );

        let batch = cursor.next_batch().await.unwrap().unwrap();
        // Quoted 64-bit integer decodes to an integer cell.
        assert_eq!(batch.rows[0][0], CellValue::Int(11));
        assert_eq!(batch.rows[0][1], CellValue::Text("x".into()));
    }
}
