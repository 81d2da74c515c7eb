//! Transfer orchestrator.
//!
//! Drives one end-to-end transfer: resolves the read statement, walks
//! the batch cursor or the chunked file reader, reconciles every cell,
//! writes to the target, and keeps the progress registry current.
//! Batches are strictly sequential inside a transfer; failures abort
//! remaining batches but never roll back rows already written.

mod spec;

pub use spec::{EndpointKind, TransferSpec};

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::DatabaseClient;
use crate::config::{FlatFileConfig, IngestConfig};
use crate::core::{CellValue, RowBatch, Schema};
use crate::cursor::BatchCursor;
use crate::error::{IngestError, Result};
use crate::flatfile::{self, FileReader, FileWriter};
use crate::progress::ProgressRegistry;
use crate::query::{self, JoinChain};
use crate::typemap::{check_compatible, convert, infer_type, ColumnType};

/// Result of a completed transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    /// Terminal status; always "success" for a returned outcome,
    /// failures surface as errors instead.
    pub status: String,

    /// Rows moved end to end.
    pub rows_processed: u64,

    /// Type compatibility warnings collected along the way.
    pub warnings: Vec<String>,
}

impl TransferOutcome {
    fn success(rows_processed: u64, warnings: Vec<String>) -> Self {
        Self {
            status: "success".to_string(),
            rows_processed,
            warnings,
        }
    }
}

/// Converted sample rows plus schema metadata for preview operations.
#[derive(Debug)]
pub struct Preview {
    /// Projected column names.
    pub columns: Vec<String>,

    /// Type-converted sample rows.
    pub rows: Vec<Vec<CellValue>>,

    /// (column, native type) pairs; columns the base table's catalog
    /// does not list report as String.
    pub schema: Vec<(String, String)>,

    /// Compatibility warnings observed in the sample.
    pub warnings: Vec<String>,
}

/// Orchestrates transfers against one database client.
///
/// The progress registry is injected so the host can hand the same
/// handle to a polling collaborator.
pub struct TransferEngine {
    client: Arc<dyn DatabaseClient>,
    progress: ProgressRegistry,
    config: IngestConfig,
}

impl TransferEngine {
    /// Create an engine over a client and a shared progress registry.
    pub fn new(
        client: Arc<dyn DatabaseClient>,
        progress: ProgressRegistry,
        config: IngestConfig,
    ) -> Self {
        Self {
            client,
            progress,
            config,
        }
    }

    /// Latest progress fraction for a transfer, 0 when unknown.
    pub fn progress(&self, transfer_id: &str) -> f64 {
        self.progress.get(transfer_id)
    }

    /// Connectivity and credential check.
    pub async fn health_check(&self) -> Result<()> {
        self.client.ping().await
    }

    /// Table names in the connected database.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        self.client.list_tables().await
    }

    /// (name, native type) pairs for a table.
    pub async fn list_columns(&self, table: &str) -> Result<Vec<(String, String)>> {
        crate::core::identifier::validate_identifier(table)?;
        self.client.describe_table(table).await
    }

    /// Header plus first rows of a flat file.
    pub fn preview_file(
        &self,
        file: &FlatFileConfig,
        limit: Option<usize>,
    ) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        flatfile::preview(file, limit.unwrap_or(self.config.preview_limit))
    }

    /// Read a bounded, type-converted sample from the database.
    pub async fn preview(
        &self,
        table: &str,
        columns: &[String],
        join: Option<&JoinChain>,
        limit: Option<usize>,
    ) -> Result<Preview> {
        let statement = query::with_limit(
            &read_statement(table, columns, join)?,
            limit.unwrap_or(self.config.preview_limit),
        );

        let schema = self.schema_for(table).await?;
        let kinds = schema.kinds_for(columns);

        let result = self.client.fetch(&statement).await?;

        let mut warnings = Vec::new();
        let rows = result
            .rows
            .iter()
            .map(|raw_row| {
                raw_row
                    .iter()
                    .zip(kinds.iter())
                    .zip(columns.iter())
                    .map(|((raw, kind), column)| {
                        let cell = crate::typemap::decode_cell(raw, kind);
                        let compat = check_compatible(&cell, kind);
                        if let Some(reason) = compat.reason {
                            warnings.push(format!("column {}: {}", column, reason));
                        }
                        convert(cell, kind)
                    })
                    .collect()
            })
            .collect();

        let schema_map = columns
            .iter()
            .map(|c| {
                let native = schema
                    .get(c)
                    .map(|def| def.native_type.clone())
                    .unwrap_or_else(|| "String".to_string());
                (c.clone(), native)
            })
            .collect();

        Ok(Preview {
            columns: columns.to_vec(),
            rows,
            schema: schema_map,
            warnings,
        })
    }

    /// Run one end-to-end transfer.
    pub async fn run_transfer(&self, spec: &TransferSpec) -> Result<TransferOutcome> {
        spec.validate()?;

        match (spec.source, spec.target) {
            (EndpointKind::Database, EndpointKind::File) => self.export_to_file(spec).await,
            (EndpointKind::File, EndpointKind::Database) => self.import_from_file(spec).await,
            (source, target) => Err(IngestError::Config(format!(
                "unsupported source/target combination: {:?} -> {:?}",
                source, target
            ))),
        }
    }

    /// database -> file: stream batches through the cursor into a
    /// delimited file. Total row count is unknown up front in this
    /// direction, so no progress entries are kept; the row count comes
    /// back atomically in the outcome.
    async fn export_to_file(&self, spec: &TransferSpec) -> Result<TransferOutcome> {
        let file = require_file(spec)?;
        let statement = read_statement(&spec.table, &spec.columns, spec.join.as_ref())?;

        self.client.ping().await?;

        let schema = self.schema_for(&spec.table).await?;
        let kinds = schema.kinds_for(&spec.columns);

        info!(
            "{}: exporting {} to {}",
            spec.transfer_id,
            spec.table,
            file.path.display()
        );
        let start = Instant::now();

        let mut writer = FileWriter::create(&file.path, file.delimiter_byte()?)?;
        writer.write_header(&spec.columns)?;

        let mut cursor = BatchCursor::new(
            self.client.as_ref(),
            statement,
            kinds,
            self.config.batch_size,
        );

        let mut rows_processed = 0u64;
        while let Some(batch) = cursor.next_batch().await? {
            writer.write_batch(&batch)?;
            rows_processed += batch.len() as u64;
            debug!("{}: wrote batch of {} rows", spec.transfer_id, batch.len());
        }
        writer.finish()?;

        info!(
            "{}: exported {} rows in {:?}",
            spec.transfer_id,
            rows_processed,
            start.elapsed()
        );
        Ok(TransferOutcome::success(rows_processed, Vec::new()))
    }

    /// file -> database: chunked read, first-chunk type inference and
    /// table creation, per-cell compatibility checks against the live
    /// catalog, batched inserts, progress updates after every chunk.
    async fn import_from_file(&self, spec: &TransferSpec) -> Result<TransferOutcome> {
        let file = require_file(spec)?;

        self.client.ping().await?;

        let total_rows = flatfile::count_data_rows(file)?;
        let mut reader = FileReader::open(file)?;

        let headers = reader.headers().to_vec();
        let indices = spec
            .columns
            .iter()
            .map(|column| {
                headers.iter().position(|h| h == column).ok_or_else(|| {
                    IngestError::Config(format!(
                        "column {:?} not present in {}",
                        column,
                        file.path.display()
                    ))
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        info!(
            "{}: importing {} rows from {} into {}",
            spec.transfer_id,
            total_rows,
            file.path.display(),
            spec.table
        );
        let start = Instant::now();

        let _guard = self.progress.guard(&spec.transfer_id);

        let Some(first_chunk) = reader.next_chunk(self.config.batch_size)? else {
            self.progress.set(&spec.transfer_id, 100.0);
            return Ok(TransferOutcome::success(0, Vec::new()));
        };

        // One inference decision per column, applied for the whole load.
        let file_kinds = infer_column_kinds(&first_chunk, &indices);

        if !self.client.table_exists(&spec.table).await? {
            let defs: Vec<(String, ColumnType)> = spec
                .columns
                .iter()
                .cloned()
                .zip(file_kinds.iter().cloned())
                .collect();
            let create = query::build_create_table(&spec.table, &defs)?;
            info!("{}: creating table {}", spec.transfer_id, spec.table);
            self.client.execute(&create).await?;
        }

        let schema = self.schema_for(&spec.table).await?;
        let target_kinds = schema.kinds_for(&spec.columns);
        let insert = query::build_insert(&spec.table, &spec.columns)?;

        let mut rows_processed = 0u64;
        let mut warnings = Vec::new();

        let mut chunk = Some(first_chunk);
        while let Some(rows) = chunk {
            let batch = reconcile_chunk(
                &rows,
                &indices,
                &file_kinds,
                &target_kinds,
                &spec.columns,
                &mut warnings,
            );

            self.client
                .insert(&insert, &spec.columns, &batch.rows)
                .await?;

            rows_processed += batch.len() as u64;
            let fraction = completion_fraction(rows_processed, total_rows);
            self.progress.set(&spec.transfer_id, fraction);
            debug!(
                "{}: inserted chunk of {} rows ({:.1}%)",
                spec.transfer_id,
                batch.len(),
                fraction
            );

            chunk = reader.next_chunk(self.config.batch_size)?;
        }

        if !warnings.is_empty() {
            warn!(
                "{}: {} type compatibility warnings collected",
                spec.transfer_id,
                warnings.len()
            );
        }
        info!(
            "{}: imported {} rows in {:?}",
            spec.transfer_id,
            rows_processed,
            start.elapsed()
        );
        Ok(TransferOutcome::success(rows_processed, warnings))
    }

    async fn schema_for(&self, table: &str) -> Result<Schema> {
        Ok(Schema::from_describe(
            self.client.describe_table(table).await?,
        ))
    }
}

/// Resolve the read statement: join chain when one is supplied, plain
/// projection otherwise. A malformed chain errors here, before any
/// query reaches the database.
fn read_statement(table: &str, columns: &[String], join: Option<&JoinChain>) -> Result<String> {
    match join {
        Some(chain) => query::build_join_select(chain, columns),
        None => query::build_select(table, columns),
    }
}

fn require_file(spec: &TransferSpec) -> Result<&FlatFileConfig> {
    spec.file.as_ref().ok_or_else(|| {
        IngestError::Config("file configuration is required for a file endpoint".to_string())
    })
}

/// Infer one canonical type per projected column from the first chunk.
///
/// The first non-empty field decides; a column with no sample in the
/// chunk loads as String.
fn infer_column_kinds(chunk: &[Vec<String>], indices: &[usize]) -> Vec<ColumnType> {
    indices
        .iter()
        .map(|&idx| {
            chunk
                .iter()
                .filter_map(|row| row.get(idx))
                .find(|field| !field.trim().is_empty())
                .map(|field| infer_type(field))
                .unwrap_or(ColumnType::String)
        })
        .collect()
}

/// Decode, check, and convert one chunk of raw file rows.
///
/// Empty fields load as NULL; every cell is checked against the live
/// catalog type and the warning collected, then converted best-effort.
fn reconcile_chunk(
    rows: &[Vec<String>],
    indices: &[usize],
    file_kinds: &[ColumnType],
    target_kinds: &[ColumnType],
    columns: &[String],
    warnings: &mut Vec<String>,
) -> RowBatch {
    let converted = rows
        .iter()
        .map(|row| {
            indices
                .iter()
                .enumerate()
                .map(|(i, &idx)| {
                    let field = row.get(idx).map(String::as_str).unwrap_or_default();
                    let typed = if field.trim().is_empty() {
                        CellValue::Null
                    } else {
                        convert(CellValue::Text(field.to_string()), &file_kinds[i])
                    };

                    let compat = check_compatible(&typed, &target_kinds[i]);
                    if let Some(reason) = compat.reason {
                        warnings.push(format!("column {}: {}", columns[i], reason));
                    }

                    convert(typed, &target_kinds[i])
                })
                .collect()
        })
        .collect();

    RowBatch::new(converted)
}

/// Completion percentage for progress accounting.
fn completion_fraction(processed: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        processed as f64 / total as f64 * 100.0
    }
}
