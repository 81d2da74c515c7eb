//! Chunked delimited-file reading and writing.
//!
//! The reader yields fixed-size chunks of string-typed rows so imports
//! stay bounded in memory; the writer takes a header once and then row
//! batches. Both honor the configured single-byte delimiter.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::config::FlatFileConfig;
use crate::core::RowBatch;
use crate::error::{IngestError, Result};

/// Chunked reader over a delimited file with a header row.
#[derive(Debug)]
pub struct FileReader {
    reader: csv::Reader<File>,
    headers: Vec<String>,
}

impl FileReader {
    /// Open the file and read its header row.
    ///
    /// A missing file is an eager error, before any chunk is requested.
    pub fn open(config: &FlatFileConfig) -> Result<Self> {
        if !config.path.exists() {
            return Err(IngestError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", config.path.display()),
            )));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(config.delimiter_byte()?)
            .has_headers(true)
            .flexible(true)
            .from_path(&config.path)?;

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        Ok(Self { reader, headers })
    }

    /// Column names from the header row.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Read the next chunk of up to `size` rows.
    ///
    /// Returns `None` once the file is exhausted. Short rows are padded
    /// with empty fields so every row aligns to the header.
    pub fn next_chunk(&mut self, size: usize) -> Result<Option<Vec<Vec<String>>>> {
        let width = self.headers.len();
        let mut chunk = Vec::with_capacity(size.min(1024));
        let mut record = StringRecord::new();

        while chunk.len() < size {
            if !self.reader.read_record(&mut record)? {
                break;
            }
            let mut row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
            row.resize(width, String::new());
            chunk.push(row);
        }

        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }
}

/// Count data rows (excluding the header) in a separate pass.
///
/// Imports need the total up front for progress fractions.
pub fn count_data_rows(config: &FlatFileConfig) -> Result<u64> {
    let mut reader = FileReader::open(config)?;
    let mut count = 0u64;
    let mut record = StringRecord::new();
    while reader.reader.read_record(&mut record)? {
        count += 1;
    }
    Ok(count)
}

/// Read the header plus the first `limit` rows for a preview.
pub fn preview(config: &FlatFileConfig, limit: usize) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = FileReader::open(config)?;
    let headers = reader.headers().to_vec();
    let rows = reader.next_chunk(limit)?.unwrap_or_default();
    Ok((headers, rows))
}

/// Row writer for a delimited output file.
pub struct FileWriter {
    writer: csv::Writer<File>,
}

impl FileWriter {
    /// Create (truncate) the output file.
    pub fn create(path: &Path, delimiter: u8) -> Result<Self> {
        let writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
        Ok(Self { writer })
    }

    /// Write the header row. Called exactly once, up front.
    pub fn write_header(&mut self, columns: &[String]) -> Result<()> {
        self.writer.write_record(columns)?;
        Ok(())
    }

    /// Write a batch of rows.
    pub fn write_batch(&mut self, batch: &RowBatch) -> Result<()> {
        for row in &batch.rows {
            self.writer
                .write_record(row.iter().map(|cell| cell.render()))?;
        }
        Ok(())
    }

    /// Flush buffered output to disk.
    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
