//! # ch-flatfile-ingest
//!
//! Streaming data transfer between ClickHouse and delimited flat files.
//!
//! This library provides the core engine for moving tabular data in
//! both directions with support for:
//!
//! - **Batched streaming** over a bounded `LIMIT/OFFSET` cursor
//! - **Join-chain reads** across multiple source tables
//! - **Type reconciliation** between ClickHouse types and file text
//! - **Progress tracking** per transfer via a shared registry
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ch_flatfile_ingest::{
//!     ClickHouseHttpClient, Config, ProgressRegistry, TransferEngine,
//! };
//!
//! #[tokio::main]
//! async fn main() -> ch_flatfile_ingest::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let client = Arc::new(ClickHouseHttpClient::new(&config.clickhouse)?);
//!     let engine = TransferEngine::new(client, ProgressRegistry::new(), config.ingest);
//!     for table in engine.list_tables().await? {
//!         println!("{}", table);
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod core;
pub mod cursor;
pub mod error;
pub mod flatfile;
pub mod progress;
pub mod query;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use client::{ClickHouseHttpClient, DatabaseClient, FetchResult};
pub use config::{AuthConfig, ClickHouseConfig, Config, FlatFileConfig, IngestConfig};
pub use core::{CellValue, ColumnDef, RowBatch, Schema};
pub use error::{IngestError, Result};
pub use progress::{ProgressGuard, ProgressRegistry};
pub use query::{JoinChain, JoinTable, JoinType};
pub use transfer::{EndpointKind, Preview, TransferEngine, TransferOutcome, TransferSpec};
pub use typemap::ColumnType;
