//! Transfer specification types.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::FlatFileConfig;
use crate::core::identifier::validate_identifier;
use crate::error::{IngestError, Result};
use crate::query::JoinChain;

/// Which side of a transfer an endpoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Database,
    File,
}

/// Everything needed to run one end-to-end transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSpec {
    /// Where rows come from.
    pub source: EndpointKind,

    /// Where rows go.
    pub target: EndpointKind,

    /// Base table: read from on export, written to on import.
    pub table: String,

    /// Ordered projection; non-empty, no duplicates.
    pub columns: Vec<String>,

    /// Optional join chain for database reads.
    #[serde(default)]
    pub join: Option<JoinChain>,

    /// File location and delimiter; required when either endpoint is a file.
    #[serde(default)]
    pub file: Option<FlatFileConfig>,

    /// Caller-supplied identifier, unique for the registry's lifetime.
    pub transfer_id: String,
}

impl TransferSpec {
    /// Validate the spec before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        if self.transfer_id.is_empty() {
            return Err(IngestError::Config("transfer_id is required".to_string()));
        }

        validate_identifier(&self.table)?;

        if self.columns.is_empty() {
            return Err(IngestError::Config(
                "columns must be non-empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            validate_identifier(column)?;
            if !seen.insert(column.as_str()) {
                return Err(IngestError::Config(format!(
                    "duplicate column {:?} in projection",
                    column
                )));
            }
        }

        if let Some(chain) = &self.join {
            chain.validate()?;
            for step in &chain.tables {
                validate_identifier(&step.table)?;
                validate_identifier(&step.key)?;
            }
        }

        let touches_file =
            self.source == EndpointKind::File || self.target == EndpointKind::File;
        if touches_file && self.file.is_none() {
            return Err(IngestError::Config(
                "file configuration is required for a file endpoint".to_string(),
            ));
        }

        Ok(())
    }
}
