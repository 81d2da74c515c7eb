//! Error types for the ingestion library.

use thiserror::Error;

/// Main error type for transfer operations.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Configuration error (invalid YAML, missing fields, bad join chain, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database unreachable or credentials rejected.
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Statement rejected or failed on the database side.
    #[error("Query failed: {0}")]
    Query(String),

    /// Named table does not exist in the connected database.
    #[error("Table not found: {0}")]
    UnknownTable(String),

    /// Data transfer failed for a specific transfer id.
    #[error("Transfer {transfer_id} failed: {message}")]
    Transfer {
        transfer_id: String,
        message: String,
    },

    /// Bearer token missing, malformed, expired, or forged.
    #[error("Authorization error: {0}")]
    Auth(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-file parse/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl IngestError {
    /// Create a Connection error with context about where it occurred.
    pub fn connection(message: impl Into<String>, context: impl Into<String>) -> Self {
        IngestError::Connection {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Transfer error.
    pub fn transfer(transfer_id: impl Into<String>, message: impl Into<String>) -> Self {
        IngestError::Transfer {
            transfer_id: transfer_id.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, IngestError>;
