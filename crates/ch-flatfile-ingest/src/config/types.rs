//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{IngestError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// ClickHouse connection configuration.
    pub clickhouse: ClickHouseConfig,

    /// Bearer-token auth configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Transfer behavior configuration.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// ClickHouse connection configuration (HTTP interface).
#[derive(Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// Database host.
    pub host: String,

    /// HTTP interface port (default: 8123).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name (default: "default").
    #[serde(default = "default_database")]
    pub database: String,

    /// Username (default: "default").
    #[serde(default = "default_user")]
    pub user: String,

    /// Password or token forwarded as the ClickHouse key header.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Per-request timeout in seconds (default: 300).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds (default: 10).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl ClickHouseConfig {
    /// Base URL of the HTTP interface.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// Credentials must not leak through logs or error chains.
impl std::fmt::Debug for ClickHouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Flat-file location and shape for one transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatFileConfig {
    /// Path to the delimited file.
    pub path: PathBuf,

    /// Field delimiter (single byte, default ",").
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl FlatFileConfig {
    /// Create a config with the default comma delimiter.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: default_delimiter(),
        }
    }

    /// The delimiter as a single byte for the csv reader/writer.
    pub fn delimiter_byte(&self) -> Result<u8> {
        let bytes = self.delimiter.as_bytes();
        if bytes.len() != 1 {
            return Err(IngestError::Config(format!(
                "delimiter must be a single byte, got {:?}",
                self.delimiter
            )));
        }
        Ok(bytes[0])
    }
}

/// Bearer-token auth configuration.
///
/// An empty secret disables the gate; any transfer host wanting
/// authorization sets a non-empty secret and verifies tokens before
/// starting transfers.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret. Empty disables auth.
    #[serde(default, skip_serializing)]
    pub secret: String,

    /// Issued-token lifetime in minutes (default: 30).
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
}

// The signing secret must not leak through logs either.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"[REDACTED]")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_minutes: default_token_ttl(),
        }
    }
}

impl AuthConfig {
    /// Whether the auth gate is enabled.
    pub fn enabled(&self) -> bool {
        !self.secret.is_empty()
    }
}

/// Transfer behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Rows per batch/chunk (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Default row limit for previews (default: 100).
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            preview_limit: default_preview_limit(),
        }
    }
}

// Default value functions for serde

fn default_port() -> u16 {
    8123
}

fn default_database() -> String {
    "default".to_string()
}

fn default_user() -> String {
    "default".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_token_ttl() -> i64 {
    30
}

fn default_batch_size() -> usize {
    crate::cursor::DEFAULT_BATCH_SIZE
}

fn default_preview_limit() -> usize {
    100
}
