//! Configuration validation.

use super::Config;
use crate::error::{IngestError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.clickhouse.host.is_empty() {
        return Err(IngestError::Config("clickhouse.host is required".into()));
    }
    if config.clickhouse.database.is_empty() {
        return Err(IngestError::Config(
            "clickhouse.database is required".into(),
        ));
    }
    if config.clickhouse.user.is_empty() {
        return Err(IngestError::Config("clickhouse.user is required".into()));
    }
    if config.clickhouse.request_timeout_secs == 0 {
        return Err(IngestError::Config(
            "clickhouse.request_timeout_secs must be at least 1".into(),
        ));
    }

    if config.ingest.batch_size == 0 {
        return Err(IngestError::Config(
            "ingest.batch_size must be at least 1".into(),
        ));
    }
    if config.ingest.preview_limit == 0 {
        return Err(IngestError::Config(
            "ingest.preview_limit must be at least 1".into(),
        ));
    }

    Ok(())
}
