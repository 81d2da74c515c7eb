//! ClickHouse driver over the HTTP interface.
//!
//! Statements are POSTed to the server; reads append `FORMAT
//! JSONCompact` and parse the `{meta, data}` envelope, inserts ship the
//! row payload as a `JSONEachRow` body alongside the statement head.
//! Requests carry explicit connect and per-request timeouts so an
//! unresponsive server fails the transfer instead of stalling it.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{DatabaseClient, FetchResult};
use crate::config::ClickHouseConfig;
use crate::core::CellValue;
use crate::error::{IngestError, Result};

/// ClickHouse client speaking the HTTP interface.
pub struct ClickHouseHttpClient {
    http: Client,
    base_url: String,
    database: String,
    user: String,
    password: String,
}

/// `FORMAT JSONCompact` response envelope.
#[derive(Debug, Deserialize)]
struct JsonCompactResponse {
    meta: Vec<MetaColumn>,
    data: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct MetaColumn {
    name: String,
    #[serde(rename = "type")]
    #[allow(dead_code)]
    column_type: String,
}

impl ClickHouseHttpClient {
    /// Create a client for the given connection configuration.
    pub fn new(config: &ClickHouseConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| IngestError::connection(e.to_string(), "building HTTP client"))?;

        Ok(Self {
            http,
            base_url: config.url(),
            database: config.database.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    /// Send one request. For reads and DDL the statement is the body;
    /// for inserts it rides the `query` parameter and the body carries
    /// the rows.
    async fn send(&self, statement: Option<&str>, body: String, context: &str) -> Result<String> {
        let mut request = self
            .http
            .post(&self.base_url)
            .query(&[("database", self.database.as_str())])
            .header("X-ClickHouse-User", &self.user)
            .header("X-ClickHouse-Key", &self.password);
        if let Some(stmt) = statement {
            request = request.query(&[("query", stmt)]);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| IngestError::connection(e.to_string(), context.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IngestError::connection(e.to_string(), context.to_string()))?;

        if !status.is_success() {
            return Err(IngestError::Query(format!(
                "{} ({}): {}",
                context,
                status,
                text.trim()
            )));
        }
        Ok(text)
    }
}

#[async_trait]
impl DatabaseClient for ClickHouseHttpClient {
    async fn execute(&self, statement: &str) -> Result<()> {
        debug!("execute: {}", statement);
        self.send(None, statement.to_string(), "executing statement")
            .await?;
        Ok(())
    }

    async fn fetch(&self, query: &str) -> Result<FetchResult> {
        debug!("fetch: {}", query);
        let text = self
            .send(
                None,
                format!("{} FORMAT JSONCompact", query),
                "running query",
            )
            .await?;
        parse_json_compact(&text)
    }

    async fn insert(
        &self,
        statement: &str,
        columns: &[String],
        rows: &[Vec<CellValue>],
    ) -> Result<u64> {
        debug!("insert: {} ({} rows)", statement, rows.len());
        let mut body = String::new();
        for row in rows {
            let object: serde_json::Map<String, Value> = columns
                .iter()
                .zip(row.iter())
                .map(|(name, cell)| (name.clone(), cell.to_json()))
                .collect();
            body.push_str(&Value::Object(object).to_string());
            body.push('\n');
        }

        self.send(Some(statement), body, "inserting batch").await?;
        Ok(rows.len() as u64)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let result = self.fetch("SHOW TABLES").await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<(String, String)>> {
        let statement = format!(
            "DESCRIBE TABLE {}",
            crate::core::identifier::quote_ident(table)?
        );
        let result = self.fetch(&statement).await.map_err(|e| match e {
            IngestError::Query(msg) if msg.contains("UNKNOWN_TABLE") || msg.contains("Code: 60") => {
                IngestError::UnknownTable(table.to_string())
            }
            other => other,
        })?;

        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                let name = row.first().and_then(Value::as_str)?;
                let native = row.get(1).and_then(Value::as_str)?;
                Some((name.to_string(), native.to_string()))
            })
            .collect())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let statement = format!(
            "EXISTS TABLE {}",
            crate::core::identifier::quote_ident(table)?
        );
        let result = self.fetch(&statement).await?;
        Ok(result
            .rows
            .first()
            .and_then(|row| row.first())
            .map(|v| json_as_u64(v) == Some(1))
            .unwrap_or(false))
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        let statement = format!(
            "SELECT count() FROM {}",
            crate::core::identifier::quote_ident(table)?
        );
        let result = self.fetch(&statement).await?;
        result
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(json_as_u64)
            .ok_or_else(|| IngestError::Query(format!("count() returned no rows for {}", table)))
    }

    async fn ping(&self) -> Result<()> {
        // Any failure here means unreachable or rejected credentials;
        // surface both as connection errors before a transfer starts.
        match self.fetch("SELECT 1").await {
            Ok(_) => Ok(()),
            Err(e @ IngestError::Connection { .. }) => Err(e),
            Err(other) => Err(IngestError::connection(
                other.to_string(),
                "connection check",
            )),
        }
    }
}

/// Parse a `FORMAT JSONCompact` payload into columns and rows.
fn parse_json_compact(text: &str) -> Result<FetchResult> {
    // DDL-ish statements answer with an empty body.
    if text.trim().is_empty() {
        return Ok(FetchResult::default());
    }

    let parsed: JsonCompactResponse = serde_json::from_str(text)?;
    Ok(FetchResult {
        columns: parsed.meta.into_iter().map(|m| m.name).collect(),
        rows: parsed.data,
    })
}

/// Read a count-like cell. ClickHouse quotes 64-bit integers in JSON
/// output by default, so the value may arrive as a string.
fn json_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
