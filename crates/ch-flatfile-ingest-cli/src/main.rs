//! ch-flatfile-ingest CLI - streaming transfers between ClickHouse and flat files.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, Level};

use ch_flatfile_ingest::{
    auth::TokenIssuer, ClickHouseHttpClient, Config, EndpointKind, FlatFileConfig, IngestError,
    JoinChain, JoinTable, JoinType, ProgressRegistry, TransferEngine, TransferSpec,
};

#[derive(Parser)]
#[command(name = "ch-flatfile-ingest")]
#[command(about = "Streaming transfers between ClickHouse and delimited flat files")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Bearer token for transfer operations
    #[arg(long)]
    token: Option<String>,

    /// Output results as JSON to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables in the configured database
    Tables,

    /// List columns and native types of a table
    Columns {
        /// Table name
        table: String,
    },

    /// Show a type-converted sample of a table
    Preview {
        /// Table name
        table: String,

        /// Comma-separated column list
        #[arg(long)]
        columns: String,

        /// Maximum rows to fetch
        #[arg(long)]
        limit: Option<usize>,

        /// Join chain as table:key pairs, e.g. "orders:user_id,users:id"
        #[arg(long)]
        join: Option<String>,

        /// Join type: inner, left, right, full
        #[arg(long, default_value = "inner")]
        join_type: String,
    },

    /// Show the header and first rows of a delimited file
    PreviewFile {
        /// Input file path
        input: PathBuf,

        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: String,

        /// Maximum rows to read
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Export a table (optionally joined) to a delimited file
    Export {
        /// Source table name
        table: String,

        /// Comma-separated column list
        #[arg(long)]
        columns: String,

        /// Output file path [default: <table>_export.csv]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: String,

        /// Join chain as table:key pairs
        #[arg(long)]
        join: Option<String>,

        /// Join type: inner, left, right, full
        #[arg(long, default_value = "inner")]
        join_type: String,

        /// Transfer identifier [default: random]
        #[arg(long)]
        transfer_id: Option<String>,
    },

    /// Import a delimited file into a table, creating it if missing
    Import {
        /// Input file path
        input: PathBuf,

        /// Target table name
        table: String,

        /// Comma-separated column list [default: the file header]
        #[arg(long)]
        columns: Option<String>,

        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: String,

        /// Transfer identifier [default: random]
        #[arg(long)]
        transfer_id: Option<String>,

        /// Print progress updates as JSON lines to stderr
        #[arg(long)]
        progress: bool,
    },

    /// Issue a bearer token signed with the configured secret
    Token {
        /// Token subject
        #[arg(long, default_value = "admin")]
        subject: String,
    },

    /// Test database connectivity
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_format, &cli.verbosity);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ch_flatfile_ingest::Result<()> {
    let config = Config::load(&cli.config)?;

    if let Commands::Token { subject } = &cli.command {
        if !config.auth.enabled() {
            return Err(IngestError::Config(
                "auth.secret must be set to issue tokens".to_string(),
            ));
        }
        let issuer = TokenIssuer::new(&config.auth.secret);
        println!("{}", issuer.issue(subject, config.auth.token_ttl_minutes)?);
        return Ok(());
    }

    let registry = ProgressRegistry::new();
    let client = Arc::new(ClickHouseHttpClient::new(&config.clickhouse)?);
    let engine = Arc::new(TransferEngine::new(
        client,
        registry.clone(),
        config.ingest.clone(),
    ));

    match cli.command {
        Commands::Tables => {
            let tables = engine.list_tables().await?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for table in tables {
                    println!("{}", table);
                }
            }
        }

        Commands::Columns { table } => {
            let columns = engine.list_columns(&table).await?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&columns)?);
            } else {
                for (name, native) in columns {
                    println!("{}\t{}", name, native);
                }
            }
        }

        Commands::Preview {
            table,
            columns,
            limit,
            join,
            join_type,
        } => {
            authorize(&config, &cli.token)?;
            let columns = parse_columns(&columns);
            let join = parse_join(join.as_deref(), &join_type)?;
            let preview = engine.preview(&table, &columns, join.as_ref(), limit).await?;

            if cli.output_json {
                let rows: Vec<Vec<serde_json::Value>> = preview
                    .rows
                    .iter()
                    .map(|row| row.iter().map(|c| c.to_json()).collect())
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "columns": preview.columns,
                        "rows": rows,
                        "schema": preview.schema,
                        "warnings": preview.warnings,
                    }))?
                );
            } else {
                println!("{}", preview.columns.join("\t"));
                for row in &preview.rows {
                    let fields: Vec<String> = row.iter().map(|c| c.render()).collect();
                    println!("{}", fields.join("\t"));
                }
                for warning in &preview.warnings {
                    eprintln!("warning: {}", warning);
                }
            }
        }

        Commands::PreviewFile {
            input,
            delimiter,
            limit,
        } => {
            let file = file_config(input, delimiter);
            let (headers, rows) = engine.preview_file(&file, limit)?;
            println!("{}", headers.join("\t"));
            for row in rows {
                println!("{}", row.join("\t"));
            }
        }

        Commands::Export {
            table,
            columns,
            output,
            delimiter,
            join,
            join_type,
            transfer_id,
        } => {
            authorize(&config, &cli.token)?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{}_export.csv", table)));
            let spec = TransferSpec {
                source: EndpointKind::Database,
                target: EndpointKind::File,
                table,
                columns: parse_columns(&columns),
                join: parse_join(join.as_deref(), &join_type)?,
                file: Some(file_config(output.clone(), delimiter)),
                transfer_id: transfer_id.unwrap_or_else(new_transfer_id),
            };

            let outcome = engine.run_transfer(&spec).await?;
            report_outcome(&outcome, cli.output_json)?;
            info!("wrote {}", output.display());
        }

        Commands::Import {
            input,
            table,
            columns,
            delimiter,
            transfer_id,
            progress,
        } => {
            authorize(&config, &cli.token)?;
            let file = file_config(input, delimiter);
            let columns = match columns {
                Some(list) => parse_columns(&list),
                None => engine.preview_file(&file, Some(1))?.0,
            };
            let spec = TransferSpec {
                source: EndpointKind::File,
                target: EndpointKind::Database,
                table,
                columns,
                join: None,
                file: Some(file),
                transfer_id: transfer_id.unwrap_or_else(new_transfer_id),
            };

            let outcome = if progress {
                run_with_progress(engine.clone(), registry.clone(), spec).await?
            } else {
                engine.run_transfer(&spec).await?
            };
            report_outcome(&outcome, cli.output_json)?;
        }

        Commands::HealthCheck => {
            engine.health_check().await?;
            println!("connection ok");
        }

        Commands::Token { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Run a transfer on its own task while polling the registry and
/// printing progress lines to stderr.
async fn run_with_progress(
    engine: Arc<TransferEngine>,
    registry: ProgressRegistry,
    spec: TransferSpec,
) -> ch_flatfile_ingest::Result<ch_flatfile_ingest::TransferOutcome> {
    let transfer_id = spec.transfer_id.clone();
    let handle = tokio::spawn(async move { engine.run_transfer(&spec).await });

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    while !handle.is_finished() {
        ticker.tick().await;
        eprintln!(
            "{}",
            serde_json::json!({
                "transfer_id": transfer_id,
                "progress": registry.get(&transfer_id),
            })
        );
    }

    handle
        .await
        .map_err(|e| IngestError::transfer(transfer_id, format!("transfer task panicked: {}", e)))?
}

fn authorize(config: &Config, token: &Option<String>) -> ch_flatfile_ingest::Result<()> {
    if !config.auth.enabled() {
        return Ok(());
    }
    let token = token
        .as_deref()
        .ok_or_else(|| IngestError::Auth("missing bearer token (use --token)".to_string()))?;
    TokenIssuer::new(&config.auth.secret).verify(token)?;
    Ok(())
}

fn report_outcome(
    outcome: &ch_flatfile_ingest::TransferOutcome,
    output_json: bool,
) -> ch_flatfile_ingest::Result<()> {
    if output_json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        println!("{}: {} rows processed", outcome.status, outcome.rows_processed);
        for warning in &outcome.warnings {
            eprintln!("warning: {}", warning);
        }
    }
    Ok(())
}

fn file_config(path: PathBuf, delimiter: String) -> FlatFileConfig {
    let mut file = FlatFileConfig::new(path);
    file.delimiter = delimiter;
    file
}

fn parse_columns(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a join chain given as "table:key,table:key" pairs.
fn parse_join(
    join: Option<&str>,
    join_type: &str,
) -> ch_flatfile_ingest::Result<Option<JoinChain>> {
    let Some(join) = join else {
        return Ok(None);
    };

    let join_type = match join_type.to_lowercase().as_str() {
        "inner" => JoinType::Inner,
        "left" => JoinType::Left,
        "right" => JoinType::Right,
        "full" => JoinType::Full,
        other => {
            return Err(IngestError::Config(format!(
                "unknown join type {:?} (expected inner, left, right, or full)",
                other
            )))
        }
    };

    let tables = join
        .split(',')
        .map(|pair| {
            pair.split_once(':')
                .map(|(table, key)| JoinTable {
                    table: table.trim().to_string(),
                    key: key.trim().to_string(),
                })
                .ok_or_else(|| {
                    IngestError::Config(format!(
                        "malformed join step {:?} (expected table:key)",
                        pair
                    ))
                })
        })
        .collect::<ch_flatfile_ingest::Result<Vec<_>>>()?;

    Ok(Some(JoinChain { join_type, tables }))
}

fn new_transfer_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn init_logging(format: &str, verbosity: &str) {
    let level = match verbosity {
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    match format {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init(),
        _ => tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init(),
    }
}
