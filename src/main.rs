//! chronosql CLI
//!
//! Command-line interface over the query compiler:
//! - Compile a query to SQL
//! - Run a query against a broker
//! - List tables and inspect schemas
//! - Show or generate configuration

use anyhow::{bail, Context};
use chronosql::client::{BrokerClient, ControllerClient};
use chronosql::config::{generate_default_config, Config, LoggingConfig};
use chronosql::query::{QueryContext, QueryExecutor, QueryOutput, QueryResponse, QuerySpec};
use chronosql::schema::{discover_time_series_tables, CachedSchemaProvider, SchemaProvider};
use chronosql::series::{ResultTable, TimeSeriesFrame};
use chronosql::time::TimeRange;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chronosql")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Time-series query compiler for Pinot-style engines")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (json, table)
    #[arg(short, long, default_value = "json", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the SQL for a query without running it
    Compile {
        /// Query JSON file (default: stdin)
        query: Option<PathBuf>,
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Run a query and print the result
    Run {
        /// Query JSON file (default: stdin)
        query: Option<PathBuf>,
        #[command(flatten)]
        window: WindowArgs,
        /// Ask the engine for a trace
        #[arg(long)]
        trace: bool,
    },

    /// List tables
    Tables {
        /// Only tables with a date-time column
        #[arg(long)]
        time_series: bool,
    },

    /// Print a table schema
    Schema {
        /// Table name
        table: String,
    },

    /// Show the effective config or generate a default one
    Config {
        /// Write a commented default config here instead
        #[arg(short, long)]
        init: Option<PathBuf>,
    },
}

/// Time window of a request
#[derive(Args)]
pub struct WindowArgs {
    /// Range start, epoch milliseconds
    #[arg(long, requires = "to")]
    from: Option<i64>,
    /// Range end, epoch milliseconds
    #[arg(long, requires = "from")]
    to: Option<i64>,
    /// Range ending now (e.g., 15m, 6h, 7d)
    #[arg(short, long, default_value = "1h", conflicts_with = "from")]
    last: String,
    /// Bucket interval hint (e.g., 30s, 5m)
    #[arg(short, long)]
    interval: Option<String>,
    /// Upper bound on points per series
    #[arg(long)]
    max_data_points: Option<u64>,
}

impl WindowArgs {
    fn context(&self) -> anyhow::Result<QueryContext> {
        let range = match (self.from, self.to) {
            (Some(from), Some(to)) => TimeRange::from_millis(from, to)
                .with_context(|| format!("invalid range {}..{}", from, to))?,
            _ => {
                let to = Utc::now();
                let span = chrono::Duration::from_std(parse_duration(&self.last)?)?;
                TimeRange::try_new(to - span, to).context("empty time range")?
            }
        };

        let mut ctx = QueryContext::new(range);
        if let Some(interval) = &self.interval {
            ctx = ctx.with_interval(parse_duration(interval)?);
        }
        if let Some(points) = self.max_data_points {
            ctx = ctx.with_max_data_points(points);
        }
        Ok(ctx)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Compile { query, window } => {
            let spec = read_spec(query.as_ref())?;
            let ctx = window.context()?;
            let compiled = executor(&config)?.compile(&spec, &ctx).await?;
            println!("{}", compiled.engine_request(false).statement());
        }

        Commands::Run { query, window, trace } => {
            let spec = read_spec(query.as_ref())?;
            let ctx = window.context()?.with_trace(trace);
            let response = executor(&config)?.execute(&spec, &ctx).await?;

            match cli.format.as_str() {
                "table" => print_response(&response),
                _ => println!("{}", serde_json::to_string_pretty(&response)?),
            }
            if let QueryResponse::Failure { .. } = response {
                std::process::exit(2);
            }
        }

        Commands::Tables { time_series } => {
            let controller = ControllerClient::new(&config.engine)?;
            let tables = if time_series {
                discover_time_series_tables(&controller).await?
            } else {
                controller.list_tables().await?
            };
            for table in tables {
                println!("{}", table);
            }
        }

        Commands::Schema { table } => {
            let controller = ControllerClient::new(&config.engine)?;
            let schema = controller.get_schema(&table).await?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }

        Commands::Config { init } => match init {
            Some(path) => {
                if path.exists() {
                    bail!("{} already exists", path.display());
                }
                std::fs::write(&path, generate_default_config())
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("Wrote default config to {}", path.display());
            }
            None => print!("{}", config.to_toml()?),
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("chronosql={}", logging.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn executor(config: &Config) -> anyhow::Result<QueryExecutor> {
    let engine = Arc::new(BrokerClient::new(&config.engine)?);
    let controller = ControllerClient::new(&config.engine)?;
    let schemas: Arc<dyn SchemaProvider> = if config.cache.enabled {
        Arc::new(CachedSchemaProvider::new(controller, config.cache.ttl()))
    } else {
        Arc::new(controller)
    };
    Ok(QueryExecutor::new(engine, schemas, config.query.clone()))
}

fn read_spec(path: Option<&PathBuf>) -> anyhow::Result<QuerySpec> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&text).context("invalid query JSON")
}

fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim().to_lowercase();
    let (count, unit) = s.split_at(s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len()));
    let count: u64 = count.parse().with_context(|| format!("invalid duration: {}", s))?;

    let secs = match unit {
        "ms" => return Ok(Duration::from_millis(count)),
        "s" => count,
        "m" => count * 60,
        "h" => count * 3600,
        "d" => count * 86400,
        "w" => count * 7 * 86400,
        _ => bail!("invalid duration format: {}. Use: 500ms, 30s, 15m, 6h, 7d, 1w", s),
    };
    Ok(Duration::from_secs(secs))
}

fn print_response(response: &QueryResponse) {
    for exception in response.exceptions() {
        eprintln!("engine exception {}", exception);
    }
    match response.output() {
        Some(QueryOutput::TimeSeries(frame)) => print_frame(frame),
        Some(QueryOutput::Table(table)) => print_table(table),
        None => eprintln!("query failed: {}", response.sql()),
    }
}

fn print_frame(frame: &TimeSeriesFrame) {
    let mut header = vec!["time".to_string()];
    header.extend(frame.series.iter().map(|s| s.name.clone()));
    println!("{}", header.join("\t"));

    for (i, ts) in frame.timestamps.iter().enumerate() {
        let mut row = vec![ts.to_rfc3339()];
        row.extend(frame.series.iter().map(|s| match s.values.get(i).copied().flatten() {
            Some(v) => v.to_string(),
            None => "-".to_string(),
        }));
        println!("{}", row.join("\t"));
    }
}

fn print_table(table: &ResultTable) {
    println!("{}", table.columns.join("\t"));
    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
}
