//! # chronosql
//!
//! Time-domain query compiler and series pivot engine for Pinot-style
//! analytical engines.
//!
//! Structured or macro-annotated time-series requests are compiled into SQL,
//! sent to a broker, and the flat result rows are pivoted into labeled series
//! on a shared time axis.
//!
//! ## Modules
//!
//! - [`time`]: Time-column formats, granularities and ranges
//! - [`sql`]: Time expressions, filters, query templates and macro expansion
//! - [`schema`]: Table metadata, providers and the metadata cache
//! - [`series`]: Result tables, row extraction and pivoting
//! - [`client`]: Broker and controller HTTP clients
//! - [`query`]: Query model, compiler and executor
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chronosql::client::{BrokerClient, ControllerClient};
//! use chronosql::config::Config;
//! use chronosql::query::{QueryContext, QueryExecutor, QuerySpec};
//! use chronosql::schema::CachedSchemaProvider;
//! use chronosql::time::TimeRange;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let engine = Arc::new(BrokerClient::new(&config.engine)?);
//!     let schemas = Arc::new(CachedSchemaProvider::new(
//!         ControllerClient::new(&config.engine)?,
//!         config.cache.ttl(),
//!     ));
//!     let executor = QueryExecutor::new(engine, schemas, config.query.clone());
//!
//!     let spec: QuerySpec = serde_json::from_str(
//!         r#"{"queryType": "timeSeriesBuilder", "tableName": "my_table", "metricColumn": {"name": "value"}}"#,
//!     )?;
//!     let response = executor.execute(&spec, &QueryContext::new(TimeRange::last_hours(1))).await?;
//!
//!     println!("{}", response.sql());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod query;
pub mod schema;
pub mod series;
pub mod sql;
pub mod time;

// Re-export top-level types for convenience
pub use client::{BrokerClient, ClientError, ControllerClient, EngineRequest, EngineResponse, QueryEngine};

pub use config::{Config, ConfigError};

pub use query::{
    CompiledQuery, QueryCompiler, QueryContext, QueryError, QueryExecutor, QueryOutput, QueryResponse, QuerySpec,
};

pub use schema::{CachedSchemaProvider, SchemaError, SchemaProvider, TableSchema};

pub use series::{ResultTable, TimeSeriesFrame};

pub use sql::{MacroContext, MacroEngine, SqlError};

pub use time::{DateTimeFormat, FormatError, Granularity, TimeRange};
