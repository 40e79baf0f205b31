//! Query compilation and execution
//!
//! - **ast**: Structured query requests and request context
//! - **compiler**: Requests to SQL plus result-decoding instructions
//! - **executor**: Metadata lookup, engine round trip and result decoding
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use chronosql::query::{QueryContext, QueryExecutor, QuerySpec};
//! use chronosql::time::TimeRange;
//!
//! let spec: QuerySpec = serde_json::from_str(r#"{
//!     "queryType": "timeSeriesBuilder",
//!     "tableName": "my_table",
//!     "metricColumn": {"name": "value"},
//!     "groupByColumns": [{"name": "dim"}]
//! }"#)?;
//!
//! let ctx = QueryContext::new(TimeRange::last_hours(1)).with_max_data_points(500);
//! let response = executor.execute(&spec, &ctx).await?;
//! ```

mod ast;
mod compiler;
mod error;
mod executor;

pub use ast::{
    Aggregation, BuilderQuery, CodeDisplay, CodeQuery, ColumnRef, DimensionFilter, DistinctValuesQuery, LogsQuery,
    OrderByClause, QueryContext, QuerySpec, SortDirection,
};
pub use compiler::{resolve_granularity, CompiledQuery, OutputSpec, QueryCompiler, TableMetadata};
pub use error::{QueryError, QueryResult};
pub use executor::{QueryExecutor, QueryOutput, QueryResponse};
