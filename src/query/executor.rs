//! Query Executor
//!
//! Runs a [`QuerySpec`] end to end:
//!
//! ```text
//! QuerySpec → metadata → compile → engine → classify → extract/pivot
//! ```
//!
//! Engine answers are classified by what came back:
//!
//! | rows | exceptions | outcome   |
//! |------|------------|-----------|
//! | any  | none       | Success   |
//! | yes  | some       | Partial   |
//! | no   | some       | Failure   |
//!
//! Transport and compile failures are returned as [`QueryError`].

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{EngineException, EngineResponse, QueryEngine};
use crate::config::QueryConfig;
use crate::query::ast::{QueryContext, QuerySpec};
use crate::query::compiler::{CompiledQuery, OutputSpec, QueryCompiler, TableMetadata};
use crate::query::error::{QueryError, QueryResult};
use crate::schema::SchemaProvider;
use crate::series::{to_frame, ResultTable, TimeSeriesFrame};

/// Data returned for a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum QueryOutput {
    TimeSeries(TimeSeriesFrame),
    Table(ResultTable),
}

/// Outcome of one execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum QueryResponse {
    Success {
        sql: String,
        output: QueryOutput,
    },
    /// Rows came back together with engine exceptions
    Partial {
        sql: String,
        output: QueryOutput,
        exceptions: Vec<EngineException>,
    },
    Failure {
        sql: String,
        exceptions: Vec<EngineException>,
    },
}

impl QueryResponse {
    /// SQL sent to the engine
    pub fn sql(&self) -> &str {
        match self {
            Self::Success { sql, .. } | Self::Partial { sql, .. } | Self::Failure { sql, .. } => sql,
        }
    }

    pub fn output(&self) -> Option<&QueryOutput> {
        match self {
            Self::Success { output, .. } | Self::Partial { output, .. } => Some(output),
            Self::Failure { .. } => None,
        }
    }

    pub fn exceptions(&self) -> &[EngineException] {
        match self {
            Self::Success { .. } => &[],
            Self::Partial { exceptions, .. } | Self::Failure { exceptions, .. } => exceptions,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Compiles and runs queries against an engine
pub struct QueryExecutor {
    engine: Arc<dyn QueryEngine>,
    schemas: Arc<dyn SchemaProvider>,
    config: QueryConfig,
}

impl QueryExecutor {
    /// Create a new query executor
    pub fn new(engine: Arc<dyn QueryEngine>, schemas: Arc<dyn SchemaProvider>, config: QueryConfig) -> Self {
        Self {
            engine,
            schemas,
            config,
        }
    }

    /// Schema and derived time columns of `table`
    ///
    /// A failed transform-config lookup only disables derived columns.
    pub async fn metadata(&self, table: &str) -> QueryResult<TableMetadata> {
        let (schema, transforms) = tokio::join!(
            self.schemas.get_schema(table),
            self.schemas.get_transform_configs(table)
        );

        let schema = schema?;
        let transforms = transforms.unwrap_or_else(|e| {
            tracing::warn!(table = %table, error = %e, "Failed to load transform configs, derived time columns disabled");
            Vec::new()
        });

        Ok(TableMetadata::new(schema, &transforms))
    }

    /// Compile without executing
    pub async fn compile(&self, spec: &QuerySpec, ctx: &QueryContext) -> QueryResult<CompiledQuery> {
        if spec.table_name().trim().is_empty() {
            return Err(QueryError::Invalid("table name is required".to_string()));
        }
        let meta = self.metadata(spec.table_name()).await?;
        QueryCompiler::new(&self.config).compile(spec, ctx, &meta)
    }

    /// Compile, run and decode a query
    pub async fn execute(&self, spec: &QuerySpec, ctx: &QueryContext) -> QueryResult<QueryResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "query",
            request_id = %request_id,
            table = %spec.table_name(),
            kind = spec.kind()
        );

        self.execute_inner(spec, ctx).instrument(span).await
    }

    async fn execute_inner(&self, spec: &QuerySpec, ctx: &QueryContext) -> QueryResult<QueryResponse> {
        let start = Instant::now();
        let compiled = self.compile(spec, ctx).await?;

        let response = self.engine.execute(&compiled.engine_request(ctx.trace)).await?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            engine_ms = response.time_used_ms,
            docs_scanned = response.num_docs_scanned,
            exceptions = response.exceptions.len(),
            "Query finished"
        );

        classify(compiled, response)
    }
}

fn classify(compiled: CompiledQuery, response: EngineResponse) -> QueryResult<QueryResponse> {
    let has_columns = response.has_result();
    let has_rows = response.result_table.as_ref().is_some_and(|t| !t.rows.is_empty());
    let EngineResponse {
        result_table,
        exceptions,
        ..
    } = response;
    let CompiledQuery { sql, output, .. } = compiled;

    if !has_rows && !exceptions.is_empty() {
        for exception in &exceptions {
            tracing::warn!(code = exception.error_code, message = %exception.message, "Engine exception");
        }
        return Ok(QueryResponse::Failure { sql, exceptions });
    }

    let table = result_table.filter(|_| has_columns).unwrap_or_default();
    let output = decode(&table, &output)?;

    if exceptions.is_empty() {
        Ok(QueryResponse::Success { sql, output })
    } else {
        tracing::warn!(exceptions = exceptions.len(), "Partial result");
        Ok(QueryResponse::Partial {
            sql,
            output,
            exceptions,
        })
    }
}

fn decode(table: &ResultTable, output: &OutputSpec) -> QueryResult<QueryOutput> {
    match output {
        OutputSpec::Table => Ok(QueryOutput::Table(table.clone())),
        OutputSpec::TimeSeries { .. } if table.columns.is_empty() => Ok(QueryOutput::TimeSeries(TimeSeriesFrame::default())),
        OutputSpec::TimeSeries {
            extraction,
            legend,
            metric_name,
        } => Ok(QueryOutput::TimeSeries(to_frame(table, extraction, legend, metric_name)?)),
    }
}
