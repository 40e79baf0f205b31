//! Query Compiler
//!
//! Turns a [`QuerySpec`] into SQL text for the engine plus the instructions
//! needed to read its result.
//!
//! # Compilation
//!
//! ```text
//! timeSeriesBuilder  aggregate      → time-series aggregate shape
//!                    NONE           → single-metric shape
//! timeSeriesCode                    → macro expansion
//! logsBuilder                       → log-search shape
//! distinctValues                    → distinct-values shape
//! ```
//!
//! Aggregated results are always bucketed to millisecond epoch, so their time
//! column is read with `1:MILLISECONDS:EPOCH`. Raw results keep the column's
//! own format.

use std::time::Duration;

use crate::client::{EngineRequest, QueryOption};
use crate::config::QueryConfig;
use crate::query::ast::*;
use crate::query::error::{QueryError, QueryResult};
use crate::schema::{TableSchema, TransformConfig};
use crate::series::ExtractionParams;
use crate::sql::{
    column_filter_expr, combine_filters, time_filter_bucket_aligned_expr, time_filter_expr, time_group_expr,
    DateTimeConversion, DerivedTimeColumns, DistinctValuesParams, LogSearchParams, MacroContext, MacroEngine,
    SelectColumn, SingleMetricParams, TimeSeriesAggregateParams, METRIC_COLUMN_ALIAS, TIME_COLUMN_ALIAS,
};
use crate::time::{DateTimeFormat, Granularity, TimeRange};

/// Schema and derived time columns of one table
#[derive(Debug, Clone, Default)]
pub struct TableMetadata {
    pub schema: TableSchema,
    pub derived: DerivedTimeColumns,
}

impl TableMetadata {
    pub fn new(schema: TableSchema, transforms: &[TransformConfig]) -> Self {
        Self {
            schema,
            derived: DerivedTimeColumns::from_transform_configs(transforms),
        }
    }
}

/// How to read the engine's answer
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSpec {
    /// Pivot into series
    TimeSeries {
        extraction: ExtractionParams,
        legend: String,
        metric_name: String,
    },
    /// Return the result table as is
    Table,
}

/// Compiled query ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub options: Vec<QueryOption>,
    /// Bucket size, for time-series queries
    pub granularity: Option<Granularity>,
    pub output: OutputSpec,
}

impl CompiledQuery {
    pub fn engine_request(&self, trace: bool) -> EngineRequest {
        EngineRequest::new(self.sql.clone())
            .with_options(self.options.clone())
            .with_trace(trace)
    }
}

/// Compiles queries against one table's metadata
pub struct QueryCompiler<'a> {
    config: &'a QueryConfig,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(config: &'a QueryConfig) -> Self {
        Self { config }
    }

    /// Compile `spec` for the request described by `ctx`
    pub fn compile(&self, spec: &QuerySpec, ctx: &QueryContext, meta: &TableMetadata) -> QueryResult<CompiledQuery> {
        if spec.table_name().trim().is_empty() {
            return Err(QueryError::Invalid("table name is required".to_string()));
        }

        let compiled = match spec {
            QuerySpec::TimeSeriesBuilder(q) => self.compile_builder(q, ctx, meta)?,
            QuerySpec::TimeSeriesCode(q) => self.compile_code(q, ctx, meta)?,
            QuerySpec::LogsBuilder(q) => self.compile_logs(q, ctx, meta)?,
            QuerySpec::DistinctValues(q) => self.compile_distinct(q, ctx, meta)?,
        };

        tracing::debug!(kind = spec.kind(), sql = %compiled.sql, "Compiled query");
        Ok(compiled)
    }

    fn compile_builder(&self, q: &BuilderQuery, ctx: &QueryContext, meta: &TableMetadata) -> QueryResult<CompiledQuery> {
        if q.metric_column.name.trim().is_empty() && q.aggregation != Aggregation::Count {
            return Err(QueryError::Invalid("metric column is required".to_string()));
        }

        let time_column = resolve_time_column(q.time_column.as_deref(), &q.table_name, &meta.schema)?;
        let format = meta.schema.time_format(&time_column)?;
        let granularity = resolve_granularity(q.granularity.as_deref(), ctx, self.config.max_data_points)?;
        let filters = dimension_filters(&q.filters);
        let limit = q.limit.unwrap_or(self.config.series_limit);

        let metric_name = match q.aggregation {
            Aggregation::Count if q.metric_column.name.trim().is_empty() => "count".to_string(),
            _ => q.metric_column.display_name(),
        };

        let (sql, time_format) = match &q.aggregation {
            Aggregation::None => {
                let params = SingleMetricParams {
                    table_name: q.table_name.clone(),
                    metric_expr: q.metric_column.to_sql(),
                    metric_column_alias: METRIC_COLUMN_ALIAS.to_string(),
                    time_column: time_column.clone(),
                    time_column_alias: TIME_COLUMN_ALIAS.to_string(),
                    time_filter_expr: time_filter_expr(&time_column, &format, &ctx.range)?,
                    dimension_filters: filters,
                    limit,
                };
                (params.render(), format)
            }
            aggregation => {
                let (function, metric_expr) = match aggregation {
                    Aggregation::Count => ("COUNT".to_string(), "*".to_string()),
                    other => (other.to_string(), q.metric_column.to_sql()),
                };
                let conversion = DateTimeConversion::to_millis(time_column.clone(), format.clone(), granularity);
                let params = TimeSeriesAggregateParams {
                    table_name: q.table_name.clone(),
                    group_by_columns: q
                        .group_by_columns
                        .iter()
                        .map(|c| SelectColumn::new(c.to_sql()).with_alias(c.alias.clone()))
                        .collect(),
                    time_group_expr: time_group_expr(&conversion, &meta.derived),
                    time_column_alias: TIME_COLUMN_ALIAS.to_string(),
                    aggregation_function: function,
                    metric_expr,
                    metric_column_alias: METRIC_COLUMN_ALIAS.to_string(),
                    time_filter_expr: time_filter_bucket_aligned_expr(&time_column, &format, &ctx.range, &granularity)?,
                    dimension_filters: filters,
                    order_by: q.order_by.iter().map(OrderByClause::to_sql).collect(),
                    limit,
                };
                (params.render(), DateTimeFormat::millis())
            }
        };

        Ok(CompiledQuery {
            sql,
            options: q.query_options.clone(),
            granularity: Some(granularity),
            output: OutputSpec::TimeSeries {
                extraction: ExtractionParams {
                    time_column: TIME_COLUMN_ALIAS.to_string(),
                    metric_column: METRIC_COLUMN_ALIAS.to_string(),
                    time_format,
                },
                legend: q.legend.clone().unwrap_or_default(),
                metric_name,
            },
        })
    }

    fn compile_code(&self, q: &CodeQuery, ctx: &QueryContext, meta: &TableMetadata) -> QueryResult<CompiledQuery> {
        if q.sql.trim().is_empty() {
            return Err(QueryError::Invalid("sql is required".to_string()));
        }

        let granularity = resolve_granularity(q.granularity.as_deref(), ctx, self.config.max_data_points)?;
        let mut macros = MacroEngine::new(MacroContext {
            table_name: &q.table_name,
            schema: Some(&meta.schema),
            derived: &meta.derived,
            range: ctx.range,
            granularity,
        });
        let sql = macros.expand(&q.sql)?.trim().to_string();

        let output = match q.display {
            CodeDisplay::Table => OutputSpec::Table,
            CodeDisplay::TimeSeries => {
                let time_format = match q.time_column_format.as_deref().map(str::trim) {
                    Some(f) if !f.is_empty() => DateTimeFormat::parse(f)?,
                    _ => DateTimeFormat::millis(),
                };
                let metric_column = non_empty_or(q.metric_column_alias.as_deref(), METRIC_COLUMN_ALIAS);
                OutputSpec::TimeSeries {
                    extraction: ExtractionParams {
                        time_column: non_empty_or(q.time_column_alias.as_deref(), TIME_COLUMN_ALIAS),
                        metric_column: metric_column.clone(),
                        time_format,
                    },
                    legend: q.legend.clone().unwrap_or_default(),
                    metric_name: metric_column,
                }
            }
        };

        Ok(CompiledQuery {
            sql,
            options: q.query_options.clone(),
            granularity: Some(granularity),
            output,
        })
    }

    fn compile_logs(&self, q: &LogsQuery, ctx: &QueryContext, meta: &TableMetadata) -> QueryResult<CompiledQuery> {
        if q.log_column.name.trim().is_empty() {
            return Err(QueryError::Invalid("log column is required".to_string()));
        }

        let time_column = resolve_time_column(q.time_column.as_deref(), &q.table_name, &meta.schema)?;
        let format = meta.schema.time_format(&time_column)?;

        let params = LogSearchParams {
            table_name: q.table_name.clone(),
            log_column: SelectColumn::new(q.log_column.to_sql()).with_alias(q.log_column.alias.clone()),
            metadata_columns: q
                .metadata_columns
                .iter()
                .map(|c| SelectColumn::new(c.to_sql()).with_alias(c.alias.clone()))
                .collect(),
            time_filter_expr: Some(time_filter_expr(&time_column, &format, &ctx.range)?),
            time_column,
            dimension_filters: dimension_filters(&q.filters),
            limit: q.limit.unwrap_or(self.config.log_limit),
        };

        Ok(CompiledQuery {
            sql: params.render(),
            options: q.query_options.clone(),
            granularity: None,
            output: OutputSpec::Table,
        })
    }

    fn compile_distinct(
        &self,
        q: &DistinctValuesQuery,
        ctx: &QueryContext,
        meta: &TableMetadata,
    ) -> QueryResult<CompiledQuery> {
        if q.column.name.trim().is_empty() {
            return Err(QueryError::Invalid("column is required".to_string()));
        }

        let time_column = q
            .time_column
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| meta.schema.default_time_column());
        let time_filter = match time_column {
            Some(column) => Some(time_filter_expr(column, &meta.schema.time_format(column)?, &ctx.range)?),
            None => None,
        };

        let params = DistinctValuesParams {
            table_name: q.table_name.clone(),
            column_expr: q.column.to_sql(),
            time_filter_expr: time_filter,
            dimension_filters: dimension_filters(&q.filters),
            limit: Some(q.limit.unwrap_or(self.config.distinct_limit)),
        };

        Ok(CompiledQuery {
            sql: params.render(),
            options: Vec::new(),
            granularity: None,
            output: OutputSpec::Table,
        })
    }
}

/// Bucket size for a request
///
/// An explicit expression wins, then the caller's interval, then the range
/// split into `max_data_points` buckets. Never finer than one millisecond.
pub fn resolve_granularity(
    explicit: Option<&str>,
    ctx: &QueryContext,
    default_max_data_points: u64,
) -> QueryResult<Granularity> {
    if let Some(expr) = explicit.map(str::trim).filter(|e| !e.is_empty()) {
        return Ok(Granularity::parse(expr)?);
    }

    let derived = match ctx.interval.and_then(Granularity::from_duration) {
        Some(granularity) => Some(granularity),
        None => from_range(&ctx.range, ctx.max_data_points.unwrap_or(default_max_data_points)),
    };

    Ok(derived
        .filter(|g| g.as_nanos() >= Granularity::millisecond().as_nanos())
        .unwrap_or_else(Granularity::millisecond))
}

fn from_range(range: &TimeRange, max_data_points: u64) -> Option<Granularity> {
    let span = u64::try_from(range.duration_millis()).ok()?;
    let millis = span / max_data_points.max(1);
    Granularity::from_duration(Duration::from_millis(millis))
}

fn resolve_time_column(explicit: Option<&str>, table: &str, schema: &TableSchema) -> QueryResult<String> {
    explicit
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .or_else(|| schema.default_time_column())
        .map(str::to_string)
        .ok_or_else(|| QueryError::MissingTimeColumn(table.to_string()))
}

fn dimension_filters(filters: &[DimensionFilter]) -> Vec<String> {
    combine_filters(
        filters
            .iter()
            .map(|f| column_filter_expr(&f.column_name, f.key.as_deref(), &f.operator, &f.value_exprs)),
    )
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}
