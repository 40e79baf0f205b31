//! Query model
//!
//! Structured requests accepted by the compiler, deserialized from camelCase
//! JSON tagged by `queryType`.
//!
//! # Example
//!
//! ```json
//! {
//!   "queryType": "timeSeriesBuilder",
//!   "tableName": "my_table",
//!   "metricColumn": {"name": "value"},
//!   "aggregation": "SUM",
//!   "groupByColumns": [{"name": "dim"}],
//!   "filters": [{"columnName": "fabric", "operator": "=", "valueExprs": ["'fabric_001'"]}],
//!   "granularity": "1:MINUTES",
//!   "limit": 1000
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::QueryOption;
use crate::sql::column_expr;
use crate::time::TimeRange;

/// A query request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "queryType", rename_all = "camelCase")]
pub enum QuerySpec {
    /// Aggregated or raw metric series built from structured fields
    TimeSeriesBuilder(BuilderQuery),
    /// User-authored SQL with macros
    TimeSeriesCode(CodeQuery),
    /// Log lines built from structured fields
    LogsBuilder(LogsQuery),
    /// Distinct values of one column
    DistinctValues(DistinctValuesQuery),
}

impl QuerySpec {
    pub fn table_name(&self) -> &str {
        match self {
            Self::TimeSeriesBuilder(q) => &q.table_name,
            Self::TimeSeriesCode(q) => &q.table_name,
            Self::LogsBuilder(q) => &q.table_name,
            Self::DistinctValues(q) => &q.table_name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::TimeSeriesBuilder(_) => "timeSeriesBuilder",
            Self::TimeSeriesCode(_) => "timeSeriesCode",
            Self::LogsBuilder(_) => "logsBuilder",
            Self::DistinctValues(_) => "distinctValues",
        }
    }
}

/// Column reference, optionally one key of a map column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// SQL expression for this column
    pub fn to_sql(&self) -> String {
        column_expr(&self.name, self.key.as_deref())
    }

    /// Alias, or `name['key']`, or the name
    pub fn display_name(&self) -> String {
        match (&self.alias, &self.key) {
            (Some(alias), _) if !alias.is_empty() => alias.clone(),
            (_, Some(key)) if !key.is_empty() => format!("{}['{}']", self.name, key),
            _ => self.name.clone(),
        }
    }
}

/// Aggregation applied to the metric column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Aggregation {
    /// Raw samples, no grouping
    None,
    /// `COUNT(*)`
    Count,
    /// Any other aggregation function, upper-cased
    Function(String),
}

impl Default for Aggregation {
    fn default() -> Self {
        Self::Function("SUM".to_string())
    }
}

impl Aggregation {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "" => Self::default(),
            "NONE" => Self::None,
            "COUNT" => Self::Count,
            other => Self::Function(other.to_string()),
        }
    }
}

impl From<String> for Aggregation {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Aggregation> for String {
    fn from(a: Aggregation) -> Self {
        a.to_string()
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Count => write!(f, "COUNT"),
            Self::Function(name) => write!(f, "{}", name),
        }
    }
}

/// One dimension filter entry
///
/// Values are SQL literal expressions, quoted by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionFilter {
    pub column_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub operator: String,
    #[serde(default)]
    pub value_exprs: Vec<String>,
}

impl DimensionFilter {
    pub fn new(column_name: impl Into<String>, operator: impl Into<String>, value_exprs: Vec<String>) -> Self {
        Self {
            column_name: column_name.into(),
            key: None,
            operator: operator.into(),
            value_exprs,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

/// One ORDER BY entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderByClause {
    pub column_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderByClause {
    pub fn to_sql(&self) -> String {
        format!("{} {}", column_expr(&self.column_name, self.key.as_deref()), self.direction)
    }
}

/// Time-series query built from structured fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderQuery {
    pub table_name: String,
    /// Defaults to the table's first date-time column
    #[serde(default)]
    pub time_column: Option<String>,
    #[serde(default)]
    pub metric_column: ColumnRef,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub group_by_columns: Vec<ColumnRef>,
    #[serde(default)]
    pub filters: Vec<DimensionFilter>,
    #[serde(default)]
    pub limit: Option<u64>,
    /// `N:UNIT` bucket size
    #[serde(default)]
    pub granularity: Option<String>,
    #[serde(default)]
    pub order_by: Vec<OrderByClause>,
    #[serde(default)]
    pub legend: Option<String>,
    #[serde(default)]
    pub query_options: Vec<QueryOption>,
}

/// How a code query's result is returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CodeDisplay {
    #[default]
    TimeSeries,
    Table,
}

/// User-authored SQL
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeQuery {
    pub table_name: String,
    pub sql: String,
    /// Result column holding time, `__time` by default
    #[serde(default)]
    pub time_column_alias: Option<String>,
    /// Result column holding the value, `__metric` by default
    #[serde(default)]
    pub metric_column_alias: Option<String>,
    /// Format of the result time column, millisecond epoch by default
    #[serde(default)]
    pub time_column_format: Option<String>,
    #[serde(default)]
    pub granularity: Option<String>,
    #[serde(default)]
    pub legend: Option<String>,
    #[serde(default)]
    pub display: CodeDisplay,
    #[serde(default)]
    pub query_options: Vec<QueryOption>,
}

/// Log lines built from structured fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    pub table_name: String,
    #[serde(default)]
    pub time_column: Option<String>,
    pub log_column: ColumnRef,
    #[serde(default)]
    pub metadata_columns: Vec<ColumnRef>,
    #[serde(default)]
    pub filters: Vec<DimensionFilter>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub query_options: Vec<QueryOption>,
}

/// Distinct values of one column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinctValuesQuery {
    pub table_name: String,
    pub column: ColumnRef,
    /// Restrict to the request range on this column, or on the table's
    /// first date-time column when absent
    #[serde(default)]
    pub time_column: Option<String>,
    #[serde(default)]
    pub filters: Vec<DimensionFilter>,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Request-level context
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    pub range: TimeRange,
    /// Interval suggested by the caller for bucketing
    pub interval: Option<Duration>,
    pub max_data_points: Option<u64>,
    /// Ask the engine for a trace
    pub trace: bool,
}

impl QueryContext {
    pub fn new(range: TimeRange) -> Self {
        Self {
            range,
            interval: None,
            max_data_points: None,
            trace: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_max_data_points(mut self, points: u64) -> Self {
        self.max_data_points = Some(points);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}
