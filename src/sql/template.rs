//! SQL templates
//!
//! The four query shapes generated from structured parameters. Identifiers
//! are double-quoted, string literals single-quoted, clauses are separated by
//! single spaces and every statement ends with `;`. The exact text is stable
//! so it can be snapshot-tested.
//!
//! Parameters holding `*_expr` fields take ready-made SQL fragments (see
//! [`column_expr`](crate::sql::column_expr)); table names and aliases are
//! quoted by the renderer.

use crate::sql::expr::{quote_identifier, quote_literal};

/// Default LIMIT of the distinct-values query
pub const DEFAULT_DISTINCT_VALUES_LIMIT: u64 = 100;

/// A selected column with an optional display alias
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub expr: String,
    pub alias: Option<String>,
}

impl SelectColumn {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias.filter(|a| !a.is_empty());
        self
    }

    fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.expr, quote_literal(alias)),
            None => self.expr.clone(),
        }
    }

    /// How ORDER BY refers to this column
    fn order_ref(&self) -> String {
        match &self.alias {
            Some(alias) => quote_identifier(alias),
            None => self.expr.clone(),
        }
    }
}

fn where_clause<'a>(first: impl IntoIterator<Item = &'a String>, filters: &'a [String]) -> String {
    first
        .into_iter()
        .chain(filters.iter())
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// `SELECT DISTINCT` over one column
#[derive(Debug, Clone)]
pub struct DistinctValuesParams {
    pub table_name: String,
    pub column_expr: String,
    pub time_filter_expr: Option<String>,
    pub dimension_filters: Vec<String>,
    pub limit: Option<u64>,
}

impl DistinctValuesParams {
    pub fn render(&self) -> String {
        let not_null = format!("{} IS NOT NULL", self.column_expr);
        let predicates: Vec<&String> = std::iter::once(&not_null)
            .chain(self.time_filter_expr.as_ref())
            .collect();

        format!(
            "SELECT DISTINCT {col} FROM {table} WHERE {filter} ORDER BY {col} ASC LIMIT {limit};",
            col = self.column_expr,
            table = quote_identifier(&self.table_name),
            filter = where_clause(predicates, &self.dimension_filters),
            limit = self.limit.unwrap_or(DEFAULT_DISTINCT_VALUES_LIMIT),
        )
        .trim()
        .to_string()
    }
}

/// Aggregated metric per time bucket and group
#[derive(Debug, Clone)]
pub struct TimeSeriesAggregateParams {
    pub table_name: String,
    pub group_by_columns: Vec<SelectColumn>,
    pub time_group_expr: String,
    pub time_column_alias: String,
    pub aggregation_function: String,
    pub metric_expr: String,
    pub metric_column_alias: String,
    pub time_filter_expr: String,
    pub dimension_filters: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: u64,
}

impl TimeSeriesAggregateParams {
    pub fn render(&self) -> String {
        let time_alias = quote_identifier(&self.time_column_alias);

        let mut select: Vec<String> = self.group_by_columns.iter().map(SelectColumn::render).collect();
        select.push(format!("{} AS {}", self.time_group_expr, time_alias));
        select.push(format!(
            "{}({}) AS {}",
            self.aggregation_function,
            self.metric_expr,
            quote_identifier(&self.metric_column_alias)
        ));

        let mut group_by: Vec<String> = self.group_by_columns.iter().map(|c| c.expr.clone()).collect();
        group_by.push(time_alias.clone());

        let order_by = if self.order_by.is_empty() {
            format!("{} DESC", time_alias)
        } else {
            self.order_by.join(", ")
        };

        format!(
            "SELECT {select} FROM {table} WHERE {filter} GROUP BY {group_by} ORDER BY {order_by} LIMIT {limit};",
            select = select.join(", "),
            table = quote_identifier(&self.table_name),
            filter = where_clause([&self.time_filter_expr], &self.dimension_filters),
            group_by = group_by.join(", "),
            order_by = order_by,
            limit = self.limit,
        )
        .trim()
        .to_string()
    }
}

/// Raw metric samples without aggregation
#[derive(Debug, Clone)]
pub struct SingleMetricParams {
    pub table_name: String,
    pub metric_expr: String,
    pub metric_column_alias: String,
    pub time_column: String,
    pub time_column_alias: String,
    pub time_filter_expr: String,
    pub dimension_filters: Vec<String>,
    pub limit: u64,
}

impl SingleMetricParams {
    pub fn render(&self) -> String {
        let time_alias = quote_identifier(&self.time_column_alias);
        let not_null = format!("{} IS NOT NULL", self.metric_expr);

        format!(
            "SELECT {metric} AS {metric_alias}, {time} AS {time_alias} FROM {table} WHERE {filter} ORDER BY {time_alias} DESC LIMIT {limit};",
            metric = self.metric_expr,
            metric_alias = quote_identifier(&self.metric_column_alias),
            time = quote_identifier(&self.time_column),
            time_alias = time_alias,
            table = quote_identifier(&self.table_name),
            filter = where_clause([&not_null, &self.time_filter_expr], &self.dimension_filters),
            limit = self.limit,
        )
        .trim()
        .to_string()
    }
}

/// Log lines with metadata columns
#[derive(Debug, Clone)]
pub struct LogSearchParams {
    pub table_name: String,
    pub log_column: SelectColumn,
    pub metadata_columns: Vec<SelectColumn>,
    pub time_column: String,
    pub time_filter_expr: Option<String>,
    pub dimension_filters: Vec<String>,
    pub limit: u64,
}

impl LogSearchParams {
    pub fn render(&self) -> String {
        let time = quote_identifier(&self.time_column);

        let mut select = vec![self.log_column.render()];
        select.extend(self.metadata_columns.iter().map(SelectColumn::render));
        select.push(time.clone());

        let not_null = format!("{} IS NOT NULL", self.log_column.expr);
        let predicates: Vec<&String> = std::iter::once(&not_null)
            .chain(self.time_filter_expr.as_ref())
            .collect();

        format!(
            "SELECT {select} FROM {table} WHERE {filter} ORDER BY {time} ASC, {log} ASC LIMIT {limit};",
            select = select.join(", "),
            table = quote_identifier(&self.table_name),
            filter = where_clause(predicates, &self.dimension_filters),
            time = time,
            log = self.log_column.order_ref(),
            limit = self.limit,
        )
        .trim()
        .to_string()
    }
}
