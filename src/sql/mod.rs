//! SQL generation
//!
//! Builds the query text sent to the engine:
//!
//! - **expr**: Quoting, time filters and time-group expressions
//! - **derived**: Precomputed time-bucket column resolution
//! - **filter**: Dimension filter predicates
//! - **template**: The fixed query shapes
//! - **macros**: `$__name(...)` expansion in user-authored SQL
//! - **error**: Error types

mod derived;
mod error;
mod expr;
mod filter;
mod macros;
mod template;

pub use derived::{parse_defining_conversion, DerivedParseError, DerivedTimeColumn, DerivedTimeColumns};
pub use error::{SqlError, SqlResult};
pub use expr::{
    bucket_aligned_range, column_expr, quote_identifier, quote_literal, time_filter_bucket_aligned_expr,
    time_filter_expr, time_group_expr, DateTimeConversion, METRIC_COLUMN_ALIAS, TIME_COLUMN_ALIAS,
};
pub use filter::{column_filter_expr, combine_filters, FilterOperator};
pub use macros::{MacroContext, MacroEngine};
pub use template::{
    DistinctValuesParams, LogSearchParams, SelectColumn, SingleMetricParams, TimeSeriesAggregateParams,
    DEFAULT_DISTINCT_VALUES_LIMIT,
};
