//! Time expression builder
//!
//! Emits the WHERE-clause time filters and the GROUP BY time-bucket
//! expressions shared by the templates and the macro engine.

use crate::sql::derived::DerivedTimeColumns;
use crate::sql::error::SqlResult;
use crate::time::{DateTimeFormat, FormatKind, Granularity, TimeRange};

/// Alias of the bucketed time column in generated queries
pub const TIME_COLUMN_ALIAS: &str = "__time";

/// Alias of the metric column in generated queries
pub const METRIC_COLUMN_ALIAS: &str = "__metric";

/// Double-quote an identifier
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Column reference, optionally addressing one key of a map column
pub fn column_expr(name: &str, key: Option<&str>) -> String {
    match key.filter(|k| !k.is_empty()) {
        Some(key) => format!("{}[{}]", quote_identifier(name), quote_literal(key)),
        None => quote_identifier(name),
    }
}

/// `"col" >= <from> AND "col" < <to>`
pub fn time_filter_expr(column: &str, format: &DateTimeFormat, range: &TimeRange) -> SqlResult<String> {
    let column = quote_identifier(column);
    Ok(format!(
        "{} >= {} AND {} < {}",
        column,
        format.encode(range.from)?,
        column,
        format.encode(range.to)?
    ))
}

/// Widen `range` outward to whole buckets
///
/// The start is floored to a bucket boundary and the end is rounded up, so
/// the aligned window always covers the requested one.
pub fn bucket_aligned_range(range: &TimeRange, bucket: &Granularity) -> SqlResult<TimeRange> {
    let from = bucket.floor(range.from)?;
    let to = bucket.ceil(range.to)?;
    Ok(TimeRange { from, to })
}

/// Time filter over the bucket-aligned window of `range`
pub fn time_filter_bucket_aligned_expr(
    column: &str,
    format: &DateTimeFormat,
    range: &TimeRange,
    bucket: &Granularity,
) -> SqlResult<String> {
    time_filter_expr(column, format, &bucket_aligned_range(range, bucket)?)
}

/// One time-group conversion of a column into millisecond buckets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeConversion {
    pub time_column: String,
    pub input_format: DateTimeFormat,
    pub output_format: DateTimeFormat,
    pub granularity: Granularity,
}

impl DateTimeConversion {
    /// Conversion of `time_column` into millisecond-epoch buckets
    pub fn to_millis(time_column: impl Into<String>, input_format: DateTimeFormat, granularity: Granularity) -> Self {
        Self {
            time_column: time_column.into(),
            input_format,
            output_format: DateTimeFormat::millis(),
            granularity,
        }
    }

    /// Live `DATETIMECONVERT(...)` call
    pub fn to_sql(&self) -> String {
        format!(
            "DATETIMECONVERT({}, {}, {}, {})",
            quote_identifier(&self.time_column),
            quote_literal(&self.input_format.to_legacy_string()),
            quote_literal(&self.output_format.to_legacy_string()),
            quote_literal(&self.granularity.to_string())
        )
    }
}

/// Group-by expression for `conversion`
///
/// Emits a reference to a matching precomputed bucket column when the table
/// defines one, and a live conversion otherwise.
pub fn time_group_expr(conversion: &DateTimeConversion, derived: &DerivedTimeColumns) -> String {
    if let Some(column) = derived.resolve(conversion) {
        tracing::debug!(
            column = %column.column_name,
            granularity = %conversion.granularity,
            "Using derived time column"
        );
        return quote_identifier(&column.column_name);
    }

    if let FormatKind::SimpleDate(pattern) = conversion.input_format.kind() {
        tracing::debug!(
            column = %conversion.time_column,
            pattern = %pattern,
            "Grouping a simple-date column with DATETIMECONVERT"
        );
    }

    conversion.to_sql()
}
