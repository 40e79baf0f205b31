//! Result extraction and pivoting
//!
//! - **table**: Engine result tables and column types
//! - **extract**: Rows to [`Metric`]s
//! - **legend**: Series naming from legend templates
//! - **pivot**: Metrics to per-label series on a shared time axis
//! - **error**: Error types
//!
//! ```text
//! ResultTable → extract_metrics → [Metric] → pivot → TimeSeriesFrame
//! ```

mod error;
mod extract;
mod legend;
mod pivot;
mod table;

pub use error::{ExtractError, ExtractResult};
pub use extract::{decode_time, extract_metrics, ExtractionParams, Metric};
pub use legend::{default_series_name, LegendFormatter};
pub use pivot::{pivot, MetricSeries, SeriesMapper, TimeSeriesFrame};
pub use table::{ColumnType, ResultTable};

/// Extract and pivot one result table
pub fn to_frame(
    table: &ResultTable,
    params: &ExtractionParams,
    legend: &str,
    metric_name: &str,
) -> ExtractResult<TimeSeriesFrame> {
    let metrics = extract_metrics(table, params)?;
    Ok(pivot(&metrics, legend, metric_name))
}
