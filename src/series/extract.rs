//! Row decoding
//!
//! Turns each result row into a [`Metric`]: the designated time column gives
//! the timestamp, the metric column the value, and every other column is a
//! label. Label names are sorted so every metric of one table carries the
//! same label order.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::series::error::{ExtractError, ExtractResult};
use crate::series::table::{ColumnType, ResultTable};
use crate::time::{DateTimeFormat, FormatError, FormatKind};

/// Which columns hold time and value, and how time is encoded
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionParams {
    pub time_column: String,
    pub metric_column: String,
    pub time_format: DateTimeFormat,
}

/// One decoded row
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub timestamp: DateTime<Utc>,
    /// `None` when the engine returned null
    pub value: Option<f64>,
    pub labels: Vec<(String, String)>,
}

/// Decode every row of `table`
///
/// Rows with a null time value are skipped.
pub fn extract_metrics(table: &ResultTable, params: &ExtractionParams) -> ExtractResult<Vec<Metric>> {
    let time_idx = table
        .column_index(&params.time_column)
        .ok_or_else(|| ExtractError::MissingColumn(params.time_column.clone()))?;
    let metric_idx = table
        .column_index(&params.metric_column)
        .ok_or_else(|| ExtractError::MissingColumn(params.metric_column.clone()))?;

    let mut dimensions: Vec<(usize, &str)> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != time_idx && *i != metric_idx)
        .map(|(i, name)| (i, name.as_str()))
        .collect();
    dimensions.sort_by(|a, b| a.1.cmp(b.1));

    let time_type = table.column_type(time_idx);
    let metric_type = table.column_type(metric_idx);
    if !metric_type.is_numeric() {
        tracing::warn!(
            column = %params.metric_column,
            column_type = %metric_type,
            "Unsupported metric column type, values read as zero"
        );
    }

    let mut metrics = Vec::with_capacity(table.rows.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        if row.len() < table.columns.len() {
            return Err(ExtractError::ShortRow {
                row: row_idx,
                len: row.len(),
                expected: table.columns.len(),
            });
        }

        let raw_time = &row[time_idx];
        if raw_time.is_null() {
            tracing::debug!(row = row_idx, "Skipping row without a time value");
            continue;
        }
        let timestamp = decode_time(raw_time, &time_type, &params.time_format).map_err(|source| {
            ExtractError::Time {
                row: row_idx,
                value: raw_time.to_string(),
                source,
            }
        })?;

        let labels = dimensions
            .iter()
            .map(|(i, name)| (name.to_string(), decode_label(&row[*i])))
            .collect();

        metrics.push(Metric {
            timestamp,
            value: decode_metric(&row[metric_idx], &metric_type),
            labels,
        });
    }

    Ok(metrics)
}

/// Decode one time value according to its column format
pub fn decode_time(value: &Value, column_type: &ColumnType, format: &DateTimeFormat) -> Result<DateTime<Utc>, FormatError> {
    let decode_error = || FormatError::Decode {
        value: value.to_string(),
        format: format.to_string(),
    };

    match (format.kind(), value) {
        (FormatKind::Epoch, Value::Number(n)) => {
            let count = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(decode_error)?;
            format.from_epoch_count(count)
        }
        // TIMESTAMP columns come back as "yyyy-MM-dd HH:mm:ss.S" text
        (FormatKind::Epoch, Value::String(s)) if *column_type == ColumnType::Timestamp => {
            match NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f") {
                Ok(dt) => Ok(dt.and_utc()),
                Err(_) => format.parse_date_text(s),
            }
        }
        (FormatKind::Epoch, Value::String(s)) => format.parse_date_text(s),
        (FormatKind::SimpleDate(_), Value::String(s)) => format.parse_date_text(s),
        (FormatKind::SimpleDate(_), Value::Number(n)) => format.parse_date_text(&n.to_string()),
        _ => Err(decode_error()),
    }
}

fn decode_metric(value: &Value, column_type: &ColumnType) -> Option<f64> {
    if value.is_null() {
        return None;
    }
    if !column_type.is_numeric() {
        return Some(0.0);
    }
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn decode_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> ExtractionParams {
        ExtractionParams {
            time_column: "__time".to_string(),
            metric_column: "__metric".to_string(),
            time_format: DateTimeFormat::millis(),
        }
    }

    fn table(rows: Vec<Vec<Value>>) -> ResultTable {
        ResultTable::new(
            vec!["zone".into(), "__time".into(), "host".into(), "__metric".into()],
            vec![ColumnType::String, ColumnType::Long, ColumnType::String, ColumnType::Double],
            rows,
        )
    }

    #[test]
    fn test_extract_sorts_labels() {
        let metrics = extract_metrics(
            &table(vec![vec![json!("eu"), json!(60_000), json!("a"), json!(1.5)]]),
            &params(),
        )
        .unwrap();

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].timestamp.timestamp_millis(), 60_000);
        assert_eq!(metrics[0].value, Some(1.5));
        assert_eq!(
            metrics[0].labels,
            vec![("host".to_string(), "a".to_string()), ("zone".to_string(), "eu".to_string())]
        );
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let mut p = params();
        p.metric_column = "value".to_string();
        assert_eq!(
            extract_metrics(&table(vec![]), &p).unwrap_err(),
            ExtractError::MissingColumn("value".to_string())
        );
    }

    #[test]
    fn test_nulls() {
        let metrics = extract_metrics(
            &table(vec![
                vec![json!(null), json!(1000), json!(7), json!(null)],
                vec![json!("eu"), json!(null), json!("a"), json!(2.0)],
            ]),
            &params(),
        )
        .unwrap();

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value, None);
        assert_eq!(
            metrics[0].labels,
            vec![("host".to_string(), "7".to_string()), ("zone".to_string(), "null".to_string())]
        );
    }

    #[test]
    fn test_unsupported_metric_type_reads_zero() {
        let table = ResultTable::new(
            vec!["__time".into(), "__metric".into()],
            vec![ColumnType::Long, ColumnType::Unsupported("INT_ARRAY".to_string())],
            vec![vec![json!(1), json!([1, 2])]],
        );
        let metrics = extract_metrics(&table, &params()).unwrap();
        assert_eq!(metrics[0].value, Some(0.0));
    }

    #[test]
    fn test_short_row() {
        let err = extract_metrics(&table(vec![vec![json!("eu")]]), &params()).unwrap_err();
        assert!(matches!(err, ExtractError::ShortRow { row: 0, len: 1, expected: 4 }));
    }

    #[test]
    fn test_decode_time_formats() {
        let seconds = DateTimeFormat::parse("1:SECONDS:EPOCH").unwrap();
        let t = decode_time(&json!(90), &ColumnType::Long, &seconds).unwrap();
        assert_eq!(t.timestamp(), 90);

        let five_minutes = DateTimeFormat::parse("5:MINUTES:EPOCH").unwrap();
        let t = decode_time(&json!(2), &ColumnType::Long, &five_minutes).unwrap();
        assert_eq!(t.timestamp(), 600);

        let t = decode_time(
            &json!("1970-01-01 00:01:00.0"),
            &ColumnType::Timestamp,
            &DateTimeFormat::parse("TIMESTAMP").unwrap(),
        )
        .unwrap();
        assert_eq!(t.timestamp(), 60);

        let sdf = DateTimeFormat::parse("1:DAYS:SIMPLE_DATE_FORMAT:yyyy-MM-dd").unwrap();
        let t = decode_time(&json!("1970-01-02"), &ColumnType::String, &sdf).unwrap();
        assert_eq!(t.timestamp(), 86_400);

        assert!(decode_time(&json!(true), &ColumnType::Boolean, &seconds).is_err());
    }
}
