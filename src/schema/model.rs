//! Table schema and transform configuration
//!
//! Mirrors the controller's JSON shapes:
//!
//! ```json
//! {
//!   "schemaName": "airlineStats",
//!   "dimensionFieldSpecs": [{"name": "Carrier", "dataType": "STRING"}],
//!   "metricFieldSpecs": [{"name": "ArrDelay", "dataType": "INT"}],
//!   "dateTimeFieldSpecs": [{
//!     "name": "ts", "dataType": "TIMESTAMP",
//!     "format": "1:MILLISECONDS:EPOCH", "granularity": "1:MILLISECONDS"
//!   }]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::schema::error::{SchemaError, SchemaResult};
use crate::time::DateTimeFormat;

/// Dimension, metric or complex field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub data_type: String,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Date-time field with its storage format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeFieldSpec {
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    pub format: String,
    #[serde(default)]
    pub granularity: String,
}

impl DateTimeFieldSpec {
    pub fn new(name: &str, data_type: &str, format: &str, granularity: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            format: format.to_string(),
            granularity: granularity.to_string(),
        }
    }
}

/// Schema of one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    #[serde(default)]
    pub schema_name: String,
    #[serde(default, rename = "dimensionFieldSpecs")]
    pub dimension_fields: Vec<FieldSpec>,
    #[serde(default, rename = "metricFieldSpecs")]
    pub metric_fields: Vec<FieldSpec>,
    #[serde(default, rename = "dateTimeFieldSpecs")]
    pub date_time_fields: Vec<DateTimeFieldSpec>,
    #[serde(default, rename = "complexFieldSpecs")]
    pub complex_fields: Vec<FieldSpec>,
}

impl TableSchema {
    pub fn date_time_field(&self, name: &str) -> Option<&DateTimeFieldSpec> {
        self.date_time_fields.iter().find(|f| f.name == name)
    }

    /// Parsed format of a date-time column
    pub fn time_format(&self, column: &str) -> SchemaResult<DateTimeFormat> {
        let field = self
            .date_time_field(column)
            .ok_or_else(|| SchemaError::UnknownTimeColumn {
                table: self.schema_name.clone(),
                column: column.to_string(),
            })?;
        Ok(DateTimeFormat::parse(&field.format)?)
    }

    /// First declared date-time column
    pub fn default_time_column(&self) -> Option<&str> {
        self.date_time_fields.first().map(|f| f.name.as_str())
    }

    /// A table can back time series when it declares a date-time column
    pub fn is_time_series(&self) -> bool {
        !self.date_time_fields.is_empty()
    }

    /// Declared data type of any column
    pub fn data_type(&self, column: &str) -> Option<&str> {
        self.dimension_fields
            .iter()
            .chain(&self.metric_fields)
            .chain(&self.complex_fields)
            .find(|f| f.name == column)
            .map(|f| f.data_type.as_str())
            .or_else(|| self.date_time_field(column).map(|f| f.data_type.as_str()))
    }
}

/// One ingestion transform: output column and its generating expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformConfig {
    pub column_name: String,
    pub transform_function: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeUnit;

    const SCHEMA_JSON: &str = r#"{
        "schemaName": "airlineStats",
        "dimensionFieldSpecs": [{"name": "Carrier", "dataType": "STRING"}],
        "metricFieldSpecs": [{"name": "ArrDelay", "dataType": "INT"}],
        "dateTimeFieldSpecs": [
            {"name": "DaysSinceEpoch", "dataType": "INT", "format": "1:DAYS:EPOCH", "granularity": "1:DAYS"},
            {"name": "ts", "dataType": "TIMESTAMP", "format": "1:MILLISECONDS:TIMESTAMP", "granularity": "1:SECONDS"}
        ],
        "complexFieldSpecs": [{"name": "tags", "dataType": "MAP"}]
    }"#;

    #[test]
    fn test_deserialize_schema() {
        let schema: TableSchema = serde_json::from_str(SCHEMA_JSON).unwrap();
        assert_eq!(schema.schema_name, "airlineStats");
        assert_eq!(schema.dimension_fields, vec![FieldSpec::new("Carrier", "STRING")]);
        assert_eq!(schema.date_time_fields.len(), 2);
        assert_eq!(schema.default_time_column(), Some("DaysSinceEpoch"));
        assert!(schema.is_time_series());
        assert_eq!(schema.data_type("tags"), Some("MAP"));
        assert_eq!(schema.data_type("ts"), Some("TIMESTAMP"));
        assert_eq!(schema.data_type("nope"), None);
    }

    #[test]
    fn test_time_format() {
        let schema: TableSchema = serde_json::from_str(SCHEMA_JSON).unwrap();
        let days = schema.time_format("DaysSinceEpoch").unwrap();
        assert_eq!(days.unit(), TimeUnit::Days);

        assert!(matches!(
            schema.time_format("Carrier"),
            Err(SchemaError::UnknownTimeColumn { .. })
        ));
    }

    #[test]
    fn test_schema_without_time_columns() {
        let schema: TableSchema = serde_json::from_str(r#"{"schemaName": "dim_only"}"#).unwrap();
        assert!(!schema.is_time_series());
        assert_eq!(schema.default_time_column(), None);
    }
}
