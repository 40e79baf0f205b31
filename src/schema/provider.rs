//! Metadata provider seam
//!
//! The compiler only needs a table's schema and its ingestion transforms.
//! Where they come from (controller API, cache, test fixture) is behind
//! [`SchemaProvider`].

use async_trait::async_trait;
use futures_util::future::try_join_all;
use std::sync::Arc;

use crate::schema::error::SchemaResult;
use crate::schema::model::{TableSchema, TransformConfig};

/// Source of table metadata
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Names of all tables
    async fn list_tables(&self) -> SchemaResult<Vec<String>>;

    /// Schema of one table
    async fn get_schema(&self, table: &str) -> SchemaResult<TableSchema>;

    /// Ingestion transforms of one table
    async fn get_transform_configs(&self, table: &str) -> SchemaResult<Vec<TransformConfig>>;
}

#[async_trait]
impl<P: SchemaProvider + ?Sized> SchemaProvider for Arc<P> {
    async fn list_tables(&self) -> SchemaResult<Vec<String>> {
        (**self).list_tables().await
    }

    async fn get_schema(&self, table: &str) -> SchemaResult<TableSchema> {
        (**self).get_schema(table).await
    }

    async fn get_transform_configs(&self, table: &str) -> SchemaResult<Vec<TransformConfig>> {
        (**self).get_transform_configs(table).await
    }
}

/// Tables whose schema declares a date-time column, in listing order
///
/// Schemas are fetched concurrently. The first failure cancels the
/// remaining fetches and is returned.
pub async fn discover_time_series_tables<P>(provider: &P) -> SchemaResult<Vec<String>>
where
    P: SchemaProvider + ?Sized,
{
    let tables = provider.list_tables().await?;

    let schemas = try_join_all(tables.iter().map(|table| provider.get_schema(table))).await?;

    let found: Vec<String> = tables
        .into_iter()
        .zip(schemas)
        .filter(|(_, schema)| schema.is_time_series())
        .map(|(table, _)| table)
        .collect();

    tracing::debug!(count = found.len(), "Discovered time-series tables");
    Ok(found)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::error::SchemaError;
    use crate::schema::model::DateTimeFieldSpec;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory provider counting schema fetches
    #[derive(Default)]
    pub(crate) struct StaticProvider {
        pub schemas: HashMap<String, TableSchema>,
        pub transforms: HashMap<String, Vec<TransformConfig>>,
        pub schema_fetches: AtomicUsize,
    }

    impl StaticProvider {
        pub fn with_table(mut self, schema: TableSchema, transforms: Vec<TransformConfig>) -> Self {
            self.transforms.insert(schema.schema_name.clone(), transforms);
            self.schemas.insert(schema.schema_name.clone(), schema);
            self
        }
    }

    #[async_trait]
    impl SchemaProvider for StaticProvider {
        async fn list_tables(&self) -> SchemaResult<Vec<String>> {
            let mut tables: Vec<String> = self.schemas.keys().cloned().collect();
            tables.sort();
            Ok(tables)
        }

        async fn get_schema(&self, table: &str) -> SchemaResult<TableSchema> {
            self.schema_fetches.fetch_add(1, Ordering::SeqCst);
            self.schemas
                .get(table)
                .cloned()
                .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))
        }

        async fn get_transform_configs(&self, table: &str) -> SchemaResult<Vec<TransformConfig>> {
            Ok(self.transforms.get(table).cloned().unwrap_or_default())
        }
    }

    pub(crate) fn time_series_schema(name: &str) -> TableSchema {
        TableSchema {
            schema_name: name.to_string(),
            date_time_fields: vec![DateTimeFieldSpec::new("ts", "LONG", "1:MILLISECONDS:EPOCH", "1:MILLISECONDS")],
            ..TableSchema::default()
        }
    }

    #[tokio::test]
    async fn test_discover_time_series_tables() {
        let provider = StaticProvider::default()
            .with_table(time_series_schema("metrics"), vec![])
            .with_table(
                TableSchema {
                    schema_name: "lookup".to_string(),
                    ..TableSchema::default()
                },
                vec![],
            )
            .with_table(time_series_schema("events"), vec![]);

        let tables = discover_time_series_tables(&provider).await.unwrap();
        assert_eq!(tables, vec!["events".to_string(), "metrics".to_string()]);
    }

    struct FailingProvider;

    #[async_trait]
    impl SchemaProvider for FailingProvider {
        async fn list_tables(&self) -> SchemaResult<Vec<String>> {
            Ok(vec!["a".to_string(), "broken".to_string()])
        }

        async fn get_schema(&self, table: &str) -> SchemaResult<TableSchema> {
            if table == "broken" {
                return Err(SchemaError::TableNotFound(table.to_string()));
            }
            Ok(time_series_schema(table))
        }

        async fn get_transform_configs(&self, _table: &str) -> SchemaResult<Vec<TransformConfig>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_discover_fails_on_first_error() {
        let err = discover_time_series_tables(&FailingProvider).await.unwrap_err();
        assert!(matches!(err, SchemaError::TableNotFound(t) if t == "broken"));
    }
}
