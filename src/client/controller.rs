//! Controller REST Client
//!
//! Serves table metadata from the controller:
//!
//! ```text
//! GET /tables                  table names
//! GET /tables/{table}/schema   schema
//! GET /tables/{table}          OFFLINE/REALTIME table configs
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::client::broker::apply_headers;
use crate::client::error::{ClientError, ClientResult};
use crate::config::EngineConfig;
use crate::schema::{SchemaError, SchemaProvider, SchemaResult, TableSchema, TransformConfig};

/// Controller HTTP client
pub struct ControllerClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    database: Option<String>,
}

impl ControllerClient {
    /// Create a controller client from the engine configuration
    pub fn new(config: &EngineConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.controller_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            database: config.database.clone(),
        })
    }

    fn table_url(&self, table: &str, suffix: &str) -> String {
        format!("{}/tables/{}{}", self.base_url, urlencoding::encode(table), suffix)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ClientResult<T> {
        let response = apply_headers(
            self.client.get(url),
            self.auth_token.as_deref(),
            self.database.as_deref(),
        )
        .send()
        .await
        .map_err(|e| ClientError::from_transport(e, url))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// Map a 404 on a table resource to [`SchemaError::TableNotFound`]
fn table_error(table: &str, e: ClientError) -> SchemaError {
    match e {
        ClientError::NotFound(_) => SchemaError::TableNotFound(table.to_string()),
        other => SchemaError::Client(other),
    }
}

#[async_trait]
impl SchemaProvider for ControllerClient {
    async fn list_tables(&self) -> SchemaResult<Vec<String>> {
        let url = format!("{}/tables", self.base_url);
        let list: TableList = self.get_json(&url).await?;
        Ok(list.tables)
    }

    async fn get_schema(&self, table: &str) -> SchemaResult<TableSchema> {
        let url = self.table_url(table, "/schema");
        self.get_json(&url).await.map_err(|e| table_error(table, e))
    }

    async fn get_transform_configs(&self, table: &str) -> SchemaResult<Vec<TransformConfig>> {
        let url = self.table_url(table, "");
        let configs: TableConfigs = self.get_json(&url).await.map_err(|e| table_error(table, e))?;
        Ok(configs.transform_configs())
    }
}

#[derive(Debug, Deserialize)]
struct TableList {
    #[serde(default)]
    tables: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TableConfigs {
    #[serde(rename = "OFFLINE")]
    offline: Option<TableConfig>,
    #[serde(rename = "REALTIME")]
    realtime: Option<TableConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableConfig {
    #[serde(default)]
    ingestion_config: Option<IngestionConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestionConfig {
    #[serde(default)]
    transform_configs: Vec<TransformConfig>,
}

impl TableConfigs {
    /// Transforms of both table types, first definition of a column wins
    fn transform_configs(self) -> Vec<TransformConfig> {
        let mut out: Vec<TransformConfig> = Vec::new();
        let all = [self.offline, self.realtime]
            .into_iter()
            .flatten()
            .filter_map(|c| c.ingestion_config)
            .flat_map(|i| i.transform_configs);

        for config in all {
            if !out.iter().any(|c| c.column_name == config.column_name) {
                out.push(config);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transform_configs_merged() {
        let configs: TableConfigs = serde_json::from_value(json!({
            "OFFLINE": {
                "tableName": "metrics_OFFLINE",
                "ingestionConfig": {
                    "transformConfigs": [
                        {"columnName": "ts_1m", "transformFunction": "FromEpochMinutesBucket(ToEpochMinutesBucket(ts, 1), 1)"}
                    ]
                }
            },
            "REALTIME": {
                "tableName": "metrics_REALTIME",
                "ingestionConfig": {
                    "transformConfigs": [
                        {"columnName": "ts_1m", "transformFunction": "ignored"},
                        {"columnName": "ts_1h", "transformFunction": "FromEpochHoursBucket(ToEpochHoursBucket(ts, 1), 1)"}
                    ]
                }
            }
        }))
        .unwrap();

        let transforms = configs.transform_configs();
        let names: Vec<&str> = transforms.iter().map(|t| t.column_name.as_str()).collect();
        assert_eq!(names, vec!["ts_1m", "ts_1h"]);
        assert!(transforms[0].transform_function.starts_with("FromEpochMinutes"));
    }

    #[test]
    fn test_table_without_ingestion_config() {
        let configs: TableConfigs = serde_json::from_value(json!({"OFFLINE": {"tableName": "t"}})).unwrap();
        assert!(configs.transform_configs().is_empty());
    }

    #[test]
    fn test_table_url_is_encoded() {
        let client = ControllerClient::new(&EngineConfig::default()).unwrap();
        assert_eq!(
            client.table_url("my table", "/schema"),
            "http://localhost:9000/tables/my%20table/schema"
        );
    }

    #[test]
    fn test_not_found_maps_to_table_not_found() {
        let err = table_error("t", ClientError::NotFound("url".to_string()));
        assert!(matches!(err, SchemaError::TableNotFound(t) if t == "t"));
    }
}
