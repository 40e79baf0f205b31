//! Broker REST Client
//!
//! Sends SQL to the broker's `/query/sql` endpoint and decodes the
//! response into an [`EngineResponse`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::client::engine::{EngineException, EngineRequest, EngineResponse, QueryEngine};
use crate::client::error::{ClientError, ClientResult};
use crate::config::EngineConfig;
use crate::series::{ColumnType, ResultTable};

/// Broker HTTP client
pub struct BrokerClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    database: Option<String>,
}

impl BrokerClient {
    /// Create a broker client from the engine configuration
    pub fn new(config: &EngineConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.broker_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            database: config.database.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        apply_headers(builder, self.auth_token.as_deref(), self.database.as_deref())
    }
}

/// Add bearer token and database headers
pub(crate) fn apply_headers(
    mut builder: RequestBuilder,
    auth_token: Option<&str>,
    database: Option<&str>,
) -> RequestBuilder {
    if let Some(token) = auth_token {
        builder = builder.bearer_auth(token);
    }
    if let Some(database) = database {
        builder = builder.header("database", database);
    }
    builder
}

#[async_trait]
impl QueryEngine for BrokerClient {
    async fn execute(&self, request: &EngineRequest) -> ClientResult<EngineResponse> {
        let url = format!("{}/query/sql", self.base_url);
        let body = BrokerRequest {
            sql: request.statement(),
            trace: request.trace,
        };

        tracing::debug!(url = %url, trace = request.trace, "Sending query to broker");

        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, &url))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let wire: BrokerResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        let decoded = wire.into_engine_response();
        tracing::debug!(
            rows = decoded.result_table.as_ref().map(|t| t.len()).unwrap_or(0),
            exceptions = decoded.exceptions.len(),
            time_used_ms = decoded.time_used_ms,
            "Broker responded"
        );
        Ok(decoded)
    }
}

#[derive(Debug, Serialize)]
struct BrokerRequest {
    sql: String,
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrokerResponse {
    #[serde(default)]
    result_table: Option<WireResultTable>,
    #[serde(default)]
    exceptions: Vec<WireException>,
    #[serde(default)]
    time_used_ms: u64,
    #[serde(default)]
    num_docs_scanned: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResultTable {
    data_schema: WireDataSchema,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDataSchema {
    #[serde(default)]
    column_names: Vec<String>,
    #[serde(default)]
    column_data_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireException {
    #[serde(default)]
    error_code: i32,
    #[serde(default)]
    message: String,
}

impl BrokerResponse {
    fn into_engine_response(self) -> EngineResponse {
        let result_table = self.result_table.map(|t| ResultTable {
            column_types: t
                .data_schema
                .column_data_types
                .iter()
                .map(|tag| ColumnType::parse(tag))
                .collect(),
            columns: t.data_schema.column_names,
            rows: t.rows,
        });

        EngineResponse {
            result_table,
            exceptions: self
                .exceptions
                .into_iter()
                .map(|e| EngineException {
                    error_code: e.error_code,
                    message: e.message,
                })
                .collect(),
            time_used_ms: self.time_used_ms,
            num_docs_scanned: self.num_docs_scanned,
        }
    }
}
