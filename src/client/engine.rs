//! Query engine seam
//!
//! A request is SQL text plus `SET key=value;` options and a trace flag. A
//! response may carry rows and exceptions at the same time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::client::error::ClientResult;
use crate::series::ResultTable;

/// Passthrough engine option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOption {
    pub name: String,
    pub value: String,
}

impl QueryOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One statement for the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineRequest {
    pub sql: String,
    pub options: Vec<QueryOption>,
    pub trace: bool,
}

impl EngineRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: Vec<QueryOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Full statement text: option lines followed by the SQL
    pub fn statement(&self) -> String {
        let mut out = String::new();
        for option in self.options.iter().filter(|o| !o.name.trim().is_empty()) {
            out.push_str(&format!("SET {}={};\n", option.name.trim(), option.value.trim()));
        }
        out.push_str(&self.sql);
        out
    }
}

/// Exception reported by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineException {
    pub error_code: i32,
    pub message: String,
}

impl std::fmt::Display for EngineException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_code, self.message)
    }
}

/// Engine answer to one request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineResponse {
    pub result_table: Option<ResultTable>,
    pub exceptions: Vec<EngineException>,
    pub time_used_ms: u64,
    pub num_docs_scanned: u64,
}

impl EngineResponse {
    /// Whether a result table with at least one column came back
    pub fn has_result(&self) -> bool {
        self.result_table.as_ref().is_some_and(|t| !t.columns.is_empty())
    }
}

/// Executes SQL
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn execute(&self, request: &EngineRequest) -> ClientResult<EngineResponse>;
}

#[async_trait]
impl<E: QueryEngine + ?Sized> QueryEngine for Arc<E> {
    async fn execute(&self, request: &EngineRequest) -> ClientResult<EngineResponse> {
        (**self).execute(request).await
    }
}
