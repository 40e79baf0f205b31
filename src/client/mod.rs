//! Query engine and controller clients
//!
//! - **engine**: [`QueryEngine`] seam and request/response types
//! - **broker**: HTTP [`QueryEngine`] over the broker's SQL endpoint
//! - **controller**: HTTP [`SchemaProvider`](crate::schema::SchemaProvider)
//!   over the controller API
//! - **error**: Error types

mod broker;
mod controller;
mod engine;
mod error;

pub use broker::BrokerClient;
pub use controller::ControllerClient;
pub use engine::{EngineException, EngineRequest, EngineResponse, QueryEngine, QueryOption};
pub use error::{ClientError, ClientResult};
