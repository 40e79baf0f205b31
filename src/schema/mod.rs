//! Table metadata
//!
//! - **model**: Schema and transform configuration types
//! - **provider**: [`SchemaProvider`] seam and table discovery
//! - **cache**: TTL single-flight cache and a caching provider
//! - **error**: Error types

mod cache;
mod error;
mod model;
mod provider;

pub use cache::{CachedSchemaProvider, MetadataCache};
pub use error::{SchemaError, SchemaResult};
pub use model::{DateTimeFieldSpec, FieldSpec, TableSchema, TransformConfig};
pub use provider::{discover_time_series_tables, SchemaProvider};

#[cfg(test)]
pub(crate) use provider::tests::{time_series_schema, StaticProvider};
