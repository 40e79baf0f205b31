//! Time model
//!
//! Value types describing how time columns are encoded and how timestamps are
//! bucketed:
//!
//! - **unit**: Fixed-length time units
//! - **format**: [`DateTimeFormat`] parsing, encoding and decoding
//! - **granularity**: [`Granularity`] bucket arithmetic
//! - **range**: Half-open [`TimeRange`] of a request
//! - **error**: Error types

mod error;
mod format;
mod granularity;
mod range;
mod unit;

pub use error::{FormatError, FormatResult};
pub use format::{java_pattern_to_strftime, DateTimeFormat, FormatKind};
pub use granularity::Granularity;
pub use range::TimeRange;
pub use unit::{from_epoch_nanos, to_epoch_nanos, TimeUnit};
