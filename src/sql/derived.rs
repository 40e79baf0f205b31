//! Derived time-bucket columns
//!
//! Tables may precompute bucketed copies of their time column through
//! ingestion transforms. When a requested time-group conversion matches one
//! of these, the query references the stored column instead of converting
//! every row at query time.
//!
//! # Recognized generating expressions
//!
//! ```text
//! DATETIMECONVERT(ts, '1:MILLISECONDS:EPOCH', '1:MILLISECONDS:EPOCH', '1:MINUTES')
//! FromEpochMinutesBucket(ToEpochMinutesBucket(ts, 5), 5)
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, recognize, value},
    sequence::{delimited, pair, preceded},
    IResult,
};
use thiserror::Error;

use crate::schema::TransformConfig;
use crate::sql::expr::DateTimeConversion;
use crate::time::{DateTimeFormat, FormatError, Granularity, TimeUnit};

/// Why a generating expression was not recognized
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DerivedParseError {
    /// Expression matches none of the known shapes
    #[error("unrecognized expression: {0}")]
    Unrecognized(String),

    /// Paired epoch-bucket calls disagree on unit or bucket size
    #[error("mismatched bucket calls: ToEpoch{inner_unit:?}Bucket(_, {inner_size}) inside FromEpoch{outer_unit:?}Bucket(_, {outer_size})")]
    MismatchedBuckets {
        inner_unit: TimeUnit,
        inner_size: u64,
        outer_unit: TimeUnit,
        outer_size: u64,
    },

    /// Format or granularity literal is invalid
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// A table column holding precomputed time buckets
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTimeColumn {
    pub column_name: String,
    pub source: DateTimeConversion,
}

/// Derived time columns of one table
#[derive(Debug, Clone, Default)]
pub struct DerivedTimeColumns {
    columns: Vec<DerivedTimeColumn>,
}

impl DerivedTimeColumns {
    /// Collect every transform whose expression defines a time conversion
    pub fn from_transform_configs(configs: &[TransformConfig]) -> Self {
        let columns = configs
            .iter()
            .filter_map(|config| {
                match parse_defining_conversion(&config.transform_function) {
                    Ok(source) => Some(DerivedTimeColumn {
                        column_name: config.column_name.clone(),
                        source,
                    }),
                    Err(e) => {
                        tracing::debug!(
                            column = %config.column_name,
                            error = %e,
                            "Transform is not a time conversion"
                        );
                        None
                    }
                }
            })
            .collect();
        Self { columns }
    }

    /// Derived column computing exactly `conversion`, if any
    pub fn resolve(&self, conversion: &DateTimeConversion) -> Option<&DerivedTimeColumn> {
        self.columns.iter().find(|c| &c.source == conversion)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DerivedTimeColumn> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Resolve the conversion a transform expression computes
pub fn parse_defining_conversion(expression: &str) -> Result<DateTimeConversion, DerivedParseError> {
    let input = expression.trim();
    let unrecognized = || DerivedParseError::Unrecognized(input.to_string());

    match all_consuming(generating_expression)(input) {
        Ok((_, Generating::Convert(call))) => Ok(DateTimeConversion {
            time_column: call.column.to_string(),
            input_format: DateTimeFormat::parse(call.input_format)?,
            output_format: DateTimeFormat::parse(call.output_format)?,
            granularity: Granularity::parse(call.granularity)?,
        }),
        Ok((_, Generating::EpochBucket(call))) => {
            if call.inner_unit != call.outer_unit || call.inner_size != call.outer_size {
                return Err(DerivedParseError::MismatchedBuckets {
                    inner_unit: call.inner_unit,
                    inner_size: call.inner_size,
                    outer_unit: call.outer_unit,
                    outer_size: call.outer_size,
                });
            }
            Ok(DateTimeConversion::to_millis(
                call.column,
                DateTimeFormat::millis(),
                Granularity::new(call.outer_size, call.outer_unit)?,
            ))
        }
        Err(_) => Err(unrecognized()),
    }
}

enum Generating<'a> {
    Convert(ConvertCall<'a>),
    EpochBucket(EpochBucketCall<'a>),
}

struct ConvertCall<'a> {
    column: &'a str,
    input_format: &'a str,
    output_format: &'a str,
    granularity: &'a str,
}

struct EpochBucketCall<'a> {
    column: &'a str,
    inner_unit: TimeUnit,
    inner_size: u64,
    outer_unit: TimeUnit,
    outer_size: u64,
}

fn generating_expression(input: &str) -> IResult<&str, Generating<'_>> {
    alt((
        map(datetimeconvert_call, Generating::Convert),
        map(epoch_bucket_call, Generating::EpochBucket),
    ))(input)
}

/// DATETIMECONVERT(col, 'in', 'out', 'granularity')
fn datetimeconvert_call(input: &str) -> IResult<&str, ConvertCall<'_>> {
    let (input, _) = tag_no_case("DATETIMECONVERT")(input)?;
    let (input, _) = open_paren(input)?;
    let (input, column) = column_ref(input)?;
    let (input, _) = comma(input)?;
    let (input, input_format) = string_literal(input)?;
    let (input, _) = comma(input)?;
    let (input, output_format) = string_literal(input)?;
    let (input, _) = comma(input)?;
    let (input, granularity) = string_literal(input)?;
    let (input, _) = close_paren(input)?;

    Ok((
        input,
        ConvertCall {
            column,
            input_format,
            output_format,
            granularity,
        },
    ))
}

/// FromEpoch<U>Bucket(ToEpoch<U>Bucket(col, n), n)
fn epoch_bucket_call(input: &str) -> IResult<&str, EpochBucketCall<'_>> {
    let (input, _) = tag_no_case("FromEpoch")(input)?;
    let (input, outer_unit) = bucket_unit(input)?;
    let (input, _) = tag_no_case("Bucket")(input)?;
    let (input, _) = open_paren(input)?;
    let (input, _) = tag_no_case("ToEpoch")(input)?;
    let (input, inner_unit) = bucket_unit(input)?;
    let (input, _) = tag_no_case("Bucket")(input)?;
    let (input, _) = open_paren(input)?;
    let (input, column) = column_ref(input)?;
    let (input, _) = comma(input)?;
    let (input, inner_size) = integer(input)?;
    let (input, _) = close_paren(input)?;
    let (input, _) = comma(input)?;
    let (input, outer_size) = integer(input)?;
    let (input, _) = close_paren(input)?;

    Ok((
        input,
        EpochBucketCall {
            column,
            inner_unit,
            inner_size,
            outer_unit,
            outer_size,
        },
    ))
}

fn bucket_unit(input: &str) -> IResult<&str, TimeUnit> {
    alt((
        value(TimeUnit::Seconds, tag_no_case("Seconds")),
        value(TimeUnit::Minutes, tag_no_case("Minutes")),
        value(TimeUnit::Hours, tag_no_case("Hours")),
        value(TimeUnit::Days, tag_no_case("Days")),
    ))(input)
}

/// Bare, double-quoted or backtick-quoted column name
fn column_ref(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while1(|c| c != '"'), char('"')),
        delimited(char('`'), take_while1(|c| c != '`'), char('`')),
        recognize(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '.' || c == '$'),
        )),
    ))(input)
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    delimited(char('\''), take_while(|c| c != '\''), char('\''))(input)
}

fn integer(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| s.parse::<u64>())(input)
}

fn open_paren(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char('('), multispace0)(input)
}

fn close_paren(input: &str) -> IResult<&str, char> {
    preceded(multispace0, char(')'))(input)
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}
