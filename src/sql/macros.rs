//! Macro expansion for user-authored SQL
//!
//! Expands `$__name` and `$__name(arg, ...)` placeholders using the table,
//! schema, time range and granularity of the request.
//!
//! # Macros
//!
//! ```text
//! $__table()                          "table"
//! $__timeFilter(col[, granularity])   bucket-aligned filter in the column's format
//! $__timeGroup(col[, granularity])    time-bucket expression
//! $__timeFrom(col) / $__timeTo(col)   range bounds in the column's format
//! $__timeAlias() / $__metricAlias()   "__time" / "__metric"
//! $__timeFilterMillis(col[, gran])    bucket-aligned filter, millisecond epoch
//! $__timeFromMillis() / $__timeToMillis()
//! $__granularityMillis([granularity])
//! $__panelMillis()                    range length in milliseconds
//! ```
//!
//! `*Millis` names are matched before the shorter names they start with, and
//! matches never overlap. Every expansion is padded with one space on each
//! side.

use regex::Regex;
use std::collections::HashMap;

use crate::schema::TableSchema;
use crate::sql::derived::DerivedTimeColumns;
use crate::sql::error::{SqlError, SqlResult};
use crate::sql::expr::{
    quote_identifier, time_filter_bucket_aligned_expr, time_group_expr, DateTimeConversion,
    METRIC_COLUMN_ALIAS, TIME_COLUMN_ALIAS,
};
use crate::time::{DateTimeFormat, Granularity, TimeRange};

/// Macro names in match precedence order
const MACRO_NAMES: &[&str] = &[
    "timeFilterMillis",
    "timeFromMillis",
    "timeToMillis",
    "timeFilter",
    "timeFrom",
    "timeTo",
    "timeGroup",
    "timeAlias",
    "metricAlias",
    "granularityMillis",
    "panelMillis",
    "table",
];

/// Request context macros expand against
#[derive(Debug, Clone)]
pub struct MacroContext<'a> {
    pub table_name: &'a str,
    pub schema: Option<&'a TableSchema>,
    pub derived: &'a DerivedTimeColumns,
    pub range: TimeRange,
    /// Bucket used when a macro is not given an explicit granularity
    pub granularity: Granularity,
}

/// Expands macros for one query execution
///
/// Compiled matchers are cached on the instance.
pub struct MacroEngine<'a> {
    ctx: MacroContext<'a>,
    matchers: HashMap<&'static str, Regex>,
}

struct Invocation {
    name: &'static str,
    start: usize,
    end: usize,
    args: Vec<String>,
}

impl<'a> MacroEngine<'a> {
    pub fn new(ctx: MacroContext<'a>) -> Self {
        Self {
            ctx,
            matchers: HashMap::new(),
        }
    }

    /// Expand every macro in `sql`
    pub fn expand(&mut self, sql: &str) -> SqlResult<String> {
        let invocations = self.find_invocations(sql);

        let mut out = String::with_capacity(sql.len());
        let mut cursor = 0;
        for invocation in invocations {
            let expansion = self.generate(&invocation).map_err(|source| {
                let (line, column) = line_and_column(sql, invocation.start);
                SqlError::Macro {
                    name: invocation.name.to_string(),
                    line,
                    column,
                    source: Box::new(source),
                }
            })?;
            out.push_str(&sql[cursor..invocation.start]);
            out.push(' ');
            out.push_str(&expansion);
            out.push(' ');
            cursor = invocation.end;
        }
        out.push_str(&sql[cursor..]);
        Ok(out)
    }

    fn matcher(&mut self, name: &'static str) -> &Regex {
        self.matchers.entry(name).or_insert_with(|| {
            Regex::new(&format!(r"\$__{}\b(?:\(([^)]*)\))?", name)).unwrap_or_else(|e| {
                unreachable!("macro pattern for {} is invalid: {}", name, e)
            })
        })
    }

    /// Non-overlapping invocations ordered by position
    fn find_invocations(&mut self, sql: &str) -> Vec<Invocation> {
        let mut found: Vec<Invocation> = Vec::new();

        for &name in MACRO_NAMES {
            let matcher = self.matcher(name).clone();
            for caps in matcher.captures_iter(sql) {
                let Some(whole) = caps.get(0) else { continue };
                let overlaps = found
                    .iter()
                    .any(|f| whole.start() < f.end && f.start < whole.end());
                if overlaps {
                    continue;
                }
                let args = caps.get(1).map(|m| split_args(m.as_str())).unwrap_or_default();
                found.push(Invocation {
                    name,
                    start: whole.start(),
                    end: whole.end(),
                    args,
                });
            }
        }

        found.sort_by_key(|i| i.start);
        found
    }

    fn generate(&self, invocation: &Invocation) -> SqlResult<String> {
        let args = &invocation.args;
        let ctx = &self.ctx;

        match invocation.name {
            "table" => {
                expect_args(args, 0, 0)?;
                Ok(quote_identifier(ctx.table_name))
            }
            "timeAlias" => {
                expect_args(args, 0, 0)?;
                Ok(quote_identifier(TIME_COLUMN_ALIAS))
            }
            "metricAlias" => {
                expect_args(args, 0, 0)?;
                Ok(quote_identifier(METRIC_COLUMN_ALIAS))
            }
            "timeFilter" => {
                expect_args(args, 1, 2)?;
                let column = column_arg(args, 0)?;
                let format = self.column_format(column);
                let bucket = self.granularity_arg(args, 1)?;
                time_filter_bucket_aligned_expr(column, &format, &ctx.range, &bucket)
            }
            "timeFilterMillis" => {
                expect_args(args, 1, 2)?;
                let column = column_arg(args, 0)?;
                let bucket = self.granularity_arg(args, 1)?;
                time_filter_bucket_aligned_expr(column, &DateTimeFormat::millis(), &ctx.range, &bucket)
            }
            "timeGroup" => {
                expect_args(args, 1, 2)?;
                let column = column_arg(args, 0)?;
                let format = self.column_format(column);
                let bucket = self.granularity_arg(args, 1)?;
                let conversion = DateTimeConversion::to_millis(column, format, bucket);
                Ok(time_group_expr(&conversion, ctx.derived))
            }
            "timeFrom" => {
                expect_args(args, 1, 1)?;
                let column = column_arg(args, 0)?;
                Ok(self.column_format(column).encode(ctx.range.from)?)
            }
            "timeTo" => {
                expect_args(args, 1, 1)?;
                let column = column_arg(args, 0)?;
                Ok(self.column_format(column).encode(ctx.range.to)?)
            }
            "timeFromMillis" => {
                expect_args(args, 0, 0)?;
                Ok(ctx.range.from_millis_epoch().to_string())
            }
            "timeToMillis" => {
                expect_args(args, 0, 0)?;
                Ok(ctx.range.to_millis_epoch().to_string())
            }
            "granularityMillis" => {
                expect_args(args, 0, 1)?;
                Ok(self.granularity_arg(args, 0)?.as_millis().to_string())
            }
            "panelMillis" => {
                expect_args(args, 0, 0)?;
                Ok(ctx.range.duration_millis().to_string())
            }
            other => unreachable!("no generator for macro {}", other),
        }
    }

    /// Format of a schema time column, millisecond epoch when unresolvable
    fn column_format(&self, column: &str) -> DateTimeFormat {
        let Some(schema) = self.ctx.schema else {
            tracing::warn!(column = %column, "No schema available, assuming millisecond epoch");
            return DateTimeFormat::millis();
        };
        match schema.time_format(column) {
            Ok(format) => format,
            Err(e) => {
                tracing::warn!(
                    table = %self.ctx.table_name,
                    column = %column,
                    error = %e,
                    "Cannot resolve time column format, assuming millisecond epoch"
                );
                DateTimeFormat::millis()
            }
        }
    }

    fn granularity_arg(&self, args: &[String], index: usize) -> SqlResult<Granularity> {
        match args.get(index) {
            Some(arg) if !arg.is_empty() => Ok(Granularity::parse(arg)?),
            _ => Ok(self.ctx.granularity),
        }
    }
}

fn expect_args(args: &[String], min: usize, max: usize) -> SqlResult<()> {
    if args.len() < min || args.len() > max {
        let expected = match (min, max) {
            (0, 0) => "0",
            (0, 1) => "0 or 1",
            (1, 1) => "1",
            (1, 2) => "1 or 2",
            _ => "a different number of",
        };
        return Err(SqlError::ArgumentCount {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn column_arg(args: &[String], index: usize) -> SqlResult<&str> {
    match args.get(index) {
        Some(arg) if !arg.is_empty() => Ok(arg.as_str()),
        _ => Err(SqlError::EmptyArgument(index + 1)),
    }
}

/// Split a parenthesized argument list on top-level commas and unquote
fn split_args(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in raw.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"' | '`') => {
                quote = Some(c);
                current.push(c);
            }
            (None, ',') => args.push(unquote(&current)),
            (None, c) => current.push(c),
        }
        if c == ',' && quote.is_none() {
            current.clear();
        }
    }
    args.push(unquote(&current));
    args
}

fn unquote(arg: &str) -> String {
    let arg = arg.trim();
    for q in ['"', '`', '\''] {
        if arg.len() >= 2 && arg.starts_with(q) && arg.ends_with(q) {
            return arg[1..arg.len() - 1].to_string();
        }
    }
    arg.to_string()
}

/// 1-based line and column of a byte offset
fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DateTimeFieldSpec, TableSchema, TransformConfig};
    use chrono::DateTime;

    fn schema() -> TableSchema {
        TableSchema {
            schema_name: "CleanLogisticData".to_string(),
            date_time_fields: vec![
                DateTimeFieldSpec::new("timestamp", "LONG", "1:SECONDS:EPOCH", "1:SECONDS"),
                DateTimeFieldSpec::new("ts", "LONG", "1:MILLISECONDS:EPOCH", "1:MILLISECONDS"),
                DateTimeFieldSpec::new("broken", "LONG", "NOT_A_FORMAT", "1:SECONDS"),
            ],
            ..TableSchema::default()
        }
    }

    fn range() -> TimeRange {
        TimeRange::new(
            DateTime::from_timestamp(1, 0).unwrap(),
            DateTime::from_timestamp(90_001, 0).unwrap(),
        )
    }

    fn expand_with(sql: &str, derived: &DerivedTimeColumns) -> SqlResult<String> {
        let schema = schema();
        let mut engine = MacroEngine::new(MacroContext {
            table_name: "CleanLogisticData",
            schema: Some(&schema),
            derived,
            range: range(),
            granularity: Granularity::parse("1:HOURS").unwrap(),
        });
        engine.expand(sql)
    }

    fn expand(sql: &str) -> SqlResult<String> {
        expand_with(sql, &DerivedTimeColumns::default())
    }

    #[test]
    fn test_table() {
        assert_eq!(expand("$__table()").unwrap(), " \"CleanLogisticData\" ");
        assert_eq!(expand("$__table").unwrap(), " \"CleanLogisticData\" ");
    }

    #[test]
    fn test_only_whole_names_match() {
        assert_eq!(expand("SELECT $__tableName FROM t").unwrap(), "SELECT $__tableName FROM t");
        assert_eq!(expand("$__timeAliases()").unwrap(), "$__timeAliases()");
        assert_eq!(expand("$__table.x").unwrap(), " \"CleanLogisticData\" .x");
    }

    #[test]
    fn test_time_filter_uses_column_format() {
        assert_eq!(
            expand("$__timeFilter(\"timestamp\")").unwrap().trim(),
            "\"timestamp\" >= 0 AND \"timestamp\" < 93600"
        );
    }

    #[test]
    fn test_time_filter_explicit_granularity() {
        assert_eq!(
            expand("$__timeFilter(timestamp, '1:DAYS')").unwrap().trim(),
            "\"timestamp\" >= 0 AND \"timestamp\" < 172800"
        );
    }

    #[test]
    fn test_millis_macros_take_precedence() {
        let sql = "WHERE $__timeFilterMillis(\"timestamp\") AND x < $__timeToMillis() AND y > $__timeFromMillis()";
        assert_eq!(
            expand(sql).unwrap(),
            "WHERE  \"timestamp\" >= 0 AND \"timestamp\" < 93600000  AND x <  90001000  AND y >  1000 "
        );
    }

    #[test]
    fn test_time_from_and_to() {
        assert_eq!(expand("$__timeFrom(timestamp)").unwrap(), " 1 ");
        assert_eq!(expand("$__timeTo(`ts`)").unwrap(), " 90001000 ");
    }

    #[test]
    fn test_aliases_and_numbers() {
        assert_eq!(expand("$__timeAlias()").unwrap(), " \"__time\" ");
        assert_eq!(expand("$__metricAlias()").unwrap(), " \"__metric\" ");
        assert_eq!(expand("$__granularityMillis()").unwrap(), " 3600000 ");
        assert_eq!(expand("$__granularityMillis('5:MINUTES')").unwrap(), " 300000 ");
        assert_eq!(expand("$__panelMillis()").unwrap(), " 90000000 ");
    }

    #[test]
    fn test_time_group_live_and_derived() {
        assert_eq!(
            expand("$__timeGroup(ts, '1:MINUTES')").unwrap().trim(),
            "DATETIMECONVERT(\"ts\", '1:MILLISECONDS:EPOCH', '1:MILLISECONDS:EPOCH', '1:MINUTES')"
        );

        let derived = DerivedTimeColumns::from_transform_configs(&[TransformConfig {
            column_name: "ts_1m".to_string(),
            transform_function: "DATETIMECONVERT(ts,'1:MILLISECONDS:EPOCH','1:MILLISECONDS:EPOCH','1:MINUTES')"
                .to_string(),
        }]);
        assert_eq!(
            expand_with("$__timeGroup(ts, '1:MINUTES')", &derived).unwrap().trim(),
            "\"ts_1m\""
        );
    }

    #[test]
    fn test_unresolved_column_falls_back_to_millis() {
        assert_eq!(
            expand("$__timeFilter(broken)").unwrap().trim(),
            "\"broken\" >= 0 AND \"broken\" < 93600000"
        );
        assert_eq!(
            expand("$__timeFilter(missing)").unwrap().trim(),
            "\"missing\" >= 0 AND \"missing\" < 93600000"
        );
    }

    #[test]
    fn test_full_query() {
        let sql = "SELECT $__timeGroup(\"timestamp\") AS $__timeAlias(), SUM(cost) AS $__metricAlias()\nFROM $__table()\nWHERE $__timeFilter(\"timestamp\")\nGROUP BY $__timeAlias()";
        let expanded = expand(sql).unwrap();
        assert_eq!(
            expanded,
            "SELECT  DATETIMECONVERT(\"timestamp\", '1:SECONDS:EPOCH', '1:MILLISECONDS:EPOCH', '1:HOURS')  AS  \"__time\" , SUM(cost) AS  \"__metric\" \nFROM  \"CleanLogisticData\" \nWHERE  \"timestamp\" >= 0 AND \"timestamp\" < 93600 \nGROUP BY  \"__time\" "
        );
    }

    #[test]
    fn test_error_position() {
        let err = expand("SELECT *\nFROM t\nWHERE x = 1 AND $__timeFilter()").unwrap_err();
        match err {
            SqlError::Macro { name, line, column, source } => {
                assert_eq!(name, "timeFilter");
                assert_eq!(line, 3);
                assert_eq!(column, 17);
                assert_eq!(*source, SqlError::ArgumentCount { expected: "1 or 2", got: 0 });
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bad_granularity_is_an_error() {
        let err = expand("$__timeGroup(ts, '1:FORTNIGHTS')").unwrap_err();
        assert!(matches!(err, SqlError::Macro { line: 1, column: 1, .. }));
    }

    #[test]
    fn test_text_without_macros_unchanged() {
        assert_eq!(expand("SELECT 1 FROM t").unwrap(), "SELECT 1 FROM t");
    }

    #[test]
    fn test_split_args() {
        assert_eq!(split_args(""), Vec::<String>::new());
        assert_eq!(split_args(" \"ts\" , '1:MINUTES' "), vec!["ts", "1:MINUTES"]);
        assert_eq!(split_args("'a,b', c"), vec!["a,b", "c"]);
    }
}
