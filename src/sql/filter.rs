//! Dimension filter predicates
//!
//! Builds one WHERE predicate per filter entry. Values are literal SQL
//! expressions the caller has already quoted; each value yields one
//! comparison and multiple comparisons are OR-combined:
//!
//! ```text
//! ("AirlineID" = 19393 OR "AirlineID" = 19790)
//! ```
//!
//! An entry that cannot produce a predicate renders as an empty string and
//! must be dropped by the caller (see [`combine_filters`]).

use crate::sql::expr::column_expr;

/// Comparison operators accepted in dimension filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Contains,
    NotContains,
    Like,
    NotLike,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    NotIn,
}

impl FilterOperator {
    /// Parse an operator (case- and whitespace-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "contains" => Some(Self::Contains),
            "not contains" => Some(Self::NotContains),
            "like" => Some(Self::Like),
            "not like" => Some(Self::NotLike),
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            ">=" => Some(Self::Gte),
            "<=" => Some(Self::Lte),
            "in" => Some(Self::In),
            "not in" => Some(Self::NotIn),
            _ => None,
        }
    }

    /// Render a single comparison of `column` against `value`
    fn compare(&self, column: &str, value: &str) -> String {
        match self {
            Self::Eq => format!("{} = {}", column, value),
            Self::Ne => format!("{} != {}", column, value),
            Self::Contains => format!("REGEXP_LIKE({}, {})", column, value),
            Self::NotContains => format!("NOT REGEXP_LIKE({}, {})", column, value),
            Self::Like => format!("{} LIKE {}", column, value),
            Self::NotLike => format!("{} NOT LIKE {}", column, value),
            Self::Gt => format!("{} > {}", column, value),
            Self::Lt => format!("{} < {}", column, value),
            Self::Gte => format!("{} >= {}", column, value),
            Self::Lte => format!("{} <= {}", column, value),
            Self::In => format!("{} IN ({})", column, value),
            Self::NotIn => format!("{} NOT IN ({})", column, value),
        }
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Contains => "contains",
            Self::NotContains => "not contains",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::In => "in",
            Self::NotIn => "not in",
        };
        write!(f, "{}", s)
    }
}

/// Predicate for one filter entry, or an empty string when there is none
pub fn column_filter_expr(column: &str, key: Option<&str>, operator: &str, values: &[String]) -> String {
    if column.is_empty() || operator.trim().is_empty() || values.is_empty() {
        return String::new();
    }
    let Some(op) = FilterOperator::parse(operator) else {
        tracing::debug!(column = %column, operator = %operator, "Skipping filter with unknown operator");
        return String::new();
    };

    let column = column_expr(column, key);
    let comparisons: Vec<String> = values.iter().map(|v| op.compare(&column, v)).collect();
    format!("({})", comparisons.join(" OR "))
}

/// Keep only the non-empty predicates
pub fn combine_filters<I>(predicates: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    predicates.into_iter().filter(|p| !p.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(vs: &[&str]) -> Vec<String> {
        vs.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_multiple_values_or_combined() {
        assert_eq!(
            column_filter_expr("AirlineID", None, "=", &values(&["19393", "19790"])),
            "(\"AirlineID\" = 19393 OR \"AirlineID\" = 19790)"
        );
    }

    #[test]
    fn test_single_value_parenthesized() {
        assert_eq!(
            column_filter_expr("fabric", None, "=", &values(&["'fabric_001'"])),
            "(\"fabric\" = 'fabric_001')"
        );
    }

    #[test]
    fn test_every_operator() {
        let cases = [
            ("!=", "(\"c\" != 1)"),
            ("contains", "(REGEXP_LIKE(\"c\", 1))"),
            ("not contains", "(NOT REGEXP_LIKE(\"c\", 1))"),
            ("like", "(\"c\" LIKE 1)"),
            ("NOT  LIKE", "(\"c\" NOT LIKE 1)"),
            (">", "(\"c\" > 1)"),
            ("<", "(\"c\" < 1)"),
            (">=", "(\"c\" >= 1)"),
            ("<=", "(\"c\" <= 1)"),
            ("in", "(\"c\" IN (1))"),
            ("not in", "(\"c\" NOT IN (1))"),
        ];
        for (op, expected) in cases {
            assert_eq!(column_filter_expr("c", None, op, &values(&["1"])), expected, "operator {}", op);
        }
    }

    #[test]
    fn test_map_key_column() {
        assert_eq!(
            column_filter_expr("tags", Some("env"), "=", &values(&["'prod'"])),
            "(\"tags\"['env'] = 'prod')"
        );
    }

    #[test]
    fn test_no_predicate_cases() {
        assert_eq!(column_filter_expr("", None, "=", &values(&["1"])), "");
        assert_eq!(column_filter_expr("c", None, "", &values(&["1"])), "");
        assert_eq!(column_filter_expr("c", None, "=", &[]), "");
        assert_eq!(column_filter_expr("c", None, "~~", &values(&["1"])), "");
    }

    #[test]
    fn test_combine_drops_empty() {
        let combined = combine_filters(vec![
            column_filter_expr("a", None, "=", &values(&["1"])),
            column_filter_expr("b", None, "bogus", &values(&["2"])),
            column_filter_expr("c", None, ">", &values(&["3"])),
        ]);
        assert_eq!(combined, vec!["(\"a\" = 1)".to_string(), "(\"c\" > 3)".to_string()]);
    }
}
