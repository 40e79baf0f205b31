//! Engine result tables

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Declared type of a result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    Json,
    Bytes,
    Timestamp,
    BigDecimal,
    /// Map-of-string types, with the declared tag
    Map(String),
    /// Any other tag
    Unsupported(String),
}

impl ColumnType {
    /// Parse a declared type tag (never fails)
    pub fn parse(tag: &str) -> Self {
        let upper = tag.trim().to_uppercase();
        match upper.as_str() {
            "BOOLEAN" => Self::Boolean,
            "INT" => Self::Int,
            "LONG" => Self::Long,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "STRING" => Self::String,
            "JSON" => Self::Json,
            "BYTES" => Self::Bytes,
            "TIMESTAMP" => Self::Timestamp,
            "BIG_DECIMAL" => Self::BigDecimal,
            s if s.starts_with("MAP") => Self::Map(upper),
            _ => Self::Unsupported(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Int => "INT",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::String => "STRING",
            Self::Json => "JSON",
            Self::Bytes => "BYTES",
            Self::Timestamp => "TIMESTAMP",
            Self::BigDecimal => "BIG_DECIMAL",
            Self::Map(tag) | Self::Unsupported(tag) => tag,
        }
    }

    /// Whether values of this type decode to a float
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Boolean | Self::Int | Self::Long | Self::Float | Self::Double | Self::BigDecimal | Self::Timestamp
        )
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::parse(&tag))
    }
}

/// Flat result of one query
///
/// Values stay as JSON values so integers are never narrowed through a
/// float.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub column_types: Vec<ColumnType>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>, column_types: Vec<ColumnType>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            column_types,
            rows,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Declared type of column `index`, `Unsupported("")` when undeclared
    pub fn column_type(&self, index: usize) -> ColumnType {
        self.column_types
            .get(index)
            .cloned()
            .unwrap_or_else(|| ColumnType::Unsupported(String::new()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
