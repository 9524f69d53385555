//! Shared data types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Statistical nature of a column, independent of storage type.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Nominal,
    Ordinal,
    Quantitative,
    Temporal,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nominal => "nominal",
            Self::Ordinal => "ordinal",
            Self::Quantitative => "quantitative",
            Self::Temporal => "temporal",
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Nominal | Self::Ordinal)
    }

    /// Whether a column of type `actual` may be bound where `self` is expected.
    /// A temporal slot accepts a quantitative column (numeric timestamps).
    pub fn accepts(&self, actual: SemanticType) -> bool {
        *self == actual || (*self == Self::Temporal && actual == Self::Quantitative)
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldProfile {
    #[serde(rename = "type")]
    pub field_type: SemanticType,
    pub cardinality: usize,
}

impl FieldProfile {
    pub fn new(field_type: SemanticType, cardinality: usize) -> Self {
        Self {
            field_type,
            cardinality,
        }
    }
}

/// Per-column profile of a dataset. Column order follows the source header.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DatasetProfile {
    pub fields: IndexMap<String, FieldProfile>,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
}

impl DatasetProfile {
    pub fn new(row_count: usize) -> Self {
        Self {
            fields: IndexMap::new(),
            row_count,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, field_type: SemanticType, cardinality: usize) -> Self {
        self.fields.insert(name.into(), FieldProfile::new(field_type, cardinality));
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldProfile> {
        self.fields.get(name)
    }

    pub fn has_type(&self, ty: SemanticType) -> bool {
        self.fields.values().any(|f| f.field_type == ty)
    }

    /// Column names of exactly the given type, in header order.
    pub fn columns_of(&self, ty: SemanticType) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, f)| f.field_type == ty)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn count_of(&self, ty: SemanticType) -> usize {
        self.fields.values().filter(|f| f.field_type == ty).count()
    }
}

/// One materialized data row.
pub type Row = Map<String, Value>;

/// Error payload of a failed [`Outcome`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OpError {
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Result of an executor operation or API call. Failures are values the
/// graph can route on with `on.error`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Outcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OpError>,
}

impl Outcome {
    pub fn ok(result: Value) -> Self {
        Self {
            ok: true,
            result,
            error: None,
        }
    }

    pub fn fail(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: Value::Null,
            error: Some(OpError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    /// A failure that still carries a result payload (e.g. a validation report).
    pub fn fail_with(code: impl Into<String>, message: impl Into<String>, result: Value) -> Self {
        Self {
            result,
            ..Self::fail(code, message)
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}
