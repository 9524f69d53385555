//! Shell definitions
//!
//! A shell is a chart template: the encodings it needs, the semantic types
//! those encodings accept, and the aggregate/bin rules that govern them.
//! Shells are static and shared read-only through a [`crate::ShellRegistry`].

use indexmap::IndexMap;
use plotgraph_core::SemanticType;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Channels consulted for signature matching, in order.
pub const SIGNATURE_CHANNELS: [&str; 4] = ["x", "y", "row", "column"];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShellFamily {
    CategoricalAggregate,
    Distribution,
    Density,
    Trend,
    Correlation,
    /// Consumes pre-shaped `{x, y, value}` rows instead of per-row encodings.
    CorrelationMatrix,
}

impl ShellFamily {
    pub fn is_whole_matrix(&self) -> bool {
        matches!(self, Self::CorrelationMatrix)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Bar,
    Boxplot,
    Area,
    Rect,
    Line,
    Point,
}

impl Mark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Boxplot => "boxplot",
            Self::Area => "area",
            Self::Rect => "rect",
            Self::Line => "line",
            Self::Point => "point",
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Count,
    Sum,
    Mean,
    Median,
    Min,
    Max,
}

impl AggregateOp {
    pub const ALL: [AggregateOp; 6] = [
        Self::Count,
        Self::Sum,
        Self::Mean,
        Self::Median,
        Self::Min,
        Self::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Aggregate declared on an encoding: either chosen by the caller
/// (`aggregate: true`) or hard-coded by the shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateSpec {
    Chosen,
    Fixed(AggregateOp),
}

impl Serialize for AggregateSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Chosen => serializer.serialize_bool(true),
            Self::Fixed(op) => op.serialize(serializer),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EncodingConstraint {
    #[serde(rename = "type")]
    pub field_type: SemanticType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateSpec>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bin: bool,
}

impl EncodingConstraint {
    pub fn new(field_type: SemanticType) -> Self {
        Self {
            field_type,
            aggregate: None,
            bin: false,
        }
    }

    pub fn aggregated(mut self) -> Self {
        self.aggregate = Some(AggregateSpec::Chosen);
        self
    }

    pub fn fixed_aggregate(mut self, op: AggregateOp) -> Self {
        self.aggregate = Some(AggregateSpec::Fixed(op));
        self
    }

    pub fn binned(mut self) -> Self {
        self.bin = true;
        self
    }

    /// Encodings with a hard-coded aggregate take no column from the caller.
    pub fn is_fixed_literal(&self) -> bool {
        matches!(self.aggregate, Some(AggregateSpec::Fixed(_)))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionalConstraint {
    /// Any column, emitted without a type.
    Any,
    Typed(EncodingConstraint),
}

impl Serialize for OptionalConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Any => serializer.serialize_str("any"),
            Self::Typed(c) => c.serialize(serializer),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionalEncodings {
    /// Every channel is accepted, untyped.
    Any,
    Map(IndexMap<String, OptionalConstraint>),
}

impl Default for OptionalEncodings {
    fn default() -> Self {
        Self::Map(IndexMap::new())
    }
}

impl Serialize for OptionalEncodings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Any => serializer.serialize_str("any"),
            Self::Map(m) => m.serialize(serializer),
        }
    }
}

impl OptionalEncodings {
    /// Constraint for an optional channel; `None` when the channel is not declared.
    pub fn get(&self, channel: &str) -> Option<OptionalConstraint> {
        match self {
            Self::Any => Some(OptionalConstraint::Any),
            Self::Map(m) => m.get(channel).cloned(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionalConstraint)> {
        let map = match self {
            Self::Any => None,
            Self::Map(m) => Some(m),
        };
        map.into_iter().flat_map(|m| m.iter())
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct ShellConstraints {
    #[serde(rename = "aggregateRequired", skip_serializing_if = "std::ops::Not::not")]
    pub aggregate_required: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bin: bool,
}

/// External procedure a shell depends on.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnalysisRef {
    pub language: String,
    pub id: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ShellDefinition {
    pub id: String,
    pub name: String,
    pub family: ShellFamily,
    pub mark: Mark,
    pub signatures: Vec<Vec<SemanticType>>,
    pub required: IndexMap<String, EncodingConstraint>,
    pub optional: OptionalEncodings,
    pub constraints: ShellConstraints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisRef>,
}

impl ShellDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, family: ShellFamily, mark: Mark) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            family,
            mark,
            signatures: Vec::new(),
            required: IndexMap::new(),
            optional: OptionalEncodings::default(),
            constraints: ShellConstraints::default(),
            analysis: None,
        }
    }

    pub fn signature(mut self, types: &[SemanticType]) -> Self {
        self.signatures.push(types.to_vec());
        self
    }

    pub fn require(mut self, channel: &str, constraint: EncodingConstraint) -> Self {
        self.required.insert(channel.to_string(), constraint);
        self
    }

    pub fn allow(mut self, channel: &str, field_type: SemanticType) -> Self {
        self.insert_optional(channel, OptionalConstraint::Typed(EncodingConstraint::new(field_type)));
        self
    }

    pub fn allow_any(mut self, channel: &str) -> Self {
        self.insert_optional(channel, OptionalConstraint::Any);
        self
    }

    /// Accept every optional channel untyped.
    pub fn any_optional(mut self) -> Self {
        self.optional = OptionalEncodings::Any;
        self
    }

    pub fn aggregate_required(mut self) -> Self {
        self.constraints.aggregate_required = true;
        self
    }

    pub fn bin_required(mut self) -> Self {
        self.constraints.bin = true;
        self
    }

    pub fn analysis(mut self, language: &str, id: &str) -> Self {
        self.analysis = Some(AnalysisRef {
            language: language.into(),
            id: id.into(),
        });
        self
    }

    fn insert_optional(&mut self, channel: &str, constraint: OptionalConstraint) {
        match &mut self.optional {
            OptionalEncodings::Map(m) => {
                m.insert(channel.to_string(), constraint);
            }
            OptionalEncodings::Any => {
                let mut m = IndexMap::new();
                m.insert(channel.to_string(), constraint);
                self.optional = OptionalEncodings::Map(m);
            }
        }
    }

    /// Any required encoding hard-codes its aggregate.
    pub fn has_fixed_aggregate(&self) -> bool {
        self.required.values().any(|c| c.is_fixed_literal())
    }

    /// Any required encoding lets the caller choose an aggregate.
    pub fn has_chosen_aggregate(&self) -> bool {
        self.required
            .values()
            .any(|c| c.aggregate == Some(AggregateSpec::Chosen))
    }

    /// Binning is mandated by the shell or declared on a required encoding.
    pub fn uses_bin(&self) -> bool {
        self.constraints.bin || self.required.values().any(|c| c.bin)
    }

    /// Required encodings the caller must bind to a column.
    pub fn column_encodings(&self) -> impl Iterator<Item = (&String, &EncodingConstraint)> {
        self.required.iter().filter(|(_, c)| !c.is_fixed_literal())
    }

    /// Declared type for a channel, from the required map or a typed optional.
    pub fn expected_type(&self, channel: &str) -> Option<SemanticType> {
        if let Some(c) = self.required.get(channel) {
            return Some(c.field_type);
        }
        match self.optional.get(channel) {
            Some(OptionalConstraint::Typed(c)) => Some(c.field_type),
            _ => None,
        }
    }

    /// Every semantic type of some signature is among `available`.
    pub fn is_compatible_with(&self, available: &[SemanticType]) -> bool {
        self.signatures
            .iter()
            .any(|sig| sig.iter().all(|t| available.contains(t)))
    }
}

/// Caller-chosen parameters for a shell: a column per encoding plus the
/// aggregate operator and bin flag.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ShellParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<bool>,
    #[serde(flatten)]
    pub encodings: BTreeMap<String, Value>,
}

impl ShellParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, channel: &str, column: &str) -> Self {
        self.encodings.insert(channel.to_string(), Value::String(column.to_string()));
        self
    }

    pub fn with_aggregate(mut self, op: AggregateOp) -> Self {
        self.aggregate = Some(op);
        self
    }

    pub fn with_bin(mut self, bin: bool) -> Self {
        self.bin = Some(bin);
        self
    }

    /// Column bound to a channel. Null, empty and non-string values count as unbound.
    pub fn column(&self, channel: &str) -> Option<&str> {
        match self.encodings.get(channel) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Parse from a JSON object such as a planner decision.
    pub fn from_value(value: &Value) -> serde_json::Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            other => serde_json::from_value(other.clone()),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(m)) => m,
            _ => Map::new(),
        }
    }
}
