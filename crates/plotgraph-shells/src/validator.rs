//! Shell parameter validation
//!
//! Stages run in a fixed order and append to the result rather than
//! stopping at the first problem:
//!
//! 1. presence of required encodings
//! 2. column existence and type
//! 3. aggregate rule
//! 4. bin rule
//! 5. signature match over the channels `x, y, row, column`
//! 6. advisory warnings
//!
//! Whole-matrix shells skip stages 1–5 and only need two quantitative columns.

use crate::registry::ShellRegistry;
use crate::shell::{ShellDefinition, ShellParams, SIGNATURE_CHANNELS};
use plotgraph_core::{DatasetProfile, SemanticType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    UnknownShell,
    NotEnoughQuantitativeFields,
    MissingRequiredEncoding,
    UnknownField,
    InvalidFieldType,
    AggregateMissing,
    BinMissing,
    InvalidBinTarget,
    InvalidSignature,
    HighCardinalityColor,
    HighCardinalityX,
    LargeDatasetEmbedded,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownShell => "unknown_shell",
            Self::NotEnoughQuantitativeFields => "not_enough_quantitative_fields",
            Self::MissingRequiredEncoding => "missing_required_encoding",
            Self::UnknownField => "unknown_field",
            Self::InvalidFieldType => "invalid_field_type",
            Self::AggregateMissing => "aggregate_missing",
            Self::BinMissing => "bin_missing",
            Self::InvalidBinTarget => "invalid_bin_target",
            Self::InvalidSignature => "invalid_signature",
            Self::HighCardinalityColor => "high_cardinality_color",
            Self::HighCardinalityX => "high_cardinality_x",
            Self::LargeDatasetEmbedded => "large_dataset_embedded",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Issue {
    pub code: IssueCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Issue {
    fn new(code: IssueCode) -> Self {
        Self { code, details: None }
    }

    fn with(code: IssueCode, details: Value) -> Self {
        Self {
            code,
            details: Some(details),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationResult {
    fn finish(errors: Vec<Issue>, warnings: Vec<Issue>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn error_codes(&self) -> Vec<IssueCode> {
        self.errors.iter().map(|e| e.code).collect()
    }

    pub fn warning_codes(&self) -> Vec<IssueCode> {
        self.warnings.iter().map(|w| w.code).collect()
    }

    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

/// Cardinality and size limits for advisory warnings.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct ValidationThresholds {
    /// Distinct values above which a categorical color column warns.
    pub color_cardinality: usize,
    /// Distinct values above which a non-quantitative x column warns.
    pub axis_cardinality: usize,
    /// Row count above which embedding the data inline warns.
    pub embed_rows: usize,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            color_cardinality: 20,
            axis_cardinality: 100,
            embed_rows: 5000,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Validator {
    thresholds: ValidationThresholds,
}

impl Validator {
    pub fn new(thresholds: ValidationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ValidationThresholds {
        &self.thresholds
    }

    /// Validate against a shell looked up by id. An unregistered id yields
    /// a failed result carrying `unknown_shell`.
    pub fn validate_by_id(
        &self,
        registry: &ShellRegistry,
        shell_id: &str,
        params: &ShellParams,
        profile: &DatasetProfile,
    ) -> ValidationResult {
        match registry.get(shell_id) {
            Some(shell) => self.validate(shell, params, profile),
            None => ValidationResult::finish(
                vec![Issue::with(IssueCode::UnknownShell, json!({ "shell": shell_id }))],
                Vec::new(),
            ),
        }
    }

    pub fn validate(&self, shell: &ShellDefinition, params: &ShellParams, profile: &DatasetProfile) -> ValidationResult {
        let mut errors = Vec::new();

        if shell.family.is_whole_matrix() {
            if profile.count_of(SemanticType::Quantitative) < 2 {
                errors.push(Issue::new(IssueCode::NotEnoughQuantitativeFields));
            }
        } else {
            check_presence(shell, params, &mut errors);
            check_fields(shell, params, profile, &mut errors);
            check_aggregate(shell, params, &mut errors);
            check_bin(shell, params, profile, &mut errors);
            check_signature(shell, params, profile, &mut errors);
        }

        let warnings = self.warnings(params, profile);
        ValidationResult::finish(errors, warnings)
    }

    fn warnings(&self, params: &ShellParams, profile: &DatasetProfile) -> Vec<Issue> {
        let mut warnings = Vec::new();

        if let Some((column, field)) = params.column("color").and_then(|c| profile.field(c).map(|f| (c, f))) {
            if field.field_type.is_categorical() && field.cardinality > self.thresholds.color_cardinality {
                warnings.push(Issue::with(
                    IssueCode::HighCardinalityColor,
                    json!({ "field": column, "cardinality": field.cardinality }),
                ));
            }
        }

        if let Some((column, field)) = params.column("x").and_then(|c| profile.field(c).map(|f| (c, f))) {
            if field.field_type != SemanticType::Quantitative && field.cardinality > self.thresholds.axis_cardinality {
                warnings.push(Issue::with(
                    IssueCode::HighCardinalityX,
                    json!({ "field": column, "cardinality": field.cardinality }),
                ));
            }
        }

        if profile.row_count > self.thresholds.embed_rows {
            warnings.push(Issue::with(
                IssueCode::LargeDatasetEmbedded,
                json!({ "rows": profile.row_count }),
            ));
        }

        warnings
    }
}

fn check_presence(shell: &ShellDefinition, params: &ShellParams, errors: &mut Vec<Issue>) {
    for (channel, _) in shell.column_encodings() {
        if params.column(channel).is_none() {
            errors.push(Issue::with(
                IssueCode::MissingRequiredEncoding,
                json!({ "encoding": channel }),
            ));
        }
    }
}

fn check_fields(shell: &ShellDefinition, params: &ShellParams, profile: &DatasetProfile, errors: &mut Vec<Issue>) {
    for channel in params.encodings.keys() {
        if shell.required.get(channel).map(|c| c.is_fixed_literal()).unwrap_or(false) {
            continue;
        }
        let Some(column) = params.column(channel) else { continue };
        let Some(field) = profile.field(column) else {
            errors.push(Issue::with(
                IssueCode::UnknownField,
                json!({ "encoding": channel, "field": column }),
            ));
            continue;
        };
        if let Some(expected) = shell.expected_type(channel) {
            if !expected.accepts(field.field_type) {
                errors.push(Issue::with(
                    IssueCode::InvalidFieldType,
                    json!({
                        "encoding": channel,
                        "field": column,
                        "expected": expected,
                        "actual": field.field_type,
                    }),
                ));
            }
        }
    }
}

fn check_aggregate(shell: &ShellDefinition, params: &ShellParams, errors: &mut Vec<Issue>) {
    if shell.constraints.aggregate_required && !shell.has_fixed_aggregate() && params.aggregate.is_none() {
        errors.push(Issue::new(IssueCode::AggregateMissing));
    }
}

fn check_bin(shell: &ShellDefinition, params: &ShellParams, profile: &DatasetProfile, errors: &mut Vec<Issue>) {
    let bin = params.bin.unwrap_or(false);
    if shell.constraints.bin && !bin {
        errors.push(Issue::new(IssueCode::BinMissing));
    }
    if bin {
        let x = params.column("x");
        let quantitative = x
            .and_then(|c| profile.field(c))
            .map(|f| f.field_type == SemanticType::Quantitative)
            .unwrap_or(false);
        if !quantitative {
            errors.push(Issue::with(IssueCode::InvalidBinTarget, json!({ "field": x })));
        }
    }
}

fn check_signature(shell: &ShellDefinition, params: &ShellParams, profile: &DatasetProfile, errors: &mut Vec<Issue>) {
    let mut resolved: Vec<Option<SemanticType>> = Vec::new();
    for channel in SIGNATURE_CHANNELS {
        let Some(constraint) = shell.required.get(channel) else { continue };
        if constraint.is_fixed_literal() {
            continue;
        }
        let Some(column) = params.column(channel) else { continue };
        resolved.push(profile.field(column).map(|f| f.field_type));
    }

    let matches = shell.signatures.iter().any(|sig| {
        sig.len() == resolved.len()
            && sig
                .iter()
                .zip(&resolved)
                .all(|(expected, actual)| actual.map(|a| expected.accepts(a)).unwrap_or(false))
    });

    if !matches {
        errors.push(Issue::with(
            IssueCode::InvalidSignature,
            json!({ "signature": resolved, "allowed": shell.signatures }),
        ));
    }
}
