//! Decision schemas for shell selection and parameter filling
//!
//! Both builders return a JSON Schema object suitable as the `parameters`
//! of a forced function call. Column enums are computed from the profile,
//! so the model can only name columns that exist with a legal type.

use crate::registry::ShellRegistry;
use crate::shell::{AggregateOp, OptionalConstraint, ShellDefinition};
use plotgraph_core::{DatasetProfile, SemanticType};
use serde_json::{json, Map, Value};

pub const CHOOSE_SHELL: &str = "choose_shell";
pub const FILL_SHELL_PARAMS: &str = "fill_shell_params";

/// Schema for `choose_shell`: one required `shellId` limited to shells
/// whose signature types all occur in the profile. Falls back to every
/// registered shell when none is compatible.
pub fn choose_shell_parameters(registry: &ShellRegistry, profile: &DatasetProfile) -> Value {
    let available: Vec<SemanticType> = profile.fields.values().map(|f| f.field_type).collect();
    let mut ids = registry.compatible_ids(&available);
    if ids.is_empty() {
        ids = registry.ids();
    }
    json!({
        "type": "object",
        "properties": {
            "shellId": {
                "type": "string",
                "enum": ids,
                "description": "The id of the selected visualization shell. Must be one of the available shells.",
            }
        },
        "required": ["shellId"],
        "additionalProperties": false,
    })
}

/// Schema for `fill_shell_params` on one shell.
pub fn fill_params_parameters(shell: &ShellDefinition, profile: &DatasetProfile) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();

    for (channel, constraint) in shell.column_encodings() {
        let columns = legal_columns(Some(constraint.field_type), profile);
        if columns.is_empty() {
            continue;
        }
        properties.insert(channel.clone(), column_enum(columns));
        required.push(channel.clone());
    }

    for (channel, constraint) in shell.optional.iter() {
        let expected = match constraint {
            OptionalConstraint::Any => None,
            OptionalConstraint::Typed(c) => Some(c.field_type),
        };
        let columns = legal_columns(expected, profile);
        if !columns.is_empty() {
            properties.insert(channel.clone(), column_enum(columns));
        }
    }

    if shell.constraints.aggregate_required || shell.has_chosen_aggregate() {
        let ops: Vec<&str> = AggregateOp::ALL.iter().map(|op| op.as_str()).collect();
        properties.insert("aggregate".into(), json!({ "type": "string", "enum": ops }));
        if shell.constraints.aggregate_required && !shell.has_fixed_aggregate() {
            required.push("aggregate".into());
        }
    }

    if shell.uses_bin() {
        properties.insert("bin".into(), json!({ "type": "boolean" }));
        if shell.constraints.bin {
            required.push("bin".into());
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// Columns that may be bound where `expected` is declared. `None` means any.
pub fn legal_columns(expected: Option<SemanticType>, profile: &DatasetProfile) -> Vec<String> {
    profile
        .fields
        .iter()
        .filter(|(_, f)| expected.map(|t| t.accepts(f.field_type)).unwrap_or(true))
        .map(|(name, _)| name.clone())
        .collect()
}

fn column_enum(columns: Vec<String>) -> Value {
    json!({ "type": "string", "enum": columns })
}
