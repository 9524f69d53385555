//! `route`: pick the next node, plus an optional identifier drawn from state.

use super::{DecisionTool, PlanContext, PlanSpec};
use crate::graph::EnumSource;
use crate::state::State;
use plotgraph_core::{Error, Result};
use serde_json::{json, Map, Value};

pub const ROUTE: &str = "route";

pub struct RouteTool;

impl DecisionTool for RouteTool {
    fn name(&self) -> &str {
        ROUTE
    }

    fn description(&self) -> &str {
        "Select the next node and required identifiers."
    }

    fn parameters(&self, ctx: &PlanContext<'_>, spec: &PlanSpec) -> Result<Value> {
        let next_enum = spec
            .output_schema
            .as_ref()
            .and_then(|s| s.pointer("/properties/next/enum"))
            .filter(|e| e.as_array().map(|a| !a.is_empty()).unwrap_or(false))
            .cloned()
            .unwrap_or_else(|| json!(ctx.graph.node_ids()));

        let mut properties = Map::new();
        properties.insert("next".into(), json!({ "type": "string", "enum": next_enum }));
        let mut required = vec!["next".to_string()];

        if let Some(source) = &spec.enum_from {
            let field = enum_field_name(source, spec.output_schema.as_ref());
            let values = enum_values(source, ctx.state)?;
            if values.is_empty() {
                return Err(Error::EnumSource(format!(
                    "no valid enum values for field '{}' from state '{}'",
                    field, source.state
                )));
            }
            properties.insert(field.clone(), json!({ "type": "string", "enum": values }));
            required.push(field);
        }

        Ok(json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        }))
    }
}

/// `as`, else the first declared required field other than `next`, else `value`.
fn enum_field_name(source: &EnumSource, output_schema: Option<&Value>) -> String {
    if let Some(alias) = &source.alias {
        return alias.clone();
    }
    output_schema
        .and_then(|s| s.get("required"))
        .and_then(Value::as_array)
        .and_then(|req| req.iter().filter_map(Value::as_str).find(|k| *k != "next"))
        .unwrap_or("value")
        .to_string()
}

/// Read the source array, keep elements passing the filter and project
/// their string `field`.
pub fn enum_values(source: &EnumSource, state: &State) -> Result<Vec<String>> {
    let items = match state.lookup(&source.state) {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(Error::EnumSource(format!(
                "enum_from source is not an array: {}",
                source.state
            )))
        }
    };
    Ok(items
        .iter()
        .filter(|item| source.filter.as_ref().map(|f| f.matches(item)).unwrap_or(true))
        .filter_map(|item| item.get(&source.field).and_then(Value::as_str))
        .map(String::from)
        .collect())
}
