//! Vega-Lite compilation
//!
//! `compile` is pure: identical shell, params and rows always serialize to
//! identical bytes. It assumes the params already passed validation.

use crate::shell::{
    AggregateSpec, OptionalConstraint, OptionalEncodings, ShellDefinition, ShellFamily, ShellParams,
};
use indexmap::IndexMap;
use plotgraph_core::Row;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChartSpec {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub data: ChartData,
    pub mark: MarkSpec,
    pub encoding: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Vec<Value>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChartData {
    pub values: Vec<Row>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MarkSpec {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ChartSpec {
    fn new(shell: &ShellDefinition, rows: Vec<Row>, encoding: IndexMap<String, Value>) -> Self {
        Self {
            schema: VEGA_LITE_SCHEMA.to_string(),
            data: ChartData { values: rows },
            mark: MarkSpec {
                kind: shell.mark.as_str().to_string(),
            },
            encoding,
            transform: None,
        }
    }

    /// Columns referenced by `field` in any encoding channel.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        for enc in self.encoding.values() {
            collect_fields(enc, &mut fields);
        }
        fields
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn collect_fields<'a>(v: &'a Value, out: &mut Vec<&'a str>) {
    match v {
        Value::Object(m) => {
            if let Some(Value::String(f)) = m.get("field") {
                out.push(f.as_str());
            }
        }
        Value::Array(items) => items.iter().for_each(|i| collect_fields(i, out)),
        _ => {}
    }
}

pub fn compile(shell: &ShellDefinition, params: &ShellParams, rows: Vec<Row>) -> ChartSpec {
    match shell.family {
        ShellFamily::CorrelationMatrix => compile_matrix(shell, rows),
        ShellFamily::Density => compile_density(shell, params, rows),
        _ => compile_encodings(shell, params, rows),
    }
}

fn compile_matrix(shell: &ShellDefinition, rows: Vec<Row>) -> ChartSpec {
    let mut encoding = IndexMap::new();
    encoding.insert("x".into(), json!({ "field": "x", "type": "nominal" }));
    encoding.insert("y".into(), json!({ "field": "y", "type": "nominal" }));
    encoding.insert(
        "color".into(),
        json!({
            "aggregate": "mean",
            "field": "value",
            "type": "quantitative",
            "scale": { "scheme": "redblue", "domain": [-1, 1] },
        }),
    );
    encoding.insert(
        "tooltip".into(),
        json!([
            { "field": "x", "type": "nominal" },
            { "field": "y", "type": "nominal" },
            { "field": "value", "type": "quantitative", "format": ".2f" },
        ]),
    );
    ChartSpec::new(shell, rows, encoding)
}

fn compile_density(shell: &ShellDefinition, params: &ShellParams, rows: Vec<Row>) -> ChartSpec {
    let color = params.column("color");

    let mut density = Map::new();
    density.insert("density".into(), json!(params.column("x")));
    if let Some(c) = color {
        density.insert("groupby".into(), json!([c]));
    }
    density.insert("as".into(), json!(["value", "density"]));

    let mut encoding = IndexMap::new();
    encoding.insert("x".into(), json!({ "field": "value", "type": "quantitative" }));
    encoding.insert("y".into(), json!({ "field": "density", "type": "quantitative" }));
    if let Some(c) = color {
        encoding.insert("color".into(), json!({ "field": c, "type": "nominal" }));
    }

    let mut spec = ChartSpec::new(shell, rows, encoding);
    spec.transform = Some(vec![Value::Object(density)]);
    spec
}

fn compile_encodings(shell: &ShellDefinition, params: &ShellParams, rows: Vec<Row>) -> ChartSpec {
    let mut encoding = IndexMap::new();

    for (channel, constraint) in &shell.required {
        let mut enc = Map::new();
        enc.insert("type".into(), json!(constraint.field_type));
        if let Some(column) = params.column(channel) {
            if !constraint.is_fixed_literal() {
                enc.insert("field".into(), json!(column));
            }
        }
        match constraint.aggregate {
            Some(AggregateSpec::Fixed(op)) => {
                enc.insert("aggregate".into(), json!(op));
            }
            Some(AggregateSpec::Chosen) => {
                if let Some(op) = params.aggregate {
                    enc.insert("aggregate".into(), json!(op));
                }
            }
            None => {}
        }
        if constraint.bin {
            enc.insert("bin".into(), json!(true));
        }
        encoding.insert(channel.clone(), Value::Object(enc));
    }

    for (channel, column) in optional_bindings(shell, params) {
        let enc = match shell.optional.get(&channel) {
            Some(OptionalConstraint::Typed(c)) => json!({ "field": column, "type": c.field_type }),
            _ => json!({ "field": column }),
        };
        encoding.insert(channel, enc);
    }

    ChartSpec::new(shell, rows, encoding)
}

/// Optional channels the caller bound, in declaration order. When every
/// optional channel is accepted, bound channels follow param order.
fn optional_bindings(shell: &ShellDefinition, params: &ShellParams) -> Vec<(String, String)> {
    let declared: Vec<String> = match &shell.optional {
        OptionalEncodings::Map(m) => m.keys().cloned().collect(),
        OptionalEncodings::Any => params
            .encodings
            .keys()
            .filter(|k| !shell.required.contains_key(k.as_str()))
            .cloned()
            .collect(),
    };
    declared
        .into_iter()
        .filter_map(|ch| params.column(&ch).map(|c| (ch.clone(), c.to_string())))
        .collect()
}
