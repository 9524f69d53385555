//! Deterministic executor operations
//!
//! An operation receives its input template already resolved against
//! state and returns an `Outcome`. Expected failures (bad input, failed
//! validation, busy sandbox, API errors) are `ok: false` outcomes the graph
//! can route on; an `Err` aborts the run.

use crate::registry::ClientRegistry;
use crate::sandbox::AnalysisRunner;
use async_trait::async_trait;
use plotgraph_core::{DatasetProfile, Error, Outcome, Result, Row};
use plotgraph_shells::{compile, profile, Dataset, ShellDefinition, ShellParams, ShellRegistry, Validator};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

static NULL: Value = Value::Null;

/// Where an operation is being invoked from.
#[derive(Clone, Debug, Default)]
pub struct OpContext {
    pub node: String,
    pub target: Option<String>,
}

#[async_trait]
pub trait Operation: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &OpContext, input: Value) -> Result<Outcome>;
}

#[derive(Default)]
pub struct OperationRegistry {
    ops: HashMap<String, Arc<dyn Operation>>,
    aliases: HashMap<String, String>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every builtin operation wired to the shared services.
    pub fn builtin(
        shells: Arc<ShellRegistry>,
        validator: Validator,
        analyses: Arc<AnalysisRunner>,
        client: Arc<ClientRegistry>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(ParseDataset);
        registry.alias("parse_csv", "dataset.parse");
        registry.register(SelectFromState);
        registry.register(DescribeShell { shells: shells.clone() });
        registry.register(ValidateShell {
            shells: shells.clone(),
            validator: validator.clone(),
        });
        registry.register(RunAnalysis { analyses });
        registry.register(CompileChart { shells, validator });
        registry.register(CallApi { client });
        registry
    }

    /// Register an operation. Replaces any existing one with the same name.
    pub fn register(&mut self, op: impl Operation + 'static) {
        self.ops.insert(op.name().to_string(), Arc::new(op));
    }

    pub fn alias(&mut self, alias: &str, name: &str) {
        self.aliases.insert(alias.to_string(), name.to_string());
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        let name = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.ops.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ops.keys().chain(self.aliases.keys()).map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn invalid_input(message: impl Into<String>) -> Outcome {
    Outcome::fail("invalid_input", message)
}

fn str_field<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn shell_of<'a>(shells: &'a ShellRegistry, input: &Value) -> Result<&'a ShellDefinition> {
    match str_field(input, "shell") {
        Some(id) => shells.lookup(id),
        None => Err(Error::UnknownShell(input.get("shell").map(Value::to_string).unwrap_or_default())),
    }
}

/// `dataset.parse`: `{csv}` -> `{profile, values}`.
pub struct ParseDataset;

#[async_trait]
impl Operation for ParseDataset {
    fn name(&self) -> &str {
        "dataset.parse"
    }

    async fn run(&self, _ctx: &OpContext, input: Value) -> Result<Outcome> {
        let Some(text) = input.get("csv").and_then(Value::as_str) else {
            return Ok(invalid_input("csv text is required"));
        };
        let dataset = match Dataset::from_csv(text) {
            Ok(d) => d,
            Err(e) => return Ok(Outcome::fail("parse_failed", e.to_string())),
        };
        let profile = profile(&dataset);
        debug!(rows = profile.row_count, columns = profile.fields.len(), "dataset parsed");
        Ok(Outcome::ok(json!({
            "profile": profile,
            "values": dataset.rows(),
        })))
    }
}

/// `state.select`: pick one element of an array (by filter, else index)
/// and optionally project a field.
pub struct SelectFromState;

#[async_trait]
impl Operation for SelectFromState {
    fn name(&self) -> &str {
        "state.select"
    }

    async fn run(&self, _ctx: &OpContext, input: Value) -> Result<Outcome> {
        let Some(Value::Array(items)) = input.get("from") else {
            return Ok(Outcome::fail("select_failed", "source is not an array"));
        };
        let filter = input.get("filter").filter(|f| !f.is_null());
        let candidates: Vec<&Value> = match filter {
            Some(f) => {
                let (Some(field), Some(equals)) = (f.get("field").and_then(Value::as_str), f.get("equals")) else {
                    return Ok(invalid_input("filter needs field and equals"));
                };
                items.iter().filter(|i| i.get(field) == Some(equals)).collect()
            }
            None => items.iter().collect(),
        };
        let index = input.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
        let Some(item) = candidates.get(index) else {
            return Ok(Outcome::fail("select_failed", format!("no element at index {index}")));
        };
        match str_field(&input, "field") {
            Some(field) => match item.get(field) {
                Some(v) => Ok(Outcome::ok(v.clone())),
                None => Ok(Outcome::fail("select_failed", format!("element has no field '{field}'"))),
            },
            None => Ok(Outcome::ok((*item).clone())),
        }
    }
}

/// `shell.describe`: the facts about a shell the graph branches on.
pub struct DescribeShell {
    shells: Arc<ShellRegistry>,
}

pub fn describe(shell: &ShellDefinition) -> Value {
    let needs_params =
        !shell.family.is_whole_matrix() && (shell.column_encodings().next().is_some() || shell.optional.iter().next().is_some());
    json!({
        "id": shell.id,
        "name": shell.name,
        "family": shell.family,
        "mark": shell.mark,
        "analysis": shell.analysis,
        "has_analysis": shell.analysis.is_some(),
        "needs_params": needs_params,
    })
}

#[async_trait]
impl Operation for DescribeShell {
    fn name(&self) -> &str {
        "shell.describe"
    }

    async fn run(&self, _ctx: &OpContext, input: Value) -> Result<Outcome> {
        let shell = shell_of(&self.shells, &input)?;
        Ok(Outcome::ok(describe(shell)))
    }
}

fn parse_params(input: &Value) -> std::result::Result<ShellParams, Outcome> {
    ShellParams::from_value(input.get("params").unwrap_or(&NULL))
        .map_err(|e| Outcome::fail("invalid_params", e.to_string()))
}

fn parse_profile(value: &Value) -> std::result::Result<DatasetProfile, Outcome> {
    serde_json::from_value(value.clone()).map_err(|e| invalid_input(format!("invalid profile: {e}")))
}

/// Validate and turn a failed result into a routable outcome.
fn validation_outcome(validator: &Validator, shell: &ShellDefinition, params: &ShellParams, profile: &DatasetProfile) -> Outcome {
    let result = validator.validate(shell, params, profile);
    for w in &result.warnings {
        warn!(shell = %shell.id, code = %w.code, "validation warning");
    }
    let value = serde_json::to_value(&result).unwrap_or(Value::Null);
    if result.ok {
        Outcome::ok(value)
    } else {
        let codes: Vec<&str> = result.errors.iter().map(|e| e.code.as_str()).collect();
        warn!(shell = %shell.id, errors = %codes.join(","), "validation failed");
        Outcome::fail_with("validation_failed", codes.join(", "), value)
    }
}

/// `shell.validate`: `{shell, params?, profile}` -> `ValidationResult`.
pub struct ValidateShell {
    shells: Arc<ShellRegistry>,
    validator: Validator,
}

#[async_trait]
impl Operation for ValidateShell {
    fn name(&self) -> &str {
        "shell.validate"
    }

    async fn run(&self, _ctx: &OpContext, input: Value) -> Result<Outcome> {
        let shell = shell_of(&self.shells, &input)?;
        let params = match parse_params(&input) {
            Ok(p) => p,
            Err(outcome) => return Ok(outcome),
        };
        let profile = match parse_profile(input.get("profile").unwrap_or(&NULL)) {
            Ok(p) => p,
            Err(outcome) => return Ok(outcome),
        };
        Ok(validation_outcome(&self.validator, shell, &params, &profile))
    }
}

/// `analysis.run`: `{analysis, dataset}` -> rows.
pub struct RunAnalysis {
    analyses: Arc<AnalysisRunner>,
}

#[async_trait]
impl Operation for RunAnalysis {
    fn name(&self) -> &str {
        "analysis.run"
    }

    async fn run(&self, _ctx: &OpContext, input: Value) -> Result<Outcome> {
        let id = str_field(&input, "analysis").unwrap_or_default();
        if !self.analyses.catalog().contains(id) {
            return Err(Error::UnknownAnalysis(id.to_string()));
        }
        let Some(path) = str_field(&input, "dataset") else {
            return Ok(invalid_input("dataset path is required"));
        };
        let program = self.analyses.program(id, path)?;
        match self.analyses.execute(&program).await {
            Ok(rows) => Ok(Outcome::ok(Value::Array(rows.into_iter().map(Value::Object).collect()))),
            Err(e) => {
                warn!(analysis = id, error = %e, "analysis failed");
                Ok(Outcome::fail(e.code(), e.to_string()))
            }
        }
    }
}

/// `chart.compile`: `{shell, params?, values, profile?}` -> Vega-Lite spec.
pub struct CompileChart {
    shells: Arc<ShellRegistry>,
    validator: Validator,
}

#[async_trait]
impl Operation for CompileChart {
    fn name(&self) -> &str {
        "chart.compile"
    }

    async fn run(&self, _ctx: &OpContext, input: Value) -> Result<Outcome> {
        let shell = shell_of(&self.shells, &input)?;
        let params = match parse_params(&input) {
            Ok(p) => p,
            Err(outcome) => return Ok(outcome),
        };
        let rows: Vec<Row> = match input.get("values") {
            Some(Value::Array(items)) => match items.iter().map(|i| i.as_object().cloned()).collect::<Option<Vec<_>>>() {
                Some(rows) => rows,
                None => return Ok(invalid_input("values must be row objects")),
            },
            _ => return Ok(invalid_input("values must be an array")),
        };
        if let Some(p) = input.get("profile").filter(|p| !p.is_null()) {
            let profile = match parse_profile(p) {
                Ok(p) => p,
                Err(outcome) => return Ok(outcome),
            };
            let checked = validation_outcome(&self.validator, shell, &params, &profile);
            if !checked.ok {
                return Ok(checked);
            }
        }
        let spec = compile(shell, &params, rows);
        Ok(Outcome::ok(serde_json::to_value(&spec)?))
    }
}

/// `api.call`: `{target, input}` through the client registry. The node's
/// `run.target` takes precedence over an input `target`.
pub struct CallApi {
    client: Arc<ClientRegistry>,
}

#[async_trait]
impl Operation for CallApi {
    fn name(&self) -> &str {
        "api.call"
    }

    async fn run(&self, ctx: &OpContext, input: Value) -> Result<Outcome> {
        let target = ctx
            .target
            .clone()
            .or_else(|| str_field(&input, "target").map(String::from))
            .unwrap_or_default();
        let args = input.get("input").cloned().unwrap_or_else(|| json!({}));
        Ok(self.client.call_api(&target, &args).await)
    }
}
