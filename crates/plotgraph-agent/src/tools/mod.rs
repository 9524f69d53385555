//! Decision tools offered to the planner
//!
//! Each tool is a self-contained module implementing `DecisionTool`. A
//! planner node names the tools it may use; the first registered one is
//! forced on the model. To add a tool: create a file here, implement the
//! trait, register it in `DecisionToolRegistry::builtin`.

pub mod choose_shell;
pub mod fill_params;
pub mod route;

use crate::graph::{EnumSource, Graph, PlannerNode};
use crate::state::State;
use plotgraph_core::Result;
use plotgraph_llm::FunctionTool;
use plotgraph_shells::ShellRegistry;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub use choose_shell::ChooseShellTool;
pub use fill_params::FillShellParamsTool;
pub use route::RouteTool;

/// What a decision tool may read while building its schema.
pub struct PlanContext<'a> {
    pub node_id: &'a str,
    pub graph: &'a Graph,
    pub state: &'a State,
}

/// The planner-facing part of a planner node.
#[derive(Clone, Debug, Default)]
pub struct PlanSpec {
    pub tools: Vec<String>,
    pub output_schema: Option<Value>,
    pub enum_from: Option<EnumSource>,
    pub prompt: Option<String>,
}

impl PlanSpec {
    pub fn from_node(node: &PlannerNode) -> Self {
        Self {
            tools: node.tools.clone(),
            output_schema: node.output_schema.clone(),
            enum_from: node.enum_from.clone(),
            prompt: node.prompt.clone(),
        }
    }
}

pub trait DecisionTool: Send + Sync {
    /// Function name the model is forced to call.
    fn name(&self) -> &str;

    /// Human-readable description sent to the LLM.
    fn description(&self) -> &str;

    /// JSON Schema of the call arguments for this node and state.
    fn parameters(&self, ctx: &PlanContext<'_>, spec: &PlanSpec) -> Result<Value>;

    /// Extra system context for the model, e.g. the dataset profile.
    fn context(&self, _ctx: &PlanContext<'_>) -> Result<Option<String>> {
        Ok(None)
    }

    fn to_function(&self, ctx: &PlanContext<'_>, spec: &PlanSpec) -> Result<FunctionTool> {
        Ok(FunctionTool::new(
            self.name(),
            self.description(),
            self.parameters(ctx, spec)?,
        ))
    }
}

pub struct DecisionToolRegistry {
    tools: HashMap<String, Arc<dyn DecisionTool>>,
}

impl Default for DecisionToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// `route`, `choose_shell` and `fill_shell_params` over one shell catalog.
    pub fn builtin(shells: Arc<ShellRegistry>) -> Self {
        let mut registry = Self::new();
        registry.register(RouteTool);
        registry.register(ChooseShellTool::new(shells.clone()));
        registry.register(FillShellParamsTool::new(shells));
        registry
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: impl DecisionTool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DecisionTool>> {
        self.tools.get(name).cloned()
    }

    /// The first named tool that is registered, else `route`.
    pub fn select(&self, names: &[String]) -> Option<Arc<dyn DecisionTool>> {
        names
            .iter()
            .find_map(|n| self.get(n))
            .or_else(|| self.get(route::ROUTE))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
