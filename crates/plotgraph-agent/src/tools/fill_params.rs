//! `fill_shell_params`: bind dataset columns to the chosen shell's encodings.

use super::choose_shell::profile_from_state;
use super::{DecisionTool, PlanContext, PlanSpec};
use plotgraph_core::{Error, Result};
use plotgraph_shells::{fill_params_parameters, ShellRegistry, FILL_SHELL_PARAMS};
use serde_json::Value;
use std::sync::Arc;

/// State key holding the chosen shell id.
pub const SHELL_ID_KEY: &str = "shell_id";

pub struct FillShellParamsTool {
    shells: Arc<ShellRegistry>,
}

impl FillShellParamsTool {
    pub fn new(shells: Arc<ShellRegistry>) -> Self {
        Self { shells }
    }

    fn shell_id<'a>(&self, ctx: &'a PlanContext<'_>) -> Result<&'a str> {
        ctx.state
            .get(SHELL_ID_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_node(ctx.node_id, "no shell_id in state"))
    }
}

impl DecisionTool for FillShellParamsTool {
    fn name(&self) -> &str {
        FILL_SHELL_PARAMS
    }

    fn description(&self) -> &str {
        "Fill the encodings of the selected shell with dataset columns."
    }

    fn parameters(&self, ctx: &PlanContext<'_>, _spec: &PlanSpec) -> Result<Value> {
        let shell = self.shells.lookup(self.shell_id(ctx)?)?;
        let profile = profile_from_state(ctx)?;
        Ok(fill_params_parameters(shell, &profile))
    }

    fn context(&self, ctx: &PlanContext<'_>) -> Result<Option<String>> {
        let shell = self.shells.lookup(self.shell_id(ctx)?)?;
        let profile = profile_from_state(ctx)?;
        Ok(Some(format!(
            "Selected shell:\n{}\n\nDataset profile:\n{}",
            serde_json::to_string_pretty(shell)?,
            serde_json::to_string_pretty(&profile)?
        )))
    }
}
