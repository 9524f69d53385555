//! `choose_shell`: pick a chart shell compatible with the profiled dataset.

use super::{DecisionTool, PlanContext, PlanSpec};
use plotgraph_core::{DatasetProfile, Error, Result};
use plotgraph_shells::{choose_shell_parameters, ShellRegistry, CHOOSE_SHELL};
use serde_json::Value;
use std::sync::Arc;

/// State key holding the dataset profile.
pub const PROFILE_KEY: &str = "profile";

pub struct ChooseShellTool {
    shells: Arc<ShellRegistry>,
}

impl ChooseShellTool {
    pub fn new(shells: Arc<ShellRegistry>) -> Self {
        Self { shells }
    }
}

pub(crate) fn profile_from_state(ctx: &PlanContext<'_>) -> Result<DatasetProfile> {
    let value = ctx
        .state
        .get(PROFILE_KEY)
        .ok_or_else(|| Error::invalid_node(ctx.node_id, "no dataset profile in state"))?;
    Ok(serde_json::from_value(value.clone())?)
}

impl DecisionTool for ChooseShellTool {
    fn name(&self) -> &str {
        CHOOSE_SHELL
    }

    fn description(&self) -> &str {
        "Choose the visualization shell that best answers the request for this dataset."
    }

    fn parameters(&self, ctx: &PlanContext<'_>, _spec: &PlanSpec) -> Result<Value> {
        let profile = profile_from_state(ctx)?;
        Ok(choose_shell_parameters(&self.shells, &profile))
    }

    fn context(&self, ctx: &PlanContext<'_>) -> Result<Option<String>> {
        let profile = profile_from_state(ctx)?;
        let shells: Vec<String> = self
            .shells
            .iter()
            .map(|s| format!("- {}: {}", s.id, s.name))
            .collect();
        Ok(Some(format!(
            "Dataset profile:\n{}\n\nAvailable shells:\n{}",
            serde_json::to_string_pretty(&profile)?,
            shells.join("\n")
        )))
    }
}
