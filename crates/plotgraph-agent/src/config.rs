//! plotgraph configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use crate::api::ApiTargetConfig;
use plotgraph_llm::GenerationParams;
use plotgraph_shells::ValidationThresholds;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlotgraphConfig {
    /// Chat-completion endpoint and generation parameters.
    pub llm: LlmConfig,
    /// Interpreter limits.
    pub run: RunConfig,
    /// Advisory warning thresholds.
    pub validation: ValidationThresholds,
    /// Analysis sandbox.
    pub sandbox: SandboxConfig,
    /// Named API targets for `api.call`.
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL (`/chat/completions` is appended).
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Step ceiling per run.
    pub max_steps: usize,
    /// Whole-run timeout; 0 disables it.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Python interpreter used for analyses.
    pub python: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub targets: Vec<ApiTargetConfig>,
}

// ============================================================
// Defaults
// ============================================================

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            max_tokens: None,
            temperature: None,
            top_p: None,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: 500,
            timeout_secs: 120,
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            python: "python3".into(),
            timeout_secs: 60,
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl PlotgraphConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} — using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} — using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run.timeout_secs > 0).then(|| Duration::from_secs(self.run.timeout_secs))
    }
}

impl LlmConfig {
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams::resolve(self.max_tokens, self.temperature, self.top_p)
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PlotgraphConfig::default();
        assert_eq!(c.run.max_steps, 500);
        assert_eq!(c.validation.color_cardinality, 20);
        assert_eq!(c.validation.axis_cardinality, 100);
        assert_eq!(c.validation.embed_rows, 5000);
        assert_eq!(c.llm.generation_params(), GenerationParams::default());
        assert!(c.api.targets.is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c: PlotgraphConfig = toml::from_str(
            r#"
[llm]
model = "local-model"
temperature = 5.0

[validation]
color_cardinality = 8

[[api.targets]]
name = "records"
base_url = "http://localhost:8080"
path = "/records/{id}"
"#,
        )
        .unwrap();
        assert_eq!(c.llm.model, "local-model");
        assert_eq!(c.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(c.llm.generation_params().temperature, 5.0);
        assert_eq!(c.validation.color_cardinality, 8);
        assert_eq!(c.validation.embed_rows, 5000);
        assert_eq!(c.api.targets[0].path, "/records/{id}");
        assert!(c.api.targets[0].query.is_empty());
        assert_eq!(c.run.max_steps, 500);
    }

    #[test]
    fn to_toml_roundtrips() {
        let c = PlotgraphConfig::default();
        let back: PlotgraphConfig = toml::from_str(&c.to_toml()).unwrap();
        assert_eq!(back, c);
    }
}
