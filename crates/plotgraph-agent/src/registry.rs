//! Client registry: the LLM planner and named API targets
//!
//! `plan` issues exactly one completion request that forces a single
//! decision function, then checks the returned arguments against the
//! generated parameters schema and the node's declared output schema.
//! The interpreter therefore only ever sees a structurally valid decision
//! or an error.

use crate::api::ApiTarget;
use crate::tools::{DecisionToolRegistry, PlanContext, PlanSpec};
use plotgraph_core::{Error, Outcome, Result};
use plotgraph_llm::{extract_tool_call, ChatMessage, CompletionRequest, GenerationParams, LlmProvider};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_PLANNER_PROMPT: &str =
    "You are a routing component. You MUST call the provided tool. Do not respond with text.";

/// Input key carrying the conversation so far.
pub const TRANSCRIPTS_KEY: &str = "transcripts";

pub struct ClientRegistry {
    provider: Arc<dyn LlmProvider>,
    model: String,
    params: GenerationParams,
    tools: DecisionToolRegistry,
    targets: HashMap<String, Arc<dyn ApiTarget>>,
}

impl ClientRegistry {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        params: GenerationParams,
        tools: DecisionToolRegistry,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            params,
            tools,
            targets: HashMap::new(),
        }
    }

    /// Register an API target. Replaces any existing target with the same name.
    pub fn register_target(&mut self, target: impl ApiTarget + 'static) {
        self.targets.insert(target.name().to_string(), Arc::new(target));
    }

    pub fn with_target(mut self, target: impl ApiTarget + 'static) -> Self {
        self.register_target(target);
        self
    }

    pub fn target_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn tools(&self) -> &DecisionToolRegistry {
        &self.tools
    }

    pub async fn plan(&self, ctx: &PlanContext<'_>, spec: &PlanSpec) -> Result<Value> {
        let tool = self
            .tools
            .select(&spec.tools)
            .ok_or_else(|| Error::Internal("no decision tool registered".into()))?;
        let function = tool.to_function(ctx, spec)?;
        let parameters = function.function.parameters.clone();

        let prompt = spec.prompt.as_deref().unwrap_or(DEFAULT_PLANNER_PROMPT);
        let mut messages = vec![ChatMessage::system(prompt)];
        if let Some(context) = tool.context(ctx)? {
            messages.push(ChatMessage::system(context));
        }
        messages.extend(sanitize_transcripts(ctx.state.inputs().get(TRANSCRIPTS_KEY)));

        let request = CompletionRequest::new(&self.model, messages, self.params).force_tool(function);
        debug!(node = ctx.node_id, tool = tool.name(), provider = self.provider.name(), "planner request");

        let reply = self.provider.complete(request).await?;
        let Some(arguments) = extract_tool_call(tool.name(), &reply) else {
            let finish = reply
                .choices
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_default();
            warn!(node = ctx.node_id, tool = tool.name(), model = ?reply.model, finish_reason = %finish, "planner did not produce tool call");
            return Err(Error::no_decision(tool.name()));
        };

        let decision = Value::Object(arguments);
        let mut violations = schema_violations(&parameters, &decision);
        if let Some(schema) = &spec.output_schema {
            violations.extend(schema_violations(schema, &decision));
        }
        if !violations.is_empty() {
            return Err(Error::DecisionSchema { violations });
        }

        debug!(node = ctx.node_id, %decision, "planner decision");
        Ok(decision)
    }

    /// Invoke a named API target. Failures are outcomes, never errors.
    pub async fn call_api(&self, target: &str, input: &Value) -> Outcome {
        let Some(api) = self.targets.get(target) else {
            warn!(target_name = target, "unknown api target");
            return Outcome::fail("unknown_api_target", target);
        };
        match api.call(input).await {
            Ok(result) => Outcome::ok(result),
            Err(e) => {
                warn!(target_name = target, error = %e, "api call failed");
                Outcome::fail("api_call_failed", e.to_string())
            }
        }
    }
}

/// Keep transcript entries with a known role and non-empty text content.
pub fn sanitize_transcripts(transcripts: Option<&Value>) -> Vec<ChatMessage> {
    let Some(Value::Array(entries)) = transcripts else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let content = entry.get("content")?.as_str()?;
            if content.trim().is_empty() {
                return None;
            }
            match entry.get("role")?.as_str()? {
                "system" => Some(ChatMessage::system(content)),
                "user" => Some(ChatMessage::user(content)),
                "assistant" => Some(ChatMessage::assistant(content)),
                _ => None,
            }
        })
        .collect()
}

/// Messages of every violation of `schema` by `instance`.
pub fn schema_violations(schema: &Value, instance: &Value) -> Vec<String> {
    let compiled = match jsonschema::JSONSchema::compile(schema) {
        Ok(compiled) => compiled,
        Err(e) => return vec![format!("invalid schema: {e}")],
    };
    let mut violations = Vec::new();
    if let Err(errors) = compiled.validate(instance) {
        violations.extend(errors.map(|err| err.to_string()));
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transcripts_are_sanitized() {
        let t = json!([
            { "role": "user", "content": "plot age by category" },
            { "role": "tool", "content": "x" },
            { "role": "assistant", "content": "   " },
            { "role": "assistant" },
            "junk",
            { "role": "system", "content": "be brief" },
        ]);
        let msgs = sanitize_transcripts(Some(&t));
        assert_eq!(msgs, vec![ChatMessage::user("plot age by category"), ChatMessage::system("be brief")]);
        assert!(sanitize_transcripts(Some(&json!("nope"))).is_empty());
        assert!(sanitize_transcripts(None).is_empty());
    }

    #[test]
    fn violations_are_reported() {
        let schema = json!({
            "type": "object",
            "properties": { "next": { "type": "string", "enum": ["a", "b"] } },
            "required": ["next"],
            "additionalProperties": false,
        });
        assert!(schema_violations(&schema, &json!({ "next": "a" })).is_empty());
        assert!(!schema_violations(&schema, &json!({ "next": "c" })).is_empty());
        assert!(!schema_violations(&schema, &json!({ "next": "a", "extra": 1 })).is_empty());
        assert!(!schema_violations(&schema, &json!({})).is_empty());
    }

    #[test]
    fn empty_object_passes_schema_without_required() {
        let schema = json!({ "type": "object", "properties": { "note": { "type": "string" } } });
        assert!(schema_violations(&schema, &json!({})).is_empty());
    }
}
