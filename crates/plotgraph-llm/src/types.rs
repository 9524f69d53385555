//! Chat-completion request and reply types

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

pub const DEFAULT_MAX_TOKENS: u32 = 16384;
pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_TOP_P: f64 = 0.8;

/// Completion request
#[derive(Clone, Debug, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<FunctionTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, params: GenerationParams) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            tools: None,
            tool_choice: None,
        }
    }

    /// Expose a single function and force the model to call it.
    pub fn force_tool(mut self, tool: FunctionTool) -> Self {
        self.tool_choice = Some(ToolChoice::Function(tool.function.name.clone()));
        self.tools = Some(vec![tool]);
        self
    }

    /// Tool choice as sent on the wire. With tools but no explicit choice,
    /// the first tool is forced.
    pub fn effective_tool_choice(&self) -> Option<ToolChoice> {
        if self.tool_choice.is_some() {
            return self.tool_choice.clone();
        }
        self.tools
            .as_ref()
            .and_then(|t| t.first())
            .map(|t| ToolChoice::Function(t.function.name.clone()))
    }
}

/// Numeric generation parameters, clamped into their legal ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl GenerationParams {
    /// Absent or non-finite values take the fallback; others are clamped.
    pub fn resolve(max_tokens: Option<u32>, temperature: Option<f64>, top_p: Option<f64>) -> Self {
        Self {
            max_tokens: max_tokens.map(|m| m.max(1)).unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: clamp(temperature, 0.0, f64::INFINITY, DEFAULT_TEMPERATURE),
            top_p: clamp(top_p, f64::EPSILON, 1.0, DEFAULT_TOP_P),
        }
    }
}

fn clamp(v: Option<f64>, min: f64, max: f64, fallback: f64) -> f64 {
    match v {
        Some(v) if v.is_finite() => v.clamp(min, max),
        _ => fallback,
    }
}

/// Message in a chat conversation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

/// Function tool definition
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            kind: "function".into(),
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ToolChoice {
    Auto,
    Function(String),
}

impl Serialize for ToolChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Function(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            })
            .serialize(serializer),
        }
    }
}

/// Completion reply
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompletionReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: ReplyMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object.
    #[serde(default)]
    pub arguments: String,
}

impl CompletionReply {
    /// Reply carrying a single tool call. Mainly for test providers.
    pub fn with_tool_call(name: impl Into<String>, arguments: &Value) -> Self {
        Self {
            model: None,
            choices: vec![Choice {
                message: ReplyMessage {
                    content: None,
                    tool_calls: vec![ToolCall {
                        id: "call_0".into(),
                        function: FunctionCall {
                            name: name.into(),
                            arguments: arguments.to_string(),
                        },
                    }],
                },
                finish_reason: Some("tool_calls".into()),
            }],
        }
    }

    /// Reply with text content only.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            model: None,
            choices: vec![Choice {
                message: ReplyMessage {
                    content: Some(content.into()),
                    tool_calls: Vec::new(),
                },
                finish_reason: Some("stop".into()),
            }],
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        self.choices
            .first()
            .map(|c| c.message.tool_calls.as_slice())
            .unwrap_or(&[])
    }
}

/// Merge the arguments of every call to `name` on the first choice.
/// Returns `None` when the reply holds no such call. Argument strings that
/// do not parse as a JSON object are skipped.
pub fn extract_tool_call(name: &str, reply: &CompletionReply) -> Option<Map<String, Value>> {
    let mut merged = Map::new();
    let mut found = false;
    for call in reply.tool_calls().iter().filter(|c| c.function.name == name) {
        found = true;
        if call.function.arguments.is_empty() {
            continue;
        }
        if let Ok(Value::Object(args)) = serde_json::from_str::<Value>(&call.function.arguments) {
            merged.extend(args);
        }
    }
    found.then_some(merged)
}
