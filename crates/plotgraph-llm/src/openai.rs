//! OpenAI-compatible chat completions provider

use crate::provider::{LlmError, LlmProvider, LlmResult};
use crate::types::{CompletionReply, CompletionRequest};
use reqwest::Client;
use tracing::{debug, error};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str { "openai" }

    async fn complete(&self, mut request: CompletionRequest) -> LlmResult<CompletionReply> {
        request.tool_choice = request.effective_tool_choice();

        debug!(
            model = %request.model,
            tools = request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "chat completion request"
        );

        let response = self.client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("completion error {}: {}", status, error_text);

            if status.as_u16() == 401 {
                return Err(LlmError::AuthFailed(error_text));
            } else if status.as_u16() == 429 {
                return Err(LlmError::RateLimited { retry_after_ms: 60000 });
            } else {
                return Err(LlmError::RequestFailed(format!("{}: {}", status, error_text)));
            }
        }

        let text = response.text().await?;
        serde_json::from_str::<CompletionReply>(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, text)))
    }
}
