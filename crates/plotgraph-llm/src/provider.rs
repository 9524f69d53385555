//! LLM Provider trait

use crate::types::{CompletionReply, CompletionRequest};

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl From<LlmError> for plotgraph_core::Error {
    fn from(e: LlmError) -> Self {
        plotgraph_core::Error::llm("llm", e.to_string())
    }
}

/// LLM Provider trait
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Issue one non-streaming chat completion.
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionReply>;
}
