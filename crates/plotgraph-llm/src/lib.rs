//! plotgraph LLM - Chat-completion gateway with forced tool calls

pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiProvider;
pub use provider::{LlmError, LlmProvider, LlmResult};
pub use types::*;
