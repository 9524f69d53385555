//! Error types for plotgraph
//!
//! Only unrecoverable failures live here. Validation failures and API call
//! failures travel as [`crate::Outcome`] values so graphs can route on them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // --- graph structure ---
    #[error("graph has no start node")]
    MissingStart,

    #[error("node {node}: unknown node type '{kind}'")]
    UnknownNodeType { node: String, kind: String },

    #[error("node {node}: {message}")]
    InvalidNode { node: String, message: String },

    #[error("node {node}: references unknown node '{target}'")]
    DanglingReference { node: String, target: String },

    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("node {node}: unknown operation '{op}'")]
    UnknownOperation { node: String, op: String },

    #[error("step budget of {steps} exhausted at node {node}")]
    StepBudgetExhausted { steps: usize, node: String },

    #[error("interpreter is already running")]
    Busy,

    #[error("run timed out after {0}ms")]
    Timeout(u64),

    // --- planning ---
    #[error("planner did not produce tool call '{tool}'")]
    NoDecision { tool: String },

    #[error("decision failed schema: {}", violations.join("; "))]
    DecisionSchema { violations: Vec<String> },

    #[error("enum source error: {0}")]
    EnumSource(String),

    // --- catalog lookups ---
    #[error("unknown shell: {0}")]
    UnknownShell(String),

    #[error("unknown analysis: {0}")]
    UnknownAnalysis(String),

    // --- data ---
    #[error("dataset error: {0}")]
    Dataset(String),

    // --- external ---
    #[error("llm error: {provider} - {message}")]
    Llm { provider: String, message: String },

    #[error("api {target}: {message}")]
    Api { target: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),

    /// A fatal error raised while a node was executing.
    #[error("node {node} ({op}) failed: {source}")]
    NodeFailed {
        node: String,
        op: String,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_node(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidNode {
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn llm(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Llm {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn api(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn no_decision(tool: impl Into<String>) -> Self {
        Self::NoDecision { tool: tool.into() }
    }

    /// Attach the failing node and operation. Already-attributed errors pass through.
    pub fn at_node(self, node: impl Into<String>, op: impl Into<String>) -> Self {
        match self {
            Self::NodeFailed { .. } | Self::StepBudgetExhausted { .. } => self,
            other => Self::NodeFailed {
                node: node.into(),
                op: op.into(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping node attribution.
    pub fn root(&self) -> &Error {
        match self {
            Self::NodeFailed { source, .. } => source.root(),
            other => other,
        }
    }
}
