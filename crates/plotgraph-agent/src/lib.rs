//! plotgraph-agent — Graph interpreter for dataset-to-chart runs
//!
//! A declarative graph alternates constrained LLM decisions (planner
//! nodes), deterministic operations (executor nodes) and branches on
//! state (control nodes) until a terminal node emits the output.

pub mod api;
pub mod config;
pub mod expr;
pub mod graph;
pub mod interpreter;
pub mod manifest;
pub mod ops;
pub mod registry;
pub mod sandbox;
pub mod state;
pub mod tools;

pub use api::{ApiTarget, ApiTargetConfig, HttpGetTarget};
pub use config::PlotgraphConfig;
pub use graph::{Graph, Node, DEFAULT_CHART_GRAPH};
pub use interpreter::{Interpreter, RunOutput, DEFAULT_MAX_STEPS};
pub use manifest::{Outcome as RunOutcome, RunTrace, StepRecord};
pub use ops::{OpContext, Operation, OperationRegistry};
pub use registry::ClientRegistry;
pub use sandbox::{AnalysisCatalog, AnalysisRunner, CodeSandbox, ProcessSandbox, SandboxError, SandboxSlot};
pub use state::State;
pub use tools::{DecisionTool, DecisionToolRegistry, PlanContext, PlanSpec};
