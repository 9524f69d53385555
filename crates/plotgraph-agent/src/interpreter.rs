//! Graph interpreter: walks an execution graph one node at a time.
//!
//! Each step executes the current node, applies its emits to state and
//! resolves the next node id:
//! - control nodes: first matching branch case, else `default`
//! - literal `next` (templates interpolated against the node result)
//! - `on.ok` / `on.error` by the outcome
//! - otherwise the run ends
//!
//! Cyclic graphs are legal, so every run is bounded by a step ceiling.

use crate::api::HttpGetTarget;
use crate::config::PlotgraphConfig;
use crate::expr::{interpolate, resolve_template};
use crate::graph::{Condition, Graph, Node, OnRoutes};
use crate::manifest::{Outcome as RunOutcome, RunTrace};
use crate::ops::{OpContext, OperationRegistry};
use crate::registry::ClientRegistry;
use crate::sandbox::{AnalysisCatalog, AnalysisRunner, CodeSandbox, ProcessSandbox};
use crate::state::{State, LAST_ERROR, OUTPUT};
use crate::tools::{DecisionToolRegistry, PlanContext, PlanSpec};
use plotgraph_core::{Error, Result};
use plotgraph_llm::LlmProvider;
use plotgraph_shells::{ShellRegistry, Validator};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_STEPS: usize = 500;

/// Result of a completed run.
#[derive(Clone, Debug)]
pub struct RunOutput {
    /// Final execution state, `inputs` included.
    pub state: Value,
    /// The value the terminal node emitted (`null` if none).
    pub output: Value,
    pub trace: RunTrace,
}

struct Step {
    ok: bool,
    next: Option<String>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Interpreter {
    graph: Arc<Graph>,
    client: Arc<ClientRegistry>,
    ops: OperationRegistry,
    max_steps: usize,
    busy: AtomicBool,
}

impl Interpreter {
    pub fn new(graph: Graph, client: Arc<ClientRegistry>, ops: OperationRegistry) -> Self {
        Self {
            graph: Arc::new(graph),
            client,
            ops,
            max_steps: DEFAULT_MAX_STEPS,
            busy: AtomicBool::new(false),
        }
    }

    /// Wire the builtin shells, decision tools, operations, API targets and
    /// a process-backed analysis sandbox from config.
    pub fn from_config(graph: Graph, provider: Arc<dyn LlmProvider>, config: &PlotgraphConfig) -> Self {
        let sandbox: Arc<dyn CodeSandbox> = Arc::new(ProcessSandbox::new(
            config.sandbox.python.clone(),
            config.sandbox.timeout_secs,
        ));
        Self::with_services(graph, provider, config, Arc::new(ShellRegistry::builtin()), sandbox)
    }

    pub fn with_services(
        graph: Graph,
        provider: Arc<dyn LlmProvider>,
        config: &PlotgraphConfig,
        shells: Arc<ShellRegistry>,
        sandbox: Arc<dyn CodeSandbox>,
    ) -> Self {
        let mut client = ClientRegistry::new(
            provider,
            config.llm.model.clone(),
            config.llm.generation_params(),
            DecisionToolRegistry::builtin(shells.clone()),
        );
        for target in &config.api.targets {
            client.register_target(HttpGetTarget::new(target.clone()));
        }
        let client = Arc::new(client);
        let analyses = Arc::new(AnalysisRunner::new(AnalysisCatalog::builtin(), sandbox));
        let ops = OperationRegistry::builtin(shells, Validator::new(config.validation), analyses, client.clone());
        Self::new(graph, client, ops).with_max_steps(config.run.max_steps)
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Execute one run. Overlapping runs on the same interpreter are
    /// rejected with `Error::Busy`.
    pub async fn run(&self, inputs: Value) -> Result<RunOutput> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let mut state = State::new(inputs);
        let mut trace = RunTrace::new(&self.graph.start);
        info!(run_id = %trace.run_id, start = %self.graph.start, "run started");

        match self.walk(&mut state, &mut trace).await {
            Ok(()) => {
                trace.finalize(RunOutcome::Success);
                info!(run_id = %trace.run_id, steps = trace.steps.len(), outcome = %trace.outcome, "run complete");
                let output = state.output().cloned().unwrap_or(Value::Null);
                Ok(RunOutput {
                    state: state.into_value(),
                    output,
                    trace,
                })
            }
            Err(e) => {
                let outcome = match e {
                    Error::StepBudgetExhausted { .. } => RunOutcome::Exhausted,
                    _ => RunOutcome::Failure,
                };
                trace.finalize(outcome);
                warn!(run_id = %trace.run_id, steps = trace.steps.len(), outcome = %trace.outcome, error = %e, "run aborted");
                debug!("{}", trace.summary_line());
                Err(e)
            }
        }
    }

    /// `run` bounded by a wall-clock timeout. A timed-out run is abandoned
    /// and its partial state dropped.
    pub async fn run_with_timeout(&self, inputs: Value, timeout: Duration) -> Result<RunOutput> {
        match tokio::time::timeout(timeout, self.run(inputs)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "run timed out");
                Err(Error::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    async fn walk(&self, state: &mut State, trace: &mut RunTrace) -> Result<()> {
        let mut current = Some(self.graph.start.clone());
        let mut previous = String::from("start");
        let mut steps = 0usize;

        while let Some(id) = current {
            if steps >= self.max_steps {
                return Err(Error::StepBudgetExhausted { steps, node: id });
            }
            steps += 1;

            let node = self.graph.node(&id).ok_or_else(|| Error::DanglingReference {
                node: previous.clone(),
                target: id.clone(),
            })?;
            info!(run_id = %trace.run_id, step = steps, node = %id, kind = node.kind(), "executing node");

            let started = Instant::now();
            let step = self
                .execute(&id, node, state)
                .await
                .map_err(|e| e.at_node(&id, node.op_label()))?;
            let wall_ms = started.elapsed().as_millis() as u64;

            debug!(node = %id, ok = step.ok, next = ?step.next, wall_ms, "node finished");
            trace.record(&id, node.kind(), step.ok, step.next.as_deref(), wall_ms);
            previous = id;
            current = step.next;
        }
        Ok(())
    }

    async fn execute(&self, id: &str, node: &Node, state: &mut State) -> Result<Step> {
        match node {
            Node::Planner(n) => {
                let spec = PlanSpec::from_node(n);
                let decision = {
                    let ctx = PlanContext {
                        node_id: id,
                        graph: &self.graph,
                        state: &*state,
                    };
                    self.client.plan(&ctx, &spec).await?
                };
                state.apply_emit(&n.emit, &decision);
                let next = resolve_next(n.next.as_deref(), n.on.as_ref(), true, &decision, state);
                Ok(Step { ok: true, next })
            }
            Node::Executor(n) => {
                let op = self.ops.get(&n.run.op).ok_or_else(|| Error::UnknownOperation {
                    node: id.to_string(),
                    op: n.run.op.clone(),
                })?;
                let input = resolve_template(&n.run.input, state.as_map());
                let ctx = OpContext {
                    node: id.to_string(),
                    target: n.run.target.clone(),
                };
                let outcome = op.run(&ctx, input).await?;

                if outcome.ok {
                    state.apply_emit(&n.emit, &outcome.result);
                } else {
                    let (code, message) = outcome
                        .error
                        .as_ref()
                        .map(|e| (e.code.as_str(), e.message.as_str()))
                        .unwrap_or(("failed", ""));
                    warn!(node = id, op = %n.run.op, code, message, "operation failed");
                    let mut last_error = json!({ "node": id, "code": code, "message": message });
                    if !outcome.result.is_null() {
                        last_error["details"] = outcome.result.clone();
                    }
                    state.set(LAST_ERROR, last_error);
                }

                let next = resolve_next(n.next.as_deref(), n.on.as_ref(), outcome.ok, &outcome.result, state);
                Ok(Step { ok: outcome.ok, next })
            }
            Node::Control(n) => Ok(Step {
                ok: true,
                next: branch(&n.condition, state),
            }),
            Node::Terminal(n) => {
                let output = match &n.emit {
                    Some(template) => resolve_template(template, state.as_map()),
                    None => state.output().cloned().unwrap_or(Value::Null),
                };
                state.set(OUTPUT, output);
                Ok(Step { ok: true, next: None })
            }
        }
    }
}

/// Literal or templated `next` first, then `on` by outcome.
fn resolve_next(next: Option<&str>, on: Option<&OnRoutes>, ok: bool, result: &Value, state: &State) -> Option<String> {
    if let Some(next) = next {
        if !next.contains("${") {
            return Some(next.to_string());
        }
        let resolved = interpolate(next, result, state.as_map());
        if resolved.is_none() {
            debug!(template = next, "next template unresolved; terminating");
        }
        return resolved;
    }
    on.and_then(|o| o.pick(ok).cloned())
}

/// First case whose `when.path` equals `when.equals`, else `default`.
pub fn branch(condition: &Condition, state: &State) -> Option<String> {
    condition
        .cases
        .iter()
        .find(|c| state.lookup(&c.when.path) == Some(&c.when.equals))
        .map(|c| c.next.clone())
        .or_else(|| condition.default.clone())
}
