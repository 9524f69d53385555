//! Analysis sandbox: an opaque, single-slot code execution service
//!
//! Analyses are named Python procedures exposing `run(dataset_path)` that
//! return a list of row objects. The runner wraps the procedure so it
//! prints its rows as JSON, executes it through a `CodeSandbox`, and
//! parses the printed array.

use async_trait::async_trait;
use plotgraph_core::{Error, Row};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error as ThisError;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, ThisError)]
pub enum SandboxError {
    #[error("sandbox already running")]
    AlreadyRunning,

    #[error("execution failed: {0}")]
    Failed(String),

    #[error("execution timed out after {0}s")]
    Timeout(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Outcome code used by executor operations.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "sandbox_busy",
            _ => "analysis_failed",
        }
    }
}

#[async_trait]
pub trait CodeSandbox: Send + Sync {
    /// Run a program and return what it printed on stdout.
    async fn execute(&self, code: &str) -> Result<String, SandboxError>;
}

#[async_trait]
impl<T: CodeSandbox + ?Sized> CodeSandbox for Arc<T> {
    async fn execute(&self, code: &str) -> Result<String, SandboxError> {
        (**self).execute(code).await
    }
}

/// Runs `<python> -c <code>` as a child process.
pub struct ProcessSandbox {
    python: String,
    timeout_secs: u64,
}

impl ProcessSandbox {
    pub fn new(python: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            python: python.into(),
            timeout_secs,
        }
    }
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        Self::new("python3", 60)
    }
}

#[async_trait]
impl CodeSandbox for ProcessSandbox {
    async fn execute(&self, code: &str) -> Result<String, SandboxError> {
        let output = match tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            Command::new(&self.python).arg("-c").arg(code).kill_on_drop(true).output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(SandboxError::Io(e)),
            Err(_) => return Err(SandboxError::Timeout(self.timeout_secs)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SandboxError::Failed(format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Admits one execution at a time. A call while another is in flight
/// fails immediately with `AlreadyRunning`.
pub struct SandboxSlot<S> {
    sandbox: S,
    busy: AtomicBool,
}

struct SlotGuard<'a>(&'a AtomicBool);

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: CodeSandbox> SandboxSlot<S> {
    pub fn new(sandbox: S) -> Self {
        Self {
            sandbox,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn execute(&self, code: &str) -> Result<String, SandboxError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SandboxError::AlreadyRunning);
        }
        let _guard = SlotGuard(&self.busy);
        self.sandbox.execute(code).await
    }
}

/// Named analysis procedures.
#[derive(Clone, Debug, Default)]
pub struct AnalysisCatalog {
    scripts: BTreeMap<String, String>,
}

impl AnalysisCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register("correlation_matrix", include_str!("../analyses/correlation_matrix.py"));
        catalog.register("summary_statistics", include_str!("../analyses/summary_statistics.py"));
        catalog.register("missing_value_report", include_str!("../analyses/missing_value_report.py"));
        catalog.register("cardinality_report", include_str!("../analyses/cardinality_report.py"));
        catalog
    }

    pub fn register(&mut self, id: impl Into<String>, source: impl Into<String>) {
        self.scripts.insert(id.into(), source.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.scripts.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.scripts.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.scripts.keys().map(String::as_str).collect()
    }
}

pub struct AnalysisRunner {
    catalog: AnalysisCatalog,
    slot: SandboxSlot<Arc<dyn CodeSandbox>>,
}

impl AnalysisRunner {
    pub fn new(catalog: AnalysisCatalog, sandbox: Arc<dyn CodeSandbox>) -> Self {
        Self {
            catalog,
            slot: SandboxSlot::new(sandbox),
        }
    }

    pub fn catalog(&self) -> &AnalysisCatalog {
        &self.catalog
    }

    /// The program that runs analysis `id` on `dataset_path` and prints its
    /// rows as one JSON line. Unknown ids are an error.
    pub fn program(&self, id: &str, dataset_path: &str) -> plotgraph_core::Result<String> {
        let source = self
            .catalog
            .get(id)
            .ok_or_else(|| Error::UnknownAnalysis(id.to_string()))?;
        let path = serde_json::to_string(dataset_path)?;
        Ok(format!(
            "import json\n{source}\n\nprint(json.dumps(run({path}), allow_nan=False))\n"
        ))
    }

    /// Execute a program from `program` and parse its rows.
    pub async fn execute(&self, program: &str) -> Result<Vec<Row>, SandboxError> {
        let stdout = self.slot.execute(program).await?;
        let rows = parse_rows(&stdout)?;
        debug!(rows = rows.len(), "analysis finished");
        Ok(rows)
    }

    pub async fn run(&self, id: &str, dataset_path: &str) -> plotgraph_core::Result<Result<Vec<Row>, SandboxError>> {
        let program = self.program(id, dataset_path)?;
        Ok(self.execute(&program).await)
    }
}

/// The last non-empty stdout line must be a JSON array of objects.
fn parse_rows(stdout: &str) -> Result<Vec<Row>, SandboxError> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| SandboxError::Failed("analysis printed nothing".into()))?;
    let value: Value =
        serde_json::from_str(line).map_err(|e| SandboxError::Failed(format!("invalid analysis output: {e}")))?;
    let Value::Array(items) = value else {
        warn!("analysis output is not an array");
        return Err(SandboxError::Failed("analysis did not return an array".into()));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(row) => Ok(row),
            _ => Err(SandboxError::Failed("analysis rows must be objects".into())),
        })
        .collect()
}
