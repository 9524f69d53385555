//! Run trace, a structured record of every graph run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RunTrace {
    pub run_id: String,
    pub graph_start: String,
    pub started: DateTime<Utc>,
    pub ended: Option<DateTime<Utc>>,
    pub outcome: Outcome,
    pub total_wall_ms: u64,
    pub steps: Vec<StepRecord>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Success,
    Failure,
    Exhausted,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StepRecord {
    pub step: usize,
    pub node: String,
    pub kind: String,
    pub ok: bool,
    pub next: Option<String>,
    pub wall_ms: u64,
}

impl RunTrace {
    pub fn new(graph_start: &str) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            graph_start: graph_start.into(),
            started: Utc::now(),
            ended: None,
            outcome: Outcome::Pending,
            total_wall_ms: 0,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, node: &str, kind: &str, ok: bool, next: Option<&str>, wall_ms: u64) {
        self.steps.push(StepRecord {
            step: self.steps.len() + 1,
            node: node.into(),
            kind: kind.into(),
            ok,
            next: next.map(String::from),
            wall_ms,
        });
    }

    pub fn finalize(&mut self, outcome: Outcome) {
        let ended = Utc::now();
        self.outcome = outcome;
        self.ended = Some(ended);
        self.total_wall_ms = (ended - self.started).num_milliseconds().max(0) as u64;
    }

    /// Node ids in execution order.
    pub fn path(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.node.as_str()).collect()
    }

    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "| {} | {} | {} | {} steps | {} ms | {} |",
            self.run_id,
            self.graph_start,
            self.started.format("%Y-%m-%dT%H:%M:%S"),
            self.steps.len(),
            self.total_wall_ms,
            self.outcome,
        )
    }
}
