//! Execution graph model and loader
//!
//! A graph document has a `start` node id and a `nodes` map. Each node is
//! tagged by `type` and only carries the fields its kind uses; anything
//! else is rejected at load time, together with dangling literal
//! references and emits that would overwrite `inputs`.

use indexmap::IndexMap;
use plotgraph_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

pub type NodeId = String;

/// Destination state key -> source expression.
pub type Emit = IndexMap<String, Value>;

/// The default dataset-to-chart graph.
pub const DEFAULT_CHART_GRAPH: &str = include_str!("../graphs/chart.yml");

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OnRoutes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<NodeId>,
}

impl OnRoutes {
    pub fn pick(&self, ok: bool) -> Option<&NodeId> {
        if ok {
            self.ok.as_ref()
        } else {
            self.error.as_ref()
        }
    }
}

/// Equality filter applied to array elements.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldFilter {
    pub field: String,
    pub equals: Value,
}

impl FieldFilter {
    pub fn matches(&self, item: &Value) -> bool {
        item.get(&self.field) == Some(&self.equals)
    }
}

/// Dynamic enumeration for a planner decision field: read an array from
/// state, filter it, project one string field per element.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EnumSource {
    pub state: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FieldFilter>,
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlannerNode {
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_from: Option<EnumSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<OnRoutes>,
    #[serde(default)]
    pub emit: Emit,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunSpec {
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub input: Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutorNode {
    pub run: RunSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<OnRoutes>,
    #[serde(default)]
    pub emit: Emit,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionOp {
    #[serde(rename = "branch", alias = "control.branch")]
    Branch,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct When {
    pub path: String,
    #[serde(default)]
    pub equals: Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BranchCase {
    pub when: When,
    pub next: NodeId,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    pub op: ConditionOp,
    #[serde(default)]
    pub cases: Vec<BranchCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<NodeId>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ControlNode {
    pub condition: Condition,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TerminalNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emit: Option<Value>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Planner(PlannerNode),
    Executor(ExecutorNode),
    Control(ControlNode),
    Terminal(TerminalNode),
}

impl Node {
    /// Decode one node from its document form, dispatching on `type`.
    pub fn from_value(id: &str, value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::invalid_node(id, "node must be a mapping"));
        };
        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(other) => {
                return Err(Error::UnknownNodeType {
                    node: id.to_string(),
                    kind: other.to_string(),
                })
            }
            None => return Err(Error::invalid_node(id, "missing node type")),
        };
        let body = Value::Object(fields);
        let invalid = |e: serde_json::Error| Error::invalid_node(id, e.to_string());
        let node = match kind.as_str() {
            "planner" => Node::Planner(serde_json::from_value(body).map_err(invalid)?),
            "executor" => Node::Executor(serde_json::from_value(body).map_err(invalid)?),
            "control" => Node::Control(serde_json::from_value(body).map_err(invalid)?),
            "terminal" => Node::Terminal(serde_json::from_value(body).map_err(invalid)?),
            _ => {
                return Err(Error::UnknownNodeType {
                    node: id.to_string(),
                    kind,
                })
            }
        };
        Ok(node)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Planner(_) => "planner",
            Node::Executor(_) => "executor",
            Node::Control(_) => "control",
            Node::Terminal(_) => "terminal",
        }
    }

    /// Operation label used when attributing a failure to this node.
    pub fn op_label(&self) -> &str {
        match self {
            Node::Planner(_) => "plan",
            Node::Executor(n) => &n.run.op,
            Node::Control(_) => "branch",
            Node::Terminal(_) => "terminal",
        }
    }

    pub fn emit(&self) -> Option<&Emit> {
        match self {
            Node::Planner(n) => Some(&n.emit),
            Node::Executor(n) => Some(&n.emit),
            _ => None,
        }
    }

    /// Literal node references. Templated `next` values are skipped.
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        match self {
            Node::Planner(n) => route_refs(&n.next, &n.on, &mut refs),
            Node::Executor(n) => route_refs(&n.next, &n.on, &mut refs),
            Node::Control(n) => {
                refs.extend(n.condition.cases.iter().map(|c| c.next.as_str()));
                refs.extend(n.condition.default.as_deref());
            }
            Node::Terminal(_) => {}
        }
        refs
    }
}

fn route_refs<'a>(next: &'a Option<String>, on: &'a Option<OnRoutes>, refs: &mut Vec<&'a str>) {
    if let Some(n) = next.as_deref().filter(|n| !n.contains("${")) {
        refs.push(n);
    }
    if let Some(on) = on {
        refs.extend(on.ok.as_deref());
        refs.extend(on.error.as_deref());
    }
}

#[derive(Deserialize)]
struct RawGraph {
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    nodes: IndexMap<String, Value>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Graph {
    pub start: NodeId,
    pub nodes: IndexMap<NodeId, Node>,
}

impl Graph {
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawGraph = serde_json::from_value(value).map_err(|e| Error::InvalidGraph(e.to_string()))?;
        let start = raw.start.filter(|s| !s.trim().is_empty()).ok_or(Error::MissingStart)?;

        let mut nodes = IndexMap::with_capacity(raw.nodes.len());
        for (id, body) in raw.nodes {
            let node = Node::from_value(&id, body)?;
            nodes.insert(id, node);
        }

        let graph = Self { start, nodes };
        graph.check()?;
        debug!(start = %graph.start, nodes = graph.nodes.len(), "graph loaded");
        Ok(graph)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| Error::InvalidGraph(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidGraph(e.to_string()))?;
        Self::from_value(value)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            _ => Self::from_yaml(&text),
        }
    }

    pub fn default_chart() -> Result<Self> {
        Self::from_yaml(DEFAULT_CHART_GRAPH)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.keys().map(String::as_str).collect()
    }

    fn check(&self) -> Result<()> {
        if !self.nodes.contains_key(&self.start) {
            return Err(Error::DanglingReference {
                node: "start".into(),
                target: self.start.clone(),
            });
        }
        for (id, node) in &self.nodes {
            for target in node.references() {
                if !self.nodes.contains_key(target) {
                    return Err(Error::DanglingReference {
                        node: id.clone(),
                        target: target.to_string(),
                    });
                }
            }
            if let Some(emit) = node.emit() {
                for key in emit.keys() {
                    let key = key.strip_prefix("state.").unwrap_or(key);
                    if key == crate::state::INPUTS || key.starts_with("inputs.") {
                        return Err(Error::invalid_node(id, "emit may not write to inputs"));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chart_graph_loads() {
        let g = Graph::default_chart().unwrap();
        assert_eq!(g.start, "parse");
        assert!(matches!(g.node("done"), Some(Node::Terminal(_))));
        assert!(matches!(g.node("choose"), Some(Node::Planner(_))));
    }

    #[test]
    fn control_branch_alias() {
        let g = Graph::from_yaml(
            r#"
start: a
nodes:
  a:
    type: control
    condition:
      op: control.branch
      cases: []
      default: b
  b:
    type: terminal
"#,
        )
        .unwrap();
        let Some(Node::Control(c)) = g.node("a") else { panic!("not a control node") };
        assert_eq!(c.condition.op, ConditionOp::Branch);
        assert_eq!(c.condition.default.as_deref(), Some("b"));
    }

    #[test]
    fn fields_of_other_kinds_are_rejected() {
        let err = Graph::from_yaml(
            r#"
start: a
nodes:
  a:
    type: terminal
    tools: [route]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidNode { ref node, .. } if node == "a"));
    }

    #[test]
    fn templated_next_is_not_checked_at_load() {
        let g = Graph::from_yaml(
            r#"
start: a
nodes:
  a:
    type: planner
    next: "${next}"
"#,
        );
        assert!(g.is_ok());
    }
}
