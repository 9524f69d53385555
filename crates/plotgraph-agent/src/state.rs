//! Execution state for a single run

use crate::expr::{self, Expr};
use crate::graph::Emit;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

pub const INPUTS: &str = "inputs";
pub const OUTPUT: &str = "output";
pub const LAST_ERROR: &str = "last_error";

static NULL: Value = Value::Null;

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct State {
    values: Map<String, Value>,
}

impl State {
    pub fn new(inputs: Value) -> Self {
        let mut values = Map::new();
        values.insert(INPUTS.into(), inputs);
        Self { values }
    }

    pub fn inputs(&self) -> &Value {
        self.values.get(INPUTS).unwrap_or(&NULL)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Dotted-path lookup, e.g. `shell.analysis.id`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        expr::lookup(&self.values, expr::state_path(path))
    }

    /// Write a key. `inputs` is read-only; writes to it are ignored.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        let key = key.strip_prefix("state.").unwrap_or(key);
        if key == INPUTS {
            return false;
        }
        self.values.insert(key.to_string(), value);
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let key = key.strip_prefix("state.").unwrap_or(key);
        if key == INPUTS {
            return None;
        }
        self.values.remove(key)
    }

    pub fn output(&self) -> Option<&Value> {
        self.values.get(OUTPUT)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }

    /// Apply an emit clause. A source that does not resolve removes the
    /// destination key.
    pub fn apply_emit(&mut self, emit: &Emit, result: &Value) {
        for (dest, source) in emit {
            match Expr::parse(source).eval(result, &self.values) {
                Some(value) => {
                    self.set(dest, value);
                }
                None => {
                    debug!(key = %dest, "emit source missing");
                    self.remove(dest);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inputs_are_read_only() {
        let mut s = State::new(json!({ "csv": "a\n1\n" }));
        assert!(!s.set("inputs", json!(null)));
        assert!(!s.set("state.inputs", json!(null)));
        assert_eq!(s.inputs()["csv"], json!("a\n1\n"));
    }

    #[test]
    fn emit_semantics() {
        let mut s = State::new(json!({}));
        s.set("stale", json!(1));
        s.set("picked", json!("before"));
        s.set("existing", json!("kept"));
        let emit: Emit = serde_json::from_value(json!({
            "whole": ".",
            "state.picked": "shellId",
            "copied": "${existing}",
            "constant": 42,
            "stale": "missing",
        }))
        .unwrap();

        s.apply_emit(&emit, &json!({ "shellId": "scatter" }));

        assert_eq!(s.get("whole"), Some(&json!({ "shellId": "scatter" })));
        assert_eq!(s.get("picked"), Some(&json!("scatter")));
        assert_eq!(s.get("copied"), Some(&json!("kept")));
        assert_eq!(s.get("constant"), Some(&json!(42)));
        assert_eq!(s.get("stale"), None);
    }
}
