//! Template expressions over execution state and node results
//!
//! The grammar is closed: a source is a literal, the self reference
//! (`.` or `$self`), a `${path}` lookup into state, or a plain property of
//! the current result. Paths are dotted; numeric segments index arrays and
//! a leading `state.` is ignored.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    SelfRef,
    StatePath(String),
    Property(String),
}

impl Expr {
    pub fn parse(source: &Value) -> Self {
        let Value::String(s) = source else {
            return Expr::Literal(source.clone());
        };
        if s == "." || s == "$self" {
            return Expr::SelfRef;
        }
        match whole_reference(s) {
            Some(path) => Expr::StatePath(strip_state(path).to_string()),
            None => Expr::Property(s.clone()),
        }
    }

    /// `None` when the referenced value does not exist.
    pub fn eval(&self, result: &Value, state: &Map<String, Value>) -> Option<Value> {
        match self {
            Expr::Literal(v) => Some(v.clone()),
            Expr::SelfRef => Some(result.clone()),
            Expr::StatePath(path) => lookup(state, path).cloned(),
            Expr::Property(name) => lookup_value(result, name).cloned(),
        }
    }
}

/// Look up a dotted path in the state map. The path carries no `state.`
/// prefix; callers normalize with [`state_path`].
pub fn lookup<'a>(state: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next().filter(|s| !s.is_empty())?;
    segments.try_fold(state.get(first)?, step)
}

/// Look up a dotted path inside a value. An empty path is the value itself.
pub fn lookup_value<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, step)
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(m) => m.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn strip_state(path: &str) -> &str {
    path.strip_prefix("state.").unwrap_or(path)
}

/// Normal form of a user-written state path: trimmed, without `state.`.
pub fn state_path(path: &str) -> &str {
    strip_state(path.trim())
}

/// The path of a string that is exactly one `${path}` reference.
fn whole_reference(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains("${") || inner.contains('}') {
        return None;
    }
    Some(inner.trim())
}

enum Segment<'a> {
    Text(&'a str),
    Ref(&'a str),
}

fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find("${") {
        let Some(close) = rest[open..].find('}') else { break };
        if open > 0 {
            out.push(Segment::Text(&rest[..open]));
        }
        out.push(Segment::Ref(rest[open + 2..open + close].trim()));
        rest = &rest[open + close + 1..];
    }
    if !rest.is_empty() {
        out.push(Segment::Text(rest));
    }
    out
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Interpolate a `next` template against a node result. References with a
/// `state.` prefix read state instead. Any reference that does not resolve
/// to a scalar makes the whole template unresolved.
pub fn interpolate(template: &str, result: &Value, state: &Map<String, Value>) -> Option<String> {
    let mut out = String::new();
    for segment in segments(template) {
        match segment {
            Segment::Text(t) => out.push_str(t),
            Segment::Ref(path) => {
                let value = if let Some(path) = path.strip_prefix("state.") {
                    lookup(state, path)
                } else {
                    lookup_value(result, path)
                };
                out.push_str(&value.and_then(scalar_text)?);
            }
        }
    }
    Some(out)
}

/// Resolve an input template against state. A string that is exactly one
/// reference keeps the referenced value's type (`null` when missing);
/// embedded references are spliced as text, missing ones as empty.
pub fn resolve_template(template: &Value, state: &Map<String, Value>) -> Value {
    match template {
        Value::String(s) => {
            if let Some(path) = whole_reference(s) {
                return lookup(state, state_path(path)).cloned().unwrap_or(Value::Null);
            }
            if !s.contains("${") {
                return template.clone();
            }
            let mut out = String::new();
            for segment in segments(s) {
                match segment {
                    Segment::Text(t) => out.push_str(t),
                    Segment::Ref(path) => match lookup(state, state_path(path)) {
                        Some(Value::String(v)) => out.push_str(v),
                        Some(Value::Null) | None => {}
                        Some(other) => out.push_str(&other.to_string()),
                    },
                }
            }
            Value::String(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|i| resolve_template(i, state)).collect()),
        Value::Object(m) => Value::Object(
            m.iter()
                .map(|(k, v)| (k.clone(), resolve_template(v, state)))
                .collect(),
        ),
        other => other.clone(),
    }
}
