//! Shell registry
//!
//! An explicitly constructed catalog of shells. Build it once with
//! [`ShellRegistry::builtin`] (or [`ShellRegistry::new`] plus `register` for
//! synthetic shells) and share it read-only behind an `Arc`.

use crate::shell::ShellDefinition;
use plotgraph_core::{Error, Result, SemanticType};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub struct ShellRegistry {
    shells: BTreeMap<String, ShellDefinition>,
}

impl ShellRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every builtin shell.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        for shell in crate::shells::all() {
            reg.register(shell);
        }
        reg
    }

    /// Register a shell. Replaces any existing shell with the same id.
    pub fn register(&mut self, shell: ShellDefinition) {
        self.shells.insert(shell.id.clone(), shell);
    }

    pub fn get(&self, id: &str) -> Option<&ShellDefinition> {
        self.shells.get(id)
    }

    /// Like `get`, but an unregistered id is an error.
    pub fn lookup(&self, id: &str) -> Result<&ShellDefinition> {
        self.get(id).ok_or_else(|| Error::UnknownShell(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.shells.contains_key(id)
    }

    /// Shell ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.shells.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShellDefinition> {
        self.shells.values()
    }

    pub fn len(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }

    /// Ids of shells with a signature fully covered by `available` types.
    pub fn compatible_ids(&self, available: &[SemanticType]) -> Vec<&str> {
        self.iter()
            .filter(|s| s.is_compatible_with(available))
            .map(|s| s.id.as_str())
            .collect()
    }
}
