use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::matching::similarity::{always, equal, exact, Gate, Similarity};

/// Named gate and similarity functions that declarative rule sets refer to.
///
/// [`MatcherConfig`](super::MatcherConfig) names functions by string; the registry
/// resolves those names when the matcher is built.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    similarities: HashMap<String, Similarity>,
    gates: HashMap<String, Gate>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in functions:
    ///
    /// - similarity `exact`: 1.0 on equality, 0.0 otherwise
    /// - gate `equal`: passes on equality
    /// - gate `always`: always passes
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_similarity("exact", exact);
        registry.register_gate("equal", equal);
        registry.register_gate("always", always);
        registry
    }

    /// Register (or replace) a similarity function
    pub fn register_similarity<F>(&mut self, name: impl Into<String>, similarity: F)
    where
        F: Fn(&Value, &Value) -> f64 + 'static,
    {
        self.similarities.insert(name.into(), Rc::new(similarity));
    }

    /// Register (or replace) a gate predicate
    pub fn register_gate<F>(&mut self, name: impl Into<String>, gate: F)
    where
        F: Fn(&Value, &Value) -> bool + 'static,
    {
        self.gates.insert(name.into(), Rc::new(gate));
    }

    pub fn similarity(&self, name: &str) -> Option<Similarity> {
        self.similarities.get(name).cloned()
    }

    pub fn gate(&self, name: &str) -> Option<Gate> {
        self.gates.get(name).cloned()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut similarities: Vec<&String> = self.similarities.keys().collect();
        similarities.sort();
        let mut gates: Vec<&String> = self.gates.keys().collect();
        gates.sort();
        f.debug_struct("FunctionRegistry")
            .field("similarities", &similarities)
            .field("gates", &gates)
            .finish()
    }
}
