//! Node kind registry.

use std::sync::Arc;

use hashbrown::HashMap;

use super::{builtin, NodeDefinition};
use crate::{Error, Result};

/// Node definitions by kind name. Shared by every graph built from it.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    definitions: HashMap<String, Arc<NodeDefinition>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in catalog.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Registers `definition`, replacing any kind of the same name.
    pub fn register(&mut self, definition: NodeDefinition) -> &mut Self {
        if self.definitions.contains_key(&definition.name) {
            tracing::debug!(kind = %definition.name, "replacing node definition");
        }
        self.definitions.insert(definition.name.clone(), Arc::new(definition));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<NodeDefinition>> {
        self.definitions.get(name)
    }

    pub fn require(&self, name: &str) -> Result<Arc<NodeDefinition>> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownNodeKind(name.to_string()))
    }

    /// Kind names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalContext, EvalResult, OutputDefinition};
    use crate::model::{Loop, ValueKind};

    fn constant(_: &[Loop], _: &EvalContext<'_>) -> EvalResult {
        EvalResult::outputs(vec![Loop::single(1.0)])
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut registry = NodeRegistry::new();
        registry.register(NodeDefinition::patch("one", constant));
        registry.register(
            NodeDefinition::patch("one", constant).output(OutputDefinition::new("out", ValueKind::Number)),
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("one").unwrap().outputs.len(), 1);
    }

    #[test]
    fn test_unknown_kind() {
        let registry = NodeRegistry::new();
        assert!(matches!(registry.require("nope"), Err(Error::UnknownNodeKind(name)) if name == "nope"));
    }

    #[test]
    fn test_builtins_present() {
        let registry = NodeRegistry::with_builtins();
        for name in ["add", "counter", "networkRequest", "sizePack", "value", "rectangle"] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
    }
}
