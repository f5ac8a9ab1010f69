use indexmap::IndexMap;

use crate::model::BoundExpression;

/// Source of named expression bindings.
pub trait ExpressionCatalog {
    fn lookup(&self, name: &str) -> Option<&BoundExpression>;

    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

/// Insertion-ordered in-memory catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryExprCatalog {
    bindings: IndexMap<String, BoundExpression>,
}

impl MemoryExprCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style binding.
    pub fn with(mut self, name: &str, expression: BoundExpression) -> Self {
        self.bind(name, expression);
        self
    }

    /// Returns the expression previously bound to `name`, if any.
    pub fn bind(&mut self, name: &str, expression: BoundExpression) -> Option<BoundExpression> {
        self.bindings.insert(name.to_string(), expression)
    }

    pub fn unbind(&mut self, name: &str) -> Option<BoundExpression> {
        self.bindings.shift_remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect::<Vec<_>>()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl ExpressionCatalog for MemoryExprCatalog {
    fn lookup(&self, name: &str) -> Option<&BoundExpression> {
        self.bindings.get(name)
    }
}
