//! Per-evaluation state: root inputs and the memo table.

use std::collections::HashMap;

use crate::name::NodeName;
use crate::node::Node;
use crate::value::Value;

/// Root input values for one evaluation.
///
/// A value supplied for a non-root node overrides its computation, which is
/// handy for injecting already known intermediate results.
#[derive(Clone, Default)]
pub struct Roots {
    values: HashMap<NodeName, Value>,
}

impl Roots {
    /// Create an empty set of root values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply the value of a node.
    pub fn insert(&mut self, node: &Node, value: Value) {
        self.values.insert(node.name().clone(), value);
    }

    /// Supply the value of a node, builder style.
    #[must_use]
    pub fn with(mut self, node: &Node, value: Value) -> Self {
        self.insert(node, value);
        self
    }

    /// Get a supplied value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Number of supplied values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing was supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for Roots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

/// Memo table for a single evaluation.
///
/// Every node computes at most once per context, and every consumer receives
/// the same shared [`Value`]. A context is meant to be created for one request
/// (one revision, or one revision pair), evaluated and then dropped; it is
/// exclusively borrowed while the resolver works on it.
#[derive(Default)]
pub struct Context {
    roots: Roots,
    cache: HashMap<NodeName, Value>,
    /// Active resolution stack for cycle detection.
    active: Vec<NodeName>,
    computed: usize,
}

impl Context {
    /// Create a context without root values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from root values.
    pub fn with_roots(roots: Roots) -> Self {
        Self {
            roots,
            ..Self::default()
        }
    }

    /// Supply a root value.
    pub fn insert_root(&mut self, node: &Node, value: Value) {
        self.roots.insert(node, value);
    }

    /// The root values of this context.
    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    /// Get the value of a node if it was supplied or has been computed.
    pub fn get(&self, node: &Node) -> Option<&Value> {
        self.roots
            .get(node.name().as_str())
            .or_else(|| self.cache.get(node.name()))
    }

    /// Returns `true` if the node has been computed in this context.
    pub fn is_cached(&self, node: &Node) -> bool {
        self.cache.contains_key(node.name())
    }

    /// Number of computed values held.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if nothing has been computed yet.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Number of process function invocations made in this context.
    pub fn computed(&self) -> usize {
        self.computed
    }

    pub(crate) fn lookup(&self, name: &NodeName) -> Option<Value> {
        self.roots
            .get(name.as_str())
            .or_else(|| self.cache.get(name))
            .cloned()
    }

    pub(crate) fn store(&mut self, name: NodeName, value: Value) {
        self.computed += 1;
        self.cache.insert(name, value);
    }

    /// Push a node onto the active stack.
    ///
    /// Fails with the cycle path if the node is already being resolved.
    pub(crate) fn enter(&mut self, name: &NodeName) -> Result<(), Vec<String>> {
        if self.active.contains(name) {
            let mut path: Vec<String> = self.active.iter().map(|n| n.to_string()).collect();
            path.push(name.to_string());
            return Err(path);
        }
        self.active.push(name.clone());
        Ok(())
    }

    pub(crate) fn exit(&mut self) {
        self.active.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roots_take_precedence() {
        let node = Node::root("revision.text");
        let mut ctx = Context::with_roots(Roots::new().with(&node, Value::new(1i64)));
        ctx.store(node.name().clone(), Value::new(2i64));

        assert_eq!(ctx.get(&node).and_then(|v| v.downcast_ref::<i64>()), Some(&1));
        assert_eq!(ctx.roots().len(), 1);
    }

    #[test]
    fn test_store_counts_computations() {
        let mut ctx = Context::new();
        assert!(ctx.is_empty());

        let node = Node::root("x");
        ctx.store(node.name().clone(), Value::new(7i64));
        assert!(ctx.is_cached(&node));
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.computed(), 1);

        let cached = ctx.lookup(node.name());
        assert!(cached.is_some_and(|v| v.ptr_eq(ctx.get(&node).unwrap())));
    }

    #[test]
    fn test_enter_detects_reentry() {
        let mut ctx = Context::new();
        let a = NodeName::from("a");
        let b = NodeName::from("b");

        assert!(ctx.enter(&a).is_ok());
        assert!(ctx.enter(&b).is_ok());
        assert_eq!(
            ctx.enter(&a),
            Err(vec!["a".to_string(), "b".to_string(), "a".to_string()])
        );

        ctx.exit();
        ctx.exit();
        assert!(ctx.enter(&a).is_ok());
    }
}
