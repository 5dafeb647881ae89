//! Explicit node registry.

use std::collections::{HashMap, HashSet};

use slab::Slab;

use crate::error::Error;
use crate::name::NodeName;
use crate::node::{Dependency, Node};

/// Identifier of a node within a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Catalogue of nodes known to a host application.
///
/// The registry replaces process-wide feature singletons: the host builds one
/// at startup, hands it to a [`Resolver`](crate::Resolver), and from then on it
/// is shared read-only. It serves dependencies declared by name
/// ([`Dependency::Named`]) and allows checking the whole graph for cycles up
/// front.
///
/// Nodes are deduplicated by name; registering a node whose name is already
/// known returns the existing id.
#[derive(Default)]
pub struct Registry {
    nodes: Slab<Node>,
    index: HashMap<NodeName, usize>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and, transitively, every node it holds directly.
    pub fn register(&mut self, node: &Node) -> NodeId {
        if let Some(&key) = self.index.get(node.name()) {
            return NodeId(key);
        }
        for dependency in node.dependencies() {
            if let Dependency::Node(dependency) = dependency {
                self.register(dependency);
            }
        }
        let key = self.nodes.insert(node.clone());
        self.index.insert(node.name().clone(), key);
        NodeId(key)
    }

    /// Register several nodes.
    pub fn extend<'a>(&mut self, nodes: impl IntoIterator<Item = &'a Node>) {
        for node in nodes {
            self.register(node);
        }
    }

    /// Look up a node by name.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.index.get(name).and_then(|&key| self.nodes.get(key))
    }

    /// Look up a node by id.
    pub fn get_by_id(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Id of a registered node.
    pub fn id(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied().map(NodeId)
    }

    /// Returns `true` if a node with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over registered nodes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().map(|(_, node)| node)
    }

    /// Resolve a declared dependency to a node.
    pub fn dependency(&self, dependency: &Dependency) -> Result<Node, Error> {
        match dependency {
            Dependency::Node(node) => Ok(node.clone()),
            Dependency::Named(name) => self.get(name.as_str()).cloned().ok_or_else(|| {
                Error::UnknownNode { name: name.clone() }
            }),
        }
    }

    /// Compute a dependency order for the given nodes.
    ///
    /// Returns every node reachable from `nodes` exactly once, each after all
    /// of its dependencies. Fails on cycles and unknown named dependencies.
    pub fn dependency_order(&self, nodes: &[Node]) -> Result<Vec<Node>, Error> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut active = Vec::new();
        for node in nodes {
            self.visit(node, &mut active, &mut done, &mut order)?;
        }
        Ok(order)
    }

    /// Check that the registered graph is acyclic and fully resolvable.
    pub fn check(&self) -> Result<(), Error> {
        let nodes: Vec<Node> = self.iter().cloned().collect();
        self.dependency_order(&nodes).map(|_| ())
    }

    fn visit(
        &self,
        node: &Node,
        active: &mut Vec<NodeName>,
        done: &mut HashSet<NodeName>,
        order: &mut Vec<Node>,
    ) -> Result<(), Error> {
        if done.contains(node.name()) {
            return Ok(());
        }
        if active.contains(node.name()) {
            let mut path: Vec<String> = active.iter().map(|n| n.to_string()).collect();
            path.push(node.name().to_string());
            return Err(Error::Cycle { path });
        }
        active.push(node.name().clone());
        for dependency in node.dependencies() {
            let dependency = self.dependency(dependency)?;
            self.visit(&dependency, active, done, order)?;
        }
        active.pop();
        done.insert(node.name().clone());
        order.push(node.clone());
        Ok(())
    }
}
