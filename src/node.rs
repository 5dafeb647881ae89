//! Node definitions: the unit of computation in a feature graph.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::ValueError;
use crate::name::{format_name, NodeName};
use crate::value::{Value, ValueType};

/// Label naming a fallback when none is given.
const DEFAULT_FALLBACK_LABEL: &str = "on_missing";

/// Process function of a node.
///
/// Receives exactly one resolved value per declared dependency, in
/// declaration order. Any error type can be propagated with `?`.
pub type ProcessFn = Arc<dyn Fn(&Args<'_>) -> anyhow::Result<Value> + Send + Sync>;

/// Fallback invoked by node families that support it when a dependency
/// resolves to an absent value.
pub type Fallback = Arc<dyn Fn() -> anyhow::Result<Value> + Send + Sync>;

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A value supplied directly to a context, never computed.
    Root,
    /// An intermediate value (tables, parsed structures, ...).
    Datasource,
    /// A scalar value intended for a feature vector.
    Feature,
}

/// A declared dependency of a node.
#[derive(Clone)]
pub enum Dependency {
    /// A node held directly.
    Node(Node),
    /// A node looked up by name in the resolver's [`Registry`](crate::Registry).
    Named(NodeName),
}

impl Dependency {
    /// Name of the depended-on node.
    pub fn name(&self) -> &NodeName {
        match self {
            Dependency::Node(node) => node.name(),
            Dependency::Named(name) => name,
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Node(node) => write!(f, "{:?}", node),
            Dependency::Named(name) => write!(f, "Named({:?})", name),
        }
    }
}

impl From<Node> for Dependency {
    fn from(node: Node) -> Self {
        Dependency::Node(node)
    }
}

impl From<&Node> for Dependency {
    fn from(node: &Node) -> Self {
        Dependency::Node(node.clone())
    }
}

struct NodeInner {
    name: NodeName,
    kind: NodeKind,
    dependencies: Vec<Dependency>,
    process: Option<ProcessFn>,
    returns: Option<ValueType>,
    on_missing: Option<Fallback>,
}

/// A named, pure computation with declared dependencies.
///
/// Nodes are immutable and carry no per-evaluation state, so they can be
/// shared freely between threads and contexts. Clone is cheap as the
/// definition is wrapped by `Arc`.
///
/// Equality and hashing go by [`NodeName`]: two nodes with the same name are
/// the same node as far as the resolver is concerned.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Declare a root input node.
    ///
    /// Root values are supplied through [`Roots`](crate::Roots) and never
    /// computed.
    pub fn root(name: impl Into<NodeName>) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                name: name.into(),
                kind: NodeKind::Root,
                dependencies: Vec::new(),
                process: None,
                returns: None,
                on_missing: None,
            }),
        }
    }

    /// Start building a derived node.
    pub fn builder(label: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(label)
    }

    /// Build a feature computed from a single dependency's value.
    ///
    /// An absent dependency value invokes the node's on-missing fallback
    /// (see [`Node::with_on_missing`]); without one it is a computation error.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let text = Node::root("revision.text");
    /// let chars = Node::unary("revision.chars", &text, |t: &String| t.chars().count() as i64);
    /// ```
    pub fn unary<A, R, F>(name: impl Into<NodeName>, dependency: &Node, f: F) -> Self
    where
        A: Any,
        R: Any + Send + Sync,
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        NodeBuilder::new(String::new())
            .name(name)
            .kind(NodeKind::Feature)
            .depends_on(dependency)
            .returns::<R>()
            .process(move |args| match args.get_opt::<A>(0)? {
                Some(a) => Ok(Value::new(f(a))),
                None => args.on_missing().unwrap_or_else(|| {
                    Err(ValueError::Absent {
                        expected: std::any::type_name::<A>(),
                    }
                    .into())
                }),
            })
            .build()
    }

    /// The node's identity.
    pub fn name(&self) -> &NodeName {
        &self.inner.name
    }

    /// The node's kind.
    pub fn kind(&self) -> NodeKind {
        self.inner.kind
    }

    /// Returns `true` for root input nodes.
    pub fn is_root(&self) -> bool {
        self.inner.kind == NodeKind::Root
    }

    /// Declared dependencies in calling order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.inner.dependencies
    }

    /// Declared result type, if any.
    pub fn returns(&self) -> Option<ValueType> {
        self.inner.returns
    }

    /// The configured on-missing fallback, if any.
    pub fn on_missing(&self) -> Option<&Fallback> {
        self.inner.on_missing.as_ref()
    }

    pub(crate) fn process(&self) -> Option<&ProcessFn> {
        self.inner.process.as_ref()
    }

    /// Return a copy of this node with an on-missing fallback configured.
    ///
    /// The copy is named `{name}.on_missing`, so it and the original can be
    /// evaluated within one context.
    #[must_use]
    pub fn with_on_missing<F>(&self, fallback: F) -> Self
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.with_on_missing_as(DEFAULT_FALLBACK_LABEL, fallback)
    }

    /// Like [`Node::with_on_missing`], naming the copy `{name}.{label}`.
    ///
    /// Use distinct labels for distinct fallbacks of the same node.
    #[must_use]
    pub fn with_on_missing_as<F>(&self, label: impl fmt::Display, fallback: F) -> Self
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(NodeInner {
                name: NodeName::from(format!("{}.{}", self.inner.name, label)),
                kind: self.inner.kind,
                dependencies: self.inner.dependencies.clone(),
                process: self.inner.process.clone(),
                returns: self.inner.returns,
                on_missing: Some(Arc::new(fallback)),
            }),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.inner.name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.name, f)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.inner.name == other.inner.name
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state);
    }
}

/// Builder for derived nodes.
///
/// Unless a name is given explicitly, the node is named structurally from its
/// label, its dependencies' names, its parameters and the label of its
/// on-missing fallback: `label(dep, dep, param, fallback)`.
///
/// # Example
///
/// ```ignore
/// let sum = Node::builder("sum")
///     .depends_on(&a)
///     .depends_on(&b)
///     .process(|args| Ok(Value::new(args.get::<i64>(0)? + args.get::<i64>(1)?)))
///     .build();
/// assert_eq!(sum.name().as_str(), "sum(a, b)");
/// ```
pub struct NodeBuilder {
    label: String,
    name: Option<NodeName>,
    kind: NodeKind,
    dependencies: Vec<Dependency>,
    params: Vec<String>,
    process: Option<ProcessFn>,
    returns: Option<ValueType>,
    on_missing: Option<(String, Fallback)>,
}

impl NodeBuilder {
    /// Create a builder for a datasource node with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            name: None,
            kind: NodeKind::Datasource,
            dependencies: Vec::new(),
            params: Vec::new(),
            process: None,
            returns: None,
            on_missing: None,
        }
    }

    /// Use an explicit name instead of the structural one.
    pub fn name(mut self, name: impl Into<NodeName>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the node kind.
    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Append a dependency.
    pub fn depends_on(mut self, dependency: impl Into<Dependency>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Append a dependency that will be looked up by name in the registry.
    pub fn depends_on_named(mut self, name: impl Into<NodeName>) -> Self {
        self.dependencies.push(Dependency::Named(name.into()));
        self
    }

    /// Append a configuration parameter to the structural name.
    pub fn param(mut self, param: impl fmt::Display) -> Self {
        self.params.push(param.to_string());
        self
    }

    /// Declare the result type, validated by the resolver.
    pub fn returns<T: Any>(mut self) -> Self {
        self.returns = Some(ValueType::of::<T>());
        self
    }

    /// Configure the on-missing fallback, labelled `on_missing`.
    pub fn on_missing<F>(self, fallback: F) -> Self
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.on_missing_as(DEFAULT_FALLBACK_LABEL, fallback)
    }

    /// Configure the on-missing fallback under a label.
    ///
    /// The label becomes the last parameter of the structural name, so nodes
    /// that differ only in their fallback get distinct identities.
    pub fn on_missing_as<F>(self, label: impl fmt::Display, fallback: F) -> Self
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.on_missing_shared(label, Arc::new(fallback))
    }

    /// Configure the on-missing fallback from an already shared function.
    pub fn on_missing_shared(mut self, label: impl fmt::Display, fallback: Fallback) -> Self {
        self.on_missing = Some((label.to_string(), fallback));
        self
    }

    /// Set the process function.
    pub fn process<F>(mut self, process: F) -> Self
    where
        F: Fn(&Args<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.process = Some(Arc::new(process));
        self
    }

    /// Finish the node.
    ///
    /// A node built without a process function is accepted here and rejected
    /// by the resolver with [`Error::MissingProcess`](crate::Error::MissingProcess).
    pub fn build(self) -> Node {
        let name = match self.name {
            Some(name) => name,
            None => format_name(
                &self.label,
                self.dependencies
                    .iter()
                    .map(|d| d.name().to_string())
                    .chain(self.params)
                    .chain(self.on_missing.as_ref().map(|(label, _)| label.clone())),
            ),
        };
        Node {
            inner: Arc::new(NodeInner {
                name,
                kind: self.kind,
                dependencies: self.dependencies,
                process: self.process,
                returns: self.returns,
                on_missing: self.on_missing.map(|(_, fallback)| fallback),
            }),
        }
    }
}

/// Resolved dependency values handed to a process function.
pub struct Args<'a> {
    node: &'a Node,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub(crate) fn new(node: &'a Node, values: &'a [Value]) -> Self {
        Self { node, values }
    }

    /// The node being computed.
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Number of resolved values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the node has no dependencies.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All resolved values in declaration order.
    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// The value at a dependency position.
    pub fn value(&self, index: usize) -> Result<&'a Value, ValueError> {
        self.values.get(index).ok_or(ValueError::OutOfRange {
            index,
            len: self.values.len(),
        })
    }

    /// The value at a dependency position, downcast to `T`.
    pub fn get<T: Any>(&self, index: usize) -> Result<&'a T, ValueError> {
        self.value(index)?.get::<T>()
    }

    /// Like [`Args::get`], but an absent value yields `Ok(None)`.
    pub fn get_opt<T: Any>(&self, index: usize) -> Result<Option<&'a T>, ValueError> {
        let value = self.value(index)?;
        if value.is_absent() {
            Ok(None)
        } else {
            value.get::<T>().map(Some)
        }
    }

    /// Returns `true` if any resolved value is absent.
    pub fn any_absent(&self) -> bool {
        self.values.iter().any(Value::is_absent)
    }

    /// Invoke the node's on-missing fallback, if configured.
    pub fn on_missing(&self) -> Option<anyhow::Result<Value>> {
        self.node.on_missing().map(|fallback| fallback())
    }
}
