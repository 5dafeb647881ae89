//! Dependency resolution and evaluation.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::{Context, Roots};
use crate::error::Error;
use crate::node::{Args, Node};
use crate::registry::Registry;
use crate::tracer::{ExecutionResult, NoopTracer, Tracer};
use crate::value::Value;

/// The resolver drives evaluation of requested nodes against a [`Context`].
///
/// Resolution is depth-first: to evaluate a node, each declared dependency is
/// resolved first (served from the context if already known), the values are
/// collected in declaration order and handed to the node's process function.
/// The result is stored in the context, so shared sub-nodes compute once per
/// context no matter how many paths lead to them.
///
/// This is cheap to clone - all data is behind `Arc`, and one resolver can
/// serve many contexts concurrently.
///
/// # Example
///
/// ```ignore
/// let revision = Revision::new();
/// let resolver = Resolver::new(Registry::new());
///
/// let mut roots = Roots::new();
/// RevisionInput { text: "Hello [[World]]".into(), ..Default::default() }
///     .insert_into(&revision.datasources, &mut roots);
///
/// let vector = resolver.extract(&revision.features(), &roots)?;
/// ```
pub struct Resolver {
    registry: Arc<Registry>,
    tracer: Arc<RwLock<Arc<dyn Tracer>>>,
    validate_returns: bool,
}

impl Clone for Resolver {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            tracer: self.tracer.clone(),
            validate_returns: self.validate_returns,
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Registry::new())
    }
}

impl Resolver {
    /// Create a resolver over a registry with default settings.
    pub fn new(registry: Registry) -> Self {
        Self::builder().build(registry)
    }

    /// Create a builder for customizing the resolver.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let resolver = Resolver::builder()
    ///     .tracer(LogTracer)
    ///     .validate_returns(false)
    ///     .build(registry);
    /// ```
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// The registry used for named dependencies.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Replace the tracer.
    pub fn set_tracer(&self, tracer: Arc<dyn Tracer>) {
        *self.tracer.write() = tracer;
    }

    /// Get the current tracer.
    pub fn tracer(&self) -> Arc<dyn Tracer> {
        self.tracer.read().clone()
    }

    /// Resolve a single node within a context.
    ///
    /// # Errors
    ///
    /// - `Error::Cycle` - the node depends on itself
    /// - `Error::MissingProcess` / `Error::UnknownNode` / `Error::MissingRootInput` -
    ///   the graph is misconfigured
    /// - `Error::ReturnType` - a node produced a value of the wrong type
    /// - `Error::Computation` - a process function failed
    pub fn solve(&self, node: &Node, ctx: &mut Context) -> Result<Value, Error> {
        let tracer = self.tracer();
        self.resolve(node, ctx, tracer.as_ref())
    }

    /// Resolve several nodes within one context.
    ///
    /// Values are returned in request order, whatever order they were
    /// computed in.
    pub fn solve_many(&self, nodes: &[Node], ctx: &mut Context) -> Result<Vec<Value>, Error> {
        let tracer = self.tracer();
        nodes
            .iter()
            .map(|node| self.resolve(node, ctx, tracer.as_ref()))
            .collect()
    }

    /// Evaluate nodes against root inputs in a fresh context.
    ///
    /// The context is discarded afterwards.
    pub fn evaluate(&self, nodes: &[Node], roots: &Roots) -> Result<Vec<Value>, Error> {
        let mut ctx = Context::with_roots(roots.clone());
        let values = self.solve_many(nodes, &mut ctx)?;
        tracing::debug!(
            requested = nodes.len(),
            computed = ctx.computed(),
            "evaluated request"
        );
        Ok(values)
    }

    /// Evaluate nodes and convert the outputs into a feature vector.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`Resolver::solve`], fails with
    /// `Error::NonNumericOutput` if an output is absent or not a number.
    pub fn extract(&self, nodes: &[Node], roots: &Roots) -> Result<Vec<f64>, Error> {
        let values = self.evaluate(nodes, roots)?;
        nodes
            .iter()
            .zip(values)
            .map(|(node, value)| {
                value.as_f64().map_err(|error| Error::NonNumericOutput {
                    node: node.name().clone(),
                    error,
                })
            })
            .collect()
    }

    /// Compute a dependency order for the given nodes.
    ///
    /// See [`Registry::dependency_order`].
    pub fn dependency_order(&self, nodes: &[Node]) -> Result<Vec<Node>, Error> {
        self.registry.dependency_order(nodes)
    }

    fn resolve(&self, node: &Node, ctx: &mut Context, tracer: &dyn Tracer) -> Result<Value, Error> {
        if let Some(value) = ctx.lookup(node.name()) {
            tracer.on_cache_hit(node.name());
            return Ok(value);
        }

        if node.is_root() {
            tracer.on_root_missing(node.name());
            return Err(Error::MissingRootInput {
                node: node.name().clone(),
            });
        }

        if let Err(path) = ctx.enter(node.name()) {
            tracer.on_cycle_detected(&path);
            return Err(Error::Cycle { path });
        }

        let result = self.compute(node, ctx, tracer);

        ctx.exit();

        let value = result?;
        ctx.store(node.name().clone(), value.clone());
        Ok(value)
    }

    fn compute(&self, node: &Node, ctx: &mut Context, tracer: &dyn Tracer) -> Result<Value, Error> {
        let process = node.process().ok_or_else(|| Error::MissingProcess {
            node: node.name().clone(),
        })?;

        let mut values = Vec::with_capacity(node.dependencies().len());
        for dependency in node.dependencies() {
            let dependency = self.registry.dependency(dependency)?;
            values.push(self.resolve(&dependency, ctx, tracer)?);
        }

        tracer.on_node_start(node.name());

        let outcome = process(&Args::new(node, &values))
            .map_err(|error| Error::Computation {
                node: node.name().clone(),
                error: Arc::new(error),
            })
            .and_then(|value| self.check_returns(node, value));

        let result = match &outcome {
            Ok(_) => ExecutionResult::Computed,
            Err(e) => ExecutionResult::Failed {
                message: e.to_string(),
            },
        };
        tracer.on_node_end(node.name(), &result);

        outcome
    }

    fn check_returns(&self, node: &Node, value: Value) -> Result<Value, Error> {
        match node.returns() {
            Some(expected) if self.validate_returns && !expected.matches(&value) => {
                Err(Error::ReturnType {
                    node: node.name().clone(),
                    expected: expected.name(),
                    actual: value.type_name(),
                })
            }
            _ => Ok(value),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Resolver`] with customizable settings.
pub struct ResolverBuilder {
    tracer: Arc<dyn Tracer>,
    validate_returns: bool,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            tracer: Arc::new(NoopTracer),
            validate_returns: true,
        }
    }

    /// Set the tracer receiving resolution events.
    pub fn tracer<T: Tracer>(mut self, tracer: T) -> Self {
        self.tracer = Arc::new(tracer);
        self
    }

    /// Set an already shared tracer.
    pub fn shared_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Enable or disable validation of declared result types.
    ///
    /// Enabled by default. When disabled, a node's declared type is treated
    /// as documentation only.
    pub fn validate_returns(mut self, validate: bool) -> Self {
        self.validate_returns = validate;
        self
    }

    /// Build the resolver over the given registry.
    pub fn build(self, registry: Registry) -> Resolver {
        Resolver {
            registry: Arc::new(registry),
            tracer: Arc::new(RwLock::new(self.tracer)),
            validate_returns: self.validate_returns,
        }
    }
}
