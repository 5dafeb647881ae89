//! Tracer trait for observing graph resolution.
//!
//! This module defines the [`Tracer`] trait and related types for observing
//! node evaluation. The default [`NoopTracer`] costs nothing when tracing is
//! not needed; [`LogTracer`] forwards every event to the `tracing` crate.
//!
//! # Example
//!
//! ```ignore
//! use feature_flow::{NodeName, Resolver, Tracer};
//!
//! struct PrintTracer;
//!
//! impl Tracer for PrintTracer {
//!     fn on_node_start(&self, node: &NodeName) {
//!         println!("computing {node}");
//!     }
//! }
//!
//! let resolver = Resolver::builder().tracer(PrintTracer).build(registry);
//! ```

use crate::name::NodeName;

/// Outcome of a node computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The process function produced a value.
    Computed,
    /// The process function failed, or produced a value of the wrong type.
    Failed {
        /// Rendered error message.
        message: String,
    },
}

/// Tracer trait for observing resolution.
///
/// All methods have default empty implementations, so you only need to override
/// the events you're interested in.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` as one resolver may serve several
/// contexts on different threads.
pub trait Tracer: Send + Sync + 'static {
    /// Called before a node's process function runs.
    #[inline]
    fn on_node_start(&self, _node: &NodeName) {}

    /// Called when a node is served from the context without computing.
    #[inline]
    fn on_cache_hit(&self, _node: &NodeName) {}

    /// Called after a node's process function returned.
    #[inline]
    fn on_node_end(&self, _node: &NodeName, _result: &ExecutionResult) {}

    /// Called when a root input was not supplied.
    #[inline]
    fn on_root_missing(&self, _node: &NodeName) {}

    /// Called when a dependency cycle is detected.
    #[inline]
    fn on_cycle_detected(&self, _path: &[String]) {}
}

/// Zero-cost tracer that discards all events.
///
/// This is the default tracer for [`Resolver`](crate::Resolver).
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Tracer that logs events through the `tracing` crate.
///
/// Cache hits and node boundaries are logged at `TRACE`, failures at `DEBUG`
/// and configuration problems at `WARN`.
pub struct LogTracer;

impl Tracer for LogTracer {
    fn on_node_start(&self, node: &NodeName) {
        tracing::trace!(node = %node, "computing node");
    }

    fn on_cache_hit(&self, node: &NodeName) {
        tracing::trace!(node = %node, "cache hit");
    }

    fn on_node_end(&self, node: &NodeName, result: &ExecutionResult) {
        match result {
            ExecutionResult::Computed => tracing::trace!(node = %node, "computed node"),
            ExecutionResult::Failed { message } => {
                tracing::debug!(node = %node, error = %message, "node failed")
            }
        }
    }

    fn on_root_missing(&self, node: &NodeName) {
        tracing::warn!(node = %node, "root input not supplied");
    }

    fn on_cycle_detected(&self, path: &[String]) {
        tracing::warn!(path = %path.join(" -> "), "dependency cycle detected");
    }
}
