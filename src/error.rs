//! Error types for graph resolution and value access.

use std::sync::Arc;

use thiserror::Error;

use crate::name::NodeName;

/// Errors raised while resolving a request.
///
/// Configuration errors describe a broken graph and are fatal for the
/// request. Computation errors carry the failure of a node's process function,
/// tagged with the node that failed. The resolver never retries or suppresses
/// either kind.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Dependency cycle detected.
    ///
    /// The `path` lists the nodes on the active resolution stack, ending with
    /// the node that was entered a second time.
    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    Cycle {
        /// Names of the nodes forming the cycle.
        path: Vec<String>,
    },

    /// A non-root node was declared without a process function.
    #[error("node {node} has no process function")]
    MissingProcess {
        /// The node lacking a process function.
        node: NodeName,
    },

    /// A dependency referenced by name is not in the registry.
    #[error("unknown node {name}")]
    UnknownNode {
        /// The name that could not be found.
        name: NodeName,
    },

    /// A root input was requested but not supplied to the context.
    #[error("missing root input {node}")]
    MissingRootInput {
        /// The root input node.
        node: NodeName,
    },

    /// A node produced a value of a different type than it declared.
    #[error("node {node} returned {actual}, expected {expected}")]
    ReturnType {
        /// The offending node.
        node: NodeName,
        /// Declared result type.
        expected: &'static str,
        /// Type of the value actually produced.
        actual: &'static str,
    },

    /// A node's process function failed.
    ///
    /// The original error is kept behind an `Arc` so that the error stays
    /// cheap to clone; use [`Error::downcast_ref`] to recover it.
    #[error("failed to compute {node}: {error}")]
    Computation {
        /// The node whose process function failed.
        node: NodeName,
        /// The error returned by the process function.
        error: Arc<anyhow::Error>,
    },

    /// A requested output could not be converted into a model input.
    #[error("output {node} is not numeric: {error}")]
    NonNumericOutput {
        /// The requested node.
        node: NodeName,
        /// Why the value could not be converted.
        error: ValueError,
    },
}

impl Error {
    /// Returns `true` if this error describes a misconfigured graph rather
    /// than a failed computation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Cycle { .. }
                | Error::MissingProcess { .. }
                | Error::UnknownNode { .. }
                | Error::MissingRootInput { .. }
                | Error::ReturnType { .. }
        )
    }

    /// The node this error is tagged with, if any.
    pub fn node(&self) -> Option<&NodeName> {
        match self {
            Error::Cycle { .. } => None,
            Error::MissingProcess { node }
            | Error::MissingRootInput { node }
            | Error::ReturnType { node, .. }
            | Error::Computation { node, .. }
            | Error::NonNumericOutput { node, .. } => Some(node),
            Error::UnknownNode { name } => Some(name),
        }
    }

    /// Attempts to downcast the error raised by a process function.
    ///
    /// Returns `Some(&E)` if this is a `Computation` error whose source is of
    /// type `E`, otherwise returns `None`.
    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        match self {
            Error::Computation { error, .. } => error.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns `true` if this is a `Computation` error caused by an `E`.
    pub fn is<E: std::error::Error + Send + Sync + 'static>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }
}

/// Errors raised when reading a [`Value`](crate::Value) as a concrete type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value is absent.
    #[error("expected {expected}, found absent value")]
    Absent {
        /// The requested type.
        expected: &'static str,
    },

    /// The value holds a different type.
    #[error("expected {expected}, found {actual}")]
    TypeMismatch {
        /// The requested type.
        expected: &'static str,
        /// The type actually held.
        actual: &'static str,
    },

    /// The value does not hold a number.
    #[error("value of type {actual} is not numeric")]
    NotNumeric {
        /// The type actually held.
        actual: &'static str,
    },

    /// A dependency position past the end of the argument list.
    #[error("dependency index {index} out of range for {len} values")]
    OutOfRange {
        /// The requested position.
        index: usize,
        /// Number of resolved dependency values.
        len: usize,
    },
}

/// Errors raised by arithmetic modifiers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArithmeticError {
    /// Division with a zero denominator.
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed.
    #[error("integer overflow")]
    Overflow,

    /// Logarithm of a value outside its domain.
    #[error("logarithm of non-positive value {0}")]
    LogDomain(f64),
}
