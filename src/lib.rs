#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod context;
mod error;
mod name;
mod node;
mod registry;
mod resolver;
mod value;

pub mod aggregators;
pub mod frequencies;
pub mod modifiers;
pub mod revision;
pub mod tracer;

pub use context::{Context, Roots};
pub use error::{ArithmeticError, Error, ValueError};
pub use name::{format_infix, format_name, short_type_name, NodeName};
pub use node::{Args, Dependency, Fallback, Node, NodeBuilder, NodeKind, ProcessFn};
pub use registry::{NodeId, Registry};
pub use resolver::{Resolver, ResolverBuilder};
pub use tracer::{ExecutionResult, LogTracer, NoopTracer, Tracer};
pub use value::{Number, Value, ValueType};
