//! Structural node identity.

use std::borrow::Borrow;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

static MODULE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z_][a-z0-9_]*::").unwrap());

/// Identity of a node in the dependency graph.
///
/// Names are derived from a node's label and the names of whatever it is built
/// from, so two nodes constructed the same way end up with the same name. The
/// resolver memoizes by name, which is what lets independently constructed
/// copies of a sub-expression share one cached value.
///
/// Clone is cheap as the string is wrapped by `Arc`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeName(Arc<str>);

impl NodeName {
    /// Create a name from a string.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NodeName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&String> for NodeName {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl From<&NodeName> for NodeName {
    fn from(name: &NodeName) -> Self {
        name.clone()
    }
}

/// Format a structural name as `label(param, param, ...)`.
///
/// Parameters are usually the names of dependencies followed by any
/// configuration constants, in declaration order.
pub fn format_name<I>(label: &str, params: I) -> NodeName
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    let params: Vec<String> = params.into_iter().map(|p| p.to_string()).collect();
    NodeName::from(format!("{}({})", label, params.join(", ")))
}

/// Format a structural name for an infix binary operator as `(lhs op rhs)`.
pub fn format_infix(lhs: impl fmt::Display, op: &str, rhs: impl fmt::Display) -> NodeName {
    NodeName::from(format!("({} {} {})", lhs, op, rhs))
}

/// Type name of `T` without module paths, for use as a name parameter.
///
/// `alloc::string::String` becomes `String` and
/// `std::collections::HashMap<alloc::string::String, u64>` becomes
/// `HashMap<String, u64>`.
pub fn short_type_name<T: ?Sized>() -> String {
    MODULE_PATH_RE
        .replace_all(std::any::type_name::<T>(), "")
        .into_owned()
}
