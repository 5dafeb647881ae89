//! Type-erased values flowing through the graph.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::ValueError;

/// A computed or supplied value.
///
/// Values are type-erased and shared behind an `Arc`, so cloning a value never
/// copies the payload and every consumer of a cached node observes the very
/// same allocation. A value may also be *absent*, which models legitimately
/// missing data (e.g. a revision without a parent) rather than an error.
#[derive(Clone)]
pub struct Value {
    inner: Option<Arc<dyn Any + Send + Sync>>,
    type_name: &'static str,
}

impl Value {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Some(Arc::new(value)),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The absent value.
    pub fn absent() -> Self {
        Self {
            inner: None,
            type_name: "absent",
        }
    }

    /// Wrap an optional value, mapping `None` to [`Value::absent`].
    pub fn from_option<T: Any + Send + Sync>(value: Option<T>) -> Self {
        value.map_or_else(Self::absent, Self::new)
    }

    /// Returns `true` if this value is absent.
    pub fn is_absent(&self) -> bool {
        self.inner.is_none()
    }

    /// Type name of the held value, or `"absent"`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `TypeId` of the held value, `None` when absent.
    pub fn type_id(&self) -> Option<TypeId> {
        self.inner.as_deref().map(Any::type_id)
    }

    /// Returns `true` if the value holds a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id() == Some(TypeId::of::<T>())
    }

    /// Downcast to a concrete type.
    ///
    /// Returns `None` if the value is absent or holds another type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.as_deref()?.downcast_ref::<T>()
    }

    /// Downcast to a concrete type, explaining the failure.
    pub fn get<T: Any>(&self) -> Result<&T, ValueError> {
        let expected = std::any::type_name::<T>();
        match self.inner.as_deref() {
            None => Err(ValueError::Absent { expected }),
            Some(inner) => inner.downcast_ref::<T>().ok_or(ValueError::TypeMismatch {
                expected,
                actual: self.type_name,
            }),
        }
    }

    /// Returns `true` if both values share the same allocation.
    ///
    /// Two absent values are considered identical.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Read the value as a [`Number`].
    ///
    /// Accepts the primitive integer and float types, and `bool` as 0 or 1.
    pub fn number(&self) -> Result<Number, ValueError> {
        let Some(inner) = self.inner.as_deref() else {
            return Err(ValueError::Absent { expected: "number" });
        };
        if let Some(v) = inner.downcast_ref::<i64>() {
            Ok(Number::Int(*v))
        } else if let Some(v) = inner.downcast_ref::<f64>() {
            Ok(Number::Float(*v))
        } else if let Some(v) = inner.downcast_ref::<i32>() {
            Ok(Number::Int(i64::from(*v)))
        } else if let Some(v) = inner.downcast_ref::<u32>() {
            Ok(Number::Int(i64::from(*v)))
        } else if let Some(v) = inner.downcast_ref::<u64>() {
            Ok(i64::try_from(*v).map_or(Number::Float(*v as f64), Number::Int))
        } else if let Some(v) = inner.downcast_ref::<usize>() {
            Ok(i64::try_from(*v).map_or(Number::Float(*v as f64), Number::Int))
        } else if let Some(v) = inner.downcast_ref::<f32>() {
            Ok(Number::Float(f64::from(*v)))
        } else if let Some(v) = inner.downcast_ref::<bool>() {
            Ok(Number::Int(i64::from(*v)))
        } else {
            Err(ValueError::NotNumeric {
                actual: self.type_name,
            })
        }
    }

    /// Read the value as an `f64`.
    pub fn as_f64(&self) -> Result<f64, ValueError> {
        self.number().map(Number::as_f64)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_absent() {
            return f.write_str("Absent");
        }
        match self.number() {
            Ok(Number::Int(v)) => write!(f, "{}({})", self.type_name, v),
            Ok(Number::Float(v)) => write!(f, "{}({:?})", self.type_name, v),
            Err(_) => write!(f, "Value({})", self.type_name),
        }
    }
}

/// A numeric value, as read by arithmetic modifiers.
///
/// Integers stay integers through operations that preserve them, so counts
/// remain exact; anything involving a float becomes a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
}

impl Number {
    /// Convert to `f64`.
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    /// Wrap into a [`Value`] holding either an `i64` or an `f64`.
    pub fn into_value(self) -> Value {
        match self {
            Number::Int(v) => Value::new(v),
            Number::Float(v) => Value::new(v),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{}", v),
            // Debug keeps the decimal point, so 1 and 1.0 format differently.
            Number::Float(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Int(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Number::Int(i64::from(v))
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

/// Declared result type of a node, used for validation.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
}

impl ValueType {
    /// The value type of `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Name of the type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if `value` holds this type.
    ///
    /// Absent values match every type; absence is handled by node policies,
    /// not by type validation.
    pub fn matches(&self, value: &Value) -> bool {
        value.type_id().map_or(true, |id| id == self.id)
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
