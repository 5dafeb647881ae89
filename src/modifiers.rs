//! Arithmetic modifiers: nodes built by combining other nodes and constants.
//!
//! Every modifier returns an ordinary [`Node`], so modifiers nest:
//!
//! ```ignore
//! use feature_flow::modifiers::{divide, max};
//!
//! // (revision.markup_chars / max(revision.chars, 1))
//! let proportion = divide(&markup_chars, max(&chars, 1));
//! // or, with operator overloads
//! let proportion = &markup_chars / max(&chars, 1);
//! ```
//!
//! Integer operands stay integers through `add`, `sub`, `mul`, `max` and
//! `min` (with overflow checks); `divide` and `log` always produce `f64`.
//! When an operand is absent, the node's on-missing fallback is used if one is
//! configured, otherwise the result is absent as well.

use std::fmt;
use std::ops;

use crate::error::ArithmeticError;
use crate::name::{format_infix, format_name, NodeName};
use crate::node::{Args, Node, NodeKind};
use crate::value::{Number, Value};

/// An input to a modifier: a node or a constant.
#[derive(Clone, Debug)]
pub enum Operand {
    /// A node resolved at evaluation time.
    Node(Node),
    /// A constant.
    Const(Number),
}

impl Operand {
    fn label(&self) -> String {
        match self {
            Operand::Node(node) => node.name().to_string(),
            Operand::Const(number) => number.to_string(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<Node> for Operand {
    fn from(node: Node) -> Self {
        Operand::Node(node)
    }
}

impl From<&Node> for Operand {
    fn from(node: &Node) -> Self {
        Operand::Node(node.clone())
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Const(Number::Int(v))
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Const(Number::from(v))
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Const(Number::Float(v))
    }
}

/// Where a modifier finds each operand at evaluation time.
#[derive(Clone, Copy)]
enum Slot {
    Dependency(usize),
    Const(Number),
}

/// Read every operand, or `None` if any dependency is absent.
fn read(args: &Args<'_>, slots: &[Slot]) -> anyhow::Result<Option<Vec<Number>>> {
    let mut numbers = Vec::with_capacity(slots.len());
    for slot in slots {
        let number = match *slot {
            Slot::Const(number) => number,
            Slot::Dependency(index) => {
                let value = args.value(index)?;
                if value.is_absent() {
                    return Ok(None);
                }
                value.number()?
            }
        };
        numbers.push(number);
    }
    Ok(Some(numbers))
}

fn build<F>(name: NodeName, operands: Vec<Operand>, float_result: bool, op: F) -> Node
where
    F: Fn(&[Number]) -> Result<Number, ArithmeticError> + Send + Sync + 'static,
{
    let mut builder = Node::builder(String::new())
        .name(name)
        .kind(NodeKind::Feature);
    let mut slots = Vec::with_capacity(operands.len());
    let mut dependencies = 0;
    for operand in operands {
        match operand {
            Operand::Node(node) => {
                builder = builder.depends_on(node);
                slots.push(Slot::Dependency(dependencies));
                dependencies += 1;
            }
            Operand::Const(number) => slots.push(Slot::Const(number)),
        }
    }
    if float_result {
        builder = builder.returns::<f64>();
    }
    builder
        .process(move |args| match read(args, &slots)? {
            Some(numbers) => Ok(op(&numbers)?.into_value()),
            None => args.on_missing().unwrap_or(Ok(Value::absent())),
        })
        .build()
}

fn binary<F>(name: NodeName, a: Operand, b: Operand, float_result: bool, op: F) -> Node
where
    F: Fn(Number, Number) -> Result<Number, ArithmeticError> + Send + Sync + 'static,
{
    build(name, vec![a, b], float_result, move |n| op(n[0], n[1]))
}

fn checked(
    a: Number,
    b: Number,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Result<Number, ArithmeticError> {
    match (a, b) {
        (Number::Int(a), Number::Int(b)) => int(a, b)
            .map(Number::Int)
            .ok_or(ArithmeticError::Overflow),
        _ => Ok(Number::Float(float(a.as_f64(), b.as_f64()))),
    }
}

/// `(a + b)`
pub fn add(a: impl Into<Operand>, b: impl Into<Operand>) -> Node {
    let (a, b) = (a.into(), b.into());
    binary(format_infix(&a, "+", &b), a, b, false, |a, b| {
        checked(a, b, i64::checked_add, |a, b| a + b)
    })
}

/// `(a - b)`
pub fn sub(a: impl Into<Operand>, b: impl Into<Operand>) -> Node {
    let (a, b) = (a.into(), b.into());
    binary(format_infix(&a, "-", &b), a, b, false, |a, b| {
        checked(a, b, i64::checked_sub, |a, b| a - b)
    })
}

/// `(a * b)`
pub fn mul(a: impl Into<Operand>, b: impl Into<Operand>) -> Node {
    let (a, b) = (a.into(), b.into());
    binary(format_infix(&a, "*", &b), a, b, false, |a, b| {
        checked(a, b, i64::checked_mul, |a, b| a * b)
    })
}

/// `(a / b)`, always a float.
///
/// A zero denominator fails with [`ArithmeticError::DivisionByZero`]; guard
/// denominators with [`max`] to get ratio features.
pub fn divide(a: impl Into<Operand>, b: impl Into<Operand>) -> Node {
    let (a, b) = (a.into(), b.into());
    binary(format_infix(&a, "/", &b), a, b, true, |a, b| {
        let denominator = b.as_f64();
        if denominator == 0.0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(Number::Float(a.as_f64() / denominator))
    })
}

/// `max(a, b)`
///
/// With a constant second operand this is the floor pattern used to keep
/// ratio denominators non-zero: `max(&total, 1)`.
pub fn max(a: impl Into<Operand>, b: impl Into<Operand>) -> Node {
    let (a, b) = (a.into(), b.into());
    binary(format_name("max", [&a, &b]), a, b, false, |a, b| {
        checked(a, b, |a, b| Some(a.max(b)), f64::max)
    })
}

/// `max(a, floor)` for a constant floor.
pub fn max_with_floor(a: impl Into<Operand>, floor: impl Into<Number>) -> Node {
    max(a, Operand::Const(floor.into()))
}

/// `min(a, b)`
pub fn min(a: impl Into<Operand>, b: impl Into<Operand>) -> Node {
    let (a, b) = (a.into(), b.into());
    binary(format_name("min", [&a, &b]), a, b, false, |a, b| {
        checked(a, b, |a, b| Some(a.min(b)), f64::min)
    })
}

/// `log(a)`, the natural logarithm. Non-positive input is an error.
pub fn log(a: impl Into<Operand>) -> Node {
    let a = a.into();
    build(format_name("log", [&a]), vec![a], true, |n| {
        let x = n[0].as_f64();
        if x <= 0.0 {
            return Err(ArithmeticError::LogDomain(x));
        }
        Ok(Number::Float(x.ln()))
    })
}

macro_rules! impl_operator {
    ($trait:ident, $method:ident, $modifier:ident) => {
        impl<R: Into<Operand>> ops::$trait<R> for Node {
            type Output = Node;

            fn $method(self, rhs: R) -> Node {
                $modifier(self, rhs)
            }
        }

        impl<R: Into<Operand>> ops::$trait<R> for &Node {
            type Output = Node;

            fn $method(self, rhs: R) -> Node {
                $modifier(self, rhs)
            }
        }
    };
}

impl_operator!(Add, add, add);
impl_operator!(Sub, sub, sub);
impl_operator!(Mul, mul, mul);
impl_operator!(Div, div, divide);
