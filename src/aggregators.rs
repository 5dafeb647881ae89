//! Reductions of tables into scalar features.

use std::collections::HashMap;

use crate::error::ArithmeticError;
use crate::frequencies::Item;
use crate::node::{Node, NodeKind};
use crate::value::{Number, Value};

/// Values that can be summed and filtered by sign.
pub trait Tally: Copy + PartialOrd + Default + Send + Sync + 'static {
    /// Add two values, `None` on overflow.
    fn checked_add(self, other: Self) -> Option<Self>;

    /// Convert into a [`Number`].
    fn to_number(self) -> Number;
}

impl Tally for u64 {
    fn checked_add(self, other: Self) -> Option<Self> {
        u64::checked_add(self, other)
    }

    fn to_number(self) -> Number {
        i64::try_from(self).map_or(Number::Float(self as f64), Number::Int)
    }
}

impl Tally for i64 {
    fn checked_add(self, other: Self) -> Option<Self> {
        i64::checked_add(self, other)
    }

    fn to_number(self) -> Number {
        Number::Int(self)
    }
}

impl Tally for f64 {
    fn checked_add(self, other: Self) -> Option<Self> {
        Some(self + other)
    }

    fn to_number(self) -> Number {
        Number::Float(self)
    }
}

fn filtered<K: Item, V: Tally>(label: &str, table: &Node, keep: fn(V) -> bool) -> Node {
    Node::builder(label)
        .depends_on(table)
        .returns::<HashMap<K, V>>()
        .process(move |args| {
            let filtered: HashMap<K, V> = match args.get_opt::<HashMap<K, V>>(0)? {
                Some(table) => table
                    .iter()
                    .filter(|&(_, &v)| keep(v))
                    .map(|(k, &v)| (k.clone(), v))
                    .collect(),
                None => HashMap::new(),
            };
            Ok(Value::new(filtered))
        })
        .build()
}

/// Sum of the values of a `HashMap<K, V>` node. An absent table sums to zero.
///
/// Integer overflow fails with [`ArithmeticError::Overflow`].
pub fn sum<K: Item, V: Tally>(table: &Node) -> Node {
    Node::builder("sum")
        .kind(NodeKind::Feature)
        .depends_on(table)
        .process(|args| {
            let total = match args.get_opt::<HashMap<K, V>>(0)? {
                Some(table) => table
                    .values()
                    .try_fold(V::default(), |acc, &v| acc.checked_add(v))
                    .ok_or(ArithmeticError::Overflow)?,
                None => V::default(),
            };
            Ok(total.to_number().into_value())
        })
        .build()
}

/// Number of entries of a `HashMap<K, V>` node.
pub fn len<K: Item, V: Tally>(table: &Node) -> Node {
    Node::builder("len")
        .kind(NodeKind::Feature)
        .depends_on(table)
        .returns::<i64>()
        .process(|args| {
            let len = args.get_opt::<HashMap<K, V>>(0)?.map_or(0, HashMap::len);
            Ok(Value::new(i64::try_from(len)?))
        })
        .build()
}

/// Entries of a `HashMap<K, V>` node with a value greater than zero.
pub fn positive<K: Item, V: Tally>(table: &Node) -> Node {
    filtered::<K, V>("positive", table, |v| v > V::default())
}

/// Entries of a `HashMap<K, V>` node with a value less than zero.
pub fn negative<K: Item, V: Tally>(table: &Node) -> Node {
    filtered::<K, V>("negative", table, |v| v < V::default())
}
