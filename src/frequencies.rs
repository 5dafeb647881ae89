//! Frequency tables and their diffs.
//!
//! Three node families chain together to compare the "before" and "after"
//! states of a revision:
//!
//! 1. [`frequency`] tallies a sequence of items into a [`FrequencyTable`].
//! 2. [`frequency_diff`] subtracts an old table from a new one, keeping only
//!    the items whose count changed ([`FrequencyDiff`]).
//! 3. [`prop_frequency_diff`] scales each change by the item's old count,
//!    floored at 1 ([`PropFrequencyDiff`]).
//!
//! The plain functions [`tally`], [`diff`] and [`prop_diff`] implement the
//! arithmetic and can be used outside a graph.

use std::collections::HashMap;
use std::hash::Hash;

use crate::name::{short_type_name, NodeName};
use crate::node::{Args, Fallback, Node, NodeBuilder};
use crate::value::Value;

/// Item -> number of occurrences.
pub type FrequencyTable<T> = HashMap<T, u64>;

/// Item -> signed change in occurrences. Unchanged items are omitted.
pub type FrequencyDiff<T> = HashMap<T, i64>;

/// Item -> change in occurrences relative to the old count.
pub type PropFrequencyDiff<T> = HashMap<T, f64>;

/// Bounds for items counted in frequency tables.
pub trait Item: Hash + Eq + Clone + Send + Sync + 'static {}
impl<T: Hash + Eq + Clone + Send + Sync + 'static> Item for T {}

/// Count the occurrences of each item.
pub fn tally<T, I>(items: I) -> FrequencyTable<T>
where
    T: Hash + Eq,
    I: IntoIterator<Item = T>,
{
    let mut table = FrequencyTable::new();
    for item in items {
        *table.entry(item).or_insert(0) += 1;
    }
    table
}

/// Compute `new - old` for every item whose count changed.
///
/// Items only in `new` contribute their full count, items only in `old`
/// contribute minus their old count, and items with equal counts are left out.
pub fn diff<T: Hash + Eq + Clone>(
    old: &FrequencyTable<T>,
    new: &FrequencyTable<T>,
) -> FrequencyDiff<T> {
    let mut table = FrequencyDiff::new();
    for (item, &new_count) in new {
        let old_count = old.get(item).copied().unwrap_or(0);
        if new_count != old_count {
            table.insert(item.clone(), count(new_count) - count(old_count));
        }
    }
    for (item, &old_count) in old {
        if !new.contains_key(item) {
            table.insert(item.clone(), -count(old_count));
        }
    }
    table
}

/// Divide every change by `max(old count, 1)`.
pub fn prop_diff<T: Hash + Eq + Clone>(
    old: &FrequencyTable<T>,
    diff: &FrequencyDiff<T>,
) -> PropFrequencyDiff<T> {
    diff.iter()
        .map(|(item, &delta)| {
            let old_count = old.get(item).copied().unwrap_or(0).max(1);
            (item.clone(), delta as f64 / old_count as f64)
        })
        .collect()
}

fn count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Read a table argument, treating absence as an empty table.
fn table_or_empty<'a, V: Send + Sync + 'static, T: Item>(
    args: &Args<'a>,
    index: usize,
    empty: &'a HashMap<T, V>,
) -> anyhow::Result<&'a HashMap<T, V>> {
    Ok(args.get_opt::<HashMap<T, V>>(index)?.unwrap_or(empty))
}

/// Tally a `Vec<T>` produced by `items` into a [`FrequencyTable<T>`].
///
/// The item type is part of the name: `frequency(revision.words, String)`.
/// An empty sequence yields an empty table. An absent sequence yields an
/// absent table, so a diff downstream applies its own absence policy.
pub fn frequency<T: Item>(items: &Node) -> Node {
    Node::builder("frequency")
        .depends_on(items)
        .param(short_type_name::<T>())
        .returns::<FrequencyTable<T>>()
        .process(|args| {
            let table = args.get_opt::<Vec<T>>(0)?;
            Ok(Value::from_option(table.map(|items| tally(items.iter().cloned()))))
        })
        .build()
}

/// Diff two [`FrequencyTable<T>`] nodes.
///
/// An absent old table is treated as empty. An absent new table yields an
/// empty diff; use [`frequency_diff_with`] to supply a fallback instead.
pub fn frequency_diff<T: Item>(old: &Node, new: &Node) -> Node {
    FrequencyDiffBuilder::new(old, new).build::<T>()
}

/// Like [`frequency_diff`], invoking `on_missing` when the new table is
/// absent. The node is named `frequency_diff(old, new, on_missing)`.
pub fn frequency_diff_with<T, F>(old: &Node, new: &Node, on_missing: F) -> Node
where
    T: Item,
    F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
{
    FrequencyDiffBuilder::new(old, new)
        .on_missing(on_missing)
        .build::<T>()
}

/// Builder for frequency diff nodes.
///
/// Exposes the node's absence policy and name as construction parameters.
/// The fallback's label is part of the structural name, so a diff with a
/// fallback never shares a cache entry with one without.
pub struct FrequencyDiffBuilder {
    old: Node,
    new: Node,
    name: Option<NodeName>,
    on_missing: Option<(String, Fallback)>,
}

impl FrequencyDiffBuilder {
    /// Diff `new` against `old`.
    pub fn new(old: &Node, new: &Node) -> Self {
        Self {
            old: old.clone(),
            new: new.clone(),
            name: None,
            on_missing: None,
        }
    }

    /// Use an explicit name.
    pub fn name(mut self, name: impl Into<NodeName>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Invoke `fallback` instead of returning an empty diff when the new
    /// table is absent.
    pub fn on_missing<F>(self, fallback: F) -> Self
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.on_missing_as("on_missing", fallback)
    }

    /// Like [`FrequencyDiffBuilder::on_missing`], with a label naming the
    /// fallback.
    pub fn on_missing_as<F>(mut self, label: impl Into<String>, fallback: F) -> Self
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.on_missing = Some((label.into(), std::sync::Arc::new(fallback)));
        self
    }

    /// Finish the node for items of type `T`.
    pub fn build<T: Item>(self) -> Node {
        let mut builder = NodeBuilder::new("frequency_diff")
            .depends_on(self.old)
            .depends_on(self.new)
            .returns::<FrequencyDiff<T>>();
        if let Some(name) = self.name {
            builder = builder.name(name);
        }
        if let Some((label, fallback)) = self.on_missing {
            builder = builder.on_missing_shared(label, fallback);
        }
        builder
            .process(|args| {
                let empty = FrequencyTable::<T>::new();
                let old = table_or_empty(args, 0, &empty)?;
                match args.get_opt::<FrequencyTable<T>>(1)? {
                    Some(new) => Ok(Value::new(diff(old, new))),
                    None => args
                        .on_missing()
                        .unwrap_or_else(|| Ok(Value::new(FrequencyDiff::<T>::new()))),
                }
            })
            .build()
    }
}

/// Scale a [`FrequencyDiff<T>`] node by the counts of an old
/// [`FrequencyTable<T>`] node.
///
/// An absent old table is treated as empty, so every change is divided by
/// the floor of 1. An absent diff yields an empty result.
pub fn prop_frequency_diff<T: Item>(old: &Node, diff: &Node) -> Node {
    Node::builder("prop_frequency_diff")
        .depends_on(old)
        .depends_on(diff)
        .returns::<PropFrequencyDiff<T>>()
        .process(|args| {
            let empty_table = FrequencyTable::<T>::new();
            let empty_diff = FrequencyDiff::<T>::new();
            let old = table_or_empty(args, 0, &empty_table)?;
            let diff = table_or_empty(args, 1, &empty_diff)?;
            Ok(Value::new(prop_diff(old, diff)))
        })
        .build()
}
