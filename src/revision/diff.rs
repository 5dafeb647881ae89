use crate::aggregators::{negative, positive, sum};
use crate::frequencies::{frequency_diff, prop_frequency_diff};
use crate::modifiers::mul;
use crate::node::Node;
use crate::registry::Registry;

use super::Revision;

/// Word-level changes between a parent revision and the current one.
#[derive(Debug, Clone)]
pub struct RevisionDiff {
    /// Features of the parent revision.
    pub parent: Revision,
    /// Features of the current revision.
    pub revision: Revision,
    /// Change in occurrences of each word.
    pub word_delta: Node,
    /// Change in occurrences of each word, relative to its parent count.
    pub word_prop_delta: Node,
    /// Total occurrences of words that were added.
    pub words_added: Node,
    /// Total occurrences of words that were removed, as a positive number.
    pub words_removed: Node,
    /// Sum of the proportional increases.
    pub prop_words_added: Node,
    /// Sum of the proportional decreases, as a positive number.
    pub prop_words_removed: Node,
}

impl RevisionDiff {
    /// Compare `revision` against `parent`.
    pub fn new(parent: Revision, revision: Revision) -> Self {
        let word_delta =
            frequency_diff::<String>(&parent.word_frequency, &revision.word_frequency);
        let word_prop_delta =
            prop_frequency_diff::<String>(&parent.word_frequency, &word_delta);

        let words_added = sum::<String, i64>(&positive::<String, i64>(&word_delta));
        let words_removed = mul(sum::<String, i64>(&negative::<String, i64>(&word_delta)), -1);
        let prop_words_added = sum::<String, f64>(&positive::<String, f64>(&word_prop_delta));
        let prop_words_removed = mul(
            sum::<String, f64>(&negative::<String, f64>(&word_prop_delta)),
            -1,
        );

        Self {
            parent,
            revision,
            word_delta,
            word_prop_delta,
            words_added,
            words_removed,
            prop_words_added,
            prop_words_removed,
        }
    }

    /// Diff features of the current revision against its parent.
    pub fn of(revision: Revision) -> Self {
        Self::new(revision.parent(), revision)
    }

    /// The scalar diff features in their canonical vector order.
    pub fn features(&self) -> Vec<Node> {
        vec![
            self.words_added.clone(),
            self.words_removed.clone(),
            self.prop_words_added.clone(),
            self.prop_words_removed.clone(),
        ]
    }

    /// Register the diff features and both revisions' features.
    pub fn register(&self, registry: &mut Registry) {
        self.parent.register(registry);
        self.revision.register(registry);
        registry.extend(&self.features());
    }
}
