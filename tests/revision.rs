//! Tests for revision features over parsed wikitext.

use approx::assert_relative_eq;
use feature_flow::revision::{Heading, Link, Revision, RevisionDiff, RevisionInput, Tag, Template};
use feature_flow::{Context, Error, Node, Registry, Resolver, Roots, Value};

fn link(title: &str) -> Link {
    Link {
        title: title.to_string(),
    }
}

fn template(name: &str) -> Template {
    Template {
        name: name.to_string(),
    }
}

fn tag(tag: &str) -> Tag {
    Tag {
        tag: tag.to_string(),
    }
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn sample() -> RevisionInput {
    let text = "== Life ==\nAda was BORN in 1815.<ref>{{cite book}}</ref>\n\
                [[File:Ada.jpg]] [[Category:Mathematicians]] [[London]]";
    RevisionInput {
        bytes: Some(text.len() as u64),
        text: text.to_string(),
        content: "Life Ada was BORN in 1815.".to_string(),
        headings: vec![Heading { level: 2 }, Heading { level: 3 }, Heading { level: 2 }],
        internal_links: vec![
            link("File:Ada.jpg"),
            link("Category:Mathematicians"),
            link("London"),
        ],
        templates: vec![template("cite book"), template("Infobox scientist")],
        tags: vec![tag("ref"), tag("ref"), tag("small")],
        words: words("Life Ada was BORN in 1815"),
    }
}

fn extract(revision: &Revision, input: RevisionInput, nodes: &[Node]) -> Vec<f64> {
    let mut roots = Roots::new();
    input.insert_into(&revision.datasources, &mut roots);
    Resolver::default().extract(nodes, &roots).unwrap()
}

// =============================================================================
// Leaf features
// =============================================================================

#[test]
fn test_structure_counts() {
    let revision = Revision::new();
    let input = sample();
    let bytes = input.bytes.unwrap() as f64;
    let values = extract(
        &revision,
        input,
        &[
            revision.bytes.clone(),
            revision.level_headings[1].clone(),
            revision.level_headings[2].clone(),
            revision.level_headings[5].clone(),
            revision.internal_links.clone(),
            revision.image_links.clone(),
            revision.category_links.clone(),
            revision.ref_tags.clone(),
            revision.templates.clone(),
            revision.cite_templates.clone(),
            revision.infobox_templates.clone(),
            revision.proportion_of_templated_references.clone(),
        ],
    );

    assert_eq!(
        values,
        [bytes, 2.0, 1.0, 0.0, 3.0, 1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 0.5]
    );
}

#[test]
fn test_character_counts() {
    let revision = Revision::new();
    let input = RevisionInput {
        text: "[[Ab]] 12 é!".to_string(),
        content: "Ab 12 é".to_string(),
        ..Default::default()
    };
    let values = extract(
        &revision,
        input,
        &[
            revision.chars.clone(),
            revision.markup_chars.clone(),
            revision.numeric_chars.clone(),
            revision.symbolic_chars.clone(),
            revision.uppercase_chars.clone(),
            revision.content_chars.clone(),
        ],
    );

    assert_eq!(values, [12.0, 4.0, 2.0, 5.0, 1.0, 7.0]);
}

#[test]
fn test_proportions() {
    let revision = Revision::new();
    let input = RevisionInput {
        text: "ABcd".to_string(),
        ..Default::default()
    };
    let values = extract(
        &revision,
        input,
        &[
            revision.proportion_of_uppercase_chars.clone(),
            revision.proportion_of_markup_chars.clone(),
        ],
    );

    assert_relative_eq!(values[0], 0.5);
    assert_relative_eq!(values[1], 0.0);
}

#[test]
fn test_empty_revision() {
    let revision = Revision::new();
    let values = extract(&revision, RevisionInput::default(), &revision.features());

    assert_eq!(values.len(), revision.features().len());
    assert!(values.iter().all(|&v| v == 0.0));
}

#[test]
fn test_counting_features_are_computed_from_their_datasources() {
    let revision = Revision::new();
    let input = RevisionInput {
        bytes: None,
        internal_links: vec![link("London"), link("Paris")],
        templates: vec![template("Infobox city")],
        ..Default::default()
    };
    let values = extract(
        &revision,
        input,
        &[
            revision.bytes.clone(),
            revision.internal_links.clone(),
            revision.templates.clone(),
        ],
    );

    assert_eq!(values, [0.0, 2.0, 1.0]);
}

#[test]
fn test_missing_input_is_reported() {
    let revision = Revision::new();
    let mut roots = Roots::new();
    roots.insert(&revision.datasources.text, Value::new("text".to_string()));

    match Resolver::default().extract(&[revision.templates.clone()], &roots) {
        Err(Error::MissingRootInput { node }) => {
            assert_eq!(node.as_str(), "revision.datasources.templates")
        }
        other => panic!("Expected MissingRootInput, got {:?}", other),
    }
}

#[test]
fn test_shared_sub_features_compute_once() {
    let revision = Revision::new();
    let mut roots = Roots::new();
    sample().insert_into(&revision.datasources, &mut roots);

    let mut ctx = Context::with_roots(roots);
    Resolver::default()
        .solve_many(
            &[
                revision.proportion_of_markup_chars.clone(),
                revision.proportion_of_numeric_chars.clone(),
                revision.proportion_of_symbolic_chars.clone(),
                revision.proportion_of_uppercase_chars.clone(),
            ],
            &mut ctx,
        )
        .unwrap();

    // chars, max(chars, 1), four counts and four ratios
    assert_eq!(ctx.computed(), 10);
}

// =============================================================================
// Diff features
// =============================================================================

#[test]
fn test_word_diff_features() {
    let diff = RevisionDiff::of(Revision::new());
    let mut roots = Roots::new();
    RevisionInput {
        words: words("the cat sat on the mat"),
        ..Default::default()
    }
    .insert_into(&diff.parent.datasources, &mut roots);
    RevisionInput {
        words: words("the dog sat on the mat mat"),
        ..Default::default()
    }
    .insert_into(&diff.revision.datasources, &mut roots);

    let values = Resolver::default()
        .extract(&diff.features(), &roots)
        .unwrap();

    // dog +1, mat +1, cat -1
    assert_eq!(values[0], 2.0);
    assert_eq!(values[1], 1.0);
    assert_relative_eq!(values[2], 2.0);
    assert_relative_eq!(values[3], 1.0);
}

#[test]
fn test_word_diff_against_empty_parent() {
    let diff = RevisionDiff::of(Revision::new());
    let mut roots = Roots::new();
    RevisionInput::default().insert_into(&diff.parent.datasources, &mut roots);
    RevisionInput {
        words: words("a a b"),
        ..Default::default()
    }
    .insert_into(&diff.revision.datasources, &mut roots);

    let values = Resolver::default()
        .extract(&diff.features(), &roots)
        .unwrap();
    assert_eq!(values, [3.0, 0.0, 3.0, 0.0]);
}

#[test]
fn test_register_full_graph() {
    let diff = RevisionDiff::of(Revision::new());
    let mut registry = Registry::new();
    diff.register(&mut registry);

    assert!(registry.contains("revision.parent.datasources.words"));
    assert!(registry.contains("revision.datasources.words"));
    let order = registry.dependency_order(&diff.features()).unwrap();
    assert!(order.iter().position(|n| n == &diff.word_delta)
        < order.iter().position(|n| n == &diff.words_added));
}
