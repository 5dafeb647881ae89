//! Wikitext revision datasources and features.
//!
//! Parsing is done upstream: the host supplies the parsed pieces of a
//! revision ([`RevisionInput`]) as root values, and the features here reduce
//! them to counts and ratios.

mod diff;

pub use diff::RevisionDiff;

use std::sync::LazyLock;

use regex::Regex;

use crate::context::Roots;
use crate::frequencies::frequency;
use crate::modifiers::{divide, max};
use crate::node::{Node, NodeKind};
use crate::registry::Registry;
use crate::value::Value;

static MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[\]{}|=<>*#:;']+").unwrap());
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());
static SYMBOLIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]+").unwrap());
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(file|image)\s*:").unwrap());
static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*category\s*:").unwrap());
static CITE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bcite").unwrap());
static INFOBOX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\binfobox").unwrap());

/// A section heading.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Heading {
    /// Heading level, 1 for `=Title=` through 6.
    pub level: u8,
}

/// An internal (wiki) link.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Link {
    /// Link target, including any namespace prefix.
    pub title: String,
}

/// A template transclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Template {
    /// Template name.
    pub name: String,
}

/// An HTML-like tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    /// Tag name, e.g. `ref`.
    pub tag: String,
}

/// Parsed pieces of one revision, as produced by an external parser.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevisionInput {
    /// Size of the content in bytes, if known.
    pub bytes: Option<u64>,
    /// Raw wikitext.
    pub text: String,
    /// Text with markup stripped.
    pub content: String,
    /// Section headings.
    pub headings: Vec<Heading>,
    /// Internal links.
    pub internal_links: Vec<Link>,
    /// Template transclusions.
    pub templates: Vec<Template>,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Word tokens of the content.
    pub words: Vec<String>,
}

impl RevisionInput {
    /// Supply these values for the given datasources.
    pub fn insert_into(self, datasources: &RevisionDatasources, roots: &mut Roots) {
        roots.insert(&datasources.bytes, Value::from_option(self.bytes));
        roots.insert(&datasources.text, Value::new(self.text));
        roots.insert(&datasources.content, Value::new(self.content));
        roots.insert(&datasources.headings, Value::new(self.headings));
        roots.insert(&datasources.internal_links, Value::new(self.internal_links));
        roots.insert(&datasources.templates, Value::new(self.templates));
        roots.insert(&datasources.tags, Value::new(self.tags));
        roots.insert(&datasources.words, Value::new(self.words));
    }
}

/// Root input nodes of one revision, named `{prefix}.datasources.{field}`.
///
/// The `datasources` segment keeps root names apart from feature names such as
/// `{prefix}.templates`; a feature sharing a root's name would be served the
/// root value instead of being computed.
///
/// `bytes` holds a `u64` (absent when unknown), `text` and `content` hold a
/// `String`, and the rest hold a `Vec` of the record types.
#[derive(Debug, Clone)]
pub struct RevisionDatasources {
    /// `{prefix}.datasources.bytes`
    pub bytes: Node,
    /// `{prefix}.datasources.text`
    pub text: Node,
    /// `{prefix}.datasources.content`
    pub content: Node,
    /// `{prefix}.datasources.headings`
    pub headings: Node,
    /// `{prefix}.datasources.internal_links`
    pub internal_links: Node,
    /// `{prefix}.datasources.templates`
    pub templates: Node,
    /// `{prefix}.datasources.tags`
    pub tags: Node,
    /// `{prefix}.datasources.words`
    pub words: Node,
}

impl RevisionDatasources {
    /// Root nodes named under `{prefix}.datasources`.
    pub fn new(prefix: &str) -> Self {
        let root = |field: &str| Node::root(format!("{}.datasources.{}", prefix, field));
        Self {
            bytes: root("bytes"),
            text: root("text"),
            content: root("content"),
            headings: root("headings"),
            internal_links: root("internal_links"),
            templates: root("templates"),
            tags: root("tags"),
            words: root("words"),
        }
    }
}

/// Features of one revision.
#[derive(Debug, Clone)]
pub struct Revision {
    prefix: String,
    /// Root inputs the features are computed from.
    pub datasources: RevisionDatasources,
    /// Size of the content in bytes.
    pub bytes: Node,
    /// Number of characters.
    pub chars: Node,
    /// Characters matched as wikitext markup.
    pub markup_chars: Node,
    /// `markup_chars / max(chars, 1)`
    pub proportion_of_markup_chars: Node,
    /// Digit characters.
    pub numeric_chars: Node,
    /// `numeric_chars / max(chars, 1)`
    pub proportion_of_numeric_chars: Node,
    /// Characters that are neither word characters nor whitespace.
    pub symbolic_chars: Node,
    /// `symbolic_chars / max(chars, 1)`
    pub proportion_of_symbolic_chars: Node,
    /// Characters that change when lowercased.
    pub uppercase_chars: Node,
    /// `uppercase_chars / max(chars, 1)`
    pub proportion_of_uppercase_chars: Node,
    /// Number of headings at levels 1 through 6.
    pub level_headings: [Node; 6],
    /// Characters of markup-stripped content.
    pub content_chars: Node,
    /// Number of internal links.
    pub internal_links: Node,
    /// Internal links to images and files.
    pub image_links: Node,
    /// Internal links to categories.
    pub category_links: Node,
    /// Number of `ref` tags.
    pub ref_tags: Node,
    /// Number of templates.
    pub templates: Node,
    /// Citation templates such as "Cite web".
    pub cite_templates: Node,
    /// `cite_templates / max(ref_tags, 1)`
    pub proportion_of_templated_references: Node,
    /// Infobox templates.
    pub infobox_templates: Node,
    /// Frequency table of word tokens.
    pub word_frequency: Node,
}

impl Default for Revision {
    fn default() -> Self {
        Self::new()
    }
}

fn count<A, F>(name: String, dependency: &Node, f: F) -> Node
where
    A: std::any::Any,
    F: Fn(&A) -> usize + Send + Sync + 'static,
{
    Node::unary(name, dependency, move |a: &A| {
        i64::try_from(f(a)).unwrap_or(i64::MAX)
    })
}

fn matched_chars(re: &Regex, text: &str) -> usize {
    re.find_iter(text).map(|m| m.as_str().chars().count()).sum()
}

impl Revision {
    /// Features of the current revision, rooted at `revision.*`.
    pub fn new() -> Self {
        Self::with_prefix("revision")
    }

    /// Features rooted at `{prefix}.*`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let ds = RevisionDatasources::new(&prefix);
        let name = |field: &str| format!("{}.{}", prefix, field);

        let bytes = Node::builder("bytes")
            .name(name("bytes"))
            .kind(NodeKind::Feature)
            .depends_on(&ds.bytes)
            .returns::<i64>()
            .process(|args| {
                let bytes = args.get_opt::<u64>(0)?.copied().unwrap_or(0);
                Ok(Value::new(i64::try_from(bytes)?))
            })
            .build();

        let chars = count(name("chars"), &ds.text, |t: &String| t.chars().count());
        let markup_chars = count(name("markup_chars"), &ds.text, |t: &String| {
            matched_chars(&MARKUP_RE, t)
        });
        let numeric_chars = count(name("numeric_chars"), &ds.text, |t: &String| {
            matched_chars(&NUMERIC_RE, t)
        });
        let symbolic_chars = count(name("symbolic_chars"), &ds.text, |t: &String| {
            matched_chars(&SYMBOLIC_RE, t)
        });
        let uppercase_chars = count(name("uppercase_chars"), &ds.text, |t: &String| {
            t.chars()
                .filter(|&c| !c.to_lowercase().eq(std::iter::once(c)))
                .count()
        });

        let level_headings = [1u8, 2, 3, 4, 5, 6].map(|level| {
            count(
                name(&format!("level_{}_headings", level)),
                &ds.headings,
                move |headings: &Vec<Heading>| headings.iter().filter(|h| h.level == level).count(),
            )
        });

        let content_chars = count(name("content_chars"), &ds.content, |c: &String| {
            c.chars().count()
        });

        let internal_links = count(name("internal_links"), &ds.internal_links, Vec::<Link>::len);
        let image_links = count(name("image_links"), &ds.internal_links, |links: &Vec<Link>| {
            links.iter().filter(|l| IMAGE_RE.is_match(&l.title)).count()
        });
        let category_links = count(
            name("category_links"),
            &ds.internal_links,
            |links: &Vec<Link>| links.iter().filter(|l| CATEGORY_RE.is_match(&l.title)).count(),
        );

        let ref_tags = count(name("ref_tags"), &ds.tags, |tags: &Vec<Tag>| {
            tags.iter().filter(|t| t.tag == "ref").count()
        });

        let templates = count(name("templates"), &ds.templates, Vec::<Template>::len);
        let cite_templates = count(
            name("cite_templates"),
            &ds.templates,
            |templates: &Vec<Template>| {
                templates.iter().filter(|t| CITE_RE.is_match(&t.name)).count()
            },
        );
        let infobox_templates = count(
            name("infobox_templates"),
            &ds.templates,
            |templates: &Vec<Template>| {
                templates.iter().filter(|t| INFOBOX_RE.is_match(&t.name)).count()
            },
        );

        let chars_floor = max(&chars, 1);

        Self {
            proportion_of_markup_chars: divide(&markup_chars, &chars_floor),
            proportion_of_numeric_chars: divide(&numeric_chars, &chars_floor),
            proportion_of_symbolic_chars: divide(&symbolic_chars, &chars_floor),
            proportion_of_uppercase_chars: divide(&uppercase_chars, &chars_floor),
            proportion_of_templated_references: divide(&cite_templates, max(&ref_tags, 1)),
            word_frequency: frequency::<String>(&ds.words),
            prefix,
            datasources: ds,
            bytes,
            chars,
            markup_chars,
            numeric_chars,
            symbolic_chars,
            uppercase_chars,
            level_headings,
            content_chars,
            internal_links,
            image_links,
            category_links,
            ref_tags,
            templates,
            cite_templates,
            infobox_templates,
        }
    }

    /// Features of the parent revision, rooted at `{prefix}.parent.*`.
    pub fn parent(&self) -> Revision {
        Self::with_prefix(format!("{}.parent", self.prefix))
    }

    /// Name prefix of this revision's nodes.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The scalar features in their canonical vector order.
    pub fn features(&self) -> Vec<Node> {
        let mut features = vec![
            self.bytes.clone(),
            self.chars.clone(),
            self.markup_chars.clone(),
            self.proportion_of_markup_chars.clone(),
            self.numeric_chars.clone(),
            self.proportion_of_numeric_chars.clone(),
            self.symbolic_chars.clone(),
            self.proportion_of_symbolic_chars.clone(),
            self.uppercase_chars.clone(),
            self.proportion_of_uppercase_chars.clone(),
        ];
        features.extend(self.level_headings.iter().cloned());
        features.extend([
            self.content_chars.clone(),
            self.internal_links.clone(),
            self.image_links.clone(),
            self.category_links.clone(),
            self.ref_tags.clone(),
            self.templates.clone(),
            self.cite_templates.clone(),
            self.proportion_of_templated_references.clone(),
            self.infobox_templates.clone(),
        ]);
        features
    }

    /// Register every feature of this revision.
    pub fn register(&self, registry: &mut Registry) {
        registry.extend(&self.features());
        registry.register(&self.word_frequency);
    }
}
