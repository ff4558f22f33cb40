//! Small name/namespace types used throughout the node model, tokenizer and
//! tree builder.
//!
//! The teacher lineage (html5ever) interns tag and attribute names with
//! `string_cache::Atom` so that tag-set comparisons are pointer-equality
//! fast. This crate's arena-based node model has no need for interning
//! across independent parses, so we use plain heap strings instead; see
//! DESIGN.md for the rationale (dropped `string_cache` dependency).

use std::fmt;

/// An HTML, SVG or MathML namespace, mirroring the three namespaces a
/// tree-construction-compatible tree can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Html => "html",
            Namespace::Svg => "svg",
            Namespace::MathMl => "math",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A namespace-qualified element or attribute name. `prefix` is only ever
/// populated for the flattened `xml:*`/`xlink:*` attribute forms the
/// serialiser produces for foreign content (§6 test-format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualName {
    pub prefix: Option<String>,
    pub ns: Namespace,
    pub local: String,
}

impl QualName {
    pub fn html(local: impl Into<String>) -> Self {
        QualName {
            prefix: None,
            ns: Namespace::Html,
            local: local.into(),
        }
    }

    pub fn new(ns: Namespace, local: impl Into<String>) -> Self {
        QualName {
            prefix: None,
            ns,
            local: local.into(),
        }
    }

    pub fn is_html(&self) -> bool {
        self.ns == Namespace::Html
    }

    pub fn local_eq(&self, name: &str) -> bool {
        self.local == name
    }
}

impl fmt::Display for QualName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{}:{}", prefix, self.local)
        } else {
            f.write_str(&self.local)
        }
    }
}

/// A single HTML attribute. Duplicate attribute names on the same tag are
/// dropped by the tokenizer before this type is ever constructed, so a plain
/// vector (insertion-ordered, first-write-wins) is sufficient storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            name: QualName::html(name),
            value: value.into(),
        }
    }
}

/// ASCII-lowercase a tag or attribute name, matching the node model's
/// §3 invariant ("Element names are ASCII-lower-cased at construction").
pub fn ascii_lower(s: &str) -> String {
    s.chars()
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
