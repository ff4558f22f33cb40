//! A minimal CSS-like selector engine (§1 "out of scope: treated as an
//! external collaborator", §6 `query`/`queryOne`).
//!
//! Supports the subset spec.md's Non-goals leave unexcluded for a
//! tree-walking query helper: a tag name, `#id`, `.class`, `*`, and the
//! descendant combinator (whitespace-separated simple selectors). No
//! combinators beyond descendant, no attribute selectors, no
//! pseudo-classes — a full CSS selector engine is an explicit Non-goal.

use crate::node::{NodeData, NodeId, Tree};

#[derive(Debug, Clone)]
struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl SimpleSelector {
    fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        let (name, attrs) = match tree.node(node).data {
            NodeData::Element { ref name, ref attrs, .. } => (name, attrs),
            _ => return false,
        };
        if let Some(tag) = &self.tag {
            if tag != "*" && &name.local != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            let matches_id = attrs.iter().any(|a| a.name.local == "id" && &a.value == id);
            if !matches_id {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = attrs.iter().find(|a| a.name.local == "class");
            let present: Vec<&str> = class_attr.map(|a| a.value.split_whitespace().collect()).unwrap_or_default();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }
        true
    }
}

/// A parsed selector: a sequence of simple selectors joined by the
/// descendant combinator (`div .item` matches a `.item` that is a
/// descendant of a `div`).
#[derive(Debug, Clone)]
pub struct Selector {
    parts: Vec<SimpleSelector>,
}

impl Selector {
    pub fn parse(input: &str) -> Selector {
        let parts = input
            .split_whitespace()
            .map(parse_simple_selector)
            .collect();
        Selector { parts }
    }
}

fn parse_simple_selector(token: &str) -> SimpleSelector {
    let mut tag = None;
    let mut id = None;
    let mut classes = Vec::new();

    let mut rest = token;
    if let Some(idx) = rest.find(|c| c == '#' || c == '.') {
        if idx > 0 {
            tag = Some(rest[..idx].to_string());
        }
        rest = &rest[idx..];
    } else if !rest.is_empty() {
        tag = Some(rest.to_string());
        rest = "";
    }

    while !rest.is_empty() {
        let next_idx = rest[1..].find(|c| c == '#' || c == '.').map(|i| i + 1).unwrap_or(rest.len());
        let (head, tail) = rest.split_at(next_idx);
        if let Some(name) = head.strip_prefix('#') {
            id = Some(name.to_string());
        } else if let Some(name) = head.strip_prefix('.') {
            classes.push(name.to_string());
        }
        rest = tail;
    }

    SimpleSelector { tag, id, classes }
}

/// Finds every descendant of `root` matching `selector`, in document
/// order (§6 `query`).
pub fn query(tree: &Tree, root: NodeId, selector: &Selector) -> Vec<NodeId> {
    let mut out = Vec::new();
    query_into(tree, root, &selector.parts, &mut out);
    out
}

/// The first descendant matching `selector`, or `None` (§6 `queryOne`).
pub fn query_one(tree: &Tree, root: NodeId, selector: &Selector) -> Option<NodeId> {
    query(tree, root, selector).into_iter().next()
}

fn query_into(tree: &Tree, root: NodeId, parts: &[SimpleSelector], out: &mut Vec<NodeId>) {
    for &child in tree.children(root) {
        if !matches!(tree.node(child).data, NodeData::Element { .. }) {
            query_into(tree, child, parts, out);
            continue;
        }
        if matches_descendant_chain(tree, child, parts) {
            out.push(child);
        }
        query_into(tree, child, parts, out);
    }
}

/// Whether `node` satisfies the last simple selector in `parts` and has an
/// ancestor chain satisfying every earlier one, in order.
fn matches_descendant_chain(tree: &Tree, node: NodeId, parts: &[SimpleSelector]) -> bool {
    let (last, earlier) = match parts.split_last() {
        Some(split) => split,
        None => return false,
    };
    if !last.matches(tree, node) {
        return false;
    }
    if earlier.is_empty() {
        return true;
    }
    let mut ancestor = tree.parent(node);
    let mut remaining = earlier;
    while let Some(current) = ancestor {
        if let Some((needle, rest)) = remaining.split_last() {
            if needle.matches(tree, current) {
                remaining = rest;
                if remaining.is_empty() {
                    return true;
                }
            }
        }
        ancestor = tree.parent(current);
    }
    remaining.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::QualName;

    fn build() -> (Tree, NodeId) {
        let mut tree = Tree::new_document();
        let html = tree.create_element(QualName::html("html"), vec![], false);
        tree.append(tree.root, html);
        let body = tree.create_element(QualName::html("body"), vec![], false);
        tree.append(html, body);
        let div = tree.create_element(
            QualName::html("div"),
            vec![crate::atom::Attribute::new("id", "main")],
            false,
        );
        tree.append(body, div);
        let p = tree.create_element(
            QualName::html("p"),
            vec![crate::atom::Attribute::new("class", "item highlight")],
            false,
        );
        tree.append(div, p);
        let root = tree.root;
        (tree, root)
    }

    #[test]
    fn tag_selector_finds_descendants() {
        let (tree, root) = build();
        let sel = Selector::parse("p");
        let results = query(&tree, root, &sel);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn id_selector_matches() {
        let (tree, root) = build();
        let sel = Selector::parse("#main");
        assert!(query_one(&tree, root, &sel).is_some());
    }

    #[test]
    fn class_selector_requires_all_classes() {
        let (tree, root) = build();
        let sel = Selector::parse(".item.highlight");
        assert!(query_one(&tree, root, &sel).is_some());
        let sel2 = Selector::parse(".missing");
        assert!(query_one(&tree, root, &sel2).is_none());
    }

    #[test]
    fn descendant_combinator_requires_ancestor_match() {
        let (tree, root) = build();
        let sel = Selector::parse("div p");
        assert!(query_one(&tree, root, &sel).is_some());
        let sel2 = Selector::parse("body p");
        assert!(query_one(&tree, root, &sel2).is_some());
    }
}
