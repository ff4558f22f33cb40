//! The node model (spec §3).
//!
//! Grounded on the teacher's reference-counted DOM
//! (`examples/other_examples/46814eda_servo-html5ever__markup5ever-rcdom.rs.rs`)
//! but implemented as a single arena of nodes keyed by integer handles, the
//! ownership strategy spec.md §3/§9 calls out as preferable to a
//! reference-counted graph: "this avoids cyclic ownership while preserving
//! O(1) parent lookups and cheap reparenting."

use std::cell::Cell;

use crate::atom::{Attribute, Namespace, QualName};

/// A handle into a [`Tree`]'s arena. Cheap to copy, meaningless outside the
/// arena that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A `(offset, line, column)` origin, populated only when
/// [`crate::Options::track_node_locations`] is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

/// Script elements remember whether they have "already started"
/// (html5lib's `already started` flag), the way the teacher's
/// `ElementEnum::Script(Cell<bool>)` does. We carry it as dead weight: this
/// crate doesn't execute scripts (§1 Non-goals), but the flag is part of the
/// node shape the tree builder's `create_element` depends on.
#[derive(Debug, Default)]
pub struct ElementExtra {
    pub already_started: Cell<bool>,
    /// For `math annotation-xml`: true when an `encoding` attribute matches
    /// `text/html` or `application/xhtml+xml` case-insensitively, used by
    /// the tree builder's integration-point check (§4.3 glossary).
    pub is_mathml_text_integration: bool,
}

/// The six node shapes of spec.md §3.
#[derive(Debug)]
pub enum NodeData {
    Document,
    DocumentFragment,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Text {
        data: String,
    },
    Comment {
        data: String,
    },
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        self_closing: bool,
        extra: ElementExtra,
        /// Non-null only for HTML-namespace `<template>` elements: the
        /// shadow child container (`templateContent`).
        template_contents: Option<NodeId>,
    },
}

impl NodeData {
    pub fn is_element(&self) -> bool {
        matches!(self, NodeData::Element { .. })
    }

    pub fn as_element(&self) -> Option<(&QualName, &[Attribute])> {
        match self {
            NodeData::Element { name, attrs, .. } => Some((name, attrs)),
            _ => None,
        }
    }

    /// The semantic name used by the test-format serialiser: element tag,
    /// or `#document` / `#document-fragment` / `#text` / `#comment` /
    /// `!doctype`.
    pub fn semantic_name(&self) -> String {
        match self {
            NodeData::Document => "#document".into(),
            NodeData::DocumentFragment => "#document-fragment".into(),
            NodeData::Text { .. } => "#text".into(),
            NodeData::Comment { .. } => "#comment".into(),
            NodeData::Doctype { .. } => "!doctype".into(),
            NodeData::Element { name, .. } => name.local.clone(),
        }
    }
}

pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub position: Option<Position>,
}

/// The arena owning every node produced by a single parse. Nodes are never
/// shared across trees; parent links are non-owning back-references
/// (plain `NodeId`s, not reference counts), so there is no cycle to break.
pub struct Tree {
    nodes: Vec<Node>,
    pub root: NodeId,
}

impl Tree {
    pub fn new_document() -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.push(NodeData::Document);
        tree
    }

    pub fn new_fragment() -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.push(NodeData::DocumentFragment);
        tree
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
            position: None,
        });
        id
    }

    pub fn create_element(
        &mut self,
        name: QualName,
        attrs: Vec<Attribute>,
        self_closing: bool,
    ) -> NodeId {
        let is_template = name.is_html() && name.local == "template";
        let extra = ElementExtra::default();
        let id = self.push(NodeData::Element {
            name,
            attrs,
            self_closing,
            extra,
            template_contents: None,
        });
        if is_template {
            let contents = self.push(NodeData::DocumentFragment);
            if let NodeData::Element {
                template_contents, ..
            } = &mut self.nodes[id.index()].data
            {
                *template_contents = Some(contents);
            }
        }
        id
    }

    pub fn create_text(&mut self, data: String) -> NodeId {
        self.push(NodeData::Text { data })
    }

    pub fn create_comment(&mut self, data: String) -> NodeId {
        self.push(NodeData::Comment { data })
    }

    pub fn create_doctype(&mut self, name: String, public_id: String, system_id: String) -> NodeId {
        self.push(NodeData::Doctype {
            name,
            public_id,
            system_id,
        })
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn set_position(&mut self, id: NodeId, pos: Position) {
        self.nodes[id.index()].position = Some(pos);
    }

    /// Children of a node, redirecting template elements to their shadow
    /// container per the §3 invariant.
    pub fn children_container(&self, id: NodeId) -> NodeId {
        if let NodeData::Element {
            template_contents: Some(contents),
            ..
        } = &self.nodes[id.index()].data
        {
            *contents
        } else {
            id
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[self.children_container(id).index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
        matches!(&self.nodes[id.index()].data, NodeData::Element { name: n, .. } if n.is_html() && n.local == name)
    }

    pub fn element_name(&self, id: NodeId) -> Option<&QualName> {
        match &self.nodes[id.index()].data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Appends `child` as the last child of `parent`, merging into a
    /// trailing text sibling when both are text (§3 adjacent text-node
    /// merging invariant).
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let container = self.children_container(parent);
        if let NodeData::Text { data } = &self.nodes[child.index()].data {
            let data = data.clone();
            if let Some(&last) = self.nodes[container.index()].children.last() {
                if self.merge_text_into(last, &data) {
                    return;
                }
            }
        }
        self.nodes[child.index()].parent = Some(container);
        self.nodes[container.index()].children.push(child);
    }

    /// Inserts `child` immediately before `sibling` under its parent,
    /// merging into a preceding text sibling so that two text siblings
    /// never end up adjacent (§3 invariant, including "inserting between
    /// two text siblings collapses to one"); `sibling` itself can never be
    /// a text node to merge with, since adjacent text is already merged by
    /// construction.
    pub fn insert_before(&mut self, sibling: NodeId, child: NodeId) {
        let parent = match self.parent(sibling) {
            Some(p) => p,
            None => return,
        };
        let idx = self.nodes[parent.index()]
            .children
            .iter()
            .position(|&c| c == sibling)
            .expect("sibling not found in parent's children");

        if let NodeData::Text { data } = &self.nodes[child.index()].data {
            let data = data.clone();
            if idx > 0 {
                let prev = self.nodes[parent.index()].children[idx - 1];
                if self.merge_text_into(prev, &data) {
                    return;
                }
            }
        }

        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.insert(idx, child);
    }

    fn merge_text_into(&mut self, existing: NodeId, text: &str) -> bool {
        if let NodeData::Text { data } = &mut self.nodes[existing.index()].data {
            data.push_str(text);
            true
        } else {
            false
        }
    }

    /// Inserts `child` as the first child of `parent` (used for the
    /// `?`-prefixed processing-instruction-like comment placement rule of
    /// §4.3).
    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        let container = self.children_container(parent);
        self.detach(child);
        self.nodes[child.index()].parent = Some(container);
        self.nodes[container.index()].children.insert(0, child);
    }

    /// Detaches `node` from its parent, if any.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != node);
        }
    }

    /// Moves all children of `from` to become the last children of `to`
    /// (used by the tree builder to reparent an `<a>` out of `<div>` and by
    /// `<template>`-free table repair).
    pub fn reparent_children(&mut self, from: NodeId, to: NodeId) {
        let from_container = self.children_container(from);
        let to_container = self.children_container(to);
        let moved = std::mem::take(&mut self.nodes[from_container.index()].children);
        for &child in &moved {
            self.nodes[child.index()].parent = Some(to_container);
        }
        self.nodes[to_container.index()].children.extend(moved);
    }

    /// Adds attributes to an element only where the name isn't already
    /// present, matching "first-write-wins" merge semantics used when a
    /// stray `<html>`/`<body>` tag repeats.
    pub fn add_attrs_if_missing(&mut self, id: NodeId, new_attrs: Vec<Attribute>) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.index()].data {
            for attr in new_attrs {
                if !attrs.iter().any(|a| a.name == attr.name) {
                    attrs.push(attr);
                }
            }
        }
    }

    /// Deep-clones a node (and its subtree) into the same arena; used by
    /// formatting-element reopening and by the `<selectedcontent>`
    /// population pass (§4.3).
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> NodeId {
        let new_id = match &self.nodes[id.index()].data {
            NodeData::Document => self.push(NodeData::Document),
            NodeData::DocumentFragment => self.push(NodeData::DocumentFragment),
            NodeData::Text { data } => self.push(NodeData::Text { data: data.clone() }),
            NodeData::Comment { data } => self.push(NodeData::Comment { data: data.clone() }),
            NodeData::Doctype {
                name,
                public_id,
                system_id,
            } => self.push(NodeData::Doctype {
                name: name.clone(),
                public_id: public_id.clone(),
                system_id: system_id.clone(),
            }),
            NodeData::Element {
                name, attrs, self_closing, ..
            } => self.create_element(name.clone(), attrs.clone(), *self_closing),
        };
        if deep {
            let container = self.children_container(id);
            let children = self.nodes[container.index()].children.clone();
            let new_container = self.children_container(new_id);
            for child in children {
                let cloned = self.clone_node(child, true);
                self.nodes[cloned.index()].parent = Some(new_container);
                self.nodes[new_container.index()].children.push(cloned);
            }
        }
        new_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_text_merges_on_append() {
        let mut tree = Tree::new_document();
        let html = tree.create_element(QualName::html("html"), vec![], false);
        tree.append(tree.root, html);
        let a = tree.create_text("foo".into());
        let b = tree.create_text("bar".into());
        tree.append(html, a);
        tree.append(html, b);
        assert_eq!(tree.children(html).len(), 1);
        match &tree.node(tree.children(html)[0]).data {
            NodeData::Text { data } => assert_eq!(data, "foobar"),
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn insert_before_merges_into_preceding_text() {
        let mut tree = Tree::new_document();
        let html = tree.create_element(QualName::html("html"), vec![], false);
        tree.append(tree.root, html);
        let a = tree.create_text("a".into());
        tree.append(html, a);
        let span = tree.create_element(QualName::html("span"), vec![], false);
        tree.append(html, span);
        let b = tree.create_text("b".into());
        tree.insert_before(span, b);
        assert_eq!(tree.children(html).len(), 2);
        match &tree.node(tree.children(html)[0]).data {
            NodeData::Text { data } => assert_eq!(data, "ab"),
            _ => panic!("expected text"),
        }
        assert!(tree.is_element_named(tree.children(html)[1], "span"));
    }

    #[test]
    fn template_children_redirect_to_shadow_container() {
        let mut tree = Tree::new_document();
        let template = tree.create_element(QualName::html("template"), vec![], false);
        tree.append(tree.root, template);
        let span = tree.create_element(QualName::html("span"), vec![], false);
        tree.append(template, span);
        assert_eq!(tree.children(template), &[span]);
        assert_eq!(tree.parent(span), Some(tree.children_container(template)));
    }
}
