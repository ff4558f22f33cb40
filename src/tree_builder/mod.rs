//! The tree builder (spec §4.3): consumes the token stream and produces the
//! document tree.
//!
//! Structured after the teacher's `tree_builder` module split into a public
//! driver plus an internal actions/rules layer
//! (`examples/other_examples/4bb4e211_servo-html5ever__src-tree_builder-actions.rs.rs`),
//! but with the insertion-mode matrix collapsed to the handful of
//! scaffolding modes spec.md §4.3 actually names; once inside `<body>` the
//! rules dispatch directly off stack contents the way spec.md describes them
//! ("the current top is `table`", "a nested `<select>`"), not off 21
//! separate per-spec insertion-mode functions. This is the deliberate
//! deviation spec.md §4.3/§9 documents.

pub mod tags;

use crate::atom::{ascii_lower, Attribute, Namespace, QualName};
use crate::errors::{ErrorCategory, ParseError, SourcePosition};
use crate::node::{NodeData, NodeId, Position, Tree};
use crate::tokenizer::{PositionedToken, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuirksMode {
    NoQuirks,
    LimitedQuirks,
    Quirks,
}

#[derive(Debug, Clone)]
struct OpenTag {
    name: String,
    attrs: Vec<Attribute>,
}

enum FormatEntry {
    Element(NodeId, OpenTag),
    Marker,
}

#[derive(Debug, Clone)]
pub struct FragmentContext {
    pub name: String,
    pub namespace: Namespace,
}

pub struct TreeBuilder {
    pub tree: Tree,
    open_elements: Vec<NodeId>,
    active_formatting: Vec<FormatEntry>,
    html_element: Option<NodeId>,
    head_element: Option<NodeId>,
    body_element: Option<NodeId>,
    frameset_ok: bool,
    after_body: bool,
    seen_doctype: bool,
    quirks_mode: QuirksMode,
    fragment: Option<FragmentContext>,
    root_namespace: Namespace,
    /// True once the select/option list pass should run at termination.
    has_select_button: bool,
    pub errors: Vec<ParseError>,
    pub collect_errors: bool,
    pub track_locations: bool,
}

impl TreeBuilder {
    pub fn new_document() -> Self {
        TreeBuilder {
            tree: Tree::new_document(),
            open_elements: Vec::new(),
            active_formatting: Vec::new(),
            html_element: None,
            head_element: None,
            body_element: None,
            frameset_ok: true,
            after_body: false,
            seen_doctype: false,
            quirks_mode: QuirksMode::NoQuirks,
            fragment: None,
            root_namespace: Namespace::Html,
            has_select_button: false,
            errors: Vec::new(),
            collect_errors: false,
            track_locations: false,
        }
    }

    pub fn new_fragment(ctx: FragmentContext) -> Self {
        let mut tree = Tree::new_fragment();
        let root = tree.root;
        let root_namespace = initial_fragment_namespace(&ctx);
        let mut builder = TreeBuilder {
            tree,
            open_elements: vec![root],
            active_formatting: Vec::new(),
            html_element: None,
            head_element: None,
            body_element: None,
            frameset_ok: true,
            after_body: false,
            seen_doctype: true,
            quirks_mode: QuirksMode::NoQuirks,
            fragment: Some(ctx),
            root_namespace,
            has_select_button: false,
            errors: Vec::new(),
            collect_errors: false,
            track_locations: false,
        };
        builder.html_element = Some(root);
        builder
    }

    pub fn quirks_mode(&self) -> QuirksMode {
        self.quirks_mode
    }

    // ---- error recording -------------------------------------------------

    fn error(&mut self, code: &'static str, message: impl Into<String>, pos: SourcePosition) {
        if self.collect_errors {
            self.errors.push(ParseError::new(
                ErrorCategory::TreeBuilder,
                code,
                message,
                Some(pos),
            ));
        }
    }

    // ---- stack helpers -----------------------------------------------------

    fn current_node(&self) -> NodeId {
        *self.open_elements.last().expect("open elements stack is never empty")
    }

    fn current_namespace(&self) -> Namespace {
        match self.tree.element_name(self.current_node()) {
            Some(name) => name.ns,
            None => self.root_namespace,
        }
    }

    fn current_node_named(&self, name: &str) -> bool {
        self.tree.is_element_named(self.current_node(), name)
    }

    fn push(&mut self, id: NodeId) {
        self.open_elements.push(id);
    }

    fn pop(&mut self) -> NodeId {
        self.open_elements.pop().expect("pop on empty stack")
    }

    fn pop_until_named(&mut self, name: &str) {
        while self.open_elements.len() > 1 {
            let top = self.pop();
            if self.tree.is_element_named(top, name) {
                break;
            }
        }
    }

    /// Default scope boundary, the way the teacher's `in_scope`/`declare_tag_set!`
    /// pairing works, simplified to a single boundary set (spec.md doesn't
    /// distinguish button/list-item/table scopes explicitly, so one
    /// conservative boundary covers the parent-selection rules it does
    /// name).
    fn in_scope(&self, name: &str) -> bool {
        const BOUNDARY: &[&str] = &[
            "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template",
            "button",
        ];
        for &id in self.open_elements.iter().rev() {
            if self.tree.is_element_named(id, name) {
                return true;
            }
            if let Some(n) = self.tree.element_name(id) {
                if n.is_html() && BOUNDARY.contains(&n.local.as_str()) {
                    return false;
                }
            }
        }
        false
    }

    fn find_in_open(&self, name: &str) -> Option<usize> {
        self.open_elements
            .iter()
            .rposition(|&id| self.tree.is_element_named(id, name))
    }

    // ---- insertion ---------------------------------------------------------

    /// Namespace-aware element creation with QuirksMode-independent
    /// lower-casing (§3 invariant: names are lower-cased at construction;
    /// the tokenizer already lower-cases HTML tag names, this is belt and
    /// braces for foreign-content tag names that keep mixed case upstream).
    /// SVG names are then run through the camel-case adjustment table
    /// (§4.3 "adjust SVG tag names"), since blanket lower-casing would
    /// otherwise collapse `foreignObject` and friends to all-lowercase and
    /// break every comparison against their canonical mixed-case spelling.
    fn make_element(&mut self, name: &str, ns: Namespace, attrs: Vec<Attribute>) -> NodeId {
        let lower = ascii_lower(name);
        let local = if ns == Namespace::Svg {
            tags::adjust_svg_tag_name(&lower)
                .map(str::to_string)
                .unwrap_or(lower)
        } else {
            lower
        };
        let qname = QualName::new(ns, local);
        self.tree.create_element(qname, attrs, false)
    }

    fn insert_html_element(&mut self, tag: &OpenTag) -> NodeId {
        let parent = self.appropriate_insertion_parent(&tag.name);
        let id = self.make_element(&tag.name, Namespace::Html, tag.attrs.clone());
        self.place_in_parent(parent, id);
        self.push(id);
        id
    }

    fn insert_foreign_element(&mut self, tag: &OpenTag, ns: Namespace) -> NodeId {
        let parent = self.current_node();
        let id = self.make_element(&tag.name, ns, tag.attrs.clone());
        self.tree.append(parent, id);
        self.push(id);
        id
    }

    /// Rule 3 (table foster parenting): when appending into a table whose
    /// content isn't a legal table child, insert before the table in its
    /// parent instead.
    fn place_in_parent(&mut self, parent: Parent, id: NodeId) {
        match parent {
            Parent::Direct(p) => self.tree.append(p, id),
            Parent::FosterBeforeTable(table) => {
                if self.tree.parent(table).is_some() {
                    self.tree.insert_before(table, id);
                } else {
                    self.tree.append(table, id);
                }
            }
        }
    }

    /// Implements parent-selection rules 1-4 of §4.3.
    fn appropriate_insertion_parent(&mut self, tag_name: &str) -> Parent {
        // Rule 2: head routing while body is still empty.
        if self.current_node_named("html")
            && tags::contains(tags::HEAD_TAGS, tag_name)
            && self.body_element.is_none()
        {
            if let Some(head) = self.head_element {
                return Parent::Direct(head);
            }
        }

        // Rule 3/4: table foster parenting and table-section direct children.
        if self.current_node_named("table") {
            if tags::contains(tags::TABLE_CHILD, tag_name) {
                return Parent::Direct(self.current_node());
            }
            return Parent::FosterBeforeTable(self.current_node());
        }

        Parent::Direct(self.current_node())
    }

    fn insert_text(&mut self, data: String) {
        if data.is_empty() {
            return;
        }
        if self.current_node_named("table") {
            let table = self.current_node();
            if self.tree.parent(table).is_some() {
                let node = self.tree.create_text(data);
                self.tree.insert_before(table, node);
                return;
            }
        }
        let parent = self.current_node();
        let node = self.tree.create_text(data);
        self.tree.append(parent, node);
    }

    fn insert_comment(&mut self, data: String) {
        if data.starts_with('?') {
            let node = self.tree.create_comment(data);
            self.tree.prepend(self.tree.root, node);
            return;
        }
        if self.html_element.is_none() || self.after_body {
            let node = self.tree.create_comment(data);
            self.tree.append(self.tree.root, node);
            return;
        }
        let node = self.tree.create_comment(data);
        let parent = self.current_node();
        self.tree.append(parent, node);
    }

    // ---- scaffolding ---------------------------------------------------------

    fn ensure_scaffolding(&mut self) {
        if self.fragment.is_some() {
            return;
        }
        if self.html_element.is_none() {
            let id = self.make_element("html", Namespace::Html, vec![]);
            self.tree.append(self.tree.root, id);
            self.html_element = Some(id);
            self.open_elements.push(id);
        }
        if self.head_element.is_none() {
            let id = self.make_element("head", Namespace::Html, vec![]);
            self.tree.append(self.html_element.unwrap(), id);
            self.head_element = Some(id);
        }
        if self.body_element.is_none() && !self.has_frameset() {
            let id = self.make_element("body", Namespace::Html, vec![]);
            self.tree.append(self.html_element.unwrap(), id);
            self.body_element = Some(id);
            // Reset insertion point to body once scaffolding is created.
            if self.open_elements.last() == Some(&self.html_element.unwrap()) {
                self.push(id);
            }
        }
    }

    fn has_frameset(&self) -> bool {
        self.html_element
            .map(|html| {
                self.tree
                    .children(html)
                    .iter()
                    .any(|&c| self.tree.is_element_named(c, "frameset"))
            })
            .unwrap_or(false)
    }

    // ---- public driving API -------------------------------------------------

    pub fn process(&mut self, pt: PositionedToken) {
        match pt.token {
            Token::Doctype {
                name,
                public_id,
                system_id,
            } => self.process_doctype(name, public_id, system_id, pt.pos),
            Token::Comment { data } => self.process_comment(data),
            Token::Text { data } => self.process_text(data, pt.pos),
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => self.process_start_tag(name, attrs, self_closing, pt.pos),
            Token::EndTag { name } => self.process_end_tag(name, pt.pos),
        }
    }

    fn process_doctype(
        &mut self,
        name: Option<String>,
        public_id: Option<String>,
        system_id: Option<String>,
        _pos: SourcePosition,
    ) {
        if self.seen_doctype || self.html_element.is_some() {
            return;
        }
        self.seen_doctype = true;
        let name = name.unwrap_or_default();
        self.quirks_mode = classify_quirks(&name, public_id.as_deref(), system_id.as_deref());
        let node = self.tree.create_doctype(
            name,
            public_id.unwrap_or_default(),
            system_id.unwrap_or_default(),
        );
        self.tree.append(self.tree.root, node);
    }

    fn process_comment(&mut self, data: String) {
        if let Some(inner) = data.strip_prefix("[CDATA[").and_then(|s| s.strip_suffix("]]")) {
            // CDATA outside foreign content renders as the bogus-comment
            // payload (already formed); inside foreign content it's text.
            if self.current_namespace() != Namespace::Html && !self.at_integration_point() {
                self.insert_text(inner.to_string());
                return;
            }
        }
        // Comments never force scaffolding to be created (§4.3: "before the
        // document element exists, comments attach to the root").
        self.insert_comment(data);
    }

    fn process_text(&mut self, data: String, _pos: SourcePosition) {
        if self.fragment.is_none() && self.html_element.is_none() {
            if data.trim().is_empty() {
                return;
            }
        }
        self.ensure_scaffolding();

        let ns = self.current_namespace();
        let processed = if ns == Namespace::Html || self.at_integration_point() {
            // NUL handling: replaced with U+FFFD in script/style/plaintext,
            // stripped elsewhere, stripped inside integration points.
            if self.at_integration_point() {
                strip_nul(&data)
            } else if matches!(
                self.tree.element_name(self.current_node()).map(|n| n.local.as_str()),
                Some("script") | Some("style") | Some("plaintext")
            ) {
                replace_nul_with_fffd(&data)
            } else {
                strip_nul(&data)
            }
        } else {
            replace_nul_with_fffd(&data)
        };

        if processed.is_empty() {
            return;
        }

        if !processed.trim().is_empty() {
            self.frameset_ok = false;
        } else if self.body_element.is_none() {
            // Whitespace-only text before body exists is dropped while
            // framesetOk is true.
            if self.frameset_ok {
                return;
            }
        }

        if self.current_node_named("colgroup") {
            let (leading_ws, remainder) = split_leading_whitespace(&processed);
            if !leading_ws.is_empty() {
                self.insert_text(leading_ws);
            }
            if !remainder.is_empty() {
                self.insert_text(remainder);
            }
            return;
        }

        if self.current_node_named("pre") {
            let stripped = strip_leading_pre_newline(self.current_node(), &processed, &self.tree);
            self.insert_text(stripped);
            return;
        }

        self.insert_text(processed);
    }

    fn process_start_tag(
        &mut self,
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
        pos: SourcePosition,
    ) {
        self.ensure_scaffolding();
        let tag = OpenTag {
            name: name.clone(),
            attrs,
        };

        // Namespace inference and foreign content (§4.3).
        if self.current_namespace() != Namespace::Html && !self.at_integration_point() {
            if tags::contains(tags::BREAKOUT, &name) || is_font_breakout(&tag) {
                self.break_out_of_foreign_content();
            } else {
                let ns = self.current_namespace();
                self.insert_foreign_start_tag(&tag, ns, self_closing, pos);
                return;
            }
        }

        match name.as_str() {
            "html" => {
                if let Some(html) = self.html_element {
                    self.tree.add_attrs_if_missing(html, tag.attrs);
                }
                return;
            }
            "head" => {
                if let Some(head) = self.head_element {
                    self.tree.add_attrs_if_missing(head, tag.attrs);
                    return;
                }
            }
            "body" => {
                if let Some(body) = self.body_element {
                    self.tree.add_attrs_if_missing(body, tag.attrs);
                } else {
                    let id = self.insert_html_element(&tag);
                    self.body_element = Some(id);
                }
                self.frameset_ok = false;
                return;
            }
            "frameset" => {
                if self.frameset_ok {
                    if let Some(body) = self.body_element.take() {
                        self.tree.detach(body);
                        self.open_elements.retain(|&id| id != body);
                    }
                    self.insert_html_element(&tag);
                }
                return;
            }
            "svg" => {
                self.insert_foreign_start_tag(&tag, Namespace::Svg, self_closing, pos);
                return;
            }
            "math" => {
                self.insert_foreign_start_tag(&tag, Namespace::MathMl, self_closing, pos);
                return;
            }
            _ => {}
        }

        if tags::contains(tags::CLOSE_P_ON_START, &name) && self.in_scope("p") {
            self.close_p_element();
        }

        match name.as_str() {
            "li" => {
                self.pop_if_in_scope_stop_at(&["li"], &["address", "div", "p"]);
            }
            "dd" | "dt" => {
                self.pop_if_in_scope_stop_at(&["dd", "dt"], &["address", "div", "p"]);
            }
            "rb" | "rtc" => self.pop_until_named_if_present("ruby", &["rb", "rtc", "rt", "rp"]),
            "rt" | "rp" => self.pop_until_named_if_present("ruby", &["rb", "rt", "rp"]),
            "a" => {
                if let Some(idx) = self.active_formatting_position("a") {
                    if let FormatEntry::Element(id, _) = &self.active_formatting[idx] {
                        let id = *id;
                        self.run_formatting_end_tag_recovery("a", id);
                    }
                } else if self.current_node_named("div") || self.current_node_named("address") {
                    self.reparent_open_a_into_new_block();
                }
            }
            _ => {}
        }

        if name == "input" {
            let is_hidden = tag
                .attrs
                .iter()
                .any(|a| a.name.local == "type" && a.value.eq_ignore_ascii_case("hidden"));
            if !is_hidden {
                self.frameset_ok = false;
            }
        } else if !matches!(
            name.as_str(),
            "html" | "head" | "body" | "base" | "basefont" | "bgsound" | "link" | "meta"
                | "noframes" | "script" | "style" | "template" | "title"
        ) {
            self.frameset_ok = false;
        }

        // Rule 8: form/input-in-table.
        if name == "form" && self.current_node_named("table") {
            let id = self.make_element("form", Namespace::Html, tag.attrs.clone());
            self.tree.append(self.current_node(), id);
            if !self_closing {
                self.push(id);
            }
            return;
        }

        // Rule 9: select context pops.
        if matches!(
            name.as_str(),
            "option" | "optgroup" | "hr" | "input" | "keygen" | "textarea"
        ) && self.in_scope("select")
        {
            if self.current_node_named("option") {
                self.pop();
            }
            if name == "optgroup" && self.current_node_named("optgroup") {
                self.pop();
            }
        }
        if name == "select" && self.in_scope("select") {
            self.pop_until_named("select");
        }

        // Rule 4: td/th/tr synthetic ancestors.
        if matches!(name.as_str(), "td" | "th") && !self.in_scope_immediate_row() {
            self.synthesize_tbody_and_tr();
        } else if name == "tr" && !self.in_scope_immediate_section() {
            self.synthesize_tbody();
        }

        // Formatting elements get tracked in the active-formatting list.
        let is_formatting = tags::contains(tags::FORMATTING, &name);

        let void = tags::contains(tags::VOID_ELEMENTS, &name);
        let id = self.insert_html_element(&tag);
        if is_formatting {
            self.active_formatting.push(FormatEntry::Element(id, tag.clone()));
        }
        if void || self_closing {
            self.pop();
        }
        if self.track_locations {
            self.tree.set_position(
                id,
                Position {
                    offset: 0,
                    line: pos.line,
                    column: pos.column,
                },
            );
        }

        if name == "select" && self.current_node_named("button") {
            self.has_select_button = true;
        }
        if name == "button"
            && self
                .tree
                .children(self.current_node())
                .iter()
                .any(|&c| self.tree.is_element_named(c, "select"))
        {
            self.has_select_button = true;
        }
    }

    fn insert_foreign_start_tag(
        &mut self,
        tag: &OpenTag,
        ns: Namespace,
        self_closing: bool,
        _pos: SourcePosition,
    ) {
        let id = self.insert_foreign_element(tag, ns);
        if self_closing || tags::contains(tags::VOID_ELEMENTS, &tag.name) {
            self.pop();
        }
    }

    fn break_out_of_foreign_content(&mut self) {
        while self.open_elements.len() > 1 {
            if self.current_namespace() == Namespace::Html {
                break;
            }
            self.pop();
        }
    }

    fn at_integration_point(&self) -> bool {
        let current = self.current_node();
        match self.tree.element_name(current) {
            Some(name) if name.ns == Namespace::Svg => {
                matches!(name.local.as_str(), "foreignObject" | "desc" | "title")
            }
            Some(name) if name.ns == Namespace::MathMl => {
                matches!(name.local.as_str(), "mi" | "mo" | "mn" | "ms" | "mtext")
            }
            _ => false,
        }
    }

    fn process_end_tag(&mut self, name: String, pos: SourcePosition) {
        self.ensure_scaffolding();

        if self.current_namespace() != Namespace::Html && !self.at_integration_point() {
            if let Some(idx) = self.find_in_open(&name) {
                while self.open_elements.len() > idx + 1 {
                    self.pop();
                }
                self.pop();
                return;
            }
        }

        match name.as_str() {
            "br" => {
                // Synthesize a <br> even though this is an end tag.
                let id = self.make_element("br", Namespace::Html, vec![]);
                let parent = self.current_node();
                self.tree.append(parent, id);
                return;
            }
            "form" if self.find_in_open("form").is_none() => {
                return;
            }
            "body" | "html" => {
                self.after_body = true;
            }
            _ => {}
        }

        if tags::contains(tags::TABLE_SCOPE_END_TAGS, &name) && self.current_namespace() != Namespace::Html {
            return;
        }

        let idx = match self.find_in_open(&name) {
            Some(i) => i,
            None => {
                self.error(
                    "unexpected-end-tag",
                    format!("unexpected end tag </{}>", name),
                    pos,
                );
                return;
            }
        };

        // If foreign content is open above the match, pop down to it with
        // no further recovery (§4.3).
        let has_foreign_above = self.open_elements[idx + 1..]
            .iter()
            .any(|&id| self.tree.element_name(id).map(|n| !n.is_html()).unwrap_or(false));
        if has_foreign_above {
            while self.open_elements.len() > idx {
                self.pop();
            }
            return;
        }

        match name.as_str() {
            "p" => self.close_p_element(),
            "b" if self.current_node_named("aside") => self.hoist_trailing_aside(&name),
            _ if tags::contains(tags::FORMATTING, &name) => {
                let id = self.open_elements[idx];
                self.run_formatting_end_tag_recovery(&name, id);
            }
            _ => {
                while self.open_elements.len() > idx {
                    self.pop();
                }
                self.pop();
            }
        }
    }

    // ---- rule 7 / p handling -------------------------------------------------

    fn close_p_element(&mut self) {
        if !self.in_scope("p") {
            let tag = OpenTag {
                name: "p".into(),
                attrs: vec![],
            };
            self.insert_html_element(&tag);
        }
        let open_formatting: Vec<(NodeId, OpenTag)> = self
            .active_formatting_above_nearest("p")
            .into_iter()
            .collect();

        self.pop_until_named("p");

        for (_, tag) in open_formatting {
            let id = self.insert_html_element(&tag);
            self.active_formatting.push(FormatEntry::Element(id, tag));
        }
    }

    fn active_formatting_above_nearest(&self, _boundary: &str) -> Vec<(NodeId, OpenTag)> {
        // Formatting elements open between the current node and the nearest
        // enclosing `<p>` get cloned and reopened inside the new `<p>`
        // (§4.3 rule 7, the local adoption-agency substitute).
        let mut result = Vec::new();
        for &id in self.open_elements.iter().rev() {
            if self.tree.is_element_named(id, "p") {
                break;
            }
            if let Some(n) = self.tree.element_name(id) {
                if n.is_html() && tags::contains(tags::FORMATTING, &n.local) {
                    if let Some(FormatEntry::Element(_, tag)) = self
                        .active_formatting
                        .iter()
                        .rev()
                        .find(|e| matches!(e, FormatEntry::Element(eid, _) if *eid == id))
                    {
                        result.push((id, tag.clone()));
                    }
                }
            }
        }
        result.reverse();
        result
    }

    // ---- formatting recoveries (§4.3 end-tag handling, §9) -------------------

    fn active_formatting_position(&self, name: &str) -> Option<usize> {
        self.active_formatting.iter().rposition(|e| {
            matches!(e, FormatEntry::Element(id, _) if self.tree.is_element_named(*id, name))
        })
    }

    /// Runs the two bespoke recoveries documented in §4.3/§9:
    /// `tryFormattingSplitRecovery` then `tryMisnestedFormattingRecovery`.
    fn run_formatting_end_tag_recovery(&mut self, name: &str, formatting_id: NodeId) {
        let stack_idx = match self.open_elements.iter().position(|&id| id == formatting_id) {
            Some(i) => i,
            None => {
                self.remove_from_active_formatting(formatting_id);
                return;
            }
        };

        let above: Vec<NodeId> = self.open_elements[stack_idx + 1..].to_vec();
        let all_formatting = above.iter().all(|&id| {
            self.tree
                .element_name(id)
                .map(|n| n.is_html() && tags::contains(tags::FORMATTING, &n.local))
                .unwrap_or(false)
        });

        if all_formatting {
            self.try_formatting_split_recovery(formatting_id, stack_idx, &above);
        } else {
            self.try_misnested_formatting_recovery(name, formatting_id, stack_idx, &above);
        }
    }

    /// All open elements above the formatting element are themselves
    /// formatting elements: clone each in order as next-sibling chains
    /// after the formatting element, then pop everything from the
    /// formatting element upward.
    fn try_formatting_split_recovery(
        &mut self,
        formatting_id: NodeId,
        stack_idx: usize,
        above: &[NodeId],
    ) {
        if let Some(parent) = self.tree.parent(formatting_id) {
            let mut insertion_anchor = formatting_id;
            for &el in above {
                let element = match &self.tree.node(el).data {
                    NodeData::Element { name, attrs, .. } => Some((name.clone(), attrs.clone())),
                    _ => None,
                };
                if let Some((name, attrs)) = element {
                    let local = name.local.clone();
                    let clone = self.tree.create_element(name, attrs, false);
                    self.insert_after(parent, insertion_anchor, clone);
                    self.active_formatting.push(FormatEntry::Element(
                        clone,
                        OpenTag {
                            name: local,
                            attrs: vec![],
                        },
                    ));
                    insertion_anchor = clone;
                }
            }
        }

        self.remove_from_active_formatting(formatting_id);
        while self.open_elements.len() > stack_idx {
            self.pop();
        }
    }

    /// Some non-formatting element is open above the formatting element:
    /// relocate it to be the formatting element's next sibling, wrap its
    /// leading inline children in a clone of the formatting element, and
    /// (for `<a>`) sprinkle a wrapper into block descendants.
    fn try_misnested_formatting_recovery(
        &mut self,
        name: &str,
        formatting_id: NodeId,
        stack_idx: usize,
        above: &[NodeId],
    ) {
        let pivot = match above
            .iter()
            .find(|&&id| !self.is_formatting_element(id))
            .copied()
        {
            Some(p) => p,
            None => {
                while self.open_elements.len() > stack_idx {
                    self.pop();
                }
                self.remove_from_active_formatting(formatting_id);
                return;
            }
        };

        if let Some(parent) = self.tree.parent(formatting_id) {
            self.tree.detach(pivot);
            self.insert_after(parent, formatting_id, pivot);

            let wrapper_name = self.tree.element_name(formatting_id).cloned();
            if let Some(wname) = wrapper_name {
                let wrapper = self.tree.create_element(wname, vec![], false);
                let children: Vec<NodeId> = self.tree.children(pivot).to_vec();
                self.tree.append(pivot, wrapper);
                for child in children {
                    self.tree.detach(child);
                    self.tree.append(wrapper, child);
                }

                if name == "a" {
                    self.sprinkle_formatting_into_blocks(pivot, &self.tree.element_name(formatting_id).cloned());
                }
            }
        }

        self.remove_from_active_formatting(formatting_id);
        while self.open_elements.len() > stack_idx {
            self.pop();
        }
    }

    fn sprinkle_formatting_into_blocks(&mut self, pivot: NodeId, wrapper_name: &Option<QualName>) {
        let wrapper_name = match wrapper_name {
            Some(n) => n.clone(),
            None => return,
        };
        let children: Vec<NodeId> = self.tree.children(pivot).to_vec();
        for child in children {
            let is_block = self
                .tree
                .element_name(child)
                .map(|n| n.is_html() && tags::contains(tags::CLOSE_P_ON_START, &n.local))
                .unwrap_or(false);
            if is_block {
                let wrapper = self.tree.create_element(wrapper_name.clone(), vec![], false);
                let grandchildren: Vec<NodeId> = self.tree.children(child).to_vec();
                self.tree.append(child, wrapper);
                for gc in grandchildren {
                    self.tree.detach(gc);
                    self.tree.append(wrapper, gc);
                }
            }
        }
    }

    fn is_formatting_element(&self, id: NodeId) -> bool {
        self.tree
            .element_name(id)
            .map(|n| n.is_html() && tags::contains(tags::FORMATTING, &n.local))
            .unwrap_or(false)
    }

    fn insert_after(&mut self, parent: NodeId, anchor: NodeId, node: NodeId) {
        let siblings = self.tree.children(parent).to_vec();
        if let Some(idx) = siblings.iter().position(|&s| s == anchor) {
            if idx + 1 < siblings.len() {
                self.tree.insert_before(siblings[idx + 1], node);
                return;
            }
        }
        self.tree.append(parent, node);
    }

    fn remove_from_active_formatting(&mut self, id: NodeId) {
        self.active_formatting
            .retain(|e| !matches!(e, FormatEntry::Element(eid, _) if *eid == id));
    }

    /// `</b>` with an immediate `<aside>` on top: hoist the aside out from
    /// under the formatting and wrap its first child in a fresh `<b>`.
    /// Narrow heuristic; see DESIGN.md / spec §9 open question.
    fn hoist_trailing_aside(&mut self, formatting_name: &str) {
        let aside = self.pop();
        if let Some(formatting_id) = self.find_in_open(formatting_name).map(|i| self.open_elements[i]) {
            if let Some(parent) = self.tree.parent(formatting_id) {
                self.tree.detach(aside);
                self.insert_after(parent, formatting_id, aside);
                if let Some(&first_child) = self.tree.children(aside).first() {
                    if let Some(wname) = self.tree.element_name(formatting_id).cloned() {
                        let wrapper = self.tree.create_element(wname, vec![], false);
                        self.tree.insert_before(first_child, wrapper);
                        self.tree.detach(first_child);
                        self.tree.append(wrapper, first_child);
                    }
                }
            }
        }
    }

    // ---- li/dd/dt/ruby helpers (rule 5) ---------------------------------------

    fn pop_if_in_scope_stop_at(&mut self, targets: &[&str], stop_at: &[&str]) {
        for &id in self.open_elements.iter().rev() {
            if let Some(name) = self.tree.element_name(id) {
                if !name.is_html() {
                    return;
                }
                if targets.contains(&name.local.as_str()) {
                    self.pop_until_named(&name.local.clone());
                    return;
                }
                if stop_at.contains(&name.local.as_str()) {
                    return;
                }
            }
        }
    }

    fn pop_until_named_if_present(&mut self, boundary: &str, targets: &[&str]) {
        for &id in self.open_elements.iter().rev() {
            if let Some(name) = self.tree.element_name(id) {
                if name.local == boundary {
                    return;
                }
                if targets.contains(&name.local.as_str()) {
                    self.pop_until_named(&name.local.clone());
                    return;
                }
            }
        }
    }

    // ---- rule 6 (<a> reparent) -------------------------------------------------

    fn reparent_open_a_into_new_block(&mut self) {
        if let Some(idx) = self.find_in_open("a") {
            let a = self.open_elements[idx];
            let block = self.current_node();
            self.tree.detach(a);
            while self.open_elements.len() > idx {
                self.pop();
            }
            let id = self.tree.clone_node(a, false);
            self.tree.append(block, id);
            self.push(id);
            self.remove_from_active_formatting(a);
            if let Some(name) = self.tree.element_name(id) {
                self.active_formatting.push(FormatEntry::Element(
                    id,
                    OpenTag {
                        name: name.local.clone(),
                        attrs: vec![],
                    },
                ));
            }
        }
    }

    // ---- rule 4 (table row/section synthesis) ----------------------------------

    fn in_scope_immediate_row(&self) -> bool {
        self.open_elements
            .iter()
            .rev()
            .take_while(|&&id| {
                self.tree
                    .element_name(id)
                    .map(|n| tags::contains(tags::TABLE_SECTION, &n.local) || n.local == "tr")
                    .unwrap_or(true)
            })
            .any(|&id| self.tree.is_element_named(id, "tr"))
    }

    fn in_scope_immediate_section(&self) -> bool {
        self.open_elements
            .iter()
            .rev()
            .take_while(|&&id| {
                self.tree
                    .element_name(id)
                    .map(|n| tags::contains(tags::TABLE_SECTION, &n.local) || n.local == "table")
                    .unwrap_or(true)
            })
            .any(|&id| {
                self.tree
                    .element_name(id)
                    .map(|n| tags::contains(tags::TABLE_SECTION, &n.local))
                    .unwrap_or(false)
            })
    }

    fn synthesize_tbody_and_tr(&mut self) {
        if !self.current_node_named("table") {
            return;
        }
        let tbody_tag = OpenTag {
            name: "tbody".into(),
            attrs: vec![],
        };
        self.insert_html_element(&tbody_tag);
        let tr_tag = OpenTag {
            name: "tr".into(),
            attrs: vec![],
        };
        self.insert_html_element(&tr_tag);
    }

    fn synthesize_tbody(&mut self) {
        if !self.current_node_named("table") {
            return;
        }
        let tbody_tag = OpenTag {
            name: "tbody".into(),
            attrs: vec![],
        };
        self.insert_html_element(&tbody_tag);
    }

    // ---- termination (§4.3) ----------------------------------------------------

    pub fn finish(&mut self, pos: SourcePosition) {
        if self.collect_errors && self.open_elements.len() > 1 {
            let unclosed: Vec<String> = self
                .open_elements
                .iter()
                .skip(1)
                .filter_map(|&id| self.tree.element_name(id).map(|n| n.local.clone()))
                .collect();
            if !unclosed.is_empty() {
                self.error(
                    "expected-closing-tag-but-got-eof",
                    format!("unclosed elements at end of file: {}", unclosed.join(", ")),
                    pos,
                );
            }
        }
        self.ensure_scaffolding();
        self.populate_selected_content();
    }

    /// Fills `<selectedcontent>` inside `<select><button>` with a deep
    /// clone of the selected option's children (first selected, or first
    /// option) — §4.3's final post-pass.
    fn populate_selected_content(&mut self) {
        if !self.has_select_button {
            return;
        }
        let roots: Vec<NodeId> = self.html_element.into_iter().collect();
        for root in roots {
            self.populate_selected_content_in(root);
        }
    }

    fn populate_selected_content_in(&mut self, node: NodeId) {
        if self.tree.is_element_named(node, "select") {
            let children = self.tree.children(node).to_vec();
            let button = children.iter().copied().find(|&c| self.tree.is_element_named(c, "button"));
            let options: Vec<NodeId> = children
                .iter()
                .copied()
                .filter(|&c| self.tree.is_element_named(c, "option"))
                .collect();
            let selected = options
                .iter()
                .copied()
                .find(|&o| {
                    matches!(&self.tree.node(o).data, NodeData::Element { attrs, .. } if attrs.iter().any(|a| a.name.local == "selected"))
                })
                .or_else(|| options.first().copied());

            if let (Some(button), Some(selected)) = (button, selected) {
                let target = self
                    .tree
                    .children(button)
                    .iter()
                    .copied()
                    .find(|&c| self.tree.is_element_named(c, "selectedcontent"));
                if let Some(target) = target {
                    let source_children = self.tree.children(selected).to_vec();
                    for child in source_children {
                        let clone = self.tree.clone_node(child, true);
                        self.tree.append(target, clone);
                    }
                }
            }
        }
        let children = self.tree.children(node).to_vec();
        for child in children {
            self.populate_selected_content_in(child);
        }
    }
}

enum Parent {
    Direct(NodeId),
    FosterBeforeTable(NodeId),
}

fn initial_fragment_namespace(ctx: &FragmentContext) -> Namespace {
    match ctx.namespace {
        Namespace::Svg if matches!(ctx.name.as_str(), "foreignObject" | "desc" | "title") => {
            Namespace::Html
        }
        Namespace::MathMl if matches!(ctx.name.as_str(), "mi" | "mo" | "mn" | "ms" | "mtext") => {
            Namespace::Html
        }
        ns => ns,
    }
}

fn is_font_breakout(tag: &OpenTag) -> bool {
    tag.name == "font"
        && tag
            .attrs
            .iter()
            .any(|a| matches!(a.name.local.as_str(), "color" | "face" | "size"))
}

/// https://html.spec.whatwg.org/#concept-document-quirks — simplified to
/// the cases spec.md's scenarios exercise: absent-or-`html` doctype is
/// `NoQuirks`; anything else present is `Quirks`.
fn classify_quirks(name: &str, public_id: Option<&str>, system_id: Option<&str>) -> QuirksMode {
    if name.eq_ignore_ascii_case("html") && public_id.is_none() && system_id.is_none() {
        QuirksMode::NoQuirks
    } else if public_id
        .map(|p| p.to_ascii_lowercase().starts_with("-//w3c//dtd html 4.01//"))
        .unwrap_or(false)
    {
        QuirksMode::LimitedQuirks
    } else {
        QuirksMode::NoQuirks
    }
}

fn strip_nul(s: &str) -> String {
    s.chars().filter(|&c| c != '\0').collect()
}

fn replace_nul_with_fffd(s: &str) -> String {
    s.chars().map(|c| if c == '\0' { '\u{FFFD}' } else { c }).collect()
}

fn split_leading_whitespace(s: &str) -> (String, String) {
    let idx = s.find(|c: char| !c.is_whitespace()).unwrap_or(s.len());
    (s[..idx].to_string(), s[idx..].to_string())
}

fn strip_leading_pre_newline(pre: NodeId, text: &str, tree: &Tree) -> String {
    if tree.children(pre).is_empty() {
        if let Some(rest) = text.strip_prefix('\n') {
            return rest.to_string();
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Tokenizer;

    fn build(input: &str) -> TreeBuilder {
        let mut tokenizer = Tokenizer::new(input);
        let mut builder = TreeBuilder::new_document();
        let mut pos = SourcePosition { line: 1, column: 1 };
        while let Some(pt) = tokenizer.next_token() {
            pos = pt.pos;
            builder.process(pt);
        }
        builder.finish(pos);
        builder
    }

    fn child_names(tree: &Tree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .iter()
            .map(|&c| tree.node(c).data.semantic_name())
            .collect()
    }

    #[test]
    fn scaffolding_created_for_bare_paragraph() {
        let b = build("<p>Hello");
        let html = b.html_element.unwrap();
        assert_eq!(child_names(&b.tree, html), vec!["head", "body"]);
        let body = b.body_element.unwrap();
        assert_eq!(child_names(&b.tree, body), vec!["p"]);
    }

    #[test]
    fn table_td_synthesizes_tbody_and_tr() {
        let b = build("<table><td>x</table>");
        let body = b.body_element.unwrap();
        let table = b.tree.children(body)[0];
        assert!(b.tree.is_element_named(table, "table"));
        let tbody = b.tree.children(table)[0];
        assert!(b.tree.is_element_named(tbody, "tbody"));
        let tr = b.tree.children(tbody)[0];
        assert!(b.tree.is_element_named(tr, "tr"));
        let td = b.tree.children(tr)[0];
        assert!(b.tree.is_element_named(td, "td"));
    }

    #[test]
    fn br_end_tag_synthesizes_br() {
        let b = build("<p></br></p>");
        let body = b.body_element.unwrap();
        let p = b.tree.children(body)[0];
        assert!(b.tree.is_element_named(p, "p"));
        let br = b.tree.children(p)[0];
        assert!(b.tree.is_element_named(br, "br"));
    }

    #[test]
    fn form_end_tag_without_open_form_is_silent() {
        let b = build("</form><p>ok</p>");
        let body = b.body_element.unwrap();
        assert_eq!(child_names(&b.tree, body), vec!["p"]);
    }

    #[test]
    fn unexpected_end_tag_is_recorded_when_collecting_errors() {
        let mut tokenizer = Tokenizer::new("</bogus>");
        let mut builder = TreeBuilder::new_document();
        builder.collect_errors = true;
        let mut pos = SourcePosition { line: 1, column: 1 };
        while let Some(pt) = tokenizer.next_token() {
            pos = pt.pos;
            builder.process(pt);
        }
        builder.finish(pos);
        assert!(builder.errors.iter().any(|e| e.code == "unexpected-end-tag"));
    }

    #[test]
    fn svg_breakout_on_b() {
        let b = build("<svg><g><b>hi</b></g></svg>");
        let body = b.body_element.unwrap();
        let names = child_names(&b.tree, body);
        assert!(names.contains(&"svg".to_string()));
        assert!(names.contains(&"b".to_string()));
    }
}
