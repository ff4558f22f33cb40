//! Serialisers (§6 "External interfaces": HTML round-trip and the
//! fixture-compatible test format), grounded on the teacher lineage's
//! `HtmlSerializer`
//! (`examples/other_examples/41e1fc50_devongovett-parcel__crates-html-src-serialize.rs.rs`),
//! simplified to always emit full start/end tag pairs rather than omitting
//! optional tags — the round-trip law in §8 only needs a faithful
//! re-parse, not minimal output.

use crate::atom::Namespace;
use crate::node::{NodeData, NodeId, Tree};
use crate::tree_builder::tags;

/// Renders `node` and its subtree back to HTML text (§8's round-trip law:
/// `parse(to_html(parse(d).root)).root` is structurally equal to
/// `parse(d).root` for HTML-only documents).
pub fn to_html(tree: &Tree, node: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, node, &mut out);
    out
}

/// Concatenation of every text node under `node`, in document order (§6
/// `toText`).
pub fn to_text(tree: &Tree, node: NodeId) -> String {
    let mut out = String::new();
    write_text(tree, node, &mut out);
    out
}

fn write_text(tree: &Tree, node: NodeId, out: &mut String) {
    if let NodeData::Text { data } = &tree.node(node).data {
        out.push_str(data);
    }
    for &child in tree.children(node) {
        write_text(tree, child, out);
    }
}

fn write_node(tree: &Tree, node: NodeId, out: &mut String) {
    match &tree.node(node).data {
        NodeData::Document | NodeData::DocumentFragment => {
            for &child in tree.children(node) {
                write_node(tree, child, out);
            }
        }
        NodeData::Doctype { name, public_id, system_id } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            if !public_id.is_empty() || !system_id.is_empty() {
                out.push_str(&format!(" PUBLIC \"{}\" \"{}\"", public_id, system_id));
            }
            out.push('>');
        }
        NodeData::Comment { data } => {
            out.push_str("<!--");
            out.push_str(data);
            out.push_str("-->");
        }
        NodeData::Text { data } => {
            escape_text(data, out);
        }
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let local = name.local.clone();
            out.push('<');
            out.push_str(&local);
            for attr in attrs {
                out.push(' ');
                out.push_str(&attr.name.local);
                if !attr.value.is_empty() {
                    out.push_str("=\"");
                    escape_attr(&attr.value, out);
                    out.push('"');
                }
            }

            let is_void = name.is_html() && tags::contains(tags::VOID_ELEMENTS, &local);
            let self_closes_foreign =
                !name.is_html() && tree.children(node).is_empty() && template_contents.is_none();

            if is_void {
                out.push('>');
                return;
            }
            if self_closes_foreign {
                out.push_str(" />");
                return;
            }
            out.push('>');

            let raw_text_no_escape = name.is_html()
                && matches!(local.as_str(), "script" | "style" | "xmp" | "iframe" | "noembed" | "noframes" | "plaintext");

            if raw_text_no_escape {
                for &child in tree.children(node) {
                    if let NodeData::Text { data } = &tree.node(child).data {
                        out.push_str(data);
                    }
                }
            } else {
                for &child in tree.children(node) {
                    write_node(tree, child, out);
                }
                if let Some(contents) = template_contents {
                    for &child in tree.children(*contents) {
                        write_node(tree, child, out);
                    }
                }
            }

            out.push_str("</");
            out.push_str(&local);
            out.push('>');
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

/// The fixture-comparison format of §6: one line per node, two-space
/// indent per depth, attributes sorted by key, `xml:*`/`xlink:*` attribute
/// names flattened, non-HTML tags prefixed with their namespace.
pub fn to_test_format(tree: &Tree, root: NodeId) -> String {
    let mut out = String::new();
    for &child in tree.children(root) {
        write_test_node(tree, child, 0, &mut out);
    }
    out
}

fn write_test_node(tree: &Tree, node: NodeId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match &tree.node(node).data {
        NodeData::Doctype { name, public_id, system_id } => {
            out.push_str(&indent);
            if public_id.is_empty() && system_id.is_empty() {
                out.push_str(&format!("<!DOCTYPE {}>\n", name));
            } else {
                out.push_str(&format!("<!DOCTYPE {} \"{}\" \"{}\">\n", name, public_id, system_id));
            }
        }
        NodeData::Comment { data } => {
            out.push_str(&indent);
            out.push_str(&format!("<!-- {} -->\n", data));
        }
        NodeData::Text { data } => {
            out.push_str(&indent);
            out.push_str(&format!("\"{}\"\n", data));
        }
        NodeData::Element { name, attrs, .. } => {
            out.push_str(&indent);
            if name.ns == Namespace::Html {
                out.push_str(&format!("<{}>\n", name.local));
            } else {
                out.push_str(&format!("<{} {}>\n", name.ns, name.local));
            }
            let mut sorted: Vec<_> = attrs.iter().collect();
            sorted.sort_by(|a, b| a.name.local.cmp(&b.name.local));
            for attr in sorted {
                let key = flatten_attr_name(&attr.name.local, name.ns);
                out.push_str(&"  ".repeat(depth + 1));
                out.push_str(&format!("{}=\"{}\"\n", key, attr.value));
            }
            for &child in tree.children(node) {
                write_test_node(tree, child, depth + 1, out);
            }
        }
        NodeData::Document | NodeData::DocumentFragment => {
            for &child in tree.children(node) {
                write_test_node(tree, child, depth, out);
            }
        }
    }
}

/// `xml:lang` / `xlink:href`-style flattening for foreign-content
/// attributes, the way §6 describes ("`xml:*` and `xlink:*` keys
/// flattened to `xml lang` / `xlink href` forms").
fn flatten_attr_name(local: &str, ns: Namespace) -> String {
    if ns == Namespace::Html {
        return local.to_string();
    }
    if let Some(rest) = local.strip_prefix("xlink") {
        if !rest.is_empty() {
            return format!("xlink {}", lower_first(rest));
        }
    }
    if let Some(rest) = local.strip_prefix("xml") {
        if !rest.is_empty() && rest != "ns" {
            return format!("xml {}", lower_first(rest));
        }
    }
    local.to_string()
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::QualName;

    #[test]
    fn round_trip_simple_document() {
        let mut tree = Tree::new_document();
        let html = tree.create_element(QualName::html("html"), vec![], false);
        tree.append(tree.root, html);
        let body = tree.create_element(QualName::html("body"), vec![], false);
        tree.append(html, body);
        let p = tree.create_element(QualName::html("p"), vec![], false);
        tree.append(body, p);
        let text = tree.create_text("Hello".into());
        tree.append(p, text);

        let html_out = to_html(&tree, tree.root);
        assert_eq!(html_out, "<html><body><p>Hello</p></body></html>");
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let mut tree = Tree::new_document();
        let br = tree.create_element(QualName::html("br"), vec![], false);
        tree.append(tree.root, br);
        assert_eq!(to_html(&tree, tree.root), "<br>");
    }

    #[test]
    fn test_format_indents_by_depth() {
        let mut tree = Tree::new_document();
        let html = tree.create_element(QualName::html("html"), vec![], false);
        tree.append(tree.root, html);
        let body = tree.create_element(QualName::html("body"), vec![], false);
        tree.append(html, body);

        let rendered = to_test_format(&tree, tree.root);
        assert_eq!(rendered, "<html>\n  <body>\n");
    }
}
