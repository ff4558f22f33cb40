//! html5weaver: an HTML5 parser producing a document tree compatible with
//! the HTML5 tree-construction algorithm, plus a tokenizer event stream and
//! a pair of serialisers (§1).
//!
//! The public facade (§6) wires the decoder, tokenizer and tree builder
//! together: [`parse`] and [`parse_fragment`] drive the full pipeline to a
//! [`Parsed`] tree; [`stream`] drives only the tokenizer.

mod atom;
mod decode;
mod entities;
mod errors;
mod node;
mod sanitize;
mod select;
mod serialize;
mod tokenizer;
pub mod tree_builder;

pub use atom::{Attribute, Namespace, QualName};
pub use errors::{Error, ErrorCategory, ParseError, Result, SourcePosition};
pub use node::{NodeData, NodeId, Tree};
pub use select::{query, query_one, Selector};
pub use tokenizer::{StreamEvent, Token, TokenStream};
pub use tree_builder::{FragmentContext, QuirksMode};

use tree_builder::TreeBuilder;

/// Options controlling a [`parse`]/[`parse_fragment`] run (§6).
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Parse as a fragment rather than a full document. Implied by
    /// `parse_fragment`; has no effect on `parse`.
    pub fragment: bool,
    /// Context element for fragment parsing; defaults to an HTML `<div>`
    /// when fragment mode is requested without one.
    pub fragment_context: Option<FragmentContext>,
    pub collect_errors: bool,
    /// Implies `collect_errors`; on any error, abort with a strict-mode
    /// error wrapping the first by source order.
    pub strict: bool,
    pub track_node_locations: bool,
    /// Transport-supplied encoding label, consulted by [`parse_bytes`] and
    /// [`parse_fragment_bytes`] before BOM/`<meta charset>` sniffing.
    pub encoding: Option<String>,
    pub sanitize: Option<bool>,
    pub safe: Option<bool>,
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    fn effective_collect_errors(&self) -> bool {
        self.collect_errors || self.strict
    }
}

/// The result of a parse: the resulting tree, its ordered error list, the
/// encoding used for byte input (if any), and convenience methods that
/// delegate to the serialiser and selector collaborators (§6 `Parsed`).
pub struct Parsed {
    pub tree: Tree,
    pub root: NodeId,
    pub errors: Vec<ParseError>,
    pub encoding: Option<&'static str>,
    pub quirks_mode: QuirksMode,
}

impl Parsed {
    pub fn query(&self, selector: &str) -> Vec<NodeId> {
        select::query(&self.tree, self.root, &Selector::parse(selector))
    }

    pub fn query_one(&self, selector: &str) -> Option<NodeId> {
        select::query_one(&self.tree, self.root, &Selector::parse(selector))
    }

    pub fn to_html(&self) -> String {
        serialize::to_html(&self.tree, self.root)
    }

    pub fn to_text(&self) -> String {
        serialize::to_text(&self.tree, self.root)
    }

    pub fn to_test_format(&self) -> String {
        serialize::to_test_format(&self.tree, self.root)
    }
}

/// Parses `input` as a full document (§6 `parse`).
pub fn parse(input: &str, options: &Options) -> Result<Parsed> {
    run(input, None, options, None)
}

/// Parses `input` as a fragment (§6 `parseFragment`). `context` overrides
/// `options.fragment_context`, matching the "context is either a record, or
/// merged into options" phrasing; when neither is given, the default HTML
/// `<div>` context applies.
pub fn parse_fragment(
    input: &str,
    context: Option<FragmentContext>,
    options: &Options,
) -> Result<Parsed> {
    let ctx = resolve_fragment_context(context, options);
    run(input, Some(ctx), options, None)
}

/// Decodes `bytes` (§1 decoder collaborator: BOM → transport label →
/// `<meta charset>` sniff → `windows-1252` fallback) and parses the result
/// as a full document, populating `Parsed.encoding`.
pub fn parse_bytes(bytes: &[u8], options: &Options) -> Result<Parsed> {
    let decoded = decode::decode(bytes, options.encoding.as_deref());
    run(&decoded.text, None, options, Some(decoded.encoding))
}

/// The byte-input counterpart of [`parse_fragment`].
pub fn parse_fragment_bytes(
    bytes: &[u8],
    context: Option<FragmentContext>,
    options: &Options,
) -> Result<Parsed> {
    let decoded = decode::decode(bytes, options.encoding.as_deref());
    let ctx = resolve_fragment_context(context, options);
    run(&decoded.text, Some(ctx), options, Some(decoded.encoding))
}

fn resolve_fragment_context(
    context: Option<FragmentContext>,
    options: &Options,
) -> FragmentContext {
    context
        .or_else(|| options.fragment_context.clone())
        .unwrap_or_else(|| FragmentContext {
            name: "div".to_string(),
            namespace: Namespace::Html,
        })
}

/// Drives only the tokenizer, yielding the coalesced event stream of §6
/// `stream()`.
pub fn stream(input: &str) -> TokenStream {
    TokenStream::new(input)
}

fn run(
    input: &str,
    fragment: Option<FragmentContext>,
    options: &Options,
    encoding: Option<&'static str>,
) -> Result<Parsed> {
    sanitize::resolve(options.sanitize, options.safe)?;

    let collect_errors = options.effective_collect_errors();
    let mut tok = tokenizer::Tokenizer::new(input);
    tok.collect_errors = collect_errors;

    let mut builder = match fragment {
        Some(ctx) => TreeBuilder::new_fragment(ctx),
        None => TreeBuilder::new_document(),
    };
    builder.collect_errors = collect_errors;
    builder.track_locations = options.track_node_locations;

    let mut last_pos = SourcePosition { line: 1, column: 1 };
    while let Some(pt) = tok.next_token() {
        last_pos = pt.pos;
        builder.process(pt);
    }
    builder.finish(last_pos);

    let mut errors = tok.errors;
    errors.append(&mut builder.errors);
    errors.sort_by(errors::order);

    if options.strict {
        if let Some(first) = errors.into_iter().next() {
            return Err(Error::Strict(Box::new(first)));
        }
    }

    log::debug!(
        "parsed {} bytes into a tree rooted at {:?}",
        input.len(),
        builder.tree.root
    );

    Ok(Parsed {
        quirks_mode: builder.quirks_mode(),
        root: builder.tree.root,
        tree: builder.tree,
        errors,
        encoding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_scenario_1_doctype_and_paragraph() {
        let parsed = parse(
            "<!doctype html><html><body><p>Hello</p></body></html>",
            &Options::new(),
        )
        .unwrap();
        let rendered = parsed.to_test_format();
        assert!(rendered.contains("<!DOCTYPE html>"));
        assert!(rendered.contains("\"Hello\""));
    }

    #[test]
    fn end_to_end_scenario_2_bare_paragraph_gets_scaffolding() {
        let parsed = parse("<p>Hello", &Options::new()).unwrap();
        let rendered = parsed.to_test_format();
        assert!(rendered.starts_with("<html>\n  <head>\n  <body>\n"));
    }

    #[test]
    fn end_to_end_scenario_3_table_td_synthesizes_tbody_tr() {
        let parsed = parse("<table><td>x</table>", &Options::new()).unwrap();
        let rendered = parsed.to_test_format();
        assert!(rendered.contains("<tbody>"));
        assert!(rendered.contains("<tr>"));
        assert!(rendered.contains("<td>"));
    }

    #[test]
    fn strict_mode_aborts_on_first_error() {
        let mut options = Options::new();
        options.strict = true;
        let result = parse("</unopened>", &options);
        assert!(result.is_err());
    }

    #[test]
    fn query_finds_elements_by_tag() {
        let parsed = parse("<div><p>a</p><p>b</p></div>", &Options::new()).unwrap();
        assert_eq!(parsed.query("p").len(), 2);
    }

    #[test]
    fn round_trip_through_to_html() {
        let parsed = parse("<p>Hello</p>", &Options::new()).unwrap();
        let html = parsed.to_html();
        let reparsed = parse(&html, &Options::new()).unwrap();
        assert_eq!(parsed.to_test_format(), reparsed.to_test_format());
    }

    #[test]
    fn fragment_parsing_skips_scaffolding() {
        let parsed = parse_fragment("<p>Hi</p>", None, &Options::new()).unwrap();
        let rendered = parsed.to_test_format();
        assert!(!rendered.contains("<html>"));
        assert!(rendered.contains("<p>"));
    }

    #[test]
    fn parse_bytes_sniffs_meta_charset() {
        let html = br#"<meta charset="utf-8"><p>ok</p>"#;
        let parsed = parse_bytes(html, &Options::new()).unwrap();
        assert_eq!(parsed.encoding, Some("utf-8"));
        assert!(parsed.to_test_format().contains("\"ok\""));
    }

    #[test]
    fn stream_coalesces_adjacent_text() {
        let events: Vec<_> = stream("a<b>bold</b>c").collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Text("a".into()),
                StreamEvent::Start {
                    name: "b".into(),
                    attrs: vec![]
                },
                StreamEvent::Text("bold".into()),
                StreamEvent::End { name: "b".into() },
                StreamEvent::Text("c".into()),
            ]
        );
    }
}
