//! End-to-end tree-construction scenarios, literally transcribed from the
//! numbered cases in the tree-construction specification (§8 end-to-end
//! scenarios) plus the boundary behaviors it calls out.

use html5weaver::{parse, parse_fragment, Namespace, Options};

fn format(input: &str) -> String {
    parse(input, &Options::new()).unwrap().to_test_format()
}

#[test]
fn scenario_1_doctype_html_body_paragraph() {
    let out = format("<!doctype html><html><body><p>Hello</p></body></html>");
    assert_eq!(
        out,
        "<!DOCTYPE html>\n\
         <html>\n\
         \u{20}\u{20}<head>\n\
         \u{20}\u{20}<body>\n\
         \u{20}\u{20}\u{20}\u{20}<p>\n\
         \u{20}\u{20}\u{20}\u{20}\u{20}\u{20}\"Hello\"\n"
    );
}

#[test]
fn scenario_2_bare_paragraph_gets_scaffolding() {
    let out = format("<p>Hello");
    assert!(out.starts_with("<html>\n  <head>\n  <body>\n    <p>\n      \"Hello\"\n"));
}

#[test]
fn scenario_3_table_td_synthesizes_tbody_and_tr() {
    let out = format("<table><td>x</table>");
    let tbody_idx = out.find("<tbody>").expect("tbody");
    let tr_idx = out.find("<tr>").expect("tr");
    let td_idx = out.find("<td>").expect("td");
    assert!(tbody_idx < tr_idx && tr_idx < td_idx);
    assert!(out.contains("\"x\""));
}

#[test]
fn scenario_4_paragraph_nests_inside_open_formatting() {
    // No <p> is open when the first <p> tag arrives, so it nests inside the
    // still-open <b> rather than closing it (the formatting-reopen rule
    // only fires for a second <p> while one is already in scope). The
    // closing </b> then runs the split recovery with nothing above it,
    // which is just an ordinary pop.
    let parsed = parse("<b>1<p>2</p>3</b>", &Options::new()).unwrap();
    assert_eq!(parsed.to_text(), "123");
    assert_eq!(parsed.query("b").len(), 1);
    assert_eq!(parsed.query("p").len(), 1);
    assert_eq!(parsed.query("b p").len(), 1);
}

#[test]
fn scenario_5_svg_breaks_out_on_b() {
    let parsed = parse("<svg><g><b>hi</b></g></svg>", &Options::new()).unwrap();
    let out = parsed.to_test_format();
    assert!(out.contains("<svg svg>"));
    assert!(out.contains("<svg g>"));
    // The breakout <b> is HTML-namespace, so it's unprefixed.
    assert!(out.contains("<b>"));
    assert!(out.contains("\"hi\""));
}

#[test]
fn scenario_6_entity_greediness() {
    let parsed = parse("<p>&amp;&notin;</p>", &Options::new()).unwrap();
    assert_eq!(parsed.to_text(), "&\u{2209}");
}

#[test]
fn empty_input_produces_scaffolding_only() {
    let out = format("");
    assert_eq!(out, "<html>\n  <head>\n  <body>\n");
}

#[test]
fn input_with_no_markup_is_one_text_node() {
    let parsed = parse("just text", &Options::new()).unwrap();
    assert_eq!(parsed.to_text(), "just text");
}

#[test]
fn unterminated_comment_is_recorded_with_collect_errors() {
    let mut options = Options::new();
    options.collect_errors = true;
    let parsed = parse("<!--oops", &options).unwrap();
    assert!(parsed.errors.iter().any(|e| e.code == "eof-in-comment"));
}

#[test]
fn unterminated_doctype_is_recorded() {
    let mut options = Options::new();
    options.collect_errors = true;
    let parsed = parse("<!doctype html", &options).unwrap();
    assert!(parsed.errors.iter().any(|e| e.code == "eof-in-doctype"));
}

#[test]
fn cdata_outside_foreign_content_becomes_bogus_comment() {
    let out = format("<![CDATA[hi]]>");
    assert!(!out.contains("\"hi\""));
}

#[test]
fn cdata_inside_svg_becomes_text() {
    let parsed = parse("<svg><![CDATA[hi]]></svg>", &Options::new()).unwrap();
    assert_eq!(parsed.to_text(), "hi");
}

#[test]
fn stray_br_end_tag_synthesizes_br() {
    let out = format("<p></br></p>");
    assert!(out.contains("<br>"));
}

#[test]
fn stray_form_end_tag_is_silent() {
    let parsed = parse("<p></form></p>", &Options::new()).unwrap();
    assert!(parsed.query("form").is_empty());
}

#[test]
fn c1_numeric_entity_remaps_to_euro() {
    let parsed = parse("<p>&#x80;</p>", &Options::new()).unwrap();
    assert_eq!(parsed.to_text(), "\u{20AC}");
}

#[test]
fn notin_with_semicolon_decodes_even_before_text() {
    let parsed = parse("<p>&notin;</p>", &Options::new()).unwrap();
    assert_eq!(parsed.to_text(), "\u{2209}");
}

#[test]
fn notin_without_semicolon_stays_literal_before_alnum() {
    // `&notin` has no trailing semicolon and is immediately followed by an
    // alphanumeric ("5"), so in attribute context it must stay literal; in
    // text content the named-entity form still wins greedily.
    let parsed = parse("<p title=\"&notin5\">&notin5</p>", &Options::new()).unwrap();
    assert_eq!(parsed.to_text(), "\u{2209}5");
    let p = parsed.query_one("p").unwrap();
    let title = parsed
        .tree
        .node(p)
        .data
        .as_element()
        .and_then(|(_, attrs)| attrs.iter().find(|a| a.name.local == "title"))
        .map(|a| a.value.clone());
    assert_eq!(title.as_deref(), Some("&notin5"));
}

#[test]
fn fragment_parsing_has_no_html_scaffolding() {
    let parsed = parse_fragment("<p>Hi</p>", None, &Options::new()).unwrap();
    let out = parsed.to_test_format();
    assert!(!out.contains("<html>"));
    assert!(out.contains("<p>"));
}

#[test]
fn fragment_parsing_inside_svg_context_keeps_svg_namespace() {
    let ctx = html5weaver::FragmentContext {
        name: "svg".to_string(),
        namespace: Namespace::Svg,
    };
    let parsed = parse_fragment("<g></g>", Some(ctx), &Options::new()).unwrap();
    let out = parsed.to_test_format();
    assert!(out.contains("<svg g>"));
}
