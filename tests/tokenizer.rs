//! Tokenizer-only boundary behaviors (§8 "Properties from the tokenizer
//! alone") exercised through the public `stream()` entry point.

use html5weaver::{stream, StreamEvent};

fn text_of(input: &str) -> String {
    stream(input)
        .filter_map(|e| match e {
            StreamEvent::Text(t) => Some(t),
            _ => None,
        })
        .collect()
}

#[test]
fn concatenated_text_matches_input_minus_markup() {
    assert_eq!(text_of("hello <b>world</b>!"), "helloworld!");
}

#[test]
fn entities_are_replaced_in_text() {
    assert_eq!(text_of("a &amp; b"), "a & b");
}

#[test]
fn crlf_is_normalized_to_lf_in_stream_text() {
    assert_eq!(text_of("a\r\nb"), "ab");
}

#[test]
fn doctype_event_carries_name() {
    let events: Vec<_> = stream("<!doctype html>").collect();
    assert_eq!(
        events,
        vec![StreamEvent::Doctype {
            name: Some("html".into()),
            public_id: None,
            system_id: None,
        }]
    );
}

#[test]
fn comment_event_carries_data() {
    let events: Vec<_> = stream("<!-- hi -->").collect();
    assert_eq!(events, vec![StreamEvent::Comment(" hi ".into())]);
}

#[test]
fn self_closing_start_tag_emits_synthetic_end() {
    let events: Vec<_> = stream("<br/>").collect();
    assert_eq!(
        events,
        vec![
            StreamEvent::Start {
                name: "br".into(),
                attrs: vec![]
            },
            StreamEvent::End { name: "br".into() },
        ]
    );
}

#[test]
fn empty_input_yields_no_events() {
    let events: Vec<_> = stream("").collect();
    assert!(events.is_empty());
}
