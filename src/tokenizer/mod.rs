//! The tokenizer (spec §4.2): a single-pass scanner producing a finite lazy
//! sequence of tokens.
//!
//! Structured like the teacher's `tokenizer::mod` — a hand-coded character
//! scanner rather than a generated state table — but built directly over a
//! `Vec<char>` of the whole input instead of an incremental `BufferQueue`,
//! since spec.md's tokenizer is restartable only by re-running (no
//! incremental feed/suspend API is in scope).

pub mod states;

use crate::atom::{ascii_lower, Attribute};
use crate::entities::decode_char_refs;
use crate::errors::{ErrorCategory, ParseError, SourcePosition};
use states::{Mode, RawKind};

/// A single tokenizer output, carrying its source position (spec §4.2:
/// "Each token carries a source offset `pos`").
#[derive(Debug, Clone)]
pub struct PositionedToken {
    pub token: Token,
    pub pos: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text {
        data: String,
    },
    Comment {
        data: String,
    },
    Doctype {
        name: Option<String>,
        public_id: Option<String>,
        system_id: Option<String>,
    },
}

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "textarea", "title",
];

pub struct Tokenizer {
    chars: Vec<char>,
    idx: usize,
    line: u32,
    column: u32,
    mode: Mode,
    pub collect_errors: bool,
    pub errors: Vec<ParseError>,
    /// Script-data escape tracking (spec §4.2 "Script escape states").
    script_escaped: bool,
    script_double_escaped: bool,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        // CR and CRLF are collapsed to LF up front; this also keeps offset
        // tracking simple since every remaining char is exactly one code
        // point wide in the normalized stream (spec §4.2 "Text
        // normalization").
        let normalized = normalize_newlines(input);
        Tokenizer {
            chars: normalized.chars().collect(),
            idx: 0,
            line: 1,
            column: 1,
            mode: Mode::Data,
            collect_errors: false,
            errors: Vec::new(),
            script_escaped: false,
            script_double_escaped: false,
        }
    }

    fn pos(&self) -> SourcePosition {
        SourcePosition {
            line: self.line,
            column: self.column,
        }
    }

    fn error(&mut self, code: &'static str, message: impl Into<String>) {
        if self.collect_errors {
            self.errors.push(ParseError::new(
                ErrorCategory::Tokenizer,
                code,
                message,
                Some(self.pos()),
            ));
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).copied()
    }

    fn starts_with_ci(&self, s: &str) -> bool {
        let want: Vec<char> = s.chars().collect();
        if self.idx + want.len() > self.chars.len() {
            return false;
        }
        self.chars[self.idx..self.idx + want.len()]
            .iter()
            .zip(want.iter())
            .all(|(a, b)| a.to_ascii_lowercase() == b.to_ascii_lowercase())
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.idx += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn at_eof(&self) -> bool {
        self.idx >= self.chars.len()
    }

    /// Produces the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<PositionedToken> {
        match self.mode.clone() {
            Mode::Data => self.next_data_token(),
            Mode::RawText { kind, tag_name } => self.next_raw_text_token(kind, tag_name),
        }
    }

    fn next_data_token(&mut self) -> Option<PositionedToken> {
        if self.at_eof() {
            return None;
        }
        let start_pos = self.pos();

        if self.peek() != Some('<') {
            let text = self.consume_text_run();
            return Some(PositionedToken {
                token: Token::Text { data: text },
                pos: start_pos,
            });
        }

        // At a '<'. Dispatch on what follows.
        if self.starts_with_ci("<!--") {
            return Some(PositionedToken {
                token: self.consume_comment(),
                pos: start_pos,
            });
        }
        if self.starts_with_ci("<!doctype") {
            return Some(PositionedToken {
                token: self.consume_doctype(),
                pos: start_pos,
            });
        }
        if self.starts_with_ci("<![CDATA[") {
            return Some(PositionedToken {
                token: self.consume_cdata(),
                pos: start_pos,
            });
        }
        if self.peek_at(1) == Some('!') {
            return Some(PositionedToken {
                token: self.consume_bogus_comment(1),
                pos: start_pos,
            });
        }
        if self.peek_at(1) == Some('?') {
            return Some(PositionedToken {
                token: self.consume_bogus_comment_with_prefix("?"),
                pos: start_pos,
            });
        }
        if self.peek_at(1) == Some('/') {
            return Some(PositionedToken {
                token: self.consume_end_tag_or_bogus(),
                pos: start_pos,
            });
        }
        if matches!(self.peek_at(1), Some(c) if c.is_ascii_alphabetic()) {
            return Some(PositionedToken {
                token: self.consume_start_tag(),
                pos: start_pos,
            });
        }

        // `<` followed by anything else is literal text.
        self.advance(); // consume '<'
        let mut text = String::from("<");
        text.push_str(&self.consume_text_run());
        Some(PositionedToken {
            token: Token::Text { data: text },
            pos: start_pos,
        })
    }

    /// Consumes a text run up to (not including) the next `<`, applying
    /// entity decoding with `in_attribute = false`.
    fn consume_text_run(&mut self) -> String {
        let mut raw = String::new();
        while let Some(c) = self.peek() {
            if c == '<' {
                break;
            }
            raw.push(c);
            self.advance();
        }
        decode_char_refs(&raw, false)
    }

    fn consume_comment(&mut self) -> Token {
        for _ in 0.."<!--".len() {
            self.advance();
        }
        // `<!-->` (comment-start state) and `<!--->` (comment-start-dash
        // state) both close immediately on `>` with an empty comment (§4.2
        // "abrupt-closing-empty-comment"), rather than falling into the
        // general end-search loop below.
        if self.peek() == Some('>') {
            self.error("abrupt-closing-empty-comment", "empty comment closed abruptly");
            self.advance();
            return Token::Comment { data: String::new() };
        }
        if self.peek() == Some('-') && self.peek_at(1) == Some('>') {
            self.error("abrupt-closing-empty-comment", "empty comment closed abruptly");
            self.advance();
            self.advance();
            return Token::Comment { data: String::new() };
        }
        let mut data = String::new();
        loop {
            if self.at_eof() {
                self.error("eof-in-comment", "unexpected end of file in comment");
                break;
            }
            if self.starts_with_ci("-->") {
                for _ in 0..3 {
                    self.advance();
                }
                break;
            }
            if self.starts_with_ci("--!>") {
                for _ in 0..4 {
                    self.advance();
                }
                break;
            }
            data.push(self.advance().unwrap());
        }
        Token::Comment { data }
    }

    fn consume_cdata(&mut self) -> Token {
        for _ in 0.."<![CDATA[".len() {
            self.advance();
        }
        let mut data = String::new();
        loop {
            if self.at_eof() {
                self.error("eof-in-comment", "unexpected end of file in CDATA section");
                break;
            }
            if self.starts_with_ci("]]>") {
                for _ in 0..3 {
                    self.advance();
                }
                break;
            }
            data.push(self.advance().unwrap());
        }
        // Wrapped so the tree builder can detect CDATA and, outside foreign
        // content, render it as a bogus comment (spec §4.2).
        Token::Comment {
            data: format!("[CDATA[{}]]", data),
        }
    }

    fn consume_bogus_comment(&mut self, skip: usize) -> Token {
        for _ in 0..(1 + skip) {
            self.advance();
        }
        self.consume_bogus_comment_body(String::new())
    }

    fn consume_bogus_comment_with_prefix(&mut self, prefix: &str) -> Token {
        self.advance(); // '<'
        self.advance(); // '?'
        self.consume_bogus_comment_body(prefix.to_string())
    }

    fn consume_bogus_comment_body(&mut self, prefix: String) -> Token {
        let mut data = prefix;
        while let Some(c) = self.peek() {
            if c == '>' {
                self.advance();
                break;
            }
            let c = self.advance().unwrap();
            data.push(if c == '\0' { '\u{FFFD}' } else { c });
        }
        Token::Comment { data }
    }

    fn consume_doctype(&mut self) -> Token {
        for _ in 0.."<!doctype".len() {
            self.advance();
        }
        self.skip_whitespace();

        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '>' {
                break;
            }
            name.push(self.advance().unwrap());
        }
        self.skip_whitespace();

        let mut public_id = None;
        let mut system_id = None;

        if self.starts_with_ci("public") {
            for _ in 0.."public".len() {
                self.advance();
            }
            self.skip_whitespace();
            public_id = Some(self.consume_quoted_string());
            self.skip_whitespace();
            if matches!(self.peek(), Some('"') | Some('\'')) {
                system_id = Some(self.consume_quoted_string());
            } else {
                system_id = Some(String::new());
            }
        } else if self.starts_with_ci("system") {
            for _ in 0.."system".len() {
                self.advance();
            }
            self.skip_whitespace();
            system_id = Some(self.consume_quoted_string());
            public_id = Some(String::new());
        }

        self.skip_whitespace();
        if self.at_eof() {
            self.error("eof-in-doctype", "unexpected end of file in DOCTYPE");
        } else if self.peek() == Some('>') {
            self.advance();
        } else {
            // Skip to '>' or EOF.
            while let Some(c) = self.peek() {
                self.advance();
                if c == '>' {
                    break;
                }
            }
        }

        Token::Doctype {
            name: if name.is_empty() {
                None
            } else {
                Some(ascii_lower(&name))
            },
            public_id,
            system_id,
        }
    }

    fn consume_quoted_string(&mut self) -> String {
        let quote = match self.peek() {
            Some(q @ '"') | Some(q @ '\'') => q,
            _ => return String::new(),
        };
        self.advance();
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                break;
            }
            s.push(self.advance().unwrap());
        }
        s
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn consume_end_tag_or_bogus(&mut self) -> Token {
        // At "</" with the next char not yet known to be a letter.
        if matches!(self.peek_at(2), Some(c) if c.is_whitespace()) {
            self.advance();
            self.advance();
            return self.consume_bogus_comment_body(String::new());
        }
        if !matches!(self.peek_at(2), Some(c) if c.is_ascii_alphanumeric() || c == ':' || c == '-')
        {
            // `</>` or `</` at EOF: bogus comment with empty/partial body.
            self.advance();
            self.advance();
            return self.consume_bogus_comment_body(String::new());
        }
        self.advance(); // '<'
        self.advance(); // '/'
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == ':' || c == '-' {
                name.push(self.advance().unwrap());
            } else {
                break;
            }
        }
        // Discard the rest of the end tag up to '>'.
        while let Some(c) = self.peek() {
            self.advance();
            if c == '>' {
                break;
            }
        }
        if self.at_eof() {
            self.error("eof-in-tag", "unexpected end of file in end tag");
        }
        Token::EndTag {
            name: ascii_lower(&name),
        }
    }

    fn consume_start_tag(&mut self) -> Token {
        self.advance(); // '<'
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '/' || c == '>' {
                break;
            }
            name.push(self.advance().unwrap());
        }
        let name = ascii_lower(&name);

        let mut attrs: Vec<Attribute> = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    self.error("eof-in-tag", "unexpected end of file in start tag");
                    break;
                }
                Some('>') => {
                    self.advance();
                    break;
                }
                Some('/') => {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        self_closing = true;
                        break;
                    }
                    // Lone '/' resembling self-close elsewhere in the tag.
                    self_closing = true;
                }
                _ => {
                    if let Some(attr) = self.consume_attribute() {
                        if !attrs.iter().any(|a| a.name.local == attr.name.local) {
                            attrs.push(attr);
                        }
                    }
                }
            }
        }

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !self_closing {
            if let Some(kind) = RawKind::for_tag(&name) {
                self.mode = Mode::RawText {
                    kind,
                    tag_name: name.clone(),
                };
                self.script_escaped = false;
                self.script_double_escaped = false;
            }
        }

        Token::StartTag {
            name,
            attrs,
            self_closing,
        }
    }

    fn consume_attribute(&mut self) -> Option<Attribute> {
        let mut key = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '=' || c == '/' || c == '>' {
                break;
            }
            key.push(self.advance().unwrap());
        }
        if key.is_empty() {
            self.advance();
            return None;
        }
        let key = ascii_lower(&key);

        self.skip_whitespace();
        let mut value = String::new();
        if self.peek() == Some('=') {
            self.advance();
            self.skip_whitespace();
            match self.peek() {
                Some(q @ '"') | Some(q @ '\'') => {
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c == q {
                            self.advance();
                            break;
                        }
                        value.push(self.advance().unwrap());
                    }
                }
                _ => {
                    while let Some(c) = self.peek() {
                        if c.is_whitespace() || c == '>' {
                            break;
                        }
                        value.push(self.advance().unwrap());
                    }
                }
            }
        }

        let value = decode_char_refs(&value, true);
        Some(Attribute::new(key, value))
    }

    /// Raw-text / RCDATA / script-data consumption (spec §4.2). Scans for
    /// the matching `</name` at a tag boundary, tracking the script
    /// escape/double-escape flags along the way.
    fn next_raw_text_token(&mut self, kind: RawKind, tag_name: String) -> Option<PositionedToken> {
        if self.at_eof() {
            self.mode = Mode::Data;
            return None;
        }
        let start_pos = self.pos();

        if kind == RawKind::Plaintext {
            let mut data = String::new();
            while let Some(c) = self.peek() {
                data.push(self.advance().unwrap());
            }
            return Some(PositionedToken {
                token: Token::Text { data },
                pos: start_pos,
            });
        }

        let mut raw = String::new();
        loop {
            if self.at_eof() {
                self.error(
                    "expected-closing-tag-but-got-eof",
                    format!("expected closing tag </{}> but got end of file", tag_name),
                );
                break;
            }

            if kind == RawKind::ScriptData {
                if self.starts_with_ci("<!--") {
                    self.script_escaped = true;
                } else if self.starts_with_ci("<script") && self.tag_boundary_after(7) {
                    if self.script_escaped {
                        self.script_double_escaped = true;
                    }
                } else if self.starts_with_ci("</script") && self.tag_boundary_after(8) {
                    if self.script_double_escaped {
                        self.script_double_escaped = false;
                    }
                } else if self.starts_with_ci("-->") {
                    self.script_escaped = false;
                    self.script_double_escaped = false;
                }
            }

            let closing_allowed = kind != RawKind::ScriptData || !self.script_double_escaped;
            if closing_allowed && self.matches_end_tag(&tag_name) {
                break;
            }

            raw.push(self.advance().unwrap());
        }

        self.mode = Mode::Data;

        let data = if kind.decodes_entities() {
            decode_char_refs(&raw, false)
        } else {
            raw
        };

        Some(PositionedToken {
            token: Token::Text { data },
            pos: start_pos,
        })
    }

    /// Whether the upcoming `</name` (already confirmed case-insensitively)
    /// is followed by a tag boundary (`>`, `/`, or whitespace), per spec
    /// §4.2's raw-text matching rule.
    fn matches_end_tag(&self, tag_name: &str) -> bool {
        let prefix = format!("</{}", tag_name);
        if !self.starts_with_ci(&prefix) {
            return false;
        }
        self.tag_boundary_after(prefix.chars().count())
    }

    fn tag_boundary_after(&self, offset: usize) -> bool {
        match self.peek_at(offset) {
            None => true,
            Some(c) => c == '>' || c == '/' || c.is_whitespace(),
        }
    }
}

/// CR and CRLF collapse to LF before any other processing (spec §4.2).
fn normalize_newlines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// Drives only the tokenizer, yielding the coalesced event stream of §6
/// `stream()`. Adjacent text tokens are merged, and a self-closing start
/// tag synthesizes a trailing end-tag event.
pub struct TokenStream {
    tokenizer: Tokenizer,
    pending: Vec<StreamEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Text(String),
    Start { name: String, attrs: Vec<Attribute> },
    End { name: String },
    Comment(String),
    Doctype {
        name: Option<String>,
        public_id: Option<String>,
        system_id: Option<String>,
    },
}

impl TokenStream {
    pub fn new(input: &str) -> Self {
        TokenStream {
            tokenizer: Tokenizer::new(input),
            pending: Vec::new(),
        }
    }
}

impl Iterator for TokenStream {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        if !self.pending.is_empty() {
            return Some(self.pending.remove(0));
        }

        let mut text_buf: Option<String> = None;
        loop {
            match self.tokenizer.next_token() {
                None => {
                    return text_buf.map(StreamEvent::Text);
                }
                Some(PositionedToken { token, .. }) => match token {
                    Token::Text { data } => {
                        text_buf.get_or_insert_with(String::new).push_str(&data);
                    }
                    other => {
                        let self_closing_name = match &other {
                            Token::StartTag {
                                name,
                                self_closing: true,
                                ..
                            } => Some(name.clone()),
                            _ => None,
                        };
                        let event = Self::convert(other);
                        let mut queued = vec![event];
                        if let Some(name) = self_closing_name {
                            queued.push(StreamEvent::End { name });
                        }
                        if let Some(text) = text_buf.take() {
                            self.pending.splice(0..0, queued);
                            return Some(StreamEvent::Text(text));
                        }
                        let first = queued.remove(0);
                        self.pending.splice(0..0, queued);
                        return Some(first);
                    }
                },
            }
        }
    }
}

impl TokenStream {
    fn convert(token: Token) -> StreamEvent {
        match token {
            Token::Text { data } => StreamEvent::Text(data),
            Token::Comment { data } => StreamEvent::Comment(data),
            Token::Doctype {
                name,
                public_id,
                system_id,
            } => StreamEvent::Doctype {
                name,
                public_id,
                system_id,
            },
            Token::EndTag { name } => StreamEvent::End { name },
            Token::StartTag { name, attrs, .. } => StreamEvent::Start { name, attrs },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut t = Tokenizer::new(input);
        let mut out = Vec::new();
        while let Some(pt) = t.next_token() {
            out.push(pt.token);
        }
        out
    }

    #[test]
    fn simple_start_and_end_tag() {
        let toks = tokens("<p>hi</p>");
        assert_eq!(
            toks,
            vec![
                Token::StartTag {
                    name: "p".into(),
                    attrs: vec![],
                    self_closing: false
                },
                Token::Text { data: "hi".into() },
                Token::EndTag { name: "p".into() },
            ]
        );
    }

    #[test]
    fn attributes_with_duplicate_dropped() {
        let toks = tokens(r#"<a href="1" href="2">"#);
        match &toks[0] {
            Token::StartTag { attrs, .. } => {
                assert_eq!(attrs.len(), 1);
                assert_eq!(attrs[0].value, "1");
            }
            _ => panic!("expected start tag"),
        }
    }

    #[test]
    fn comment_terminators() {
        assert_eq!(tokens("<!---->"), vec![Token::Comment { data: "".into() }]);
        assert_eq!(
            tokens("<!--->"),
            vec![Token::Comment { data: "".into() }]
        );
    }

    #[test]
    fn unterminated_comment_emits_error() {
        let mut t = Tokenizer::new("<!--oops");
        t.collect_errors = true;
        let tok = t.next_token().unwrap().token;
        assert_eq!(tok, Token::Comment { data: "oops".into() });
        assert_eq!(t.errors.len(), 1);
        assert_eq!(t.errors[0].code, "eof-in-comment");
    }

    #[test]
    fn cdata_outside_foreign_is_bogus_comment_payload() {
        let toks = tokens("<![CDATA[hi]]>");
        assert_eq!(
            toks,
            vec![Token::Comment {
                data: "[CDATA[hi]]".into()
            }]
        );
    }

    #[test]
    fn doctype_html() {
        let toks = tokens("<!doctype html>");
        assert_eq!(
            toks,
            vec![Token::Doctype {
                name: Some("html".into()),
                public_id: None,
                system_id: None,
            }]
        );
    }

    #[test]
    fn doctype_public_without_system() {
        let toks = tokens(r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01//EN">"#);
        match &toks[0] {
            Token::Doctype {
                public_id,
                system_id,
                ..
            } => {
                assert_eq!(public_id.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
                assert_eq!(system_id.as_deref(), Some(""));
            }
            _ => panic!("expected doctype"),
        }
    }

    #[test]
    fn script_raw_text_ignores_markup() {
        let toks = tokens("<script>var x = \"<p>\";</script>");
        assert_eq!(
            toks,
            vec![
                Token::StartTag {
                    name: "script".into(),
                    attrs: vec![],
                    self_closing: false
                },
                Token::Text {
                    data: "var x = \"<p>\";".into()
                },
                Token::EndTag {
                    name: "script".into()
                },
            ]
        );
    }

    #[test]
    fn script_double_escaped_ignores_nested_end_tag() {
        let input = "<script><!--<script>a</script>b--></script>";
        let toks = tokens(input);
        assert_eq!(
            toks,
            vec![
                Token::StartTag {
                    name: "script".into(),
                    attrs: vec![],
                    self_closing: false
                },
                Token::Text {
                    data: "<!--<script>a</script>b-->".into()
                },
                Token::EndTag {
                    name: "script".into()
                },
            ]
        );
    }

    #[test]
    fn textarea_decodes_entities_but_style_does_not() {
        let toks = tokens("<textarea>&amp;</textarea>");
        assert_eq!(
            toks[1],
            Token::Text { data: "&".into() }
        );
        let toks = tokens("<style>&amp;</style>");
        assert_eq!(
            toks[1],
            Token::Text {
                data: "&amp;".into()
            }
        );
    }

    #[test]
    fn crlf_normalized_to_lf() {
        let toks = tokens("a\r\nb\rc");
        assert_eq!(toks, vec![Token::Text { data: "a\nb\nc".into() }]);
    }

    #[test]
    fn end_tag_with_whitespace_after_slash_is_bogus_comment() {
        let toks = tokens("</ p>");
        assert_eq!(toks, vec![Token::Comment { data: " p".into() }]);
    }

    #[test]
    fn unexpected_end_tag_with_no_open_name_still_tokenizes() {
        let toks = tokens("</foo>");
        assert_eq!(toks, vec![Token::EndTag { name: "foo".into() }]);
    }
}
