//! Tokenizer sub-states (spec §4.2), named the way the teacher's
//! `tokenizer::states` module names its raw-text states
//! (`examples/other_examples/60c53ed8_servo-html5ever__xml5ever-src-tokenizer-states.rs.rs`).

/// Which of the two "consume everything until a matching end tag" regimes a
/// raw-text element uses. `Rcdata` still decodes character references and
/// still recognizes `<` as markup-ish (used only to look for the end tag);
/// `Rawtext` does neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// `textarea`, `title`.
    Rcdata,
    /// `style`, `xmp`, `iframe`, `noembed`, `noframes`.
    Rawtext,
    /// `script`.
    ScriptData,
    /// `plaintext`: once entered, never exits (consumes to EOF).
    Plaintext,
}

impl RawKind {
    pub fn decodes_entities(self) -> bool {
        matches!(self, RawKind::Rcdata)
    }

    pub fn for_tag(name: &str) -> Option<RawKind> {
        match name {
            "textarea" | "title" => Some(RawKind::Rcdata),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
            "script" => Some(RawKind::ScriptData),
            "plaintext" => Some(RawKind::Plaintext),
            _ => None,
        }
    }
}

/// The tokenizer's coarse mode: either scanning ordinary markup, or deep in
/// a raw-text/RCDATA/script-data element looking only for its closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Mode {
    Data,
    RawText { kind: RawKind, tag_name: String },
}
