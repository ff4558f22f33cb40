//! Structured parse errors (spec §7) plus the crate's top-level `Error`
//! type for the strict-mode escalation boundary and library-internal
//! invariant violations.
//!
//! The teacher threads errors through `TreeSink::parse_error(Cow<'static, str>)`
//! — a free-text message with no position or category. We keep parse errors
//! as structured values the way spec.md §7/§8 requires (category, kebab-case
//! code, message, optional position, ordered), and add `thiserror`-derived
//! `Error` for the one place the crate *can* fail outright: strict mode.

use std::cmp::Ordering;
use std::fmt;

/// Which stage raised the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Tokenizer,
    TreeBuilder,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Tokenizer => f.write_str("tokenizer"),
            ErrorCategory::TreeBuilder => f.write_str("treebuilder"),
        }
    }
}

/// A `(line, column)` source position, 1-based the way the tokenizer tracks
/// it while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

/// One structured parse error (§7). Never an exception outside strict mode.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub category: ErrorCategory,
    /// Kebab-case code, e.g. `eof-in-comment`.
    pub code: &'static str,
    pub message: String,
    pub position: Option<SourcePosition>,
}

impl ParseError {
    pub fn new(
        category: ErrorCategory,
        code: &'static str,
        message: impl Into<String>,
        position: Option<SourcePosition>,
    ) -> Self {
        ParseError {
            category,
            code,
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(
                f,
                "{}:{} {}/{}: {}",
                pos.line, pos.column, self.category, self.code, self.message
            ),
            None => write!(f, "{}/{}: {}", self.category, self.code, self.message),
        }
    }
}

/// Orders by `(line, column)` ascending, unknown positions last, ties
/// broken by emission order — callers sort a `Vec<ParseError>` with
/// `sort_by(ParseError::order)` (a stable sort), satisfying the §8
/// invariant "Error list is non-decreasing in (line, column) with unknown
/// positions last; stable for ties."
pub fn order(a: &ParseError, b: &ParseError) -> Ordering {
    match (a.position, b.position) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Top-level crate error. The only variant that can surface from
/// [`crate::parse`]/[`crate::parse_fragment`] in normal operation is
/// `Strict`; `Invariant` exists for node-model corruption that would be a
/// panic in the teacher (`panic!("not an element!")`) but is a recoverable
/// `Result` here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error in strict mode: {0}")]
    Strict(Box<ParseError>),

    #[error("node model invariant violated: {0}")]
    Invariant(String),

    #[error("conflicting option: {0}")]
    ConflictingOption(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
