//! The reserved `sanitize` / `safe` options (§6: "Reserved; boolean;
//! default true. Conflicting non-null values are rejected.").
//!
//! Neither option has any defined runtime behavior yet — §9 leaves
//! "whether `sanitize=true` implies any runtime behavior" as an open
//! question, decided here (see `DESIGN.md`) in favor of accepting the
//! flags and validating their consistency without touching the tree.

use crate::errors::Error;

/// Resolves the `sanitize`/`safe` pair to a single effective value,
/// rejecting the case where both are set and disagree.
pub fn resolve(sanitize: Option<bool>, safe: Option<bool>) -> Result<bool, Error> {
    match (sanitize, safe) {
        (Some(a), Some(b)) if a != b => Err(Error::ConflictingOption("sanitize/safe")),
        (Some(a), _) => Ok(a),
        (None, Some(b)) => Ok(b),
        (None, None) => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_true_when_unset() {
        assert_eq!(resolve(None, None).unwrap(), true);
    }

    #[test]
    fn agreeing_values_are_accepted() {
        assert_eq!(resolve(Some(false), Some(false)).unwrap(), false);
    }

    #[test]
    fn conflicting_values_are_rejected() {
        assert!(resolve(Some(true), Some(false)).is_err());
    }

    #[test]
    fn single_value_wins_when_other_unset() {
        assert_eq!(resolve(Some(false), None).unwrap(), false);
        assert_eq!(resolve(None, Some(false)).unwrap(), false);
    }
}
