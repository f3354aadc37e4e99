//! Self-check that formatter output parses back to the same VU.

use std::collections::BTreeMap;

use vu_toolchain_diagnostics::{Diagnostic, codes};

use super::{FormatStyle, undecorate};
use crate::error::SyntaxError;
use crate::grammar::ast::{Module, normalize};
use crate::grammar::parser::parse_vu;
use crate::grammar::source::retain_comments;

/// How rendered text failed to round-trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundTripFailure {
    /// The rendered text does not parse.
    #[error("re-parse failed: {0}")]
    Reparse(SyntaxError),
    /// The rendered text parses to a different VU.
    #[error("re-parsed VU differs from the original")]
    Mismatch,
}

/// A formatter produced text that does not describe the VU it was given.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{style} formatter output does not round-trip: {failure}")]
pub struct RoundTripError {
    /// Style that produced `rendered`.
    pub style: FormatStyle,
    /// The offending text.
    pub rendered: String,
    /// What went wrong.
    pub failure: RoundTripFailure,
}

impl RoundTripError {
    /// Report as an internal `VU4001` diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(codes::INTERNAL_ROUND_TRIP, self.to_string())
            .with_fragment(self.rendered.clone())
            .with_context(BTreeMap::from([("style".to_string(), self.style.to_string())]))
    }
}

/// Check that `rendered`, produced in `style` from `original`, parses back
/// to `original` once positions and comments are ignored.
///
/// Text output is prose and is not checked.
pub fn assert_round_trip(
    original: &Module,
    rendered: &str,
    style: FormatStyle,
) -> Result<(), RoundTripError> {
    let source = match style {
        FormatStyle::Source => rendered.to_string(),
        FormatStyle::Output => undecorate(rendered),
        FormatStyle::Text => return Ok(()),
    };
    let fail = |failure| RoundTripError {
        style,
        rendered: rendered.to_string(),
        failure,
    };
    let reparsed = parse_vu(&retain_comments(&source)).map_err(|e| fail(RoundTripFailure::Reparse(e)))?;
    if normalize(&reparsed) != normalize(original) {
        log::error!("{style} output does not round-trip:\n{rendered}");
        return Err(fail(RoundTripFailure::Mismatch));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_is_reported() {
        let module = parse_vu("require(a)").unwrap();
        let err = assert_round_trip(&module, "require(b)", FormatStyle::Source).unwrap_err();
        assert_eq!(err.failure, RoundTripFailure::Mismatch);
        let d = err.to_diagnostic();
        assert_eq!(d.id, codes::INTERNAL_ROUND_TRIP);
        assert_eq!(d.fragment.as_deref(), Some("require(b)"));
    }

    #[test]
    fn unparsable_output_is_reported() {
        let module = parse_vu("require(a)").unwrap();
        let err = assert_round_trip(&module, "require(", FormatStyle::Source).unwrap_err();
        assert!(matches!(err.failure, RoundTripFailure::Reparse(_)));
    }

    #[test]
    fn comments_and_layout_are_ignored() {
        let module = parse_vu("if a:\n    require(b)").unwrap();
        assert!(assert_round_trip(&module, "# note\nif a:\n  require(b)", FormatStyle::Source).is_ok());
        assert!(assert_round_trip(&module, "anything at all", FormatStyle::Text).is_ok());
    }
}
