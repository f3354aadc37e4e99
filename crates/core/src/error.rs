//! Error taxonomy for VU compilation.

use serde::Serialize;
use vu_toolchain_diagnostics::{Diagnostic, codes};

use crate::format::RoundTripError;
use crate::grammar::ast::Pos;
use crate::grammar::source::Origin;

/// A parse failure, positioned relative to the VU text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message} (line {line}, column {column})")]
pub struct SyntaxError {
    /// 1-based line within the VU text.
    pub line: u32,
    /// 1-based column within the line.
    pub column: u32,
    /// What went wrong.
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    /// Report as a `VU1001` diagnostic at its document location.
    pub fn to_diagnostic(&self, origin: &Origin) -> Diagnostic {
        Diagnostic::error(codes::SYNTAX_ERROR, self.message.clone())
            .at(origin.locate(Pos::new(self.line, self.column)))
    }
}

/// A macro expansion failure.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacroError {
    /// `macro(name)` was used before `name` was defined.
    #[error("macro `{name}` is not defined")]
    Undefined {
        /// The undefined macro.
        name: String,
        /// 1-based line of the reference within the VU text.
        line: u32,
        /// 1-based column of the reference.
        column: u32,
    },
    /// The text produced by substitution does not parse.
    #[error("macro expansion produced invalid syntax: {0}")]
    Parse(#[source] SyntaxError),
}

impl MacroError {
    /// Report as a `VU1002`/`VU1003` diagnostic at its document location.
    pub fn to_diagnostic(&self, origin: &Origin) -> Diagnostic {
        match self {
            MacroError::Undefined { name, line, column } => {
                Diagnostic::error(codes::MACRO_UNDEFINED, self.to_string())
                    .at(origin.locate(Pos::new(*line, *column)))
                    .with_fragment(format!("macro({name})"))
            }
            MacroError::Parse(e) => Diagnostic::error(codes::MACRO_PARSE, self.to_string())
                .at(origin.locate(Pos::new(e.line, e.column))),
        }
    }
}

/// Why a VU could not be compiled.
///
/// Every user-facing variant carries located diagnostics; [`VuError::Internal`]
/// signals a defect in the toolchain itself.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum VuError {
    /// The VU text does not parse.
    #[error("{0}")]
    Syntax(Diagnostic),
    /// A macro reference could not be expanded.
    #[error("{0}")]
    Macro(Diagnostic),
    /// The verifier rejected the VU.
    #[error("VU failed verification with {} error(s)", .0.len())]
    Verification(Vec<Diagnostic>),
    /// A formatter failed its own round-trip check.
    #[error("internal error: {0}")]
    Internal(#[from] RoundTripError),
}

impl VuError {
    /// Diagnostics describing this failure, in source order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            VuError::Syntax(d) | VuError::Macro(d) => vec![d.clone()],
            VuError::Verification(ds) => ds.clone(),
            VuError::Internal(e) => vec![e.to_diagnostic()],
        }
    }
}
