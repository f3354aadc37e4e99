//! VU toolchain core library.
//!
//! Compiles codified Valid Usage (VU) statements embedded in API
//! documentation: parsing, macro expansion, type checking against the API
//! registry, build-specific stripping, and rendering back to source,
//! decorated documentation markup or English. The main entry points are
//! [`VuAst`] for one VU, [`build_vu`] for the whole build pipeline and
//! [`scan_document`] for finding VUs in a document.

#![warn(missing_docs)]

/// Resolving VU symbols against the API registry.
pub mod extract;
/// VU grammar: lexer, parser, AST, macros and source conventions.
pub mod grammar;
/// The built-in predicate functions and methods.
pub mod predicates;
/// VU value types.
pub mod types;
/// Type checking and structural rules.
pub mod verify;
/// Build-specific constant folding and dead code elimination.
pub mod strip;
/// Source, Output and Text renderers.
pub mod format;
/// Parameter tags for new VUIDs.
pub mod tag;
/// Error taxonomy.
pub mod error;
/// One VU through the pipeline.
pub mod vu;
/// Codified VUs in AsciiDoc documents.
pub mod document;

// ── Convenience re-exports ──────────────────────────────────────────────────

// Parser
pub use grammar::parser::parse_vu;
pub use grammar::source::{Origin, prepare_vu_text, retain_comments};

// AST
pub use grammar::ast::{Expr, ExprKind, Module, Pos, Stmt, StmtKind};

// Macros
pub use grammar::macros::{MacroMap, expand_macros};

// Verifier
pub use verify::{Verification, verify};

// Stripping
pub use strip::{StripOutcome, strip_for_build};

// Formatters
pub use format::{FormatStyle, format_output, format_source, format_text, format_vu};

// Pipeline
pub use document::{Document, VuParagraph, format_document, scan_document};
pub use error::{MacroError, SyntaxError, VuError};
pub use tag::parameter_tag;
pub use vu::{BuildContext, BuildOutcome, CheckedVu, VuAst, build_vu, check_vu};

// Diagnostics (re-exported from the diagnostics crate)
pub use vu_toolchain_diagnostics::{Diagnostic, Severity, codes};

// Serialization helpers
pub use grammar::dump::to_pretty_json;
