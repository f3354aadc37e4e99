//! Pretty diagnostic rendering using ariadne.
//!
//! Converts the toolchain's [`Diagnostic`] type into ariadne [`Report`]s for
//! coloured, source-annotated terminal output. Diagnostics are located by
//! document line and column; the byte range is recovered through a
//! [`LineIndex`] over the document text.

use std::io::{self, IsTerminal};
use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use vu_toolchain_diagnostics::{Diagnostic, LineIndex, Severity};

// ── Output format ───────────────────────────────────────────────────────

/// Output format for command results and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Coloured, source-annotated output (ariadne).
    Pretty,
    /// Machine-readable JSON.
    Json,
}

impl Format {
    /// Use the explicit choice, or pretty for terminals and JSON for pipes.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            _ => {
                if io::stdout().is_terminal() {
                    Format::Pretty
                } else {
                    Format::Json
                }
            }
        }
    }
}

// ── Severity mapping ────────────────────────────────────────────────────

fn report_kind(severity: &Severity) -> ReportKind<'static> {
    match severity {
        Severity::Error => ReportKind::Error,
        Severity::Warn => ReportKind::Warning,
        _ => ReportKind::Warning,
    }
}

fn severity_color(severity: &Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warn => Color::Yellow,
        _ => Color::White,
    }
}

// ── Pretty rendering ────────────────────────────────────────────────────

/// Byte range of a diagnostic in `source`: from its location to the end of
/// the first line of its fragment, clamped to the line.
fn byte_range(index: &LineIndex, source: &str, diag: &Diagnostic) -> Option<Range<usize>> {
    let location = diag.location.as_ref()?;
    let start = index.offset_of(location)?;
    let line_end = source[start..].find('\n').map_or(source.len(), |n| start + n);
    let width = diag
        .fragment
        .as_deref()
        .and_then(|f| f.lines().next())
        .map_or(1, str::len)
        .max(1);
    Some(start..(start + width).min(line_end).max(start))
}

/// Render diagnostics for `filename` to stderr.
///
/// Diagnostics located in the document are rendered with source context;
/// the rest are printed as standalone messages.
pub(crate) fn render_diagnostics(source: &str, filename: &str, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    let config = Config::default().with_compact(false);
    let index = LineIndex::new(source);
    let mut cache = (filename, Source::from(source));

    for diag in diagnostics {
        let range = diag
            .location
            .as_ref()
            .is_none_or(|l| l.file == filename)
            .then(|| byte_range(&index, source, diag))
            .flatten();
        if let Some(range) = range {
            let mut builder = Report::build(report_kind(&diag.severity), (filename, range.clone()))
                .with_code(diag.id.as_ref())
                .with_message(&diag.message)
                .with_config(config);

            builder = builder.with_label(
                Label::new((filename, range))
                    .with_message(make_label_message(diag))
                    .with_color(severity_color(&diag.severity)),
            );

            if let Some(ctx) = &diag.context {
                builder = builder.with_note(join_context(ctx));
            }

            if let Some(explanation) = diag.explain() {
                builder = builder.with_help(explanation);
            }

            builder.finish().eprint(&mut cache).ok();
        } else {
            eprintln!("{diag}");

            if let Some(ctx) = &diag.context {
                eprintln!("  = note: {}", join_context(ctx));
            }

            if let Some(explanation) = diag.explain() {
                eprintln!("  = help: {explanation}");
            }
        }
    }
}

fn join_context(ctx: &std::collections::BTreeMap<String, String>) -> String {
    ctx.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The offending fragment when there is one, else the message.
fn make_label_message(diag: &Diagnostic) -> String {
    match &diag.fragment {
        Some(fragment) if !fragment.contains('\n') => format!("`{fragment}`"),
        _ => diag.message.clone(),
    }
}

// ── Summary line ────────────────────────────────────────────────────────

/// Print a coloured summary line showing error and warning counts.
///
/// Example: `2 errors, 1 warning`
pub(crate) fn print_summary(diagnostics: &[Diagnostic]) {
    use ariadne::Fmt;

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.len() - errors;
    if diagnostics.is_empty() {
        return;
    }

    let mut parts = Vec::new();
    if errors > 0 {
        let s = if errors == 1 { "" } else { "s" };
        parts.push(format!("{}", format!("{errors} error{s}").fg(Color::Red)));
    }
    if warnings > 0 {
        let s = if warnings == 1 { "" } else { "s" };
        parts.push(format!(
            "{}",
            format!("{warnings} warning{s}").fg(Color::Yellow)
        ));
    }
    eprintln!("{}", parts.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use vu_toolchain_diagnostics::{Location, codes};

    #[test]
    fn fragment_sets_the_label_width() {
        let source = "  * codified-vu\n    require(nope > 0)\n";
        let index = LineIndex::new(source);
        let diag = Diagnostic::error(codes::UNKNOWN_SYMBOL, "Unknown symbol nope")
            .at(Location::new("doc.adoc", 2, 13))
            .with_fragment("nope");
        let range = byte_range(&index, source, &diag).unwrap();
        assert_eq!(&source[range], "nope");
    }

    #[test]
    fn ranges_stop_at_the_end_of_the_line() {
        let source = "require(a and\n        b)\n";
        let index = LineIndex::new(source);
        let diag = Diagnostic::error(codes::TYPE_MISMATCH, "mismatch")
            .at(Location::new("doc.adoc", 1, 9))
            .with_fragment("a and b and c and d");
        let range = byte_range(&index, source, &diag).unwrap();
        assert_eq!(&source[range], "a and");
    }
}
