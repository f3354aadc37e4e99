//! Finding codified VUs in AsciiDoc documents.
//!
//! The scanner walks a document line by line. `:name: value` lines define
//! macros, `[open,refpage='...']` blocks set the documented API (and the
//! `refpage` macro), and every bullet paragraph whose first line, after an
//! optional VUID anchor, is the grep tag is a codified VU.

use serde::Serialize;
use vu_toolchain_diagnostics::Diagnostic;

use crate::error::VuError;
use crate::format::{FormatStyle, assert_round_trip, format_source};
use crate::grammar::macros::MacroMap;
use crate::grammar::source::{GREP_TAG, SOURCE_INDENT, is_grep_tag, remove_bullet};
use crate::vu::VuAst;

/// Prefix of VUID anchors.
pub const VUID_PREFIX: &str = "VUID-";

/// Macro holding the current reference page name.
pub const REFPAGE_MACRO: &str = "refpage";

/// A codified VU paragraph.
#[derive(Debug, Clone, Serialize)]
pub struct VuParagraph {
    /// 1-based document line of the paragraph's first line.
    pub line: usize,
    /// The paragraph as written.
    pub lines: Vec<String>,
    /// The `[[VUID-...]]` anchor, if present.
    pub anchor: Option<String>,
    /// Index in `lines` of the first line of VU text.
    pub vu_start: usize,
    /// The reference page the paragraph belongs to.
    pub api: Option<String>,
    /// Macros defined before the paragraph.
    #[serde(skip)]
    pub macros: MacroMap,
}

impl VuParagraph {
    /// Lines of VU text, after the anchor and grep tag.
    pub fn vu_lines(&self) -> &[String] {
        &self.lines[self.vu_start..]
    }

    /// 1-based document line of the first line of VU text.
    pub fn vu_line(&self) -> usize {
        self.line + self.vu_start
    }

    /// Parse the VU text.
    pub fn parse(&self, file: &str) -> Result<VuAst, VuError> {
        VuAst::from_lines(self.vu_lines(), file, self.vu_line())
    }

    /// The paragraph with its VU text replaced by `source`, laid out with
    /// the bullet, anchor and grep tag lines in canonical form.
    pub fn with_source(&self, source: &str, indent: usize) -> Vec<String> {
        let indent = indent.max(SOURCE_INDENT);
        let pad = " ".repeat(indent);
        let bullet = format!("{}* ", " ".repeat(indent - SOURCE_INDENT));
        let mut out = Vec::with_capacity(source.lines().count() + 2);
        match &self.anchor {
            Some(anchor) => {
                out.push(format!("{bullet}{anchor}"));
                out.push(format!("{pad}{GREP_TAG}"));
            }
            None => out.push(format!("{bullet}{GREP_TAG}")),
        }
        out.extend(source.lines().map(|l| format!("{pad}{l}")));
        out
    }
}

/// A scanned document.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Path or label of the document.
    pub file: String,
    /// Every line, without terminators.
    pub lines: Vec<String>,
    /// Codified VU paragraphs in document order.
    pub paragraphs: Vec<VuParagraph>,
}

/// Scan `text` for codified VUs.
pub fn scan_document(file: impl Into<String>, text: &str) -> Document {
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut macros = MacroMap::new();
    let mut api: Option<String> = None;
    let mut paragraphs = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if let Some((name, value)) = macro_definition(line) {
            macros.insert(name.to_string(), value.to_string());
        } else if let Some(page) = refpage(line) {
            macros.insert(REFPAGE_MACRO.to_string(), page.to_string());
            api = Some(page.to_string());
        } else if is_bullet(line) {
            let end = paragraph_end(&lines, i);
            if let Some(paragraph) = codified(&lines[i..end], i + 1, api.as_deref(), &macros) {
                paragraphs.push(paragraph);
            }
            i = end;
            continue;
        }
        i += 1;
    }
    let file = file.into();
    log::debug!("{file}: {} codified VU(s)", paragraphs.len());
    Document {
        file,
        lines,
        paragraphs,
    }
}

/// `:name: value`
fn macro_definition(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(':')?;
    let (name, value) = rest.split_once(':')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then(|| (name, value.trim()))
}

/// `[open,refpage='vkFoo',...]`
fn refpage(line: &str) -> Option<&str> {
    if !line.starts_with("[open,") {
        return None;
    }
    let start = line.find("refpage='")? + "refpage='".len();
    let len = line[start..].find('\'')?;
    Some(&line[start..start + len])
}

fn is_bullet(line: &str) -> bool {
    line.trim_start().starts_with("* ")
}

fn paragraph_end(lines: &[String], start: usize) -> usize {
    let mut end = start + 1;
    while end < lines.len() {
        let line = &lines[end];
        let trimmed = line.trim_start();
        let breaks = trimmed.is_empty()
            || is_bullet(line)
            || trimmed.starts_with("ifdef::")
            || trimmed.starts_with("ifndef::")
            || trimmed.starts_with("endif::")
            || trimmed.starts_with("****")
            || trimmed == "--";
        if breaks {
            break;
        }
        end += 1;
    }
    end
}

fn codified(
    lines: &[String],
    line: usize,
    api: Option<&str>,
    macros: &MacroMap,
) -> Option<VuParagraph> {
    let first = remove_bullet(&lines[0]);
    let first = first.trim();
    let (anchor, tag_index) = if first.starts_with("[[") && first.contains(VUID_PREFIX) {
        (Some(first.to_string()), 1)
    } else {
        (None, 0)
    };
    if !lines.get(tag_index).is_some_and(|l| is_grep_tag(l)) || lines.len() <= tag_index + 1 {
        return None;
    }
    Some(VuParagraph {
        line,
        lines: lines.to_vec(),
        anchor,
        vu_start: tag_index + 1,
        api: api.map(str::to_string),
        macros: macros.clone(),
    })
}

/// Result of formatting a document.
#[derive(Debug, Clone)]
pub struct FormattedDocument {
    /// The rewritten document.
    pub text: String,
    /// Whether any line changed.
    pub changed: bool,
    /// Problems with VUs that were left as they were.
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrite every codified VU of `doc` in canonical source form.
///
/// VUs that fail to parse are left untouched and reported.
pub fn format_document(doc: &Document) -> FormattedDocument {
    let mut out: Vec<String> = Vec::with_capacity(doc.lines.len());
    let mut diagnostics = Vec::new();
    let mut next = 0;
    for paragraph in &doc.paragraphs {
        let start = paragraph.line - 1;
        out.extend_from_slice(&doc.lines[next..start]);
        next = start + paragraph.lines.len();
        match format_paragraph(paragraph, &doc.file) {
            Ok(lines) => out.extend(lines),
            Err(e) => {
                diagnostics.extend(e.diagnostics());
                out.extend_from_slice(&paragraph.lines);
            }
        }
    }
    out.extend_from_slice(&doc.lines[next..]);
    let changed = out != doc.lines;
    let mut text = out.join("\n");
    if !doc.lines.is_empty() {
        text.push('\n');
    }
    FormattedDocument {
        text,
        changed,
        diagnostics,
    }
}

fn format_paragraph(paragraph: &VuParagraph, file: &str) -> Result<Vec<String>, VuError> {
    let vu = paragraph.parse(file)?;
    let source = format_source(vu.raw());
    assert_round_trip(vu.raw(), &source, FormatStyle::Source)?;
    Ok(paragraph.with_source(&source, vu.origin().indent))
}
