//! Conventions for VU text embedded in documentation.
//!
//! A codified VU is a bullet paragraph whose first line (after an optional
//! VUID anchor) is the grep tag. Before parsing, the bullet and the common
//! indentation are removed and full-line comments are turned into
//! `__comment("...")` statements so they survive the pipeline.

use vu_toolchain_diagnostics::Location;

use super::ast::{Pos, COMMENT_CALL};

/// Marker line identifying a codified VU paragraph.
pub const GREP_TAG: &str = "codified-vu";

/// Width of one indentation level in formatted VU source.
pub const SOURCE_INDENT: usize = 2;

/// VU text ready for parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedVu {
    /// Text with bullet and common indentation removed, comments retained.
    pub text: String,
    /// Width of the removed indentation, added back to columns when
    /// reporting positions.
    pub indent: usize,
}

/// Replace a leading `* ` bullet with spaces, keeping columns aligned.
pub fn remove_bullet(line: &str) -> String {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix("* ") {
        Some(rest) => {
            let lead = line.len() - trimmed.len();
            format!("{}{}", " ".repeat(lead + 2), rest)
        }
        None => line.to_string(),
    }
}

/// Whether a line is the grep tag, ignoring surrounding whitespace and a
/// leading bullet.
pub fn is_grep_tag(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.strip_prefix("* ").unwrap_or(trimmed).trim() == GREP_TAG
}

/// Heuristic used for untagged input: does the first line start like VU
/// source rather than prose?
pub fn looks_codified(first_line: &str) -> bool {
    let line = remove_bullet(first_line);
    let line = line.trim_start();
    if line.starts_with("if ") || line.starts_with("for ") || line.starts_with("require(") {
        return true;
    }
    // `name = ...` or `a.b = ...`
    let ident_len = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(line.len());
    ident_len > 0
        && line[ident_len..].trim_start().starts_with('=')
        && !line[ident_len..].trim_start().starts_with("==")
}

/// Remove the bullet and common indentation and retain comments.
pub fn prepare_vu_text<S: AsRef<str>>(lines: &[S]) -> PreparedVu {
    let mut unbulleted: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref().trim_end();
        unbulleted.push(if i == 0 {
            remove_bullet(line)
        } else {
            line.to_string()
        });
    }
    let indent = unbulleted
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    let dedented: Vec<&str> = unbulleted
        .iter()
        .map(|l| l.get(indent..).unwrap_or(""))
        .collect();
    PreparedVu {
        text: retain_comments(&dedented.join("\n")),
        indent,
    }
}

/// Turn full-line `#` comments outside brackets into `__comment("...")`
/// statements at the same indentation.
pub fn retain_comments(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = Vec::new();
    for line in text.split('\n') {
        let trimmed = line.trim_start();
        if depth == 0 && trimmed.starts_with('#') {
            let lead = &line[..line.len() - trimmed.len()];
            let body = trimmed.trim_start_matches('#').trim();
            out.push(format!(
                "{lead}{COMMENT_CALL}(\"{}\")",
                body.replace('\\', "\\\\").replace('"', "\\\"")
            ));
            continue;
        }
        depth = bracket_depth_after(line, depth);
        out.push(line.to_string());
    }
    out.join("\n")
}

/// Where a VU's text came from, used to turn AST positions into document
/// locations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    /// Document path, or a label such as `<stdin>`.
    pub file: String,
    /// 1-based document line of the VU's first line.
    pub line: usize,
    /// Indentation removed by [`prepare_vu_text`].
    pub indent: usize,
}

impl Origin {
    /// Create an origin.
    pub fn new(file: impl Into<String>, line: usize, indent: usize) -> Self {
        Self {
            file: file.into(),
            line,
            indent,
        }
    }

    /// Origin of standalone VU text (line 1, no indentation removed).
    pub fn standalone(file: impl Into<String>) -> Self {
        Self::new(file, 1, 0)
    }

    /// Document location of a node position.
    pub fn locate(&self, pos: Pos) -> Location {
        let line = self.line + (pos.line.max(1) as usize) - 1;
        Location::new(self.file.clone(), line, pos.col as usize + self.indent)
    }
}

fn bracket_depth_after(line: &str, mut depth: usize) -> usize {
    let mut quote: Option<char> = None;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '#') => break,
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            (None, _) => {}
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullet_is_replaced_by_spaces() {
        assert_eq!(remove_bullet("  * require(a)"), "    require(a)");
        assert_eq!(remove_bullet("    require(a)"), "    require(a)");
    }

    #[test]
    fn grep_tag_detection() {
        assert!(is_grep_tag("    codified-vu"));
        assert!(is_grep_tag("  * codified-vu  "));
        assert!(!is_grep_tag("    codified-vu-not"));
    }

    #[test]
    fn codified_heuristic() {
        assert!(looks_codified("  * require(x)"));
        assert!(looks_codified("if a:"));
        assert!(looks_codified("pInfo.flags = x"));
        assert!(!looks_codified("a == b"));
        assert!(!looks_codified("If pname:x is not NULL, ..."));
    }

    #[test]
    fn prepare_removes_common_indent() {
        let vu = prepare_vu_text(&["  * if a:", "      require(b)"]);
        assert_eq!(vu.indent, 4);
        assert_eq!(vu.text, "if a:\n  require(b)");
    }

    #[test]
    fn comments_become_calls() {
        let text = retain_comments("#     A comment line   \nif a:\n  # say \"hi\"\n  require(b)");
        assert_eq!(
            text,
            "__comment(\"A comment line\")\nif a:\n  __comment(\"say \\\"hi\\\"\")\n  require(b)"
        );
    }

    #[test]
    fn comments_inside_brackets_are_left_alone() {
        let text = "require(a and\n  # inner\n  b)";
        assert_eq!(retain_comments(text), text);
    }

    #[test]
    fn origin_offsets_positions() {
        let origin = Origin::new("vkCmdDraw.adoc", 40, 4);
        let loc = origin.locate(Pos::new(3, 5));
        assert_eq!(loc.line, 42);
        assert_eq!(loc.column, 9);
        assert_eq!(Origin::standalone("x").locate(Pos::new(1, 1)).line, 1);
    }
}
