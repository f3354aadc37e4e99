//! Textual macro expansion.
//!
//! Documents define macros with `:name: value` lines; VUs reference them as
//! `macro(name)`. Expansion substitutes the converted value in place and the
//! result is re-parsed.

use std::collections::{BTreeMap, BTreeSet};

use vu_toolchain_diagnostics::LineIndex;

use crate::error::MacroError;

/// Macro name → raw value, as accumulated from a document.
pub type MacroMap = BTreeMap<String, String>;

/// Convert a documentation value into VU syntax: drop `pname:` markers and
/// rewrite `->` as attribute access.
pub fn convert_macro_value(value: &str) -> String {
    value.trim().replace("pname:", "").replace("->", ".")
}

/// Resolve an API name that may be written as a `{macro}` reference.
pub fn apply_macros_to_api_name(api: &str, macros: &MacroMap) -> Option<String> {
    match api.strip_prefix('{').and_then(|a| a.strip_suffix('}')) {
        Some(name) => macros.get(name).map(|v| convert_macro_value(v)),
        None => Some(api.to_string()),
    }
}

/// Result of expanding the macros in one VU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Text with every `macro(name)` replaced.
    pub text: String,
    /// Names of the macros that were substituted.
    pub used: BTreeSet<String>,
}

/// Replace every `macro(name)` in `text` with the converted value of `name`.
pub fn expand_macros(text: &str, macros: &MacroMap) -> Result<Expansion, MacroError> {
    let mut out = String::with_capacity(text.len());
    let mut used = BTreeSet::new();
    let mut rest = text;
    let mut consumed = 0usize;
    while let Some(found) = find_macro(rest) {
        let MacroRef { start, end, name } = found;
        let Some(value) = macros.get(name) else {
            let (line, column) = LineIndex::new(text).line_col(consumed + start);
            return Err(MacroError::Undefined {
                name: name.to_string(),
                line: line as u32 + 1,
                column: column as u32 + 1,
            });
        };
        out.push_str(&rest[..start]);
        out.push_str(&convert_macro_value(value));
        used.insert(name.to_string());
        consumed += end;
        rest = &rest[end..];
    }
    out.push_str(rest);
    Ok(Expansion { text: out, used })
}

struct MacroRef<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// Find the next well-formed `macro(name)` outside string literals.
fn find_macro(text: &str) -> Option<MacroRef<'_>> {
    let b = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < b.len() {
        let c = b[i];
        if let Some(q) = quote {
            if c == b'\\' {
                i += 1;
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if c == b'\'' || c == b'"' {
            quote = Some(c);
            i += 1;
            continue;
        }
        let boundary = i == 0 || !is_ident_byte(b[i - 1]);
        if boundary && text[i..].starts_with("macro") {
            let mut j = i + "macro".len();
            while j < b.len() && b[j] == b' ' {
                j += 1;
            }
            if b.get(j) == Some(&b'(') {
                j += 1;
                while j < b.len() && b[j] == b' ' {
                    j += 1;
                }
                let name_start = j;
                while j < b.len() && is_ident_byte(b[j]) {
                    j += 1;
                }
                let name_end = j;
                while j < b.len() && b[j] == b' ' {
                    j += 1;
                }
                if name_end > name_start && b.get(j) == Some(&b')') {
                    return Some(MacroRef {
                        start: i,
                        end: j + 1,
                        name: &text[name_start..name_end],
                    });
                }
            }
        }
        i += 1;
    }
    None
}
