//! Decorated markup for the built documentation.
//!
//! Keywords, operators, numbers, predicates and comments are wrapped in
//! `[vu-*]##...##` roles, API names get their cross-reference macro and
//! feature names link to the feature table. [`undecorate`] reverses all of
//! it so the output can be checked against the AST it came from.

use vu_toolchain_registry::ApiRegistry;

use super::{NameRole, Styler};
use crate::extract::TypeExtractor;

/// Cross-reference macros [`undecorate`] removes.
const LINK_MACROS: &[&str] = &[
    "pname", "sname", "slink", "elink", "ename", "tlink", "dlink", "flink", "basetype", "apiext",
];

/// Styler for the built documentation.
#[derive(Debug, Clone, Copy)]
pub struct OutputStyler<'r> {
    extractor: TypeExtractor<'r>,
}

impl<'r> OutputStyler<'r> {
    /// Create a styler for VUs documenting `api`.
    pub fn new(registry: &'r ApiRegistry, api: &'r str) -> Self {
        Self {
            extractor: TypeExtractor::new(registry, api),
        }
    }

    /// Cross-referenced spelling of a name, or `None` for locals and other
    /// names without a reference target.
    pub fn link(&self, id: &str, role: NameRole) -> Option<String> {
        if role == NameRole::Feature {
            return Some(format!("<<features-{id},{id}>>"));
        }
        if id == "NULL" {
            return None;
        }
        if self.extractor.is_subject_symbol(id) {
            return Some(format!("pname:{id}"));
        }
        self.extractor
            .registry()
            .link_macro(id)
            .map(|m| format!("{m}:{id}"))
    }
}

fn role(role: &str, text: &str) -> String {
    format!("[vu-{role}]##{text}##")
}

impl Styler for OutputStyler<'_> {
    fn prologue(&self) -> &str {
        "[vu]#"
    }
    fn epilogue(&self) -> &str {
        "#"
    }
    fn end_of_line(&self) -> &str {
        " +\n"
    }
    fn space(&self) -> &str {
        "&nbsp;"
    }
    fn open_paren(&self) -> &str {
        "&lpar;"
    }
    fn close_paren(&self) -> &str {
        "&rpar;"
    }
    fn open_bracket(&self) -> &str {
        "&lsqb;"
    }
    fn close_bracket(&self) -> &str {
        "&rsqb;"
    }
    fn keyword(&self, keyword: &str) -> String {
        role("keyword", keyword)
    }
    fn operator(&self, op: &str) -> String {
        role("operator", op)
    }
    fn number(&self, text: &str) -> String {
        role("number", text)
    }
    fn literal(&self, text: &str) -> String {
        if text.starts_with('\'') {
            text.to_string()
        } else {
            role("keyword", text)
        }
    }
    fn name(&self, id: &str, role: NameRole) -> String {
        self.link(id, role).unwrap_or_else(|| id.to_string())
    }
    fn predicate(&self, name: &str) -> String {
        role("predicate", &format!("<<vu-predicate-{name},{name}>>"))
    }
    fn comment(&self, text: &str) -> String {
        role("comment", &format!("&#x23; {text}"))
    }
}

/// Strip Output decorations, giving back VU source text with `# comment`
/// lines.
pub fn undecorate(text: &str) -> String {
    let text = text
        .strip_prefix("[vu]#")
        .and_then(|t| t.strip_suffix('#'))
        .unwrap_or(text);
    let text = text.replace(" +\n", "\n");
    let text = strip_roles(&text);
    let text = strip_xrefs(&text);
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lpar;", "(")
        .replace("&rpar;", ")")
        .replace("&lsqb;", "[")
        .replace("&rsqb;", "]")
        .replace("&#x23;", "#");
    strip_link_macros(&text)
}

/// `[vu-role]##text##` → `text`.
fn strip_roles(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("[vu-") {
        let Some(open) = rest[start..].find("]##").map(|i| start + i + 3) else {
            break;
        };
        let Some(close) = rest[open..].find("##").map(|i| open + i) else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&rest[open..close]);
        rest = &rest[close + 2..];
    }
    out.push_str(rest);
    out
}

/// `<<target,text>>` → `text`.
fn strip_xrefs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<<") {
        let Some(end) = rest[start..].find(">>").map(|i| start + i) else {
            break;
        };
        let inner = &rest[start + 2..end];
        out.push_str(&rest[..start]);
        out.push_str(inner.rsplit(',').next().unwrap_or(inner));
        rest = &rest[end + 2..];
    }
    out.push_str(rest);
    out
}

/// `slink:VkFoo` → `VkFoo`.
fn strip_link_macros(text: &str) -> String {
    let is_ident = |c: char| c == '_' || c.is_ascii_alphanumeric();
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(|c: char| c.is_ascii_alphabetic()) {
        let preceded_by_ident = out
            .chars()
            .last()
            .or_else(|| rest[..start].chars().last())
            .is_some_and(|c| is_ident(c) && start == 0);
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let end = rest.find(|c: char| !is_ident(c)).unwrap_or(rest.len());
        let word = &rest[..end];
        let after = &rest[end..];
        let is_macro = !preceded_by_ident
            && LINK_MACROS.contains(&word)
            && after.starts_with(':')
            && after[1..].starts_with(is_ident);
        if is_macro {
            rest = &after[1..];
        } else {
            out.push_str(word);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}
