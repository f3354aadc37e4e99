//! English prose rendering of VUs.
//!
//! Statements become nested asciidoc bullets. Conditions are phrased with
//! [`VuLanguageEn`], which tracks whether the condition is expected to hold
//! and whether it is a requirement (`must:`) or a test. `not` flips the
//! expectation, and `and`/`or` pick their quantifier by De Morgan so that
//! the listed items are always phrased as statements that hold.
//!
//! Expressions with no phrasing fall back to their source text in
//! backticks. Text output is lossy and is not round-trip checked.

use vu_toolchain_registry::ApiRegistry;

use super::{NameRole, OutputStyler, expr_source, stmt_source};
use crate::grammar::ast::{BoolOp, CmpOp, Constant, Expr, ExprKind, Module, Stmt, StmtKind, UnaryOp};
use crate::predicates::{AttrPredicate, Predicate};

/// Phrasing of one condition in English.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VuLanguageEn {
    /// Whether the condition is expected to hold.
    pub expect_true: bool,
    /// Whether the condition is a requirement rather than a test.
    pub must: bool,
}

impl VuLanguageEn {
    /// A test, as in the condition of an `if`.
    pub fn condition() -> Self {
        Self {
            expect_true: true,
            must: false,
        }
    }

    /// A requirement, as in the argument of `require`.
    pub fn requirement() -> Self {
        Self {
            expect_true: true,
            must: true,
        }
    }

    /// The same phrasing with the expectation flipped.
    pub fn negated(self) -> Self {
        Self {
            expect_true: !self.expect_true,
            ..self
        }
    }

    fn relaxed(self) -> Self {
        Self {
            must: false,
            ..self
        }
    }

    /// `is`, `is not`, `must: be` or `must: not be`.
    pub fn be(self) -> &'static str {
        match (self.must, self.expect_true) {
            (false, true) => "is",
            (false, false) => "is not",
            (true, true) => "must: be",
            (true, false) => "must: not be",
        }
    }

    /// Fallback for a value used as a condition.
    pub fn truth(self) -> &'static str {
        match (self.must, self.expect_true) {
            (false, true) => "is true",
            (false, false) => "is false",
            (true, true) => "must: be true",
            (true, false) => "must: be false",
        }
    }

    /// Verb for bit and chain membership.
    pub fn include(self) -> &'static str {
        match (self.must, self.expect_true) {
            (false, true) => "includes",
            (false, false) => "does not include",
            (true, true) => "must: include",
            (true, false) => "must: not include",
        }
    }

    fn have(self) -> &'static str {
        match (self.must, self.expect_true) {
            (false, true) => "has",
            (false, false) => "does not have",
            (true, true) => "must: have",
            (true, false) => "must: not have",
        }
    }

    fn at_least(self) -> &'static str {
        match (self.must, self.expect_true) {
            (false, true) => "is at least",
            (false, false) => "is less than",
            (true, true) => "must: be at least",
            (true, false) => "must: be less than",
        }
    }

    /// Phrase for an ordering or equality comparison, without its operands.
    ///
    /// A negated comparison is phrased with the opposite operator.
    pub fn relation(self, op: CmpOp) -> Option<String> {
        let op = if self.expect_true {
            op
        } else {
            match op {
                CmpOp::Eq => CmpOp::NotEq,
                CmpOp::NotEq => CmpOp::Eq,
                CmpOp::Lt => CmpOp::GtE,
                CmpOp::GtE => CmpOp::Lt,
                CmpOp::LtE => CmpOp::Gt,
                CmpOp::Gt => CmpOp::LtE,
                _ => return None,
            }
        };
        let relation = match op {
            CmpOp::Eq => "equal to",
            CmpOp::NotEq => "equal to",
            CmpOp::Lt => "less than",
            CmpOp::LtE => "less than or equal to",
            CmpOp::Gt => "greater than",
            CmpOp::GtE => "greater than or equal to",
            _ => return None,
        };
        let positive = Self {
            expect_true: op != CmpOp::NotEq,
            must: self.must,
        };
        Some(format!("{} {relation}", positive.be()))
    }

    /// Phrase for a comparison against `NULL`.
    pub fn null(self, op: CmpOp) -> Option<String> {
        let equal = match op {
            CmpOp::Eq | CmpOp::Is => true,
            CmpOp::NotEq | CmpOp::IsNot => false,
            _ => return None,
        };
        let lang = Self {
            expect_true: equal == self.expect_true,
            must: self.must,
        };
        Some(format!("{} `NULL`", lang.be()))
    }

    /// Header introducing the operands of `and`/`or`.
    pub fn quantifier(self, op: BoolOp) -> String {
        let all = matches!(
            (op, self.expect_true),
            (BoolOp::And, true) | (BoolOp::Or, false)
        );
        let quantifier = if all { "all" } else { "any" };
        let verb = if self.must { "must: be true" } else { "are true" };
        format!("{quantifier} of the following {verb}:")
    }
}

/// Renders a VU as English bullets.
pub struct TextRenderer<'r> {
    links: OutputStyler<'r>,
    lines: Vec<String>,
}

impl<'r> TextRenderer<'r> {
    /// Create a renderer for VUs documenting `api`.
    pub fn new(registry: &'r ApiRegistry, api: &'r str) -> Self {
        Self {
            links: OutputStyler::new(registry, api),
            lines: Vec::new(),
        }
    }

    /// Render a whole VU.
    pub fn render(mut self, module: &Module) -> String {
        self.block(&module.body, 1);
        self.lines.join("\n")
    }

    fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        self.lines
            .push(format!("{} {}", "*".repeat(depth), text.as_ref()));
    }

    fn block(&mut self, body: &[Stmt], depth: usize) {
        for stmt in body {
            self.stmt(stmt, depth);
        }
    }

    fn stmt(&mut self, stmt: &Stmt, depth: usize) {
        if let Some(text) = stmt.comment_text() {
            self.line(depth, format!("_{text}_"));
            return;
        }
        match &stmt.kind {
            StmtKind::Assign { targets, value } if targets.len() == 1 => {
                let text = format!("let {} be {}", self.leaf(&targets[0]), self.leaf(value));
                self.line(depth, text);
            }
            StmtKind::If { test, body, orelse } => {
                let (cond, lang) = peel_not(test, VuLanguageEn::condition());
                if let ExprKind::BoolOp { op, values } = &cond.kind {
                    self.line(depth, format!("if {}", lang.quantifier(*op)));
                    for value in values {
                        self.condition(value, depth + 1, lang);
                    }
                } else {
                    let truth = if lang.expect_true { "true" } else { "false" };
                    self.line(depth, format!("if the following is {truth}:"));
                    self.condition(cond, depth + 1, VuLanguageEn::condition());
                }
                self.line(depth, "then:");
                self.block(body, depth + 1);
                if !orelse.is_empty() {
                    self.line(depth, "otherwise:");
                    self.block(orelse, depth + 1);
                }
            }
            StmtKind::For {
                target, iter, body, ..
            } => {
                let text = format!(
                    "for each element {} of {}:",
                    self.leaf(target),
                    self.leaf(iter)
                );
                self.line(depth, text);
                self.block(body, depth + 1);
            }
            StmtKind::Expr { value } => match require_argument(value) {
                Some(arg) => self.condition(arg, depth, VuLanguageEn::requirement()),
                None => {
                    let text = self.leaf(value);
                    self.line(depth, text);
                }
            },
            _ => self.line(depth, format!("`{}`", flatten(&stmt_source(stmt)))),
        }
    }

    fn condition(&mut self, expr: &Expr, depth: usize, lang: VuLanguageEn) {
        match &expr.kind {
            ExprKind::UnaryOp {
                op: UnaryOp::Not,
                operand,
            } => self.condition(operand, depth, lang.negated()),
            ExprKind::BoolOp { op, values } => {
                self.line(depth, lang.quantifier(*op));
                for value in values {
                    self.condition(value, depth + 1, lang.relaxed());
                }
            }
            _ => {
                let text = self.phrase(expr, lang);
                self.line(depth, text);
            }
        }
    }

    fn phrase(&self, expr: &Expr, lang: VuLanguageEn) -> String {
        self.predicate_phrase(expr, lang)
            .unwrap_or_else(|| format!("{} {}", self.leaf(expr), lang.truth()))
    }

    fn predicate_phrase(&self, expr: &Expr, lang: VuLanguageEn) -> Option<String> {
        match &expr.kind {
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => match (ops.as_slice(), comparators.as_slice()) {
                ([op], [right]) if right.as_name() == Some("NULL") => {
                    Some(format!("{} {}", self.leaf(left), lang.null(*op)?))
                }
                ([op], [right]) => {
                    let relation = lang.relation(*op)?;
                    Some(format!("{} {relation} {}", self.leaf(left), self.leaf(right)))
                }
                _ => None,
            },
            ExprKind::Call { func, args } => match &func.kind {
                ExprKind::Name { id } => self.call_phrase(Predicate::from_name(id)?, args, lang),
                ExprKind::Attribute { value, attr } => {
                    self.method_phrase(value, AttrPredicate::from_name(attr)?, args, lang)
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn call_phrase(&self, predicate: Predicate, args: &[Expr], lang: VuLanguageEn) -> Option<String> {
        let phrase = match (predicate, args) {
            (Predicate::IsExtEnabled, [ext]) => {
                format!("the apiext:{} extension {} enabled", ext.as_name()?, lang.be())
            }
            (Predicate::IsFeatureEnabled, [feature]) => {
                let link = self.links.link(feature.as_name()?, NameRole::Feature)?;
                format!("the {link} feature {} enabled", lang.be())
            }
            (Predicate::IsVersion, [major, minor]) => {
                format!(
                    "the API version {} {}.{}",
                    lang.at_least(),
                    as_int(major)?,
                    as_int(minor)?
                )
            }
            (Predicate::HasPnext, [s]) => format!(
                "the pname:pNext chain {} a {} structure",
                lang.include(),
                self.leaf(s)
            ),
            (Predicate::ExternallySynchronized, [x]) => {
                format!("{} {} externally synchronized", self.leaf(x), lang.be())
            }
            _ => return None,
        };
        Some(phrase)
    }

    fn method_phrase(
        &self,
        receiver: &Expr,
        predicate: AttrPredicate,
        args: &[Expr],
        lang: VuLanguageEn,
    ) -> Option<String> {
        let subject = self.leaf(receiver);
        let phrase = match (predicate, args) {
            (AttrPredicate::Valid, []) => format!("{subject} {} a valid handle", lang.be()),
            (AttrPredicate::HasBit, [bit]) => {
                format!("{subject} {} {}", lang.include(), self.leaf(bit))
            }
            (AttrPredicate::HasPnext, [s]) => format!(
                "the pname:pNext chain of {subject} {} a {} structure",
                lang.include(),
                self.leaf(s)
            ),
            (AttrPredicate::Any, []) => format!("{subject} {} at least one bit set", lang.have()),
            (AttrPredicate::None, []) => {
                format!("{subject} {} at least one bit set", lang.negated().have())
            }
            _ => return None,
        };
        Some(phrase)
    }

    fn leaf(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Name { id } if id == "NULL" => "`NULL`".to_string(),
            ExprKind::Name { id } => self
                .links
                .link(id, NameRole::Value)
                .unwrap_or_else(|| format!("pname:{id}")),
            ExprKind::Constant {
                value: Constant::Int(v),
            } => v.to_string(),
            _ => format!("`{}`", flatten(&expr_source(expr))),
        }
    }
}

fn peel_not(expr: &Expr, lang: VuLanguageEn) -> (&Expr, VuLanguageEn) {
    match &expr.kind {
        ExprKind::UnaryOp {
            op: UnaryOp::Not,
            operand,
        } => peel_not(operand, lang.negated()),
        _ => (expr, lang),
    }
}

fn require_argument(expr: &Expr) -> Option<&Expr> {
    match &expr.kind {
        ExprKind::Call { func, args } if func.as_name() == Some(Predicate::Require.name()) => {
            match args.as_slice() {
                [arg] => Some(arg),
                _ => None,
            }
        }
        _ => None,
    }
}

fn as_int(expr: &Expr) -> Option<u64> {
    match expr.kind {
        ExprKind::Constant {
            value: Constant::Int(v),
        } => Some(v),
        _ => None,
    }
}

/// Source text on one line.
fn flatten(source: &str) -> String {
    source
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a VU as English bullets.
pub fn format_text(module: &Module, registry: &ApiRegistry, api: &str) -> String {
    TextRenderer::new(registry, api).render(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parser::parse_vu;
    use crate::grammar::source::retain_comments;
    use std::collections::BTreeMap;
    use vu_toolchain_registry::{Category, Entity, Member};

    const SUBJECT: &str = "VkSubpassDescriptionDepthStencilResolve";

    fn registry() -> ApiRegistry {
        let member = |name: &str, ty: &str, pointer: u32| Member {
            name: name.into(),
            type_name: ty.into(),
            pointer,
            len: None,
            fixed_len: None,
        };
        ApiRegistry::new(
            vec![Entity {
                name: SUBJECT.into(),
                category: Category::Struct,
                members: vec![
                    member("depthResolveMode", "VkResolveModeFlagBits", 0),
                    member("stencilResolveMode", "VkResolveModeFlagBits", 0),
                    member("pDepthStencilResolveAttachment", "VkAttachmentReference2", 1),
                ],
                alias_of: None,
                requires: None,
                extends: Vec::new(),
            }],
            BTreeMap::from([
                ("VK_RESOLVE_MODE_MAX_BIT".into(), "VkResolveModeFlagBits".into()),
                ("VK_RESOLVE_MODE_NONE".into(), "VkResolveModeFlagBits".into()),
            ]),
            BTreeMap::new(),
            Vec::new(),
        )
    }

    fn text(src: &str) -> String {
        let reg = registry();
        let module = parse_vu(&retain_comments(src)).unwrap();
        format_text(&module, &reg, SUBJECT)
    }

    #[test]
    fn conditional_requirement() {
        assert_eq!(
            text("if depthResolveMode == VK_RESOLVE_MODE_MAX_BIT:\n  require(stencilResolveMode == VK_RESOLVE_MODE_MAX_BIT)"),
            [
                "* if the following is true:",
                "** pname:depthResolveMode is equal to ename:VK_RESOLVE_MODE_MAX_BIT",
                "* then:",
                "** pname:stencilResolveMode must: be equal to ename:VK_RESOLVE_MODE_MAX_BIT",
            ]
            .join("\n")
        );
    }

    #[test]
    fn negation_flips_the_phrasing() {
        assert_eq!(
            text("require(not depthResolveMode < 2)"),
            "* pname:depthResolveMode must: be greater than or equal to 2"
        );
        assert_eq!(
            text("require(pDepthStencilResolveAttachment != NULL)"),
            "* pname:pDepthStencilResolveAttachment must: not be `NULL`"
        );
        assert_eq!(
            text("if not pDepthStencilResolveAttachment == NULL:\n  require(x)"),
            [
                "* if the following is false:",
                "** pname:pDepthStencilResolveAttachment is `NULL`",
                "* then:",
                "** pname:x must: be true",
            ]
            .join("\n")
        );
    }

    #[test]
    fn bool_ops_use_de_morgan() {
        assert_eq!(
            text("require(not (depthResolveMode == VK_RESOLVE_MODE_NONE and stencilResolveMode == VK_RESOLVE_MODE_NONE))"),
            [
                "* any of the following must: be true:",
                "** pname:depthResolveMode is not equal to ename:VK_RESOLVE_MODE_NONE",
                "** pname:stencilResolveMode is not equal to ename:VK_RESOLVE_MODE_NONE",
            ]
            .join("\n")
        );
        assert_eq!(
            text("if a or b:\n  require(c)\nelse:\n  require(d)"),
            [
                "* if any of the following are true:",
                "** pname:a is true",
                "** pname:b is true",
                "* then:",
                "** pname:c must: be true",
                "* otherwise:",
                "** pname:d must: be true",
            ]
            .join("\n")
        );
    }

    #[test]
    fn predicates() {
        assert_eq!(
            text("require(is_feature_enabled(robustBufferAccess))"),
            "* the <<features-robustBufferAccess,robustBufferAccess>> feature must: be enabled"
        );
        assert_eq!(
            text("require(not is_ext_enabled(VK_KHR_maintenance1))"),
            "* the apiext:VK_KHR_maintenance1 extension must: not be enabled"
        );
        assert_eq!(
            text("if is_version(1, 2):\n  require(flags.has_bit(VK_RESOLVE_MODE_MAX_BIT))"),
            [
                "* if the following is true:",
                "** the API version is at least 1.2",
                "* then:",
                "** pname:flags must: include ename:VK_RESOLVE_MODE_MAX_BIT",
            ]
            .join("\n")
        );
        assert_eq!(text("require(image.valid())"), "* pname:image must: be a valid handle");
        assert_eq!(
            text("require(not pInfo.has_pnext(VkFoo))"),
            "* the pname:pNext chain of pname:pInfo must: not include a pname:VkFoo structure"
        );
    }

    #[test]
    fn loops_assignments_and_comments() {
        assert_eq!(
            text("# every attachment\nfor a in pAttachments:\n  n = a.count\n  require(n > 0)"),
            [
                "* _every attachment_",
                "* for each element pname:a of pname:pAttachments:",
                "** let pname:n be `a.count`",
                "** pname:n must: be greater than 0",
            ]
            .join("\n")
        );
    }

    #[test]
    fn unphrased_expressions_fall_back_to_source() {
        assert_eq!(
            text("require(a.count + 1 <= len(b))"),
            "* `a.count + 1` must: be less than or equal to `len(b)`"
        );
        assert_eq!(text("require(a in b)"), "* `a in b` must: be true");
    }
}
