//! VU formatters.
//!
//! One AST walker, [`Formatter`], renders VUs through a pluggable
//! [`Styler`]. The Source styler reproduces canonical VU markup, the Output
//! styler decorates it with cross-references for the built documentation.
//! English prose is produced by the [`text`] renderer, which reuses the
//! walker for the expressions it cannot phrase.
//!
//! Layout rules shared by every styler:
//!
//! - blocks indent by [`SOURCE_INDENT`] spaces;
//! - `and`/`or` always carry parentheses and put every operand after the
//!   first on its own line, four columns past the opening parenthesis;
//! - a call whose only argument is an `and`/`or` borrows its parentheses.

mod output;
mod round_trip;
mod source;
pub mod text;

pub use output::{OutputStyler, undecorate};
pub use round_trip::{RoundTripError, RoundTripFailure, assert_round_trip};
pub use source::SourceStyler;
pub use text::{TextRenderer, VuLanguageEn, format_text};

use serde::{Deserialize, Serialize};
use vu_toolchain_registry::ApiRegistry;

use crate::grammar::ast::{
    BinOp, Constant, Expr, ExprKind, Module, Stmt, StmtKind, UnaryOp,
};
use crate::grammar::source::SOURCE_INDENT;
use crate::predicates::{AttrPredicate, Predicate};

/// Extra indentation of continuation lines inside parentheses.
const PAREN_INDENT: usize = 4;

/// Which surface form to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatStyle {
    /// Canonical VU source.
    #[default]
    Source,
    /// Decorated markup for the built documentation.
    Output,
    /// English prose.
    Text,
}

impl std::fmt::Display for FormatStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatStyle::Source => write!(f, "source"),
            FormatStyle::Output => write!(f, "output"),
            FormatStyle::Text => write!(f, "text"),
        }
    }
}

/// How a name is used, so stylers can pick the right cross-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRole {
    /// A value: local, subject member or API token.
    Value,
    /// The argument of `is_feature_enabled`.
    Feature,
}

/// Rendering primitives that parameterize [`Formatter`].
///
/// Every method has the Source rendering as its default.
pub trait Styler {
    /// Emitted before the first statement.
    fn prologue(&self) -> &str {
        ""
    }
    /// Emitted after the last statement.
    fn epilogue(&self) -> &str {
        ""
    }
    /// Line terminator between statements and continuation lines.
    fn end_of_line(&self) -> &str {
        "\n"
    }
    /// One column of indentation.
    fn space(&self) -> &str {
        " "
    }
    /// Opening parenthesis.
    fn open_paren(&self) -> &str {
        "("
    }
    /// Closing parenthesis.
    fn close_paren(&self) -> &str {
        ")"
    }
    /// Opening bracket.
    fn open_bracket(&self) -> &str {
        "["
    }
    /// Closing bracket.
    fn close_bracket(&self) -> &str {
        "]"
    }
    /// `if`, `else`, `for`, ...
    fn keyword(&self, keyword: &str) -> String {
        keyword.to_string()
    }
    /// Operators, including `and`, `or`, `not` and `in`.
    fn operator(&self, op: &str) -> String {
        op.to_string()
    }
    /// Numeric literal, already spelled.
    fn number(&self, text: &str) -> String {
        text.to_string()
    }
    /// `True`, `False`, `None` and string literals, already spelled.
    fn literal(&self, text: &str) -> String {
        text.to_string()
    }
    /// A name.
    fn name(&self, id: &str, _role: NameRole) -> String {
        id.to_string()
    }
    /// Name of a called predicate.
    fn predicate(&self, name: &str) -> String {
        name.to_string()
    }
    /// A retained comment.
    fn comment(&self, text: &str) -> String {
        format!("# {text}")
    }
}

/// Walks an AST and renders it through a [`Styler`].
pub struct Formatter<'s> {
    styler: &'s dyn Styler,
    out: String,
    indent: usize,
}

impl<'s> Formatter<'s> {
    /// Create a formatter.
    pub fn new(styler: &'s dyn Styler) -> Self {
        Self {
            styler,
            out: String::new(),
            indent: 0,
        }
    }

    /// Render a whole VU.
    pub fn format_module(mut self, module: &Module) -> String {
        self.out.push_str(self.styler.prologue());
        self.body(&module.body);
        self.out.push_str(self.styler.epilogue());
        self.out
    }

    /// Render one statement, including nested blocks.
    pub fn format_stmt(mut self, stmt: &Stmt) -> String {
        self.stmt(stmt);
        self.out
    }

    /// Render one expression.
    pub fn format_expr(mut self, expr: &Expr) -> String {
        self.expr(expr);
        self.out
    }

    // ── Layout ──────────────────────────────────────────────────────────

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn begin_line(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str(self.styler.space());
        }
    }

    fn end_line(&mut self) {
        self.out.push_str(self.styler.end_of_line());
    }

    fn begin_paren(&mut self) {
        self.out.push_str(self.styler.open_paren());
        self.indent += PAREN_INDENT;
    }

    fn end_paren(&mut self) {
        self.indent -= PAREN_INDENT;
        self.out.push_str(self.styler.close_paren());
    }

    fn keyword(&mut self, kw: &str) {
        let s = self.styler.keyword(kw);
        self.push(&s);
    }

    fn operator(&mut self, op: &str) {
        let s = self.styler.operator(op);
        self.push(&s);
    }

    // ── Statements ──────────────────────────────────────────────────────

    fn body(&mut self, body: &[Stmt]) {
        for (i, stmt) in body.iter().enumerate() {
            if i > 0 {
                self.end_line();
            }
            self.begin_line();
            self.stmt(stmt);
        }
    }

    fn scope(&mut self, body: &[Stmt]) {
        self.indent += SOURCE_INDENT;
        for stmt in body {
            self.end_line();
            self.begin_line();
            self.stmt(stmt);
        }
        self.indent -= SOURCE_INDENT;
    }

    fn stmt(&mut self, stmt: &Stmt) {
        if let Some(text) = stmt.comment_text() {
            let s = self.styler.comment(text);
            self.push(&s);
            return;
        }
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                for target in targets {
                    self.expr(target);
                    self.push(" ");
                    self.operator("=");
                    self.push(" ");
                }
                self.expr(value);
            }
            StmtKind::AugAssign { target, op, value } => {
                self.expr(target);
                self.push(" ");
                self.operator(&format!("{}=", op.as_str()));
                self.push(" ");
                self.expr(value);
            }
            StmtKind::If { test, body, orelse } => self.if_chain("if", test, body, orelse),
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                self.keyword("for");
                self.push(" ");
                self.expr(target);
                self.push(" ");
                self.operator("in");
                self.push(" ");
                self.expr(iter);
                self.push(":");
                self.scope(body);
                self.else_block(orelse);
            }
            StmtKind::While { test, body, orelse } => {
                self.keyword("while");
                self.push(" ");
                self.expr(test);
                self.push(":");
                self.scope(body);
                self.else_block(orelse);
            }
            StmtKind::Expr { value } => self.expr(value),
            StmtKind::Pass => self.keyword("pass"),
            StmtKind::Break => self.keyword("break"),
            StmtKind::Continue => self.keyword("continue"),
        }
    }

    fn if_chain(&mut self, keyword: &str, test: &Expr, body: &[Stmt], orelse: &[Stmt]) {
        self.keyword(keyword);
        self.push(" ");
        self.expr(test);
        self.push(":");
        self.scope(body);
        if let [
            Stmt {
                kind:
                    StmtKind::If {
                        test,
                        body,
                        orelse,
                    },
                ..
            },
        ] = orelse
        {
            self.end_line();
            self.begin_line();
            self.if_chain("elif", test, body, orelse);
        } else {
            self.else_block(orelse);
        }
    }

    fn else_block(&mut self, orelse: &[Stmt]) {
        if orelse.is_empty() {
            return;
        }
        self.end_line();
        self.begin_line();
        self.keyword("else");
        self.push(":");
        self.scope(orelse);
    }

    // ── Expressions ─────────────────────────────────────────────────────

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::BoolOp { op, values } => {
                self.begin_paren();
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(" ");
                        self.operator(op.as_str());
                        self.end_line();
                        self.begin_line();
                    }
                    if matches!(value.kind, ExprKind::IfExp { .. }) {
                        self.parenthesized(value);
                    } else {
                        self.expr(value);
                    }
                }
                self.end_paren();
            }
            ExprKind::BinOp { left, op, right } => {
                self.binop_operand(left, *op, Side::Left);
                self.push(" ");
                self.operator(op.as_str());
                self.push(" ");
                self.binop_operand(right, *op, Side::Right);
            }
            ExprKind::UnaryOp { op, operand } => {
                self.operator(op.as_str());
                if *op == UnaryOp::Not {
                    self.push(" ");
                }
                self.maybe_parenthesized(operand);
            }
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => {
                self.compare_operand(left);
                for (op, right) in ops.iter().zip(comparators) {
                    self.push(" ");
                    self.operator(op.as_str());
                    self.push(" ");
                    self.compare_operand(right);
                }
            }
            ExprKind::Call { func, args } => self.call(func, args),
            ExprKind::Attribute { value, attr } => {
                self.primary(value);
                self.push(".");
                self.push(attr);
            }
            ExprKind::Subscript { value, index } => {
                self.primary(value);
                self.out.push_str(self.styler.open_bracket());
                self.expr(index);
                self.out.push_str(self.styler.close_bracket());
            }
            ExprKind::IfExp { test, body, orelse } => {
                self.if_exp_operand(body);
                self.push(" ");
                self.keyword("if");
                self.push(" ");
                self.if_exp_operand(test);
                self.push(" ");
                self.keyword("else");
                self.push(" ");
                self.if_exp_operand(orelse);
            }
            ExprKind::Name { id } => {
                let s = self.styler.name(id, NameRole::Value);
                self.push(&s);
            }
            ExprKind::Constant { value } => self.constant(value),
            ExprKind::Tuple { elts } => {
                self.out.push_str(self.styler.open_paren());
                self.comma_separated(elts);
                if elts.len() == 1 {
                    self.push(",");
                }
                self.out.push_str(self.styler.close_paren());
            }
            ExprKind::List { elts } => {
                self.out.push_str(self.styler.open_bracket());
                self.comma_separated(elts);
                self.out.push_str(self.styler.close_bracket());
            }
            ExprKind::Slice { lower, upper, step } => {
                if let Some(lower) = lower {
                    self.expr(lower);
                }
                self.push(":");
                if let Some(upper) = upper {
                    self.expr(upper);
                }
                if let Some(step) = step {
                    self.push(":");
                    self.expr(step);
                }
            }
        }
    }

    fn call(&mut self, func: &Expr, args: &[Expr]) {
        match &func.kind {
            ExprKind::Name { id } if Predicate::from_name(id).is_some() => {
                let s = self.styler.predicate(id);
                self.push(&s);
            }
            ExprKind::Attribute { value, attr } if AttrPredicate::from_name(attr).is_some() => {
                self.primary(value);
                self.push(".");
                let s = self.styler.predicate(attr);
                self.push(&s);
            }
            _ => self.primary(func),
        }
        let is_feature = func.as_name() == Some(Predicate::IsFeatureEnabled.name());
        if let [arg @ Expr { kind: ExprKind::BoolOp { .. }, .. }] = args {
            self.expr(arg);
            return;
        }
        self.begin_paren();
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            match &arg.kind {
                ExprKind::Name { id } if is_feature => {
                    let s = self.styler.name(id, NameRole::Feature);
                    self.push(&s);
                }
                _ => self.expr(arg),
            }
        }
        self.end_paren();
    }

    fn comma_separated(&mut self, elts: &[Expr]) {
        for (i, e) in elts.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(e);
        }
    }

    fn constant(&mut self, value: &Constant) {
        let s = match value {
            Constant::Bool(true) => self.styler.literal("True"),
            Constant::Bool(false) => self.styler.literal("False"),
            Constant::None => self.styler.literal("None"),
            Constant::Int(v) => self.styler.number(&v.to_string()),
            Constant::Float(v) => self.styler.number(&format!("{v:?}")),
            Constant::Str(s) => self.styler.literal(&quote(s)),
        };
        self.push(&s);
    }

    fn parenthesized(&mut self, expr: &Expr) {
        self.begin_paren();
        self.expr(expr);
        self.end_paren();
    }

    /// Operand of a unary or binary operator or a comparison.
    fn maybe_parenthesized(&mut self, expr: &Expr) {
        let bare = match &expr.kind {
            ExprKind::Call { .. }
            | ExprKind::Attribute { .. }
            | ExprKind::Subscript { .. }
            | ExprKind::Name { .. }
            | ExprKind::Constant { .. }
            | ExprKind::BoolOp { .. }
            | ExprKind::List { .. }
            | ExprKind::Tuple { .. } => true,
            ExprKind::UnaryOp { op, .. } => *op != UnaryOp::Not,
            _ => false,
        };
        if bare {
            self.expr(expr);
        } else {
            self.parenthesized(expr);
        }
    }

    /// Receiver of `.attr`, `[index]` or a call.
    fn primary(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Call { .. }
            | ExprKind::Attribute { .. }
            | ExprKind::Subscript { .. }
            | ExprKind::Name { .. }
            | ExprKind::BoolOp { .. }
            | ExprKind::List { .. }
            | ExprKind::Tuple { .. } => self.expr(expr),
            _ => self.parenthesized(expr),
        }
    }

    fn binop_operand(&mut self, operand: &Expr, parent: BinOp, side: Side) {
        use BinOp::*;
        let ExprKind::BinOp { op: child, .. } = &operand.kind else {
            // `-a ** b` is `-(a ** b)`
            if parent == Pow
                && matches!(side, Side::Left)
                && matches!(operand.kind, ExprKind::UnaryOp { .. })
            {
                self.parenthesized(operand);
            } else {
                self.maybe_parenthesized(operand);
            }
            return;
        };
        let additive = |op: BinOp| matches!(op, Add | Sub);
        let multiplicative = |op: BinOp| matches!(op, Mult | Div | Mod);
        let bare = match side {
            Side::Left => {
                (additive(*child) && additive(parent))
                    || (multiplicative(*child) && (additive(parent) || multiplicative(parent)))
            }
            Side::Right => multiplicative(*child) && additive(parent),
        };
        if bare {
            self.expr(operand);
        } else {
            self.parenthesized(operand);
        }
    }

    fn compare_operand(&mut self, operand: &Expr) {
        if matches!(operand.kind, ExprKind::BinOp { .. }) {
            self.expr(operand);
        } else {
            self.maybe_parenthesized(operand);
        }
    }

    fn if_exp_operand(&mut self, operand: &Expr) {
        if matches!(operand.kind, ExprKind::IfExp { .. }) {
            self.parenthesized(operand);
        } else {
            self.expr(operand);
        }
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Single-quoted string literal that re-parses to `s`.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

// ── Convenience entry points ────────────────────────────────────────────

/// Render a VU as canonical source.
pub fn format_source(module: &Module) -> String {
    Formatter::new(&SourceStyler).format_module(module)
}

/// Render a VU as decorated documentation markup, checking that the markup
/// still describes `module`.
pub fn format_output(
    module: &Module,
    registry: &ApiRegistry,
    api: &str,
) -> Result<String, RoundTripError> {
    let out = Formatter::new(&OutputStyler::new(registry, api)).format_module(module);
    assert_round_trip(module, &out, FormatStyle::Output)?;
    Ok(out)
}

/// Render a VU in any style. Source and Output renderings are round-trip
/// checked.
pub fn format_vu(
    module: &Module,
    style: FormatStyle,
    registry: &ApiRegistry,
    api: &str,
) -> Result<String, RoundTripError> {
    match style {
        FormatStyle::Source => {
            let out = format_source(module);
            assert_round_trip(module, &out, style)?;
            Ok(out)
        }
        FormatStyle::Output => format_output(module, registry, api),
        FormatStyle::Text => Ok(format_text(module, registry, api)),
    }
}

/// Source text of one expression, as quoted in diagnostics.
pub fn expr_source(expr: &Expr) -> String {
    Formatter::new(&SourceStyler).format_expr(expr)
}

/// Source text of one statement, as quoted in diagnostics.
pub fn stmt_source(stmt: &Stmt) -> String {
    Formatter::new(&SourceStyler).format_stmt(stmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parser::parse_vu;
    use crate::grammar::source::retain_comments;

    fn fmt(src: &str) -> String {
        let module = parse_vu(&retain_comments(src)).unwrap();
        let out = format_source(&module);
        assert_round_trip(&module, &out, FormatStyle::Source).unwrap();
        out
    }

    #[test]
    fn unary_ops() {
        assert_eq!(fmt("-1"), "-1");
        assert_eq!(fmt("- 1"), "-1");
        assert_eq!(fmt("+1.0"), "+1.0");
        assert_eq!(fmt("~b"), "~b");
        assert_eq!(fmt("not  a"), "not a");
        assert_eq!(fmt("-(a+1)"), "-(a + 1)");
        assert_eq!(fmt("~(a|b)"), "~(a | b)");
        assert_eq!(fmt("not (a and b)"), "not (a and\n    b)");
    }

    #[test]
    fn bool_ops_break_lines() {
        assert_eq!(fmt("a and b"), "(a and\n    b)");
        assert_eq!(fmt("a or b or c or d"), "(a or\n    b or\n    c or\n    d)");
        assert_eq!(fmt("not a and b"), "(not a and\n    b)");
        assert_eq!(fmt("a == b and c != d"), "(a == b and\n    c != d)");
        assert_eq!(
            fmt("a <= b or c > d or (x and y)"),
            "(a <= b or\n    c > d or\n    (x and\n        y))"
        );
    }

    #[test]
    fn comparisons() {
        assert_eq!(fmt("a != b + 1"), "a != b + 1");
        assert_eq!(fmt("a-2 <= b*4"), "a - 2 <= b * 4");
        assert_eq!(fmt("(a != b) == (not c)"), "(a != b) == (not c)");
        assert_eq!(fmt("a == (b == c)"), "a == (b == c)");
    }

    #[test]
    fn binary_op_precedence() {
        assert_eq!(fmt("a + b - c + d"), "a + b - c + d");
        assert_eq!(fmt("a - b / c % d + e"), "a - b / c % d + e");
        assert_eq!(fmt("a * b * c / d / e % f"), "a * b * c / d / e % f");
        assert_eq!(fmt("a % 2**b == -1"), "a % (2 ** b) == -1");
        assert_eq!(fmt("a - (b - c)"), "a - (b - c)");
        assert_eq!(fmt("(-n) ** 2 > 0"), "(-n) ** 2 > 0");
        assert_eq!(fmt("-n ** 2"), "-(n ** 2)");
        assert_eq!(fmt("n ** -2"), "n ** -2");
    }

    #[test]
    fn calls_and_access() {
        assert_eq!(fmt("a = b.f(x)"), "a = b.f(x)");
        assert_eq!(fmt("f(x, -y, z + 1)"), "f(x, -y, z + 1)");
        assert_eq!(fmt("~f(x, y if a else z)"), "~f(x, y if a else z)");
        assert_eq!(fmt("a.f().b[array_index(i)]"), "a.f().b[array_index(i)]");
        assert_eq!(fmt("a[2].f(b[3], c)"), "a[2].f(b[3], c)");
    }

    #[test]
    fn require_borrows_bool_op_parentheses() {
        assert_eq!(fmt("require(a <= b and c > d)"), "require(a <= b and\n    c > d)");
        assert_eq!(
            fmt("require(a <= b or c > d or (x and y))"),
            "require(a <= b or\n    c > d or\n    (x and\n        y))"
        );
        assert_eq!(fmt("require(not (a or not b))"), "require(not (a or\n        not b))");
    }

    #[test]
    fn blocks() {
        assert_eq!(
            fmt("if a == b and c == d and e == f:\n    require(x)"),
            "if (a == b and\n    c == d and\n    e == f):\n  require(x)"
        );
        assert_eq!(
            fmt("if a:\n  x = b and c\n  require(x)"),
            "if a:\n  x = (b and\n      c)\n  require(x)"
        );
        assert_eq!(
            fmt("if (a and not b) or c:\n  require(x)"),
            "if ((a and\n        not b) or\n    c):\n  require(x)"
        );
        let elif = "if a != NULL:\n  if a.f(b) > 1:\n    require(a.f(b) % 4 == 0)\n  elif a.g(b) > 2:\n    require(a.g(b) % 4 == 0)\n    require(a.c > 0)\n  else:\n    require(a.g(b) == 0)";
        assert_eq!(fmt(elif), elif);
        assert_eq!(
            fmt("for info in pInfos:\n if info.pDepthStencil != NULL:\n  require(info.pDepthStencil.handle != VK_NULL_HANDLE)"),
            "for info in pInfos:\n  if info.pDepthStencil != NULL:\n    require(info.pDepthStencil.handle != VK_NULL_HANDLE)"
        );
    }

    #[test]
    fn comments_are_normalized() {
        let src = "#Multiple comment\n#    Lines at the\nif info.has_pnext(VkSwapchainPresentFenceInfoEXT):\n #   And in between\n for fence in info.pnext(VkSwapchainPresentFenceInfoEXT).pFences:\n  require(fence.valid())\n  # Including last line";
        assert_eq!(
            fmt(src),
            "# Multiple comment\n# Lines at the\nif info.has_pnext(VkSwapchainPresentFenceInfoEXT):\n  # And in between\n  for fence in info.pnext(VkSwapchainPresentFenceInfoEXT).pFences:\n    require(fence.valid())\n    # Including last line"
        );
    }

    #[test]
    fn literals() {
        assert_eq!(fmt("require(a == 'it\\'s')"), "require(a == 'it\\'s')");
        assert_eq!(fmt("require(x == 0.5)"), "require(x == 0.5)");
        assert_eq!(fmt("require(x == 0x10)"), "require(x == 16)");
    }

    #[test]
    fn fragments() {
        let module = parse_vu("if a:\n  require(b)").unwrap();
        assert_eq!(stmt_source(&module.body[0]), "if a:\n  require(b)");
        let StmtKind::If { test, .. } = &module.body[0].kind else {
            panic!("expected if");
        };
        assert_eq!(expr_source(test), "a");
    }
}
