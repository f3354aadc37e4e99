//! Parameter tag extraction for new VUIDs.
//!
//! The tag is the first member or parameter of the documented API a VU
//! refers to. A `macro(name)` reference anywhere in the VU wins and yields
//! the attribute form `{name}`; otherwise the first plain symbol that is
//! neither a local, a loop variable nor an API constant is used.

use std::collections::BTreeSet;

use crate::grammar::ast::{Expr, ExprKind, Module, Stmt, StmtKind};
use crate::predicates::Predicate;

/// Tag used when a VU refers to no parameter.
pub const NO_TAG: &str = "None";

/// Parameter tag of a VU, parsed but not macro-expanded.
pub fn parameter_tag(module: &Module) -> String {
    if let Some(name) = first_macro(module) {
        return format!("{{{name}}}");
    }
    let mut finder = SymbolFinder::default();
    finder.body(&module.body);
    finder.found.unwrap_or_else(|| NO_TAG.to_string())
}

fn first_macro(module: &Module) -> Option<String> {
    let mut found = None;
    module.walk_exprs(&mut |e| {
        if found.is_none()
            && e.call_name() == Some(Predicate::Macro.name())
            && let ExprKind::Call { args, .. } = &e.kind
        {
            found = args.first().and_then(Expr::as_name).map(str::to_string);
        }
    });
    found
}

#[derive(Default)]
struct SymbolFinder {
    variables: BTreeSet<String>,
    found: Option<String>,
}

impl SymbolFinder {
    fn body(&mut self, body: &[Stmt]) {
        for stmt in body {
            if self.found.is_some() {
                return;
            }
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        if stmt.is_comment() {
            return;
        }
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                self.variables
                    .extend(targets.iter().filter_map(|t| t.as_name().map(str::to_string)));
                self.expr(value);
            }
            StmtKind::If { test, body, .. } | StmtKind::While { test, body, .. } => {
                self.expr(test);
                self.body(body);
            }
            StmtKind::For {
                target, iter, body, ..
            } => {
                if let Some(name) = target.as_name() {
                    self.variables.insert(name.to_string());
                }
                self.expr(iter);
                self.body(body);
            }
            StmtKind::AugAssign { value, .. } => self.expr(value),
            StmtKind::Expr { value } => self.expr(value),
            StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        if self.found.is_some() {
            return;
        }
        match &expr.kind {
            ExprKind::Name { id } => {
                if !id.starts_with("VK_") && !self.variables.contains(id) {
                    self.found = Some(id.clone());
                }
            }
            // Only require() and externally_synchronized() take parameters
            // as arguments; a method call is searched through its receiver.
            ExprKind::Call { func, args } => match &func.kind {
                ExprKind::Name { id }
                    if id == Predicate::Require.name()
                        || id == Predicate::ExternallySynchronized.name() =>
                {
                    if let Some(arg) = args.first() {
                        self.expr(arg);
                    }
                }
                ExprKind::Attribute { value, .. } => self.expr(value),
                _ => {}
            },
            ExprKind::Attribute { value, .. } => self.expr(value),
            ExprKind::BoolOp { values, .. } => values.iter().for_each(|v| self.expr(v)),
            ExprKind::BinOp { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::UnaryOp { operand, .. } => self.expr(operand),
            ExprKind::Compare {
                left, comparators, ..
            } => {
                self.expr(left);
                comparators.iter().for_each(|c| self.expr(c));
            }
            ExprKind::Subscript { value, index } => {
                self.expr(value);
                self.expr(index);
            }
            ExprKind::IfExp { test, body, orelse } => {
                self.expr(test);
                self.expr(body);
                self.expr(orelse);
            }
            ExprKind::Tuple { elts } | ExprKind::List { elts } => {
                elts.iter().for_each(|e| self.expr(e));
            }
            ExprKind::Constant { .. } | ExprKind::Slice { .. } => {}
        }
    }
}
