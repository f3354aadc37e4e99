//! Constant folding of version, extension, feature and availability
//! predicates for one build configuration.

use std::collections::BTreeMap;

use vu_toolchain_diagnostics::{Diagnostic, codes};
use vu_toolchain_registry::{AvailabilityMaps, BuildConfig};

use crate::format::stmt_source;
use crate::grammar::ast::{
    BoolOp, CmpOp, Constant, Expr, ExprKind, Module, Pos, Stmt, StmtKind, UnaryOp,
};
use crate::grammar::source::Origin;
use crate::predicates::{AttrPredicate, Predicate};

pub(super) struct BuildStripper<'a> {
    config: &'a BuildConfig,
    maps: &'a AvailabilityMaps,
    origin: &'a Origin,
    /// Variables whose value folded to a constant; their uses are replaced.
    /// Scoped like the bindings themselves, so sibling blocks may reuse a
    /// name.
    folded_vars: BTreeMap<String, bool>,
    pub(super) warnings: Vec<Diagnostic>,
}

impl<'a> BuildStripper<'a> {
    pub(super) fn new(
        config: &'a BuildConfig,
        maps: &'a AvailabilityMaps,
        origin: &'a Origin,
    ) -> Self {
        Self {
            config,
            maps,
            origin,
            folded_vars: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub(super) fn strip_module(&mut self, module: &Module) -> Option<Module> {
        self.strip_body(&module.body).map(|body| Module { body })
    }

    // ── Statements ──────────────────────────────────────────────────────

    /// `None` when nothing but comments survives.
    fn strip_body(&mut self, body: &[Stmt]) -> Option<Vec<Stmt>> {
        let outer = self.folded_vars.clone();
        let out: Vec<Stmt> = body.iter().flat_map(|s| self.strip_stmt(s)).collect();
        self.folded_vars = outer;
        if out.iter().all(Stmt::is_comment) {
            None
        } else {
            Some(out)
        }
    }

    /// A statement becomes zero or more statements: folded `if`s splice
    /// their live branch into the enclosing block.
    fn strip_stmt(&mut self, stmt: &Stmt) -> Vec<Stmt> {
        let pos = stmt.pos;
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                let value = self.strip_expr(value);
                if let ([target], Some(b)) = (targets.as_slice(), value.as_bool())
                    && let Some(name) = target.as_name()
                {
                    log::trace!("variable {name} folds to {b}");
                    self.folded_vars.insert(name.to_string(), b);
                    return Vec::new();
                }
                vec![Stmt::new(
                    StmtKind::Assign {
                        targets: targets.clone(),
                        value,
                    },
                    pos,
                )]
            }
            StmtKind::If { test, body, orelse } => {
                let test = self.strip_expr(test);
                if let Some(b) = test.as_bool() {
                    log::trace!("if at {}:{} folds to {b}", pos.line, pos.col);
                    let live = if b { body } else { orelse };
                    return self.strip_body(live).unwrap_or_default();
                }
                let body = self.strip_body(body);
                let orelse = self.strip_body(orelse);
                match (body, orelse) {
                    (None, None) => Vec::new(),
                    (None, Some(orelse)) => vec![Stmt::new(
                        StmtKind::If {
                            test: negate(test),
                            body: orelse,
                            orelse: Vec::new(),
                        },
                        pos,
                    )],
                    (Some(body), orelse) => vec![Stmt::new(
                        StmtKind::If {
                            test,
                            body,
                            orelse: orelse.unwrap_or_default(),
                        },
                        pos,
                    )],
                }
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let iter = self.strip_expr(iter);
                match self.strip_body(body) {
                    None => Vec::new(),
                    Some(body) => vec![Stmt::new(
                        StmtKind::For {
                            target: target.clone(),
                            iter,
                            body,
                            orelse: orelse.clone(),
                        },
                        pos,
                    )],
                }
            }
            StmtKind::Expr { .. } if stmt.is_comment() => vec![stmt.clone()],
            StmtKind::Expr { value } => {
                if value.call_name() == Some(Predicate::Require.name()) {
                    return self.strip_require(stmt, value);
                }
                vec![Stmt::new(
                    StmtKind::Expr {
                        value: self.strip_expr(value),
                    },
                    pos,
                )]
            }
            _ => vec![stmt.clone()],
        }
    }

    /// `require(True)` disappears; `require(False)` stays, with a warning.
    fn strip_require(&mut self, stmt: &Stmt, call: &Expr) -> Vec<Stmt> {
        let stripped = self.strip_expr(call);
        let arg = match &stripped.kind {
            ExprKind::Call { args, .. } => args.first().and_then(Expr::as_bool),
            _ => None,
        };
        match arg {
            Some(true) => Vec::new(),
            Some(false) => {
                log::warn!(
                    "{}:{}: require() condition evaluates to False in this build",
                    self.origin.file,
                    self.origin.line
                );
                self.warnings.push(
                    Diagnostic::warn(
                        codes::REQUIRE_FALSE,
                        "require() condition evaluates to False in this build.  \
                         This hurts VU readability, invert the VU logic instead.",
                    )
                    .at(self.origin.locate(call.pos))
                    .with_fragment(stmt_source(stmt)),
                );
                vec![Stmt::new(StmtKind::Expr { value: stripped }, stmt.pos)]
            }
            None => vec![Stmt::new(StmtKind::Expr { value: stripped }, stmt.pos)],
        }
    }

    // ── Expressions ─────────────────────────────────────────────────────

    fn strip_expr(&mut self, expr: &Expr) -> Expr {
        let pos = expr.pos;
        match &expr.kind {
            ExprKind::Name { id } => match self.folded_vars.get(id) {
                Some(&b) => Expr::bool(b, pos),
                None => expr.clone(),
            },
            ExprKind::Call { func, args } => {
                if let Some(folded) = self.fold_call(func, args, pos) {
                    return folded;
                }
                Expr::new(
                    ExprKind::Call {
                        func: Box::new(self.strip_expr(func)),
                        args: args.iter().map(|a| self.strip_expr(a)).collect(),
                    },
                    pos,
                )
            }
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => self.strip_compare(left, ops, comparators, pos),
            ExprKind::BoolOp { op, values } => {
                let values = values.iter().map(|v| self.strip_expr(v)).collect();
                fold_bool_op(*op, values, pos)
            }
            ExprKind::UnaryOp { op, operand } => {
                let operand = self.strip_expr(operand);
                if *op == UnaryOp::Not {
                    if let Some(b) = operand.as_bool() {
                        return Expr::bool(!b, pos);
                    }
                    if let ExprKind::UnaryOp {
                        op: UnaryOp::Not,
                        operand: inner,
                    } = operand.kind
                    {
                        return *inner;
                    }
                }
                Expr::new(
                    ExprKind::UnaryOp {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    pos,
                )
            }
            ExprKind::IfExp { test, body, orelse } => {
                let test = self.strip_expr(test);
                match test.as_bool() {
                    Some(true) => self.strip_expr(body),
                    Some(false) => self.strip_expr(orelse),
                    None => Expr::new(
                        ExprKind::IfExp {
                            test: Box::new(test),
                            body: Box::new(self.strip_expr(body)),
                            orelse: Box::new(self.strip_expr(orelse)),
                        },
                        pos,
                    ),
                }
            }
            ExprKind::BinOp { left, op, right } => Expr::new(
                ExprKind::BinOp {
                    left: Box::new(self.strip_expr(left)),
                    op: *op,
                    right: Box::new(self.strip_expr(right)),
                },
                pos,
            ),
            ExprKind::Attribute { value, attr } => Expr::new(
                ExprKind::Attribute {
                    value: Box::new(self.strip_expr(value)),
                    attr: attr.clone(),
                },
                pos,
            ),
            ExprKind::Subscript { value, index } => Expr::new(
                ExprKind::Subscript {
                    value: Box::new(self.strip_expr(value)),
                    index: Box::new(self.strip_expr(index)),
                },
                pos,
            ),
            _ => expr.clone(),
        }
    }

    /// Fold a predicate call whose outcome is fixed by the build, if any.
    fn fold_call(&mut self, func: &Expr, args: &[Expr], pos: Pos) -> Option<Expr> {
        let arg_name = || args.first().and_then(Expr::as_name);
        match &func.kind {
            ExprKind::Name { id } => match Predicate::from_name(id)? {
                Predicate::IsVersion => {
                    let [major, minor] = args else { return None };
                    let (Some(major), Some(minor)) = (as_int(major), as_int(minor)) else {
                        return None;
                    };
                    let enabled = self.config.has_version(major, minor);
                    log::trace!("is_version({major}, {minor}) folds to {enabled}");
                    Some(Expr::bool(enabled, pos))
                }
                Predicate::IsExtEnabled => {
                    let ext = arg_name()?;
                    if self.config.has_extension(ext) {
                        None
                    } else {
                        log::trace!("{ext} is not part of the build");
                        Some(Expr::bool(false, pos))
                    }
                }
                Predicate::IsFeatureEnabled => {
                    let feature = arg_name()?;
                    if self.maps.feature_defined(feature, self.config) {
                        return None;
                    }
                    if let Some(ext) = self.config.legacy_alias(feature) {
                        log::trace!("legacy feature {feature} checks {ext} instead");
                        let arg_pos = args.first().map_or(pos, |a| a.pos);
                        let call = is_ext_enabled_call(ext, pos, arg_pos);
                        return Some(self.strip_expr(&call));
                    }
                    log::trace!("feature {feature} is not part of the build");
                    Some(Expr::bool(false, pos))
                }
                Predicate::HasPnext => self.fold_struct_check(arg_name()?, pos),
                _ => None,
            },
            ExprKind::Attribute { attr, .. } => match AttrPredicate::from_name(attr)? {
                AttrPredicate::HasPnext => self.fold_struct_check(arg_name()?, pos),
                AttrPredicate::HasBit => {
                    let bit = arg_name()?;
                    if self.maps.enum_value_defined(bit, self.config) {
                        None
                    } else {
                        log::trace!("bit {bit} is not part of the build");
                        Some(Expr::bool(false, pos))
                    }
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn fold_struct_check(&self, name: &str, pos: Pos) -> Option<Expr> {
        if self.maps.struct_defined(name, self.config) {
            None
        } else {
            log::trace!("struct {name} is not part of the build");
            Some(Expr::bool(false, pos))
        }
    }

    fn strip_compare(
        &mut self,
        left: &Expr,
        ops: &[CmpOp],
        comparators: &[Expr],
        pos: Pos,
    ) -> Expr {
        if let ([op @ (CmpOp::Eq | CmpOp::NotEq)], [right]) = (ops, comparators) {
            let missing = [left, right].into_iter().filter_map(Expr::as_name).find(|n| {
                self.maps.is_enum_value(n) && !self.maps.enum_value_defined(n, self.config)
            });
            if let Some(value) = missing {
                log::trace!("enum value {value} is not part of the build");
                return Expr::bool(*op == CmpOp::NotEq, pos);
            }
        }
        let left = self.strip_expr(left);
        let comparators: Vec<Expr> = comparators.iter().map(|c| self.strip_expr(c)).collect();
        if let ([op @ (CmpOp::Eq | CmpOp::NotEq)], [right]) = (ops, comparators.as_slice())
            && let (Some(a), Some(b)) = (left.as_bool(), right.as_bool())
        {
            return Expr::bool((a == b) == (*op == CmpOp::Eq), pos);
        }
        Expr::new(
            ExprKind::Compare {
                left: Box::new(left),
                ops: ops.to_vec(),
                comparators,
            },
            pos,
        )
    }
}

/// Short-circuit an `and`/`or` whose operands may have folded.
fn fold_bool_op(op: BoolOp, values: Vec<Expr>, pos: Pos) -> Expr {
    let (absorbing, identity) = match op {
        BoolOp::And => (false, true),
        BoolOp::Or => (true, false),
    };
    if values.iter().any(|v| v.as_bool() == Some(absorbing)) {
        return Expr::bool(absorbing, pos);
    }
    let mut live: Vec<Expr> = values.into_iter().filter(|v| v.as_bool().is_none()).collect();
    match live.len() {
        0 => Expr::bool(identity, pos),
        1 => live.remove(0),
        _ => Expr::new(ExprKind::BoolOp { op, values: live }, pos),
    }
}

/// `not test`, unwrapping a test that is already negated.
pub(super) fn negate(test: Expr) -> Expr {
    let pos = test.pos;
    if let ExprKind::UnaryOp {
        op: UnaryOp::Not,
        operand,
    } = test.kind
    {
        return *operand;
    }
    Expr::new(
        ExprKind::UnaryOp {
            op: UnaryOp::Not,
            operand: Box::new(test),
        },
        pos,
    )
}

fn as_int(expr: &Expr) -> Option<u64> {
    match expr.kind {
        ExprKind::Constant {
            value: Constant::Int(v),
        } => Some(v),
        _ => None,
    }
}

fn is_ext_enabled_call(ext: &str, pos: Pos, arg_pos: Pos) -> Expr {
    Expr::new(
        ExprKind::Call {
            func: Box::new(Expr::name(Predicate::IsExtEnabled.name(), pos)),
            args: vec![Expr::name(ext, arg_pos)],
        },
        pos,
    )
}
