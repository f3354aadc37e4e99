//! Type checking and structural rules for macro-expanded VUs.
//!
//! Every statement is visited once in program order with a scoped variable
//! environment as ambient state. Each expression is assigned a [`VuType`];
//! a node that failed to type is given the *unknown* type, which satisfies
//! every later check so one mistake is reported once.

mod env;
pub(crate) mod typing;

use std::collections::BTreeMap;

use serde::Serialize;
use vu_toolchain_diagnostics::{Diagnostic, codes};
use vu_toolchain_registry::ApiRegistry;

use crate::extract::TypeExtractor;
use crate::format::{expr_source, stmt_source};
use crate::grammar::ast::{BinOp, CmpOp, Constant, Expr, ExprKind, Module, Pos, Stmt, StmtKind, UnaryOp};
use crate::grammar::source::Origin;
use crate::predicates::{AttrPredicate, Predicate, is_predicate_name};
use crate::types::{VuType, VuTypeClass};

use env::Env;
use typing::{arg_matches, enum_types_match, types_match};

/// Shorthand for building a `BTreeMap<String, String>` context from key-value pairs.
macro_rules! ctx {
    ($($k:expr => $v:expr),+ $(,)?) => {
        BTreeMap::from([$(($k.into(), $v.into())),+])
    };
}

/// Result of verifying one VU.
#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    /// `true` if no errors were found.
    pub ok: bool,
    /// Every problem found, in source order.
    pub issues: Vec<Diagnostic>,
    /// Number of `require()` calls seen.
    pub require_count: usize,
}

/// Verify a macro-expanded VU documenting `api`.
pub fn verify(module: &Module, registry: &ApiRegistry, api: &str, origin: &Origin) -> Verification {
    let mut verifier = Verifier {
        extractor: TypeExtractor::new(registry, api),
        origin,
        env: Env::new(),
        require_count: 0,
        issues: Vec::new(),
    };
    verifier.visit_body(&module.body);
    if verifier.require_count == 0 {
        let d = Diagnostic::error(codes::MISSING_REQUIRE, "VUs must contain at least one require()")
            .at(origin.locate(Pos::new(1, 1)))
            .with_context(ctx!("api" => api));
        verifier.issues.push(d);
    }
    let ok = !verifier.issues.iter().any(Diagnostic::is_error);
    log::debug!(
        "verified VU for {api} at {}:{}: {} issue(s)",
        origin.file,
        origin.line,
        verifier.issues.len()
    );
    Verification {
        ok,
        issues: verifier.issues,
        require_count: verifier.require_count,
    }
}

/// Type given to nodes that already failed to type.
fn unknown() -> VuType {
    VuType::new(VuTypeClass::Void, "")
}

/// Struct results need the arguments to be named, so they are unknown when
/// the call itself is malformed.
fn arity_failure_type(ret: VuType) -> VuType {
    if ret.class == VuTypeClass::Struct {
        unknown()
    } else {
        ret
    }
}

fn is_unknown(ty: &VuType) -> bool {
    ty.class == VuTypeClass::Void && ty.name.is_empty() && !ty.is_pointer()
}

struct Verifier<'a> {
    extractor: TypeExtractor<'a>,
    origin: &'a Origin,
    env: Env,
    require_count: usize,
    issues: Vec<Diagnostic>,
}

impl Verifier<'_> {
    // ─── Reporting ──────────────────────────────────────────────────────────

    fn report(&mut self, id: &'static str, message: impl Into<String>, pos: Pos, fragment: String) {
        let d = Diagnostic::error(id, message)
            .at(self.origin.locate(pos))
            .with_fragment(fragment)
            .with_context(ctx!("api" => self.extractor.api()));
        self.issues.push(d);
    }

    fn error(&mut self, id: &'static str, message: impl Into<String>, node: &Expr) {
        self.report(id, message, node.pos, expr_source(node));
    }

    fn stmt_error(&mut self, id: &'static str, message: impl Into<String>, stmt: &Stmt) {
        let source = stmt_source(stmt);
        let head = source.lines().next().unwrap_or_default().trim().to_string();
        self.report(id, message, stmt.pos, head);
    }

    fn mismatch(
        &mut self,
        id: &'static str,
        message: impl Into<String>,
        (a, a_ty): (&Expr, &VuType),
        (b, b_ty): (&Expr, &VuType),
    ) {
        let d = Diagnostic::error(id, message)
            .at(self.origin.locate(a.pos))
            .with_fragment(format!("{} vs {}", expr_source(a), expr_source(b)))
            .with_context(ctx!(
                "api" => self.extractor.api(),
                "left" => a_ty.to_string(),
                "right" => b_ty.to_string(),
            ));
        self.issues.push(d);
    }

    fn types_match(&self, a: &VuType, b: &VuType, require_name: bool) -> bool {
        types_match(&self.extractor, a, b, require_name)
    }

    // ─── Statements ─────────────────────────────────────────────────────────

    fn visit_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn scoped_body(&mut self, body: &[Stmt]) {
        self.env.push();
        self.visit_body(body);
        self.env.pop();
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if stmt.is_comment() {
            return;
        }
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                let ty = self.visit_expr(value);
                if targets.len() != 1 {
                    self.stmt_error(
                        codes::INVALID_ASSIGN_TARGET,
                        "Cascaded assignments are not allowed",
                        stmt,
                    );
                    return;
                }
                if let Some(name) = self.new_binding(&targets[0]) {
                    self.env.bind(name, ty, false);
                }
            }
            StmtKind::AugAssign { target, .. } => {
                self.error(
                    codes::INVALID_ASSIGN_TARGET,
                    "Augmented assignments are not allowed",
                    target,
                );
            }
            StmtKind::If { test, body, orelse } => {
                self.check_condition(test, "if statement");
                self.scoped_body(body);
                self.scoped_body(orelse);
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                if !orelse.is_empty() {
                    self.stmt_error(
                        codes::UNSUPPORTED_CONSTRUCT,
                        "for loops cannot have an else clause",
                        stmt,
                    );
                }
                let name = self.new_binding(target);
                let elem = self.loop_element(iter);
                self.env.push();
                if let Some(name) = name {
                    self.env.bind(name, elem, true);
                }
                self.visit_body(body);
                self.env.pop();
            }
            StmtKind::While { .. } => {
                self.stmt_error(
                    codes::UNSUPPORTED_CONSTRUCT,
                    "while loops are not allowed",
                    stmt,
                );
            }
            StmtKind::Break => {
                self.stmt_error(codes::UNSUPPORTED_CONSTRUCT, "break is not allowed", stmt);
            }
            StmtKind::Continue => {
                self.stmt_error(codes::UNSUPPORTED_CONSTRUCT, "continue is not allowed", stmt);
            }
            StmtKind::Expr { value } => {
                self.visit_expr(value);
            }
            StmtKind::Pass => {}
        }
    }

    /// Check an assignment or loop target and return the name it binds.
    fn new_binding(&mut self, target: &Expr) -> Option<String> {
        let Some(name) = target.as_name() else {
            self.error(
                codes::INVALID_ASSIGN_TARGET,
                "Assignment target must be a single variable",
                target,
            );
            return None;
        };
        let problem = if is_predicate_name(name) {
            Some((codes::INVALID_ASSIGN_TARGET, "Invalid assignment to builtin"))
        } else if self.extractor.is_subject_symbol(name) {
            Some((codes::INVALID_ASSIGN_TARGET, "Invalid assignment to VU parameter"))
        } else if self.extractor.is_api_token(name) {
            Some((codes::INVALID_ASSIGN_TARGET, "Invalid assignment to API token"))
        } else if self.env.lookup(name).is_some() {
            Some((
                codes::IMMUTABLE_REBIND,
                "Invalid reassignment.  VU variables are immutable",
            ))
        } else {
            None
        };
        match problem {
            Some((id, message)) => {
                self.error(id, message, target);
                None
            }
            None => Some(name.to_string()),
        }
    }

    fn loop_element(&mut self, iter: &Expr) -> VuType {
        if matches!(iter.kind, ExprKind::Tuple { .. } | ExprKind::List { .. }) {
            self.error(codes::NOT_AN_ARRAY, "Loop iterator must be an array", iter);
            return unknown();
        }
        let ty = self.visit_expr(iter);
        if is_unknown(&ty) {
            return ty;
        }
        if !ty.is_array() {
            self.error(codes::NOT_AN_ARRAY, "Loop iterator must be an array", iter);
            return unknown();
        }
        ty.indexed()
    }

    fn check_condition(&mut self, test: &Expr, context: &str) {
        let ty = self.visit_expr(test);
        if is_unknown(&ty) {
            return;
        }
        if ty.is_pointer() {
            self.error(
                codes::NON_BOOLEAN_CONDITION,
                format!("Condition of {context} cannot be a pointer.  Use comparison with NULL"),
                test,
            );
        } else if ty.class != VuTypeClass::Bool {
            self.error(
                codes::NON_BOOLEAN_CONDITION,
                format!("Condition of {context} must be boolean"),
                test,
            );
        }
    }

    // ─── Expressions ────────────────────────────────────────────────────────

    fn visit_expr(&mut self, expr: &Expr) -> VuType {
        match &expr.kind {
            ExprKind::BoolOp { op, values } => {
                let context = format!("{} operand", op.as_str());
                for value in values {
                    self.check_condition(value, &context);
                }
                VuType::bool()
            }
            ExprKind::UnaryOp { op, operand } => self.visit_unary(*op, operand),
            ExprKind::BinOp { left, op, right } => self.visit_binop(left, *op, right),
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => self.visit_compare(expr, left, ops, comparators),
            ExprKind::Call { func, args } => self.visit_call(expr, func, args),
            ExprKind::Attribute { value, attr } => self.visit_attribute(expr, value, attr),
            ExprKind::Subscript { value, index } => self.visit_subscript(value, index),
            ExprKind::IfExp { test, body, orelse } => {
                self.check_condition(test, "conditional expression");
                let b = self.visit_expr(body);
                let o = self.visit_expr(orelse);
                if is_unknown(&b) {
                    return o;
                }
                if is_unknown(&o) {
                    return b;
                }
                if !self.types_match(&b, &o, true) {
                    self.mismatch(
                        codes::TYPE_MISMATCH,
                        "Mismatching types in conditional expression",
                        (body, &b),
                        (orelse, &o),
                    );
                }
                if o.class == VuTypeClass::Bitmask && b.class != VuTypeClass::Bitmask {
                    o
                } else {
                    b
                }
            }
            ExprKind::Name { id } => self.visit_name(expr, id),
            ExprKind::Constant { value } => match value {
                Constant::Bool(_) => VuType::bool(),
                _ => VuType::num(),
            },
            ExprKind::Tuple { .. } => {
                self.error(codes::UNSUPPORTED_CONSTRUCT, "Tuples are not allowed", expr);
                unknown()
            }
            ExprKind::List { .. } => {
                self.error(codes::UNSUPPORTED_CONSTRUCT, "Lists are not allowed", expr);
                unknown()
            }
            ExprKind::Slice { .. } => {
                self.error(codes::UNSUPPORTED_CONSTRUCT, "Slices are not allowed", expr);
                unknown()
            }
        }
    }

    fn visit_name(&mut self, expr: &Expr, id: &str) -> VuType {
        if is_predicate_name(id) {
            self.error(
                codes::PREDICATE_MISUSE,
                format!("Builtin {id} can only be called"),
                expr,
            );
            return unknown();
        }
        if let Some(binding) = self.env.lookup(id) {
            return binding.ty.clone();
        }
        if let Some(ty) = self.extractor.symbol_type(id) {
            return ty;
        }
        self.error(
            codes::UNKNOWN_SYMBOL,
            format!(
                "Unknown token is neither an API token, or a member or argument of {}",
                self.extractor.api()
            ),
            expr,
        );
        unknown()
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: &Expr) -> VuType {
        let (expected, result) = match op {
            UnaryOp::Not => (VuTypeClass::Bool, VuType::bool()),
            UnaryOp::Invert => (VuTypeClass::Bitmask, VuType::bitmask()),
            UnaryOp::UAdd | UnaryOp::USub => (VuTypeClass::Num, VuType::num()),
        };
        let ty = self.visit_expr(operand);
        if is_unknown(&ty) {
            return result;
        }
        if ty.is_pointer() {
            self.error(
                codes::TYPE_MISMATCH,
                format!("Operand of {} cannot be a pointer", op.as_str()),
                operand,
            );
        } else if ty.class != expected {
            self.error(
                codes::TYPE_MISMATCH,
                format!("Operand of {} must be {expected}", op.as_str()),
                operand,
            );
        } else if op == UnaryOp::Invert {
            return ty;
        }
        result
    }

    fn visit_binop(&mut self, left: &Expr, op: BinOp, right: &Expr) -> VuType {
        let l = self.visit_expr(left);
        let r = self.visit_expr(right);
        let bitwise = matches!(op, BinOp::BitOr | BinOp::BitXor | BinOp::BitAnd);
        let fallback = if bitwise { VuType::bitmask() } else { VuType::num() };
        if is_unknown(&l) || is_unknown(&r) {
            return fallback;
        }
        if l.is_pointer() || r.is_pointer() {
            self.mismatch(
                codes::TYPE_MISMATCH,
                format!("Operands of {} cannot be pointers", op.as_str()),
                (left, &l),
                (right, &r),
            );
            return fallback;
        }
        if !bitwise {
            if l.class != VuTypeClass::Num || r.class != VuTypeClass::Num {
                self.mismatch(
                    codes::TYPE_MISMATCH,
                    format!("Operands of {} must be numbers", op.as_str()),
                    (left, &l),
                    (right, &r),
                );
            }
            return VuType::num();
        }
        let flagish = |t: &VuType| matches!(t.class, VuTypeClass::Bitmask | VuTypeClass::Enum);
        if !flagish(&l) || !flagish(&r) {
            self.mismatch(
                codes::TYPE_MISMATCH,
                format!("Operands of {} must be bitmasks", op.as_str()),
                (left, &l),
                (right, &r),
            );
        } else if !enum_types_match(&self.extractor, &l, &r) {
            self.mismatch(
                codes::TYPE_MISMATCH,
                format!("Mismatching bitmask types in {}", op.as_str()),
                (left, &l),
                (right, &r),
            );
        }
        if l.class == VuTypeClass::Bitmask {
            l
        } else if r.class == VuTypeClass::Bitmask {
            r
        } else {
            fallback
        }
    }

    fn visit_compare(&mut self, expr: &Expr, left: &Expr, ops: &[CmpOp], comparators: &[Expr]) -> VuType {
        let l = self.visit_expr(left);
        let rights: Vec<VuType> = comparators.iter().map(|c| self.visit_expr(c)).collect();
        let ([op], [right], [r]) = (ops, comparators, rights.as_slice()) else {
            self.error(
                codes::UNSUPPORTED_CONSTRUCT,
                "Only binary comparisons are allowed",
                expr,
            );
            return VuType::bool();
        };
        match op {
            CmpOp::Is | CmpOp::IsNot | CmpOp::In | CmpOp::NotIn => {
                self.error(
                    codes::UNSUPPORTED_CONSTRUCT,
                    format!("Operator {} is not allowed", op.as_str()),
                    expr,
                );
            }
            _ if is_unknown(&l) || is_unknown(r) => {}
            CmpOp::Eq | CmpOp::NotEq => {
                if !self.types_match(&l, r, true) {
                    self.mismatch(
                        codes::TYPE_MISMATCH,
                        "Mismatching types in comparison",
                        (left, &l),
                        (right, r),
                    );
                }
            }
            CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE => {
                let numeric = |t: &VuType| t.class == VuTypeClass::Num && !t.is_pointer();
                if !numeric(&l) || !numeric(r) {
                    self.mismatch(
                        codes::TYPE_MISMATCH,
                        format!("Operands of {} must be numbers", op.as_str()),
                        (left, &l),
                        (right, r),
                    );
                }
            }
        }
        VuType::bool()
    }

    fn visit_call(&mut self, expr: &Expr, func: &Expr, args: &[Expr]) -> VuType {
        match &func.kind {
            ExprKind::Name { id } => match Predicate::from_name(id) {
                Some(predicate) => self.visit_predicate(expr, predicate, args),
                None => self.not_callable(expr, args),
            },
            ExprKind::Attribute { value, attr } => match AttrPredicate::from_name(attr) {
                Some(predicate) => self.visit_attr_predicate(expr, predicate, value, args),
                None => {
                    self.visit_expr(value);
                    self.not_callable(expr, args)
                }
            },
            _ => self.not_callable(expr, args),
        }
    }

    fn not_callable(&mut self, expr: &Expr, args: &[Expr]) -> VuType {
        for arg in args {
            self.visit_expr(arg);
        }
        self.error(
            codes::NOT_CALLABLE,
            "Invalid function call.  If a builtin was intended, it is misspelled",
            expr,
        );
        unknown()
    }

    fn check_arity(&mut self, expr: &Expr, expected: usize, args: &[Expr]) -> bool {
        if args.len() == expected {
            return true;
        }
        let d = Diagnostic::error(
            codes::ARGUMENT_COUNT,
            "Invalid number of arguments passed to builtin",
        )
        .at(self.origin.locate(expr.pos))
        .with_fragment(expr_source(expr))
        .with_context(ctx!(
            "api" => self.extractor.api(),
            "expected" => expected.to_string(),
            "found" => args.len().to_string(),
        ));
        self.issues.push(d);
        false
    }

    fn check_arg(&mut self, name: &str, expected: &VuType, arg: &Expr) -> VuType {
        let ty = self.visit_expr(arg);
        if !is_unknown(&ty) && !arg_matches(&self.extractor, expected, &ty) {
            let d = Diagnostic::error(
                codes::TYPE_MISMATCH,
                format!("Invalid argument passed to {name}()"),
            )
            .at(self.origin.locate(arg.pos))
            .with_fragment(expr_source(arg))
            .with_context(ctx!(
                "api" => self.extractor.api(),
                "expected" => expected.to_string(),
                "found" => ty.to_string(),
            ));
            self.issues.push(d);
        }
        ty
    }

    fn visit_predicate(&mut self, expr: &Expr, predicate: Predicate, args: &[Expr]) -> VuType {
        let sig = predicate.signature();
        if predicate == Predicate::Require {
            self.require_count += 1;
        }
        if !self.check_arity(expr, sig.args.len(), args) {
            for arg in args {
                self.visit_expr(arg);
            }
            return arity_failure_type(sig.ret);
        }
        match predicate {
            Predicate::ArrayIndex => {
                let arg = &args[0];
                if !arg.as_name().is_some_and(|n| self.env.is_loop_var(n)) {
                    self.error(
                        codes::NOT_A_LOOP_VARIABLE,
                        "array_index() can only be used on loop variables",
                        arg,
                    );
                }
            }
            Predicate::Macro => {}
            _ => {
                for (arg, expected) in args.iter().zip(&sig.args) {
                    self.check_arg(predicate.name(), expected, arg);
                }
            }
        }
        match predicate {
            Predicate::Pnext => match args[0].as_name() {
                Some(name) => VuType::struct_value(name),
                None => unknown(),
            },
            _ => sig.ret,
        }
    }

    fn visit_attr_predicate(
        &mut self,
        expr: &Expr,
        predicate: AttrPredicate,
        object: &Expr,
        args: &[Expr],
    ) -> VuType {
        let sig = predicate.signature();
        let object_ty = self.visit_expr(object).dereferenced();
        let known_object = !is_unknown(&object_ty);
        if let Some(expected) = &sig.object {
            if known_object && !self.types_match(expected, &object_ty, false) {
                self.error(
                    codes::PREDICATE_MISUSE,
                    format!("{}() cannot be used on {object_ty}", predicate.name()),
                    object,
                );
            }
        }
        if !self.check_arity(expr, sig.args.len(), args) {
            for arg in args {
                self.visit_expr(arg);
            }
            return arity_failure_type(sig.ret);
        }
        let mut arg_types = Vec::with_capacity(args.len());
        for (arg, expected) in args.iter().zip(&sig.args) {
            arg_types.push(self.check_arg(predicate.name(), expected, arg));
        }
        if predicate == AttrPredicate::HasBit && known_object {
            if let ([arg], [bit]) = (args, arg_types.as_slice()) {
                if object_ty.class == VuTypeClass::Bitmask
                    && bit.class == VuTypeClass::Enum
                    && !enum_types_match(&self.extractor, &object_ty, bit)
                {
                    self.mismatch(
                        codes::TYPE_MISMATCH,
                        "Bit does not belong to the bitmask",
                        (object, &object_ty),
                        (arg, bit),
                    );
                }
            }
        }
        let arg_name = args.first().and_then(Expr::as_name);
        match predicate.returned_struct(&object_ty.name, arg_name) {
            Some(name) if known_object || predicate == AttrPredicate::Pnext => {
                VuType::struct_value(name)
            }
            Some(_) => unknown(),
            None => sig.ret,
        }
    }

    fn visit_attribute(&mut self, expr: &Expr, value: &Expr, attr: &str) -> VuType {
        let object = self.visit_expr(value).dereferenced();
        if is_unknown(&object) {
            return object;
        }
        if is_predicate_name(attr) {
            self.error(
                codes::PREDICATE_MISUSE,
                format!("Builtin {attr} can only be called"),
                expr,
            );
            return unknown();
        }
        if object.class != VuTypeClass::Struct || object.name.is_empty() {
            self.error(
                codes::NO_SUCH_MEMBER,
                "Invalid use of . on non-struct object",
                expr,
            );
            return unknown();
        }
        match self.extractor.member_type(&object.name, attr) {
            Some(ty) => ty,
            None => {
                self.error(
                    codes::NO_SUCH_MEMBER,
                    format!("No such attribute {attr} in struct {}", object.name),
                    expr,
                );
                unknown()
            }
        }
    }

    fn visit_subscript(&mut self, value: &Expr, index: &Expr) -> VuType {
        match index.kind {
            ExprKind::Tuple { .. } => {
                self.error(
                    codes::UNSUPPORTED_CONSTRUCT,
                    "Multi-dimensional subscripts are not allowed",
                    index,
                );
                self.visit_expr(value);
                return unknown();
            }
            ExprKind::Slice { .. } => {
                self.error(codes::UNSUPPORTED_CONSTRUCT, "Slices are not allowed", index);
                self.visit_expr(value);
                return unknown();
            }
            _ => {}
        }
        let array = self.visit_expr(value);
        let index_ty = self.visit_expr(index);
        if is_unknown(&array) {
            return array;
        }
        if !array.is_array() {
            self.error(
                codes::INVALID_SUBSCRIPT,
                "Subscript only allowed on arrays",
                value,
            );
            return unknown();
        }
        if !is_unknown(&index_ty) && (index_ty.is_pointer() || index_ty.class != VuTypeClass::Num) {
            self.error(codes::TYPE_MISMATCH, "Array index must be a number", index);
        }
        array.indexed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parser::parse_vu;
    use vu_toolchain_registry::{Category, Entity, Member};

    fn member(name: &str, ty: &str, pointer: u32, len: Option<&str>) -> Member {
        Member {
            name: name.into(),
            type_name: ty.into(),
            pointer,
            len: len.map(Into::into),
            fixed_len: None,
        }
    }

    fn entity(name: &str, category: Category, members: Vec<Member>) -> Entity {
        Entity {
            name: name.into(),
            category,
            members,
            alias_of: None,
            requires: None,
            extends: Vec::new(),
        }
    }

    fn registry() -> ApiRegistry {
        let mut flags = entity("VkImageCopyFlags", Category::Bitmask, vec![]);
        flags.requires = Some("VkImageCopyFlagBits".into());
        ApiRegistry::new(
            vec![
                entity(
                    "vkCmdCopyImage",
                    Category::Command,
                    vec![
                        member("commandBuffer", "VkCommandBuffer", 0, None),
                        member("srcImage", "VkImage", 0, None),
                        member("regionCount", "uint32_t", 0, None),
                        member("pRegions", "VkImageCopy", 1, Some("regionCount")),
                        member("pInfo", "VkImageCopy", 1, None),
                        member("flags", "VkImageCopyFlags", 0, None),
                    ],
                ),
                entity(
                    "VkImageCopy",
                    Category::Struct,
                    vec![member("layerCount", "uint32_t", 0, None)],
                ),
                entity("VkImage", Category::Handle, vec![]),
                entity("VkCommandBuffer", Category::Handle, vec![]),
                entity("VkImageCopyFlagBits", Category::Enum, vec![]),
                flags,
                entity("VkImageType", Category::Enum, vec![]),
            ],
            BTreeMap::from([
                ("VK_IMAGE_COPY_X_BIT".into(), "VkImageCopyFlagBits".into()),
                ("VK_IMAGE_TYPE_2D".into(), "VkImageType".into()),
            ]),
            BTreeMap::new(),
            Vec::new(),
        )
    }

    fn check(src: &str) -> Verification {
        let module = parse_vu(src).unwrap();
        verify(&module, &registry(), "vkCmdCopyImage", &Origin::standalone("t.adoc"))
    }

    fn codes_of(v: &Verification) -> Vec<&str> {
        v.issues.iter().map(|d| d.id.as_ref()).collect()
    }

    #[test]
    fn accepts_well_typed_vus() {
        for src in [
            "require(pInfo != NULL)",
            "require(srcImage.valid())",
            "if flags.has_bit(VK_IMAGE_COPY_X_BIT):\n  require(regionCount > 0)",
            "for r in pRegions:\n  require(r.layerCount > 0 or array_index(r) == 0)",
            "n = regionCount + 1\nrequire(n > 1)",
            "require(pRegions[0].layerCount == 1)",
            "require(externally_synchronized(commandBuffer))",
        ] {
            let v = check(src);
            assert!(v.ok, "{src}: {:?}", v.issues);
        }
    }

    #[test]
    fn missing_require() {
        let v = check("x = regionCount");
        assert_eq!(codes_of(&v), [codes::MISSING_REQUIRE]);
    }

    #[test]
    fn assignment_rules() {
        assert_eq!(
            codes_of(&check("a = b = regionCount\nrequire(True)")),
            [codes::INVALID_ASSIGN_TARGET]
        );
        assert_eq!(
            codes_of(&check("regionCount = 1\nrequire(True)")),
            [codes::INVALID_ASSIGN_TARGET]
        );
        assert_eq!(
            codes_of(&check("a = 1\na = 2\nrequire(True)")),
            [codes::IMMUTABLE_REBIND]
        );
        assert_eq!(
            codes_of(&check("a = 1\na += 2\nrequire(True)")),
            [codes::INVALID_ASSIGN_TARGET]
        );
    }

    #[test]
    fn pointer_conditions_are_rejected() {
        let v = check("if pInfo:\n  require(True)");
        assert_eq!(codes_of(&v), [codes::NON_BOOLEAN_CONDITION]);
        assert!(v.issues[0].message.contains("Use comparison with NULL"));
    }

    #[test]
    fn loop_over_non_array_cites_iterator() {
        let v = check("for e in regionCount:\n  require(e > 0)");
        assert_eq!(codes_of(&v), [codes::NOT_AN_ARRAY]);
        assert_eq!(v.issues[0].fragment.as_deref(), Some("regionCount"));
        // A pointer without a length is not an array either.
        let v = check("for e in pInfo:\n  require(e.layerCount > 0)");
        assert_eq!(codes_of(&v), [codes::NOT_AN_ARRAY]);
    }

    #[test]
    fn unsupported_statements() {
        let v = check("while True:\n  break\nrequire(True)");
        assert_eq!(codes_of(&v), [codes::UNSUPPORTED_CONSTRUCT]);
        let v = check("for r in pRegions:\n  continue\nrequire(True)");
        assert_eq!(codes_of(&v), [codes::UNSUPPORTED_CONSTRUCT]);
        let v = check("require(0 < regionCount < 4)");
        assert_eq!(codes_of(&v), [codes::UNSUPPORTED_CONSTRUCT]);
    }

    #[test]
    fn mismatches_cite_both_sides() {
        let v = check("require(flags == VK_IMAGE_TYPE_2D)");
        assert_eq!(codes_of(&v), [codes::TYPE_MISMATCH]);
        assert_eq!(
            v.issues[0].fragment.as_deref(),
            Some("flags vs VK_IMAGE_TYPE_2D")
        );
    }

    #[test]
    fn unknown_symbols_are_reported_once() {
        let v = check("require(pNope.layerCount > 0)");
        assert_eq!(codes_of(&v), [codes::UNKNOWN_SYMBOL]);
    }

    #[test]
    fn call_rules() {
        assert_eq!(
            codes_of(&check("require(is_version(1))")),
            [codes::ARGUMENT_COUNT]
        );
        assert_eq!(
            codes_of(&check("require(pnext().layerCount > 0)")),
            [codes::ARGUMENT_COUNT]
        );
        assert_eq!(
            codes_of(&check("require(frobnicate(regionCount))")),
            [codes::NOT_CALLABLE]
        );
        assert_eq!(
            codes_of(&check("require(array_index(regionCount) == 0)")),
            [codes::NOT_A_LOOP_VARIABLE]
        );
        assert_eq!(
            codes_of(&check("require(regionCount.valid())")),
            [codes::PREDICATE_MISUSE]
        );
    }

    #[test]
    fn member_access_rules() {
        assert_eq!(
            codes_of(&check("require(pInfo.nope == 0)")),
            [codes::NO_SUCH_MEMBER]
        );
        assert_eq!(
            codes_of(&check("require(regionCount.x == 0)")),
            [codes::NO_SUCH_MEMBER]
        );
        assert_eq!(
            codes_of(&check("require(regionCount[0] == 0)")),
            [codes::INVALID_SUBSCRIPT]
        );
    }

    #[test]
    fn has_bit_checks_the_bit_family() {
        let v = check("require(flags.has_bit(VK_IMAGE_TYPE_2D))");
        assert_eq!(codes_of(&v), [codes::TYPE_MISMATCH]);
    }

    #[test]
    fn locations_are_document_relative() {
        let module = parse_vu("if True:\n  require(pNope)").unwrap();
        let v = verify(
            &module,
            &registry(),
            "vkCmdCopyImage",
            &Origin::new("doc.adoc", 10, 4),
        );
        let loc = v.issues[0].location.as_ref().unwrap();
        assert_eq!((loc.line, loc.column), (11, 15));
    }
}
