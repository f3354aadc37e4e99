use serde::{Deserialize, Serialize};

/// Name of the synthetic call that carries a retained source comment.
pub const COMMENT_CALL: &str = "__comment";

/// Position of a node within VU text.
///
/// Both fields are **1-indexed**, relative to the VU text after its bullet
/// and indentation were removed. [`Pos::default`] (0, 0) marks nodes that do
/// not come from source, such as constants produced by build stripping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub col: u32,
}

impl Pos {
    /// Create a position.
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// A parsed VU: a list of statements.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Module {
    /// Top-level statements in source order.
    pub body: Vec<Stmt>,
}

/// A statement with its source position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stmt {
    /// What kind of statement this is.
    pub kind: StmtKind,
    /// Position of the first token.
    pub pos: Pos,
}

/// Statement forms accepted by the grammar.
///
/// The grammar is deliberately wider than the VU language: `while`, `break`,
/// `continue`, cascaded assignment and `for`/`else` parse, and are rejected
/// by the verifier with a precise reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
#[non_exhaustive]
pub enum StmtKind {
    /// `a = b` (or `a = b = c`, which the verifier rejects).
    Assign {
        /// Every target left of the final `=`.
        targets: Vec<Expr>,
        /// Right-hand side.
        value: Expr,
    },
    /// `a += b` (always rejected: VU variables are immutable).
    AugAssign {
        /// Updated target.
        target: Expr,
        /// Operator.
        op: BinOp,
        /// Right-hand side.
        value: Expr,
    },
    /// `if test: body [elif ...] [else: orelse]`.
    If {
        /// Condition.
        test: Expr,
        /// Statements run when `test` holds.
        body: Vec<Stmt>,
        /// `else` statements; an `elif` is a single nested `If`.
        orelse: Vec<Stmt>,
    },
    /// `for target in iter: body`.
    For {
        /// Loop variable.
        target: Expr,
        /// Iterated array.
        iter: Expr,
        /// Loop body.
        body: Vec<Stmt>,
        /// `else` clause (always rejected).
        orelse: Vec<Stmt>,
    },
    /// `while test: body` (always rejected).
    While {
        /// Condition.
        test: Expr,
        /// Loop body.
        body: Vec<Stmt>,
        /// `else` clause.
        orelse: Vec<Stmt>,
    },
    /// An expression statement, typically `require(...)`.
    Expr {
        /// The expression.
        value: Expr,
    },
    /// `pass`.
    Pass,
    /// `break` (always rejected).
    Break,
    /// `continue` (always rejected).
    Continue,
}

/// An expression with its source position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expr {
    /// What kind of expression this is.
    pub kind: ExprKind,
    /// Position of the first token.
    pub pos: Pos,
}

/// Expression forms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
#[non_exhaustive]
pub enum ExprKind {
    /// `a and b and c` / `a or b`.
    BoolOp {
        /// Operator shared by every operand.
        op: BoolOp,
        /// Two or more operands.
        values: Vec<Expr>,
    },
    /// Arithmetic, shift or bitwise binary operation.
    BinOp {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinOp,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `not x`, `-x`, `+x`, `~x`.
    UnaryOp {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// A comparison chain `left op0 c0 op1 c1 ...`.
    Compare {
        /// First operand.
        left: Box<Expr>,
        /// Operators, one per comparator.
        ops: Vec<CmpOp>,
        /// Remaining operands.
        comparators: Vec<Expr>,
    },
    /// `func(args...)`.
    Call {
        /// Callee: a name, or an attribute for receiver predicates.
        func: Box<Expr>,
        /// Positional arguments.
        args: Vec<Expr>,
    },
    /// `value.attr`.
    Attribute {
        /// Receiver.
        value: Box<Expr>,
        /// Member or predicate name.
        attr: String,
    },
    /// `value[index]`.
    Subscript {
        /// Subscripted array.
        value: Box<Expr>,
        /// Index, which may be a tuple or slice (both rejected).
        index: Box<Expr>,
    },
    /// `body if test else orelse`.
    IfExp {
        /// Condition.
        test: Box<Expr>,
        /// Value when `test` holds.
        body: Box<Expr>,
        /// Value otherwise.
        orelse: Box<Expr>,
    },
    /// An identifier.
    Name {
        /// The identifier.
        id: String,
    },
    /// A literal.
    Constant {
        /// Literal value.
        value: Constant,
    },
    /// `a, b` (rejected where a single value is required).
    Tuple {
        /// Elements.
        elts: Vec<Expr>,
    },
    /// `[a, b]` (rejected where a single value is required).
    List {
        /// Elements.
        elts: Vec<Expr>,
    },
    /// `lower:upper:step` inside a subscript (always rejected).
    Slice {
        /// Start bound.
        lower: Option<Box<Expr>>,
        /// End bound.
        upper: Option<Box<Expr>>,
        /// Step.
        step: Option<Box<Expr>>,
    },
}

/// Literal values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Constant {
    /// `True` / `False`.
    Bool(bool),
    /// A non-negative integer literal.
    Int(u64),
    /// A floating point literal.
    Float(f64),
    /// A quoted string.
    Str(String),
    /// `None`.
    None,
}

/// Boolean operators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BoolOp {
    /// `and`
    And,
    /// `or`
    Or,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mult,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `@`
    MatMult,
    /// `<<`
    LShift,
    /// `>>`
    RShift,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    /// `not`
    Not,
    /// `~`
    Invert,
    /// `+`
    UAdd,
    /// `-`
    USub,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtE,
    /// `>`
    Gt,
    /// `>=`
    GtE,
    /// `is`
    Is,
    /// `is not`
    IsNot,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

impl BoolOp {
    /// Source spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        }
    }
}

impl BinOp {
    /// Source spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mult => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::MatMult => "@",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
        }
    }
}

impl UnaryOp {
    /// Source spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Invert => "~",
            UnaryOp::UAdd => "+",
            UnaryOp::USub => "-",
        }
    }
}

impl CmpOp {
    /// Source spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

// ─── Constructors ───────────────────────────────────────────────────────────

impl Expr {
    /// Create an expression.
    pub fn new(kind: ExprKind, pos: Pos) -> Self {
        Self { kind, pos }
    }

    /// A `Name` node.
    pub fn name(id: impl Into<String>, pos: Pos) -> Self {
        Self::new(ExprKind::Name { id: id.into() }, pos)
    }

    /// A boolean constant.
    pub fn bool(value: bool, pos: Pos) -> Self {
        Self::new(
            ExprKind::Constant {
                value: Constant::Bool(value),
            },
            pos,
        )
    }

    /// The identifier, if this is a `Name`.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name { id } => Some(id),
            _ => None,
        }
    }

    /// The value, if this is a boolean constant.
    pub fn as_bool(&self) -> Option<bool> {
        match &self.kind {
            ExprKind::Constant {
                value: Constant::Bool(b),
            } => Some(*b),
            _ => None,
        }
    }

    /// The callee name, if this is a call of a plain name.
    pub fn call_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Call { func, .. } => func.as_name(),
            _ => None,
        }
    }

    /// Visit this expression and every sub-expression, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match &self.kind {
            ExprKind::BoolOp { values, .. } => values.iter().for_each(|v| v.walk(f)),
            ExprKind::BinOp { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            ExprKind::UnaryOp { operand, .. } => operand.walk(f),
            ExprKind::Compare {
                left, comparators, ..
            } => {
                left.walk(f);
                comparators.iter().for_each(|c| c.walk(f));
            }
            ExprKind::Call { func, args } => {
                func.walk(f);
                args.iter().for_each(|a| a.walk(f));
            }
            ExprKind::Attribute { value, .. } => value.walk(f),
            ExprKind::Subscript { value, index } => {
                value.walk(f);
                index.walk(f);
            }
            ExprKind::IfExp { test, body, orelse } => {
                test.walk(f);
                body.walk(f);
                orelse.walk(f);
            }
            ExprKind::Tuple { elts } | ExprKind::List { elts } => {
                elts.iter().for_each(|e| e.walk(f));
            }
            ExprKind::Slice { lower, upper, step } => {
                for part in [lower, upper, step].into_iter().flatten() {
                    part.walk(f);
                }
            }
            ExprKind::Name { .. } | ExprKind::Constant { .. } => {}
        }
    }
}

impl Stmt {
    /// Create a statement.
    pub fn new(kind: StmtKind, pos: Pos) -> Self {
        Self { kind, pos }
    }

    /// A retained source comment.
    pub fn comment(text: impl Into<String>, pos: Pos) -> Self {
        let call = Expr::new(
            ExprKind::Call {
                func: Box::new(Expr::name(COMMENT_CALL, pos)),
                args: vec![Expr::new(
                    ExprKind::Constant {
                        value: Constant::Str(text.into()),
                    },
                    pos,
                )],
            },
            pos,
        );
        Self::new(StmtKind::Expr { value: call }, pos)
    }

    /// The comment text, if this statement is a retained comment.
    pub fn comment_text(&self) -> Option<&str> {
        let StmtKind::Expr { value } = &self.kind else {
            return None;
        };
        let ExprKind::Call { func, args } = &value.kind else {
            return None;
        };
        if func.as_name() != Some(COMMENT_CALL) {
            return None;
        }
        match args.as_slice() {
            [
                Expr {
                    kind:
                        ExprKind::Constant {
                            value: Constant::Str(text),
                        },
                    ..
                },
            ] => Some(text),
            _ => None,
        }
    }

    /// Whether this statement is a retained comment.
    pub fn is_comment(&self) -> bool {
        self.comment_text().is_some()
    }

    /// Visit every expression in this statement and its nested blocks,
    /// in source order.
    pub fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        match &self.kind {
            StmtKind::Assign { targets, value } => {
                targets.iter().for_each(|t| t.walk(f));
                value.walk(f);
            }
            StmtKind::AugAssign { target, value, .. } => {
                target.walk(f);
                value.walk(f);
            }
            StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
                test.walk(f);
                body.iter().chain(orelse).for_each(|s| s.walk_exprs(f));
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                target.walk(f);
                iter.walk(f);
                body.iter().chain(orelse).for_each(|s| s.walk_exprs(f));
            }
            StmtKind::Expr { value } => value.walk(f),
            StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
        }
    }
}

impl Module {
    /// Visit every expression in the module, in source order.
    pub fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        for stmt in &self.body {
            stmt.walk_exprs(f);
        }
    }
}

// ─── Normalization ──────────────────────────────────────────────────────────

/// Return a copy of the module with every position reset and every retained
/// comment removed.
///
/// Two VUs are the same program when their normalized modules are equal.
pub fn normalize(module: &Module) -> Module {
    Module {
        body: normalize_body(&module.body),
    }
}

fn normalize_body(body: &[Stmt]) -> Vec<Stmt> {
    body.iter()
        .filter(|s| !s.is_comment())
        .map(normalize_stmt)
        .collect()
}

fn normalize_stmt(stmt: &Stmt) -> Stmt {
    let kind = match &stmt.kind {
        StmtKind::Assign { targets, value } => StmtKind::Assign {
            targets: targets.iter().map(normalize_expr).collect(),
            value: normalize_expr(value),
        },
        StmtKind::AugAssign { target, op, value } => StmtKind::AugAssign {
            target: normalize_expr(target),
            op: *op,
            value: normalize_expr(value),
        },
        StmtKind::If { test, body, orelse } => StmtKind::If {
            test: normalize_expr(test),
            body: normalize_body(body),
            orelse: normalize_body(orelse),
        },
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => StmtKind::For {
            target: normalize_expr(target),
            iter: normalize_expr(iter),
            body: normalize_body(body),
            orelse: normalize_body(orelse),
        },
        StmtKind::While { test, body, orelse } => StmtKind::While {
            test: normalize_expr(test),
            body: normalize_body(body),
            orelse: normalize_body(orelse),
        },
        StmtKind::Expr { value } => StmtKind::Expr {
            value: normalize_expr(value),
        },
        other => other.clone(),
    };
    Stmt::new(kind, Pos::default())
}

fn normalize_expr(expr: &Expr) -> Expr {
    let boxed = |e: &Expr| Box::new(normalize_expr(e));
    let kind = match &expr.kind {
        ExprKind::BoolOp { op, values } => ExprKind::BoolOp {
            op: *op,
            values: values.iter().map(normalize_expr).collect(),
        },
        ExprKind::BinOp { left, op, right } => ExprKind::BinOp {
            left: boxed(left),
            op: *op,
            right: boxed(right),
        },
        ExprKind::UnaryOp { op, operand } => ExprKind::UnaryOp {
            op: *op,
            operand: boxed(operand),
        },
        ExprKind::Compare {
            left,
            ops,
            comparators,
        } => ExprKind::Compare {
            left: boxed(left),
            ops: ops.clone(),
            comparators: comparators.iter().map(normalize_expr).collect(),
        },
        ExprKind::Call { func, args } => ExprKind::Call {
            func: boxed(func),
            args: args.iter().map(normalize_expr).collect(),
        },
        ExprKind::Attribute { value, attr } => ExprKind::Attribute {
            value: boxed(value),
            attr: attr.clone(),
        },
        ExprKind::Subscript { value, index } => ExprKind::Subscript {
            value: boxed(value),
            index: boxed(index),
        },
        ExprKind::IfExp { test, body, orelse } => ExprKind::IfExp {
            test: boxed(test),
            body: boxed(body),
            orelse: boxed(orelse),
        },
        ExprKind::Tuple { elts } => ExprKind::Tuple {
            elts: elts.iter().map(normalize_expr).collect(),
        },
        ExprKind::List { elts } => ExprKind::List {
            elts: elts.iter().map(normalize_expr).collect(),
        },
        ExprKind::Slice { lower, upper, step } => ExprKind::Slice {
            lower: lower.as_deref().map(boxed),
            upper: upper.as_deref().map(boxed),
            step: step.as_deref().map(boxed),
        },
        other @ (ExprKind::Name { .. } | ExprKind::Constant { .. }) => other.clone(),
    };
    Expr::new(kind, Pos::default())
}
