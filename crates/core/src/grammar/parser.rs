use super::{
    ast::{BinOp, BoolOp, CmpOp, Constant, Expr, ExprKind, Module, Pos, Stmt, StmtKind, UnaryOp},
    lexer::{TokKind, Token, tokenize},
};
use crate::error::SyntaxError;

/// Words that can never be used as a plain name.
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

const AUGMENTED_OPS: &[(&str, BinOp)] = &[
    ("+=", BinOp::Add),
    ("-=", BinOp::Sub),
    ("*=", BinOp::Mult),
    ("/=", BinOp::Div),
    ("//=", BinOp::FloorDiv),
    ("%=", BinOp::Mod),
    ("**=", BinOp::Pow),
    ("@=", BinOp::MatMult),
    ("<<=", BinOp::LShift),
    (">>=", BinOp::RShift),
    ("|=", BinOp::BitOr),
    ("^=", BinOp::BitXor),
    ("&=", BinOp::BitAnd),
];

type PResult<T> = Result<T, SyntaxError>;

// ─── Public API ─────────────────────────────────────────────────────────────

/// Parse VU text into a [`Module`].
///
/// The grammar accepts a superset of the VU language (for example `while`
/// loops and cascaded assignments) so that the verifier can reject such
/// constructs with a precise message. Positions are relative to `input`.
pub fn parse_vu(input: &str) -> Result<Module, SyntaxError> {
    let toks = tokenize(input)?;
    Parser { toks, pos: 0 }.parse()
}

// ─── Parser Implementation ─────────────────────────────────────────────────

struct Parser<'a> {
    toks: Vec<Token<'a>>,
    pos: usize,
}

fn tok_pos(tok: &Token<'_>) -> Pos {
    Pos::new(tok.line, tok.col)
}

impl<'a> Parser<'a> {
    // ── Token cursor ────────────────────────────────────────────────────

    fn peek(&self) -> Token<'a> {
        // tokenize() always ends the stream with an EndMarker.
        self.toks[self.pos.min(self.toks.len() - 1)]
    }

    fn bump(&mut self) -> Token<'a> {
        let tok = self.peek();
        if tok.kind != TokKind::EndMarker {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, s: &str) -> bool {
        self.peek().is(s)
    }

    fn at_kind(&self, kind: TokKind) -> bool {
        self.peek().kind == kind
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.at(s) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, s: &str) -> PResult<Token<'a>> {
        if self.at(s) {
            Ok(self.bump())
        } else {
            Err(self.error(&format!("expected '{s}'")))
        }
    }

    fn error(&self, msg: &str) -> SyntaxError {
        let tok = self.peek();
        SyntaxError::new(tok.line, tok.col, msg)
    }

    fn invalid(&self) -> SyntaxError {
        let tok = self.peek();
        match tok.kind {
            TokKind::Indent => self.error("unexpected indent"),
            TokKind::Newline | TokKind::EndMarker | TokKind::Dedent => {
                self.error("invalid syntax: unexpected end of line")
            }
            _ => self.error("invalid syntax"),
        }
    }

    // ── Statements ──────────────────────────────────────────────────────

    fn parse(mut self) -> PResult<Module> {
        let mut body = Vec::new();
        while !self.at_kind(TokKind::EndMarker) {
            body.extend(self.statement()?);
        }
        Ok(Module { body })
    }

    fn statement(&mut self) -> PResult<Vec<Stmt>> {
        let tok = self.peek();
        match tok.kind {
            TokKind::Indent => Err(self.error("unexpected indent")),
            TokKind::Name if tok.text == "if" => Ok(vec![self.if_stmt()?]),
            TokKind::Name if tok.text == "for" => Ok(vec![self.for_stmt()?]),
            TokKind::Name if tok.text == "while" => Ok(vec![self.while_stmt()?]),
            _ => self.simple_stmts(),
        }
    }

    fn simple_stmts(&mut self) -> PResult<Vec<Stmt>> {
        let mut out = vec![self.simple_stmt()?];
        while self.eat(";") {
            if self.at_kind(TokKind::Newline) {
                break;
            }
            out.push(self.simple_stmt()?);
        }
        if !self.at_kind(TokKind::Newline) {
            return Err(self.invalid());
        }
        self.bump();
        Ok(out)
    }

    fn simple_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.peek();
        let pos = tok_pos(&tok);
        if tok.kind == TokKind::Name {
            let kind = match tok.text {
                "pass" => Some(StmtKind::Pass),
                "break" => Some(StmtKind::Break),
                "continue" => Some(StmtKind::Continue),
                _ => None,
            };
            if let Some(kind) = kind {
                self.bump();
                return Ok(Stmt::new(kind, pos));
            }
        }
        let first = self.expr_list()?;
        if self.at("=") {
            let mut targets = vec![first];
            while self.eat("=") {
                targets.push(self.expr_list()?);
            }
            let value = targets.pop().ok_or_else(|| self.invalid())?;
            return Ok(Stmt::new(StmtKind::Assign { targets, value }, pos));
        }
        let aug = AUGMENTED_OPS
            .iter()
            .find(|(text, _)| self.at(text))
            .map(|(_, op)| *op);
        if let Some(op) = aug {
            self.bump();
            let value = self.expr_list()?;
            return Ok(Stmt::new(
                StmtKind::AugAssign {
                    target: first,
                    op,
                    value,
                },
                pos,
            ));
        }
        Ok(Stmt::new(StmtKind::Expr { value: first }, pos))
    }

    /// The statements after a compound statement's `:`.
    fn block(&mut self) -> PResult<Vec<Stmt>> {
        if !self.at_kind(TokKind::Newline) {
            return self.simple_stmts();
        }
        self.bump();
        if !self.at_kind(TokKind::Indent) {
            return Err(self.error("expected an indented block"));
        }
        self.bump();
        let mut body = Vec::new();
        while !self.at_kind(TokKind::Dedent) && !self.at_kind(TokKind::EndMarker) {
            body.extend(self.statement()?);
        }
        self.bump();
        Ok(body)
    }

    fn else_block(&mut self) -> PResult<Vec<Stmt>> {
        if self.eat("else") {
            self.expect(":")?;
            self.block()
        } else {
            Ok(Vec::new())
        }
    }

    fn if_stmt(&mut self) -> PResult<Stmt> {
        // Called on `if` or `elif`.
        let pos = tok_pos(&self.bump());
        let test = self.test()?;
        self.expect(":")?;
        let body = self.block()?;
        let orelse = if self.at("elif") {
            vec![self.if_stmt()?]
        } else {
            self.else_block()?
        };
        Ok(Stmt::new(StmtKind::If { test, body, orelse }, pos))
    }

    fn for_stmt(&mut self) -> PResult<Stmt> {
        let pos = tok_pos(&self.bump());
        let target = self.target_list()?;
        self.expect("in")?;
        let iter = self.expr_list()?;
        self.expect(":")?;
        let body = self.block()?;
        let orelse = self.else_block()?;
        Ok(Stmt::new(
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            },
            pos,
        ))
    }

    fn while_stmt(&mut self) -> PResult<Stmt> {
        let pos = tok_pos(&self.bump());
        let test = self.test()?;
        self.expect(":")?;
        let body = self.block()?;
        let orelse = self.else_block()?;
        Ok(Stmt::new(StmtKind::While { test, body, orelse }, pos))
    }

    // ── Expressions ─────────────────────────────────────────────────────

    /// `test (',' test)*`, producing a tuple when a comma is present.
    fn expr_list(&mut self) -> PResult<Expr> {
        let first = self.test()?;
        if !self.at(",") {
            return Ok(first);
        }
        let pos = first.pos;
        let mut elts = vec![first];
        while self.eat(",") {
            if self.ends_expr_list() {
                break;
            }
            elts.push(self.test()?);
        }
        Ok(Expr::new(ExprKind::Tuple { elts }, pos))
    }

    /// `for` targets stop before `in`, so they are parsed below comparisons.
    fn target_list(&mut self) -> PResult<Expr> {
        let first = self.bitor()?;
        if !self.at(",") {
            return Ok(first);
        }
        let pos = first.pos;
        let mut elts = vec![first];
        while self.eat(",") {
            if self.at("in") {
                break;
            }
            elts.push(self.bitor()?);
        }
        Ok(Expr::new(ExprKind::Tuple { elts }, pos))
    }

    fn ends_expr_list(&self) -> bool {
        let tok = self.peek();
        matches!(tok.kind, TokKind::Newline | TokKind::EndMarker)
            || [")", "]", "=", ":", ";"].iter().any(|s| tok.is(s))
    }

    /// Conditional expression: `or_test ['if' or_test 'else' test]`.
    fn test(&mut self) -> PResult<Expr> {
        let body = self.or_test()?;
        if !self.at("if") {
            return Ok(body);
        }
        self.bump();
        let test = self.or_test()?;
        self.expect("else")?;
        let orelse = self.test()?;
        let pos = body.pos;
        Ok(Expr::new(
            ExprKind::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
            pos,
        ))
    }

    fn bool_chain(
        &mut self,
        op: BoolOp,
        next: fn(&mut Self) -> PResult<Expr>,
    ) -> PResult<Expr> {
        let first = next(self)?;
        if !self.at(op.as_str()) {
            return Ok(first);
        }
        let pos = first.pos;
        let mut values = vec![first];
        while self.eat(op.as_str()) {
            values.push(next(self)?);
        }
        Ok(Expr::new(ExprKind::BoolOp { op, values }, pos))
    }

    fn or_test(&mut self) -> PResult<Expr> {
        self.bool_chain(BoolOp::Or, Self::and_test)
    }

    fn and_test(&mut self) -> PResult<Expr> {
        self.bool_chain(BoolOp::And, Self::not_test)
    }

    fn not_test(&mut self) -> PResult<Expr> {
        if self.at("not") {
            let pos = tok_pos(&self.bump());
            let operand = self.not_test()?;
            return Ok(Expr::new(
                ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                pos,
            ));
        }
        self.comparison()
    }

    fn comp_op(&mut self) -> Option<CmpOp> {
        let tok = self.peek();
        let op = match (tok.kind, tok.text) {
            (TokKind::Op, "==") => CmpOp::Eq,
            (TokKind::Op, "!=") => CmpOp::NotEq,
            (TokKind::Op, "<") => CmpOp::Lt,
            (TokKind::Op, "<=") => CmpOp::LtE,
            (TokKind::Op, ">") => CmpOp::Gt,
            (TokKind::Op, ">=") => CmpOp::GtE,
            (TokKind::Name, "in") => CmpOp::In,
            (TokKind::Name, "is") => {
                self.bump();
                return Some(if self.eat("not") {
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                });
            }
            (TokKind::Name, "not") => {
                let next = self.toks.get(self.pos + 1)?;
                if !next.is("in") {
                    return None;
                }
                self.pos += 2;
                return Some(CmpOp::NotIn);
            }
            _ => return None,
        };
        self.bump();
        Some(op)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let left = self.bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.comp_op() {
            ops.push(op);
            comparators.push(self.bitor()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        let pos = left.pos;
        Ok(Expr::new(
            ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
            pos,
        ))
    }

    /// Left-associative binary operator level.
    fn binary_level(
        &mut self,
        ops: &[(&str, BinOp)],
        next: fn(&mut Self) -> PResult<Expr>,
    ) -> PResult<Expr> {
        let mut left = next(self)?;
        loop {
            let tok = self.peek();
            let Some(&(_, op)) = ops
                .iter()
                .find(|(s, _)| tok.kind == TokKind::Op && tok.text == *s)
            else {
                return Ok(left);
            };
            self.bump();
            let right = next(self)?;
            let pos = left.pos;
            left = Expr::new(
                ExprKind::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                pos,
            );
        }
    }

    fn bitor(&mut self) -> PResult<Expr> {
        self.binary_level(&[("|", BinOp::BitOr)], Self::bitxor)
    }

    fn bitxor(&mut self) -> PResult<Expr> {
        self.binary_level(&[("^", BinOp::BitXor)], Self::bitand)
    }

    fn bitand(&mut self) -> PResult<Expr> {
        self.binary_level(&[("&", BinOp::BitAnd)], Self::shift)
    }

    fn shift(&mut self) -> PResult<Expr> {
        self.binary_level(&[("<<", BinOp::LShift), (">>", BinOp::RShift)], Self::arith)
    }

    fn arith(&mut self) -> PResult<Expr> {
        self.binary_level(&[("+", BinOp::Add), ("-", BinOp::Sub)], Self::term)
    }

    fn term(&mut self) -> PResult<Expr> {
        self.binary_level(
            &[
                ("*", BinOp::Mult),
                ("/", BinOp::Div),
                ("//", BinOp::FloorDiv),
                ("%", BinOp::Mod),
                ("@", BinOp::MatMult),
            ],
            Self::factor,
        )
    }

    fn factor(&mut self) -> PResult<Expr> {
        let tok = self.peek();
        let op = match (tok.kind, tok.text) {
            (TokKind::Op, "+") => UnaryOp::UAdd,
            (TokKind::Op, "-") => UnaryOp::USub,
            (TokKind::Op, "~") => UnaryOp::Invert,
            _ => return self.power(),
        };
        self.bump();
        let operand = self.factor()?;
        Ok(Expr::new(
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            tok_pos(&tok),
        ))
    }

    fn power(&mut self) -> PResult<Expr> {
        let base = self.primary()?;
        if !self.at("**") {
            return Ok(base);
        }
        self.bump();
        // Right-associative, and binds tighter than a unary minus on its left.
        let exponent = self.factor()?;
        let pos = base.pos;
        Ok(Expr::new(
            ExprKind::BinOp {
                left: Box::new(base),
                op: BinOp::Pow,
                right: Box::new(exponent),
            },
            pos,
        ))
    }

    fn primary(&mut self) -> PResult<Expr> {
        let mut expr = self.atom()?;
        loop {
            let pos = expr.pos;
            if self.eat("(") {
                let args = self.call_args()?;
                expr = Expr::new(
                    ExprKind::Call {
                        func: Box::new(expr),
                        args,
                    },
                    pos,
                );
            } else if self.eat("[") {
                let index = self.subscript()?;
                self.expect("]")?;
                expr = Expr::new(
                    ExprKind::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    },
                    pos,
                );
            } else if self.eat(".") {
                let tok = self.peek();
                if tok.kind != TokKind::Name || KEYWORDS.contains(&tok.text) {
                    return Err(self.invalid());
                }
                self.bump();
                expr = Expr::new(
                    ExprKind::Attribute {
                        value: Box::new(expr),
                        attr: tok.text.to_string(),
                    },
                    pos,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn call_args(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.at(")") {
            args.push(self.test()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(args)
    }

    fn subscript(&mut self) -> PResult<Expr> {
        let first = self.slice_item()?;
        if !self.at(",") {
            return Ok(first);
        }
        let pos = first.pos;
        let mut elts = vec![first];
        while self.eat(",") {
            if self.at("]") {
                break;
            }
            elts.push(self.slice_item()?);
        }
        Ok(Expr::new(ExprKind::Tuple { elts }, pos))
    }

    fn slice_item(&mut self) -> PResult<Expr> {
        let pos = tok_pos(&self.peek());
        let lower = if self.at(":") {
            None
        } else {
            let e = self.test()?;
            if !self.at(":") {
                return Ok(e);
            }
            Some(Box::new(e))
        };
        self.expect(":")?;
        let bound = |p: &mut Self| -> PResult<Option<Box<Expr>>> {
            if p.at(":") || p.at("]") || p.at(",") {
                Ok(None)
            } else {
                Ok(Some(Box::new(p.test()?)))
            }
        };
        let upper = bound(self)?;
        let step = if self.eat(":") { bound(self)? } else { None };
        Ok(Expr::new(ExprKind::Slice { lower, upper, step }, pos))
    }

    fn atom(&mut self) -> PResult<Expr> {
        let tok = self.peek();
        let pos = tok_pos(&tok);
        match tok.kind {
            TokKind::Name => {
                let value = match tok.text {
                    "True" => Constant::Bool(true),
                    "False" => Constant::Bool(false),
                    "None" => Constant::None,
                    kw if KEYWORDS.contains(&kw) => return Err(self.invalid()),
                    id => {
                        self.bump();
                        return Ok(Expr::name(id, pos));
                    }
                };
                self.bump();
                Ok(Expr::new(ExprKind::Constant { value }, pos))
            }
            TokKind::Number => {
                let value = parse_number(tok.text)
                    .ok_or_else(|| SyntaxError::new(tok.line, tok.col, "invalid numeric literal"))?;
                self.bump();
                Ok(Expr::new(ExprKind::Constant { value }, pos))
            }
            TokKind::Str => {
                let mut text = String::new();
                while self.at_kind(TokKind::Str) {
                    text.push_str(&unquote(self.bump().text));
                }
                Ok(Expr::new(
                    ExprKind::Constant {
                        value: Constant::Str(text),
                    },
                    pos,
                ))
            }
            TokKind::Op if tok.text == "(" => {
                self.bump();
                if self.eat(")") {
                    return Ok(Expr::new(ExprKind::Tuple { elts: Vec::new() }, pos));
                }
                let inner = self.expr_list()?;
                self.expect(")")?;
                Ok(inner)
            }
            TokKind::Op if tok.text == "[" => {
                self.bump();
                let mut elts = Vec::new();
                while !self.at("]") {
                    elts.push(self.test()?);
                    if !self.eat(",") {
                        break;
                    }
                }
                self.expect("]")?;
                Ok(Expr::new(ExprKind::List { elts }, pos))
            }
            _ => Err(self.invalid()),
        }
    }
}

fn parse_number(text: &str) -> Option<Constant> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    let radix = match lower.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&lower[2..], radix).ok().map(Constant::Int);
    }
    if lower.contains(['.', 'e']) {
        return lower
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Constant::Float);
    }
    lower.parse::<u64>().ok().map(Constant::Int)
}

fn unquote(text: &str) -> String {
    let inner = &text[1..text.len().saturating_sub(1).max(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(c @ ('\\' | '\'' | '"')) => out.push(c),
            Some(c) => {
                out.push('\\');
                out.push(c);
            }
            None => out.push('\\'),
        }
    }
    out
}
