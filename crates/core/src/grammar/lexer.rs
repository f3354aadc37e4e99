use crate::error::SyntaxError;

/// Classification of a VU lexer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokKind {
    /// Identifier or keyword.
    Name,
    /// Integer or floating point literal.
    Number,
    /// Quoted string literal (quotes included in `text`).
    Str,
    /// Operator or delimiter.
    Op,
    /// End of a logical line.
    Newline,
    /// Indentation increased.
    Indent,
    /// Indentation decreased by one level.
    Dedent,
    /// End of input.
    EndMarker,
}

/// A token that borrows its text directly from the source input.
#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    /// The classification of this token.
    pub kind: TokKind,
    /// Borrowed slice of the source input (empty for layout tokens).
    pub text: &'a str,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub col: u32,
}

impl Token<'_> {
    /// Whether this is the operator or keyword `s`.
    pub fn is(&self, s: &str) -> bool {
        matches!(self.kind, TokKind::Op | TokKind::Name) && self.text == s
    }
}

const THREE_CHAR_OPS: &[&str] = &["**=", "//=", ">>=", "<<="];
const TWO_CHAR_OPS: &[&str] = &[
    "**", "//", "<<", ">>", "<=", ">=", "==", "!=", "->", ":=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=",
];
const ONE_CHAR_OPS: &[u8] = b"+-*/%@|^&~<>()[]{},:.;=";

/// Tokenize VU text into a stream with Python-style layout tokens.
///
/// Blank and comment-only lines produce no tokens. Inside brackets, line
/// breaks are ignored; a trailing `\` joins the next line.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    input: &'a str,
    b: &'a [u8],
    i: usize,
    line: u32,
    line_start: usize,
    depth: usize,
    indents: Vec<usize>,
    toks: Vec<Token<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            b: input.as_bytes(),
            i: 0,
            line: 1,
            line_start: 0,
            depth: 0,
            indents: vec![0],
            toks: Vec::new(),
        }
    }

    fn col(&self, at: usize) -> u32 {
        (self.input[self.line_start..at].chars().count() + 1) as u32
    }

    fn err(&self, at: usize, msg: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.line, self.col(at), msg)
    }

    fn push(&mut self, kind: TokKind, start: usize, end: usize) {
        self.toks.push(Token {
            kind,
            text: &self.input[start..end],
            line: self.line,
            col: self.col(start),
        });
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, SyntaxError> {
        let mut at_line_start = true;
        while self.i < self.b.len() {
            if at_line_start {
                if self.depth == 0 && !self.indentation()? {
                    continue;
                }
                at_line_start = false;
            }
            let c = self.b[self.i];
            let start = self.i;
            match c {
                b'\n' => {
                    if self.depth == 0 && self.last_is_content() {
                        self.push(TokKind::Newline, start, start);
                    }
                    self.newline();
                    at_line_start = true;
                }
                b' ' | b'\t' | b'\r' | b'\x0c' => self.i += 1,
                b'#' => {
                    while self.i < self.b.len() && self.b[self.i] != b'\n' {
                        self.i += 1;
                    }
                }
                b'\\' => {
                    let mut j = self.i + 1;
                    if self.b.get(j) == Some(&b'\r') {
                        j += 1;
                    }
                    if self.b.get(j) != Some(&b'\n') {
                        return Err(self.err(start, "unexpected character after line continuation character"));
                    }
                    self.i = j;
                    self.newline();
                }
                b'\'' | b'"' => self.string(c)?,
                b'0'..=b'9' => self.number()?,
                b'.' if self.b.get(self.i + 1).is_some_and(u8::is_ascii_digit) => self.number()?,
                c if c == b'_' || c.is_ascii_alphabetic() => {
                    while self.i < self.b.len()
                        && (self.b[self.i] == b'_' || self.b[self.i].is_ascii_alphanumeric())
                    {
                        self.i += 1;
                    }
                    self.push(TokKind::Name, start, self.i);
                }
                _ => self.operator()?,
            }
        }
        if self.depth > 0 {
            return Err(self.err(self.i, "unexpected EOF while parsing"));
        }
        if self.last_is_content() {
            self.push(TokKind::Newline, self.i, self.i);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokKind::Dedent, self.i, self.i);
        }
        self.push(TokKind::EndMarker, self.i, self.i);
        Ok(self.toks)
    }

    fn newline(&mut self) {
        self.i += 1;
        self.line += 1;
        self.line_start = self.i;
    }

    fn last_is_content(&self) -> bool {
        self.toks.last().is_some_and(|t| {
            !matches!(
                t.kind,
                TokKind::Newline | TokKind::Indent | TokKind::Dedent
            )
        })
    }

    /// Measure leading whitespace and emit layout tokens. Returns `false`
    /// when the line is blank or comment-only.
    fn indentation(&mut self) -> Result<bool, SyntaxError> {
        let mut width = 0usize;
        while self.i < self.b.len() {
            match self.b[self.i] {
                b' ' => width += 1,
                b'\t' => width = (width / 8 + 1) * 8,
                b'\x0c' => width = 0,
                _ => break,
            }
            self.i += 1;
        }
        match self.b.get(self.i) {
            None | Some(b'#') | Some(b'\n') | Some(b'\r') => {
                while self.i < self.b.len() && self.b[self.i] != b'\n' {
                    self.i += 1;
                }
                if self.i < self.b.len() {
                    self.newline();
                }
                return Ok(false);
            }
            _ => {}
        }
        let current = *self.indents.last().unwrap_or(&0);
        if width > current {
            self.indents.push(width);
            self.push(TokKind::Indent, self.i, self.i);
        } else if width < current {
            while *self.indents.last().unwrap_or(&0) > width {
                self.indents.pop();
                self.push(TokKind::Dedent, self.i, self.i);
            }
            if *self.indents.last().unwrap_or(&0) != width {
                return Err(self.err(
                    self.i,
                    "unindent does not match any outer indentation level",
                ));
            }
        }
        Ok(true)
    }

    fn string(&mut self, quote: u8) -> Result<(), SyntaxError> {
        let start = self.i;
        self.i += 1;
        while self.i < self.b.len() {
            match self.b[self.i] {
                b'\\' => self.i += 2,
                b'\n' => break,
                c if c == quote => {
                    self.i += 1;
                    self.push(TokKind::Str, start, self.i);
                    return Ok(());
                }
                _ => self.i += 1,
            }
        }
        Err(self.err(start, "unterminated string literal"))
    }

    fn number(&mut self) -> Result<(), SyntaxError> {
        let start = self.i;
        let radix_prefix = self.b[self.i] == b'0'
            && matches!(self.b.get(self.i + 1), Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B'));
        if radix_prefix {
            self.i += 2;
            while self.i < self.b.len()
                && (self.b[self.i].is_ascii_hexdigit() || self.b[self.i] == b'_')
            {
                self.i += 1;
            }
        } else {
            let digits = |lx: &mut Self| {
                while lx.i < lx.b.len() && (lx.b[lx.i].is_ascii_digit() || lx.b[lx.i] == b'_') {
                    lx.i += 1;
                }
            };
            digits(self);
            if self.b.get(self.i) == Some(&b'.') {
                self.i += 1;
                digits(self);
            }
            if matches!(self.b.get(self.i), Some(b'e' | b'E')) {
                self.i += 1;
                if matches!(self.b.get(self.i), Some(b'+' | b'-')) {
                    self.i += 1;
                }
                digits(self);
            }
        }
        if self
            .b
            .get(self.i)
            .is_some_and(|c| c.is_ascii_alphabetic() || *c == b'_')
        {
            return Err(self.err(start, "invalid decimal literal"));
        }
        self.push(TokKind::Number, start, self.i);
        Ok(())
    }

    fn operator(&mut self) -> Result<(), SyntaxError> {
        let start = self.i;
        let rest = &self.input[start..];
        let len = if THREE_CHAR_OPS.iter().any(|op| rest.starts_with(op)) {
            3
        } else if TWO_CHAR_OPS.iter().any(|op| rest.starts_with(op)) {
            2
        } else if ONE_CHAR_OPS.contains(&self.b[start]) {
            1
        } else {
            let ch = rest.chars().next().unwrap_or('\0');
            return Err(self.err(
                start,
                format!("invalid character '{ch}' (U+{:04X})", ch as u32),
            ));
        };
        match self.b[start] {
            b'(' | b'[' | b'{' => self.depth += 1,
            b')' | b']' | b'}' => {
                if self.depth == 0 {
                    return Err(self.err(
                        start,
                        format!("unmatched '{}'", self.b[start] as char),
                    ));
                }
                self.depth -= 1;
            }
            _ => {}
        }
        self.i += len;
        self.push(TokKind::Op, start, self.i);
        Ok(())
    }
}
