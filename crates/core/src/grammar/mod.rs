/// VU abstract syntax tree types.
pub mod ast;
/// JSON serialization helpers for the AST.
pub mod dump;
/// VU lexer: tokenizes VU text with Python-style layout tokens.
pub mod lexer;
/// Macro definition values and `macro(name)` expansion.
pub mod macros;
/// VU parser: converts tokens into an AST.
pub mod parser;
/// Bullet, indentation and comment conventions of VU paragraphs.
pub mod source;
