//! Tokenizer built on `logos`, with line/column tracking.

use std::ops::Range;

use logos::Logos;

use super::token::Token;
use crate::diagnostic::{CompilerError, Location, Span};

/// A token with its position and byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Span,
    pub range: Range<usize>,
}

/// Maps byte offsets to 1-based line/column pairs.
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { source, line_starts }
    }

    /// Line and column (in characters) of a byte offset.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self.source[start..offset].chars().count() + 1;
        (line + 1, column)
    }

    pub fn span(&self, range: &Range<usize>) -> Span {
        let (start_line, start_col) = self.position(range.start);
        let (end_line, end_col) = self.position(range.end);
        Span::new(start_line, start_col, end_line, end_col)
    }
}

/// Tokenizes `source`, dropping comments.
///
/// `prefix` labels the file in diagnostics.
pub fn lex(source: &str, prefix: &str) -> Result<Vec<Lexeme>, CompilerError> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = index.span(&range);
        match result {
            Ok(token) if token.is_comment() => {}
            Ok(token) => tokens.push(Lexeme { token, span, range }),
            Err(()) => {
                let found = &source[range.clone()];
                let message = if found.starts_with('"') {
                    "unterminated string literal".to_string()
                } else if found.starts_with('`') {
                    "unterminated tag".to_string()
                } else {
                    format!("token recognition error at: '{}'", found.escape_debug())
                };
                return Err(CompilerError::syntax(Location::new(prefix, span), message));
            }
        }
    }

    Ok(tokens)
}
