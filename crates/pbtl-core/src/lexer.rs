//! Lexical analysis for PBTL property formulas
//!
//! Tokenizes the property grammar: identifiers, the `EP` keyword, boolean
//! constants and the punctuators `& | ! ( )`, with position tracking for
//! error reporting.

use crate::error::{PbtlError, PbtlResult};

/// Token kinds of the property grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    True,
    False,
    Ep,
    And,
    Or,
    Not,
    LParen,
    RParen,
    Eof,
}

/// A token together with its source position (1-indexed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Character-level lexer with line/column tracking
#[derive(Debug)]
pub struct FormulaLexer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl FormulaLexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn error(&self, message: impl Into<String>) -> PbtlError {
        PbtlError::syntax(self.line, self.column, message)
    }

    /// Tokenize the whole source; the final token is always `Eof`.
    pub fn tokenize(mut self) -> PbtlResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let (line, column) = (self.line, self.column);
            let kind = match self.peek() {
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        line,
                        column,
                    });
                    break;
                }
                Some('&') => {
                    self.advance();
                    TokenKind::And
                }
                Some('|') => {
                    self.advance();
                    TokenKind::Or
                }
                Some('!') => {
                    self.advance();
                    TokenKind::Not
                }
                Some('(') => {
                    self.advance();
                    TokenKind::LParen
                }
                Some(')') => {
                    self.advance();
                    TokenKind::RParen
                }
                Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                    let mut ident = String::new();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            ident.push(self.advance().unwrap());
                        } else {
                            break;
                        }
                    }
                    // EP, TRUE and FALSE are reserved regardless of case
                    if ident.eq_ignore_ascii_case("EP") {
                        TokenKind::Ep
                    } else if ident.eq_ignore_ascii_case("TRUE") {
                        TokenKind::True
                    } else if ident.eq_ignore_ascii_case("FALSE") {
                        TokenKind::False
                    } else {
                        TokenKind::Ident(ident)
                    }
                }
                Some(ch) => {
                    return Err(self.error(format!("Unexpected character '{}'", ch)));
                }
            };
            tokens.push(Token { kind, line, column });
        }
        Ok(tokens)
    }
}
