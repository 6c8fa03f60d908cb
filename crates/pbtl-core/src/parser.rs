//! Recursive-descent parser for the PBTL property grammar
//!
//! ```text
//! formula     := disjunction
//! disjunction := conjunction ( '|' conjunction )*
//! conjunction := unary ( '&' unary )*
//! unary       := '!' unary | primary
//! primary     := 'EP' '(' formula ')' | '(' formula ')' | 'TRUE' | 'FALSE' | IDENT
//! ```

use crate::ast::Formula;
use crate::error::{PbtlError, PbtlResult};
use crate::lexer::{FormulaLexer, Token, TokenKind};

/// Parse a complete property formula from source text.
pub fn parse_formula(source: &str) -> PbtlResult<Formula> {
    let tokens = FormulaLexer::new(source).tokenize()?;
    let mut parser = FormulaParser {
        tokens,
        position: 0,
    };
    let formula = parser.disjunction()?;
    parser.expect_eof()?;
    Ok(formula)
}

struct FormulaParser {
    tokens: Vec<Token>,
    position: usize,
}

impl FormulaParser {
    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    // Consume and return the current token; Eof is never advanced past.
    fn bump(&mut self) -> Token {
        let token = self.tokens[self.position].clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> PbtlResult<()> {
        if self.peek().kind == kind {
            self.bump();
            Ok(())
        } else {
            let token = self.peek();
            Err(PbtlError::syntax(token.line, token.column, message))
        }
    }

    fn expect_eof(&self) -> PbtlResult<()> {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(PbtlError::syntax(
                token.line,
                token.column,
                "Unexpected trailing input",
            ))
        }
    }

    fn disjunction(&mut self) -> PbtlResult<Formula> {
        let mut formula = self.conjunction()?;
        while self.peek().kind == TokenKind::Or {
            self.bump();
            let right = self.conjunction()?;
            formula = Formula::or(formula, right);
        }
        Ok(formula)
    }

    fn conjunction(&mut self) -> PbtlResult<Formula> {
        let mut formula = self.unary()?;
        while self.peek().kind == TokenKind::And {
            self.bump();
            let right = self.unary()?;
            formula = Formula::and(formula, right);
        }
        Ok(formula)
    }

    fn unary(&mut self) -> PbtlResult<Formula> {
        if self.peek().kind == TokenKind::Not {
            self.bump();
            Ok(Formula::not(self.unary()?))
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> PbtlResult<Formula> {
        let token = self.bump();
        match token.kind {
            TokenKind::True => Ok(Formula::True),
            TokenKind::False => Ok(Formula::False),
            TokenKind::Ident(name) => Ok(Formula::Prop(name)),
            TokenKind::Ep => {
                self.expect(TokenKind::LParen, "Expected '(' after EP")?;
                if self.peek().kind == TokenKind::RParen {
                    let close = self.peek();
                    return Err(PbtlError::syntax(
                        close.line,
                        close.column,
                        "Empty EP() body",
                    ));
                }
                let body = self.disjunction()?;
                self.expect(TokenKind::RParen, "Expected ')' to close EP(")?;
                Ok(Formula::ep(body))
            }
            TokenKind::LParen => {
                let inner = self.disjunction()?;
                self.expect(TokenKind::RParen, "Expected ')'")?;
                Ok(inner)
            }
            TokenKind::Eof => Err(PbtlError::syntax(
                token.line,
                token.column,
                "Unexpected end of input",
            )),
            TokenKind::And | TokenKind::Or => Err(PbtlError::syntax(
                token.line,
                token.column,
                "Expected operand before binary operator",
            )),
            TokenKind::Not | TokenKind::RParen => Err(PbtlError::syntax(
                token.line,
                token.column,
                "Expected a proposition, constant, EP(...) or parenthesized formula",
            )),
        }
    }
}
