//! Expression parsing for `OpenQASM` 2.0.

use super::Parser;
use crate::ast::{BinOp, Expression};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

/// Unary functions of the `OpenQASM` 2.0 expression language.
pub(crate) const FUNCTIONS: [&str; 6] = ["sin", "cos", "tan", "exp", "ln", "sqrt"];

const POW_PRECEDENCE: u8 = 3;

fn op_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Add | BinOp::Sub => 1,
        BinOp::Mul | BinOp::Div => 2,
        BinOp::Pow => POW_PRECEDENCE,
    }
}

impl Parser {
    /// Parse an expression.
    pub(super) fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_expr(0)
    }

    /// Parse binary expression with precedence climbing.
    fn parse_binary_expr(&mut self, min_prec: u8) -> ParseResult<Expression> {
        let mut left = self.parse_unary_expr()?;

        while let Some(op) = self.peek_binary_op() {
            let prec = op_precedence(op);
            if prec < min_prec {
                break;
            }
            self.advance();

            // `^` is right-associative
            let next_min = if op == BinOp::Pow { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next_min)?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse unary expression. Negation binds looser than `^`.
    fn parse_unary_expr(&mut self) -> ParseResult<Expression> {
        if self.consume(&Token::Minus) {
            let expr = self.parse_binary_expr(POW_PRECEDENCE)?;
            return Ok(Expression::Neg(Box::new(expr)));
        }
        if self.consume(&Token::Plus) {
            return self.parse_binary_expr(POW_PRECEDENCE);
        }
        self.parse_primary_expr()
    }

    /// Parse primary expression.
    fn parse_primary_expr(&mut self) -> ParseResult<Expression> {
        let token = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof("expression".into()))?;

        match token {
            Token::NnInteger(v) => Ok(Expression::Int(v)),
            Token::Real(v) => Ok(Expression::Real(v)),
            Token::Pi => Ok(Expression::Pi),
            Token::Identifier(name) => {
                if !self.consume(&Token::LParen) {
                    return Ok(Expression::Identifier(name));
                }
                if !FUNCTIONS.contains(&name.as_str()) {
                    return Err(ParseError::UndefinedIdentifier(format!("function '{name}'")));
                }
                let arg = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(Expression::Call {
                    func: name,
                    arg: Box::new(arg),
                })
            }
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            other => Err(self.unexpected("expression", &other)),
        }
    }

    /// Peek at binary operator.
    fn peek_binary_op(&self) -> Option<BinOp> {
        match self.peek()? {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Caret => Some(BinOp::Pow),
            _ => None,
        }
    }

    /// Parse an optional parenthesized expression list: `(a, b, c)`.
    pub(super) fn parse_optional_params(&mut self) -> ParseResult<Vec<Expression>> {
        if !self.consume(&Token::LParen) {
            return Ok(vec![]);
        }
        let mut exprs = Vec::new();
        if !self.check(&Token::RParen) {
            exprs.push(self.parse_expression()?);
            while self.consume(&Token::Comma) {
                exprs.push(self.parse_expression()?);
            }
        }
        self.expect(Token::RParen)?;
        Ok(exprs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expression {
        let mut parser = Parser::new(source).unwrap();
        parser.parse_expression().unwrap()
    }

    #[test]
    fn test_precedence() {
        let e = expr("1 + 2 * pi");
        match e {
            Expression::Binary { op: BinOp::Add, right, .. } => {
                assert!(matches!(*right, Expression::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        let e = expr("2 ^ 3 ^ 2");
        match e {
            Expression::Binary { op: BinOp::Pow, left, right } => {
                assert_eq!(*left, Expression::Int(2));
                assert!(matches!(*right, Expression::Binary { op: BinOp::Pow, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_negation_binds_looser_than_power() {
        assert!(matches!(expr("-2^2"), Expression::Neg(_)));
    }

    #[test]
    fn test_unknown_function() {
        let mut parser = Parser::new("frob(1)").unwrap();
        assert!(matches!(
            parser.parse_expression(),
            Err(ParseError::UndefinedIdentifier(_))
        ));
    }
}
