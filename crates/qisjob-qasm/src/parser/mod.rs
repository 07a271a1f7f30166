//! Parser for `OpenQASM` 2.0.

mod expression;
mod lowering;
mod statement;

use std::path::PathBuf;

use qisjob_ir::Circuit;

use crate::ast::Program;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Options controlling how a source is parsed and lowered.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Directories searched for `include` files after the working directory.
    pub include_path: Vec<PathBuf>,
    /// Name given to the resulting circuit.
    pub name: Option<String>,
}

impl ParseOptions {
    /// Add a directory to the include search path.
    #[must_use]
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_path.push(dir.into());
        self
    }

    /// Set the circuit name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Parse an `OpenQASM` 2.0 source string into a Circuit.
pub fn parse(source: &str) -> ParseResult<Circuit> {
    parse_with_options(source, &ParseOptions::default())
}

/// Parse an `OpenQASM` 2.0 source string, resolving includes through `options`.
pub fn parse_with_options(source: &str, options: &ParseOptions) -> ParseResult<Circuit> {
    let program = parse_ast(source)?;
    lowering::lower_to_circuit(&program, options)
}

/// Parse an `OpenQASM` 2.0 source string into an AST Program.
pub fn parse_ast(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source)?;
    parser.parse_program(true)
}

/// Parse the contents of an include file. The version header is optional.
pub(crate) fn parse_include_ast(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source)?;
    parser.parse_program(false)
}

/// Parser state.
pub(super) struct Parser {
    pub(super) tokens: Vec<SpannedToken>,
    pub(super) pos: usize,
    pub(super) line: usize,
}

impl Parser {
    /// Create a new parser from source.
    fn new(source: &str) -> ParseResult<Self> {
        let tokens = tokenize(source).map_err(|e| ParseError::LexerError {
            line: e.line,
            message: e.message,
        })?;

        Ok(Self {
            tokens,
            pos: 0,
            line: 1,
        })
    }

    /// Check if we've reached the end.
    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Peek at the current token.
    pub(super) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Advance and return the current token.
    pub(super) fn advance(&mut self) -> Option<Token> {
        let spanned = self.tokens.get(self.pos)?;
        self.line = spanned.line;
        self.pos += 1;
        Some(spanned.token.clone())
    }

    /// Line of the next token, or of the last one at end of input.
    pub(super) fn current_line(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.line, |t| t.line)
    }

    pub(super) fn unexpected(&self, expected: &str, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.line,
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Expect a specific token.
    #[allow(clippy::needless_pass_by_value)]
    pub(super) fn expect(&mut self, expected: Token) -> ParseResult<()> {
        let found = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof(format!("expected {expected}")))?;

        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(self.unexpected(&expected.to_string(), &found));
        }
        Ok(())
    }

    /// Check if current token matches.
    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    /// Consume token if it matches.
    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Parse the entire program.
    fn parse_program(&mut self, require_header: bool) -> ParseResult<Program> {
        let version = if require_header || self.check(&Token::OpenQasm) {
            self.expect(Token::OpenQasm)?;
            let version = self.parse_version()?;
            self.expect(Token::Semicolon)?;
            Some(version)
        } else {
            None
        };

        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.parse_statement()?);
        }

        Ok(Program {
            version,
            statements,
        })
    }

    /// Parse version number. Only 2.x is accepted.
    fn parse_version(&mut self) -> ParseResult<String> {
        let version = match self.advance() {
            Some(Token::Real(v)) => format!("{v:.1}"),
            Some(Token::NnInteger(v)) => format!("{v}.0"),
            Some(other) => return Err(ParseError::InvalidVersion(other.to_string())),
            None => return Err(ParseError::UnexpectedEof("version number".into())),
        };
        if !version.starts_with("2.") {
            return Err(ParseError::InvalidVersion(version));
        }
        Ok(version)
    }

    /// Parse identifier list.
    pub(super) fn parse_identifier_list(&mut self) -> ParseResult<Vec<String>> {
        let mut ids = vec![self.parse_identifier()?];
        while self.consume(&Token::Comma) {
            ids.push(self.parse_identifier()?);
        }
        Ok(ids)
    }

    /// Parse an identifier.
    pub(super) fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(other) => Err(self.unexpected("identifier", &other)),
            None => Err(ParseError::UnexpectedEof("identifier".into())),
        }
    }

    /// Parse a non-negative integer literal.
    pub(super) fn parse_int_literal(&mut self) -> ParseResult<u64> {
        match self.advance() {
            Some(Token::NnInteger(v)) => Ok(v),
            Some(other) => Err(self.unexpected("integer", &other)),
            None => Err(ParseError::UnexpectedEof("integer".into())),
        }
    }

    /// Parse `[n]` into a u32 index or size.
    pub(super) fn parse_bracketed_u32(&mut self) -> ParseResult<u32> {
        self.expect(Token::LBracket)?;
        let value = self.parse_int_literal()?;
        self.expect(Token::RBracket)?;
        u32::try_from(value).map_err(|_| ParseError::Generic(format!("{value} exceeds u32 range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{QuantumOp, Statement};

    #[test]
    fn test_parse_bell_state() {
        let source = r#"
            OPENQASM 2.0;
            include "qelib1.inc";
            qreg q[2];
            creg c[2];
            h q[0];
            cx q[0],q[1];
            measure q -> c;
        "#;

        let circuit = parse(source).unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.depth(), 3);
        assert_eq!(circuit.count_ops().get("measure"), Some(&2));
    }

    #[test]
    fn test_parse_ast_statements() {
        let program = parse_ast("OPENQASM 2.0;\nqreg q[1];\nU(0,0,pi) q[0];").unwrap();
        assert_eq!(program.version.as_deref(), Some("2.0"));
        assert_eq!(
            program.statements[0],
            Statement::Qreg {
                name: "q".into(),
                size: 1
            }
        );
        assert!(matches!(
            &program.statements[1],
            Statement::Op { op: QuantumOp::Gate { name, .. }, line: 3, .. } if name == "U"
        ));
    }

    #[test]
    fn test_rejects_version_three() {
        assert!(matches!(
            parse("OPENQASM 3.0;\nqubit q;"),
            Err(ParseError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            parse("qreg q[1];"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_unexpected_token_reports_line() {
        let err = parse("OPENQASM 2.0;\nqreg q[2];\ncreg c[2]\nh q[0];").unwrap_err();
        match err {
            ParseError::UnexpectedToken { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {other}"),
        }
    }
}
