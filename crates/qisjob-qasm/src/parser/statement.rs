//! Statement parsing for `OpenQASM` 2.0.

use super::Parser;
use crate::ast::{Argument, Condition, GateBodyOp, GateDef, QuantumOp, Statement};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

impl Parser {
    /// Parse a statement.
    pub(super) fn parse_statement(&mut self) -> ParseResult<Statement> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof("statement".into()))?;

        match token {
            Token::Include => self.parse_include(),
            Token::Qreg | Token::Creg => self.parse_register_decl(),
            Token::Gate => self.parse_gate_def(),
            Token::Opaque => self.parse_opaque(),
            Token::If => self.parse_if(),
            Token::Barrier => {
                let line = self.current_line();
                self.advance();
                let args = self.parse_argument_list()?;
                self.expect(Token::Semicolon)?;
                Ok(Statement::Op {
                    op: QuantumOp::Barrier(args),
                    condition: None,
                    line,
                })
            }
            Token::Measure | Token::Reset | Token::GateU | Token::GateCX | Token::Identifier(_) => {
                let line = self.current_line();
                let op = self.parse_quantum_op()?;
                Ok(Statement::Op {
                    op,
                    condition: None,
                    line,
                })
            }
            other => {
                self.advance();
                Err(self.unexpected("statement", &other))
            }
        }
    }

    /// Parse include statement.
    fn parse_include(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Include)?;
        let line = self.line;
        let path = match self.advance() {
            Some(Token::Filename(s)) => s,
            Some(other) => return Err(self.unexpected("file name", &other)),
            None => return Err(ParseError::UnexpectedEof("include path".into())),
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Include { path, line })
    }

    /// Parse `qreg name[n];` or `creg name[n];`.
    fn parse_register_decl(&mut self) -> ParseResult<Statement> {
        let quantum = matches!(self.advance(), Some(Token::Qreg));
        let name = self.parse_identifier()?;
        let size = self.parse_bracketed_u32()?;
        self.expect(Token::Semicolon)?;
        if quantum {
            Ok(Statement::Qreg { name, size })
        } else {
            Ok(Statement::Creg { name, size })
        }
    }

    /// Parse `(a, b)` formal parameter names, if present.
    fn parse_formal_params(&mut self) -> ParseResult<Vec<String>> {
        if !self.consume(&Token::LParen) {
            return Ok(vec![]);
        }
        if self.consume(&Token::RParen) {
            return Ok(vec![]);
        }
        let params = self.parse_identifier_list()?;
        self.expect(Token::RParen)?;
        Ok(params)
    }

    /// Parse a gate definition.
    fn parse_gate_def(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Gate)?;
        let name = self.parse_identifier()?;
        let params = self.parse_formal_params()?;
        let qubits = self.parse_identifier_list()?;
        self.expect(Token::LBrace)?;

        let mut body = Vec::new();
        while !self.consume(&Token::RBrace) {
            body.push(self.parse_gate_body_op()?);
        }

        Ok(Statement::GateDef(GateDef {
            name,
            params,
            qubits,
            body,
        }))
    }

    fn parse_gate_body_op(&mut self) -> ParseResult<GateBodyOp> {
        let token = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof("gate body".into()))?;

        let name = match token {
            Token::Barrier => {
                let qubits = self.parse_identifier_list()?;
                self.expect(Token::Semicolon)?;
                return Ok(GateBodyOp::Barrier(qubits));
            }
            Token::GateU => "U".to_string(),
            Token::GateCX => "CX".to_string(),
            Token::Identifier(name) => name,
            other => return Err(self.unexpected("gate operation", &other)),
        };
        let params = self.parse_optional_params()?;
        let qubits = self.parse_identifier_list()?;
        self.expect(Token::Semicolon)?;
        Ok(GateBodyOp::Call {
            name,
            params,
            qubits,
        })
    }

    /// Parse `opaque name(params) qubits;`.
    fn parse_opaque(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Opaque)?;
        let name = self.parse_identifier()?;
        let params = self.parse_formal_params()?;
        let qubits = self.parse_identifier_list()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::Opaque {
            name,
            params,
            qubits,
        })
    }

    /// Parse `if (creg == n) qop`.
    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.expect(Token::If)?;
        let line = self.line;
        self.expect(Token::LParen)?;
        let register = self.parse_identifier()?;
        self.expect(Token::EqEq)?;
        let value = self.parse_int_literal()?;
        self.expect(Token::RParen)?;
        let op = self.parse_quantum_op()?;
        Ok(Statement::Op {
            op,
            condition: Some(Condition { register, value }),
            line,
        })
    }

    /// Parse a gate application, `measure` or `reset`.
    fn parse_quantum_op(&mut self) -> ParseResult<QuantumOp> {
        let token = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof("quantum operation".into()))?;

        let op = match token {
            Token::Measure => {
                let qubit = self.parse_argument()?;
                self.expect(Token::Arrow)?;
                let clbit = self.parse_argument()?;
                QuantumOp::Measure { qubit, clbit }
            }
            Token::Reset => QuantumOp::Reset(self.parse_argument()?),
            Token::GateU => self.parse_gate_call("U".into())?,
            Token::GateCX => self.parse_gate_call("CX".into())?,
            Token::Identifier(name) => self.parse_gate_call(name)?,
            other => return Err(self.unexpected("quantum operation", &other)),
        };
        self.expect(Token::Semicolon)?;
        Ok(op)
    }

    fn parse_gate_call(&mut self, name: String) -> ParseResult<QuantumOp> {
        let params = self.parse_optional_params()?;
        let args = self.parse_argument_list()?;
        Ok(QuantumOp::Gate { name, params, args })
    }

    /// Parse `reg` or `reg[i]`.
    fn parse_argument(&mut self) -> ParseResult<Argument> {
        let register = self.parse_identifier()?;
        if self.check(&Token::LBracket) {
            let index = self.parse_bracketed_u32()?;
            Ok(Argument::indexed(register, index))
        } else {
            Ok(Argument::register(register))
        }
    }

    fn parse_argument_list(&mut self) -> ParseResult<Vec<Argument>> {
        let mut args = vec![self.parse_argument()?];
        while self.consume(&Token::Comma) {
            args.push(self.parse_argument()?);
        }
        Ok(args)
    }
}
