//! `OpenQASM` 2.0 parser and emitter for qisjob.
//!
//! Source files handed to qisjob are `OpenQASM` 2.0 programs. This crate
//! parses them into a [`qisjob_ir::Circuit`], inlining user gate definitions
//! down to the standard gate set, and writes circuits back out as `OpenQASM`
//! 2.0 or 3.0 text for backends that want a string.
//!
//! # Supported Features
//!
//! | Feature | Example |
//! |---------|---------|
//! | Version header | `OPENQASM 2.0;` |
//! | Standard library | `include "qelib1.inc";` |
//! | Other includes | `include "mylib.inc";` (working dir, then include path) |
//! | Registers | `qreg q[5];`, `creg c[5];` |
//! | Built-in gates | `U(theta,phi,lambda) q[0];`, `CX q[0],q[1];` |
//! | Library gates | `h q[0];`, `u3(pi/2,0,pi) q[1];` |
//! | Gate definitions | `gate bell a,b { h a; cx a,b; }` |
//! | Broadcasting | `h q;`, `measure q -> c;` |
//! | Conditions | `if(c==1) x q[0];` |
//! | Reset, barrier | `reset q[0];`, `barrier q;` |
//! | Expressions | `rz(-pi/4 + 2*sin(0.1)) q[0];` |
//!
//! `opaque` gates parse but cannot be lowered.
//!
//! # Example
//!
//! ```rust
//! use qisjob_qasm::{emit, parse};
//!
//! let source = r#"
//! OPENQASM 2.0;
//! include "qelib1.inc";
//! qreg q[2];
//! creg c[2];
//! h q[0];
//! cx q[0],q[1];
//! measure q -> c;
//! "#;
//!
//! let circuit = parse(source).unwrap();
//! assert_eq!(circuit.num_qubits(), 2);
//!
//! let text = emit(&circuit);
//! let reparsed = parse(&text).unwrap();
//! assert_eq!(circuit.instructions(), reparsed.instructions());
//! ```

mod ast;
mod emitter;
mod error;
mod lexer;
mod parser;

pub use emitter::{emit, emit_qasm3};
pub use error::{ParseError, ParseResult};
pub use parser::{ParseOptions, parse, parse_ast, parse_with_options};

// Re-export AST types for advanced users
pub mod syntax {
    pub use crate::ast::*;
    pub use crate::lexer::{LexError, SpannedToken, Token, tokenize};
}
