//! Abstract Syntax Tree for `OpenQASM` 2.0.

/// A complete `OpenQASM` 2.0 program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Version from the header, `None` for header-less include files.
    pub version: Option<String>,
    /// Statements in the program.
    pub statements: Vec<Statement>,
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `include "file";`
    Include { path: String, line: usize },

    /// `qreg name[size];`
    Qreg { name: String, size: u32 },

    /// `creg name[size];`
    Creg { name: String, size: u32 },

    /// `gate name(params) qubits { body }`
    GateDef(GateDef),

    /// `opaque name(params) qubits;`
    Opaque {
        name: String,
        params: Vec<String>,
        qubits: Vec<String>,
    },

    /// A quantum operation, possibly guarded by `if (creg == value)`.
    Op {
        op: QuantumOp,
        condition: Option<Condition>,
        line: usize,
    },
}

/// A user gate definition.
#[derive(Debug, Clone, PartialEq)]
pub struct GateDef {
    /// Gate name.
    pub name: String,
    /// Formal angle parameters.
    pub params: Vec<String>,
    /// Formal qubit arguments.
    pub qubits: Vec<String>,
    /// Body operations, referring to formal qubits by name.
    pub body: Vec<GateBodyOp>,
}

/// An operation inside a gate body.
#[derive(Debug, Clone, PartialEq)]
pub enum GateBodyOp {
    /// Gate call on formal qubits.
    Call {
        name: String,
        params: Vec<Expression>,
        qubits: Vec<String>,
    },
    /// Barrier over formal qubits.
    Barrier(Vec<String>),
}

/// `if (register == value)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub register: String,
    pub value: u64,
}

/// Quantum operation on register arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantumOp {
    /// Gate application, including the built-in `U` and `CX`.
    Gate {
        name: String,
        params: Vec<Expression>,
        args: Vec<Argument>,
    },
    /// `measure a -> b;`
    Measure { qubit: Argument, clbit: Argument },
    /// `reset a;`
    Reset(Argument),
    /// `barrier a, b;`
    Barrier(Vec<Argument>),
}

/// A register or a single register element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub register: String,
    pub index: Option<u32>,
}

impl Argument {
    /// Reference to a whole register.
    pub fn register(name: impl Into<String>) -> Self {
        Self {
            register: name.into(),
            index: None,
        }
    }

    /// Reference to one register element.
    pub fn indexed(name: impl Into<String>, index: u32) -> Self {
        Self {
            register: name.into(),
            index: Some(index),
        }
    }
}

/// A classical parameter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Real literal.
    Real(f64),
    /// Integer literal.
    Int(u64),
    /// The constant `pi`.
    Pi,
    /// Formal parameter of an enclosing gate definition.
    Identifier(String),
    /// Unary negation.
    Neg(Box<Expression>),
    /// Binary operation.
    Binary {
        op: BinOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Unary function call: `sin`, `cos`, `tan`, `exp`, `ln` or `sqrt`.
    Call { func: String, arg: Box<Expression> },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}
