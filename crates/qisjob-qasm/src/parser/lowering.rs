//! AST-to-Circuit lowering for `OpenQASM` 2.0.
//!
//! User gate definitions are inlined down to the standard gate set, register
//! arguments are broadcast, and `include` statements are resolved against the
//! working directory and the configured include path.

use std::path::{Path, PathBuf};

use qisjob_ir::{
    Circuit, ClassicalCondition, ClbitId, Instruction, IrError, QubitId, StandardGate,
};
use rustc_hash::FxHashMap;
use tracing::debug;

use super::{ParseOptions, parse_include_ast};
use crate::ast::{Argument, BinOp, Condition, Expression, GateBodyOp, GateDef, Program, QuantumOp, Statement};
use crate::error::{ParseError, ParseResult};

/// The include file that enables the standard gate library.
pub const QELIB1: &str = "qelib1.inc";

/// Gates made available by `qelib1.inc`: (name, parameters, qubits).
const QELIB1_GATES: &[(&str, usize, usize)] = &[
    ("u3", 3, 1),
    ("u2", 2, 1),
    ("u1", 1, 1),
    ("u0", 1, 1),
    ("u", 3, 1),
    ("p", 1, 1),
    ("id", 0, 1),
    ("x", 0, 1),
    ("y", 0, 1),
    ("z", 0, 1),
    ("h", 0, 1),
    ("s", 0, 1),
    ("sdg", 0, 1),
    ("t", 0, 1),
    ("tdg", 0, 1),
    ("sx", 0, 1),
    ("sxdg", 0, 1),
    ("rx", 1, 1),
    ("ry", 1, 1),
    ("rz", 1, 1),
    ("cx", 0, 2),
    ("cy", 0, 2),
    ("cz", 0, 2),
    ("ch", 0, 2),
    ("swap", 0, 2),
    ("crx", 1, 2),
    ("cry", 1, 2),
    ("crz", 1, 2),
    ("cu1", 1, 2),
    ("cp", 1, 2),
    ("cu3", 3, 2),
    ("rxx", 1, 2),
    ("rzz", 1, 2),
    ("ccx", 0, 3),
    ("cswap", 0, 3),
];

fn qelib1_signature(name: &str) -> Option<(usize, usize)> {
    QELIB1_GATES
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|&(_, p, q)| (p, q))
}

/// Lower an AST Program to a Circuit.
pub(crate) fn lower_to_circuit(program: &Program, options: &ParseOptions) -> ParseResult<Circuit> {
    let name = options.name.clone().unwrap_or_else(|| "circuit".into());
    let mut lowerer = Lowerer {
        options,
        circuit: Circuit::new(name),
        gates: FxHashMap::default(),
        stdlib: false,
        include_stack: Vec::new(),
    };
    lowerer.lower_program(program)?;
    Ok(lowerer.circuit)
}

enum GateEntry {
    Defined(GateDef),
    Opaque { params: usize, qubits: usize },
}

struct Lowerer<'a> {
    options: &'a ParseOptions,
    circuit: Circuit,
    gates: FxHashMap<String, GateEntry>,
    /// Whether `qelib1.inc` has been included.
    stdlib: bool,
    include_stack: Vec<PathBuf>,
}

impl Lowerer<'_> {
    fn lower_program(&mut self, program: &Program) -> ParseResult<()> {
        for stmt in &program.statements {
            self.lower_statement(stmt)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, stmt: &Statement) -> ParseResult<()> {
        match stmt {
            Statement::Include { path, line } => self.include(path, *line),
            Statement::Qreg { name, size } => {
                self.check_register_name(name)?;
                self.circuit.add_qreg(name.as_str(), *size)?;
                Ok(())
            }
            Statement::Creg { name, size } => {
                self.check_register_name(name)?;
                self.circuit.add_creg(name.as_str(), *size)?;
                Ok(())
            }
            Statement::GateDef(def) => self.define_gate(def),
            Statement::Opaque {
                name,
                params,
                qubits,
            } => {
                if self.gates.contains_key(name) {
                    return Err(ParseError::DuplicateDeclaration(name.clone()));
                }
                self.gates.insert(
                    name.clone(),
                    GateEntry::Opaque {
                        params: params.len(),
                        qubits: qubits.len(),
                    },
                );
                Ok(())
            }
            Statement::Op {
                op,
                condition,
                line,
            } => self
                .lower_op(op, condition.as_ref())
                .map_err(|e| annotate_line(e, *line)),
        }
    }

    fn check_register_name(&self, name: &str) -> ParseResult<()> {
        if self.circuit.qreg(name).is_some() || self.circuit.creg(name).is_some() {
            return Err(ParseError::DuplicateDeclaration(name.to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Includes
    // =========================================================================

    fn include(&mut self, path: &str, line: usize) -> ParseResult<()> {
        if path == QELIB1 {
            self.stdlib = true;
            return Ok(());
        }

        let resolved = self
            .resolve_include(path)
            .ok_or_else(|| ParseError::IncludeNotFound(format!("{path} (line {line})")))?;
        if self.include_stack.contains(&resolved) {
            return Err(ParseError::Generic(format!(
                "recursive include of {}",
                resolved.display()
            )));
        }
        debug!(path = %resolved.display(), "including");

        let source = std::fs::read_to_string(&resolved).map_err(|source| ParseError::Io {
            path: resolved.clone(),
            source,
        })?;
        let program = parse_include_ast(&source)?;

        self.include_stack.push(resolved);
        let result = self.lower_program(&program);
        self.include_stack.pop();
        result
    }

    fn resolve_include(&self, path: &str) -> Option<PathBuf> {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        let relative_to_parent = self
            .include_stack
            .last()
            .and_then(|p| p.parent())
            .map(|dir| dir.join(path));
        std::iter::once(candidate.to_path_buf())
            .chain(relative_to_parent)
            .chain(self.options.include_path.iter().map(|dir| dir.join(path)))
            .find(|p| p.is_file())
    }

    // =========================================================================
    // Gate definitions
    // =========================================================================

    fn is_known_gate(&self, name: &str) -> bool {
        name == "U"
            || name == "CX"
            || self.gates.contains_key(name)
            || (self.stdlib && qelib1_signature(name).is_some())
    }

    fn define_gate(&mut self, def: &GateDef) -> ParseResult<()> {
        if self.gates.contains_key(&def.name) {
            return Err(ParseError::DuplicateDeclaration(def.name.clone()));
        }
        for op in &def.body {
            let (qubits, name) = match op {
                GateBodyOp::Call { name, qubits, .. } => (qubits, Some(name)),
                GateBodyOp::Barrier(qubits) => (qubits, None),
            };
            // Only previously declared gates may be called, which rules out recursion.
            if let Some(name) = name {
                if !self.is_known_gate(name) {
                    return Err(ParseError::UnknownGate(format!(
                        "{name} (in definition of {})",
                        def.name
                    )));
                }
            }
            if let Some(q) = qubits.iter().find(|q| !def.qubits.contains(q)) {
                return Err(ParseError::UndefinedIdentifier(format!(
                    "{q} (in definition of {})",
                    def.name
                )));
            }
        }
        self.gates
            .insert(def.name.clone(), GateEntry::Defined(def.clone()));
        Ok(())
    }

    // =========================================================================
    // Operations
    // =========================================================================

    fn lower_op(&mut self, op: &QuantumOp, condition: Option<&Condition>) -> ParseResult<()> {
        let condition = match condition {
            Some(c) => {
                if self.circuit.creg(&c.register).is_none() {
                    return Err(ParseError::UndefinedIdentifier(c.register.clone()));
                }
                Some(ClassicalCondition::new(c.register.as_str(), c.value))
            }
            None => None,
        };

        let mut out = Vec::new();
        match op {
            QuantumOp::Gate { name, params, args } => {
                let values = params
                    .iter()
                    .map(|e| evaluate(e, &FxHashMap::default()))
                    .collect::<ParseResult<Vec<f64>>>()?;
                let operands = args
                    .iter()
                    .map(|a| self.resolve_qubits(a))
                    .collect::<ParseResult<Vec<_>>>()?;
                for qubits in broadcast(name, &operands)? {
                    self.apply_gate(name, &values, &qubits, &mut out)?;
                }
            }
            QuantumOp::Measure { qubit, clbit } => {
                let qubits = self.resolve_qubits(qubit)?;
                let clbits = self.resolve_clbits(clbit)?;
                if qubits.len() != clbits.len() {
                    return Err(ParseError::RegisterSizeMismatch {
                        operation: "measure".into(),
                        left: qubits.len(),
                        right: clbits.len(),
                    });
                }
                out.extend(
                    qubits
                        .into_iter()
                        .zip(clbits)
                        .map(|(q, c)| Instruction::measure(q, c)),
                );
            }
            QuantumOp::Reset(arg) => {
                out.extend(self.resolve_qubits(arg)?.into_iter().map(Instruction::reset));
            }
            QuantumOp::Barrier(args) => {
                let mut qubits: Vec<QubitId> = Vec::new();
                for arg in args {
                    for q in self.resolve_qubits(arg)? {
                        if !qubits.contains(&q) {
                            qubits.push(q);
                        }
                    }
                }
                out.push(Instruction::barrier(qubits));
            }
        }

        for mut inst in out {
            if let Some(c) = &condition {
                inst = inst.with_condition(c.clone());
            }
            self.circuit.push(inst)?;
        }
        Ok(())
    }

    /// Expand a gate application into standard-gate instructions.
    fn apply_gate(
        &self,
        name: &str,
        params: &[f64],
        qubits: &[QubitId],
        out: &mut Vec<Instruction>,
    ) -> ParseResult<()> {
        if let Some(entry) = self.gates.get(name) {
            return match entry {
                GateEntry::Opaque {
                    params: p,
                    qubits: q,
                } => {
                    check_arity(name, *p, params.len(), *q, qubits.len())?;
                    Err(ParseError::OpaqueGate(name.to_string()))
                }
                GateEntry::Defined(def) => self.inline(def, params, qubits, out),
            };
        }

        let (expected_params, expected_qubits) = match name {
            "U" => (3, 1),
            "CX" => (0, 2),
            _ if self.stdlib => {
                qelib1_signature(name).ok_or_else(|| ParseError::UnknownGate(name.to_string()))?
            }
            _ => return Err(ParseError::UnknownGate(name.to_string())),
        };
        check_arity(name, expected_params, params.len(), expected_qubits, qubits.len())?;

        let gate = StandardGate::from_name(name, params)
            .ok_or_else(|| ParseError::UnknownGate(name.to_string()))?;
        out.push(Instruction::gate(gate, qubits.iter().copied()));
        Ok(())
    }

    fn inline(
        &self,
        def: &GateDef,
        params: &[f64],
        qubits: &[QubitId],
        out: &mut Vec<Instruction>,
    ) -> ParseResult<()> {
        check_arity(
            &def.name,
            def.params.len(),
            params.len(),
            def.qubits.len(),
            qubits.len(),
        )?;

        let env: FxHashMap<String, f64> = def
            .params
            .iter()
            .cloned()
            .zip(params.iter().copied())
            .collect();
        let bind = |formal: &String| -> ParseResult<QubitId> {
            def.qubits
                .iter()
                .position(|q| q == formal)
                .map(|i| qubits[i])
                .ok_or_else(|| ParseError::UndefinedIdentifier(formal.clone()))
        };

        for op in &def.body {
            match op {
                GateBodyOp::Call {
                    name,
                    params: exprs,
                    qubits: formals,
                } => {
                    let values = exprs
                        .iter()
                        .map(|e| evaluate(e, &env))
                        .collect::<ParseResult<Vec<f64>>>()?;
                    let actual = formals.iter().map(bind).collect::<ParseResult<Vec<_>>>()?;
                    self.apply_gate(name, &values, &actual, out)?;
                }
                GateBodyOp::Barrier(formals) => {
                    let actual = formals.iter().map(bind).collect::<ParseResult<Vec<_>>>()?;
                    out.push(Instruction::barrier(actual));
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Operand resolution
    // =========================================================================

    fn resolve_qubits(&self, arg: &Argument) -> ParseResult<Vec<QubitId>> {
        let reg = self
            .circuit
            .qreg(&arg.register)
            .ok_or_else(|| ParseError::UndefinedIdentifier(arg.register.clone()))?;
        Ok(select_bits(&reg.name, reg.offset, reg.size, arg.index)?
            .into_iter()
            .map(QubitId)
            .collect())
    }

    fn resolve_clbits(&self, arg: &Argument) -> ParseResult<Vec<ClbitId>> {
        let reg = self
            .circuit
            .creg(&arg.register)
            .ok_or_else(|| ParseError::UndefinedIdentifier(arg.register.clone()))?;
        Ok(select_bits(&reg.name, reg.offset, reg.size, arg.index)?
            .into_iter()
            .map(ClbitId)
            .collect())
    }
}

fn select_bits(register: &str, offset: u32, size: u32, index: Option<u32>) -> ParseResult<Vec<u32>> {
    match index {
        None => Ok((offset..offset + size).collect()),
        Some(i) if i < size => Ok(vec![offset + i]),
        Some(i) => Err(ParseError::IndexOutOfBounds {
            register: register.to_string(),
            index: i as usize,
            size: size as usize,
        }),
    }
}

/// Broadcast register operands: whole registers must agree in size and are
/// iterated in lockstep, single qubits repeat.
fn broadcast(name: &str, operands: &[Vec<QubitId>]) -> ParseResult<Vec<Vec<QubitId>>> {
    let mut width = 1;
    for op in operands.iter().filter(|o| o.len() != 1) {
        if width == 1 {
            width = op.len();
        } else if op.len() != width {
            return Err(ParseError::RegisterSizeMismatch {
                operation: name.to_string(),
                left: width,
                right: op.len(),
            });
        }
    }
    Ok((0..width)
        .map(|i| {
            operands
                .iter()
                .map(|op| if op.len() == 1 { op[0] } else { op[i] })
                .collect()
        })
        .collect())
}

fn check_arity(
    name: &str,
    expected_params: usize,
    got_params: usize,
    expected_qubits: usize,
    got_qubits: usize,
) -> ParseResult<()> {
    if expected_params != got_params {
        return Err(ParseError::WrongParameterCount {
            gate: name.to_string(),
            expected: expected_params,
            got: got_params,
        });
    }
    if expected_qubits != got_qubits {
        return Err(ParseError::WrongQubitCount {
            gate: name.to_string(),
            expected: expected_qubits,
            got: got_qubits,
        });
    }
    Ok(())
}

fn annotate_line(err: ParseError, line: usize) -> ParseError {
    match err {
        ParseError::CircuitError(IrError::DuplicateQubit { qubit, gate_name }) => {
            ParseError::Generic(format!(
                "line {line}: duplicate qubit {qubit} in {}",
                gate_name.unwrap_or_else(|| "operation".into())
            ))
        }
        other => other,
    }
}

/// Evaluate a parameter expression with the given formal parameter bindings.
pub(crate) fn evaluate(expr: &Expression, env: &FxHashMap<String, f64>) -> ParseResult<f64> {
    Ok(match expr {
        Expression::Real(v) => *v,
        #[allow(clippy::cast_precision_loss)]
        Expression::Int(v) => *v as f64,
        Expression::Pi => std::f64::consts::PI,
        Expression::Identifier(name) => *env
            .get(name)
            .ok_or_else(|| ParseError::UndefinedIdentifier(name.clone()))?,
        Expression::Neg(inner) => -evaluate(inner, env)?,
        Expression::Binary { op, left, right } => {
            let l = evaluate(left, env)?;
            let r = evaluate(right, env)?;
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                BinOp::Pow => l.powf(r),
            }
        }
        Expression::Call { func, arg } => {
            let x = evaluate(arg, env)?;
            match func.as_str() {
                "sin" => x.sin(),
                "cos" => x.cos(),
                "tan" => x.tan(),
                "exp" => x.exp(),
                "ln" => x.ln(),
                "sqrt" => x.sqrt(),
                other => return Err(ParseError::UndefinedIdentifier(other.to_string())),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use qisjob_ir::InstructionKind;

    use super::super::{ParseOptions, parse, parse_with_options};
    use super::*;

    const HEADER: &str = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\n";

    #[test]
    fn test_register_broadcast() {
        let circuit = parse(&format!("{HEADER}qreg a[3];\nqreg b[3];\ncx a,b;\nh a;")).unwrap();
        let ops = circuit.count_ops();
        assert_eq!(ops.get("cx"), Some(&3));
        assert_eq!(ops.get("h"), Some(&3));
        assert_eq!(
            circuit.instructions()[1].qubits,
            vec![QubitId(1), QubitId(4)]
        );
    }

    #[test]
    fn test_broadcast_single_and_register() {
        let circuit = parse(&format!("{HEADER}qreg a[1];\nqreg b[2];\ncx a[0],b;")).unwrap();
        assert_eq!(circuit.instructions().len(), 2);
        assert_eq!(circuit.instructions()[1].qubits, vec![QubitId(0), QubitId(2)]);
    }

    #[test]
    fn test_broadcast_size_mismatch() {
        let err = parse(&format!("{HEADER}qreg a[2];\nqreg b[3];\ncx a,b;")).unwrap_err();
        assert!(matches!(err, ParseError::RegisterSizeMismatch { .. }));
    }

    #[test]
    fn test_gate_definition_inlined() {
        let source = format!(
            "{HEADER}gate rot(theta) a {{ rz(theta/2) a; U(0,0,-theta) a; }}\nqreg q[1];\nrot(pi) q[0];"
        );
        let circuit = parse(&source).unwrap();
        let gates: Vec<_> = circuit
            .instructions()
            .iter()
            .filter_map(|i| i.as_gate().copied())
            .collect();
        assert_eq!(gates, vec![StandardGate::Rz(PI / 2.0), StandardGate::U(0.0, 0.0, -PI)]);
    }

    #[test]
    fn test_standard_names_need_qelib1() {
        let err = parse("OPENQASM 2.0;\nqreg q[1];\nh q[0];").unwrap_err();
        assert!(matches!(err, ParseError::UnknownGate(_)));
        // The builtins are always present
        parse("OPENQASM 2.0;\nqreg q[2];\nU(pi,0,pi) q[0];\nCX q[0],q[1];").unwrap();
    }

    #[test]
    fn test_conditional_gate() {
        let circuit = parse(&format!(
            "{HEADER}qreg q[1];\ncreg c[1];\nmeasure q[0] -> c[0];\nif(c==1) x q[0];"
        ))
        .unwrap();
        let last = circuit.instructions().last().unwrap();
        assert_eq!(last.condition, Some(ClassicalCondition::new("c", 1)));
        assert!(!circuit.has_terminal_measurements_only());
    }

    #[test]
    fn test_condition_on_unknown_register() {
        let err = parse(&format!("{HEADER}qreg q[1];\nif(d==1) x q[0];")).unwrap_err();
        assert!(matches!(err, ParseError::UndefinedIdentifier(_)));
    }

    #[test]
    fn test_measure_register_mismatch() {
        let err = parse(&format!("{HEADER}qreg q[2];\ncreg c[3];\nmeasure q -> c;")).unwrap_err();
        assert!(matches!(err, ParseError::RegisterSizeMismatch { .. }));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let err = parse(&format!("{HEADER}qreg q[2];\nx q[2];")).unwrap_err();
        assert!(matches!(err, ParseError::IndexOutOfBounds { index: 2, size: 2, .. }));
    }

    #[test]
    fn test_wrong_parameter_count() {
        let err = parse(&format!("{HEADER}qreg q[1];\nrx q[0];")).unwrap_err();
        assert!(matches!(err, ParseError::WrongParameterCount { expected: 1, got: 0, .. }));
    }

    #[test]
    fn test_opaque_gate_cannot_lower() {
        let err = parse("OPENQASM 2.0;\nopaque magic a;\nqreg q[1];\nmagic q[0];").unwrap_err();
        assert!(matches!(err, ParseError::OpaqueGate(_)));
    }

    #[test]
    fn test_recursive_gate_rejected() {
        let err = parse("OPENQASM 2.0;\ngate loop a { loop a; }").unwrap_err();
        assert!(matches!(err, ParseError::UnknownGate(_)));
    }

    #[test]
    fn test_barrier_and_reset() {
        let circuit = parse(&format!("{HEADER}qreg q[2];\nreset q;\nbarrier q[0],q;")).unwrap();
        let kinds: Vec<_> = circuit.instructions().iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![InstructionKind::Reset, InstructionKind::Reset, InstructionKind::Barrier]
        );
        assert_eq!(circuit.instructions()[2].qubits.len(), 2);
    }

    #[test]
    fn test_include_from_search_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("mylib.inc"),
            "gate bell a,b { h a; cx a,b; }\n",
        )
        .unwrap();

        let source = format!("{HEADER}include \"mylib.inc\";\nqreg q[2];\nbell q[0],q[1];");
        let missing = parse(&source).unwrap_err();
        assert!(matches!(missing, ParseError::IncludeNotFound(_)));

        let options = ParseOptions::default()
            .with_include_dir(dir.path())
            .with_name("with_lib");
        let circuit = parse_with_options(&source, &options).unwrap();
        assert_eq!(circuit.name(), "with_lib");
        assert_eq!(circuit.count_ops().get("cx"), Some(&1));
    }

    #[test]
    fn test_evaluate_functions() {
        let env = FxHashMap::default();
        let e = Expression::Call {
            func: "cos".into(),
            arg: Box::new(Expression::Pi),
        };
        assert!((evaluate(&e, &env).unwrap() + 1.0).abs() < 1e-12);
        assert!(matches!(
            evaluate(&Expression::Identifier("theta".into()), &env),
            Err(ParseError::UndefinedIdentifier(_))
        ));
    }
}
