//! Emitters serializing circuits back to `OpenQASM` text.

use std::fmt::Write as _;

use qisjob_ir::{Circuit, ClbitId, Instruction, InstructionKind, QubitId, StandardGate};

/// Emit a circuit as `OpenQASM` 2.0 source using `qelib1.inc` gate names.
///
/// `ecr`, which `qelib1.inc` lacks, is defined inline when used.
pub fn emit(circuit: &Circuit) -> String {
    Emitter::new(circuit, Dialect::Qasm2).emit_circuit()
}

/// Emit a circuit as `OpenQASM` 3.0 source using `stdgates.inc`.
///
/// Gates missing from `stdgates.inc` (`sxdg`, `rxx`, `rzz`, `ecr`) are given inline
/// definitions so the output is self-contained. Register names are kept.
pub fn emit_qasm3(circuit: &Circuit) -> String {
    Emitter::new(circuit, Dialect::Qasm3).emit_circuit()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Qasm2,
    Qasm3,
}

struct Emitter<'a> {
    circuit: &'a Circuit,
    dialect: Dialect,
    output: String,
}

impl<'a> Emitter<'a> {
    fn new(circuit: &'a Circuit, dialect: Dialect) -> Self {
        Self {
            circuit,
            dialect,
            output: String::new(),
        }
    }

    fn emit_circuit(mut self) -> String {
        match self.dialect {
            Dialect::Qasm2 => {
                self.writeln("OPENQASM 2.0;");
                self.writeln("include \"qelib1.inc\";");
            }
            Dialect::Qasm3 => {
                self.writeln("OPENQASM 3.0;");
                self.writeln("include \"stdgates.inc\";");
            }
        }
        self.emit_definitions();

        for reg in self.circuit.qregs() {
            let line = match self.dialect {
                Dialect::Qasm2 => format!("qreg {}[{}];", reg.name, reg.size),
                Dialect::Qasm3 => format!("qubit[{}] {};", reg.size, reg.name),
            };
            self.writeln(&line);
        }
        for reg in self.circuit.cregs() {
            let line = match self.dialect {
                Dialect::Qasm2 => format!("creg {}[{}];", reg.name, reg.size),
                Dialect::Qasm3 => format!("bit[{}] {};", reg.size, reg.name),
            };
            self.writeln(&line);
        }

        for instruction in self.circuit.instructions() {
            let line = self.emit_instruction(instruction);
            self.writeln(&line);
        }
        self.output
    }

    fn emit_definitions(&mut self) {
        let used = |pred: fn(&StandardGate) -> bool| {
            self.circuit
                .instructions()
                .iter()
                .filter_map(Instruction::as_gate)
                .any(pred)
        };
        let ecr = used(|g| matches!(g, StandardGate::ECR));
        let sxdg = used(|g| matches!(g, StandardGate::SXdg));
        let rzz = used(|g| matches!(g, StandardGate::RZZ(_)));
        let rxx = used(|g| matches!(g, StandardGate::RXX(_)));

        if ecr {
            self.writeln("gate ecr a, b { rz(-pi/2) a; rx(-pi/2) b; cx a, b; x a; }");
        }
        if self.dialect == Dialect::Qasm2 {
            return;
        }

        if sxdg {
            self.writeln("gate sxdg a { s a; h a; s a; }");
        }
        if rzz {
            self.writeln("gate rzz(theta) a, b { cx a, b; rz(theta) b; cx a, b; }");
        }
        if rxx {
            self.writeln(
                "gate rxx(theta) a, b { h a; h b; cx a, b; rz(theta) b; cx a, b; h a; h b; }",
            );
        }
    }

    fn emit_instruction(&self, instruction: &Instruction) -> String {
        let body = match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let (name, params) = self.gate_name_and_params(gate);
                let qubits = self.qubit_list(&instruction.qubits);
                if params.is_empty() {
                    format!("{name} {qubits};")
                } else {
                    let params: Vec<String> = params.into_iter().map(format_angle).collect();
                    format!("{name}({}) {qubits};", params.join(","))
                }
            }
            InstructionKind::Measure => {
                let pairs: Vec<String> = instruction
                    .qubits
                    .iter()
                    .zip(&instruction.clbits)
                    .map(|(q, c)| match self.dialect {
                        Dialect::Qasm2 => {
                            format!("measure {} -> {};", self.qubit(*q), self.clbit(*c))
                        }
                        Dialect::Qasm3 => {
                            format!("{} = measure {};", self.clbit(*c), self.qubit(*q))
                        }
                    })
                    .collect();
                pairs.join(" ")
            }
            InstructionKind::Reset => format!("reset {};", self.qubit_list(&instruction.qubits)),
            InstructionKind::Barrier => {
                format!("barrier {};", self.qubit_list(&instruction.qubits))
            }
        };

        match &instruction.condition {
            None => body,
            Some(cond) => match self.dialect {
                Dialect::Qasm2 => format!("if({}=={}) {body}", cond.register, cond.value),
                Dialect::Qasm3 => format!("if ({} == {}) {{ {body} }}", cond.register, cond.value),
            },
        }
    }

    fn gate_name_and_params(&self, gate: &StandardGate) -> (&'static str, Vec<f64>) {
        if self.dialect == Dialect::Qasm3 {
            match *gate {
                StandardGate::U(t, p, l) => return ("U", vec![t, p, l]),
                StandardGate::CU(t, p, l) => return ("cu", vec![t, p, l, 0.0]),
                _ => {}
            }
        }
        (gate.name(), gate.params())
    }

    fn qubit(&self, id: QubitId) -> String {
        self.circuit
            .qubits()
            .get(id.index())
            .map_or_else(|| format!("q[{}]", id.0), ToString::to_string)
    }

    fn clbit(&self, id: ClbitId) -> String {
        self.circuit
            .clbits()
            .get(id.index())
            .map_or_else(|| format!("c[{}]", id.0), ToString::to_string)
    }

    fn qubit_list(&self, qubits: &[QubitId]) -> String {
        qubits
            .iter()
            .map(|q| self.qubit(*q))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn writeln(&mut self, line: &str) {
        let _ = writeln!(self.output, "{line}");
    }
}

/// Format an angle, writing common fractions of pi symbolically.
fn format_angle(value: f64) -> String {
    const EPS: f64 = 1e-12;
    let pi = std::f64::consts::PI;
    if value.abs() < EPS {
        return "0".into();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let ratio = value.abs() / pi;
    for denom in [1u32, 2, 4, 8] {
        let numer = ratio * f64::from(denom);
        let rounded = numer.round();
        if (numer - rounded).abs() < EPS * f64::from(denom) && rounded >= 1.0 {
            let num = if rounded == 1.0 {
                "pi".to_string()
            } else {
                format!("{rounded}*pi")
            };
            return if denom == 1 {
                format!("{sign}{num}")
            } else {
                format!("{sign}{num}/{denom}")
            };
        }
    }
    format!("{value}")
}
