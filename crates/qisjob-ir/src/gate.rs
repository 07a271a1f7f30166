//! Standard gate set.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Gates of the `qelib1.inc` standard library with concrete angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford+T gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(f64),
    /// Rotation around Y axis.
    Ry(f64),
    /// Rotation around Z axis.
    Rz(f64),
    /// Phase gate, `u1` in older OpenQASM sources.
    P(f64),
    /// Universal single-qubit gate U(θ, φ, λ), `u3` in older sources.
    U(f64, f64, f64),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// Controlled rotation around X.
    CRx(f64),
    /// Controlled rotation around Y.
    CRy(f64),
    /// Controlled rotation around Z.
    CRz(f64),
    /// Controlled phase gate, `cu1` in older sources.
    CP(f64),
    /// Controlled U(θ, φ, λ), `cu3` in older sources.
    CU(f64, f64, f64),
    /// XX Ising rotation.
    RXX(f64),
    /// ZZ Ising rotation.
    RZZ(f64),
    /// Echoed cross-resonance gate, native on IBM Eagle and Heron devices.
    ECR,

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl StandardGate {
    /// OpenQASM name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(..) => "u",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::CRx(_) => "crx",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::CU(..) => "cu",
            StandardGate::RXX(_) => "rxx",
            StandardGate::RZZ(_) => "rzz",
            StandardGate::ECR => "ecr",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Number of qubits this gate acts on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::SX
            | StandardGate::SXdg
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::P(_)
            | StandardGate::U(..) => 1,

            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap
            | StandardGate::CRx(_)
            | StandardGate::CRy(_)
            | StandardGate::CRz(_)
            | StandardGate::CP(_)
            | StandardGate::CU(..)
            | StandardGate::RXX(_)
            | StandardGate::RZZ(_)
            | StandardGate::ECR => 2,

            StandardGate::CCX | StandardGate::CSwap => 3,
        }
    }

    /// Angles of this gate, in declaration order.
    pub fn params(&self) -> Vec<f64> {
        match *self {
            StandardGate::Rx(a)
            | StandardGate::Ry(a)
            | StandardGate::Rz(a)
            | StandardGate::P(a)
            | StandardGate::CRx(a)
            | StandardGate::CRy(a)
            | StandardGate::CRz(a)
            | StandardGate::CP(a)
            | StandardGate::RXX(a)
            | StandardGate::RZZ(a) => vec![a],
            StandardGate::U(a, b, c) | StandardGate::CU(a, b, c) => vec![a, b, c],
            _ => vec![],
        }
    }

    /// The adjoint of this gate.
    pub fn inverse(&self) -> StandardGate {
        match *self {
            StandardGate::S => StandardGate::Sdg,
            StandardGate::Sdg => StandardGate::S,
            StandardGate::T => StandardGate::Tdg,
            StandardGate::Tdg => StandardGate::T,
            StandardGate::SX => StandardGate::SXdg,
            StandardGate::SXdg => StandardGate::SX,
            StandardGate::Rx(a) => StandardGate::Rx(-a),
            StandardGate::Ry(a) => StandardGate::Ry(-a),
            StandardGate::Rz(a) => StandardGate::Rz(-a),
            StandardGate::P(a) => StandardGate::P(-a),
            StandardGate::U(theta, phi, lambda) => StandardGate::U(-theta, -lambda, -phi),
            StandardGate::CRx(a) => StandardGate::CRx(-a),
            StandardGate::CRy(a) => StandardGate::CRy(-a),
            StandardGate::CRz(a) => StandardGate::CRz(-a),
            StandardGate::CP(a) => StandardGate::CP(-a),
            StandardGate::CU(theta, phi, lambda) => StandardGate::CU(-theta, -lambda, -phi),
            StandardGate::RXX(a) => StandardGate::RXX(-a),
            StandardGate::RZZ(a) => StandardGate::RZZ(-a),
            other => other,
        }
    }

    /// Whether the gate is its own inverse.
    pub fn is_self_inverse(&self) -> bool {
        matches!(
            self,
            StandardGate::I
                | StandardGate::X
                | StandardGate::Y
                | StandardGate::Z
                | StandardGate::H
                | StandardGate::CX
                | StandardGate::CY
                | StandardGate::CZ
                | StandardGate::CH
                | StandardGate::Swap
                | StandardGate::ECR
                | StandardGate::CCX
                | StandardGate::CSwap
        )
    }

    /// Whether the gate is diagonal in the computational basis.
    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            StandardGate::I
                | StandardGate::Z
                | StandardGate::S
                | StandardGate::Sdg
                | StandardGate::T
                | StandardGate::Tdg
                | StandardGate::Rz(_)
                | StandardGate::P(_)
                | StandardGate::CZ
                | StandardGate::CRz(_)
                | StandardGate::CP(_)
                | StandardGate::RZZ(_)
        )
    }

    /// Look up a gate of the standard library by its OpenQASM name.
    ///
    /// The legacy `u1`, `u2`, `u3`, `u0`, `cu1` and `cu3` spellings map onto
    /// their modern equivalents. Returns `None` for unknown names or a wrong
    /// parameter count.
    pub fn from_name(name: &str, params: &[f64]) -> Option<StandardGate> {
        let gate = match (name, params) {
            ("id" | "u0", _) => StandardGate::I,
            ("x", []) => StandardGate::X,
            ("y", []) => StandardGate::Y,
            ("z", []) => StandardGate::Z,
            ("h", []) => StandardGate::H,
            ("s", []) => StandardGate::S,
            ("sdg", []) => StandardGate::Sdg,
            ("t", []) => StandardGate::T,
            ("tdg", []) => StandardGate::Tdg,
            ("sx", []) => StandardGate::SX,
            ("sxdg", []) => StandardGate::SXdg,
            ("rx", [a]) => StandardGate::Rx(*a),
            ("ry", [a]) => StandardGate::Ry(*a),
            ("rz", [a]) => StandardGate::Rz(*a),
            ("p" | "u1", [a]) => StandardGate::P(*a),
            ("u2", [phi, lambda]) => StandardGate::U(PI / 2.0, *phi, *lambda),
            ("u" | "u3" | "U", [t, p, l]) => StandardGate::U(*t, *p, *l),
            ("cx" | "CX", []) => StandardGate::CX,
            ("cy", []) => StandardGate::CY,
            ("cz", []) => StandardGate::CZ,
            ("ch", []) => StandardGate::CH,
            ("swap", []) => StandardGate::Swap,
            ("crx", [a]) => StandardGate::CRx(*a),
            ("cry", [a]) => StandardGate::CRy(*a),
            ("crz", [a]) => StandardGate::CRz(*a),
            ("cp" | "cu1", [a]) => StandardGate::CP(*a),
            ("cu3", [t, p, l]) => StandardGate::CU(*t, *p, *l),
            ("rxx", [a]) => StandardGate::RXX(*a),
            ("rzz", [a]) => StandardGate::RZZ(*a),
            ("ecr", []) => StandardGate::ECR,
            ("ccx", []) => StandardGate::CCX,
            ("cswap", []) => StandardGate::CSwap,
            _ => return None,
        };
        Some(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::CCX.num_qubits(), 3);
        assert_eq!(StandardGate::U(1.0, 2.0, 3.0).params(), vec![1.0, 2.0, 3.0]);
        assert!(StandardGate::H.params().is_empty());
    }

    #[test]
    fn test_legacy_names() {
        assert_eq!(StandardGate::from_name("u1", &[0.5]), Some(StandardGate::P(0.5)));
        assert_eq!(
            StandardGate::from_name("u2", &[0.1, 0.2]),
            Some(StandardGate::U(PI / 2.0, 0.1, 0.2))
        );
        assert_eq!(StandardGate::from_name("cu1", &[1.0]), Some(StandardGate::CP(1.0)));
        assert_eq!(StandardGate::from_name("h", &[1.0]), None);
        assert_eq!(StandardGate::from_name("frobnicate", &[]), None);
    }

    #[test]
    fn test_inverse() {
        assert_eq!(StandardGate::S.inverse(), StandardGate::Sdg);
        assert_eq!(StandardGate::Rz(0.3).inverse(), StandardGate::Rz(-0.3));
        assert_eq!(StandardGate::H.inverse(), StandardGate::H);
        assert!(StandardGate::CX.is_self_inverse());
        assert!(StandardGate::ECR.is_self_inverse());
        assert_eq!(StandardGate::from_name("ecr", &[]), Some(StandardGate::ECR));
        assert_eq!(StandardGate::ECR.num_qubits(), 2);
        assert!(!StandardGate::T.is_self_inverse());
    }
}
