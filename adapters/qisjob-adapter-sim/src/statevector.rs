//! Statevector simulation engine.
//!
//! Qubit `q` is bit `q` of the amplitude index.

use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4, PI};

use num_complex::Complex64;
use qisjob_ir::StandardGate;
use rand::Rng;

/// A 2x2 matrix in row-major order.
pub(crate) type Matrix2 = [Complex64; 4];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

fn rx(theta: f64) -> Matrix2 {
    let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
    [c.into(), Complex64::new(0.0, -s), Complex64::new(0.0, -s), c.into()]
}

fn ry(theta: f64) -> Matrix2 {
    let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
    [c.into(), (-s).into(), s.into(), c.into()]
}

fn rz(theta: f64) -> Matrix2 {
    [
        Complex64::from_polar(1.0, -theta / 2.0),
        ZERO,
        ZERO,
        Complex64::from_polar(1.0, theta / 2.0),
    ]
}

fn phase(lambda: f64) -> Matrix2 {
    [ONE, ZERO, ZERO, Complex64::from_polar(1.0, lambda)]
}

fn u(theta: f64, phi: f64, lambda: f64) -> Matrix2 {
    let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
    [
        c.into(),
        -Complex64::from_polar(s, lambda),
        Complex64::from_polar(s, phi),
        Complex64::from_polar(c, phi + lambda),
    ]
}

fn hadamard() -> Matrix2 {
    let h = Complex64::from(FRAC_1_SQRT_2);
    [h, h, h, -h]
}

/// Exact matrix of a single-qubit gate, global phase included.
pub(crate) fn single_qubit_matrix(gate: &StandardGate) -> Option<Matrix2> {
    Some(match *gate {
        StandardGate::I => [ONE, ZERO, ZERO, ONE],
        StandardGate::X => [ZERO, ONE, ONE, ZERO],
        StandardGate::Y => [ZERO, -I, I, ZERO],
        StandardGate::Z => [ONE, ZERO, ZERO, -ONE],
        StandardGate::H => hadamard(),
        StandardGate::S => phase(FRAC_PI_2),
        StandardGate::Sdg => phase(-FRAC_PI_2),
        StandardGate::T => phase(FRAC_PI_4),
        StandardGate::Tdg => phase(-FRAC_PI_4),
        StandardGate::SX => {
            let (a, b) = (Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5));
            [a, b, b, a]
        }
        StandardGate::SXdg => {
            let (a, b) = (Complex64::new(0.5, -0.5), Complex64::new(0.5, 0.5));
            [a, b, b, a]
        }
        StandardGate::Rx(t) => rx(t),
        StandardGate::Ry(t) => ry(t),
        StandardGate::Rz(t) => rz(t),
        StandardGate::P(l) => phase(l),
        StandardGate::U(t, p, l) => u(t, p, l),
        _ => return None,
    })
}

/// Target matrix of a singly-controlled gate.
fn controlled_target(gate: &StandardGate) -> Option<Matrix2> {
    match *gate {
        StandardGate::CX => single_qubit_matrix(&StandardGate::X),
        StandardGate::CY => single_qubit_matrix(&StandardGate::Y),
        StandardGate::CZ => single_qubit_matrix(&StandardGate::Z),
        StandardGate::CH => single_qubit_matrix(&StandardGate::H),
        StandardGate::CRx(t) => Some(rx(t)),
        StandardGate::CRy(t) => Some(ry(t)),
        StandardGate::CRz(t) => Some(rz(t)),
        StandardGate::CP(l) => Some(phase(l)),
        StandardGate::CU(t, p, l) => Some(u(t, p, l)),
        _ => None,
    }
}

/// The state of `n` qubits as 2^n amplitudes.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    amplitudes: Vec<Complex64>,
    num_qubits: usize,
}

impl Statevector {
    /// |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        Self::basis_state(num_qubits, 0)
    }

    /// The computational basis state `index`.
    pub fn basis_state(num_qubits: usize, index: usize) -> Self {
        let mut amplitudes = vec![ZERO; 1 << num_qubits];
        amplitudes[index] = ONE;
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Take the amplitudes.
    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    /// Apply a gate to the given qubits.
    pub fn apply_gate(&mut self, gate: &StandardGate, qubits: &[usize]) {
        if let Some(m) = single_qubit_matrix(gate) {
            self.apply_matrix(qubits[0], &m);
        } else if let Some(m) = controlled_target(gate) {
            self.apply_controlled(&[qubits[0]], qubits[1], &m);
        } else {
            match *gate {
                StandardGate::Swap => self.apply_swap(&[], qubits[0], qubits[1]),
                StandardGate::CCX => {
                    let x = [ZERO, ONE, ONE, ZERO];
                    self.apply_controlled(&qubits[..2], qubits[2], &x);
                }
                StandardGate::CSwap => self.apply_swap(&[qubits[0]], qubits[1], qubits[2]),
                StandardGate::RZZ(t) => self.apply_rzz(qubits[0], qubits[1], t),
                // exp(iπ/4 Z⊗X) on (a, b), then X on a
                StandardGate::ECR => {
                    self.apply_matrix(qubits[1], &rx(-FRAC_PI_2));
                    self.apply_controlled(&[qubits[0]], qubits[1], &rx(PI));
                    self.apply_matrix(qubits[0], &[ZERO, ONE, ONE, ZERO]);
                }
                StandardGate::RXX(t) => {
                    let h = hadamard();
                    self.apply_matrix(qubits[0], &h);
                    self.apply_matrix(qubits[1], &h);
                    self.apply_rzz(qubits[0], qubits[1], t);
                    self.apply_matrix(qubits[0], &h);
                    self.apply_matrix(qubits[1], &h);
                }
                _ => {}
            }
        }
    }

    /// Apply a 2x2 matrix to one qubit.
    pub(crate) fn apply_matrix(&mut self, qubit: usize, m: &Matrix2) {
        self.apply_controlled(&[], qubit, m);
    }

    /// Apply `m` to `target` on the subspace where every control is 1.
    fn apply_controlled(&mut self, controls: &[usize], target: usize, m: &Matrix2) {
        let ctrl_mask: usize = controls.iter().map(|c| 1 << c).sum();
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if i & tgt_mask != 0 || i & ctrl_mask != ctrl_mask {
                continue;
            }
            let j = i | tgt_mask;
            let (a, b) = (self.amplitudes[i], self.amplitudes[j]);
            self.amplitudes[i] = m[0] * a + m[1] * b;
            self.amplitudes[j] = m[2] * a + m[3] * b;
        }
    }

    fn apply_swap(&mut self, controls: &[usize], q1: usize, q2: usize) {
        let ctrl_mask: usize = controls.iter().map(|c| 1 << c).sum();
        let (m1, m2) = (1 << q1, 1 << q2);
        for i in 0..self.amplitudes.len() {
            if i & ctrl_mask == ctrl_mask && i & m1 != 0 && i & m2 == 0 {
                self.amplitudes.swap(i, (i & !m1) | m2);
            }
        }
    }

    fn apply_rzz(&mut self, q1: usize, q2: usize, theta: f64) {
        let even = Complex64::from_polar(1.0, -theta / 2.0);
        let odd = Complex64::from_polar(1.0, theta / 2.0);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            let parity = ((i >> q1) ^ (i >> q2)) & 1;
            *amp *= if parity == 0 { even } else { odd };
        }
    }

    /// Probability that measuring `qubit` gives 1.
    pub fn probability_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Measure one qubit, collapsing the state.
    pub fn measure<R: Rng>(&mut self, qubit: usize, rng: &mut R) -> bool {
        let p1 = self.probability_one(qubit).clamp(0.0, 1.0);
        let outcome = rng.gen_bool(p1);
        let mask = 1 << qubit;
        let norm = if outcome { p1 } else { 1.0 - p1 }.sqrt();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == outcome {
                if norm > 0.0 {
                    *amp /= norm;
                }
            } else {
                *amp = ZERO;
            }
        }
        outcome
    }

    /// Reset a qubit to |0⟩ by measuring and flipping.
    pub fn reset<R: Rng>(&mut self, qubit: usize, rng: &mut R) {
        if self.measure(qubit, rng) {
            self.apply_matrix(qubit, &[ZERO, ONE, ONE, ZERO]);
        }
    }

    /// Sample a full basis-state index without collapsing.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        let r: f64 = rng.gen_range(0.0..1.0);
        let mut cumulative = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                return i;
            }
        }
        self.amplitudes.len() - 1
    }
}
