//! Single-qubit unitaries and their U(θ, φ, λ) form.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use num_complex::Complex64;
use qisjob_ir::StandardGate;

const EPSILON: f64 = 1e-10;

/// A 2x2 matrix in row-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unitary2x2(pub [Complex64; 4]);

impl Unitary2x2 {
    /// The identity.
    pub fn identity() -> Self {
        Self::u(0.0, 0.0, 0.0)
    }

    /// U(θ, φ, λ) = [[cos θ/2, -e^{iλ} sin θ/2], [e^{iφ} sin θ/2, e^{i(φ+λ)} cos θ/2]].
    pub fn u(theta: f64, phi: f64, lambda: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self([
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        ])
    }

    /// Matrix of a single-qubit gate, up to global phase.
    pub fn of_gate(gate: &StandardGate) -> Option<Self> {
        u_angles(gate).map(|(t, p, l)| Self::u(t, p, l))
    }

    /// `self * other`: apply `other` first.
    #[must_use]
    pub fn then_after(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.0;
        let [e, f, g, h] = other.0;
        Self([a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h])
    }

    /// Whether this is the identity up to global phase.
    pub fn is_identity(&self) -> bool {
        let [a, b, c, d] = self.0;
        b.norm() < EPSILON && c.norm() < EPSILON && (a - d).norm() < EPSILON
    }

    /// Angles (θ, φ, λ) with `self = e^{iγ} U(θ, φ, λ)`.
    pub fn to_u_angles(&self) -> (f64, f64, f64) {
        let [a, b, c, d] = self.0;
        let det = a * d - b * c;
        let unphase = Complex64::from_polar(1.0, -det.arg() / 2.0);
        let (a, c) = (a * unphase, c * unphase);

        let theta = 2.0 * a.norm().clamp(0.0, 1.0).acos();
        if theta.abs() < EPSILON {
            return (0.0, 0.0, normalize_angle(-2.0 * a.arg()));
        }
        if (theta - PI).abs() < EPSILON {
            // λ fixed to 0, φ from the lower-left element
            return (PI, normalize_angle(2.0 * c.arg()), 0.0);
        }
        let sum = -2.0 * a.arg();
        let diff = 2.0 * c.arg();
        (
            theta,
            normalize_angle(f64::midpoint(sum, diff)),
            normalize_angle((sum - diff) / 2.0),
        )
    }

    /// Equality up to global phase.
    pub fn equiv(&self, other: &Self) -> bool {
        let (pa, pb) = self
            .0
            .iter()
            .zip(other.0.iter())
            .max_by(|x, y| x.0.norm().total_cmp(&y.0.norm()))
            .map_or((Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)), |(a, b)| (*a, *b));
        if pb.norm() < EPSILON {
            return false;
        }
        let phase = pa / pb;
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b * phase).norm() < 1e-8)
    }
}

/// U(θ, φ, λ) angles of a single-qubit gate, equal up to global phase.
pub fn u_angles(gate: &StandardGate) -> Option<(f64, f64, f64)> {
    Some(match *gate {
        StandardGate::I => (0.0, 0.0, 0.0),
        StandardGate::X => (PI, 0.0, PI),
        StandardGate::Y => (PI, FRAC_PI_2, FRAC_PI_2),
        StandardGate::Z => (0.0, 0.0, PI),
        StandardGate::H => (FRAC_PI_2, 0.0, PI),
        StandardGate::S => (0.0, 0.0, FRAC_PI_2),
        StandardGate::Sdg => (0.0, 0.0, -FRAC_PI_2),
        StandardGate::T => (0.0, 0.0, FRAC_PI_4),
        StandardGate::Tdg => (0.0, 0.0, -FRAC_PI_4),
        StandardGate::SX => (FRAC_PI_2, -FRAC_PI_2, FRAC_PI_2),
        StandardGate::SXdg => (FRAC_PI_2, FRAC_PI_2, -FRAC_PI_2),
        StandardGate::Rx(t) => (t, -FRAC_PI_2, FRAC_PI_2),
        StandardGate::Ry(t) => (t, 0.0, 0.0),
        StandardGate::Rz(l) | StandardGate::P(l) => (0.0, 0.0, l),
        StandardGate::U(t, p, l) => (t, p, l),
        _ => return None,
    })
}

/// Wrap an angle into (-π, π].
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut a = angle.rem_euclid(2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    }
    a
}
