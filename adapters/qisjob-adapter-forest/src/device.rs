//! Rigetti device topologies the QVM can emulate.
//!
//! Names follow the Forest conventions: `9q-square` is a 3x3 grid,
//! `5q` (or `5q-qvm`) is five fully connected qubits, and `Aspen-11` is a
//! row of five octagons. A trailing `-qvm` is accepted everywhere.

use qisjob_compile::{BasisGates, CouplingMap, Target};

use crate::quil::RIGETTI_BASIS;

/// Named devices listed by the provider.
pub const KNOWN_DEVICES: [&str; 3] = ["9q-square", "Aspen-11", "4q"];

/// A device to emulate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    pub num_qubits: u32,
    /// Undirected connections, each listed in both directions. Empty means
    /// all-to-all.
    pub edges: Vec<(u32, u32)>,
}

impl Device {
    /// Look a device up by name, ignoring case and a `-qvm` suffix.
    pub fn lookup(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let base = lower.strip_suffix("-qvm").unwrap_or(&lower);

        if base == "aspen-11" {
            return Some(Self::octagons("Aspen-11", 5));
        }
        let (count, shape) = match base.split_once("q-") {
            Some((count, shape)) => (count, Some(shape)),
            None => (base.strip_suffix('q')?, None),
        };
        let n: u32 = count.parse().ok().filter(|&n| n > 0)?;
        match shape {
            None => Some(Self {
                name: format!("{n}q"),
                num_qubits: n,
                edges: vec![],
            }),
            Some("square") => {
                let side = (1..=n)
                    .find(|s| s.checked_mul(*s).is_none_or(|sq| sq >= n))
                    .filter(|s| s.checked_mul(*s) == Some(n))?;
                Some(Self::grid(&format!("{n}q-square"), side))
            }
            Some(_) => None,
        }
    }

    fn grid(name: &str, side: u32) -> Self {
        let mut edges = Vec::new();
        for row in 0..side {
            for col in 0..side {
                let q = row * side + col;
                if col + 1 < side {
                    edges.push((q, q + 1));
                }
                if row + 1 < side {
                    edges.push((q, q + side));
                }
            }
        }
        Self {
            name: name.to_string(),
            num_qubits: side * side,
            edges: both_ways(edges),
        }
    }

    /// Rings of eight numbered `8k..8k+7`; neighbouring rings join on two
    /// pairs of qubits.
    fn octagons(name: &str, count: u32) -> Self {
        let mut edges = Vec::new();
        for k in 0..count {
            let base = 8 * k;
            for j in 0..8 {
                edges.push((base + j, base + (j + 1) % 8));
            }
            if k + 1 < count {
                let next = base + 8;
                edges.push((base + 1, next + 6));
                edges.push((base + 2, next + 5));
            }
        }
        Self {
            name: name.to_string(),
            num_qubits: 8 * count,
            edges: both_ways(edges),
        }
    }

    /// The compilation target: Rigetti native gates on this topology.
    pub fn target(&self) -> Target {
        let target = Target::new(BasisGates::new(RIGETTI_BASIS));
        if self.edges.is_empty() {
            target
        } else {
            target.with_coupling_map(CouplingMap::from_edges(
                self.num_qubits,
                self.edges.iter().copied(),
            ))
        }
    }
}

fn both_ways(edges: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    edges.into_iter().flat_map(|(a, b)| [(a, b), (b, a)]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_lattice() {
        let device = Device::lookup("9q-square-qvm").unwrap();
        assert_eq!(device.num_qubits, 9);
        // 12 grid links, both directions
        assert_eq!(device.edges.len(), 24);
        assert!(device.edges.contains(&(4, 7)));
        assert!(!device.edges.contains(&(2, 3)));
        assert!(Device::lookup("8q-square").is_none());
    }

    #[test]
    fn test_fully_connected() {
        let device = Device::lookup("5q-qvm").unwrap();
        assert_eq!(device.num_qubits, 5);
        assert!(device.edges.is_empty());
        assert_eq!(Device::lookup("4Q").unwrap().name, "4q");
    }

    #[test]
    fn test_aspen_octagons() {
        let device = Device::lookup("aspen-11").unwrap();
        assert_eq!(device.name, "Aspen-11");
        assert_eq!(device.num_qubits, 40);
        // 5 rings of 8 plus 4 joints of 2, both directions
        assert_eq!(device.edges.len(), 2 * (40 + 8));
        assert!(device.edges.contains(&(1, 14)));
        assert!(device.edges.contains(&(13, 2)));
    }

    #[test]
    fn test_unknown_devices() {
        for name in ["Aspen-99", "q", "0q", "9q-hex", "qasm_simulator"] {
            assert!(Device::lookup(name).is_none(), "{name}");
        }
    }

    #[test]
    fn test_known_devices_resolve() {
        for name in KNOWN_DEVICES {
            assert!(Device::lookup(name).is_some(), "{name}");
        }
    }
}
