//! Target description and the property set shared between passes.
//!
//! The layout pass writes a [`Layout`] into the [`PropertySet`], routing
//! reads it and records where each virtual qubit ended up, and translation
//! reads the [`BasisGates`].

use std::collections::VecDeque;
use std::fmt;

use qisjob_ir::QubitId;
use serde::{Deserialize, Serialize};

/// A mapping from virtual (circuit) qubits to physical (device) qubits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// `virtual_to_physical[v]` is the physical qubit holding virtual qubit `v`.
    virtual_to_physical: Vec<u32>,
}

impl Layout {
    /// Virtual qubit `i` on physical qubit `i`.
    pub fn trivial(num_qubits: u32) -> Self {
        Self {
            virtual_to_physical: (0..num_qubits).collect(),
        }
    }

    /// Build a layout from an explicit physical qubit per virtual qubit.
    pub fn from_physical(physical: Vec<u32>) -> Self {
        Self {
            virtual_to_physical: physical,
        }
    }

    /// Physical qubit for a virtual qubit.
    pub fn physical(&self, virt: QubitId) -> Option<u32> {
        self.virtual_to_physical.get(virt.index()).copied()
    }

    /// Virtual qubit placed on a physical qubit, if any.
    pub fn virtual_at(&self, physical: u32) -> Option<QubitId> {
        self.virtual_to_physical
            .iter()
            .position(|&p| p == physical)
            .map(|v| QubitId(v as u32))
    }

    /// Exchange the contents of two physical qubits.
    pub fn swap_physical(&mut self, p1: u32, p2: u32) {
        for p in &mut self.virtual_to_physical {
            if *p == p1 {
                *p = p2;
            } else if *p == p2 {
                *p = p1;
            }
        }
    }

    /// Number of virtual qubits placed.
    pub fn len(&self) -> usize {
        self.virtual_to_physical.len()
    }

    /// Whether nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.virtual_to_physical.is_empty()
    }

    /// Iterate over (virtual, physical) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        self.virtual_to_physical
            .iter()
            .enumerate()
            .map(|(v, &p)| (QubitId(v as u32), p))
    }
}

/// Device connectivity: pairs of physical qubits that support two-qubit gates.
///
/// Edges are treated as bidirectional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingMap {
    num_qubits: u32,
    edges: Vec<(u32, u32)>,
}

impl CouplingMap {
    /// A coupling map with no edges.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            num_qubits,
            edges: vec![],
        }
    }

    /// Build from an edge list; duplicates and reversed pairs collapse.
    pub fn from_edges(num_qubits: u32, edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut map = Self::new(num_qubits);
        for (a, b) in edges {
            map.add_edge(a, b);
        }
        map
    }

    /// Add an edge. Self-loops and duplicates are ignored.
    pub fn add_edge(&mut self, q1: u32, q2: u32) {
        if q1 == q2 || self.is_connected(q1, q2) {
            return;
        }
        self.num_qubits = self.num_qubits.max(q1.max(q2) + 1);
        self.edges.push((q1, q2));
    }

    /// Whether two qubits share an edge.
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.edges
            .iter()
            .any(|&(a, b)| (a == q1 && b == q2) || (a == q2 && b == q1))
    }

    /// Number of physical qubits.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// The edge list.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Neighbours of a qubit.
    pub fn neighbors(&self, qubit: u32) -> impl Iterator<Item = u32> + '_ {
        self.edges.iter().filter_map(move |&(a, b)| {
            if a == qubit {
                Some(b)
            } else if b == qubit {
                Some(a)
            } else {
                None
            }
        })
    }

    /// Number of edges at a qubit.
    pub fn degree(&self, qubit: u32) -> usize {
        self.neighbors(qubit).count()
    }

    /// Shortest path between two qubits, both ends included.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        if from == to {
            return Some(vec![from]);
        }
        let n = self.num_qubits as usize;
        if from as usize >= n || to as usize >= n {
            return None;
        }
        let mut prev: Vec<Option<u32>> = vec![None; n];
        let mut seen = vec![false; n];
        let mut queue = VecDeque::from([from]);
        seen[from as usize] = true;

        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(current) {
                if seen[next as usize] {
                    continue;
                }
                seen[next as usize] = true;
                prev[next as usize] = Some(current);
                if next == to {
                    let mut path = vec![to];
                    let mut node = to;
                    while let Some(p) = prev[node as usize] {
                        path.push(p);
                        node = p;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Linear chain 0-1-2-...
    pub fn linear(n: u32) -> Self {
        Self::from_edges(n, (1..n).map(|i| (i - 1, i)))
    }

    /// Every pair connected.
    pub fn full(n: u32) -> Self {
        Self::from_edges(n, (0..n).flat_map(|i| ((i + 1)..n).map(move |j| (i, j))))
    }

    /// Qubit 0 connected to every other qubit.
    pub fn star(n: u32) -> Self {
        Self::from_edges(n, (1..n).map(|i| (0, i)))
    }
}

/// Native gate names of a target.
///
/// Legacy names are normalized on construction: `u1` → `p`, `u2`/`u3` → `u`,
/// `cu1` → `cp`, `cu3` → `cu`, `iden` → `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasisGates {
    gates: Vec<String>,
}

impl BasisGates {
    /// Build from gate names.
    pub fn new<S: AsRef<str>>(gates: impl IntoIterator<Item = S>) -> Self {
        let mut normalized: Vec<String> = Vec::new();
        for g in gates {
            let name = match g.as_ref() {
                "u1" => "p",
                "u2" | "u3" => "u",
                "cu1" => "cp",
                "cu3" => "cu",
                "iden" => "id",
                other => other,
            };
            if !normalized.iter().any(|n| n == name) {
                normalized.push(name.to_string());
            }
        }
        Self { gates: normalized }
    }

    /// IBM Quantum native gates: `id`, `rz`, `sx`, `x`, `cx`.
    pub fn ibm() -> Self {
        Self::new(["id", "rz", "sx", "x", "cx"])
    }

    /// Every standard gate: translation becomes a no-op.
    pub fn universal() -> Self {
        Self::new([
            "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg", "rx", "ry", "rz", "p",
            "u", "cx", "cy", "cz", "ch", "swap", "crx", "cry", "crz", "cp", "cu", "rxx", "rzz",
            "ecr", "ccx", "cswap",
        ])
    }

    /// Every standard gate on at most two qubits.
    pub fn universal_two_qubit() -> Self {
        let mut basis = Self::universal();
        basis.gates.retain(|g| g != "ccx" && g != "cswap");
        basis
    }

    /// Whether a gate name is native.
    pub fn contains(&self, gate: &str) -> bool {
        self.gates.iter().any(|g| g == gate)
    }

    /// The gate names.
    pub fn gates(&self) -> &[String] {
        &self.gates
    }
}

impl fmt::Display for BasisGates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gates.join(", "))
    }
}

/// What a circuit is compiled for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub basis_gates: BasisGates,
    pub coupling_map: Option<CouplingMap>,
}

impl Target {
    /// A target with the given basis and all-to-all connectivity.
    pub fn new(basis_gates: BasisGates) -> Self {
        Self {
            basis_gates,
            coupling_map: None,
        }
    }

    /// Restrict connectivity to a coupling map.
    #[must_use]
    pub fn with_coupling_map(mut self, coupling_map: CouplingMap) -> Self {
        self.coupling_map = Some(coupling_map);
        self
    }
}

/// Values passes share while compiling one circuit.
#[derive(Debug, Clone, Default)]
pub struct PropertySet {
    pub coupling_map: Option<CouplingMap>,
    pub basis_gates: Option<BasisGates>,
    /// Placement chosen by the layout pass.
    pub layout: Option<Layout>,
    /// Placement after routing swaps, used to read measurement wiring.
    pub final_layout: Option<Layout>,
}

impl PropertySet {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate from a target description.
    #[must_use]
    pub fn with_target(mut self, target: &Target) -> Self {
        self.coupling_map.clone_from(&target.coupling_map);
        self.basis_gates = Some(target.basis_gates.clone());
        self
    }
}
