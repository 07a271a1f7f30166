//! Noise profiles derived from device calibration data.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendConfiguration, BackendProperties};

/// Fallback error rates for gates without calibration data.
const DEFAULT_1Q_ERROR: f64 = 3e-4;
const DEFAULT_2Q_ERROR: f64 = 1e-2;

/// Depolarizing gate errors and readout flips of a reference device.
///
/// Everything a noisy simulation needs from the reference: where its
/// two-qubit gates can go, which gates it runs natively, and how often
/// each goes wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    /// Name of the device the profile was taken from.
    pub reference: String,
    pub basis_gates: Vec<String>,
    pub coupling_map: Option<Vec<[u32; 2]>>,
    /// Depolarizing probability after each single-qubit gate, per qubit.
    pub single_qubit_error: Vec<f64>,
    /// Depolarizing probability after a two-qubit gate, per ordered pair.
    #[serde(with = "pair_map")]
    pub two_qubit_error: FxHashMap<(u32, u32), f64>,
    /// Probability of flipping each qubit's measured bit.
    pub readout_error: Vec<f64>,
}

impl NoiseProfile {
    /// Build a profile from a device's configuration and calibration.
    ///
    /// Single-qubit error is the `sx` error (or `u3`/`x` for older devices).
    pub fn from_properties(config: &BackendConfiguration, props: &BackendProperties) -> Self {
        let n = config.n_qubits as usize;
        let single_qubit_error = (0..n as u32)
            .map(|q| {
                ["sx", "u3", "x"]
                    .iter()
                    .find_map(|g| props.gate_error(g, &[q]))
                    .unwrap_or(DEFAULT_1Q_ERROR)
            })
            .collect();
        let readout_error = (0..n)
            .map(|q| props.qubit_property(q, "readout_error").unwrap_or(0.0))
            .collect();

        let mut two_qubit_error = FxHashMap::default();
        for gate in &props.gates {
            if let [a, b] = gate.qubits[..] {
                if let Some(err) = gate.gate_error() {
                    two_qubit_error.insert((a, b), err);
                }
            }
        }

        Self {
            reference: config.backend_name.clone(),
            basis_gates: config.basis_gates.clone(),
            coupling_map: config.coupling_map.clone(),
            single_qubit_error,
            two_qubit_error,
            readout_error,
        }
    }

    /// Error after a single-qubit gate on `qubit`.
    pub fn single_qubit(&self, qubit: u32) -> f64 {
        self.single_qubit_error
            .get(qubit as usize)
            .copied()
            .unwrap_or(DEFAULT_1Q_ERROR)
    }

    /// Error after a two-qubit gate, looked up in either direction.
    pub fn two_qubit(&self, a: u32, b: u32) -> f64 {
        self.two_qubit_error
            .get(&(a, b))
            .or_else(|| self.two_qubit_error.get(&(b, a)))
            .copied()
            .unwrap_or(DEFAULT_2Q_ERROR)
    }

    /// Readout flip probability of `qubit`.
    pub fn readout(&self, qubit: u32) -> f64 {
        self.readout_error.get(qubit as usize).copied().unwrap_or(0.0)
    }
}

/// Tuple keys are not valid JSON object keys; store the map as a list.
mod pair_map {
    use rustc_hash::FxHashMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        map: &FxHashMap<(u32, u32), f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(u32, u32, f64)> = map.iter().map(|(&(a, b), &e)| (a, b, e)).collect();
        entries.sort_by_key(|&(a, b, _)| (a, b));
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<FxHashMap<(u32, u32), f64>, D::Error> {
        let entries = Vec::<(u32, u32, f64)>::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|(a, b, e)| ((a, b), e)).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::backend::{GateProperties, Nduv};

    fn calibrated() -> (BackendConfiguration, BackendProperties) {
        let now = Utc::now();
        let config = BackendConfiguration::new("fake_pair", 2).with_coupling_map([(0, 1), (1, 0)]);
        let gate = |name: &str, qubits: Vec<u32>, err: f64| GateProperties {
            gate: name.into(),
            qubits,
            parameters: vec![Nduv::new("gate_error", err, "", now)],
        };
        let props = BackendProperties {
            backend_name: "fake_pair".into(),
            backend_version: "1".into(),
            last_update_date: now,
            qubits: vec![
                vec![Nduv::new("readout_error", 0.03, "", now)],
                vec![Nduv::new("readout_error", 0.05, "", now)],
            ],
            gates: vec![
                gate("sx", vec![0], 2e-4),
                gate("x", vec![1], 5e-4),
                gate("cx", vec![0, 1], 0.012),
            ],
        };
        (config, props)
    }

    #[test]
    fn test_profile_from_properties() {
        let (config, props) = calibrated();
        let profile = NoiseProfile::from_properties(&config, &props);

        assert_eq!(profile.single_qubit(0), 2e-4);
        assert_eq!(profile.single_qubit(1), 5e-4);
        assert_eq!(profile.two_qubit(1, 0), 0.012);
        assert_eq!(profile.readout(1), 0.05);
        assert_eq!(profile.readout(7), 0.0);
        assert_eq!(profile.two_qubit(0, 5), DEFAULT_2Q_ERROR);
    }

    #[test]
    fn test_profile_json() {
        let (config, props) = calibrated();
        let profile = NoiseProfile::from_properties(&config, &props);
        let json = serde_json::to_string(&profile).unwrap();
        let back: NoiseProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
