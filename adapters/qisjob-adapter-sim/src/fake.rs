//! Canned calibration snapshots of retired IBM devices.
//!
//! A fake backend is only ever a noise reference: it lends its topology,
//! basis and error rates to the local simulator without any network call.

use chrono::{DateTime, Utc};
use qisjob_hal::{BackendConfiguration, BackendProperties, GateProperties, Nduv, NoiseProfile};

/// Devices with a canned snapshot, as `(name, qubits, coupling)`.
const DEVICES: &[(&str, u32, &[(u32, u32)])] = &[
    ("fake_lima", 5, &[(0, 1), (1, 2), (1, 3), (3, 4)]),
    ("fake_belem", 5, &[(0, 1), (1, 2), (1, 3), (3, 4)]),
    ("fake_quito", 5, &[(0, 1), (1, 2), (1, 3), (3, 4)]),
    ("fake_manila", 5, &[(0, 1), (1, 2), (2, 3), (3, 4)]),
    (
        "fake_nairobi",
        7,
        &[(0, 1), (1, 2), (1, 3), (3, 5), (4, 5), (5, 6)],
    ),
];

/// Calibration date of every snapshot.
const SNAPSHOT_TIMESTAMP: i64 = 1_640_995_200;

/// Configuration and calibration of a fake device.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeBackend {
    pub configuration: BackendConfiguration,
    pub properties: BackendProperties,
}

impl FakeBackend {
    /// Noise profile for the local simulator.
    pub fn noise_profile(&self) -> NoiseProfile {
        NoiseProfile::from_properties(&self.configuration, &self.properties)
    }
}

/// Whether `name` looks like a fake device (`FakeLima`, `fake_lima`).
pub fn is_fake_name(name: &str) -> bool {
    name.to_ascii_lowercase().starts_with("fake")
}

/// Names of every canned device.
pub fn fake_names() -> impl Iterator<Item = &'static str> {
    DEVICES.iter().map(|(name, _, _)| *name)
}

/// Look up a fake device, ignoring case and underscores.
pub fn fake_backend(name: &str) -> Option<FakeBackend> {
    let wanted = normalize(name);
    DEVICES
        .iter()
        .find(|(candidate, _, _)| normalize(candidate) == wanted)
        .map(|&(name, n_qubits, edges)| build(name, n_qubits, edges))
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn build(name: &str, n_qubits: u32, edges: &[(u32, u32)]) -> FakeBackend {
    let date = DateTime::<Utc>::from_timestamp(SNAPSHOT_TIMESTAMP, 0).unwrap_or_default();
    let directed: Vec<(u32, u32)> = edges.iter().flat_map(|&(a, b)| [(a, b), (b, a)]).collect();
    let configuration = BackendConfiguration::new(name, n_qubits).with_coupling_map(directed.clone());

    let qubits = (0..n_qubits)
        .map(|q| {
            let q = f64::from(q);
            vec![
                Nduv::new("T1", 95.0 + 7.0 * q, "us", date),
                Nduv::new("T2", 80.0 + 5.0 * q, "us", date),
                Nduv::new("frequency", 5.0 + 0.05 * q, "GHz", date),
                Nduv::new("readout_error", 0.02 + 0.004 * q, "", date),
            ]
        })
        .collect();

    let gate = |gate: &str, qubits: Vec<u32>, error: f64, length: f64| GateProperties {
        gate: gate.into(),
        qubits,
        parameters: vec![
            Nduv::new("gate_error", error, "", date),
            Nduv::new("gate_length", length, "ns", date),
        ],
    };
    let mut gates = Vec::new();
    for q in 0..n_qubits {
        let error = 2.0e-4 + 4.0e-5 * f64::from(q);
        gates.push(gate("id", vec![q], error, 35.56));
        gates.push(gate("sx", vec![q], error, 35.56));
        gates.push(gate("x", vec![q], error, 35.56));
        gates.push(gate("rz", vec![q], 0.0, 0.0));
    }
    for &(a, b) in &directed {
        let error = 7.0e-3 + 1.5e-3 * f64::from((a + b) % 3);
        gates.push(gate("cx", vec![a, b], error, 355.56));
    }

    FakeBackend {
        configuration,
        properties: BackendProperties {
            backend_name: name.into(),
            backend_version: "1.0.0".into(),
            last_update_date: date,
            qubits,
            gates,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_spellings() {
        assert!(fake_backend("FakeLima").is_some());
        assert!(fake_backend("fake_lima").is_some());
        assert!(fake_backend("FAKE_NAIROBI").is_some());
        assert!(fake_backend("FakeWashington").is_none());
        assert!(is_fake_name("FakeManila"));
        assert!(!is_fake_name("ibmq_lima"));
    }

    #[test]
    fn test_profile_follows_topology() {
        let lima = fake_backend("FakeLima").unwrap();
        let profile = lima.noise_profile();
        assert_eq!(profile.reference, "fake_lima");
        assert_eq!(profile.single_qubit_error.len(), 5);
        assert!(profile.coupling_map.as_ref().unwrap().contains(&[3, 1]));
        assert!((profile.two_qubit(1, 3) - 7.0e-3 - 1.5e-3).abs() < 1e-12);
        assert!((profile.readout(0) - 0.02).abs() < 1e-12);
        assert_eq!(fake_names().count(), 5);
    }
}
