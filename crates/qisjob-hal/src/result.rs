//! Job results: counts, per-shot memory, statevectors and unitaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use num_complex::Complex64;
use qisjob_ir::Circuit;
use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// Shots per classical outcome, keyed by bit-string label.
///
/// Labels put the highest classical bit first, with a space between
/// classical registers, so `c[0] = 1, c[1] = 0` reads `"01"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counts(BTreeMap<String, u64>);

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` shots to an outcome.
    pub fn add(&mut self, label: impl Into<String>, count: u64) {
        *self.0.entry(label.into()).or_insert(0) += count;
    }

    /// Shots for an outcome.
    pub fn get(&self, label: &str) -> u64 {
        self.0.get(label).copied().unwrap_or(0)
    }

    /// Total number of shots.
    pub fn total_shots(&self) -> u64 {
        self.0.values().sum()
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no outcome was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Outcomes in lexicographic label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// The most frequent outcome; ties go to the first label.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
    }

    /// Tally per-shot memory.
    pub fn from_memory<S: AsRef<str>>(memory: &[S]) -> Self {
        let mut counts = Self::new();
        for shot in memory {
            counts.add(shot.as_ref(), 1);
        }
        counts
    }
}

impl FromIterator<(String, u64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (label, n) in iter {
            counts.add(label, n);
        }
        counts
    }
}

/// Label for a classical register state, `bits[i]` being flat clbit `i`.
pub fn bit_label(circuit: &Circuit, bits: &[bool]) -> String {
    let bit = |i: u32| {
        if bits.get(i as usize).copied().unwrap_or(false) {
            '1'
        } else {
            '0'
        }
    };
    if circuit.cregs().is_empty() {
        return (0..bits.len() as u32).rev().map(bit).collect();
    }
    circuit
        .cregs()
        .iter()
        .rev()
        .map(|reg| (reg.offset..reg.offset + reg.size).rev().map(bit).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outcome of one circuit in a job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub name: String,
    pub shots: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<Counts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statevector: Option<Vec<Complex64>>,
    /// Row-major.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unitary: Option<Vec<Vec<Complex64>>>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ExperimentResult {
    /// An empty result for a named circuit.
    pub fn new(name: impl Into<String>, shots: u32) -> Self {
        Self {
            name: name.into(),
            shots,
            ..Self::default()
        }
    }

    /// Attach counts.
    #[must_use]
    pub fn with_counts(mut self, counts: Counts) -> Self {
        self.counts = Some(counts);
        self
    }
}

/// Result of a job: one experiment per submitted circuit, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub backend_name: String,
    pub job_id: JobId,
    pub success: bool,
    pub date: DateTime<Utc>,
    pub results: Vec<ExperimentResult>,
}

impl JobResult {
    /// A successful result dated now.
    pub fn new(
        backend_name: impl Into<String>,
        job_id: JobId,
        results: Vec<ExperimentResult>,
    ) -> Self {
        Self {
            backend_name: backend_name.into(),
            job_id,
            success: true,
            date: Utc::now(),
            results,
        }
    }

    /// Counts of experiment `index`, if it measured anything.
    pub fn counts(&self, index: usize) -> Option<&Counts> {
        self.results.get(index).and_then(|r| r.counts.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let counts = Counts::from_memory(&["11", "00", "11", "01"]);
        assert_eq!(counts.total_shots(), 4);
        assert_eq!(counts.get("11"), 2);
        assert_eq!(counts.get("10"), 0);
        assert_eq!(counts.most_frequent(), Some(("11", 2)));
        let labels: Vec<&str> = counts.iter().map(|(k, _)| k).collect();
        assert_eq!(labels, ["00", "01", "11"]);
    }

    #[test]
    fn test_bit_label_order() {
        let circuit = Circuit::with_size("t", 2, 2);
        assert_eq!(bit_label(&circuit, &[true, false]), "01");

        let mut two_regs = Circuit::with_size("t", 1, 0);
        two_regs.add_creg("a", 2).unwrap();
        two_regs.add_creg("b", 1).unwrap();
        assert_eq!(bit_label(&two_regs, &[true, false, true]), "1 01");
    }

    #[test]
    fn test_result_json_shape() {
        let mut counts = Counts::new();
        counts.add("00", 510);
        counts.add("11", 514);
        let result = JobResult::new(
            "qasm_simulator",
            JobId::new("sim-1"),
            vec![ExperimentResult::new("entangle", 1024).with_counts(counts)],
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["results"][0]["counts"]["11"], 514);
        assert!(json["results"][0].get("statevector").is_none());
        assert_eq!(result.counts(0).map(Counts::total_shots), Some(1024));
        assert!(result.counts(1).is_none());
    }
}
