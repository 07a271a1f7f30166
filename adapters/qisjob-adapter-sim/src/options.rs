//! Simulator kinds and the closed set of simulation options.

use std::fmt;
use std::str::FromStr;

use qisjob_hal::{HalError, HalResult, NoiseProfile};
use serde::{Deserialize, Serialize};

/// Which simulator to run; each is its own backend name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatorKind {
    /// Shot sampling into counts.
    Qasm,
    /// Counts plus the final statevector.
    #[default]
    Statevector,
    /// The circuit's unitary matrix; no measurement.
    Unitary,
}

impl SimulatorKind {
    /// Backend name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Qasm => "qasm_simulator",
            Self::Statevector => "statevector_simulator",
            Self::Unitary => "unitary_simulator",
        }
    }

    /// Widest circuit accepted.
    pub fn max_qubits(self) -> u32 {
        match self {
            Self::Qasm | Self::Statevector => 24,
            Self::Unitary => 12,
        }
    }
}

impl fmt::Display for SimulatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimulatorKind {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qasm_simulator" => Ok(Self::Qasm),
            "statevector_simulator" => Ok(Self::Statevector),
            "unitary_simulator" => Ok(Self::Unitary),
            other => Err(HalError::BackendNotFound(other.to_string())),
        }
    }
}

/// Simulation method.
///
/// The GPU methods name accelerated simulators that are not bundled; asking
/// for one is an error rather than a silent CPU fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMethod {
    #[default]
    Automatic,
    Statevector,
    StatevectorGpu,
    UnitaryGpu,
    DensityMatrixGpu,
}

impl SimulationMethod {
    /// Method name as the command line spells it.
    pub fn name(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Statevector => "statevector",
            Self::StatevectorGpu => "statevector_gpu",
            Self::UnitaryGpu => "unitary_gpu",
            Self::DensityMatrixGpu => "density_matrix_gpu",
        }
    }

    pub fn is_gpu(self) -> bool {
        matches!(
            self,
            Self::StatevectorGpu | Self::UnitaryGpu | Self::DensityMatrixGpu
        )
    }
}

/// Floating-point precision of reported amplitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    #[default]
    Double,
    /// Amplitudes are computed in `f64` and rounded to `f32` on output.
    Single,
}

impl Precision {
    pub fn name(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Single => "single",
        }
    }
}

impl FromStr for Precision {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "double" => Ok(Self::Double),
            "single" => Ok(Self::Single),
            other => Err(HalError::Unsupported(format!("precision {other}"))),
        }
    }
}

/// Everything that configures a local simulator beyond its kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatorOptions {
    pub method: SimulationMethod,
    pub precision: Precision,
    /// Noise taken from a reference device.
    pub noise: Option<NoiseProfile>,
}

impl SimulatorOptions {
    /// Set the method.
    #[must_use]
    pub fn with_method(mut self, method: SimulationMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the precision.
    #[must_use]
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Attach a noise profile.
    #[must_use]
    pub fn with_noise(mut self, noise: NoiseProfile) -> Self {
        self.noise = Some(noise);
        self
    }

    /// Check the options can be honoured by `kind`.
    pub fn validate(&self, kind: SimulatorKind) -> HalResult<()> {
        if self.method.is_gpu() {
            return Err(HalError::Unsupported(format!(
                "{} method requires a GPU simulator, which is not available",
                self.method.name()
            )));
        }
        if self.noise.is_some() && kind == SimulatorKind::Unitary {
            return Err(HalError::Unsupported(
                "noise cannot be applied to unitary_simulator".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [
            SimulatorKind::Qasm,
            SimulatorKind::Statevector,
            SimulatorKind::Unitary,
        ] {
            assert_eq!(kind.name().parse::<SimulatorKind>().unwrap(), kind);
        }
        assert!("aer_simulator_gpu".parse::<SimulatorKind>().is_err());
    }

    #[test]
    fn test_gpu_methods_rejected() {
        for method in [
            SimulationMethod::StatevectorGpu,
            SimulationMethod::UnitaryGpu,
            SimulationMethod::DensityMatrixGpu,
        ] {
            let options = SimulatorOptions::default().with_method(method);
            let err = options.validate(SimulatorKind::Qasm).unwrap_err();
            assert!(matches!(err, HalError::Unsupported(_)));
            assert!(err.to_string().contains(method.name()));
        }
        assert!(SimulatorOptions::default()
            .validate(SimulatorKind::Unitary)
            .is_ok());
    }

    #[test]
    fn test_precision_parse() {
        assert_eq!("Single".parse::<Precision>().unwrap(), Precision::Single);
        assert!("half".parse::<Precision>().is_err());
    }
}
