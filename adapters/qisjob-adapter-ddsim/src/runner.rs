//! Running the `ddsim_simple` executable.
//!
//! The circuit goes in as an OpenQASM file; the simulator prints one JSON
//! document with the sampled bit strings and, on request, the final state.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use qisjob_hal::auth::env_var;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{DdsimError, DdsimResult};

/// Environment variable naming the executable.
pub const DDSIM_PATH_VAR: &str = "DDSIM_PATH";

/// Executable looked up on `PATH` when `DDSIM_PATH` is unset.
pub const DEFAULT_PROGRAM: &str = "ddsim_simple";

/// What one simulator run printed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DdsimOutput {
    /// Counts keyed by bit string, highest classical bit first.
    #[serde(default)]
    pub measurement_results: BTreeMap<String, u64>,
    /// `[re, im]` per amplitude.
    #[serde(default)]
    pub state_vector: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub statistics: serde_json::Map<String, serde_json::Value>,
}

/// The executable and how to call it.
#[derive(Debug, Clone)]
pub struct DdsimRunner {
    program: PathBuf,
}

impl DdsimRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `DDSIM_PATH`, else `ddsim_simple`.
    pub fn from_env() -> Self {
        Self::new(env_var(DDSIM_PATH_VAR).unwrap_or_else(|| DEFAULT_PROGRAM.to_string()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.kill_on_drop(true);
        command
    }

    /// Whether the executable starts at all.
    pub async fn probe(&self) -> DdsimResult<()> {
        self.command()
            .arg("--help")
            .output()
            .await
            .map_err(|source| DdsimError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(())
    }

    /// Simulate `qasm` for `shots` shots.
    pub async fn run(
        &self,
        qasm: &str,
        shots: u32,
        seed: Option<u64>,
        statevector: bool,
    ) -> DdsimResult<DdsimOutput> {
        let mut file = tempfile::Builder::new()
            .prefix("qisjob-")
            .suffix(".qasm")
            .tempfile()?;
        file.write_all(qasm.as_bytes())?;
        file.flush()?;

        let mut command = self.command();
        command
            .arg("--simulate_file")
            .arg(file.path())
            .arg("--shots")
            .arg(shots.to_string())
            .arg("--ps");
        if let Some(seed) = seed {
            command.arg("--seed").arg(seed.to_string());
        }
        if statevector {
            command.arg("--pv");
        }
        trace!(?command, "running ddsim");

        let output = command.output().await.map_err(|source| DdsimError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(DdsimError::Failed {
                code: output.status.code().unwrap_or(-1),
                message: message.trim().to_string(),
            });
        }
        debug!(bytes = output.stdout.len(), "ddsim finished");
        parse_output(&output.stdout)
    }
}

/// Parse the JSON document, skipping anything printed before it.
pub(crate) fn parse_output(stdout: &[u8]) -> DdsimResult<DdsimOutput> {
    let start = stdout.iter().position(|&b| b == b'{').unwrap_or(0);
    Ok(serde_json::from_slice(&stdout[start..])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        let out = parse_output(
            br#"{"measurement_results": {"00": 510, "11": 514},
                 "state_vector": [[0.7071, 0.0], [0.0, 0.0], [0.0, 0.0], [0.7071, 0.0]],
                 "statistics": {"simulation_time": 0.001, "seed": 3}}"#,
        )
        .unwrap();
        assert_eq!(out.measurement_results["11"], 514);
        assert_eq!(out.state_vector.unwrap().len(), 4);
        assert_eq!(out.statistics["seed"], 3);
    }

    #[test]
    fn test_parse_output_with_banner() {
        let out = parse_output(b"DDSIM v1.0\n{\"measurement_results\": {\"1\": 3}}").unwrap();
        assert_eq!(out.measurement_results["1"], 3);
        assert!(out.state_vector.is_none());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_output(b"segfault"), Err(DdsimError::Output(_))));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let runner = DdsimRunner::new("/nonexistent/ddsim_simple");
        assert!(matches!(runner.probe().await, Err(DdsimError::Spawn { .. })));
        assert!(matches!(
            runner.run("OPENQASM 2.0;", 1, None, false).await,
            Err(DdsimError::Spawn { .. })
        ));
    }
}
