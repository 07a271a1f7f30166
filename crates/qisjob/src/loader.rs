//! Circuit loading.
//!
//! Sources are OpenQASM 2.0 text. `include "qelib1.inc";` is always
//! available; other includes are resolved only when an include path is
//! configured.

use std::io::Read;
use std::path::{Path, PathBuf};

use qisjob_ir::Circuit;
use qisjob_qasm::syntax::Statement;
use qisjob_qasm::{ParseOptions, parse_ast, parse_with_options};
use tracing::{debug, info, trace};

use crate::config::JobConfig;
use crate::error::{QisJobError, QisJobResult};

/// Where a circuit comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitSource {
    Stdin,
    File(PathBuf),
    /// Source handed over directly by a library caller.
    Text(String),
}

impl CircuitSource {
    /// Name used in messages.
    pub fn label(&self) -> String {
        match self {
            CircuitSource::Stdin => "stdin".to_string(),
            CircuitSource::File(path) => path.display().to_string(),
            CircuitSource::Text(_) => "qasm source".to_string(),
        }
    }

    /// Name given to the loaded circuit.
    fn circuit_name(&self) -> String {
        match self {
            CircuitSource::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "circuit".to_string()),
            _ => "circuit".to_string(),
        }
    }

    /// The source text.
    pub fn read(&self) -> QisJobResult<String> {
        match self {
            CircuitSource::Stdin => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .map_err(|e| QisJobError::runtime_from(format!("Cannot read stdin: {e}"), e))?;
                Ok(text)
            }
            CircuitSource::File(path) => std::fs::read_to_string(path).map_err(|e| {
                QisJobError::runtime_from(format!("Cannot read {}: {e}", path.display()), e)
            }),
            CircuitSource::Text(text) => Ok(text.clone()),
        }
    }
}

/// Load and parse one circuit.
pub fn load_circuit(source: &CircuitSource, config: &JobConfig) -> QisJobResult<Circuit> {
    debug!("File path is {}", source.label());
    let text = source.read()?;
    trace!("source:\n{text}");

    let (qasm, include_path) = match &config.qc_name {
        Some(name) => (python::circuit_qasm(&text, name)?, None),
        None => (text, config.include_path.as_deref()),
    };
    let circuit = parse_source(&qasm, source, include_path)?;
    info!(
        circuit = circuit.name(),
        qubits = circuit.num_qubits(),
        clbits = circuit.num_clbits(),
        "loaded circuit"
    );
    Ok(circuit)
}

fn parse_source(
    text: &str,
    source: &CircuitSource,
    include_path: Option<&Path>,
) -> QisJobResult<Circuit> {
    let parse_err = |e: qisjob_qasm::ParseError| {
        QisJobError::runtime_from(format!("Filepath name error {} {e}", source.label()), e)
    };

    let mut options = ParseOptions::default().with_name(source.circuit_name());
    match include_path {
        Some(dir) => options = options.with_include_dir(dir),
        None => {
            let program = parse_ast(text).map_err(parse_err)?;
            let foreign = program.statements.iter().find_map(|s| match s {
                Statement::Include { path, line } if path != "qelib1.inc" => Some((path, *line)),
                _ => None,
            });
            if let Some((path, line)) = foreign {
                return Err(QisJobError::runtime(format!(
                    "Filepath name error {} line {line}: include \"{path}\" needs an include path",
                    source.label()
                )));
            }
        }
    }
    parse_with_options(text, &options).map_err(parse_err)
}

#[cfg(feature = "python")]
mod python {
    //! Named-variable circuits: run the source as Python and take one
    //! variable. The source runs with the user's full rights.

    use std::ffi::CString;

    use pyo3::prelude::*;
    use pyo3::types::PyDict;

    use crate::error::{QisJobError, QisJobResult};

    pub(super) fn circuit_qasm(source: &str, name: &str) -> QisJobResult<String> {
        let code = CString::new(source)
            .map_err(|e| QisJobError::runtime_from(format!("Source contains NUL: {e}"), e))?;
        Python::attach(|py| {
            let globals = PyDict::new(py);
            py.run(&code, Some(&globals), Some(&globals))?;
            let circuit = globals.get_item(name)?.ok_or_else(|| {
                pyo3::exceptions::PyNameError::new_err(format!("name '{name}' is not defined"))
            })?;
            match py.import("qiskit.qasm2") {
                Ok(qasm2) => qasm2.call_method1("dumps", (&circuit,))?.extract::<String>(),
                Err(_) => circuit.call_method0("qasm")?.extract::<String>(),
            }
        })
        .map_err(|e: PyErr| QisJobError::runtime(format!("Python source failed: {e}")))
    }
}

#[cfg(not(feature = "python"))]
mod python {
    use crate::error::{QisJobError, QisJobResult};

    pub(super) fn circuit_qasm(_source: &str, name: &str) -> QisJobResult<String> {
        Err(QisJobError::argument(format!(
            "qc {name} requires qisjob built with the `python` feature"
        )))
    }
}
