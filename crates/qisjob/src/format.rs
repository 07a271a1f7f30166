//! CSV output.
//!
//! Each measured experiment becomes three lines:
//!
//! ```text
//! qasm_simulator 2024-03-01T12:00:00.000000
//! 00;11;
//! 509;515;
//! ```
//!
//! Labels are sorted, and the counts follow the labels' order.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use qisjob_hal::Counts;

use crate::error::{QisJobError, QisJobResult};

/// Three CSV lines: description, labels, counts.
pub type CsvRecord = [String; 3];

/// The CSV lines for one experiment, `None` if nothing was measured.
pub fn csv_lines(description: &str, counts: &Counts) -> Option<CsvRecord> {
    if counts.is_empty() {
        return None;
    }
    let mut labels = String::new();
    let mut values = String::new();
    for (label, count) in counts.iter() {
        labels.push_str(label);
        labels.push(';');
        values.push_str(&count.to_string());
        values.push(';');
    }
    Some([description.to_string(), labels, values])
}

/// Local time in ISO 8601 with microseconds.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// `"{backend} {timestamp}"`.
pub fn description(backend: &str) -> String {
    format!("{backend} {}", timestamp())
}

/// `{basename}_{backend}_{timestamp}.{tail}`.
pub fn figure_path(basename: &str, backend: &str, tail: &str) -> PathBuf {
    PathBuf::from(format!("{basename}_{backend}_{}.{tail}", timestamp()))
}

/// Where CSV output goes.
pub enum Output {
    Stdout(io::Stdout),
    File(BufWriter<File>),
    Buffer(Vec<u8>),
}

impl Output {
    /// `path` truncated, or stdout.
    pub fn open(path: Option<&Path>) -> QisJobResult<Self> {
        match path {
            Some(path) => File::create(path)
                .map(|f| Output::File(BufWriter::new(f)))
                .map_err(|e| {
                    QisJobError::runtime_from(format!("Cannot open {}: {e}", path.display()), e)
                }),
            None => Ok(Output::Stdout(io::stdout())),
        }
    }

    /// An in-memory sink.
    pub fn buffer() -> Self {
        Output::Buffer(Vec::new())
    }

    /// What an in-memory sink collected.
    pub fn contents(&self) -> Option<&[u8]> {
        match self {
            Output::Buffer(buf) => Some(buf),
            _ => None,
        }
    }

    pub fn write_record(&mut self, record: &CsvRecord) -> QisJobResult<()> {
        for line in record {
            self.write_line(line)?;
        }
        Ok(())
    }

    pub fn write_line(&mut self, line: &str) -> QisJobResult<()> {
        writeln!(self, "{line}").map_err(|e| QisJobError::runtime_from(format!("Output: {e}"), e))
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(out) => out.write(buf),
            Output::File(out) => out.write(buf),
            Output::Buffer(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(out) => out.flush(),
            Output::File(out) => out.flush(),
            Output::Buffer(out) => out.flush(),
        }
    }
}
