//! Pass trait and types for compilation passes.

use qisjob_ir::Circuit;

use crate::error::CompileResult;
use crate::property::PropertySet;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Reads the circuit and writes to the `PropertySet`.
    Analysis,
    /// Rewrites the circuit.
    Transformation,
}

/// A compilation pass over a circuit.
pub trait Pass: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Whether the pass rewrites the circuit.
    fn kind(&self) -> PassKind;

    /// Run the pass.
    fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()>;

    /// Skip the pass when this returns false.
    fn should_run(&self, _circuit: &Circuit, _properties: &PropertySet) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Pass for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn kind(&self) -> PassKind {
            PassKind::Analysis
        }

        fn run(&self, _circuit: &mut Circuit, _properties: &mut PropertySet) -> CompileResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_pass_defaults() {
        let circuit = Circuit::with_size("t", 1, 0);
        assert_eq!(Noop.kind(), PassKind::Analysis);
        assert!(Noop.should_run(&circuit, &PropertySet::new()));
    }
}
