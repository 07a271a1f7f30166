//! Pass manager for orchestrating compilation.

use qisjob_ir::Circuit;
use tracing::{debug, info, instrument};

use crate::error::{CompileError, CompileResult};
use crate::pass::Pass;
use crate::passes::{
    BasicRouting, BasisTranslation, CancelInversePairs, DenseLayout, Optimize1qGates,
    TrivialLayout, Unroll3qOrMore,
};
use crate::property::{PropertySet, Target};

/// Highest supported optimization level.
pub const MAX_OPTIMIZATION_LEVEL: u8 = 3;

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given circuit.
    #[instrument(skip_all, fields(circuit = circuit.name()))]
    pub fn run(&self, circuit: &mut Circuit, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on circuit with {} qubits",
            self.passes.len(),
            circuit.num_qubits()
        );

        for pass in &self.passes {
            if pass.should_run(circuit, properties) {
                debug!("Running pass: {}", pass.name());
                pass.run(circuit, properties)?;
                debug!(
                    "Pass {} completed, ops: {}",
                    pass.name(),
                    circuit.instructions().len()
                );
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!(
            "Pass manager completed, final depth: {}, ops: {}",
            circuit.depth(),
            circuit.instructions().len()
        );
        Ok(())
    }

    /// Names of the passes in execution order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for pass managers with preset pipelines.
pub struct PassManagerBuilder {
    optimization_level: u8,
    properties: PropertySet,
}

impl PassManagerBuilder {
    /// Create a new builder at optimization level 1.
    pub fn new() -> Self {
        Self {
            optimization_level: 1,
            properties: PropertySet::new(),
        }
    }

    /// Set the optimization level, clamped to 0-3.
    ///
    /// - Level 0: layout, routing and basis translation only
    /// - Level 1: + inverse pair cancellation (default)
    /// - Level 2: + dense layout and single-qubit run merging
    /// - Level 3: the level 2 optimizations run twice
    #[must_use]
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level.min(MAX_OPTIMIZATION_LEVEL);
        self
    }

    /// Set the target properties.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertySet) -> Self {
        self.properties = properties;
        self
    }

    /// Set the target basis and connectivity.
    #[must_use]
    pub fn with_target(mut self, target: &Target) -> Self {
        self.properties = self.properties.with_target(target);
        self
    }

    /// Build the pass manager and return it with the properties.
    pub fn build(self) -> (PassManager, PropertySet) {
        let mut pm = PassManager::new();
        let level = self.optimization_level;

        if self.properties.coupling_map.is_some() {
            pm.add_pass(Unroll3qOrMore);
            if level >= 2 {
                pm.add_pass(DenseLayout);
            } else {
                pm.add_pass(TrivialLayout);
            }
            pm.add_pass(BasicRouting);
        }

        if self.properties.basis_gates.is_some() {
            pm.add_pass(BasisTranslation);
        }

        let rounds = match level {
            0 => 0,
            3 => 2,
            _ => 1,
        };
        for _ in 0..rounds {
            pm.add_pass(CancelInversePairs);
            if level >= 2 {
                pm.add_pass(Optimize1qGates);
            }
        }

        (pm, self.properties)
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled circuit with the properties the passes produced.
#[derive(Debug, Clone)]
pub struct Transpiled {
    pub circuit: Circuit,
    pub properties: PropertySet,
}

/// Compile a circuit for a target at an optimization level (0-3).
pub fn transpile(circuit: &Circuit, target: &Target, level: u8) -> CompileResult<Transpiled> {
    if level > MAX_OPTIMIZATION_LEVEL {
        return Err(CompileError::InvalidOptimizationLevel(level));
    }
    let (pm, mut properties) = PassManagerBuilder::new()
        .with_optimization_level(level)
        .with_target(target)
        .build();
    let mut circuit = circuit.clone();
    pm.run(&mut circuit, &mut properties)?;
    Ok(Transpiled {
        circuit,
        properties,
    })
}

#[cfg(test)]
mod tests {
    use qisjob_ir::QubitId;

    use super::*;
    use crate::property::{BasisGates, CouplingMap};

    #[test]
    fn test_empty_pass_manager() {
        let pm = PassManager::new();
        assert!(pm.is_empty());
        assert_eq!(pm.len(), 0);
    }

    #[test]
    fn test_pass_manager_run() {
        let pm = PassManager::new();
        let mut props = PropertySet::new();

        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        pm.run(&mut circuit, &mut props).unwrap();
        assert_eq!(circuit.instructions().len(), 2);
    }

    #[test]
    fn test_pipeline_by_level() {
        let target = Target::new(BasisGates::ibm()).with_coupling_map(CouplingMap::linear(5));

        let (pm, props) = PassManagerBuilder::new()
            .with_optimization_level(0)
            .with_target(&target)
            .build();
        assert_eq!(
            pm.pass_names(),
            ["Unroll3qOrMore", "TrivialLayout", "BasicRouting", "BasisTranslation"]
        );
        assert!(props.coupling_map.is_some());

        let (pm, _) = PassManagerBuilder::new()
            .with_optimization_level(3)
            .with_target(&target)
            .build();
        assert_eq!(pm.pass_names()[1], "DenseLayout");
        assert_eq!(
            pm.pass_names()
                .iter()
                .filter(|n| **n == "Optimize1qGates")
                .count(),
            2
        );
    }

    #[test]
    fn test_no_coupling_map_skips_routing() {
        let (pm, _) = PassManagerBuilder::new()
            .with_target(&Target::new(BasisGates::universal()))
            .build();
        assert_eq!(pm.pass_names(), ["BasisTranslation", "CancelInversePairs"]);
    }

    #[test]
    fn test_transpile_rejects_bad_level() {
        let circuit = Circuit::bell().unwrap();
        let target = Target::new(BasisGates::ibm());
        assert!(matches!(
            transpile(&circuit, &target, 4),
            Err(CompileError::InvalidOptimizationLevel(4))
        ));
    }
}
