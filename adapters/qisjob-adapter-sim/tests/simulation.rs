use proptest::prelude::*;
use qisjob_adapter_sim::{
    fake_backend, LocalSimulator, SimulatorKind, SimulatorOptions, Statevector,
};
use qisjob_hal::{Backend, RunOptions};
use qisjob_ir::{Circuit, StandardGate};

fn seeded(shots: u32, seed: u64) -> RunOptions {
    RunOptions {
        seed: Some(seed),
        ..RunOptions::new(shots)
    }
}

#[tokio::test]
async fn test_entangle_yields_only_correlated_outcomes() {
    let backend = LocalSimulator::new(SimulatorKind::Statevector);
    let job_id = backend
        .submit(&[Circuit::bell().unwrap()], &RunOptions::new(1024))
        .await
        .unwrap();
    let result = backend.wait(&job_id).await.unwrap();

    let counts = result.counts(0).unwrap();
    assert_eq!(counts.get("00") + counts.get("11"), 1024);
    assert!(counts.iter().all(|(label, _)| label == "00" || label == "11"));
    assert_eq!(result.results[0].statevector.as_ref().unwrap().len(), 4);
}

#[tokio::test]
async fn test_noisy_simulation_mostly_correlated() {
    let lima = fake_backend("FakeLima").unwrap();
    let options = SimulatorOptions::default().with_noise(lima.noise_profile());
    let backend = LocalSimulator::with_options(SimulatorKind::Qasm, options).unwrap();
    assert_eq!(backend.configuration().n_qubits, 5);
    assert_eq!(
        backend.configuration().coupling_map,
        lima.configuration.coupling_map
    );

    let job_id = backend
        .submit(&[Circuit::bell().unwrap()], &seeded(2000, 3))
        .await
        .unwrap();
    let result = backend.result(&job_id).await.unwrap();
    let counts = result.counts(0).unwrap();
    assert_eq!(counts.total_shots(), 2000);
    let correlated = counts.get("00") + counts.get("11");
    // readout and gate errors leak a few percent into 01/10
    assert!(correlated > 1700, "{counts:?}");
    assert!(correlated < 2000, "{counts:?}");
    assert_eq!(result.results[0].metadata["noise_reference"], "fake_lima");
}

#[tokio::test]
async fn test_one_job_many_circuits_keeps_order() {
    let backend = LocalSimulator::new(SimulatorKind::Qasm);
    let circuits = [Circuit::ghz(3).unwrap(), Circuit::bell().unwrap()];
    let job_id = backend.submit(&circuits, &seeded(64, 9)).await.unwrap();
    let result = backend.result(&job_id).await.unwrap();
    assert_eq!(result.results.len(), 2);
    assert_eq!(result.results[0].name, "ghz_3");
    assert_eq!(result.results[1].name, "bell");
}

fn any_gate() -> impl Strategy<Value = StandardGate> {
    prop_oneof![
        Just(StandardGate::H),
        Just(StandardGate::X),
        Just(StandardGate::S),
        Just(StandardGate::T),
        Just(StandardGate::SX),
        (-3.2f64..3.2).prop_map(StandardGate::Rx),
        (-3.2f64..3.2).prop_map(StandardGate::Ry),
        (-3.2f64..3.2, -3.2f64..3.2, -3.2f64..3.2).prop_map(|(a, b, c)| StandardGate::U(a, b, c)),
        Just(StandardGate::CX),
        Just(StandardGate::CZ),
        Just(StandardGate::Swap),
        (-3.2f64..3.2).prop_map(StandardGate::CRy),
        (-3.2f64..3.2).prop_map(StandardGate::RZZ),
        Just(StandardGate::CCX),
    ]
}

proptest! {
    #[test]
    fn prop_gates_preserve_norm(gates in prop::collection::vec((any_gate(), 0usize..3), 1..40)) {
        let mut state = Statevector::new(3);
        for (gate, offset) in gates {
            let qubits: Vec<usize> = (0..gate.num_qubits() as usize)
                .map(|i| (offset + i) % 3)
                .collect();
            state.apply_gate(&gate, &qubits);
        }
        let norm: f64 = state.amplitudes().iter().map(|a| a.norm_sqr()).sum();
        prop_assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_counts_sum_to_shots(shots in 1u32..500, seed in any::<u64>(), n in 1u32..5) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let total = runtime.block_on(async {
            let backend = LocalSimulator::new(SimulatorKind::Qasm);
            let job_id = backend
                .submit(&[Circuit::ghz(n).unwrap()], &seeded(shots, seed))
                .await
                .unwrap();
            backend.result(&job_id).await.unwrap().counts(0).unwrap().total_shots()
        });
        prop_assert_eq!(total, u64::from(shots));
    }
}
