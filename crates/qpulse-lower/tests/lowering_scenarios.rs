//! End-to-end lowering scenarios against the standard gate library.
//!
//! Each test lowers top-level calls through a [`Lowerer`] and checks the
//! instruction stream and the resulting qubit state.

use std::f64::consts::PI;

use qpulse_lower::{
    Calibration, Channel, GateCall, GateKey, GateRegistry, GateRegistryBuilder, GateSignature,
    Instruction, LowerError, LowerResult, Lowerer, NoCalibration, ParamOverrides, QubitLedger,
    Schedule, StateUpdate, Subcall,
};

fn registry() -> GateRegistry {
    GateRegistry::standard().unwrap()
}

/// Helper: lower one call from `ledger`, committing the result.
fn lower(
    lowerer: &Lowerer<'_>,
    call: GateCall,
    ledger: &mut QubitLedger,
) -> Vec<Instruction> {
    lowerer.lower_into(&call, ledger).unwrap()
}

/// Helper: channels receiving waveforms, in order.
fn waveform_channels(out: &[Instruction]) -> Vec<Channel> {
    out.iter()
        .filter_map(|i| match i {
            Instruction::AddWaveform { channel, .. } => Some(channel.clone()),
            _ => None,
        })
        .collect()
}

/// Helper: gate names of expansion markers, in order.
fn expansions(out: &[Instruction]) -> Vec<String> {
    out.iter()
        .filter_map(|i| match i {
            Instruction::Expand(call) => Some(call.key.to_string()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_pi_rotation_single_waveform() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let mut ledger = QubitLedger::new();

    let out = lower(
        &lowerer,
        GateCall::new("rfUnitary", ["Q0"]).with_args([PI, 0.0]),
        &mut ledger,
    );

    assert_eq!(waveform_channels(&out), vec![Channel::drive("Q0".into())]);
    // default duration table gives 10 ns at θ = π, default buffer is 0
    assert!((ledger.time(&"Q0".into()) - 10e-9).abs() < 1e-18);
}

#[test]
fn test_measurements_allocate_sequential_bits() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let mut ledger = QubitLedger::new();

    lower(&lowerer, GateCall::new("Measure", ["Q0"]), &mut ledger);
    lower(&lowerer, GateCall::new("Measure", ["Q1"]), &mut ledger);

    let bits: Vec<(u32, &str)> = ledger
        .measures()
        .iter()
        .map(|(bit, task)| (*bit, task.qubit.name()))
        .collect();
    assert_eq!(bits, vec![(0, "Q0"), (1, "Q1")]);
}

#[test]
fn test_measurement_bits_continue_after_explicit_index() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let mut ledger = QubitLedger::new();

    lower(
        &lowerer,
        GateCall::new("Measure", ["Q0"]).with_args([5.0]),
        &mut ledger,
    );
    lower(&lowerer, GateCall::new("Measure", ["Q1"]), &mut ledger);

    let bits: Vec<u32> = ledger.measures().keys().copied().collect();
    assert_eq!(bits, vec![5, 6]);
}

#[test]
fn test_echoed_cross_resonance_sequence() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let mut ledger = QubitLedger::new();

    let out = lower(
        &lowerer,
        GateCall::new(GateKey::qualified("CR", "echo"), ["Q0", "Q1"]),
        &mut ledger,
    );

    // CR pass, X on the control, CR pass, X on the control
    let q0_drive = Channel::drive("Q0".into());
    assert_eq!(waveform_channels(&out), vec![q0_drive.clone(); 4]);
    assert_eq!(expansions(&out), vec!["X", "rfUnitary", "X", "rfUnitary"]);

    let Instruction::Expand(first_x) = out.iter().find(|i| i.is_expand()).unwrap() else {
        unreachable!()
    };
    assert_eq!(first_x.targets, vec!["Q0".into()]);

    // two CR passes of 100 ns + 20 ns edge plus two 10 ns X pulses
    assert!((ledger.time(&"Q0".into()) - 260e-9).abs() < 1e-15);
}

#[test]
fn test_echo_second_pass_is_negated() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let mut ledger = QubitLedger::new();

    let out = lower(
        &lowerer,
        GateCall::new(GateKey::qualified("CR", "echo"), ["Q0", "Q1"]),
        &mut ledger,
    );
    let pulses: Vec<&qpulse_wave::Waveform> = out
        .iter()
        .filter_map(|i| match i {
            Instruction::AddWaveform { waveform, .. } => Some(waveform),
            _ => None,
        })
        .collect();
    // pulses[0] is the first CR pass; pulses[2] starts after CR + X = 130 ns
    let t = 60e-9;
    let first = pulses[0].sample(t);
    let second = pulses[2].sample(t + 130e-9);
    assert!(first.abs() > 1e-3);
    assert!((first + second).abs() < 1e-9);
}

#[test]
fn test_flux_gate_synchronizes_qubits() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let mut ledger = QubitLedger::new();
    ledger.set_time("Q0".into(), 10e-9);
    ledger.set_time("Q1".into(), 15e-9);

    let out = lower(&lowerer, GateCall::new("iSWAP", ["Q0", "Q1"]), &mut ledger);

    assert_eq!(
        waveform_channels(&out),
        vec![
            Channel::flux("Q0".into()),
            Channel::flux("Q1".into()),
            Channel::coupler_flux("Q0".into(), "Q1".into()),
        ]
    );
    let end = 15e-9 + 50e-9;
    assert!((ledger.time(&"Q0".into()) - end).abs() < 1e-18);
    assert!((ledger.time(&"Q1".into()) - end).abs() < 1e-18);
}

#[test]
fn test_cx_expands_through_h_and_cz() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let mut ledger = QubitLedger::new();

    let out = lower(&lowerer, GateCall::new("CX", ["Q0", "Q1"]), &mut ledger);

    let top: Vec<String> = expansions(&out)
        .into_iter()
        .filter(|name| name == "H" || name == "CZ")
        .collect();
    assert_eq!(top, vec!["H", "CZ", "H"]);
    // H = two π/2 pulses on Q1; CZ then waits for Q1 before the flux window
    let q1 = ledger.time(&"Q1".into());
    assert!((q1 - (20e-9 + 50e-9 + 20e-9)).abs() < 1e-15);
    assert!((ledger.time(&"Q0".into()) - 70e-9).abs() < 1e-15);
}

#[test]
fn test_u_gate_applies_virtual_phase() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let mut ledger = QubitLedger::new();

    lower(
        &lowerer,
        GateCall::new("U", ["Q0"]).with_args([0.3, 0.2, 0.1]),
        &mut ledger,
    );
    assert!((ledger.phase(&"Q0".into()) - 0.6).abs() < 1e-12);
}

#[test]
fn test_calibration_override_changes_timing() {
    let reg = registry();
    let cal = Calibration::from_yaml_str(
        r"
gates:
  - gate: rfUnitary
    qubits: [Q0]
    params:
      duration: [[0, 1], [20.0e-9, 40.0e-9]]
      buffer: 2.0e-9
",
    )
    .unwrap();
    let lowerer = Lowerer::new(&reg, &cal);
    let mut ledger = QubitLedger::new();

    lower(&lowerer, GateCall::new("X", ["Q0"]), &mut ledger);
    assert!((ledger.time(&"Q0".into()) - 42e-9).abs() < 1e-18);

    // other qubits keep the defaults
    lower(&lowerer, GateCall::new("X", ["Q1"]), &mut ledger);
    assert!((ledger.time(&"Q1".into()) - 10e-9).abs() < 1e-18);
}

#[test]
fn test_invalid_target_count() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let err = lowerer
        .lower(&GateCall::new("CR", ["Q0"]), &QubitLedger::new())
        .err()
        .unwrap();
    assert!(matches!(err, LowerError::InvalidTargetCount { got: 1, .. }));
}

#[test]
fn test_duplicate_targets_rejected() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let err = lowerer
        .lower(&GateCall::new("CZ", ["Q0", "Q0"]), &QubitLedger::new())
        .err()
        .unwrap();
    assert!(matches!(err, LowerError::DuplicateTarget { .. }));
}

#[test]
fn test_mutual_recursion_rejected_at_registration() {
    let mut b = GateRegistryBuilder::new();
    b.register_compound("A", None, GateSignature::qubits(1), vec![Subcall::new("B", [0])])
        .unwrap();
    let err = b
        .register_compound("B", None, GateSignature::qubits(1), vec![Subcall::new("A", [0])])
        .unwrap_err();
    assert!(matches!(err, LowerError::GateCycle { .. }));
    assert!(err.to_string().contains("B -> A -> B"));
}

#[test]
fn test_resolution_defaults_match_schema() {
    let reg = registry();
    for key in reg.keys() {
        let def = reg.get(key).unwrap();
        let Some(schema) = def.schema() else {
            continue;
        };
        let params = reg.resolve(key, &ParamOverrides::new()).unwrap();
        for spec in schema.iter() {
            assert_eq!(params.get(&spec.name), spec.default.as_ref(), "{key}.{}", spec.name);
        }
    }
}

#[test]
fn test_instructions_per_target_stay_in_order() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let mut schedule = Schedule::new();
    let calls = [
        GateCall::new("H", ["Q0"]),
        GateCall::new("CX", ["Q0", "Q1"]),
        GateCall::new("Measure", ["Q0"]),
        GateCall::new("Measure", ["Q1"]),
    ];
    schedule.run_all(&lowerer, &calls).unwrap();

    // every time set on a qubit is at least the previous one
    let mut last = std::collections::HashMap::new();
    for i in schedule.instructions() {
        if let Instruction::SetState(StateUpdate::Time { qubit, value }) = i {
            let prev = last.insert(qubit.clone(), *value).unwrap_or(0.0);
            assert!(*value >= prev, "{qubit} went back from {prev} to {value}");
        }
    }
    assert_eq!(schedule.ledger().measures().len(), 2);
}

#[test]
fn test_lowering_is_lazy_and_context_tracks_progress() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let ledger = QubitLedger::new();
    let mut lowering = lowerer
        .lower(&GateCall::new("X", ["Q0"]), &ledger)
        .unwrap();

    // Expand marker for rfUnitary
    assert!(lowering.next().unwrap().unwrap().is_expand());
    assert_eq!(lowering.context().time(&"Q0".into()), 0.0);
    // waveform then time
    assert!(matches!(
        lowering.next().unwrap().unwrap(),
        Instruction::AddWaveform { .. }
    ));
    lowering.next().unwrap().unwrap();
    assert!((lowering.context().time(&"Q0".into()) - 10e-9).abs() < 1e-18);
    assert!(lowering.next().is_none());

    let ctx = lowering.into_context().unwrap();
    assert!((ctx.time(&"Q0".into()) - 10e-9).abs() < 1e-18);
}

#[test]
fn test_barrier_and_delay() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    let mut ledger = QubitLedger::new();

    lower(
        &lowerer,
        GateCall::new("Delay", ["Q0"]).with_args([30e-9]),
        &mut ledger,
    );
    lower(&lowerer, GateCall::new("Barrier", ["Q0", "Q1", "Q2"]), &mut ledger);
    for q in ["Q0", "Q1", "Q2"] {
        assert!((ledger.time(&q.into()) - 30e-9).abs() < 1e-18);
    }
}

#[test]
fn test_bad_bound_argument_fails_before_output() {
    // compound binding 1/x, called with x = 0
    let mut b = GateRegistryBuilder::new();
    b.register_compound("Leaf", None, GateSignature::qubits(1).arg("x"), vec![])
        .unwrap();
    b.register_compound(
        "Div",
        None,
        GateSignature::qubits(1).arg("x"),
        vec![Subcall::new("Leaf", [0]).with_args([
            qpulse_lower::ArgExpr::constant(1.0) / qpulse_lower::ArgExpr::symbol("x"),
        ])],
    )
    .unwrap();
    let reg = b.build().unwrap();
    let lowerer = Lowerer::new(&reg, &NoCalibration);

    let result: LowerResult<Vec<Instruction>> = lowerer
        .lower(&GateCall::new("Div", ["Q0"]).with_args([0.0]), &QubitLedger::new())
        .and_then(|l| l.collect());
    assert!(matches!(result, Err(LowerError::InvalidArgument { .. })));
}

#[test]
fn test_non_finite_rotation_angle_rejected() {
    let reg = registry();
    let lowerer = Lowerer::new(&reg, &NoCalibration);

    let call: GateCall =
        serde_yaml_ng::from_str("{ gate: rfUnitary, qubits: [Q0], args: [.nan, 0.0] }").unwrap();
    assert!(matches!(
        lowerer.lower(&call, &QubitLedger::new()).err(),
        Some(LowerError::InvalidArgument { name, .. }) if name == "theta"
    ));

    // a finite parent argument that overflows once bound
    let mut b = qpulse_lower::library::standard_builder().unwrap();
    b.register_compound(
        "Huge",
        None,
        GateSignature::qubits(1).arg("x"),
        vec![Subcall::new("rfUnitary", [0]).with_args([
            qpulse_lower::ArgExpr::symbol("x") * qpulse_lower::ArgExpr::constant(1e300),
            qpulse_lower::ArgExpr::constant(0.0),
        ])],
    )
    .unwrap();
    let reg = b.build().unwrap();
    let lowerer = Lowerer::new(&reg, &NoCalibration);
    assert!(matches!(
        lowerer
            .lower(&GateCall::new("Huge", ["Q0"]).with_args([1e10]), &QubitLedger::new())
            .err(),
        Some(LowerError::InvalidArgument { .. })
    ));
}

#[test]
fn test_repeated_subgate_arguments_checked_before_output() {
    let d = || qpulse_lower::ArgExpr::symbol("d");
    let mut b = qpulse_lower::library::standard_builder().unwrap();
    b.register_compound(
        "WaitBack",
        None,
        GateSignature::qubits(1).arg("d"),
        vec![
            Subcall::new("Delay", [0]).with_args([d()]),
            Subcall::new("Delay", [0]).with_args([-d()]),
        ],
    )
    .unwrap()
    .register_compound(
        "WaitTwice",
        None,
        GateSignature::qubits(1).arg("d"),
        vec![
            Subcall::new("Delay", [0]).with_args([d()]),
            Subcall::new("Delay", [0]).with_args([d() * qpulse_lower::ArgExpr::constant(2.0)]),
        ],
    )
    .unwrap();
    let reg = b.build().unwrap();
    let lowerer = Lowerer::new(&reg, &NoCalibration);

    // the second Delay on the same slot carries a negative duration
    let err = lowerer
        .lower(&GateCall::new("WaitBack", ["Q0"]).with_args([5e-9]), &QubitLedger::new())
        .err();
    assert!(matches!(err, Some(LowerError::InvalidArgument { .. })));

    let mut ledger = QubitLedger::new();
    lower(
        &lowerer,
        GateCall::new("WaitTwice", ["Q0"]).with_args([5e-9]),
        &mut ledger,
    );
    assert!((ledger.time(&"Q0".into()) - 15e-9).abs() < 1e-18);
}
