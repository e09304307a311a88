//! Gates that only move the frame or the clock: `P`, `Delay`, `Barrier`.

use crate::error::{LowerError, LowerResult};
use crate::gate::{Arity, GateCall, GateProcedure, GateSignature};
use crate::instruction::Instruction;
use crate::param::Params;
use crate::synthesis::Synthesis;

/// Virtual Z rotation: adds `theta` to the qubit's phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseShift;

impl GateProcedure for PhaseShift {
    fn signature(&self) -> GateSignature {
        GateSignature::qubits(1).arg("theta")
    }

    fn reads(&self) -> &[&'static str] {
        &[]
    }

    fn synthesize(&self, call: &GateCall, _params: &Params) -> LowerResult<Synthesis> {
        let qubit = call.targets[0].clone();
        let theta = call.args[0];
        Ok(Synthesis::new().then(move |ctx| {
            let phase = ctx.phase(&qubit) + theta;
            vec![Instruction::set_phase(qubit, phase)]
        }))
    }
}

/// Idle for a fixed time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delay;

impl GateProcedure for Delay {
    fn signature(&self) -> GateSignature {
        GateSignature::qubits(1).arg("duration")
    }

    fn reads(&self) -> &[&'static str] {
        &[]
    }

    fn synthesize(&self, call: &GateCall, _params: &Params) -> LowerResult<Synthesis> {
        let qubit = call.targets[0].clone();
        let duration = call.args[0];
        if !duration.is_finite() || duration < 0.0 {
            return Err(LowerError::InvalidArgument {
                gate: call.key.clone(),
                name: "duration".to_string(),
                reason: format!("{duration} is not a non-negative time"),
            });
        }
        Ok(Synthesis::new().then(move |ctx| {
            let time = ctx.time(&qubit) + duration;
            vec![Instruction::set_time(qubit, time)]
        }))
    }
}

/// Align the cursors of all targets to the latest among them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Barrier;

impl GateProcedure for Barrier {
    fn signature(&self) -> GateSignature {
        GateSignature::new(Arity::AtLeast(1))
    }

    fn reads(&self) -> &[&'static str] {
        &[]
    }

    fn synthesize(&self, call: &GateCall, _params: &Params) -> LowerResult<Synthesis> {
        let qubits = call.targets.clone();
        Ok(Synthesis::new().then(move |ctx| {
            let time = ctx.max_time(&qubits);
            qubits
                .into_iter()
                .filter(|q| ctx.time(q) < time)
                .map(|q| Instruction::set_time(q, time))
                .collect()
        }))
    }
}
