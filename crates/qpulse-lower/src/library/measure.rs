//! Dispersive readout.

use qpulse_wave::{EdgeShape, carrier, step};

use crate::error::{LowerError, LowerResult};
use crate::gate::{GateCall, GateProcedure, GateSignature};
use crate::instruction::{Instruction, MeasurementTask};
use crate::param::{ParamSchema, ParamSpec, Params};
use crate::qubit::Channel;
use crate::synthesis::Synthesis;

/// Signal kinds a measurement can request.
pub const SIGNALS: &[&str] = &["state", "count", "iq", "trace", "population"];

/// Readout pulse with ring-up, hold and ring-down, plus result slot allocation.
///
/// The optional `cbit` argument selects the classical bit; without it the
/// next free bit is allocated, and a negative value records no result.
/// The qubit's flux bias is set on every readout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Measure;

impl Measure {
    /// Readout parameters.
    pub fn schema() -> ParamSchema {
        ParamSchema::new([
            ParamSpec::float("duration", 1e-6).unit("s").non_negative(),
            ParamSpec::float("amp", 0.1).unit("a.u."),
            ParamSpec::float("frequency", 6.5e9).unit("Hz"),
            ParamSpec::float("bias", 0.0).unit("a.u."),
            ParamSpec::str("signal", "state").choices(SIGNALS),
            ParamSpec::str("weight", "const(1)"),
            ParamSpec::float("phi", 0.0).unit("rad"),
            ParamSpec::float("threshold", 0.0).unit("a.u."),
            ParamSpec::float("ring_up_amp", 0.1).unit("a.u."),
            ParamSpec::float("ring_up_time", 50e-9).unit("s").non_negative(),
            ParamSpec::float("ring_edge_time", 20e-9).unit("s").non_negative(),
        ])
    }
}

/// Interpret the optional `cbit` argument.
///
/// `Ok(None)` for an explicit negative index; `Ok(Some(None))` to allocate.
fn explicit_cbit(call: &GateCall) -> LowerResult<Option<Option<u32>>> {
    let Some(&raw) = call.args.first() else {
        return Ok(Some(None));
    };
    let invalid = |reason: &str| LowerError::InvalidArgument {
        gate: call.key.clone(),
        name: "cbit".to_string(),
        reason: format!("{raw} {reason}"),
    };
    if !raw.is_finite() || raw.fract() != 0.0 {
        return Err(invalid("is not an integer"));
    }
    if raw < 0.0 {
        return Ok(None);
    }
    if raw > f64::from(u32::MAX) {
        return Err(invalid("is out of range"));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(Some(Some(raw as u32)))
}

impl GateProcedure for Measure {
    fn signature(&self) -> GateSignature {
        GateSignature::qubits(1).optional_arg("cbit")
    }

    fn reads(&self) -> &[&'static str] {
        &[
            "duration",
            "amp",
            "frequency",
            "bias",
            "signal",
            "weight",
            "ring_up_amp",
            "ring_up_time",
            "ring_edge_time",
        ]
    }

    fn synthesize(&self, call: &GateCall, params: &Params) -> LowerResult<Synthesis> {
        let qubit = call.targets[0].clone();
        let cbit = explicit_cbit(call)?;

        let duration = params.float("duration")?;
        let amp = params.float("amp")?.abs();
        let frequency = params.float("frequency")?;
        let bias = params.float("bias")?;
        let signal = params.str("signal")?.to_string();
        let weight = params.str("weight")?.to_string();
        let ring_up_amp = params.float("ring_up_amp")?;
        let ring_up_time = params.float("ring_up_time")?;
        let edge = params.float("ring_edge_time")?;
        let recorded = params.values().clone();

        Ok(Synthesis::new().then(move |ctx| {
            let t = ctx.time(&qubit);
            let s = step(edge, EdgeShape::Cos);
            let envelope = ring_up_amp * (s.clone() >> t)
                - (ring_up_amp - amp) * (s.clone() >> (t + ring_up_time))
                - amp * (s >> (t + duration));
            let pulse = envelope * carrier(frequency, 0.0);

            let mut out = vec![
                Instruction::add_waveform(Channel::readout(qubit.clone()), pulse),
                Instruction::set_bias(Channel::flux(qubit.clone()), bias),
            ];
            let cbit = cbit.map(|c| c.unwrap_or_else(|| ctx.next_cbit()));
            if let Some(cbit) = cbit {
                out.push(Instruction::set_cbit(MeasurementTask {
                    qubit: qubit.clone(),
                    cbit,
                    time: t,
                    signal,
                    weight,
                    params: recorded,
                }));
            }
            out.push(Instruction::set_time(qubit.clone(), t + duration));
            out.push(Instruction::set_phase(qubit, 0.0));
            out
        }))
    }
}
