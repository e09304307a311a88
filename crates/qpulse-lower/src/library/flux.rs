//! Flux-activated two-qubit interactions (iSWAP, CZ).

use qpulse_wave::{EdgeShape, square};

use crate::error::LowerResult;
use crate::gate::{GateCall, GateProcedure, GateSignature};
use crate::instruction::Instruction;
use crate::param::{ParamSchema, ParamSpec, Params};
use crate::qubit::Channel;
use crate::synthesis::Synthesis;

/// Three aligned flat-top flux pulses on both qubits and their coupler.
///
/// The window opens once both qubits are free; both cursors then advance
/// to the same instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct FluxPulse;

impl FluxPulse {
    /// Flux pulse parameters.
    pub fn schema() -> ParamSchema {
        ParamSchema::new([
            ParamSpec::float("duration", 50e-9).unit("s").non_negative(),
            ParamSpec::float("amp1", 0.8).unit("a.u."),
            ParamSpec::float("amp2", 0.8).unit("a.u."),
            ParamSpec::float("ampc", 0.8).unit("a.u."),
            ParamSpec::float("edge", 0.0).unit("s").non_negative(),
            ParamSpec::float("buffer", 0.0).unit("s").non_negative(),
            ParamSpec::float("phi1", 0.0).unit("rad"),
            ParamSpec::float("phi2", 0.0).unit("rad"),
        ])
    }
}

impl GateProcedure for FluxPulse {
    fn signature(&self) -> GateSignature {
        GateSignature::qubits(2)
    }

    fn reads(&self) -> &[&'static str] {
        &[
            "duration", "amp1", "amp2", "ampc", "edge", "buffer", "phi1", "phi2",
        ]
    }

    fn synthesize(&self, call: &GateCall, params: &Params) -> LowerResult<Synthesis> {
        let (q0, q1) = (call.targets[0].clone(), call.targets[1].clone());
        let duration = params.float("duration")?;
        let amps = [
            params.float("amp1")?,
            params.float("amp2")?,
            params.float("ampc")?,
        ];
        let edge = params.float("edge")?;
        let buffer = params.float("buffer")?;
        let (phi1, phi2) = (params.float("phi1")?, params.float("phi2")?);

        Ok(Synthesis::new().then(move |ctx| {
            let start = ctx.max_time([&q0, &q1]) + buffer;
            let envelope = square(duration, edge, EdgeShape::Cos) >> (duration / 2.0) >> start;
            let channels = [
                Channel::flux(q0.clone()),
                Channel::flux(q1.clone()),
                Channel::coupler_flux(q0.clone(), q1.clone()),
            ];
            let end = start + duration + buffer;

            let mut out: Vec<Instruction> = channels
                .into_iter()
                .zip(amps)
                .map(|(channel, amp)| Instruction::add_waveform(channel, amp * envelope.clone()))
                .collect();
            out.push(Instruction::set_time(q0.clone(), end));
            out.push(Instruction::set_time(q1.clone(), end));
            out.push(Instruction::set_phase(q0.clone(), ctx.phase(&q0) + phi1));
            out.push(Instruction::set_phase(q1.clone(), ctx.phase(&q1) + phi2));
            out
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{GateContext, QubitLedger};
    use crate::gate::GateKey;
    use crate::param::ParamOverrides;

    #[test]
    fn test_synchronizes_cursors() {
        let mut ledger = QubitLedger::new();
        ledger.set_time("Q0".into(), 10e-9);
        ledger.set_time("Q1".into(), 15e-9);
        let mut ctx = GateContext::seed(&ledger);

        let params = FluxPulse::schema()
            .resolve(&GateKey::new("iSWAP"), &ParamOverrides::new())
            .unwrap();
        let call = GateCall::new("iSWAP", ["Q0", "Q1"]);
        let out = FluxPulse.synthesize(&call, &params).unwrap().run(&mut ctx);

        assert_eq!(out.len(), 7);
        let expected = 15e-9 + 50e-9;
        assert!((ctx.time(&"Q0".into()) - expected).abs() < 1e-18);
        assert!((ctx.time(&"Q1".into()) - expected).abs() < 1e-18);

        let Instruction::AddWaveform { channel, waveform } = &out[2] else {
            panic!("expected coupler pulse");
        };
        assert_eq!(*channel, Channel::coupler_flux("Q0".into(), "Q1".into()));
        assert!((waveform.sample(40e-9) - 0.8).abs() < 1e-12);
        assert_eq!(waveform.sample(5e-9), 0.0);
    }
}
