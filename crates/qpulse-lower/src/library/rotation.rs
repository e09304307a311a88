//! Single-qubit drive rotations.

use qpulse_wave::{Mixing, PulseShape, mix, modulate, zero};
use std::f64::consts::PI;

use crate::error::LowerResult;
use crate::gate::{GateCall, GateProcedure, GateSignature};
use crate::instruction::Instruction;
use crate::param::{ParamSchema, ParamSpec, Params};
use crate::qubit::Channel;
use crate::synthesis::Synthesis;

/// Which pair of levels a rotation drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// |0⟩ ↔ |1⟩.
    Ge,
    /// |1⟩ ↔ |2⟩.
    Ef,
    /// |0⟩ ↔ |2⟩, two-photon.
    Gf,
}

impl Transition {
    /// Registered gate name.
    pub fn gate_name(self) -> &'static str {
        match self {
            Transition::Ge => "rfUnitary",
            Transition::Ef => "rfUnitary12",
            Transition::Gf => "rfUnitary02",
        }
    }
}

/// Rotation by `theta` about an equatorial axis at angle `phi`.
///
/// Amplitude and duration are looked up from calibration tables indexed by
/// `theta/π`, the axis phase from a table indexed by `phi/π`.
#[derive(Debug, Clone, Copy)]
pub struct RfUnitary {
    /// Driven transition.
    pub transition: Transition,
}

impl RfUnitary {
    /// Parameters read by every transition.
    pub fn schema() -> ParamSchema {
        ParamSchema::new([
            ParamSpec::str("shape", "CosPulse").choices(PulseShape::NAMES),
            ParamSpec::table("amp", [[0.0, 1.0], [0.0, 0.653]]).unit("a.u."),
            ParamSpec::table("duration", [[0.0, 1.0], [10e-9, 10e-9]]).unit("s"),
            ParamSpec::table("phase", [[-1.0, 1.0], [-1.0, 1.0]]).unit("π"),
            ParamSpec::float("frequency", 5e9).unit("Hz"),
            ParamSpec::float("alpha", 1.0),
            ParamSpec::float("beta", 0.0),
            ParamSpec::float("delta", 0.0).unit("Hz"),
            ParamSpec::float("buffer", 0.0).unit("s").non_negative(),
        ])
    }
}

impl GateProcedure for RfUnitary {
    fn signature(&self) -> GateSignature {
        GateSignature::qubits(1).arg("theta").arg("phi")
    }

    fn reads(&self) -> &[&'static str] {
        &[
            "shape",
            "amp",
            "duration",
            "phase",
            "frequency",
            "alpha",
            "beta",
            "delta",
            "buffer",
        ]
    }

    fn synthesize(&self, call: &GateCall, params: &Params) -> LowerResult<Synthesis> {
        let qubit = call.targets[0].clone();
        let (theta, phi) = (call.args[0], call.args[1]);

        let shape: PulseShape = params.parse("shape")?;
        let amp = params.table("amp")?.interp(theta / PI);
        let duration = params.table("duration")?.interp(theta / PI);
        let phase = PI * params.table("phase")?.interp(phi / PI);
        let frequency = params.float("frequency")?;
        let alpha = params.float("alpha")?;
        let beta = params.float("beta")?;
        let delta = params.float("delta")?;
        let buffer = params.float("buffer")?;

        if amp == 0.0 || duration <= 0.0 {
            return Ok(Synthesis::new());
        }

        let mut mixing = Mixing::new(delta, phase);
        if alpha != 0.0 && beta != 0.0 {
            mixing = mixing.with_drag(beta / alpha);
        }
        let envelope = amp * shape.envelope(duration) >> (duration / 2.0);
        let baseband = mix(envelope, zero(), mixing);

        Ok(Synthesis::new().then(move |ctx| {
            let t0 = ctx.time(&qubit);
            let iq = baseband.shift(t0 + buffer / 2.0);
            let rf = modulate(iq.i, iq.q, ctx.phase(&qubit), frequency);
            vec![
                Instruction::add_waveform(Channel::drive(qubit.clone()), rf.i),
                Instruction::set_time(qubit, t0 + duration + buffer),
            ]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GateContext;
    use crate::gate::GateKey;
    use crate::param::ParamOverrides;

    fn lower(theta: f64, phi: f64, ctx: &mut GateContext) -> Vec<Instruction> {
        let gate = RfUnitary {
            transition: Transition::Ge,
        };
        let params = RfUnitary::schema()
            .resolve(&GateKey::new("rfUnitary"), &ParamOverrides::new())
            .unwrap();
        let call = GateCall::new("rfUnitary", ["Q0"]).with_args([theta, phi]);
        gate.synthesize(&call, &params).unwrap().run(ctx)
    }

    #[test]
    fn test_pi_pulse_advances_by_duration() {
        let mut ctx = GateContext::default();
        let out = lower(PI, 0.0, &mut ctx);
        assert_eq!(out.len(), 2);
        assert!(matches!(
            &out[0],
            Instruction::AddWaveform { channel, .. } if *channel == Channel::drive("Q0".into())
        ));
        assert!((ctx.time(&"Q0".into()) - 10e-9).abs() < 1e-18);
    }

    #[test]
    fn test_zero_angle_emits_nothing() {
        let mut ctx = GateContext::default();
        assert!(lower(0.0, 0.0, &mut ctx).is_empty());
        assert_eq!(ctx.time(&"Q0".into()), 0.0);
    }

    #[test]
    fn test_pulse_starts_at_cursor() {
        let mut ledger = crate::context::QubitLedger::new();
        ledger.set_time("Q0".into(), 40e-9);
        let mut ctx = GateContext::seed(&ledger);
        let out = lower(PI, 0.0, &mut ctx);
        let Instruction::AddWaveform { waveform, .. } = &out[0] else {
            panic!("expected waveform");
        };
        let (lo, hi) = waveform.support().unwrap();
        assert!((lo - 40e-9).abs() < 1e-15);
        assert!((hi - 50e-9).abs() < 1e-15);
    }
}
