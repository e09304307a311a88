//! Cross-resonance coupling, plain and echoed.

use qpulse_wave::{EdgeShape, Mixing, mix, square, step, zero};

use crate::context::GateContext;
use crate::error::LowerResult;
use crate::gate::{GateCall, GateProcedure, GateSignature, Subcall};
use crate::instruction::Instruction;
use crate::param::{ParamSchema, ParamSpec, Params};
use crate::qubit::{Channel, QubitRef};
use crate::synthesis::Synthesis;

/// Scale applied to `drag` and `skew` so calibrated values stay near unity.
const CORRECTION_SCALE: f64 = 1e-9;

/// Gate the echoed variant interleaves on the control qubit.
const ECHO_GATE: &str = "X";

/// Resolved cross-resonance parameters.
#[derive(Debug, Clone, Copy)]
struct CrPulse {
    duration: f64,
    frequency: f64,
    edge_type: EdgeShape,
    edge: f64,
    amp1: f64,
    amp2: f64,
    drag: f64,
    skew: f64,
    global_phase: f64,
    relative_phase: f64,
    phi1: f64,
    phi2: f64,
    buffer: f64,
}

impl CrPulse {
    fn from_params(params: &Params) -> LowerResult<Self> {
        Ok(Self {
            duration: params.float("duration")?,
            frequency: params.float("frequency")?,
            edge_type: params.parse("edge_type")?,
            edge: params.float("edge")?,
            amp1: params.float("amp1")?,
            amp2: params.float("amp2")?,
            drag: params.float("drag")?,
            skew: params.float("skew")?,
            global_phase: params.float("global_phase")?,
            relative_phase: params.float("relative_phase")?,
            phi1: params.float("phi1")?,
            phi2: params.float("phi2")?,
            buffer: params.float("buffer")?,
        })
    }

    /// Instructions for one pass, `sign` flipping both drive pulses.
    fn emit(
        &self,
        ctx: &GateContext,
        control: &QubitRef,
        target: &QubitRef,
        sign: f64,
    ) -> Vec<Instruction> {
        let p = self;
        let t = ctx.max_time([control, target]);
        let end = t + p.duration + p.edge + p.buffer;
        let pulse = square(p.duration, p.edge, p.edge_type)
            >> (t + p.duration / 2.0 + p.edge / 2.0 + p.buffer / 2.0);
        let mut out = Vec::new();

        if p.amp1 > 0.0 && p.duration > 0.0 {
            let phase = p.global_phase - ctx.phase(target);
            let iq = mix(p.amp1 * pulse.clone(), zero(), Mixing::new(p.frequency, phase));
            out.push(Instruction::add_waveform(
                Channel::drive(control.clone()),
                sign * iq.i,
            ));
            out.push(Instruction::set_time(control.clone(), end));
        }

        if p.amp2 > 0.0 && p.duration > 0.0 {
            let d = step(p.edge, p.edge_type).derivative();
            let rise = t + (p.edge + p.buffer) / 2.0;
            let mut quadrature = zero();
            if p.drag > 0.0 {
                let drag_pulse = (d.clone() >> rise) - (d.clone() >> (rise + p.duration));
                quadrature += p.drag * CORRECTION_SCALE * drag_pulse;
            }
            if p.skew > 0.0 {
                let skew_pulse = (d.clone() >> rise) + (d >> (rise + p.duration));
                quadrature += p.skew * CORRECTION_SCALE * skew_pulse;
            }
            let phase = p.global_phase + p.relative_phase - ctx.phase(target);
            let iq = mix(p.amp2 * pulse, quadrature, Mixing::new(p.frequency, phase));
            out.push(Instruction::add_waveform(
                Channel::drive(target.clone()),
                sign * iq.i,
            ));
            out.push(Instruction::set_time(target.clone(), end));
        }

        out.push(Instruction::set_phase(
            control.clone(),
            ctx.phase(control) + p.phi1,
        ));
        out.push(Instruction::set_phase(
            target.clone(),
            ctx.phase(target) + p.phi2,
        ));
        out
    }
}

/// Cross-resonance drive of `target` through `control`.
///
/// The echoed variant runs the pulse twice with opposite sign and refocuses
/// the control qubit with an `X` after each pass.
#[derive(Debug, Clone, Copy)]
pub struct CrossResonance {
    /// Whether to emit the echoed sequence.
    pub echo: bool,
}

impl CrossResonance {
    /// Coupling parameters shared by both variants.
    pub fn schema() -> ParamSchema {
        ParamSchema::new([
            ParamSpec::float("duration", 100e-9).unit("s").non_negative(),
            ParamSpec::float("frequency", 5e9).unit("Hz"),
            ParamSpec::str("edge_type", "cos").choices(&["cos", "linear"]),
            ParamSpec::float("edge", 20e-9).unit("s").non_negative(),
            ParamSpec::float("amp1", 0.8).unit("a.u."),
            ParamSpec::float("amp2", 0.0).unit("a.u."),
            ParamSpec::float("drag", 0.0),
            ParamSpec::float("skew", 0.0),
            ParamSpec::float("global_phase", 0.0).unit("rad"),
            ParamSpec::float("relative_phase", 0.0).unit("rad"),
            ParamSpec::float("phi1", 0.0).unit("rad"),
            ParamSpec::float("phi2", 0.0).unit("rad"),
            ParamSpec::float("buffer", 0.0).unit("s").non_negative(),
        ])
    }
}

impl GateProcedure for CrossResonance {
    fn signature(&self) -> GateSignature {
        GateSignature::qubits(2)
    }

    fn reads(&self) -> &[&'static str] {
        &[
            "duration",
            "frequency",
            "edge_type",
            "edge",
            "amp1",
            "amp2",
            "drag",
            "skew",
            "global_phase",
            "relative_phase",
            "phi1",
            "phi2",
            "buffer",
        ]
    }

    fn subcalls(&self) -> Vec<Subcall> {
        if self.echo {
            vec![Subcall::new(ECHO_GATE, [0])]
        } else {
            Vec::new()
        }
    }

    fn synthesize(&self, call: &GateCall, params: &Params) -> LowerResult<Synthesis> {
        let pulse = CrPulse::from_params(params)?;
        let (control, target) = (call.targets[0].clone(), call.targets[1].clone());

        let pass = |sign: f64| {
            let (control, target) = (control.clone(), target.clone());
            move |ctx: &GateContext| pulse.emit(ctx, &control, &target, sign)
        };

        if !self.echo {
            return Ok(Synthesis::new().then(pass(1.0)));
        }
        let refocus = || Instruction::expand(GateCall::new(ECHO_GATE, [control.clone()]));
        Ok(Synthesis::new()
            .then(pass(1.0))
            .emit(refocus())
            .then(pass(-1.0))
            .emit(refocus()))
    }
}
