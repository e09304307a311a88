//! IQ modulation onto a carrier.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::waveform::{Waveform, carrier};

/// In-phase and quadrature components of a modulated pulse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IqPair {
    /// In-phase component, the signal played on a single RF output.
    pub i: Waveform,
    /// Quadrature component.
    pub q: Waveform,
}

impl IqPair {
    /// Create a pair from its components.
    pub fn new(i: Waveform, q: Waveform) -> Self {
        Self { i, q }
    }

    /// Evaluate both components at `t` as `I + iQ`.
    pub fn sample(&self, t: f64) -> Complex64 {
        Complex64::new(self.i.sample(t), self.q.sample(t))
    }

    /// Delay both components by `dt`.
    #[must_use]
    pub fn shift(self, dt: f64) -> Self {
        Self {
            i: self.i >> dt,
            q: self.q >> dt,
        }
    }

    /// Scale both components by `k`.
    #[must_use]
    pub fn scale(self, k: f64) -> Self {
        Self {
            i: self.i * k,
            q: self.q * k,
        }
    }
}

/// Options for [`mix`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Mixing {
    /// Carrier phase in radians.
    pub phase: f64,
    /// Carrier frequency in Hz.
    pub freq: f64,
    /// DRAG scaling applied to the baseband before modulation.
    pub drag: Option<f64>,
}

impl Mixing {
    /// Modulate at `freq` with the given `phase` and no DRAG.
    pub fn new(freq: f64, phase: f64) -> Self {
        Self {
            phase,
            freq,
            drag: None,
        }
    }

    /// Set the DRAG scaling.
    #[must_use]
    pub fn with_drag(mut self, drag: f64) -> Self {
        self.drag = Some(drag);
        self
    }
}

/// Rotate a baseband `(I, Q)` onto `cos(2π·frequency·t + phase)`.
///
/// Returns `I·cos(θ) − Q·sin(θ)` and `I·sin(θ) + Q·cos(θ)` with
/// `θ = 2π·frequency·t + phase`.
pub fn modulate(i: Waveform, q: Waveform, phase: f64, frequency: f64) -> IqPair {
    let cos = carrier(frequency, phase);
    let sin = carrier(frequency, phase - PI / 2.0);
    IqPair {
        i: i.clone() * cos.clone() - q.clone() * sin.clone(),
        q: i * sin + q * cos,
    }
}

/// Apply DRAG correction to a baseband pair, then [`modulate`] it.
///
/// DRAG adds the scaled derivative of each quadrature to the other:
/// `I' = I + s·dQ/dt`, `Q' = Q − s·dI/dt`.
pub fn mix(i: Waveform, q: Waveform, options: Mixing) -> IqPair {
    let (i, q) = match options.drag {
        Some(s) if s != 0.0 => {
            let di = i.derivative();
            let dq = q.derivative();
            (i + dq * s, q - di * s)
        }
        _ => (i, q),
    };
    modulate(i, q, options.phase, options.freq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::{constant, cos_pulse, zero};

    #[test]
    fn test_modulate_unit_envelope() {
        let f = 5e6;
        let phase = 0.3;
        let iq = modulate(constant(1.0), zero(), phase, f);
        let t = 7.7e-8;
        let theta = 2.0 * PI * f * t + phase;
        let z = iq.sample(t);
        assert!((z.re - theta.cos()).abs() < 1e-9);
        assert!((z.im - theta.sin()).abs() < 1e-9);
    }

    #[test]
    fn test_modulate_zero_frequency_rotates() {
        let iq = modulate(constant(1.0), zero(), PI / 2.0, 0.0);
        let z = iq.sample(0.0);
        assert!(z.re.abs() < 1e-12);
        assert!((z.im - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_drag_adds_derivative_quadrature() {
        let env = cos_pulse(20e-9);
        let s = 1e-9;
        let iq = mix(env.clone(), zero(), Mixing::new(0.0, 0.0).with_drag(s));
        let t = 3e-9;
        assert!((iq.i.sample(t) - env.sample(t)).abs() < 1e-12);
        assert!((iq.q.sample(t) + s * env.derivative().sample(t)).abs() < 1e-9);
    }

    #[test]
    fn test_no_drag_when_zero() {
        let env = cos_pulse(20e-9);
        let a = mix(env.clone(), zero(), Mixing::new(1e8, 0.1).with_drag(0.0));
        let b = mix(env, zero(), Mixing::new(1e8, 0.1));
        assert_eq!(a, b);
    }
}
