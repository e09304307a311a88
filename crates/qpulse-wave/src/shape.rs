//! Envelope primitives and their closed-form derivatives.
//!
//! Every primitive is centered on `t = 0`. Placement in time is done by
//! shifting the enclosing [`Waveform`](crate::Waveform), never by the
//! primitive itself.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::WaveError;

/// Profile of a rising edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeShape {
    /// Raised-cosine edge, smooth at both ends.
    #[default]
    Cos,
    /// Linear ramp.
    Linear,
}

impl FromStr for EdgeShape {
    type Err = WaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cos" => Ok(EdgeShape::Cos),
            "linear" => Ok(EdgeShape::Linear),
            other => Err(WaveError::UnknownEdgeShape(other.to_string())),
        }
    }
}

impl fmt::Display for EdgeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeShape::Cos => write!(f, "cos"),
            EdgeShape::Linear => write!(f, "linear"),
        }
    }
}

/// Envelope family used for drive pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PulseShape {
    /// Raised cosine over the full width.
    #[default]
    CosPulse,
    /// Gaussian truncated to the width, `σ = width / 4`.
    Gaussian,
    /// Flat top with hard edges.
    Square,
}

impl PulseShape {
    /// Names accepted by [`FromStr`], in declaration order.
    pub const NAMES: &'static [&'static str] = &["CosPulse", "Gaussian", "square"];

    /// Build a unit-amplitude envelope of this shape centered on zero.
    pub fn envelope(self, width: f64) -> crate::Waveform {
        match self {
            PulseShape::CosPulse => crate::cos_pulse(width),
            PulseShape::Gaussian => crate::gaussian(width),
            PulseShape::Square => crate::square(width, 0.0, EdgeShape::Cos),
        }
    }
}

impl FromStr for PulseShape {
    type Err = WaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CosPulse" => Ok(PulseShape::CosPulse),
            "Gaussian" => Ok(PulseShape::Gaussian),
            "square" | "Square" => Ok(PulseShape::Square),
            other => Err(WaveError::UnknownPulseShape(other.to_string())),
        }
    }
}

/// A closed-form waveform primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    /// Rises from 0 to 1 across `[-edge/2, edge/2]`. A zero edge is a
    /// Heaviside step whose derivatives are taken as zero everywhere.
    Step {
        /// Rise time.
        edge: f64,
        /// Edge profile.
        shape: EdgeShape,
    },
    /// `(1 + cos(2πt / width)) / 2` on `[-width/2, width/2]`.
    CosPulse {
        /// Full width.
        width: f64,
    },
    /// `exp(-t² / 2σ²)` with `σ = width / 4`, truncated to `[-width/2, width/2]`.
    Gaussian {
        /// Full width.
        width: f64,
    },
    /// `cos(ωt + φ)`, unbounded.
    Carrier {
        /// Angular frequency in rad/s.
        omega: f64,
        /// Phase in radians.
        phase: f64,
    },
}

impl Primitive {
    /// Evaluate the `order`-th time derivative at `t`.
    pub fn value(&self, t: f64, order: u8) -> f64 {
        match *self {
            Primitive::Step { edge, shape } => step_value(edge, shape, t, order),
            Primitive::CosPulse { width } => {
                if width <= 0.0 || t.abs() > width / 2.0 {
                    return 0.0;
                }
                let k = 2.0 * PI / width;
                if order == 0 {
                    (1.0 + (k * t).cos()) / 2.0
                } else {
                    0.5 * k.powi(i32::from(order)) * (k * t + f64::from(order) * PI / 2.0).cos()
                }
            }
            Primitive::Gaussian { width } => {
                if width <= 0.0 || t.abs() > width / 2.0 {
                    return 0.0;
                }
                let sigma = width / 4.0;
                let x = t / sigma;
                let envelope = (-x * x / 2.0).exp();
                let sign = if order % 2 == 0 { 1.0 } else { -1.0 };
                sign * hermite(order, x) * envelope / sigma.powi(i32::from(order))
            }
            Primitive::Carrier { omega, phase } => {
                omega.powi(i32::from(order)) * (omega * t + phase + f64::from(order) * PI / 2.0).cos()
            }
        }
    }

    /// Bounds outside of which the `order`-th derivative is identically zero.
    ///
    /// `None` means the derivative vanishes everywhere.
    pub fn support(&self, order: u8) -> Option<(f64, f64)> {
        match *self {
            Primitive::Step { edge, shape } => {
                if order == 0 {
                    Some((-edge.max(0.0) / 2.0, f64::INFINITY))
                } else if edge <= 0.0 || (shape == EdgeShape::Linear && order > 1) {
                    None
                } else {
                    Some((-edge / 2.0, edge / 2.0))
                }
            }
            Primitive::CosPulse { width } | Primitive::Gaussian { width } => {
                (width > 0.0).then(|| (-width / 2.0, width / 2.0))
            }
            Primitive::Carrier { omega, .. } => {
                if order > 0 && omega == 0.0 {
                    None
                } else {
                    Some((f64::NEG_INFINITY, f64::INFINITY))
                }
            }
        }
    }
}

fn step_value(edge: f64, shape: EdgeShape, t: f64, order: u8) -> f64 {
    if edge <= 0.0 {
        return if order == 0 && t >= 0.0 { 1.0 } else { 0.0 };
    }
    let x = (t + edge / 2.0) / edge;
    if order == 0 {
        return if x <= 0.0 {
            0.0
        } else if x >= 1.0 {
            1.0
        } else {
            match shape {
                EdgeShape::Cos => (1.0 - (PI * x).cos()) / 2.0,
                EdgeShape::Linear => x,
            }
        };
    }
    if !(0.0..=1.0).contains(&x) {
        return 0.0;
    }
    match shape {
        EdgeShape::Cos => {
            let k = PI / edge;
            -0.5 * k.powi(i32::from(order)) * (PI * x + f64::from(order) * PI / 2.0).cos()
        }
        EdgeShape::Linear if order == 1 => 1.0 / edge,
        EdgeShape::Linear => 0.0,
    }
}

/// Probabilists' Hermite polynomial `He_n(x)`.
fn hermite(n: u8, x: f64) -> f64 {
    let (mut prev, mut cur) = (1.0, x);
    if n == 0 {
        return prev;
    }
    for k in 1..n {
        let next = x * cur - f64::from(k) * prev;
        prev = cur;
        cur = next;
    }
    cur
}
