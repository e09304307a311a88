//! Symbolic waveform expressions.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, AddAssign, Mul, Neg, Shr, Sub};

use crate::error::{WaveError, WaveResult};
use crate::shape::{EdgeShape, Primitive};

/// Largest number of samples [`Waveform::sample_range`] will produce.
pub const MAX_SAMPLES: usize = 1 << 26;

/// A real-valued function of time built from primitives.
///
/// Waveforms are immutable expression trees. The arithmetic operators build
/// new trees and fold the trivial cases (zero terms, unit scales, nested
/// shifts) as they go, so the trees stay shallow for typical pulse programs.
///
/// `w >> dt` delays `w` by `dt` seconds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Waveform {
    /// Identically zero.
    #[default]
    Zero,
    /// A constant value.
    Constant(f64),
    /// The `order`-th derivative of a primitive.
    Primitive {
        /// The primitive.
        kind: Primitive,
        /// Derivative order, 0 for the primitive itself.
        order: u8,
    },
    /// The inner waveform delayed by the given time.
    Shift(Box<Waveform>, f64),
    /// The inner waveform multiplied by a scalar.
    Scale(f64, Box<Waveform>),
    /// Pointwise sum.
    Sum(Vec<Waveform>),
    /// Pointwise product.
    Product(Box<Waveform>, Box<Waveform>),
}

/// The zero waveform.
pub fn zero() -> Waveform {
    Waveform::Zero
}

/// A constant waveform.
pub fn constant(value: f64) -> Waveform {
    if value == 0.0 {
        Waveform::Zero
    } else {
        Waveform::Constant(value)
    }
}

/// A unit step rising across `[-edge/2, edge/2]`.
pub fn step(edge: f64, shape: EdgeShape) -> Waveform {
    Waveform::primitive(Primitive::Step { edge, shape })
}

/// A flat-top pulse of the given width centered on zero.
///
/// The rising and falling edges are centered on `∓width/2`, so the total
/// extent is `width + edge`.
pub fn square(width: f64, edge: f64, shape: EdgeShape) -> Waveform {
    let s = step(edge, shape);
    (s.clone() >> (-width / 2.0)) - (s >> (width / 2.0))
}

/// A raised-cosine pulse of the given width centered on zero.
pub fn cos_pulse(width: f64) -> Waveform {
    Waveform::primitive(Primitive::CosPulse { width })
}

/// A truncated Gaussian of the given width centered on zero.
pub fn gaussian(width: f64) -> Waveform {
    Waveform::primitive(Primitive::Gaussian { width })
}

/// `cos(2π·frequency·t + phase)`.
///
/// A zero frequency collapses to the constant `cos(phase)`.
pub fn carrier(frequency: f64, phase: f64) -> Waveform {
    if frequency == 0.0 {
        return constant(phase.cos());
    }
    Waveform::primitive(Primitive::Carrier {
        omega: 2.0 * PI * frequency,
        phase,
    })
}

impl Waveform {
    fn primitive(kind: Primitive) -> Self {
        Waveform::Primitive { kind, order: 0 }
    }

    /// Whether this waveform is the literal zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, Waveform::Zero)
    }

    /// Multiply by a scalar.
    #[must_use]
    pub fn scale(self, k: f64) -> Self {
        if k == 0.0 {
            return Waveform::Zero;
        }
        if k == 1.0 {
            return self;
        }
        match self {
            Waveform::Zero => Waveform::Zero,
            Waveform::Constant(c) => constant(c * k),
            Waveform::Scale(k2, inner) => Waveform::Scale(k * k2, inner).normalized(),
            other => Waveform::Scale(k, Box::new(other)),
        }
    }

    /// Delay by `dt` seconds.
    #[must_use]
    pub fn shift(self, dt: f64) -> Self {
        if dt == 0.0 {
            return self;
        }
        match self {
            Waveform::Zero => Waveform::Zero,
            Waveform::Constant(c) => Waveform::Constant(c),
            Waveform::Shift(inner, t0) => Waveform::Shift(inner, t0 + dt).normalized(),
            other => Waveform::Shift(Box::new(other), dt),
        }
    }

    fn normalized(self) -> Self {
        match self {
            Waveform::Scale(k, inner) if k == 1.0 => *inner,
            Waveform::Shift(inner, dt) if dt == 0.0 => *inner,
            other => other,
        }
    }

    /// Symbolic time derivative.
    #[must_use]
    pub fn derivative(&self) -> Self {
        match self {
            Waveform::Zero | Waveform::Constant(_) => Waveform::Zero,
            Waveform::Primitive { kind, order } => {
                if kind.support(order.saturating_add(1)).is_none() {
                    Waveform::Zero
                } else {
                    Waveform::Primitive {
                        kind: *kind,
                        order: order.saturating_add(1),
                    }
                }
            }
            Waveform::Shift(inner, dt) => inner.derivative().shift(*dt),
            Waveform::Scale(k, inner) => inner.derivative().scale(*k),
            Waveform::Sum(terms) => terms
                .iter()
                .map(Waveform::derivative)
                .fold(Waveform::Zero, |acc, d| acc + d),
            Waveform::Product(a, b) => {
                a.derivative() * (**b).clone() + (**a).clone() * b.derivative()
            }
        }
    }

    /// Evaluate at time `t`.
    pub fn sample(&self, t: f64) -> f64 {
        match self {
            Waveform::Zero => 0.0,
            Waveform::Constant(c) => *c,
            Waveform::Primitive { kind, order } => kind.value(t, *order),
            Waveform::Shift(inner, dt) => inner.sample(t - dt),
            Waveform::Scale(k, inner) => k * inner.sample(t),
            Waveform::Sum(terms) => terms.iter().map(|w| w.sample(t)).sum(),
            Waveform::Product(a, b) => {
                let av = a.sample(t);
                if av == 0.0 { 0.0 } else { av * b.sample(t) }
            }
        }
    }

    /// Conservative bounds outside of which the waveform is zero.
    ///
    /// `None` means the waveform is zero everywhere. Bounds may be infinite:
    /// a step, a constant or a carrier never returns to zero on its own, and
    /// cancellation between terms of a sum is not detected.
    pub fn support(&self) -> Option<(f64, f64)> {
        match self {
            Waveform::Zero => None,
            Waveform::Constant(_) => Some((f64::NEG_INFINITY, f64::INFINITY)),
            Waveform::Primitive { kind, order } => kind.support(*order),
            Waveform::Shift(inner, dt) => inner.support().map(|(a, b)| (a + dt, b + dt)),
            Waveform::Scale(_, inner) => inner.support(),
            Waveform::Sum(terms) => terms
                .iter()
                .filter_map(Waveform::support)
                .reduce(|(a0, b0), (a1, b1)| (a0.min(a1), b0.max(b1))),
            Waveform::Product(a, b) => {
                let (a0, a1) = a.support()?;
                let (b0, b1) = b.support()?;
                let (lo, hi) = (a0.max(b0), a1.min(b1));
                (lo <= hi).then_some((lo, hi))
            }
        }
    }

    /// Sample on a uniform grid over `[start, stop)` at `rate` samples per second.
    pub fn sample_range(&self, start: f64, stop: f64, rate: f64) -> WaveResult<Vec<f64>> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(WaveError::InvalidSampleRate(rate));
        }
        if !start.is_finite() || !stop.is_finite() || stop < start {
            return Err(WaveError::InvalidWindow { start, stop });
        }
        let requested = ((stop - start) * rate).round();
        #[allow(clippy::cast_precision_loss)]
        let limit = MAX_SAMPLES as f64;
        if requested > limit {
            return Err(WaveError::TooManySamples {
                requested,
                limit: MAX_SAMPLES,
            });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = requested as usize;
        #[allow(clippy::cast_precision_loss)]
        let samples = (0..n)
            .map(|i| self.sample(start + i as f64 / rate))
            .collect();
        Ok(samples)
    }
}

impl From<f64> for Waveform {
    fn from(value: f64) -> Self {
        constant(value)
    }
}

impl Add for Waveform {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Waveform::Zero, w) | (w, Waveform::Zero) => w,
            (Waveform::Constant(a), Waveform::Constant(b)) => constant(a + b),
            (Waveform::Sum(mut a), Waveform::Sum(b)) => {
                a.extend(b);
                Waveform::Sum(a)
            }
            (Waveform::Sum(mut a), w) => {
                a.push(w);
                Waveform::Sum(a)
            }
            (w, Waveform::Sum(mut b)) => {
                b.insert(0, w);
                Waveform::Sum(b)
            }
            (a, b) => Waveform::Sum(vec![a, b]),
        }
    }
}

impl AddAssign for Waveform {
    fn add_assign(&mut self, rhs: Self) {
        let lhs = std::mem::take(self);
        *self = lhs + rhs;
    }
}

impl Sub for Waveform {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl Neg for Waveform {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.scale(-1.0)
    }
}

impl Mul<f64> for Waveform {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

impl Mul<Waveform> for f64 {
    type Output = Waveform;

    fn mul(self, rhs: Waveform) -> Self::Output {
        rhs.scale(self)
    }
}

impl Mul for Waveform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Waveform::Zero, _) | (_, Waveform::Zero) => Waveform::Zero,
            (Waveform::Constant(c), w) | (w, Waveform::Constant(c)) => w.scale(c),
            (a, b) => Waveform::Product(Box::new(a), Box::new(b)),
        }
    }
}

impl Shr<f64> for Waveform {
    type Output = Self;

    fn shr(self, rhs: f64) -> Self::Output {
        self.shift(rhs)
    }
}
