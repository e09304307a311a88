//! qpulse Pulse Algebra
//!
//! Symbolic, real-valued waveforms for building control pulses. A
//! [`Waveform`] is an expression tree over a handful of closed-form
//! primitives; pulses are composed with ordinary operators and evaluated
//! only when a consumer samples them.
//!
//! | Operation | Spelling |
//! |-----------|----------|
//! | add | `a + b`, `a - b` |
//! | scale | `k * a`, `a * k` |
//! | shift in time | `a >> dt` |
//! | product | `a * b` |
//! | derivative | `a.derivative()` |
//! | IQ modulation | [`modulate`], [`mix`] |
//! | evaluate | `a.sample(t)`, `a.sample_range(start, stop, rate)` |
//!
//! # Example: a flat-top pulse on a carrier
//!
//! ```rust
//! use qpulse_wave::{EdgeShape, Mixing, mix, square, zero};
//!
//! let envelope = 0.5 * square(100e-9, 20e-9, EdgeShape::Cos) >> 60e-9;
//! let iq = mix(envelope, zero(), Mixing::new(5e9, 0.0));
//!
//! assert_eq!(iq.i.sample(0.0), 0.0);
//! assert!(iq.i.sample(60e-9).abs() <= 0.5);
//! ```

pub mod error;
pub mod mixing;
pub mod shape;
pub mod waveform;

pub use error::{WaveError, WaveResult};
pub use mixing::{IqPair, Mixing, mix, modulate};
pub use shape::{EdgeShape, Primitive, PulseShape};
pub use waveform::{MAX_SAMPLES, Waveform, carrier, constant, cos_pulse, gaussian, square, step, zero};
