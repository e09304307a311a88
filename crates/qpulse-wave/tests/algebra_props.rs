//! Property-based tests for the pulse algebra.
//!
//! Symbolic construction must agree pointwise with the arithmetic it stands
//! for, whatever simplifications the operators apply along the way.

use proptest::prelude::*;
use qpulse_wave::{EdgeShape, Waveform, cos_pulse, gaussian, square, step};

/// A small random pulse made of the building blocks gate synthesis uses.
fn arb_pulse() -> impl Strategy<Value = Waveform> {
    let width = 5e-9..200e-9_f64;
    let offset = -100e-9..100e-9_f64;
    let amp = -2.0..2.0_f64;
    prop_oneof![
        (width.clone(), offset.clone(), amp.clone())
            .prop_map(|(w, dt, a)| a * cos_pulse(w) >> dt),
        (width.clone(), offset.clone(), amp.clone())
            .prop_map(|(w, dt, a)| a * gaussian(w) >> dt),
        (width, 1e-9..30e-9_f64, offset, amp)
            .prop_map(|(w, e, dt, a)| a * square(w, e, EdgeShape::Cos) >> dt),
    ]
}

proptest! {
    #[test]
    fn sum_is_pointwise(a in arb_pulse(), b in arb_pulse(), t in -300e-9..300e-9_f64) {
        let expected = a.sample(t) + b.sample(t);
        let got = (a + b).sample(t);
        prop_assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn scale_is_pointwise(a in arb_pulse(), k in -5.0..5.0_f64, t in -300e-9..300e-9_f64) {
        let expected = k * a.sample(t);
        let got = (a * k).sample(t);
        prop_assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn shift_delays(a in arb_pulse(), dt in -50e-9..50e-9_f64, t in -300e-9..300e-9_f64) {
        let expected = a.sample(t - dt);
        let got = (a >> dt).sample(t);
        prop_assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_outside_bounded_support(w in 5e-9..200e-9_f64, dt in -50e-9..50e-9_f64) {
        let pulse = cos_pulse(w) >> dt;
        let (lo, hi) = pulse.support().unwrap();
        prop_assert_eq!(pulse.sample(lo - 1e-9), 0.0);
        prop_assert_eq!(pulse.sample(hi + 1e-9), 0.0);
    }
}

#[test]
fn serde_roundtrip_preserves_samples() {
    let pulse = 0.3 * step(10e-9, EdgeShape::Linear) >> 40e-9;
    let json = serde_json::to_string(&pulse).unwrap();
    let back: Waveform = serde_json::from_str(&json).unwrap();
    for t in [0.0, 37e-9, 40e-9, 44e-9, 100e-9] {
        assert_eq!(back.sample(t), pulse.sample(t));
    }
}
