//! Gates defined as sequences of other gates.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::error::LowerResult;
use crate::expr::ArgExpr;
use crate::gate::{GateSignature, Subcall};
use crate::registry::GateRegistryBuilder;

/// Fixed-angle rotations: name, angle and axis phase.
const FIXED_ROTATIONS: &[(&str, f64, f64)] = &[
    ("X", 1.0, 0.0),
    ("Y", 1.0, 0.5),
    ("-X", 1.0, 1.0),
    ("-Y", 1.0, -0.5),
    ("X/2", 0.5, 0.0),
    ("Y/2", 0.5, 0.5),
    ("-X/2", 0.5, 1.0),
    ("-Y/2", 0.5, -0.5),
];

fn sym(name: &str) -> ArgExpr {
    ArgExpr::symbol(name)
}

fn half_pi() -> ArgExpr {
    ArgExpr::constant(FRAC_PI_2)
}

fn rf(theta: ArgExpr, phi: ArgExpr) -> Subcall {
    Subcall::new("rfUnitary", [0]).with_args([theta, phi])
}

/// Register the built-in compound gates.
pub(crate) fn register(builder: &mut GateRegistryBuilder) -> LowerResult<()> {
    for &(name, turns, axis) in FIXED_ROTATIONS {
        let step = rf(ArgExpr::constant(turns * PI), ArgExpr::constant(axis * PI));
        builder.register_compound(name, None, GateSignature::qubits(1), vec![step])?;
    }

    builder.register_compound(
        "Rz",
        None,
        GateSignature::qubits(1).arg("theta"),
        vec![Subcall::new("P", [0]).with_args([sym("theta")])],
    )?;

    let u_signature = GateSignature::qubits(1).arg("theta").arg("phi").arg("lambda");
    builder.register_compound(
        "U",
        None,
        u_signature.clone(),
        vec![
            rf(half_pi(), -sym("lambda")),
            rf(half_pi(), ArgExpr::pi() - sym("theta") - sym("lambda")),
            Subcall::new("P", [0]).with_args([sym("theta") + sym("phi") + sym("lambda")]),
        ],
    )?;
    builder.register_compound(
        "u3",
        None,
        u_signature,
        vec![Subcall::new("U", [0]).with_args([sym("theta"), sym("phi"), sym("lambda")])],
    )?;
    builder.register_compound(
        "H",
        None,
        GateSignature::qubits(1),
        vec![Subcall::new("U", [0]).with_args([
            half_pi(),
            ArgExpr::constant(0.0),
            ArgExpr::pi(),
        ])],
    )?;
    builder.register_compound(
        "CX",
        None,
        GateSignature::qubits(2),
        vec![
            Subcall::new("H", [1]),
            Subcall::new("CZ", [0, 1]),
            Subcall::new("H", [1]),
        ],
    )?;
    Ok(())
}
