//! Built-in gate library.
//!
//! | Gate | Targets | Args | Kind |
//! |------|---------|------|------|
//! | `rfUnitary`, `rfUnitary12`, `rfUnitary02` | 1 | `theta`, `phi` | drive rotation |
//! | `Measure` | 1 | `[cbit]` | readout |
//! | `CR`, `CR:echo` | 2 | | cross-resonance |
//! | `iSWAP`, `CZ` | 2 | | flux pulse |
//! | `P` | 1 | `theta` | virtual Z |
//! | `Delay` | 1 | `duration` | idle |
//! | `Barrier` | ≥ 1 | | align cursors |
//! | `X`, `Y`, `-X`, `-Y`, `X/2`, `Y/2`, `-X/2`, `-Y/2` | 1 | | compound |
//! | `Rz`, `U`, `u3`, `H`, `CX` | 1-2 | | compound |

mod compound;
mod coupling;
mod flux;
mod frame;
mod measure;
mod rotation;

pub use coupling::CrossResonance;
pub use flux::FluxPulse;
pub use frame::{Barrier, Delay, PhaseShift};
pub use measure::{Measure, SIGNALS};
pub use rotation::{RfUnitary, Transition};

use crate::error::LowerResult;
use crate::param::ParamSchema;
use crate::registry::GateRegistryBuilder;

/// A builder preloaded with every built-in gate.
///
/// Callers may register further gates before calling `build()`.
pub fn standard_builder() -> LowerResult<GateRegistryBuilder> {
    let mut b = GateRegistryBuilder::new();

    for transition in [Transition::Ge, Transition::Ef, Transition::Gf] {
        b.register_gate(
            transition.gate_name(),
            None,
            RfUnitary::schema(),
            RfUnitary { transition },
        )?;
    }
    b.register_gate("Measure", None, Measure::schema(), Measure)?
        .register_gate(
            "CR",
            None,
            CrossResonance::schema(),
            CrossResonance { echo: false },
        )?
        .register_gate(
            "CR",
            Some("echo"),
            CrossResonance::schema(),
            CrossResonance { echo: true },
        )?
        .register_gate("iSWAP", None, FluxPulse::schema(), FluxPulse)?
        .register_gate("CZ", None, FluxPulse::schema(), FluxPulse)?
        .register_gate("P", None, ParamSchema::default(), PhaseShift)?
        .register_gate("Delay", None, ParamSchema::default(), Delay)?
        .register_gate("Barrier", None, ParamSchema::default(), Barrier)?;

    compound::register(&mut b)?;
    Ok(b)
}
