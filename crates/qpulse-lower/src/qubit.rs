//! Qubit references and control channels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a qubit or coupling element, compared by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QubitRef(String);

impl QubitRef {
    /// Create a reference from a name.
    pub fn new(name: impl Into<String>) -> Self {
        QubitRef(name.into())
    }

    /// The qubit's name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QubitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QubitRef {
    fn from(name: &str) -> Self {
        QubitRef(name.to_string())
    }
}

impl From<String> for QubitRef {
    fn from(name: String) -> Self {
        QubitRef(name)
    }
}

/// Kind of physical control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Port {
    /// Microwave drive line.
    Drive,
    /// Qubit flux bias line.
    Flux,
    /// Readout resonator drive.
    Readout,
    /// Flux line of the coupler between two qubits.
    CouplerFlux,
}

impl Port {
    /// Hardware-facing line name.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Port::Drive => "RF",
            Port::Flux => "Z",
            Port::Readout => "readoutLine.RF",
            Port::CouplerFlux => "coupler.Z",
        }
    }
}

/// A control line addressed by port and the qubit(s) it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Channel {
    /// The line kind.
    pub port: Port,
    /// Owning qubits; two for a coupler line, in call order.
    pub qubits: Vec<QubitRef>,
}

impl Channel {
    /// Drive line of a qubit.
    pub fn drive(qubit: QubitRef) -> Self {
        Self {
            port: Port::Drive,
            qubits: vec![qubit],
        }
    }

    /// Flux line of a qubit.
    pub fn flux(qubit: QubitRef) -> Self {
        Self {
            port: Port::Flux,
            qubits: vec![qubit],
        }
    }

    /// Readout line of a qubit.
    pub fn readout(qubit: QubitRef) -> Self {
        Self {
            port: Port::Readout,
            qubits: vec![qubit],
        }
    }

    /// Coupler flux line shared by two qubits.
    pub fn coupler_flux(a: QubitRef, b: QubitRef) -> Self {
        Self {
            port: Port::CouplerFlux,
            qubits: vec![a, b],
        }
    }

    /// Whether this line belongs to `qubit`.
    pub fn involves(&self, qubit: &QubitRef) -> bool {
        self.qubits.contains(qubit)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.port.name())?;
        for (i, q) in self.qubits.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{q}")?;
        }
        f.write_str(")")
    }
}
