//! Error types for the lowering crate.

use thiserror::Error;

use crate::gate::{Arity, GateKey};
use crate::param::ParamType;
use crate::qubit::QubitRef;

/// Errors that can occur while registering, resolving or lowering gates.
///
/// Registration errors (`DuplicateGate`, `GateCycle`, ...) only occur while
/// a registry is being built. Everything else is raised by
/// [`Lowerer::lower`](crate::Lowerer::lower) before the first instruction is
/// produced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LowerError {
    /// Requested (name, qualifier) is not in the registry.
    #[error("Unknown gate '{0}'")]
    UnknownGate(GateKey),

    /// A gate with the same (name, qualifier) is already registered.
    #[error("Gate '{0}' is already registered")]
    DuplicateGate(GateKey),

    /// Compound definitions reference each other in a cycle.
    #[error("Gate definitions form a cycle: {}", format_cycle(.cycle))]
    GateCycle {
        /// Gates taking part in the cycle.
        cycle: Vec<GateKey>,
    },

    /// A schema declares the same parameter twice.
    #[error("Gate '{gate}' declares parameter '{name}' more than once")]
    DuplicateParameter {
        /// Gate being registered.
        gate: GateKey,
        /// Repeated parameter name.
        name: String,
    },

    /// A procedure reads a parameter its schema does not declare.
    #[error("Gate '{gate}' reads parameter '{name}' which its schema does not declare")]
    UndeclaredParameter {
        /// Gate being registered.
        gate: GateKey,
        /// Missing parameter name.
        name: String,
    },

    /// An override names a parameter the schema does not declare.
    #[error("Unknown parameter '{name}' for gate '{gate}'")]
    UnknownParameter {
        /// Gate being resolved.
        gate: GateKey,
        /// Offending parameter name.
        name: String,
    },

    /// A value does not match the declared parameter type.
    #[error("Parameter '{name}' of gate '{gate}' expects {expected}, got {found}")]
    ParameterType {
        /// Gate being resolved.
        gate: GateKey,
        /// Parameter name.
        name: String,
        /// Declared type.
        expected: ParamType,
        /// Type of the supplied value.
        found: ParamType,
    },

    /// A value has the right type but is outside the admissible domain.
    #[error("Invalid value for parameter '{name}' of gate '{gate}': {reason}")]
    ParameterValue {
        /// Gate being resolved.
        gate: GateKey,
        /// Parameter name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Wrong number of qubit targets for the gate's arity.
    #[error("Gate '{gate}' takes {expected} qubit targets, got {got}")]
    InvalidTargetCount {
        /// Gate being invoked.
        gate: GateKey,
        /// Declared arity.
        expected: Arity,
        /// Number of targets supplied.
        got: usize,
    },

    /// The same qubit appears twice among a gate's targets.
    #[error("Duplicate target {qubit} for gate '{gate}'")]
    DuplicateTarget {
        /// Gate being invoked.
        gate: GateKey,
        /// Repeated qubit.
        qubit: QubitRef,
    },

    /// Wrong number of gate arguments.
    #[error("Gate '{gate}' takes {expected} arguments, got {got}")]
    InvalidArgumentCount {
        /// Gate being invoked.
        gate: GateKey,
        /// Human-readable expected count, e.g. `2` or `0..=1`.
        expected: String,
        /// Number of arguments supplied.
        got: usize,
    },

    /// An argument value is not acceptable.
    #[error("Invalid argument '{name}' for gate '{gate}': {reason}")]
    InvalidArgument {
        /// Gate being invoked.
        gate: GateKey,
        /// Argument name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A compound step uses a symbol that is not one of the parent's arguments.
    #[error("Symbol '{symbol}' in definition of '{gate}' does not name an argument")]
    UnboundSymbol {
        /// Gate being registered.
        gate: GateKey,
        /// Unbound symbol.
        symbol: String,
    },

    /// Expansion nested deeper than the configured limit.
    #[error("Expansion of '{gate}' exceeds maximum depth {max_depth}")]
    ExpansionDepth {
        /// Gate whose expansion was refused.
        gate: GateKey,
        /// Configured limit.
        max_depth: usize,
    },

    /// A procedure emitted an expansion it did not declare.
    #[error("Gate '{gate}' expanded '{subgate}' on [{}] without declaring it", format_targets(.targets))]
    UndeclaredExpansion {
        /// Gate whose synthesis emitted the expansion.
        gate: GateKey,
        /// Requested subgate.
        subgate: GateKey,
        /// Requested targets.
        targets: Vec<QubitRef>,
    },

    /// Reading a calibration file failed.
    #[error("Failed to read calibration: {0}")]
    Io(#[from] std::io::Error),

    /// A calibration document is malformed.
    #[error("Failed to parse calibration: {0}")]
    CalibrationParse(#[from] serde_yaml_ng::Error),

    /// Error from the pulse algebra.
    #[error("Waveform error: {0}")]
    Wave(#[from] qpulse_wave::WaveError),
}

fn format_cycle(cycle: &[GateKey]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(ToString::to_string).collect();
    if let Some(first) = parts.first().cloned() {
        parts.push(first);
    }
    parts.join(" -> ")
}

fn format_targets(targets: &[QubitRef]) -> String {
    targets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for lowering operations.
pub type LowerResult<T> = Result<T, LowerError>;
