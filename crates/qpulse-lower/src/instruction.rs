//! The instruction vocabulary handed to consumers.

use qpulse_wave::Waveform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::gate::GateCall;
use crate::param::ParamValue;
use crate::qubit::{Channel, QubitRef};

/// A readout result slot as recorded by a `cbit` state set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementTask {
    /// Measured qubit.
    pub qubit: QubitRef,
    /// Classical bit index.
    pub cbit: u32,
    /// Start time of the readout pulse.
    pub time: f64,
    /// Requested signal kind (`state`, `iq`, ...).
    pub signal: String,
    /// Integration weight expression over the readout window.
    pub weight: String,
    /// Resolved measurement parameters, for downstream demodulation.
    pub params: BTreeMap<String, ParamValue>,
}

/// A state attribute assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateUpdate {
    /// Set a qubit's time cursor.
    Time {
        /// Target qubit.
        qubit: QubitRef,
        /// New cursor value in seconds.
        value: f64,
    },
    /// Set a qubit's phase accumulator.
    Phase {
        /// Target qubit.
        qubit: QubitRef,
        /// New phase in radians.
        value: f64,
    },
    /// Set a static bias level on a channel.
    Bias {
        /// Target channel.
        channel: Channel,
        /// Bias level.
        value: f64,
    },
    /// Record a measurement result slot.
    Cbit(MeasurementTask),
}

impl StateUpdate {
    /// Attribute name.
    pub fn attribute(&self) -> &'static str {
        match self {
            StateUpdate::Time { .. } => "time",
            StateUpdate::Phase { .. } => "phase",
            StateUpdate::Bias { .. } => "bias",
            StateUpdate::Cbit(_) => "cbit",
        }
    }
}

/// One unit of lowered output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    /// Add a pulse to a channel's accumulator.
    AddWaveform {
        /// Target channel.
        channel: Channel,
        /// Pulse in absolute time.
        waveform: Waveform,
    },
    /// Assign a state attribute.
    SetState(StateUpdate),
    /// Invoke another gate in place.
    Expand(GateCall),
}

impl Instruction {
    /// Add `waveform` to `channel`.
    pub fn add_waveform(channel: Channel, waveform: Waveform) -> Self {
        Instruction::AddWaveform { channel, waveform }
    }

    /// Set the time cursor of `qubit`.
    pub fn set_time(qubit: QubitRef, value: f64) -> Self {
        Instruction::SetState(StateUpdate::Time { qubit, value })
    }

    /// Set the phase accumulator of `qubit`.
    pub fn set_phase(qubit: QubitRef, value: f64) -> Self {
        Instruction::SetState(StateUpdate::Phase { qubit, value })
    }

    /// Set the bias of `channel`.
    pub fn set_bias(channel: Channel, value: f64) -> Self {
        Instruction::SetState(StateUpdate::Bias { channel, value })
    }

    /// Record a measurement slot.
    pub fn set_cbit(task: MeasurementTask) -> Self {
        Instruction::SetState(StateUpdate::Cbit(task))
    }

    /// Expand into another gate.
    pub fn expand(call: GateCall) -> Self {
        Instruction::Expand(call)
    }

    /// Whether this is an expansion marker.
    pub fn is_expand(&self) -> bool {
        matches!(self, Instruction::Expand(_))
    }

    /// Whether this instruction concerns `qubit`.
    pub fn touches(&self, qubit: &QubitRef) -> bool {
        match self {
            Instruction::AddWaveform { channel, .. } => channel.involves(qubit),
            Instruction::SetState(update) => match update {
                StateUpdate::Time { qubit: q, .. } | StateUpdate::Phase { qubit: q, .. } => {
                    q == qubit
                }
                StateUpdate::Bias { channel, .. } => channel.involves(qubit),
                StateUpdate::Cbit(task) => &task.qubit == qubit,
            },
            Instruction::Expand(call) => call.targets.contains(qubit),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::AddWaveform { channel, waveform } => match waveform.support() {
                Some((lo, hi)) if lo.is_finite() && hi.is_finite() => {
                    write!(f, "add {channel} [{lo:.3e}, {hi:.3e}]")
                }
                _ => write!(f, "add {channel}"),
            },
            Instruction::SetState(update) => match update {
                StateUpdate::Time { qubit, value } => write!(f, "set {qubit}.time = {value:.3e}"),
                StateUpdate::Phase { qubit, value } => write!(f, "set {qubit}.phase = {value:.6}"),
                StateUpdate::Bias { channel, value } => write!(f, "set {channel}.bias = {value}"),
                StateUpdate::Cbit(task) => {
                    write!(f, "set cbit[{}] = measure {} ({})", task.cbit, task.qubit, task.signal)
                }
            },
            Instruction::Expand(call) => write!(f, "expand {call}"),
        }
    }
}
