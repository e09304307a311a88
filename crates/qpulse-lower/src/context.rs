//! Per-qubit state: the global ledger and the call-scoped gate context.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

use crate::instruction::{Instruction, MeasurementTask, StateUpdate};
use crate::qubit::{Channel, QubitRef};

/// Authoritative per-qubit state owned by an instruction consumer.
///
/// Unset cursors and phases read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QubitLedger {
    time: FxHashMap<QubitRef, f64>,
    phase: FxHashMap<QubitRef, f64>,
    bias: FxHashMap<Channel, f64>,
    measures: BTreeMap<u32, MeasurementTask>,
}

impl QubitLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time cursor of `qubit`.
    pub fn time(&self, qubit: &QubitRef) -> f64 {
        self.time.get(qubit).copied().unwrap_or(0.0)
    }

    /// Phase accumulator of `qubit`.
    pub fn phase(&self, qubit: &QubitRef) -> f64 {
        self.phase.get(qubit).copied().unwrap_or(0.0)
    }

    /// Bias level of `channel`, if one was set.
    pub fn bias(&self, channel: &Channel) -> Option<f64> {
        self.bias.get(channel).copied()
    }

    /// Set a time cursor directly.
    pub fn set_time(&mut self, qubit: QubitRef, value: f64) {
        self.time.insert(qubit, value);
    }

    /// Set a phase accumulator directly.
    pub fn set_phase(&mut self, qubit: QubitRef, value: f64) {
        self.phase.insert(qubit, value);
    }

    /// Latest time cursor among `qubits`.
    pub fn max_time<'a>(&self, qubits: impl IntoIterator<Item = &'a QubitRef>) -> f64 {
        qubits
            .into_iter()
            .map(|q| self.time(q))
            .fold(0.0, f64::max)
    }

    /// Latest time cursor of any qubit.
    pub fn end_time(&self) -> f64 {
        self.time.values().copied().fold(0.0, f64::max)
    }

    /// Qubits with a time cursor, sorted by name.
    pub fn qubits(&self) -> Vec<&QubitRef> {
        let mut qubits: Vec<_> = self.time.keys().chain(self.phase.keys()).collect();
        qubits.sort();
        qubits.dedup();
        qubits
    }

    /// Recorded measurements by classical bit.
    pub fn measures(&self) -> &BTreeMap<u32, MeasurementTask> {
        &self.measures
    }

    /// Channel biases, unordered.
    pub fn biases(&self) -> impl Iterator<Item = (&Channel, f64)> {
        self.bias.iter().map(|(c, v)| (c, *v))
    }

    /// Next free classical bit: one past the largest used, or 0.
    ///
    /// Gaps left by explicit indices are never back-filled.
    pub fn next_cbit(&self) -> u32 {
        self.measures
            .last_key_value()
            .map_or(0, |(k, _)| k.saturating_add(1))
    }

    /// Fold one instruction into the ledger.
    ///
    /// Waveforms and expansion markers carry no ledger state and are ignored.
    pub fn apply(&mut self, instruction: &Instruction) {
        let Instruction::SetState(update) = instruction else {
            return;
        };
        match update {
            StateUpdate::Time { qubit, value } => {
                self.time.insert(qubit.clone(), *value);
            }
            StateUpdate::Phase { qubit, value } => {
                self.phase.insert(qubit.clone(), *value);
            }
            StateUpdate::Bias { channel, value } => {
                self.bias.insert(channel.clone(), *value);
            }
            StateUpdate::Cbit(task) => {
                self.measures.insert(task.cbit, task.clone());
            }
        }
    }
}

/// State visible to gate synthesis during one top-level lowering.
///
/// Seeded from a ledger snapshot and updated as each instruction is
/// produced, so later synthesis stages observe the effects of earlier ones.
/// Resolved parameters are handed to procedures separately since they are
/// fixed per gate invocation.
#[derive(Debug, Clone, Default)]
pub struct GateContext {
    state: QubitLedger,
}

impl GateContext {
    /// A context seeded from `ledger`.
    pub fn seed(ledger: &QubitLedger) -> Self {
        Self {
            state: ledger.clone(),
        }
    }

    /// Time cursor of `qubit`.
    #[inline]
    pub fn time(&self, qubit: &QubitRef) -> f64 {
        self.state.time(qubit)
    }

    /// Phase accumulator of `qubit`.
    #[inline]
    pub fn phase(&self, qubit: &QubitRef) -> f64 {
        self.state.phase(qubit)
    }

    /// Latest time cursor among `qubits`.
    pub fn max_time<'a>(&self, qubits: impl IntoIterator<Item = &'a QubitRef>) -> f64 {
        self.state.max_time(qubits)
    }

    /// Next free classical bit.
    pub fn next_cbit(&self) -> u32 {
        self.state.next_cbit()
    }

    /// Recorded measurements.
    pub fn measures(&self) -> &BTreeMap<u32, MeasurementTask> {
        self.state.measures()
    }

    /// The current state.
    pub fn ledger(&self) -> &QubitLedger {
        &self.state
    }

    /// Fold one instruction into the context.
    pub fn apply(&mut self, instruction: &Instruction) {
        self.state.apply(instruction);
    }

    /// Consume the context, yielding the updated state.
    pub fn into_ledger(self) -> QubitLedger {
        self.state
    }
}
