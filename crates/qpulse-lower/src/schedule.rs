//! Reference instruction consumer.

use qpulse_wave::Waveform;
use std::collections::BTreeMap;
use tracing::info;

use crate::context::QubitLedger;
use crate::error::LowerResult;
use crate::gate::GateCall;
use crate::instruction::Instruction;
use crate::lower::Lowerer;
use crate::qubit::Channel;

/// Accumulated waveform per channel.
#[derive(Debug, Clone, Default)]
pub struct ChannelBuffers {
    channels: BTreeMap<Channel, Waveform>,
}

/// Sampled channel data.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChannel {
    /// Time of the first sample.
    pub start: f64,
    /// Samples at the render rate.
    pub samples: Vec<f64>,
}

impl ChannelBuffers {
    /// Empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pulse to a channel.
    pub fn add(&mut self, channel: Channel, waveform: Waveform) {
        *self.channels.entry(channel).or_default() += waveform;
    }

    /// Accumulated waveform of a channel.
    pub fn get(&self, channel: &Channel) -> Option<&Waveform> {
        self.channels.get(channel)
    }

    /// Channels in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&Channel, &Waveform)> {
        self.channels.iter()
    }

    /// Number of channels with output.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channel has output.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Sample every channel over its support at `sample_rate`.
    ///
    /// Channels with unbounded support are clipped to `[0, end]`.
    pub fn render(&self, sample_rate: f64, end: f64) -> LowerResult<BTreeMap<Channel, RenderedChannel>> {
        let mut out = BTreeMap::new();
        for (channel, waveform) in &self.channels {
            let Some((lo, hi)) = waveform.support() else {
                continue;
            };
            let start = if lo.is_finite() { lo } else { 0.0 };
            let stop = if hi.is_finite() { hi } else { end.max(start) };
            let samples = waveform.sample_range(start, stop, sample_rate)?;
            out.insert(channel.clone(), RenderedChannel { start, samples });
        }
        Ok(out)
    }
}

/// Folds lowered instructions into a ledger and channel buffers.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    ledger: QubitLedger,
    buffers: ChannelBuffers,
    log: Vec<Instruction>,
}

impl Schedule {
    /// An empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// A schedule starting from existing qubit state.
    pub fn with_ledger(ledger: QubitLedger) -> Self {
        Self {
            ledger,
            ..Self::default()
        }
    }

    /// Apply one instruction.
    pub fn apply(&mut self, instruction: Instruction) {
        match &instruction {
            Instruction::AddWaveform { channel, waveform } => {
                self.buffers.add(channel.clone(), waveform.clone());
            }
            Instruction::SetState(_) => self.ledger.apply(&instruction),
            Instruction::Expand(_) => {}
        }
        self.log.push(instruction);
    }

    /// Lower one call and apply its instructions in order.
    ///
    /// Nothing is applied if lowering fails. Returns the instruction count.
    pub fn run(&mut self, lowerer: &Lowerer<'_>, call: &GateCall) -> LowerResult<usize> {
        let instructions: Vec<Instruction> =
            lowerer.lower(call, &self.ledger)?.collect::<LowerResult<_>>()?;
        let count = instructions.len();
        for instruction in instructions {
            self.apply(instruction);
        }
        info!("Lowered {} into {} instructions", call, count);
        Ok(count)
    }

    /// Run several calls in order, stopping at the first error.
    pub fn run_all<'c>(
        &mut self,
        lowerer: &Lowerer<'_>,
        calls: impl IntoIterator<Item = &'c GateCall>,
    ) -> LowerResult<usize> {
        let mut total = 0;
        for call in calls {
            total += self.run(lowerer, call)?;
        }
        Ok(total)
    }

    /// Current qubit state.
    pub fn ledger(&self) -> &QubitLedger {
        &self.ledger
    }

    /// Channel output so far.
    pub fn buffers(&self) -> &ChannelBuffers {
        &self.buffers
    }

    /// Every applied instruction in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.log
    }
}
