//! Lazy instruction sequences produced by gate procedures.
//!
//! A [`Synthesis`] is a queue of stages. Fixed stages hold a ready
//! instruction; deferred stages hold a closure that is run against the
//! [`GateContext`] only when the consumer reaches it, so it observes every
//! state change made by earlier instructions, including those of nested
//! expansions. Each stage runs at most once; a synthesis cannot be
//! restarted.

use std::collections::VecDeque;
use std::fmt;

use crate::context::GateContext;
use crate::instruction::Instruction;

type Deferred = Box<dyn FnOnce(&GateContext) -> Vec<Instruction> + Send>;

enum Stage {
    Emit(Instruction),
    Deferred(Deferred),
}

/// A lazy, single-pass instruction sequence.
#[derive(Default)]
pub struct Synthesis {
    stages: VecDeque<Stage>,
    pending: VecDeque<Instruction>,
}

impl Synthesis {
    /// An empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fixed instruction.
    #[must_use]
    pub fn emit(mut self, instruction: Instruction) -> Self {
        self.stages.push_back(Stage::Emit(instruction));
        self
    }

    /// Append a stage computed from the context when reached.
    #[must_use]
    pub fn then<F>(mut self, stage: F) -> Self
    where
        F: FnOnce(&GateContext) -> Vec<Instruction> + Send + 'static,
    {
        self.stages.push_back(Stage::Deferred(Box::new(stage)));
        self
    }

    /// Append all stages of another sequence.
    #[must_use]
    pub fn chain(mut self, mut other: Synthesis) -> Self {
        self.stages.extend(other.pending.drain(..).map(Stage::Emit));
        self.stages.append(&mut other.stages);
        self
    }

    /// Number of stages not yet started.
    pub fn remaining_stages(&self) -> usize {
        self.stages.len()
    }

    /// Whether nothing is left to produce.
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty() && self.stages.is_empty()
    }

    /// Produce the next instruction, running deferred stages as needed.
    ///
    /// The caller must apply each returned instruction to `ctx` before
    /// calling again.
    pub fn next(&mut self, ctx: &GateContext) -> Option<Instruction> {
        loop {
            if let Some(instruction) = self.pending.pop_front() {
                return Some(instruction);
            }
            match self.stages.pop_front()? {
                Stage::Emit(instruction) => return Some(instruction),
                Stage::Deferred(stage) => self.pending.extend(stage(ctx)),
            }
        }
    }

    /// Drain the whole sequence, applying each instruction to `ctx`.
    ///
    /// Expansion markers are returned but not expanded.
    pub fn run(mut self, ctx: &mut GateContext) -> Vec<Instruction> {
        let mut out = Vec::new();
        while let Some(instruction) = self.next(ctx) {
            ctx.apply(&instruction);
            out.push(instruction);
        }
        out
    }
}

impl fmt::Debug for Synthesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthesis")
            .field("stages", &self.stages.len())
            .field("pending", &self.pending)
            .finish()
    }
}
