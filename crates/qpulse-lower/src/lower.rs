//! The lowering driver.
//!
//! [`Lowerer::lower`] checks a top-level call, resolves parameters for
//! every gate reachable from it (the plan), and returns a [`Lowering`]: an
//! iterator that pulls instructions from the innermost active synthesis,
//! folds each into its own [`GateContext`] and yields it. Expansion markers
//! push a new synthesis frame in place.
//!
//! ```text
//!   call ──► plan (check + resolve every reachable gate)
//!              │
//!              ▼
//!   Lowering: [frame: CX] ──Expand H──► [frame: CX, H] ──Expand U──► ...
//!              │
//!              ▼
//!   AddWaveform / SetState, each applied to the context before it is yielded
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use tracing::{debug, instrument, trace};

use crate::calibration::CalibrationSource;
use crate::context::{GateContext, QubitLedger};
use crate::error::{LowerError, LowerResult};
use crate::gate::{GateCall, GateKey};
use crate::instruction::Instruction;
use crate::param::Params;
use crate::qubit::QubitRef;
use crate::registry::GateRegistry;
use crate::synthesis::Synthesis;

/// Default bound on expansion nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Runtime options for lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowerOptions {
    /// Maximum expansion nesting, counting the top-level gate as 1.
    pub max_depth: usize,
    /// Whether to yield `Expand` markers before expanding them.
    pub emit_expansions: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            emit_expansions: true,
        }
    }
}

/// Resolved parameters for every (gate, targets) reachable from one call.
type Plan = FxHashMap<(GateKey, Vec<QubitRef>), Params>;

/// A bound call with its arguments compared bitwise.
type CallKey = (GateKey, Vec<QubitRef>, Vec<u64>);

fn call_key(call: &GateCall) -> CallKey {
    (
        call.key.clone(),
        call.targets.clone(),
        call.args.iter().map(|a| a.to_bits()).collect(),
    )
}

/// Lowers gate calls against a registry and a calibration source.
pub struct Lowerer<'a> {
    registry: &'a GateRegistry,
    calibration: &'a dyn CalibrationSource,
    options: LowerOptions,
}

impl<'a> Lowerer<'a> {
    /// A lowerer with default options.
    pub fn new(registry: &'a GateRegistry, calibration: &'a dyn CalibrationSource) -> Self {
        Self {
            registry,
            calibration,
            options: LowerOptions::default(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: LowerOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> &LowerOptions {
        &self.options
    }

    /// The registry gates are looked up in.
    pub fn registry(&self) -> &'a GateRegistry {
        self.registry
    }

    /// Resolve a gate's parameters on `targets` with calibration overrides.
    pub fn resolve(&self, key: &GateKey, targets: &[QubitRef]) -> LowerResult<Params> {
        let overrides = self.calibration.overrides(key, targets);
        self.registry.resolve(key, &overrides)
    }

    /// Start lowering `call` against a snapshot of `seed`.
    ///
    /// Every error the static expansion tree can produce is returned here,
    /// before any instruction exists.
    #[instrument(level = "debug", skip(self, seed), fields(gate = %call.key))]
    pub fn lower(&self, call: &GateCall, seed: &QubitLedger) -> LowerResult<Lowering<'a>> {
        let mut plan = Plan::default();
        self.plan(call, 1, &mut plan, &mut FxHashMap::default())?;
        debug!("Planned {} gate invocations", plan.len());

        let mut lowering = Lowering {
            registry: self.registry,
            plan,
            ctx: GateContext::seed(seed),
            stack: Vec::new(),
            options: self.options,
            emitted: 0,
            failed: false,
        };
        lowering.enter(call, None)?;
        Ok(lowering)
    }

    /// Lower `call` completely and commit the result to `ledger`.
    ///
    /// On error the ledger is left untouched.
    pub fn lower_into(
        &self,
        call: &GateCall,
        ledger: &mut QubitLedger,
    ) -> LowerResult<Vec<Instruction>> {
        let mut lowering = self.lower(call, ledger)?;
        let mut out = Vec::new();
        for instruction in lowering.by_ref() {
            out.push(instruction?);
        }
        if let Some(ctx) = lowering.into_context() {
            *ledger = ctx.into_ledger();
        }
        Ok(out)
    }

    /// Check, resolve and trial-synthesize `call` and everything it expands to.
    ///
    /// Parameters are resolved once per (gate, targets) slot. Synthesis is
    /// tried for every distinct bound call, and a call's subtree is walked
    /// again only when it is reached deeper than before.
    fn plan(
        &self,
        call: &GateCall,
        depth: usize,
        plan: &mut Plan,
        visited: &mut FxHashMap<CallKey, usize>,
    ) -> LowerResult<()> {
        if depth > self.options.max_depth {
            return Err(LowerError::ExpansionDepth {
                gate: call.key.clone(),
                max_depth: self.options.max_depth,
            });
        }
        let def = self.registry.check_call(call)?;

        let params = match plan.entry((call.key.clone(), call.targets.clone())) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.resolve(&call.key, &call.targets)?),
        };
        let key = call_key(call);
        match visited.get(&key) {
            Some(&seen) if seen >= depth => return Ok(()),
            Some(_) => {}
            // surfaces argument errors raised at synthesis time
            None => {
                self.registry.synthesize(call, params)?;
            }
        }
        visited.insert(key, depth);

        let signature = def.signature();
        for step in def.subcalls() {
            let child = step.bind(call, &signature)?;
            self.plan(&child, depth + 1, plan, visited)?;
        }
        Ok(())
    }
}

struct Frame {
    key: GateKey,
    synthesis: Synthesis,
}

/// An in-progress lowering of one top-level call.
///
/// Yields `Ok(instruction)` in emission order. After an `Err` the iterator
/// is fused. The context reflects every instruction yielded so far; call
/// [`into_context`](Lowering::into_context) after full consumption to
/// commit it, or drop the iterator to discard it.
pub struct Lowering<'a> {
    registry: &'a GateRegistry,
    plan: Plan,
    ctx: GateContext,
    stack: Vec<Frame>,
    options: LowerOptions,
    emitted: usize,
    failed: bool,
}

impl Lowering<'_> {
    /// The context as of the last yielded instruction.
    pub fn context(&self) -> &GateContext {
        &self.ctx
    }

    /// Current expansion nesting.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether every instruction has been produced without error.
    pub fn is_complete(&self) -> bool {
        !self.failed && self.stack.is_empty()
    }

    /// The final context, if lowering ran to completion.
    pub fn into_context(self) -> Option<GateContext> {
        self.is_complete().then_some(self.ctx)
    }

    fn enter(&mut self, call: &GateCall, parent: Option<&GateKey>) -> LowerResult<()> {
        if self.stack.len() >= self.options.max_depth {
            return Err(LowerError::ExpansionDepth {
                gate: call.key.clone(),
                max_depth: self.options.max_depth,
            });
        }
        let params = self
            .plan
            .get(&(call.key.clone(), call.targets.clone()))
            .ok_or_else(|| LowerError::UndeclaredExpansion {
                gate: parent.cloned().unwrap_or_else(|| call.key.clone()),
                subgate: call.key.clone(),
                targets: call.targets.clone(),
            })?;
        self.registry.check_call(call)?;
        let synthesis = self.registry.synthesize(call, params)?;
        debug!(depth = self.stack.len() + 1, "Expanding {}", call);
        self.stack.push(Frame {
            key: call.key.clone(),
            synthesis,
        });
        Ok(())
    }
}

impl Iterator for Lowering<'_> {
    type Item = LowerResult<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let frame = self.stack.last_mut()?;
            let Some(instruction) = frame.synthesis.next(&self.ctx) else {
                self.stack.pop();
                continue;
            };

            if let Instruction::Expand(call) = &instruction {
                let parent = frame.key.clone();
                if let Err(e) = self.enter(call, Some(&parent)) {
                    self.failed = true;
                    return Some(Err(e));
                }
                if !self.options.emit_expansions {
                    continue;
                }
            } else {
                self.ctx.apply(&instruction);
            }

            self.emitted += 1;
            trace!(n = self.emitted, "{}", instruction);
            return Some(Ok(instruction));
        }
    }
}
