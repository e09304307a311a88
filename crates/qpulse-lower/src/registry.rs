//! Gate registry: definitions, static checks and parameter resolution.
//!
//! Gates are registered on a [`GateRegistryBuilder`] during setup. Every
//! registration is checked immediately (duplicate keys, schema sanity,
//! undeclared parameter reads, unbound compound symbols, dependency
//! cycles); [`GateRegistryBuilder::build`] then checks that every
//! referenced subgate exists and fits its call sites, and seals the result
//! into an immutable [`GateRegistry`].

use petgraph::algo::{astar, has_path_connecting};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{LowerError, LowerResult};
use crate::gate::{Arity, GateCall, GateKey, GateProcedure, GateSignature, Subcall};
use crate::instruction::Instruction;
use crate::param::{ParamOverrides, ParamSchema, Params};
use crate::synthesis::Synthesis;

/// A registered gate definition.
#[derive(Clone)]
pub enum GateDef {
    /// Synthesized by a procedure from resolved parameters.
    Primitive {
        /// Declared parameters.
        schema: ParamSchema,
        /// Synthesis procedure.
        procedure: Arc<dyn GateProcedure>,
        /// Expansions the procedure may emit.
        subcalls: Vec<Subcall>,
    },
    /// A fixed sequence of other gates.
    Compound {
        /// Accepted targets and arguments.
        signature: GateSignature,
        /// Steps in order.
        steps: Vec<Subcall>,
    },
}

impl GateDef {
    /// Accepted targets and arguments.
    pub fn signature(&self) -> GateSignature {
        match self {
            GateDef::Primitive { procedure, .. } => procedure.signature(),
            GateDef::Compound { signature, .. } => signature.clone(),
        }
    }

    /// Parameter schema; compound gates have none.
    pub fn schema(&self) -> Option<&ParamSchema> {
        match self {
            GateDef::Primitive { schema, .. } => Some(schema),
            GateDef::Compound { .. } => None,
        }
    }

    /// Every gate this definition can expand into.
    pub fn subcalls(&self) -> &[Subcall] {
        match self {
            GateDef::Primitive { subcalls, .. } => subcalls,
            GateDef::Compound { steps, .. } => steps,
        }
    }

    /// Whether this is a compound definition.
    pub fn is_compound(&self) -> bool {
        matches!(self, GateDef::Compound { .. })
    }
}

impl fmt::Debug for GateDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDef::Primitive {
                schema, subcalls, ..
            } => f
                .debug_struct("Primitive")
                .field("schema", schema)
                .field("subcalls", subcalls)
                .finish_non_exhaustive(),
            GateDef::Compound { signature, steps } => f
                .debug_struct("Compound")
                .field("signature", signature)
                .field("steps", steps)
                .finish(),
        }
    }
}

/// Setup-phase registry with static checking.
#[derive(Debug, Default)]
pub struct GateRegistryBuilder {
    entries: FxHashMap<GateKey, GateDef>,
    order: Vec<GateKey>,
    graph: DiGraph<GateKey, ()>,
    nodes: FxHashMap<GateKey, NodeIndex>,
}

impl GateRegistryBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a primitive gate.
    ///
    /// # Errors
    ///
    /// `DuplicateGate`, `DuplicateParameter`, `UndeclaredParameter`, or any
    /// error from checking the procedure's declared subcalls.
    pub fn register_gate<P>(
        &mut self,
        name: &str,
        qualifier: Option<&str>,
        schema: ParamSchema,
        procedure: P,
    ) -> LowerResult<&mut Self>
    where
        P: GateProcedure + 'static,
    {
        let key = GateKey::from_parts(name, qualifier);
        self.ensure_vacant(&key)?;
        schema.validate(&key)?;
        if let Some(name) = procedure.reads().iter().find(|n| !schema.contains(n)) {
            return Err(LowerError::UndeclaredParameter {
                gate: key,
                name: (*name).to_string(),
            });
        }

        let signature = procedure.signature();
        let subcalls = procedure.subcalls();
        check_steps(&key, &signature, &subcalls)?;
        self.link(&key, &subcalls)?;

        debug!(
            "Registered gate {} ({} parameters, {} subcalls)",
            key,
            schema.len(),
            subcalls.len()
        );
        self.insert(
            key,
            GateDef::Primitive {
                schema,
                procedure: Arc::new(procedure),
                subcalls,
            },
        );
        Ok(self)
    }

    /// Register a gate defined as a fixed sequence of other gates.
    ///
    /// # Errors
    ///
    /// `DuplicateGate`, `UnboundSymbol`, `InvalidTargetCount` for a step
    /// index outside the signature, or `GateCycle`.
    pub fn register_compound(
        &mut self,
        name: &str,
        qualifier: Option<&str>,
        signature: GateSignature,
        steps: Vec<Subcall>,
    ) -> LowerResult<&mut Self> {
        let key = GateKey::from_parts(name, qualifier);
        self.ensure_vacant(&key)?;
        check_steps(&key, &signature, &steps)?;
        self.link(&key, &steps)?;

        debug!("Registered compound gate {} ({} steps)", key, steps.len());
        self.insert(key, GateDef::Compound { signature, steps });
        Ok(self)
    }

    /// Whether a key is registered.
    pub fn contains(&self, key: &GateKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Check every reference and seal the registry.
    ///
    /// # Errors
    ///
    /// `UnknownGate` for a missing subgate, `InvalidTargetCount` or
    /// `InvalidArgumentCount` for a step that does not fit its subgate.
    pub fn build(self) -> LowerResult<GateRegistry> {
        for key in &self.order {
            let def = &self.entries[key];
            for step in def.subcalls() {
                let sub = self
                    .entries
                    .get(&step.key)
                    .ok_or_else(|| LowerError::UnknownGate(step.key.clone()))?;
                let signature = sub.signature();
                if !signature.arity.accepts(step.targets.len()) {
                    return Err(LowerError::InvalidTargetCount {
                        gate: step.key.clone(),
                        expected: signature.arity,
                        got: step.targets.len(),
                    });
                }
                if !signature.accepts_args(step.args.len()) {
                    return Err(LowerError::InvalidArgumentCount {
                        gate: step.key.clone(),
                        expected: signature.expected_args(),
                        got: step.args.len(),
                    });
                }
            }
        }

        debug!("Built gate registry with {} gates", self.order.len());
        Ok(GateRegistry {
            entries: self.entries,
            order: self.order,
        })
    }

    fn ensure_vacant(&self, key: &GateKey) -> LowerResult<()> {
        if self.entries.contains_key(key) {
            return Err(LowerError::DuplicateGate(key.clone()));
        }
        Ok(())
    }

    fn insert(&mut self, key: GateKey, def: GateDef) {
        self.order.push(key.clone());
        self.entries.insert(key, def);
    }

    fn node(&mut self, key: &GateKey) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(key) {
            return idx;
        }
        let idx = self.graph.add_node(key.clone());
        self.nodes.insert(key.clone(), idx);
        idx
    }

    /// Add dependency edges for `key`, rolling them back on a cycle.
    fn link(&mut self, key: &GateKey, steps: &[Subcall]) -> LowerResult<()> {
        let from = self.node(key);
        let mut added: Vec<EdgeIndex> = Vec::new();
        for step in steps {
            let to = self.node(&step.key);
            if self.graph.find_edge(from, to).is_some() {
                continue;
            }
            if has_path_connecting(&self.graph, to, from, None) {
                let cycle = self.cycle(from, to);
                // newest first so no surviving edge is swapped into a freed slot
                for edge in added.into_iter().rev() {
                    self.graph.remove_edge(edge);
                }
                return Err(LowerError::GateCycle { cycle });
            }
            added.push(self.graph.add_edge(from, to, ()));
        }
        Ok(())
    }

    /// The cycle closed by a new edge `from -> to`, starting at `from`.
    fn cycle(&self, from: NodeIndex, to: NodeIndex) -> Vec<GateKey> {
        let back = astar(&self.graph, to, |n| n == from, |_| 1usize, |_| 0)
            .map(|(_, path)| path)
            .unwrap_or_default();
        std::iter::once(from)
            .chain(back.into_iter().take_while(|&n| n != from))
            .map(|n| self.graph[n].clone())
            .collect()
    }
}

/// Check step indices and symbols against the parent's signature.
fn check_steps(key: &GateKey, signature: &GateSignature, steps: &[Subcall]) -> LowerResult<()> {
    let names = signature.arg_names();
    let guaranteed = signature.arity.min();
    for step in steps {
        if let Some(&idx) = step.targets.iter().find(|&&i| i >= guaranteed) {
            return Err(LowerError::InvalidTargetCount {
                gate: key.clone(),
                expected: Arity::AtLeast(idx + 1),
                got: guaranteed,
            });
        }
        for expr in &step.args {
            let unbound = expr
                .symbols()
                .into_iter()
                .find(|s| !names.iter().any(|n| n == *s));
            if let Some(symbol) = unbound {
                return Err(LowerError::UnboundSymbol {
                    gate: key.clone(),
                    symbol: symbol.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Immutable gate registry.
pub struct GateRegistry {
    entries: FxHashMap<GateKey, GateDef>,
    order: Vec<GateKey>,
}

impl GateRegistry {
    /// Start a new registry.
    pub fn builder() -> GateRegistryBuilder {
        GateRegistryBuilder::new()
    }

    /// The registry of built-in gates.
    pub fn standard() -> LowerResult<Self> {
        crate::library::standard_builder()?.build()
    }

    /// Look up a definition.
    pub fn get(&self, key: &GateKey) -> LowerResult<&GateDef> {
        self.entries
            .get(key)
            .ok_or_else(|| LowerError::UnknownGate(key.clone()))
    }

    /// Whether a key is registered.
    pub fn contains(&self, key: &GateKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &GateKey> {
        self.order.iter()
    }

    /// Number of registered gates.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Validate a call against its gate's signature.
    pub fn check_call(&self, call: &GateCall) -> LowerResult<&GateDef> {
        let def = self.get(&call.key)?;
        def.signature().check(&call.key, &call.targets, &call.args)?;
        Ok(def)
    }

    /// Merge a gate's schema defaults with `overrides`.
    ///
    /// Compound gates have no parameters; any override is unknown.
    pub fn resolve(&self, key: &GateKey, overrides: &ParamOverrides) -> LowerResult<Params> {
        let params = match self.get(key)? {
            GateDef::Primitive { schema, .. } => schema.resolve(key, overrides)?,
            GateDef::Compound { .. } => {
                if let Some(name) = overrides.keys().next() {
                    return Err(LowerError::UnknownParameter {
                        gate: key.clone(),
                        name: name.clone(),
                    });
                }
                Params::empty(key.clone())
            }
        };
        debug!("Resolved {} with {} overrides", key, overrides.len());
        Ok(params)
    }

    /// Build the instruction sequence for a validated call.
    ///
    /// A compound gate yields one expansion marker per step.
    pub fn synthesize(&self, call: &GateCall, params: &Params) -> LowerResult<Synthesis> {
        match self.get(&call.key)? {
            GateDef::Primitive { procedure, .. } => procedure.synthesize(call, params),
            GateDef::Compound { signature, steps } => {
                steps.iter().try_fold(Synthesis::new(), |synthesis, step| {
                    Ok(synthesis.emit(Instruction::expand(step.bind(call, signature)?)))
                })
            }
        }
    }
}

impl fmt::Debug for GateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateRegistry")
            .field("gates", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ArgExpr;
    use crate::param::ParamValue;

    fn one_qubit() -> GateSignature {
        GateSignature::qubits(1)
    }

    #[test]
    fn test_duplicate_gate() {
        let mut b = GateRegistryBuilder::new();
        b.register_compound("A", None, one_qubit(), vec![]).unwrap();
        let err = b.register_compound("A", None, one_qubit(), vec![]).unwrap_err();
        assert!(matches!(err, LowerError::DuplicateGate(k) if k.name == "A"));
        // a different qualifier is a different gate
        b.register_compound("A", Some("v2"), one_qubit(), vec![]).unwrap();
    }

    #[test]
    fn test_two_cycle_reports_path() {
        let mut b = GateRegistryBuilder::new();
        b.register_compound("A", None, one_qubit(), vec![Subcall::new("B", [0])])
            .unwrap();
        let err = b
            .register_compound("B", None, one_qubit(), vec![Subcall::new("A", [0])])
            .unwrap_err();
        match err {
            LowerError::GateCycle { cycle } => {
                assert_eq!(cycle, vec![GateKey::new("B"), GateKey::new("A")]);
            }
            other => panic!("expected cycle, got {other}"),
        }
        assert!(!b.contains(&GateKey::new("B")));
    }

    #[test]
    fn test_self_cycle() {
        let mut b = GateRegistryBuilder::new();
        let err = b
            .register_compound("A", None, one_qubit(), vec![Subcall::new("A", [0])])
            .unwrap_err();
        assert!(matches!(err, LowerError::GateCycle { .. }));
    }

    #[test]
    fn test_failed_registration_leaves_graph_clean() {
        let mut b = GateRegistryBuilder::new();
        b.register_compound("A", None, one_qubit(), vec![Subcall::new("B", [0])])
            .unwrap();
        assert!(
            b.register_compound("B", None, one_qubit(), vec![Subcall::new("A", [0])])
                .is_err()
        );
        // B may still be registered without the back edge
        b.register_compound("B", None, one_qubit(), vec![]).unwrap();
        b.build().unwrap();
    }

    #[test]
    fn test_longer_cycle_rolls_back_earlier_edges() {
        let mut b = GateRegistryBuilder::new();
        b.register_compound("A", None, one_qubit(), vec![Subcall::new("B", [0])])
            .unwrap()
            .register_compound("B", None, one_qubit(), vec![Subcall::new("C", [0])])
            .unwrap();
        let err = b
            .register_compound(
                "C",
                None,
                one_qubit(),
                vec![Subcall::new("D", [0]), Subcall::new("A", [0])],
            )
            .unwrap_err();
        match err {
            LowerError::GateCycle { cycle } => {
                let names: Vec<_> = cycle.iter().map(|k| k.name.as_str()).collect();
                assert_eq!(names, ["C", "A", "B"]);
            }
            other => panic!("expected cycle, got {other}"),
        }
        // the C -> D edge went away with the failed registration
        b.register_compound("D", None, one_qubit(), vec![Subcall::new("C", [0])])
            .unwrap()
            .register_compound("C", None, one_qubit(), vec![])
            .unwrap();
        b.build().unwrap();
    }

    #[test]
    fn test_unbound_symbol() {
        let mut b = GateRegistryBuilder::new();
        let err = b
            .register_compound(
                "A",
                None,
                one_qubit().arg("theta"),
                vec![Subcall::new("B", [0]).with_args([ArgExpr::symbol("phi")])],
            )
            .unwrap_err();
        assert!(matches!(err, LowerError::UnboundSymbol { symbol, .. } if symbol == "phi"));
    }

    #[test]
    fn test_step_index_out_of_range() {
        let mut b = GateRegistryBuilder::new();
        let err = b
            .register_compound("A", None, one_qubit(), vec![Subcall::new("B", [1])])
            .unwrap_err();
        assert!(matches!(err, LowerError::InvalidTargetCount { .. }));
    }

    #[test]
    fn test_build_rejects_missing_subgate() {
        let mut b = GateRegistryBuilder::new();
        b.register_compound("A", None, one_qubit(), vec![Subcall::new("B", [0])])
            .unwrap();
        assert!(matches!(b.build(), Err(LowerError::UnknownGate(k)) if k.name == "B"));
    }

    #[test]
    fn test_build_rejects_arity_mismatch() {
        let mut b = GateRegistryBuilder::new();
        b.register_compound("Two", None, GateSignature::qubits(2), vec![])
            .unwrap();
        b.register_compound("A", None, one_qubit(), vec![Subcall::new("Two", [0])])
            .unwrap();
        assert!(matches!(
            b.build(),
            Err(LowerError::InvalidTargetCount { .. })
        ));
    }

    #[test]
    fn test_compound_synthesizes_markers() {
        let mut b = GateRegistryBuilder::new();
        b.register_compound("Leaf", None, one_qubit().arg("x"), vec![])
            .unwrap();
        b.register_compound(
            "Pair",
            None,
            GateSignature::qubits(2).arg("x"),
            vec![
                Subcall::new("Leaf", [1]).with_args([ArgExpr::symbol("x")]),
                Subcall::new("Leaf", [0]).with_args([-ArgExpr::symbol("x")]),
            ],
        )
        .unwrap();
        let reg = b.build().unwrap();

        let call = GateCall::new("Pair", ["Q0", "Q1"]).with_args([0.25]);
        let params = reg.resolve(&call.key, &ParamOverrides::new()).unwrap();
        let mut ctx = crate::context::GateContext::default();
        let out = reg.synthesize(&call, &params).unwrap().run(&mut ctx);
        assert_eq!(
            out,
            vec![
                Instruction::expand(GateCall::new("Leaf", ["Q1"]).with_args([0.25])),
                Instruction::expand(GateCall::new("Leaf", ["Q0"]).with_args([-0.25])),
            ]
        );
    }

    #[test]
    fn test_compound_rejects_overrides() {
        let mut b = GateRegistryBuilder::new();
        b.register_compound("A", None, one_qubit(), vec![]).unwrap();
        let reg = b.build().unwrap();
        let mut o = ParamOverrides::new();
        o.insert("amp".into(), ParamValue::Float(1.0));
        assert!(matches!(
            reg.resolve(&GateKey::new("A"), &o),
            Err(LowerError::UnknownParameter { .. })
        ));
    }
}
