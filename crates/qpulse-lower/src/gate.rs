//! Gate keys, calls, signatures and the procedure trait.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LowerError, LowerResult};
use crate::expr::ArgExpr;
use crate::param::Params;
use crate::qubit::QubitRef;
use crate::synthesis::Synthesis;

/// Registry key: a gate name plus an optional variant qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GateKey {
    /// Gate name, e.g. `CR`.
    #[serde(rename = "gate")]
    pub name: String,
    /// Variant qualifier, e.g. `echo`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl GateKey {
    /// An unqualified key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: None,
        }
    }

    /// A qualified key.
    pub fn qualified(name: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: Some(qualifier.into()),
        }
    }

    /// Build from a name and an optional qualifier.
    pub fn from_parts(name: &str, qualifier: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            qualifier: qualifier.map(str::to_string),
        }
    }
}

impl fmt::Display for GateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}:{q}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<&str> for GateKey {
    fn from(name: &str) -> Self {
        GateKey::new(name)
    }
}

/// One gate invocation on concrete qubits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCall {
    /// Which gate.
    #[serde(flatten)]
    pub key: GateKey,
    /// Target qubits in gate order.
    #[serde(rename = "qubits")]
    pub targets: Vec<QubitRef>,
    /// Positional gate arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<f64>,
}

impl GateCall {
    /// A call without arguments.
    pub fn new<Q: Into<QubitRef>>(
        key: impl Into<GateKey>,
        targets: impl IntoIterator<Item = Q>,
    ) -> Self {
        Self {
            key: key.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            args: Vec::new(),
        }
    }

    /// Set the positional arguments.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = f64>) -> Self {
        self.args = args.into_iter().collect();
        self
    }
}

impl fmt::Display for GateCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
            write!(f, "({})", args.join(", "))?;
        }
        let targets: Vec<&str> = self.targets.iter().map(QubitRef::name).collect();
        write!(f, " {}", targets.join(", "))
    }
}

/// Number of qubit targets a gate accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arity {
    /// Exactly this many.
    Exactly(usize),
    /// This many or more.
    AtLeast(usize),
}

impl Arity {
    /// Whether `n` targets are acceptable.
    #[inline]
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }

    /// Number of targets every invocation is guaranteed to have.
    #[inline]
    pub fn min(self) -> usize {
        match self {
            Arity::Exactly(k) | Arity::AtLeast(k) => k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(k) => write!(f, "exactly {k}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

/// A named positional argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    /// Argument name, usable as a symbol in compound definitions.
    pub name: String,
    /// Whether callers must supply it.
    pub required: bool,
}

/// Target arity and positional arguments of a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSignature {
    /// Accepted number of targets.
    pub arity: Arity,
    /// Positional arguments; optional ones trail required ones.
    pub args: Vec<ArgSpec>,
}

impl GateSignature {
    /// A signature with no arguments.
    pub fn new(arity: Arity) -> Self {
        Self {
            arity,
            args: Vec::new(),
        }
    }

    /// Signature for a gate on exactly `n` qubits.
    pub fn qubits(n: usize) -> Self {
        Self::new(Arity::Exactly(n))
    }

    /// Append a required argument.
    #[must_use]
    pub fn arg(mut self, name: &str) -> Self {
        self.args.push(ArgSpec {
            name: name.to_string(),
            required: true,
        });
        self
    }

    /// Append an optional argument.
    #[must_use]
    pub fn optional_arg(mut self, name: &str) -> Self {
        self.args.push(ArgSpec {
            name: name.to_string(),
            required: false,
        });
        self
    }

    /// Argument names in order.
    pub fn arg_names(&self) -> Vec<String> {
        self.args.iter().map(|a| a.name.clone()).collect()
    }

    fn required_args(&self) -> usize {
        self.args.iter().filter(|a| a.required).count()
    }

    /// Human-readable accepted argument count.
    pub fn expected_args(&self) -> String {
        let (lo, hi) = (self.required_args(), self.args.len());
        if lo == hi {
            lo.to_string()
        } else {
            format!("{lo}..={hi}")
        }
    }

    /// Whether `n` arguments are acceptable.
    pub fn accepts_args(&self, n: usize) -> bool {
        n >= self.required_args() && n <= self.args.len()
    }

    /// Validate target count, target uniqueness and argument count.
    pub fn check(&self, key: &GateKey, targets: &[QubitRef], args: &[f64]) -> LowerResult<()> {
        if !self.arity.accepts(targets.len()) {
            return Err(LowerError::InvalidTargetCount {
                gate: key.clone(),
                expected: self.arity,
                got: targets.len(),
            });
        }
        for (i, q) in targets.iter().enumerate() {
            if targets[..i].contains(q) {
                return Err(LowerError::DuplicateTarget {
                    gate: key.clone(),
                    qubit: q.clone(),
                });
            }
        }
        if !self.accepts_args(args.len()) {
            return Err(LowerError::InvalidArgumentCount {
                gate: key.clone(),
                expected: self.expected_args(),
                got: args.len(),
            });
        }
        if let Some((spec, value)) = self.args.iter().zip(args).find(|(_, v)| !v.is_finite()) {
            return Err(LowerError::InvalidArgument {
                gate: key.clone(),
                name: spec.name.clone(),
                reason: format!("{value} is not finite"),
            });
        }
        Ok(())
    }
}

/// A step of a compound gate, or an expansion a procedure may emit.
///
/// Targets are indices into the parent's target list; arguments are
/// expressions over the parent's argument names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcall {
    /// Subgate to invoke.
    pub key: GateKey,
    /// Parent target indices.
    pub targets: Vec<usize>,
    /// Argument expressions.
    pub args: Vec<ArgExpr>,
}

impl Subcall {
    /// A step on the given parent targets with no arguments.
    pub fn new(key: impl Into<GateKey>, targets: impl IntoIterator<Item = usize>) -> Self {
        Self {
            key: key.into(),
            targets: targets.into_iter().collect(),
            args: Vec::new(),
        }
    }

    /// Set argument expressions.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = ArgExpr>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Bind to a concrete parent invocation.
    pub fn bind(&self, parent: &GateCall, signature: &GateSignature) -> LowerResult<GateCall> {
        let targets = self
            .targets
            .iter()
            .map(|&i| {
                parent
                    .targets
                    .get(i)
                    .cloned()
                    .ok_or_else(|| LowerError::InvalidTargetCount {
                        gate: parent.key.clone(),
                        expected: Arity::AtLeast(i + 1),
                        got: parent.targets.len(),
                    })
            })
            .collect::<LowerResult<Vec<_>>>()?;

        let names = signature.arg_names();
        let args = self
            .args
            .iter()
            .map(|expr| {
                expr.eval_positional(&names, &parent.args)
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| LowerError::InvalidArgument {
                        gate: self.key.clone(),
                        name: expr.to_string(),
                        reason: format!(
                            "has no finite value with arguments of '{}'",
                            parent.key
                        ),
                    })
            })
            .collect::<LowerResult<Vec<_>>>()?;

        Ok(GateCall {
            key: self.key.clone(),
            targets,
            args,
        })
    }
}

/// A pulse-synthesis procedure for a primitive gate.
///
/// Implementations declare everything the registry needs to check them
/// statically: the signature, the parameters they read and any expansions
/// they emit. [`synthesize`](GateProcedure::synthesize) receives an already
/// validated call and resolved parameters and returns a lazy instruction
/// sequence.
pub trait GateProcedure: Send + Sync {
    /// Accepted targets and arguments.
    fn signature(&self) -> GateSignature;

    /// Names of all parameters the procedure reads.
    fn reads(&self) -> &[&'static str];

    /// Expansions the procedure may emit.
    fn subcalls(&self) -> Vec<Subcall> {
        Vec::new()
    }

    /// Build the instruction sequence for one invocation.
    fn synthesize(&self, call: &GateCall, params: &Params) -> LowerResult<Synthesis>;
}
