//! Argument expressions for compound gate definitions.
//!
//! A compound step passes arguments to its subgate as expressions over the
//! parent gate's argument names, e.g. `U(θ, φ, λ)` lowers to
//! `P(θ + φ + λ)`. Expressions are checked against the parent signature at
//! registration and evaluated once the parent's arguments are known.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;

/// A numeric expression over named gate arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgExpr {
    /// A literal value.
    Constant(f64),
    /// The parent argument with this name.
    Symbol(String),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ArgExpr>),
    /// Addition.
    Add(Box<ArgExpr>, Box<ArgExpr>),
    /// Subtraction.
    Sub(Box<ArgExpr>, Box<ArgExpr>),
    /// Multiplication.
    Mul(Box<ArgExpr>, Box<ArgExpr>),
    /// Division.
    Div(Box<ArgExpr>, Box<ArgExpr>),
}

impl ArgExpr {
    /// A literal value.
    pub fn constant(value: f64) -> Self {
        ArgExpr::Constant(value)
    }

    /// A reference to a parent argument.
    pub fn symbol(name: impl Into<String>) -> Self {
        ArgExpr::Symbol(name.into())
    }

    /// The constant π.
    pub fn pi() -> Self {
        ArgExpr::Pi
    }

    /// Names of all parent arguments referenced.
    pub fn symbols(&self) -> BTreeSet<&str> {
        let mut set = BTreeSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols<'a>(&'a self, set: &mut BTreeSet<&'a str>) {
        match self {
            ArgExpr::Constant(_) | ArgExpr::Pi => {}
            ArgExpr::Symbol(name) => {
                set.insert(name.as_str());
            }
            ArgExpr::Neg(e) => e.collect_symbols(set),
            ArgExpr::Add(a, b) | ArgExpr::Sub(a, b) | ArgExpr::Mul(a, b) | ArgExpr::Div(a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Evaluate with symbols looked up through `lookup`.
    ///
    /// Returns `None` if a symbol is unbound or a divisor is zero.
    pub fn eval(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Option<f64> {
        match self {
            ArgExpr::Constant(v) => Some(*v),
            ArgExpr::Symbol(name) => lookup(name),
            ArgExpr::Pi => Some(PI),
            ArgExpr::Neg(e) => e.eval(lookup).map(|v| -v),
            ArgExpr::Add(a, b) => Some(a.eval(lookup)? + b.eval(lookup)?),
            ArgExpr::Sub(a, b) => Some(a.eval(lookup)? - b.eval(lookup)?),
            ArgExpr::Mul(a, b) => Some(a.eval(lookup)? * b.eval(lookup)?),
            ArgExpr::Div(a, b) => {
                let divisor = b.eval(lookup)?;
                if divisor == 0.0 {
                    return None;
                }
                Some(a.eval(lookup)? / divisor)
            }
        }
    }

    /// Evaluate against positional values named by `names`.
    pub fn eval_positional(&self, names: &[String], values: &[f64]) -> Option<f64> {
        self.eval(&|symbol| {
            names
                .iter()
                .position(|n| n == symbol)
                .and_then(|i| values.get(i).copied())
        })
    }
}

impl fmt::Display for ArgExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgExpr::Constant(v) => write!(f, "{v}"),
            ArgExpr::Symbol(name) => write!(f, "{name}"),
            ArgExpr::Pi => write!(f, "π"),
            ArgExpr::Neg(e) => write!(f, "-({e})"),
            ArgExpr::Add(a, b) => write!(f, "({a} + {b})"),
            ArgExpr::Sub(a, b) => write!(f, "({a} - {b})"),
            ArgExpr::Mul(a, b) => write!(f, "({a} * {b})"),
            ArgExpr::Div(a, b) => write!(f, "({a} / {b})"),
        }
    }
}

impl From<f64> for ArgExpr {
    fn from(value: f64) -> Self {
        ArgExpr::Constant(value)
    }
}

impl From<&str> for ArgExpr {
    fn from(name: &str) -> Self {
        ArgExpr::Symbol(name.to_string())
    }
}

impl std::ops::Add for ArgExpr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ArgExpr::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ArgExpr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ArgExpr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ArgExpr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ArgExpr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ArgExpr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ArgExpr::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ArgExpr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ArgExpr::Neg(Box::new(self))
    }
}
