//! Gate parameter schemas and resolution.
//!
//! Each primitive gate declares a [`ParamSchema`]: an ordered list of typed
//! parameters with defaults and physical units. [`ParamSchema::resolve`]
//! merges the defaults with calibration overrides into a [`Params`]
//! mapping. Resolution is pure; it never touches qubit state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{LowerError, LowerResult};
use crate::gate::GateKey;

/// Overrides supplied by a calibration source, by parameter name.
pub type ParamOverrides = BTreeMap<String, ParamValue>;

/// Declared type of a gate parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// A real number.
    Float,
    /// An integer.
    Int,
    /// A boolean flag.
    Bool,
    /// A string, optionally restricted to a set of choices.
    Str,
    /// An interpolation table `[[x...], [y...]]`.
    Table,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Float => "float",
            ParamType::Int => "int",
            ParamType::Bool => "bool",
            ParamType::Str => "str",
            ParamType::Table => "table",
        };
        f.write_str(name)
    }
}

/// A parameter value as stored in a schema or calibration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(String),
    /// Interpolation table rows.
    Table(Vec<Vec<f64>>),
}

impl ParamValue {
    /// The type of this value.
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Bool(_) => ParamType::Bool,
            ParamValue::Int(_) => ParamType::Int,
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::Str(_) => ParamType::Str,
            ParamValue::Table(_) => ParamType::Table,
        }
    }

    /// Convert to the declared type, widening `Int` to `Float`.
    ///
    /// Returns the value's own type on mismatch.
    #[allow(clippy::cast_precision_loss)]
    fn coerce(self, ty: ParamType) -> Result<ParamValue, ParamType> {
        match (self, ty) {
            (ParamValue::Int(v), ParamType::Float) => Ok(ParamValue::Float(v as f64)),
            (v, ty) if v.param_type() == ty => Ok(v),
            (v, _) => Err(v.param_type()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
            ParamValue::Table(rows) => {
                f.write_str("[")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{row:?}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// A validated interpolation table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Table {
    /// Validate table rows: two rows of equal non-zero length, xs ascending.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, String> {
        let [xs, ys] = rows else {
            return Err(format!("expected 2 rows, got {}", rows.len()));
        };
        if xs.is_empty() || xs.len() != ys.len() {
            return Err(format!(
                "rows must have equal non-zero length, got {} and {}",
                xs.len(),
                ys.len()
            ));
        }
        if xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return Err("entries must be finite".to_string());
        }
        if xs.windows(2).any(|w| w[1] < w[0]) {
            return Err("x values must be ascending".to_string());
        }
        Ok(Self {
            xs: xs.clone(),
            ys: ys.clone(),
        })
    }

    /// Linear interpolation, clamped to the end values outside the x range.
    ///
    /// NaN maps to the first value.
    pub fn interp(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x.is_nan() || x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        // xs[0] < x < xs[n-1], so some segment brackets x
        let i = self.xs.partition_point(|&v| v <= x);
        let (x0, x1) = (self.xs[i - 1], self.xs[i]);
        let (y0, y1) = (self.ys[i - 1], self.ys[i]);
        if x1 == x0 {
            return y1;
        }
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

/// Declaration of a single gate parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: ParamType,
    /// Default value; `None` marks the parameter optional.
    pub default: Option<ParamValue>,
    /// Physical unit, for display.
    pub unit: Option<String>,
    /// Admissible values for a string parameter.
    pub choices: Option<Vec<String>>,
    /// Reject negative numbers.
    #[serde(default)]
    pub non_negative: bool,
}

impl ParamSpec {
    fn with_default(name: &str, value: ParamValue) -> Self {
        Self {
            name: name.to_string(),
            ty: value.param_type(),
            default: Some(value),
            unit: None,
            choices: None,
            non_negative: false,
        }
    }

    /// A float parameter.
    pub fn float(name: &str, default: f64) -> Self {
        Self::with_default(name, ParamValue::Float(default))
    }

    /// An integer parameter.
    pub fn int(name: &str, default: i64) -> Self {
        Self::with_default(name, ParamValue::Int(default))
    }

    /// A boolean parameter.
    pub fn bool(name: &str, default: bool) -> Self {
        Self::with_default(name, ParamValue::Bool(default))
    }

    /// A string parameter.
    pub fn str(name: &str, default: &str) -> Self {
        Self::with_default(name, ParamValue::Str(default.to_string()))
    }

    /// An interpolation table parameter.
    pub fn table(name: &str, default: [[f64; 2]; 2]) -> Self {
        let rows = default.iter().map(|row| row.to_vec()).collect();
        Self::with_default(name, ParamValue::Table(rows))
    }

    /// A parameter with no default, absent unless overridden.
    pub fn optional(name: &str, ty: ParamType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: None,
            unit: None,
            choices: None,
            non_negative: false,
        }
    }

    /// Attach a physical unit.
    #[must_use]
    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Restrict a string parameter to a set of values.
    #[must_use]
    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = Some(choices.iter().map(|c| (*c).to_string()).collect());
        self
    }

    /// Reject negative values.
    #[must_use]
    pub fn non_negative(mut self) -> Self {
        self.non_negative = true;
        self
    }

    /// Type-check and validate a value for this parameter.
    fn check(&self, gate: &GateKey, value: ParamValue) -> LowerResult<ParamValue> {
        let value = value
            .coerce(self.ty)
            .map_err(|found| LowerError::ParameterType {
                gate: gate.clone(),
                name: self.name.clone(),
                expected: self.ty,
                found,
            })?;
        let invalid = |reason: String| LowerError::ParameterValue {
            gate: gate.clone(),
            name: self.name.clone(),
            reason,
        };
        match &value {
            ParamValue::Str(s) => {
                if let Some(choices) = &self.choices {
                    if !choices.iter().any(|c| c == s) {
                        return Err(invalid(format!(
                            "'{s}' is not one of {}",
                            choices.join(", ")
                        )));
                    }
                }
            }
            ParamValue::Table(rows) => {
                Table::from_rows(rows).map_err(invalid)?;
            }
            ParamValue::Float(v) => {
                if !v.is_finite() {
                    return Err(invalid(format!("{v} is not finite")));
                }
                if self.non_negative && *v < 0.0 {
                    return Err(invalid(format!("{v} is negative")));
                }
            }
            ParamValue::Int(v) => {
                if self.non_negative && *v < 0 {
                    return Err(invalid(format!("{v} is negative")));
                }
            }
            ParamValue::Bool(_) => {}
        }
        Ok(value)
    }
}

/// Ordered parameter declarations of one gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSchema {
    specs: Vec<ParamSpec>,
}

impl ParamSchema {
    /// Create a schema from declarations in order.
    pub fn new(specs: impl IntoIterator<Item = ParamSpec>) -> Self {
        Self {
            specs: specs.into_iter().collect(),
        }
    }

    /// Look up a declaration by name.
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Whether a parameter is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Declarations in order.
    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.specs.iter()
    }

    /// Number of declarations.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the schema declares nothing.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Check the schema itself: unique names and well-typed defaults.
    pub(crate) fn validate(&self, gate: &GateKey) -> LowerResult<()> {
        for (i, spec) in self.specs.iter().enumerate() {
            if self.specs[..i].iter().any(|s| s.name == spec.name) {
                return Err(LowerError::DuplicateParameter {
                    gate: gate.clone(),
                    name: spec.name.clone(),
                });
            }
            if let Some(default) = &spec.default {
                spec.check(gate, default.clone())?;
            }
        }
        Ok(())
    }

    /// Merge defaults with `overrides` into a fully populated mapping.
    ///
    /// # Errors
    ///
    /// `UnknownParameter` if an override is not declared, `ParameterType`
    /// or `ParameterValue` if an override does not fit its declaration.
    pub fn resolve(&self, gate: &GateKey, overrides: &ParamOverrides) -> LowerResult<Params> {
        if let Some(name) = overrides.keys().find(|name| !self.contains(name)) {
            return Err(LowerError::UnknownParameter {
                gate: gate.clone(),
                name: name.clone(),
            });
        }

        let mut values = BTreeMap::new();
        for spec in &self.specs {
            let value = match overrides.get(&spec.name) {
                Some(v) => spec.check(gate, v.clone())?,
                None => match &spec.default {
                    Some(d) => d.clone(),
                    None => continue,
                },
            };
            values.insert(spec.name.clone(), value);
        }

        Ok(Params {
            gate: gate.clone(),
            values,
        })
    }
}

/// Resolved parameters of one gate on one set of targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    gate: GateKey,
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    /// An empty mapping, for gates without a schema.
    pub fn empty(gate: GateKey) -> Self {
        Self {
            gate,
            values: BTreeMap::new(),
        }
    }

    /// The gate these parameters belong to.
    pub fn gate(&self) -> &GateKey {
        &self.gate
    }

    /// Raw value, if present.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// All values by name.
    pub fn values(&self) -> &BTreeMap<String, ParamValue> {
        &self.values
    }

    /// Number of resolved values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn missing(&self, name: &str) -> LowerError {
        LowerError::UndeclaredParameter {
            gate: self.gate.clone(),
            name: name.to_string(),
        }
    }

    fn mismatch(&self, name: &str, expected: ParamType, found: &ParamValue) -> LowerError {
        LowerError::ParameterType {
            gate: self.gate.clone(),
            name: name.to_string(),
            expected,
            found: found.param_type(),
        }
    }

    /// A float value.
    #[allow(clippy::cast_precision_loss)]
    pub fn float(&self, name: &str) -> LowerResult<f64> {
        match self.values.get(name) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(other) => Err(self.mismatch(name, ParamType::Float, other)),
            None => Err(self.missing(name)),
        }
    }

    /// An optional float value; absent optional parameters give `None`.
    pub fn opt_float(&self, name: &str) -> LowerResult<Option<f64>> {
        if self.values.contains_key(name) {
            self.float(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// A string value.
    pub fn str(&self, name: &str) -> LowerResult<&str> {
        match self.values.get(name) {
            Some(ParamValue::Str(v)) => Ok(v),
            Some(other) => Err(self.mismatch(name, ParamType::Str, other)),
            None => Err(self.missing(name)),
        }
    }

    /// A string value parsed into `T`, reported as a value error on failure.
    pub fn parse<T>(&self, name: &str) -> LowerResult<T>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        self.str(name)?
            .parse()
            .map_err(|e: T::Err| LowerError::ParameterValue {
                gate: self.gate.clone(),
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// An interpolation table.
    pub fn table(&self, name: &str) -> LowerResult<Table> {
        match self.values.get(name) {
            Some(ParamValue::Table(rows)) => {
                Table::from_rows(rows).map_err(|reason| LowerError::ParameterValue {
                    gate: self.gate.clone(),
                    name: name.to_string(),
                    reason,
                })
            }
            Some(other) => Err(self.mismatch(name, ParamType::Table, other)),
            None => Err(self.missing(name)),
        }
    }
}
