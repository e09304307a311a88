//! Calibration sources.
//!
//! A calibration source supplies per-(gate, targets) parameter overrides.
//! [`Calibration`] is an in-memory store loaded from YAML:
//!
//! ```yaml
//! gates:
//!   - gate: rfUnitary
//!     qubits: [Q0]
//!     params: { frequency: 4.85e9 }
//!   - gate: CR
//!     type: echo
//!     qubits: [Q0, Q1]
//!     params: { duration: 2.0e-7 }
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::LowerResult;
use crate::gate::GateKey;
use crate::param::{ParamOverrides, ParamValue};
use crate::qubit::QubitRef;

/// Source of parameter overrides.
pub trait CalibrationSource {
    /// All overrides for a gate on the given targets, in target order.
    fn overrides(&self, key: &GateKey, targets: &[QubitRef]) -> ParamOverrides;

    /// A single override; `None` means the schema default applies.
    fn get(&self, key: &GateKey, targets: &[QubitRef], name: &str) -> Option<ParamValue> {
        self.overrides(key, targets).remove(name)
    }
}

/// A source with no overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCalibration;

impl CalibrationSource for NoCalibration {
    fn overrides(&self, _key: &GateKey, _targets: &[QubitRef]) -> ParamOverrides {
        ParamOverrides::new()
    }
}

/// One entry of a calibration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// Gate the entry applies to.
    #[serde(flatten)]
    pub key: GateKey,
    /// Targets in gate order.
    pub qubits: Vec<QubitRef>,
    /// Parameter overrides.
    #[serde(default)]
    pub params: ParamOverrides,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CalibrationFile {
    #[serde(default)]
    gates: Vec<CalibrationEntry>,
}

/// In-memory calibration store.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    entries: FxHashMap<(GateKey, Vec<QubitRef>), ParamOverrides>,
}

impl Calibration {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document.
    ///
    /// Later entries for the same gate and targets merge over earlier ones.
    pub fn from_yaml_str(text: &str) -> LowerResult<Self> {
        let file: CalibrationFile = serde_yaml_ng::from_str(text)?;
        let mut calibration = Self::new();
        for entry in file.gates {
            calibration.insert(entry);
        }
        debug!("Loaded calibration with {} entries", calibration.len());
        Ok(calibration)
    }

    /// Read and parse a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> LowerResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Merge an entry over any existing overrides for the same gate and targets.
    pub fn insert(&mut self, entry: CalibrationEntry) {
        self.entries
            .entry((entry.key, entry.qubits))
            .or_default()
            .extend(entry.params);
    }

    /// Set a single override.
    pub fn set(
        &mut self,
        key: GateKey,
        targets: Vec<QubitRef>,
        name: &str,
        value: impl Into<ParamValue>,
    ) {
        self.entries
            .entry((key, targets))
            .or_default()
            .insert(name.to_string(), value.into());
    }

    /// Number of (gate, targets) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize back to a YAML document, entries sorted.
    pub fn to_yaml_string(&self) -> LowerResult<String> {
        let mut gates: Vec<CalibrationEntry> = self
            .entries
            .iter()
            .map(|((key, qubits), params)| CalibrationEntry {
                key: key.clone(),
                qubits: qubits.clone(),
                params: params.clone(),
            })
            .collect();
        gates.sort_by(|a, b| (&a.key, &a.qubits).cmp(&(&b.key, &b.qubits)));
        Ok(serde_yaml_ng::to_string(&CalibrationFile { gates })?)
    }
}

impl CalibrationSource for Calibration {
    fn overrides(&self, key: &GateKey, targets: &[QubitRef]) -> ParamOverrides {
        self.entries
            .get(&(key.clone(), targets.to_vec()))
            .cloned()
            .unwrap_or_default()
    }
}
