//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use qpulse_lower::{Calibration, GateCall, GateRegistry};

/// A gate program: either a bare list of calls or a `calls:` document.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProgramFile {
    Document { calls: Vec<GateCall> },
    List(Vec<GateCall>),
}

/// Load a gate program from a YAML or JSON file.
pub fn load_program(path: &str) -> Result<Vec<GateCall>> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        anyhow::bail!("File not found: {path}");
    }

    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;
    parse_program(&source, extension(path_obj))
        .with_context(|| format!("Failed to parse program: {path}"))
}

/// Parse a gate program; `ext` selects JSON, anything else is read as YAML.
pub fn parse_program(source: &str, ext: &str) -> Result<Vec<GateCall>> {
    let file: ProgramFile = match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(source)?,
        _ => serde_yaml_ng::from_str(source)?,
    };
    Ok(match file {
        ProgramFile::Document { calls } => calls,
        ProgramFile::List(calls) => calls,
    })
}

/// Load the calibration store, or an empty one when no file is given.
pub fn load_calibration(path: Option<&str>) -> Result<Calibration> {
    let Some(path) = path else {
        return Ok(Calibration::new());
    };
    Calibration::from_path(path).with_context(|| format!("Failed to load calibration: {path}"))
}

/// The built-in gate library.
pub fn standard_registry() -> Result<GateRegistry> {
    GateRegistry::standard().context("Failed to build the standard gate library")
}

/// File extension, empty if there is none.
pub fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

/// Format seconds with an engineering prefix.
pub fn format_time(seconds: f64) -> String {
    let abs = seconds.abs();
    if abs == 0.0 {
        "0 s".to_string()
    } else if abs < 1e-6 {
        format!("{:.1} ns", seconds * 1e9)
    } else if abs < 1e-3 {
        format!("{:.3} µs", seconds * 1e6)
    } else {
        format!("{:.3} ms", seconds * 1e3)
    }
}
