//! Params command implementation.

use anyhow::Result;
use console::style;

use qpulse_lower::{GateKey, Lowerer, QubitRef};

use super::common::{load_calibration, standard_registry};

/// Execute the params command.
pub fn execute(
    gate: &str,
    qualifier: Option<&str>,
    qubits: &[String],
    format: &str,
    calibration: Option<&str>,
) -> Result<()> {
    let registry = standard_registry()?;
    let calibration = load_calibration(calibration)?;
    let lowerer = Lowerer::new(&registry, &calibration);

    let key = GateKey::from_parts(gate, qualifier);
    let targets: Vec<QubitRef> = qubits.iter().map(|q| QubitRef::new(q.as_str())).collect();
    let params = lowerer.resolve(&key, &targets)?;

    match format.to_lowercase().as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(params.values())?),
        "yaml" => print!("{}", serde_yaml_ng::to_string(params.values())?),
        "table" => {
            let schema = registry.get(&key)?.schema();
            let on: Vec<&str> = targets.iter().map(QubitRef::name).collect();
            println!(
                "{} {} on {}\n",
                style("→").cyan().bold(),
                style(&key).green(),
                style(on.join(", ")).yellow()
            );
            if params.is_empty() {
                println!("  (no parameters)");
            }
            for (name, value) in params.values() {
                let spec = schema.and_then(|s| s.get(name));
                let unit = spec.and_then(|s| s.unit.as_deref()).unwrap_or("");
                let marker = if spec.and_then(|s| s.default.as_ref()) == Some(value) {
                    style("default").dim()
                } else {
                    style("calibrated").yellow()
                };
                println!("  {name:<16} {value} {unit}  {marker}");
            }
        }
        other => anyhow::bail!("Unknown format: '{other}'. Available: table, yaml, json"),
    }
    Ok(())
}
