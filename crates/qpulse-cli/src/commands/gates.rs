//! Gates command implementation.

use anyhow::Result;
use console::style;

use super::common::standard_registry;

/// Execute the gates command.
pub fn execute(filter: Option<&str>) -> Result<()> {
    let registry = standard_registry()?;

    println!("{} Registered gates:\n", style("qpulse").cyan().bold());

    let mut shown = 0;
    for key in registry.keys() {
        if filter.is_some_and(|f| !key.name.contains(f)) {
            continue;
        }
        let def = registry.get(key)?;
        let signature = def.signature();

        let kind = if def.is_compound() {
            style("compound").dim()
        } else {
            style("primitive").green()
        };
        println!("  {} {}", style(key).bold(), kind);
        println!("    Targets: {}", signature.arity);

        let args = signature.arg_names();
        if !args.is_empty() {
            println!("    Args: {}", args.join(", "));
        }
        if let Some(schema) = def.schema().filter(|s| !s.is_empty()) {
            let names: Vec<&str> = schema.iter().map(|p| p.name.as_str()).collect();
            println!("    Params: {}", names.join(", "));
        }
        let steps = def.subcalls();
        if !steps.is_empty() {
            let names: Vec<String> = steps.iter().map(|s| s.key.to_string()).collect();
            println!("    Expands: {}", names.join(" → "));
        }
        shown += 1;
    }

    if shown == 0 {
        println!("  No gates match");
    }
    Ok(())
}
