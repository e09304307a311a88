//! Lower command implementation.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use tracing::info;

use qpulse_lower::{
    Instruction, LowerOptions, Lowerer, MeasurementTask, QubitLedger, Schedule,
};

use super::common::{extension, format_time, load_calibration, load_program, standard_registry};

/// Lowering and output options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum expansion depth.
    pub max_depth: usize,
    /// Keep expansion markers in the output.
    pub emit_expansions: bool,
    /// Render channel samples at this rate.
    pub sample_rate: Option<f64>,
}

#[derive(Serialize)]
struct QubitSummary {
    qubit: String,
    time: f64,
    phase: f64,
}

#[derive(Serialize)]
struct ChannelSamples {
    start: f64,
    sample_rate: f64,
    samples: Vec<f64>,
}

#[derive(Serialize)]
struct Report<'a> {
    instructions: &'a [Instruction],
    qubits: Vec<QubitSummary>,
    measures: Vec<&'a MeasurementTask>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    channels: BTreeMap<String, ChannelSamples>,
}

/// Execute the lower command.
pub fn execute(
    input: &str,
    output: Option<&str>,
    calibration: Option<&str>,
    options: &Options,
) -> Result<()> {
    println!(
        "{} Lowering {}",
        style("→").cyan().bold(),
        style(input).green()
    );

    let program = load_program(input)?;
    let registry = standard_registry()?;
    let calibration = load_calibration(calibration)?;
    println!(
        "  Loaded: {} calls, {} calibration entries",
        program.len(),
        calibration.len()
    );

    let lowerer = Lowerer::new(&registry, &calibration).with_options(LowerOptions {
        max_depth: options.max_depth,
        emit_expansions: options.emit_expansions,
    });

    let mut schedule = Schedule::new();
    for (i, call) in program.iter().enumerate() {
        schedule
            .run(&lowerer, call)
            .with_context(|| format!("Failed to lower call #{} ({call})", i + 1))?;
    }
    info!("Lowered {} calls", program.len());

    println!("{} Lowering complete", style("✓").green().bold());
    println!(
        "  Result: {} instructions on {} channels",
        schedule.instructions().len(),
        schedule.buffers().len()
    );
    print_ledger(schedule.ledger());
    for (channel, waveform) in schedule.buffers().iter() {
        match waveform.support() {
            Some((lo, hi)) if lo.is_finite() && hi.is_finite() => println!(
                "  {:<16} {} → {}",
                style(channel).magenta(),
                format_time(lo),
                format_time(hi)
            ),
            _ => println!("  {:<16} unbounded", style(channel).magenta()),
        }
    }

    let channels = match options.sample_rate {
        Some(rate) => render(&schedule, rate)?,
        None => BTreeMap::new(),
    };

    if let Some(path) = output {
        let report = build_report(&schedule, channels);
        save_report(&report, path)?;
        println!("  Output: {}", style(path).green());
    }
    Ok(())
}

fn render(schedule: &Schedule, rate: f64) -> Result<BTreeMap<String, ChannelSamples>> {
    let end = schedule.ledger().end_time();
    let rendered = schedule
        .buffers()
        .render(rate, end)
        .context("Failed to render channel output")?;
    println!(
        "  Rendered {} channels at {} Sa/s",
        rendered.len(),
        style(rate).yellow()
    );
    Ok(rendered
        .into_iter()
        .map(|(channel, data)| {
            (
                channel.to_string(),
                ChannelSamples {
                    start: data.start,
                    sample_rate: rate,
                    samples: data.samples,
                },
            )
        })
        .collect())
}

fn build_report(schedule: &Schedule, channels: BTreeMap<String, ChannelSamples>) -> Report<'_> {
    let ledger = schedule.ledger();
    Report {
        instructions: schedule.instructions(),
        qubits: ledger
            .qubits()
            .into_iter()
            .map(|q| QubitSummary {
                qubit: q.to_string(),
                time: ledger.time(q),
                phase: ledger.phase(q),
            })
            .collect(),
        measures: ledger.measures().values().collect(),
        channels,
    }
}

fn save_report(report: &Report<'_>, path: &str) -> Result<()> {
    let content = match extension(Path::new(path)).to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml_ng::to_string(report)?,
        _ => serde_json::to_string_pretty(report)?,
    };
    fs::write(path, content).with_context(|| format!("Failed to write file: {path}"))
}

fn print_ledger(ledger: &QubitLedger) {
    for qubit in ledger.qubits() {
        println!(
            "  {:<6} t = {:>12}  φ = {:>8.4}",
            style(qubit).cyan(),
            format_time(ledger.time(qubit)),
            ledger.phase(qubit)
        );
    }
    for (cbit, task) in ledger.measures() {
        println!(
            "  c[{}] ← {} at {} ({})",
            cbit,
            style(&task.qubit).cyan(),
            format_time(task.time),
            task.signal
        );
    }
}
