//! qpulse Command-Line Interface
//!
//! Inspect the gate library, resolve calibrated parameters and lower gate
//! programs into channel instructions.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{gates, lower, params};

/// qpulse - gate lowering for quantum control hardware
#[derive(Parser)]
#[command(name = "qpulse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Calibration file (YAML)
    #[arg(short, long, global = true, env = "QPULSE_CALIBRATION")]
    calibration: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered gates
    Gates {
        /// Only show gates whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show resolved parameters for a gate on given qubits
    Params {
        /// Gate name
        gate: String,

        /// Gate qualifier (e.g. echo)
        #[arg(short = 't', long = "type")]
        qualifier: Option<String>,

        /// Target qubits in gate order
        #[arg(required = true, num_args = 1..)]
        qubits: Vec<String>,

        /// Output format (table, yaml, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Lower a gate program into instructions
    Lower {
        /// Program file (YAML or JSON list of gate calls)
        input: String,

        /// Output file for the instruction stream (stdout summary if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Maximum expansion depth
        #[arg(long, default_value_t = qpulse_lower::DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Drop expansion markers from the output
        #[arg(long)]
        no_expansions: bool,

        /// Sample rate in Hz for rendered channel output
        #[arg(long)]
        sample_rate: Option<f64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let calibration = cli.calibration.as_deref();
    let result = match cli.command {
        Commands::Gates { filter } => gates::execute(filter.as_deref()),

        Commands::Params {
            gate,
            qualifier,
            qubits,
            format,
        } => params::execute(&gate, qualifier.as_deref(), &qubits, &format, calibration),

        Commands::Lower {
            input,
            output,
            max_depth,
            no_expansions,
            sample_rate,
        } => lower::execute(
            &input,
            output.as_deref(),
            calibration,
            &lower::Options {
                max_depth,
                emit_expansions: !no_expansions,
                sample_rate,
            },
        ),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
