//! CLI command parsing and program loading tests.
//!
//! The CLI is a binary crate, so these tests mirror its clap definitions
//! and the program/calibration loading in `commands::common`, then check
//! them against the library.

// ============================================================================
// Program loading
// ============================================================================

mod program_loading {
    use qpulse_lower::{Calibration, GateCall, GateKey, GateRegistry, Lowerer, Schedule};
    use serde::Deserialize;

    /// Equivalent to the program file shape in commands::common
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ProgramFile {
        Document { calls: Vec<GateCall> },
        List(Vec<GateCall>),
    }

    /// Helper: equivalent to commands::common::parse_program
    fn parse_program(source: &str, ext: &str) -> anyhow::Result<Vec<GateCall>> {
        let file: ProgramFile = match ext {
            "json" => serde_json::from_str(source)?,
            _ => serde_yaml_ng::from_str(source)?,
        };
        Ok(match file {
            ProgramFile::Document { calls } => calls,
            ProgramFile::List(calls) => calls,
        })
    }

    const PROGRAM: &str = r"
calls:
  - gate: X
    qubits: [Q0]
  - gate: CR
    type: echo
    qubits: [Q0, Q1]
  - gate: rfUnitary
    qubits: [Q1]
    args: [1.5707963, 0]
  - gate: Measure
    qubits: [Q1]
";

    #[test]
    fn test_parse_document() {
        let calls = parse_program(PROGRAM, "yaml").unwrap();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[1].key, GateKey::qualified("CR", "echo"));
        assert_eq!(calls[2].args.len(), 2);
        assert!(calls[3].args.is_empty());
    }

    #[test]
    fn test_parse_bare_list() {
        let calls = parse_program("- { gate: H, qubits: [Q3] }\n", "yml").unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].targets, vec!["Q3".into()]);
    }

    #[test]
    fn test_parse_json() {
        let src = r#"{ "calls": [ { "gate": "CZ", "qubits": ["Q0", "Q1"] } ] }"#;
        let calls = parse_program(src, "json").unwrap();
        assert_eq!(calls[0].key, GateKey::new("CZ"));
    }

    #[test]
    fn test_parse_missing_qubits() {
        assert!(parse_program("calls: [{ gate: X }]", "yaml").is_err());
    }

    #[test]
    fn test_program_lowers_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let cal_path = dir.path().join("calibration.yaml");
        std::fs::write(
            &cal_path,
            "gates:\n  - gate: Measure\n    qubits: [Q1]\n    params: { signal: iq }\n",
        )
        .unwrap();

        let calls = parse_program(PROGRAM, "yaml").unwrap();
        let registry = GateRegistry::standard().unwrap();
        let calibration = Calibration::from_path(&cal_path).unwrap();
        let lowerer = Lowerer::new(&registry, &calibration);
        let mut schedule = Schedule::new();
        schedule.run_all(&lowerer, &calls).unwrap();

        let measures = schedule.ledger().measures();
        assert_eq!(measures.len(), 1);
        assert_eq!(measures[&0].signal, "iq");
        assert!(schedule.ledger().time(&"Q0".into()) > 200e-9);
    }

    #[test]
    fn test_missing_calibration_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Calibration::from_path(dir.path().join("absent.yaml")).is_err());
    }
}

// ============================================================================
// Clap argument parsing (test via try_parse_from on equivalent structs)
// ============================================================================

mod clap_parsing {
    use clap::{Parser, Subcommand};

    #[derive(Parser)]
    #[command(name = "qpulse", version)]
    struct TestCli {
        #[arg(short, long, action = clap::ArgAction::Count, global = true)]
        verbose: u8,

        #[arg(short, long, global = true, env = "QPULSE_CALIBRATION")]
        calibration: Option<String>,

        #[command(subcommand)]
        command: TestCommands,
    }

    #[derive(Subcommand)]
    enum TestCommands {
        Gates {
            #[arg(short, long)]
            filter: Option<String>,
        },
        Params {
            gate: String,
            #[arg(short = 't', long = "type")]
            qualifier: Option<String>,
            #[arg(required = true, num_args = 1..)]
            qubits: Vec<String>,
            #[arg(long, default_value = "table")]
            format: String,
        },
        Lower {
            input: String,
            #[arg(short, long)]
            output: Option<String>,
            #[arg(long, default_value_t = qpulse_lower::DEFAULT_MAX_DEPTH)]
            max_depth: usize,
            #[arg(long)]
            no_expansions: bool,
            #[arg(long)]
            sample_rate: Option<f64>,
        },
    }

    #[test]
    fn test_parse_lower_minimal() {
        let cli = TestCli::try_parse_from(["qpulse", "lower", "prog.yaml"]).unwrap();
        match cli.command {
            TestCommands::Lower {
                input,
                output,
                max_depth,
                no_expansions,
                sample_rate,
            } => {
                assert_eq!(input, "prog.yaml");
                assert!(output.is_none());
                assert_eq!(max_depth, 32);
                assert!(!no_expansions);
                assert!(sample_rate.is_none());
            }
            _ => panic!("expected lower"),
        }
    }

    #[test]
    fn test_parse_lower_with_all_args() {
        let cli = TestCli::try_parse_from([
            "qpulse",
            "-vv",
            "lower",
            "prog.yaml",
            "-o",
            "out.json",
            "--max-depth",
            "8",
            "--no-expansions",
            "--sample-rate",
            "2e9",
            "-c",
            "cal.yaml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.calibration.as_deref(), Some("cal.yaml"));
        match cli.command {
            TestCommands::Lower {
                output,
                max_depth,
                no_expansions,
                sample_rate,
                ..
            } => {
                assert_eq!(output.as_deref(), Some("out.json"));
                assert_eq!(max_depth, 8);
                assert!(no_expansions);
                assert_eq!(sample_rate, Some(2e9));
            }
            _ => panic!("expected lower"),
        }
    }

    #[test]
    fn test_parse_lower_missing_input() {
        assert!(TestCli::try_parse_from(["qpulse", "lower"]).is_err());
    }

    #[test]
    fn test_parse_params_qualified() {
        let cli = TestCli::try_parse_from([
            "qpulse", "params", "CR", "--type", "echo", "Q0", "Q1",
        ])
        .unwrap();
        match cli.command {
            TestCommands::Params {
                gate,
                qualifier,
                qubits,
                format,
            } => {
                assert_eq!(gate, "CR");
                assert_eq!(qualifier.as_deref(), Some("echo"));
                assert_eq!(qubits, vec!["Q0", "Q1"]);
                assert_eq!(format, "table");
            }
            _ => panic!("expected params"),
        }
    }

    #[test]
    fn test_parse_params_requires_qubits() {
        assert!(TestCli::try_parse_from(["qpulse", "params", "X"]).is_err());
    }

    #[test]
    fn test_parse_gates() {
        let cli = TestCli::try_parse_from(["qpulse", "gates", "-f", "rf"]).unwrap();
        assert!(matches!(
            cli.command,
            TestCommands::Gates { filter: Some(ref f) } if f == "rf"
        ));
    }

    #[test]
    fn test_version_is_a_flag() {
        let err = TestCli::try_parse_from(["qpulse", "--version"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert!(TestCli::try_parse_from(["qpulse", "version"]).is_err());
    }

    #[test]
    fn test_unknown_subcommand() {
        assert!(TestCli::try_parse_from(["qpulse", "submit"]).is_err());
    }
}
