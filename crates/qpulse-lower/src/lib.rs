//! qpulse Gate Lowering
//!
//! Compiles named gate invocations into time-ordered channel instructions
//! for quantum control hardware.
//!
//! # Overview
//!
//! - [`GateRegistry`]: gate definitions. Primitives pair a parameter
//!   schema with a [`GateProcedure`]; compounds are fixed sequences of
//!   other gates. Built and checked once, immutable afterwards.
//! - [`CalibrationSource`]: per-(gate, targets) parameter overrides.
//! - [`Lowerer`]: validates a call, resolves parameters for its whole
//!   expansion tree, and returns a [`Lowering`] iterator.
//! - [`Instruction`]: `AddWaveform`, `SetState` or `Expand`, consumed in
//!   emission order.
//! - [`Schedule`]: a reference consumer holding the [`QubitLedger`] and
//!   per-channel waveform buffers.
//!
//! # Example
//!
//! ```rust
//! use qpulse_lower::{GateCall, GateRegistry, Lowerer, NoCalibration, Schedule};
//!
//! let registry = GateRegistry::standard().unwrap();
//! let lowerer = Lowerer::new(&registry, &NoCalibration);
//!
//! let mut schedule = Schedule::new();
//! schedule.run(&lowerer, &GateCall::new("X", ["Q0"])).unwrap();
//! schedule.run(&lowerer, &GateCall::new("Measure", ["Q0"])).unwrap();
//!
//! assert_eq!(schedule.ledger().measures().len(), 1);
//! assert!(schedule.ledger().time(&"Q0".into()) > 1e-6);
//! ```

pub mod calibration;
pub mod context;
pub mod error;
pub mod expr;
pub mod gate;
pub mod instruction;
pub mod library;
pub mod lower;
pub mod param;
pub mod qubit;
pub mod registry;
pub mod schedule;
pub mod synthesis;

pub use calibration::{Calibration, CalibrationEntry, CalibrationSource, NoCalibration};
pub use context::{GateContext, QubitLedger};
pub use error::{LowerError, LowerResult};
pub use expr::ArgExpr;
pub use gate::{ArgSpec, Arity, GateCall, GateKey, GateProcedure, GateSignature, Subcall};
pub use instruction::{Instruction, MeasurementTask, StateUpdate};
pub use lower::{DEFAULT_MAX_DEPTH, LowerOptions, Lowerer, Lowering};
pub use param::{ParamOverrides, ParamSchema, ParamSpec, ParamType, ParamValue, Params, Table};
pub use qubit::{Channel, Port, QubitRef};
pub use registry::{GateDef, GateRegistry, GateRegistryBuilder};
pub use schedule::{ChannelBuffers, RenderedChannel, Schedule};
pub use synthesis::Synthesis;
