//! Error types for the pulse algebra.

use thiserror::Error;

/// Errors that can occur while building or sampling waveforms.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WaveError {
    /// Edge shape name not recognised.
    #[error("Unknown edge shape '{0}' (expected 'cos' or 'linear')")]
    UnknownEdgeShape(String),

    /// Envelope shape name not recognised.
    #[error("Unknown pulse shape '{0}' (expected 'CosPulse', 'Gaussian' or 'square')")]
    UnknownPulseShape(String),

    /// Sample rate must be finite and positive.
    #[error("Invalid sample rate {0}")]
    InvalidSampleRate(f64),

    /// Sampling window is empty, reversed or unbounded.
    #[error("Invalid sampling window [{start}, {stop})")]
    InvalidWindow {
        /// Window start in seconds.
        start: f64,
        /// Window stop in seconds.
        stop: f64,
    },

    /// Window times rate exceeds the sample cap.
    #[error("Sampling would produce {requested:.0} samples (limit {limit})")]
    TooManySamples {
        /// Samples the window and rate call for.
        requested: f64,
        /// Largest allowed count.
        limit: usize,
    },
}

/// Result type for pulse algebra operations.
pub type WaveResult<T> = Result<T, WaveError>;
