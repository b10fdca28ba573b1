//! Error taxonomy for the trace pipeline
//!
//! Host-call failures are not errors of this crate: entry points return the
//! forwarded status verbatim and skip tracking. Everything below is fatal at
//! the interception boundary (there is no degraded mode; a partial or
//! misleading trace is worse than stopping), but core modules return `Result`
//! so their behavior stays unit-testable.

use crate::handles::{KernelHandle, ProgramHandle};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    /// A build or kernel-creation call referenced a program the registry has
    /// never seen. The interception layer is out of sync, not the host.
    #[error("program {0} was never recorded (interception layer out of sync)")]
    UnknownProgram(ProgramHandle),

    /// An argument binding or launch referenced a kernel the registry has
    /// never seen.
    #[error("kernel {0} was never recorded (interception layer out of sync)")]
    UnknownKernel(KernelHandle),

    /// The host invoked an API surface this crate deliberately does not model
    /// (sub-buffers, images, samplers, kernel enumeration).
    #[error("unsupported host API call: {0}")]
    Unsupported(&'static str),

    /// Every candidate trace directory name was taken.
    #[error("exhausted trace directory names under '{base}'")]
    TraceDirExhausted { base: String },

    /// Every candidate source-dump name for this entry point was taken.
    #[error("exhausted source dump names for entry point '{entry_point}'")]
    DumpNameExhausted { entry_point: String },

    #[error("trace I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;
